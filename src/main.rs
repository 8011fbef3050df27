//! YTSave - YouTube video downloader
//!
//! Paste a link, see what it is, and download it at the best quality the
//! configured API offers.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, Level};
use ytsave::backend::{BackendActor, BackendHandle};
use ytsave::downloader::{ConsoleNotifier, DownloadDispatcher, HttpDownloadHost};
use ytsave::extractor::{
    self, quality, AccountService, ApiClient, ApiFlavor, OEmbedClient, StreamResolver, VideoInfo,
};
use ytsave::session::{CredentialStore, Session, SessionStore, SqliteStore};
use ytsave::utils::{self, ApiMode, AppSettings, YtSaveError};
use ytsave::Popup;

#[derive(Parser)]
#[command(name = "ytsave", version, about = "Download YouTube videos at the best available quality")]
struct Args {
    /// API mode: page_scrape, self_hosted or backend
    #[arg(long, global = true)]
    mode: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show title, author, thumbnail and available formats for a video
    Info { url: String },
    /// Download a video. Uses the clipboard or the last loaded video when no URL is given
    Download {
        url: Option<String>,
        /// Directory to save into
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Save without asking for a location
        #[arg(long)]
        no_prompt: bool,
    },
    /// Create a backend account and store its API key
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
    },
    /// Show plan and usage for the stored API key
    Account,
    /// Show the saved session
    Status,
    /// Clear the saved session
    Reset {
        /// Also forget the stored API key
        #[arg(long)]
        forget_key: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();
    } else {
        tracing_subscriber::fmt::init();
    }

    if let Err(e) = run(args).await {
        match e.downcast_ref::<YtSaveError>() {
            Some(err) => eprintln!("Error: {}", err.user_message()),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let mut settings = AppSettings::load()?;
    if let Some(mode) = &args.mode {
        settings.api_mode =
            ApiMode::parse(mode).ok_or_else(|| anyhow!("Unknown API mode: {}", mode))?;
    }
    debug!("Using {} mode against {}", settings.api_mode.as_str(), settings.api_base_url);

    match args.command {
        Command::Info { url } => {
            let app = App::build(&settings, true).await?;
            let metadata = app.popup.load_url(&url).await?;
            println!("Title:     {}", metadata.title);
            println!("Author:    {}", metadata.author);
            println!("Thumbnail: {}", metadata.thumbnail);
            if metadata.is_short {
                println!("Format:    Short");
            }
            // needs API access, skipped when refused
            match app.backend.video_info(metadata.video_id.clone()).await {
                Ok(info) => print_stream_details(&info),
                Err(e) => debug!("Stream details unavailable: {}", e),
            }
            app.backend.shutdown().await;
        }
        Command::Download {
            url,
            output,
            no_prompt,
        } => {
            if let Some(dir) = output {
                settings.download_location = dir;
            }
            let app = App::build(&settings, !no_prompt).await?;

            match url.or_else(utils::clipboard::detect_video_url) {
                Some(url) => {
                    let metadata = app.popup.load_url(&url).await?;
                    println!("{} - {}", metadata.title, metadata.author);
                }
                None => debug!("No URL given, using the saved session"),
            }

            let path = app.popup.download().await?;
            println!("Saved to {}", path.display());
            app.backend.shutdown().await;
        }
        Command::Register { email, name } => {
            let app = App::build(&settings, false).await?;
            app.backend.register(&email, &name).await?;
            println!("Registered {}. API key saved.", email);
            app.backend.shutdown().await;
        }
        Command::Account => {
            let app = App::build(&settings, false).await?;
            let user = app.backend.user_info().await?;
            println!("Plan:      {}", user.tier);
            println!("Usage:     {}/{}", user.usage, user.limit);
            println!("Remaining: {}", user.remaining);
            app.backend.shutdown().await;
        }
        Command::Status => {
            let app = App::build(&settings, false).await?;
            match app.popup.restore().await? {
                Some(record) => {
                    println!("{} - {}", record.current_video.title, record.current_video.author);
                    println!("{}", record.current_video.source_url);
                    if record.download_in_progress {
                        println!(
                            "Download was interrupted at {}% ({})",
                            record.progress.percent, record.progress.text
                        );
                    }
                }
                None => println!("No video loaded"),
            }
            app.backend.shutdown().await;
        }
        Command::Reset { forget_key } => {
            let app = App::build(&settings, false).await?;
            app.popup.session().store().clear().await?;
            if forget_key {
                app.credentials.clear().await?;
            }
            println!("Session cleared");
            app.backend.shutdown().await;
        }
    }

    Ok(())
}

fn print_stream_details(info: &VideoInfo) {
    if let Some(secs) = info.duration {
        println!("Duration:  {}:{:02}", secs / 60, secs % 60);
    }
    let codes: Vec<&str> = info
        .formats
        .iter()
        .filter(|f| f.kind.has_video())
        .map(|f| f.id.as_str())
        .collect();
    if !codes.is_empty() {
        let best = extractor::select_from_formats(&info.formats);
        let label = quality::quality_label(&best).unwrap_or("unranked");
        println!("Formats:   {}", codes.join(", "));
        println!("Best:      {} ({})", best, label);
    }
}

/// Everything a command needs, wired from the settings
struct App {
    popup: Popup,
    backend: BackendHandle,
    credentials: CredentialStore,
}

impl App {
    async fn build(settings: &AppSettings, interactive: bool) -> Result<Self> {
        let store = Arc::new(SqliteStore::open(&utils::get_database_path()).await?);
        let credentials = CredentialStore::new(store.clone(), settings.api_key.clone());

        let source = extractor::stream_source_for(settings)?;
        let accounts: Option<Arc<dyn AccountService>> = match settings.api_mode {
            ApiMode::Backend => Some(Arc::new(ApiClient::new(
                &settings.api_base_url,
                ApiFlavor::Backend,
            )?)),
            _ => None,
        };
        let backend = BackendActor::spawn(
            StreamResolver::new(source, settings.api_mode.allows_fallback()),
            accounts,
            credentials.clone(),
        );

        let mut host = HttpDownloadHost::new(settings.download_location.clone())?;
        if !interactive {
            host = host.non_interactive();
        }
        let dispatcher = DownloadDispatcher::new(
            Arc::new(host),
            Arc::new(ConsoleNotifier),
            &settings.file_extension,
        );

        let metadata = Arc::new(OEmbedClient::new(
            &settings.oembed_base_url,
            &settings.watch_base_url,
        )?);
        let popup = Popup::new(
            Session::new(SessionStore::new(store)),
            metadata,
            backend.clone(),
            dispatcher,
        )
        .with_progress_listener(Arc::new(|p: &ytsave::session::ProgressSnapshot| {
            println!("[{:>3}%] {}", p.percent, p.text)
        }));

        Ok(Self {
            popup,
            backend,
            credentials,
        })
    }
}
