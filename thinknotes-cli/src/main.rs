use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use thinknotes::{
    ClientConfig, GuardState, GuardView, ThinkNotes, UploadFile, UploadResult,
};

const DEFAULT_PDF_OUTPUT: &str = "ThinkNotes_Response.pdf";

#[derive(Parser)]
#[command(name = "thinknotes", version)]
#[command(about = "Summaries and flashcards for your study documents", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session database path
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Sign in and store the session
    Signin {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Sign out and clear the stored session
    Signout,

    /// Show the stored session
    Whoami,

    /// Open the dashboard (requires a session)
    Dashboard,

    /// Upload a document and print its summary and flashcards
    Upload {
        /// A .pdf, .doc or .docx file
        file: PathBuf,

        /// Do not ask for a generated PDF
        #[arg(long)]
        no_pdf: bool,

        /// Where to save the generated PDF
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive("info".parse().expect("valid log directive"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Configuration with precedence: CLI > env > project > global > defaults
fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::load().context("failed to load configuration")?;
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    if let Some(path) = &cli.storage {
        config.storage_path = Some(path.clone());
    }
    Ok(config)
}

async fn connect(config: ClientConfig) -> Result<ThinkNotes> {
    let client = ThinkNotes::builder()
        .config(config)
        .build()
        .context("failed to build client")?;
    client
        .restore()
        .await
        .context("failed to restore session")?;
    Ok(client)
}

/// Run the route guard. Returns false when the user was sent to sign-in.
async fn require_session(client: &ThinkNotes) -> bool {
    let mut guard = client.guard();
    let state = guard.settle().await;
    let view = guard.render();
    guard.unmount();

    debug!(?state, ?view, "guard settled");
    if let GuardView::Redirect(path) = view {
        println!("Not signed in. Redirected to {path}; run `thinknotes signin` first.");
    }
    state == GuardState::Authenticated
}

fn print_result(result: &UploadResult) {
    if !result.summary.is_empty() {
        println!("Summary\n\n{}\n", result.summary);
    }
    if !result.flashcards.is_empty() {
        println!("Flashcards\n");
        for (i, card) in result.flashcards.iter().enumerate() {
            println!("Q{}: {}", i + 1, card.question);
            println!("A{}: {}\n", i + 1, card.answer);
        }
    }
    if result.summary.is_empty() && result.flashcards.is_empty() {
        println!("No result.");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: failed to load .env: {e}");
        }
    }

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Signup {
            name,
            email,
            password,
        } => {
            let client = connect(load_config(&cli)?).await?;
            match client.auth().sign_up(name, email, password).await {
                Ok(()) => println!("Account created. Sign in with `thinknotes signin`."),
                Err(e) => {
                    error!(error = %e, "sign-up failed");
                    anyhow::bail!("{}", e.user_message());
                }
            }
        }

        Commands::Signin { email, password } => {
            let client = connect(load_config(&cli)?).await?;
            match client.auth().sign_in(email, password).await {
                Ok(session) => {
                    let who = session.user_identifier.unwrap_or_default();
                    println!("Signed in as {who}.");
                }
                Err(e) => {
                    error!(error = %e, "sign-in failed");
                    anyhow::bail!("{}", e.user_message());
                }
            }
        }

        Commands::Signout => {
            let client = connect(load_config(&cli)?).await?;
            client.auth().sign_out().await;
            println!("Signed out.");
        }

        Commands::Whoami => {
            let client = connect(load_config(&cli)?).await?;
            let session = client.session().await?;
            match (session.user_identifier, client.user_badge().await?) {
                (Some(id), Some(badge)) => println!("{} ({id})", badge.display_name),
                (Some(id), None) => println!("{id}"),
                _ => println!("Not signed in."),
            }
        }

        Commands::Dashboard => {
            let client = connect(load_config(&cli)?).await?;
            if require_session(&client).await {
                match client.user_badge().await? {
                    Some(badge) => println!("Welcome back, {}.", badge.display_name),
                    None => println!("Welcome back."),
                }
            }
        }

        Commands::Upload {
            file,
            no_pdf,
            output,
        } => {
            let upload = UploadFile::from_path(file)
                .await
                .with_context(|| format!("cannot upload {}", file.display()))?;

            let mut config = load_config(&cli)?;
            if *no_pdf {
                config.want_pdf = false;
            }
            let client = connect(config).await?;
            if !require_session(&client).await {
                return Ok(());
            }

            let uploader = client.uploader();
            uploader.select_file(upload).await;
            info!(file = %file.display(), "processing document");

            let result = match uploader.generate().await {
                Ok(Some(result)) => result,
                Ok(None) => return Ok(()),
                Err(e) => {
                    error!(error = %e, "upload failed");
                    anyhow::bail!("{}", e.display_message());
                }
            };
            print_result(&result);

            if let Some(url) = &result.pdf_url {
                let path = output
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_PDF_OUTPUT));
                let bytes = client
                    .blobs()
                    .resolve(url)
                    .context("generated PDF is no longer available")?;
                tokio::fs::write(&path, bytes)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("PDF saved to {}", path.display());
            } else if let Some(reason) = &result.pdf_error {
                println!("PDF not available: {reason}");
            }
        }
    }

    Ok(())
}
