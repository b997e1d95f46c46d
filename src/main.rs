use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use draftsmith::DraftError;
use draftsmith::cli::commands;
use draftsmith::constants::outline::DEFAULT_WORD_BUDGET;
use draftsmith::writer::CancelToken;

#[derive(Parser)]
#[command(name = "draftsmith")]
#[command(
    version,
    about = "Write long-form articles section by section with word-count validation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true, help = "Enable debug logging")]
    verbose: bool,

    #[arg(long, short, global = true, help = "Only log errors")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Draftsmith in the current directory
    Init {
        #[arg(long, help = "Overwrite existing project config")]
        force: bool,
    },

    /// Write an article from an outline
    Write {
        #[arg(long, help = "Outline file (.json, .yaml)")]
        outline: PathBuf,
        #[arg(long, help = "Citation sources (.json array or one URL per line)")]
        sources: Option<PathBuf>,
        #[arg(long, help = "Extra instructions passed to every section")]
        instructions: Option<String>,
        #[arg(long, short, help = "Markdown output path")]
        output: Option<PathBuf>,
        #[arg(long, help = "Do not store the article in the database")]
        no_save: bool,
        #[arg(long, help = "Skip cover image generation")]
        no_image: bool,
        #[arg(long, help = "Store as published so later articles can link here")]
        publish: bool,
    },

    /// Generate an outline for a topic
    Outline {
        #[arg(long, help = "Article topic")]
        topic: String,
        #[arg(long, help = "Citation sources (.json array or one URL per line)")]
        sources: Option<PathBuf>,
        #[arg(long = "research", help = "Research query; repeat for several")]
        research: Vec<String>,
        #[arg(long, default_value_t = DEFAULT_WORD_BUDGET, help = "Total word budget")]
        words: u32,
        #[arg(long, help = "Extra planning instructions")]
        instructions: Option<String>,
        #[arg(long, short, help = "Save to file (.json, .yaml) instead of printing")]
        output: Option<PathBuf>,
    },

    /// Suggest article topics for a subject
    Topics {
        subject: String,
        #[arg(long, short = 'n', default_value_t = 10)]
        count: usize,
    },

    /// List stored articles
    Articles {
        #[arg(long, short = 'n', default_value_t = 20)]
        limit: usize,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
        #[arg(long, value_name = "ID_OR_SLUG", help = "Mark an article as published")]
        publish: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json, toml"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mDraftsmith encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }

        eprintln!("\n\x1b[33mPlease report this issue at:\x1b[0m");
        eprintln!("  https://github.com/junyeong-ai/draftsmith/issues");
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            if let Some(delay) = e.downcast_ref::<DraftError>().and_then(DraftError::retry_hint) {
                eprintln!(
                    "\x1b[33mThis looks transient; try again in about {}s.\x1b[0m",
                    delay.as_secs().max(1)
                );
            }
            ExitCode::FAILURE
        }
    }
}

/// Ctrl-C flips the token; the pipeline stops before its next completion.
fn cancel_on_ctrl_c() -> CancelToken {
    let token = CancelToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling after the current step...");
            handle.cancel();
        }
    });
    token
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { force } => {
            commands::init::run(force)?;
        }
        Commands::Write {
            outline,
            sources,
            instructions,
            output,
            no_save,
            no_image,
            publish,
        } => {
            let options = commands::write::WriteOptions {
                outline,
                sources,
                instructions,
                output,
                no_save,
                no_image,
                publish,
            };
            Runtime::new()?.block_on(async {
                let cancel = cancel_on_ctrl_c();
                commands::write::run(options, cancel).await
            })?;
        }
        Commands::Outline {
            topic,
            sources,
            research,
            words,
            instructions,
            output,
        } => {
            let options = commands::outline::OutlineOptions {
                topic,
                sources,
                research,
                words,
                instructions,
                output,
            };
            Runtime::new()?.block_on(commands::outline::run(options))?;
        }
        Commands::Topics { subject, count } => {
            Runtime::new()?.block_on(commands::topics::run(&subject, count))?;
        }
        Commands::Articles {
            limit,
            format,
            publish,
        } => match publish {
            Some(id_or_slug) => commands::articles::publish(&id_or_slug)?,
            None => commands::articles::list(limit, &format)?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => {
                commands::config::show(global, &format)?;
            }
            ConfigAction::Path => {
                commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                if global {
                    commands::config::init_global(force)?;
                } else {
                    commands::config::init_project(force)?;
                }
            }
        },
    }

    Ok(())
}
