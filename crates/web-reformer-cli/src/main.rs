//! Web Reformer CLI: entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use url::Url;

use web_reformer::{configure_default_parser, ParserOptions, ResponseView, ViewConfig};
use web_reformer_cli::login::parse_assignments;
use web_reformer_cli::{
    resolve_session_config, run_login, Download, InspectReport, LoginOutcome, LoginPlan,
    WebSession,
};

#[derive(Parser)]
#[command(
    name = "reformer",
    about = "Scripted web sessions: inspect pages, fill in login forms, resubmit",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// User agent sent with every request.
    /// Also reads from REFORMER_USER_AGENT env var.
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Request timeout in milliseconds.
    /// Also reads from REFORMER_TIMEOUT_MS env var.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Replace invalid UTF-8 in response bodies instead of failing to parse.
    #[arg(long, global = true)]
    lossy: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a page and list its forms, links and images.
    Inspect {
        /// Page URL.
        url: String,

        /// Also list every element with this tag name (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Log in through a form on a page, then optionally download a resource.
    Login {
        /// Page carrying the login form.
        url: String,

        /// `id` of the form to submit.
        #[arg(long, default_value = "login_form")]
        form_id: String,

        /// Field to set before submitting, as name=value (repeatable).
        #[arg(long = "set")]
        fields: Vec<String>,

        /// Authenticated URL to fetch after logging in.
        #[arg(long)]
        download: Option<String>,

        /// Where to save the downloaded body.
        #[arg(long, short, default_value = "Output.txt")]
        output: PathBuf,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   reformer completions bash > ~/.local/share/bash-completion/completions/reformer
    ///   reformer completions zsh > ~/.zfunc/_reformer
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    configure_default_parser(ParserOptions {
        lossy_utf8: cli.lossy,
        ..ParserOptions::default()
    });

    match cli.command {
        Commands::Inspect { url, tags, json } => {
            let url = parse_url(&url)?;
            let config = resolve_session_config(cli.user_agent.as_deref(), cli.timeout_ms);
            let session = WebSession::new(&config)?;

            let page = session.get(&url).await?;
            let report = InspectReport::build(
                &ResponseView::with_config(page, ViewConfig::default()),
                &tags,
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_text());
            }
        }

        Commands::Login {
            url,
            form_id,
            fields,
            download,
            output,
        } => {
            let config = resolve_session_config(cli.user_agent.as_deref(), cli.timeout_ms);
            let session = WebSession::new(&config)?;
            let plan = LoginPlan {
                page_url: parse_url(&url)?,
                form_id,
                fields: parse_assignments(&fields)?,
                download: download
                    .map(|u| -> Result<Download> {
                        Ok(Download {
                            url: parse_url(&u)?,
                            output,
                        })
                    })
                    .transpose()?,
            };

            match run_login(&session, &plan).await? {
                LoginOutcome::Rejected => {
                    eprintln!("Login failed.");
                    std::process::exit(1);
                }
                LoginOutcome::LoggedIn { new_cookies } => {
                    println!("Logged in ({new_cookies} new cookie(s)).");
                }
                LoginOutcome::Downloaded { path, bytes } => {
                    println!("Saved {bytes} bytes to {}", path.display());
                }
                LoginOutcome::DownloadFailed { status } => {
                    eprintln!("File download returned status code: {status}");
                    std::process::exit(1);
                }
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "reformer", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).with_context(|| format!("invalid URL {raw:?}"))
}
