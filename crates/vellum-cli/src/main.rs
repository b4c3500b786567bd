//! Vellum CLI

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;
use vellum::{
    CharacterMap, DocumentEngine, DocumentLoader, FileSource, LoadRequest, LoaderConfig, LoaderView, LoadingStatus, LopdfEngine,
    PdfDocument, Plugin, Renderers,
};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable summary
    Text,
    /// Single JSON object
    Json,
}

#[derive(Parser)]
#[command(name = "vellum")]
#[command(about = "Load PDF documents and report what happened", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a document from a path or http(s) URL
    Open {
        /// Path or URL of the document
        source: String,

        /// Extra request header, as NAME:VALUE (repeatable)
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// Send credentials with remote requests
        #[arg(long)]
        with_credentials: bool,

        /// Base URL of the character maps
        #[arg(long)]
        cmap_url: Option<String>,

        /// Character maps are in the packed binary format
        #[arg(long, requires = "cmap_url")]
        cmap_compressed: bool,

        /// Password to try, in order (repeatable). Further prompts read stdin.
        #[arg(short, long = "password")]
        passwords: Vec<String>,

        /// Configuration file (TOML, YAML or JSON); defaults to a discovered vellum.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the effective configuration as JSON
    Config {
        /// Configuration file (TOML, YAML or JSON); defaults to a discovered vellum.toml
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Open {
            source,
            headers,
            with_credentials,
            cmap_url,
            cmap_compressed,
            passwords,
            config,
            format,
        } => {
            let config = load_config(config.as_deref())?;

            let mut request = LoadRequest::from_config(FileSource::parse(&source), &config);
            for (name, value) in headers {
                request = request.with_header(name, value);
            }
            if with_credentials {
                request = request.with_credentials(true);
            }
            if let Some(url) = cmap_url {
                request = request.with_character_map(CharacterMap {
                    url,
                    is_compressed: cmap_compressed,
                });
            }

            open(request, config, passwords, format).await
        }

        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<LoaderConfig> {
    match path {
        Some(path) => LoaderConfig::from_file(path).with_context(|| format!("Failed to load {}", path.display())),
        None => Ok(LoaderConfig::discover()
            .context("Failed to load discovered configuration")?
            .unwrap_or_default()),
    }
}

fn parse_header(raw: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in '{}'", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

async fn open(request: LoadRequest, config: LoaderConfig, passwords: Vec<String>, format: OutputFormat) -> Result<ExitCode> {
    let source = request.source.describe();
    let engine = Arc::new(LopdfEngine::with_config(&config));
    engine.initialize()?;
    let mut loader = DocumentLoader::with_config(Arc::clone(&engine), config);

    let mut updates = loader.subscribe();
    let progress = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let percentages = updates.borrow_and_update().percentages();
            if let Some(percentages) = percentages {
                match format {
                    OutputFormat::Text => eprintln!("Loading {:.0}%", percentages),
                    OutputFormat::Json => tracing::info!("Loading {:.0}%", percentages),
                }
            }
        }
    });

    loader.load(request);

    let mut passwords = passwords.into_iter();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let outcome = answer_prompts(&mut loader, &source, &mut passwords, &mut stdin).await;

    progress.abort();
    loader.unmount();
    engine.shutdown()?;
    outcome?;

    let renderers = Renderers::new(|document: &PdfDocument| render_document(&source, document, format))
        .with_error(|error| match format {
            OutputFormat::Json => json!({ "status": "failed", "source": source, "error": error }).to_string(),
            OutputFormat::Text => format!("{}: {}", error.name, error.message),
        });

    match loader.render(&renderers) {
        LoaderView::Document(output) => {
            println!("{}", output);
            Ok(ExitCode::SUCCESS)
        }
        LoaderView::Error(output) => {
            match format {
                OutputFormat::Json => println!("{}", output),
                OutputFormat::Text => eprintln!("{}", output),
            }
            Ok(ExitCode::FAILURE)
        }
        other => bail!("Unexpected final view: {:?}", other),
    }
}

/// Drive the load to `Completed` or `Failed`, answering password prompts from
/// `passwords` first and from `stdin` after that.
async fn answer_prompts<E, R>(
    loader: &mut DocumentLoader<E>,
    source: &str,
    passwords: &mut impl Iterator<Item = String>,
    stdin: &mut tokio::io::Lines<R>,
) -> Result<()>
where
    E: DocumentEngine,
    R: tokio::io::AsyncBufRead + Unpin,
{
    loop {
        let status = loader.settle().await.clone();
        match &status {
            LoadingStatus::AskingForPassword { verify } | LoadingStatus::WrongPassword { verify } => {
                if verify.is_spent() {
                    // Answered already; only another event can move the status on.
                    if !loader.step().await {
                        bail!("Engine stopped without answering the password for {}", source);
                    }
                    continue;
                }
                let wrong = matches!(status, LoadingStatus::WrongPassword { .. });
                if wrong {
                    eprintln!("Incorrect password.");
                }

                let password = match passwords.next() {
                    Some(password) => password,
                    None => prompt_password(stdin, wrong).await?,
                };
                verify.verify(password)?;
            }
            LoadingStatus::Completed { .. } | LoadingStatus::Failed { .. } => return Ok(()),
            LoadingStatus::Loading { percentages } => {
                bail!("Engine stopped at {:.0}% without a result for {}", percentages, source)
            }
        }
    }
}

async fn prompt_password<R>(lines: &mut tokio::io::Lines<R>, wrong: bool) -> Result<String>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut stderr = tokio::io::stderr();
    let prompt = if wrong { "Try again: " } else { "Password: " };
    stderr.write_all(prompt.as_bytes()).await?;
    stderr.flush().await?;

    match lines.next_line().await? {
        Some(line) => Ok(line),
        None => bail!("The document is password protected and no password was given"),
    }
}

fn render_document(source: &str, document: &PdfDocument, format: OutputFormat) -> String {
    let info = document.info();
    match format {
        OutputFormat::Json => json!({ "status": "completed", "source": source, "document": info }).to_string(),
        OutputFormat::Text => {
            let mut lines = vec![
                format!("Loaded {}", source),
                format!("  version:   {}", info.version),
                format!("  pages:     {}", info.page_count),
                format!("  encrypted: {}", info.encrypted),
                format!("  bytes:     {}", info.byte_length),
            ];
            if let Some(title) = &info.title {
                lines.insert(1, format!("  title:     {}", title));
            }
            lines.join("\n")
        }
    }
}
