//! Pagemark command line
//!
//! Entry point. Handles CLI argument parsing, logging initialization and
//! dispatch to the render, pages, watch, break and enhance commands.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pagemark::config::{AppConfig, FontChoice};
use pagemark::editor::DocumentBuffer;
use pagemark::enhance::{apply_enhancement, CommandEnhancer, EnhanceAction};
use pagemark::error::{AppError, ConfigError, EnhanceError, ExportError, FileError, WatcherError};
use pagemark::export::{
    document_html, suggest_output_path, ExportFormat, Exporter, HtmlDocumentOptions,
};
use pagemark::file_handler::{read_file, write_file_atomic, DocumentWatcher, WatchEvent};
use pagemark::layout::{PaginatedDocument, Paginator};
use pagemark::session::{PreviewFrame, PreviewSession};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Default log filter when RUST_LOG is unset
const DEFAULT_LOG_FILTER: &str = "info,pagemark=debug";

#[derive(Parser)]
#[command(name = "pagemark")]
#[command(version)]
#[command(about = "Paginated preview and export for markdown documents", long_about = None)]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay out a document and export it as paginated HTML or PDF
    Render {
        /// Input markdown file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to the input name with the format's extension)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format (inferred from the output extension if omitted)
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,

        /// Preview font
        #[arg(long, value_enum)]
        font: Option<FontChoice>,

        /// Document title
        #[arg(long)]
        title: Option<String>,

        /// Extra stylesheet appended to the built-in page styles
        #[arg(long, value_name = "FILE")]
        css: Option<PathBuf>,
    },

    /// Print the page partition of a document
    Pages {
        /// Input markdown file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Preview font
        #[arg(long, value_enum)]
        font: Option<FontChoice>,

        /// Print the full layout as JSON
        #[arg(long)]
        json: bool,
    },

    /// Keep a paginated HTML preview in sync with a document
    Watch {
        /// Input markdown file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Preview HTML file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Preview font
        #[arg(long, value_enum)]
        font: Option<FontChoice>,
    },

    /// Insert an explicit page break before a line
    #[command(name = "break")]
    PageBreak {
        /// Input markdown file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// 1-based line the new page starts at (appends if past the end)
        #[arg(long)]
        line: usize,

        /// Output file (defaults to rewriting the input)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Rewrite a document with the configured enhancement command
    Enhance {
        /// Input markdown file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Enhancement to apply
        #[arg(long, value_enum)]
        action: EnhanceAction,

        /// Output file (defaults to rewriting the input)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {}", user_message(&e));
            ExitCode::FAILURE
        }
    }
}

/// Initialize the logging system
fn init_logging() {
    let env = env_logger::Env::default().default_filter_or(DEFAULT_LOG_FILTER);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();
}

/// Friendliest message available for an error chain
fn user_message(error: &anyhow::Error) -> String {
    if let Some(e) = error.downcast_ref::<AppError>() {
        return e.user_message();
    }
    if let Some(e) = error.downcast_ref::<FileError>() {
        return e.user_message();
    }
    if let Some(e) = error.downcast_ref::<ExportError>() {
        return e.user_message();
    }
    if let Some(e) = error.downcast_ref::<EnhanceError>() {
        return e.user_message();
    }
    if let Some(e) = error.downcast_ref::<ConfigError>() {
        return e.to_string();
    }
    if let Some(e) = error.downcast_ref::<WatcherError>() {
        return e.to_string();
    }
    format!("{:#}", error)
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => AppConfig::load()?,
    };
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Render {
            input,
            output,
            format,
            font,
            title,
            css,
        } => {
            let custom_css = match css {
                Some(path) => Some(read_file(&path).await?.content),
                None => None,
            };
            let options = HtmlDocumentOptions { title, custom_css };
            render(&config, &input, output, format, font, &options).await
        }
        Commands::Pages { input, font, json } => pages(&config, &input, font, json).await,
        Commands::Watch {
            input,
            output,
            font,
        } => watch_document(&config, &input, &output, font).await,
        Commands::PageBreak {
            input,
            line,
            output,
        } => page_break(&input, line, output.as_deref()).await,
        Commands::Enhance {
            input,
            action,
            output,
        } => enhance(&config, &input, action, output.as_deref()).await,
    }
}

async fn layout_file(
    config: &AppConfig,
    input: &Path,
    font: FontChoice,
) -> Result<PaginatedDocument> {
    let source = read_file(input).await?;
    let paginator = Paginator::new(config.page.clone());
    let today = chrono::Local::now().date_naive();
    paginator
        .layout(&source.content, font, today)
        .context("page measurement is unavailable")
}

async fn render(
    config: &AppConfig,
    input: &Path,
    output: Option<PathBuf>,
    format: Option<ExportFormat>,
    font: Option<FontChoice>,
    options: &HtmlDocumentOptions,
) -> Result<()> {
    let exporter = Exporter::new(config.export.clone());
    let format = format.unwrap_or_else(|| match &output {
        Some(path) => exporter.format_for(path),
        None => config.export.default_format,
    });
    let output = output.unwrap_or_else(|| suggest_output_path(input, format));

    let document = layout_file(config, input, font.unwrap_or(config.preview.font)).await?;
    exporter.export(&document, &output, format, options).await?;
    println!("{}", output.display());
    Ok(())
}

async fn pages(
    config: &AppConfig,
    input: &Path,
    font: Option<FontChoice>,
    json: bool,
) -> Result<()> {
    let document = layout_file(config, input, font.unwrap_or(config.preview.font)).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    let max_height = document.geometry.max_content_height_px();
    for page in &document.pages {
        let overflow = if page.page.overflows(max_height) {
            " (overflows)"
        } else {
            ""
        };
        println!(
            "{}: {} block(s), {:.0}px of {:.0}px{}",
            page.footer,
            page.page.blocks.len(),
            page.page.content_height,
            max_height,
            overflow
        );
    }
    Ok(())
}

/// Rewrite the preview file whenever the session publishes a new layout
async fn write_previews(
    mut frames: watch::Receiver<Option<Arc<PreviewFrame>>>,
    output: PathBuf,
) {
    let options = HtmlDocumentOptions::default();
    while frames.changed().await.is_ok() {
        let frame = frames.borrow_and_update().clone();
        let Some(frame) = frame else { continue };
        let html = document_html(&frame.document, &options);
        match write_file_atomic(&output, &html).await {
            Ok(()) => log::info!(
                "preview updated: {} page(s), version {}",
                frame.document.page_count(),
                frame.version
            ),
            Err(e) => log::error!("could not write preview: {}", e),
        }
    }
}

async fn watch_document(
    config: &AppConfig,
    input: &Path,
    output: &Path,
    font: Option<FontChoice>,
) -> Result<()> {
    let paginator = Paginator::new(config.page.clone());
    let session = PreviewSession::from_config(paginator, &config.preview);
    if let Some(font) = font {
        session.set_font(font);
    }
    let writer = tokio::spawn(write_previews(session.subscribe(), output.to_path_buf()));

    session.set_text(read_file(input).await?.content);
    let mut watcher = DocumentWatcher::new(input)?;
    let quiet = Duration::from_millis(config.preview.debounce_ms);
    println!(
        "Watching {} -> {} (Ctrl+C to stop)",
        input.display(),
        output.display()
    );

    loop {
        tokio::select! {
            event = watcher.next_change(quiet) => match event {
                Some(WatchEvent::Modified(path)) => match read_file(&path).await {
                    Ok(source) => {
                        let version = session.set_text(source.content);
                        log::info!("{} changed (version {})", path.display(), version);
                    }
                    Err(e) => log::warn!("could not reload {}: {}", path.display(), e),
                },
                Some(WatchEvent::Removed(path)) => {
                    log::warn!("{} was removed; keeping the last preview", path.display());
                }
                Some(WatchEvent::Error(e)) => log::warn!("watcher error: {}", e),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                log::info!("stopping watch");
                break;
            }
        }
    }

    drop(session);
    let _ = writer.await;
    Ok(())
}

async fn page_break(input: &Path, line: usize, output: Option<&Path>) -> Result<()> {
    let source = read_file(input).await?;
    let mut buffer = DocumentBuffer::from_text(&source.content);
    let idx = buffer
        .line_col_to_char(line.saturating_sub(1), 0)
        .unwrap_or_else(|| buffer.len_chars());
    buffer.insert_page_break(idx);

    let output = output.unwrap_or(input);
    write_file_atomic(output, &buffer.text()).await?;
    log::info!("page break inserted at line {} of {}", line, output.display());
    Ok(())
}

async fn enhance(
    config: &AppConfig,
    input: &Path,
    action: EnhanceAction,
    output: Option<&Path>,
) -> Result<()> {
    let enhancer = CommandEnhancer::from_config(&config.enhance)?;
    let source = read_file(input).await?;
    let mut buffer = DocumentBuffer::from_text(&source.content);

    let (buffer, result) = tokio::task::spawn_blocking(move || {
        let result = apply_enhancement(&mut buffer, &enhancer, action);
        (buffer, result)
    })
    .await?;
    result?;

    let output = output.unwrap_or(input);
    write_file_atomic(output, &buffer.text()).await?;
    println!("{}: {}", action.display_name(), output.display());
    Ok(())
}
