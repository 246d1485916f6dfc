use chrono::{DateTime, Utc};
use clap::Parser;
use colored::*;
use directories::ProjectDirs;
use paperstore::api::{CmdMessage, CoverSource, MessageLevel, PaperApi};
use paperstore::config::{StoreConfig, KEYS};
use paperstore::error::{PaperError, Result};
use paperstore::model::{DocumentRecord, NewDocument, PDF_MIME, PNG_MIME};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod args;
use args::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let root = match cli.root {
        Some(root) => root,
        None => default_root()?,
    };
    let config = StoreConfig::load(&root)?;

    let command = match cli.command {
        // Config edits don't need the store open.
        Some(Commands::Config { key, value }) => {
            return handle_config(&root, config, key, value).await;
        }
        other => other,
    };

    let api = PaperApi::open(&root, &config).await?;
    let outcome = match command {
        Some(Commands::Add {
            file,
            title,
            tags,
            cover,
        }) => handle_add(&api, file, title, tags, cover).await,
        Some(Commands::List) | None => handle_list(&api).await,
        Some(Commands::Show { id }) => handle_show(&api, &id).await,
        Some(Commands::Rm { id }) => handle_rm(&api, &id).await,
        Some(Commands::Cover { id, out }) => handle_cover(&api, &id, out).await,
        Some(Commands::File { id }) => handle_file(&api, &id).await,
        Some(Commands::Doctor) => handle_doctor(&api).await,
        Some(Commands::Health) => handle_health(&api),
        Some(Commands::Config { .. }) => Ok(()),
    };
    api.shutdown().await;
    outcome
}

fn default_root() -> Result<PathBuf> {
    ProjectDirs::from("com", "paperstore", "paperstore")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| PaperError::Store("Could not determine data directory".into()))
}

async fn handle_add(
    api: &PaperApi,
    file: PathBuf,
    title: Option<String>,
    tags: String,
    cover: Option<PathBuf>,
) -> Result<()> {
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut upload = NewDocument::pdf(&file, filename)
        .with_title(title.unwrap_or_default())
        .with_tags(tags);
    upload.content_type = mime_for(&file).to_string();
    if let Some(cover) = cover {
        let mime = mime_for(&cover);
        upload = upload.with_cover(cover, mime);
    }

    let result = api.create_document(upload).await?;
    for record in &result.documents {
        println!("{}", record.id);
    }
    print_messages(&result.messages);
    Ok(())
}

async fn handle_list(api: &PaperApi) -> Result<()> {
    let result = api.list_documents().await?;
    print_documents(&result.documents);
    print_messages(&result.messages);
    Ok(())
}

async fn handle_show(api: &PaperApi, id: &str) -> Result<()> {
    let result = api.get_document(id).await?;
    for record in &result.documents {
        println!("{}", serde_json::to_string_pretty(record)?);
    }
    print_messages(&result.messages);
    Ok(())
}

async fn handle_rm(api: &PaperApi, id: &str) -> Result<()> {
    let result = api.delete_document(id).await?;
    print_messages(&result.messages);
    Ok(())
}

async fn handle_cover(api: &PaperApi, id: &str, out: Option<PathBuf>) -> Result<()> {
    let result = api.cover(id).await?;
    match (&result.cover, out) {
        (Some(CoverSource::File(path)), Some(out)) => {
            tokio::fs::copy(path, &out).await?;
            println!("{}", out.display());
        }
        (Some(CoverSource::Builtin(bytes)), Some(out)) => {
            tokio::fs::write(&out, *bytes).await?;
            println!("{}", out.display());
        }
        (Some(CoverSource::File(path)), None) => println!("{}", path.display()),
        (Some(CoverSource::Builtin(_)), None) => println!("{}", "(built-in placeholder)".dimmed()),
        (None, _) => {}
    }
    print_messages(&result.messages);
    Ok(())
}

async fn handle_file(api: &PaperApi, id: &str) -> Result<()> {
    let result = api.document_file(id).await?;
    if let Some(file) = &result.file {
        println!("{}", file.path.display());
    }
    print_messages(&result.messages);
    Ok(())
}

async fn handle_doctor(api: &PaperApi) -> Result<()> {
    let result = api.doctor().await?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_health(api: &PaperApi) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&api.health())?);
    Ok(())
}

async fn handle_config(
    root: &Path,
    mut config: StoreConfig,
    key: Option<String>,
    value: Option<String>,
) -> Result<()> {
    match (key, value) {
        (None, _) => {
            for key in KEYS {
                println!("{} = {}", key, config.get(key)?);
            }
        }
        (Some(key), None) => println!("{} = {}", key, config.get(&key)?),
        (Some(key), Some(value)) => {
            config.set(&key, &value)?;
            config.save(root).await?;
            print_messages(&[CmdMessage::success(format!(
                "{} = {}",
                key,
                config.get(&key)?
            ))]);
        }
    }
    Ok(())
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => PDF_MIME,
        Some("png") => PNG_MIME,
        _ => "application/octet-stream",
    }
}

fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
        }
    }
}

const TITLE_WIDTH: usize = 48;

fn print_documents(documents: &[DocumentRecord]) {
    if documents.is_empty() {
        println!("No documents found.");
        return;
    }

    for record in documents {
        let title = truncate(&record.title, TITLE_WIDTH);
        let padding = TITLE_WIDTH.saturating_sub(title.chars().count());
        let tags = if record.tags.is_empty() {
            String::new()
        } else {
            format!("[{}] ", record.tags.join(", "))
        };
        println!(
            "{}  {}{}  {}{}",
            record.id.to_string().yellow(),
            title,
            " ".repeat(padding),
            tags.cyan(),
            format_time_ago(record.uploaded_at).dimmed()
        );
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    timeago::Formatter::new().convert(duration.to_std().unwrap_or_default())
}
