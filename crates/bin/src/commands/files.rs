//! File commands.

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use mycloud::{
    Client, FileRecord,
    http::{ProgressFn, UploadPayload},
};
use serde_json::json;

use super::{CommandResult, require_session};
use crate::{
    cli::FilesCommand,
    output::{OutputFormat, format_size, format_timestamp, print_json, print_table},
};

pub async fn run(client: &Client, command: FilesCommand, format: OutputFormat) -> CommandResult {
    require_session(client).await?;
    match command {
        FilesCommand::List => list(client, format).await,
        FilesCommand::Upload {
            path,
            comment,
            name,
        } => upload(client, &path, comment, name, format).await,
        FilesCommand::Download { id, output } => download(client, id, output, format).await,
        FilesCommand::Rename { id, name } => {
            client.files().rename(id, &name).await?;
            done(format, &format!("Renamed file {id} to {name}"), id)
        }
        FilesCommand::Comment { id, comment } => {
            client.files().update_comment(id, &comment).await?;
            done(format, &format!("Updated comment on file {id}"), id)
        }
        FilesCommand::Delete { id } => {
            client.files().delete(id).await?;
            done(format, &format!("Deleted file {id}"), id)
        }
    }
}

fn done(format: OutputFormat, message: &str, id: u64) -> CommandResult {
    match format {
        OutputFormat::Human => println!("{message}"),
        OutputFormat::Json => print_json(&json!({ "ok": true, "id": id }))?,
    }
    Ok(())
}

/// Render files as a table, or as JSON with public URLs resolved.
pub fn print_files(client: &Client, files: &[FileRecord], format: OutputFormat) -> CommandResult {
    match format {
        OutputFormat::Human => {
            let rows: Vec<Vec<String>> = files
                .iter()
                .map(|f| {
                    vec![
                        f.id.to_string(),
                        f.original_name.clone(),
                        format_size(f.size),
                        format_timestamp(f.uploaded_at.as_deref()),
                        format_timestamp(f.last_download.as_deref()),
                        f.comment.clone(),
                    ]
                })
                .collect();
            print_table(
                &["ID", "NAME", "SIZE", "UPLOADED", "LAST DOWNLOAD", "COMMENT"],
                &rows,
                "No files.",
            );
        }
        OutputFormat::Json => {
            let mut entries = Vec::with_capacity(files.len());
            for file in files {
                let mut entry = serde_json::to_value(file)?;
                entry["public_url"] = json!(client.files().public_url(file)?.map(String::from));
                entries.push(entry);
            }
            print_json(&entries)?;
        }
    }
    Ok(())
}

async fn list(client: &Client, format: OutputFormat) -> CommandResult {
    let files = client.files().list().await?;
    print_files(client, &files, format)
}

async fn upload(
    client: &Client,
    path: &Path,
    comment: String,
    name: Option<String>,
    format: OutputFormat,
) -> CommandResult {
    let name = match name {
        Some(name) => name,
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| format!("{} has no file name", path.display()))?,
    };
    let data = tokio::fs::read(path).await?;
    let payload = UploadPayload::new(name, data).with_comment(comment);

    let on_progress: Option<ProgressFn> = match format {
        OutputFormat::Human => Some(Arc::new(|percent: u8| {
            eprint!("\ruploading... {percent:>3}%");
            let _ = std::io::stderr().flush();
        })),
        OutputFormat::Json => None,
    };
    let created = client.files().upload(payload, on_progress).await;
    if format == OutputFormat::Human {
        eprintln!();
    }
    print_files(client, &created?, format)
}

async fn download(
    client: &Client,
    id: u64,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> CommandResult {
    let target = match output {
        Some(path) => path,
        None => {
            let files = client.files().list().await?;
            let file = files
                .iter()
                .find(|f| f.id == id)
                .ok_or_else(|| format!("file {id} not found"))?;
            PathBuf::from(&file.original_name)
        }
    };

    let bytes = client.files().download(id).await?;
    tokio::fs::write(&target, &bytes).await?;

    match format {
        OutputFormat::Human => println!(
            "Saved {} to {}",
            format_size(bytes.len() as u64),
            target.display()
        ),
        OutputFormat::Json => print_json(&json!({
            "id": id,
            "path": target,
            "size": bytes.len(),
        }))?,
    }
    Ok(())
}
