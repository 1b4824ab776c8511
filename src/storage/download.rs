//! Model downloader
//!
//! Fetches GGUF model files over HTTP, Hugging Face URLs included.

use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::storage::StorageError;

/// The model the server is built around
pub const DEFAULT_MODEL_URL: &str = "https://huggingface.co/TheBloke/TinyLlama-1.1B-Chat-v1.0-GGUF/resolve/main/tinyllama-1.1b-chat-v1.0.Q4_K_M.gguf";

/// Location of a file in a Hugging Face repository
#[derive(Debug, Clone, PartialEq)]
pub struct HuggingFaceUrl {
    pub repo_id: String,
    pub filename: String,
    pub revision: String,
}

impl HuggingFaceUrl {
    /// Parse the supported URL forms
    ///
    /// - `https://huggingface.co/user/repo/resolve/main/model.gguf`
    /// - `https://huggingface.co/user/repo/blob/main/model.gguf`
    /// - `user/repo/model.gguf`
    pub fn parse(url: &str) -> Result<Self, StorageError> {
        let url = url.trim();
        let url = url.split('?').next().unwrap_or(url);
        let url = url.split('#').next().unwrap_or(url);

        let path = url
            .strip_prefix("https://huggingface.co/")
            .or_else(|| url.strip_prefix("http://huggingface.co/"))
            .unwrap_or(url);
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        if parts.len() < 3 {
            return Err(StorageError::InvalidUrl(format!(
                "expected user/repo/file, got {url:?}"
            )));
        }

        let repo_id = format!("{}/{}", parts[0], parts[1]);
        if let Some(pos) = parts.iter().position(|&p| p == "blob" || p == "resolve") {
            if parts.len() > pos + 2 {
                return Ok(Self {
                    repo_id,
                    revision: parts[pos + 1].to_string(),
                    filename: parts[pos + 2..].join("/"),
                });
            }
            return Err(StorageError::InvalidUrl(format!("no file in {url:?}")));
        }

        Ok(Self {
            repo_id,
            filename: parts[2..].join("/"),
            revision: "main".to_string(),
        })
    }

    /// Direct download URL of the file
    pub fn download_url(&self) -> String {
        format!(
            "https://huggingface.co/{}/resolve/{}/{}",
            self.repo_id, self.revision, self.filename
        )
    }

    /// File name to store the download under
    pub fn local_filename(&self) -> Result<String, StorageError> {
        sanitize_local_filename(&self.filename)
    }
}

fn sanitize_local_filename(filename: &str) -> Result<String, StorageError> {
    let base = filename
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let mut sanitized: String = base
        .chars()
        .map(|ch| {
            if matches!(ch, '<' | '>' | ':' | '"' | '|' | '?' | '*') || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect();
    while sanitized.ends_with('.') || sanitized.ends_with(' ') {
        sanitized.pop();
    }

    if sanitized.is_empty() {
        return Err(StorageError::InvalidUrl(format!(
            "no usable file name in {filename:?}"
        )));
    }
    Ok(sanitized)
}

/// Download a model into `dest_dir`, returning the final path
///
/// The body is written to `<name>.tmp` and renamed once complete. A non-empty
/// file already at the destination is returned as-is.
pub async fn download_model(
    url: &str,
    dest_dir: &Path,
    progress: impl Fn(u64, Option<u64>),
) -> Result<PathBuf, StorageError> {
    let hf_url = HuggingFaceUrl::parse(url)?;
    let filename = hf_url.local_filename()?;

    fs::create_dir_all(dest_dir).await?;
    let output_path = dest_dir.join(&filename);
    let temp_path = dest_dir.join(format!("{filename}.tmp"));

    if let Ok(metadata) = fs::metadata(&output_path).await {
        if metadata.len() > 0 {
            tracing::info!("Model already present: {:?}", output_path);
            return Ok(output_path);
        }
    }

    let download_url = hf_url.download_url();
    tracing::info!("Downloading model from {}", download_url);
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(3600))
        .build()?;
    let response = client
        .get(&download_url)
        .header(
            "User-Agent",
            concat!("tinyllama-api/", env!("CARGO_PKG_VERSION")),
        )
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(StorageError::DownloadFailed(format!(
            "HTTP {} for {}",
            response.status(),
            download_url
        )));
    }

    let total_size = response.content_length();
    if let Some(total) = total_size {
        tracing::info!("File size: {} MB", total / 1024 / 1024);
    }

    let mut file = File::create(&temp_path).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        progress(downloaded, total_size);
    }
    file.flush().await?;
    drop(file);

    if let Some(total) = total_size {
        if downloaded != total {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::DownloadFailed(format!(
                "incomplete download: got {downloaded} bytes, expected {total}"
            )));
        }
    }

    fs::rename(&temp_path, &output_path).await?;
    tracing::info!("Download complete: {:?}", output_path);
    Ok(output_path)
}

/// Human-readable byte size
pub fn format_size(bytes: u64) -> String {
    let bytes = bytes as f64;
    if bytes < 1024.0 {
        format!("{} B", bytes as u64)
    } else if bytes < 1024.0 * 1024.0 {
        format!("{:.2} KB", bytes / 1024.0)
    } else if bytes < 1024.0 * 1024.0 * 1024.0 {
        format!("{:.2} MB", bytes / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes / (1024.0 * 1024.0 * 1024.0))
    }
}
