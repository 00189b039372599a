//! Model download and management.

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::LocalAIError;
use crate::paths;
use crate::{DEFAULT_MODEL_FILENAME, DEFAULT_MODEL_NAME, DEFAULT_REPO_ID};

/// Model registry entry.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Display name of the model.
    pub name: String,
    /// Filename on disk.
    pub filename: String,
    /// Download URL.
    pub url: String,
    /// Expected SHA256 checksum (optional).
    pub sha256: Option<String>,
    /// Size in bytes (for progress display).
    pub size_bytes: Option<u64>,
}

impl ModelInfo {
    /// Describe a file stored in a Hugging Face Hub repository.
    pub fn from_hub(repo_id: &str, filename: &str) -> Self {
        let name = filename.trim_end_matches(".gguf").to_string();
        Self {
            name,
            filename: filename.to_string(),
            url: format!("https://huggingface.co/{}/resolve/main/{}", repo_id, filename),
            sha256: None,
            size_bytes: None,
        }
    }

    /// Attach an expected checksum.
    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }
}

/// Manager for downloading and managing models.
pub struct ModelManager {
    client: reqwest::Client,
    models_dir: PathBuf,
}

impl ModelManager {
    /// Create a model manager over the default models directory.
    pub fn new() -> Self {
        Self::with_dir(paths::models_dir())
    }

    /// Create a model manager over a custom directory.
    pub fn with_dir(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            models_dir: models_dir.into(),
        }
    }

    /// Directory this manager stores models in.
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Get the default CodeLlama model info.
    pub fn default_model() -> ModelInfo {
        let mut model = ModelInfo::from_hub(DEFAULT_REPO_ID, DEFAULT_MODEL_FILENAME);
        model.name = DEFAULT_MODEL_NAME.to_string();
        model
    }

    /// Path a model file would occupy in this manager's directory.
    pub fn model_path(&self, filename: &str) -> PathBuf {
        self.models_dir.join(filename)
    }

    /// List all installed models.
    pub fn list_installed(&self) -> Result<Vec<String>, LocalAIError> {
        if !self.models_dir.exists() {
            return Ok(vec![]);
        }

        let mut models: Vec<String> = fs::read_dir(&self.models_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .map(|ext| ext == "gguf")
                    .unwrap_or(false)
            })
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .map(|s| s.trim_end_matches(".gguf").to_string())
            })
            .collect();
        models.sort();

        Ok(models)
    }

    /// Check if a model is installed.
    pub fn is_installed(&self, filename: &str) -> bool {
        self.model_path(filename).exists()
    }

    /// Get the path to an installed model.
    pub fn get_model_path(&self, filename: &str) -> Option<PathBuf> {
        let path = self.model_path(filename);
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Return the local path of a model, downloading it first if needed.
    pub async fn ensure(&self, model: &ModelInfo) -> Result<PathBuf, LocalAIError> {
        if let Some(path) = self.get_model_path(&model.filename) {
            debug!("Model '{}' already present at {:?}", model.name, path);
            return Ok(path);
        }
        self.download(model).await
    }

    /// Download a model from URL.
    ///
    /// Bytes are streamed into a `.part` file that is renamed into place once
    /// the transfer (and checksum, when known) succeeds.
    pub async fn download(&self, model: &ModelInfo) -> Result<PathBuf, LocalAIError> {
        fs::create_dir_all(&self.models_dir)?;

        let dest_path = self.model_path(&model.filename);
        let part_path = self.model_path(&format!("{}.part", model.filename));

        info!("Downloading model '{}' to {:?}", model.name, dest_path);

        let response = self
            .client
            .get(&model.url)
            .send()
            .await
            .map_err(|e| LocalAIError::DownloadFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LocalAIError::DownloadFailed(format!(
                "HTTP {}: {}",
                response.status(),
                model.url
            )));
        }

        let total_size = response.content_length().or(model.size_bytes);
        let pb = progress_bar(total_size);

        let hasher = match write_stream(response, &part_path, &pb).await {
            Ok(hasher) => hasher,
            Err(e) => {
                pb.abandon();
                let _ = fs::remove_file(&part_path);
                return Err(e);
            }
        };

        pb.finish_with_message("Download complete");

        if let Some(expected) = &model.sha256 {
            let actual = hex::encode(hasher.finalize());
            if !actual.eq_ignore_ascii_case(expected) {
                let _ = fs::remove_file(&part_path);
                return Err(LocalAIError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
            debug!("Checksum verified: {}", actual);
        }

        fs::rename(&part_path, &dest_path)?;

        info!("Model '{}' downloaded successfully", model.name);
        Ok(dest_path)
    }

    /// Download the default model.
    pub async fn download_default(&self) -> Result<PathBuf, LocalAIError> {
        let model = Self::default_model();
        self.download(&model).await
    }

    /// Install a model from a local file path.
    pub fn install_from_path(&self, source: &Path) -> Result<PathBuf, LocalAIError> {
        fs::create_dir_all(&self.models_dir)?;

        let filename = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| LocalAIError::ModelNotFound(source.display().to_string()))?;

        if !source.exists() {
            return Err(LocalAIError::ModelNotFound(source.display().to_string()));
        }

        let dest_path = self.model_path(filename);

        if source == dest_path {
            return Ok(dest_path);
        }

        info!("Installing model from {:?} to {:?}", source, dest_path);
        fs::copy(source, &dest_path)?;

        Ok(dest_path)
    }

    /// Remove an installed model.
    pub fn remove(&self, filename: &str) -> Result<(), LocalAIError> {
        let path = self.model_path(filename);
        if path.exists() {
            fs::remove_file(&path)?;
            info!("Removed model: {}", filename);
        }
        Ok(())
    }
}

impl Default for ModelManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream a response body into `path`, hashing as it goes.
async fn write_stream(
    response: reqwest::Response,
    path: &Path,
    pb: &ProgressBar,
) -> Result<Sha256, LocalAIError> {
    let mut file = File::create(path)?;
    let mut hasher = Sha256::new();
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| LocalAIError::DownloadFailed(e.to_string()))?;
        file.write_all(&chunk)?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }
    file.flush()?;
    Ok(hasher)
}

fn progress_bar(total_size: Option<u64>) -> ProgressBar {
    match total_size {
        Some(size) => {
            let pb = ProgressBar::new(size);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                 {bytes}/{total_bytes} ({eta})",
            ) {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {bytes} downloaded")
            {
                pb.set_style(style);
            }
            pb
        }
    }
}
