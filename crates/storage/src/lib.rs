use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use timeline::Calendar;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub mod document;

pub use document::{ConfigDocument, DocumentError};

/// Location string selecting the in-memory backend.
pub const MEMORY_LOCATION: &str = ":memory:";

/// Backend holding the raw configuration document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load(&self) -> Result<Value>;
    async fn save(&self, document: &Value) -> Result<()>;
    fn describe(&self) -> String;
}

/// `config.json` on disk. A missing file reads as an empty document; saves
/// replace the file atomically.
pub struct FileDocumentStore {
    path: PathBuf,
}

impl FileDocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_parent_dir_exists(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "config.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn load(&self) -> Result<Value> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "config file missing; using empty document");
                return Ok(Value::Object(Default::default()));
            }
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed to read '{}'", self.path.display()))
            }
        };
        if raw.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("'{}' is not valid JSON", self.path.display()))
    }

    async fn save(&self, document: &Value) -> Result<()> {
        let body = serde_json::to_string_pretty(document).context("failed to encode config")?;
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, body)
            .await
            .with_context(|| format!("failed to write '{}'", temp_path.display()))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .with_context(|| format!("failed to replace '{}'", self.path.display()))?;
        info!(path = %self.path.display(), "config saved");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    document: Mutex<Option<Value>>,
}

impl MemoryDocumentStore {
    pub fn with_document(document: Value) -> Self {
        Self {
            document: Mutex::new(Some(document)),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn load(&self) -> Result<Value> {
        Ok(self
            .document
            .lock()
            .await
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default())))
    }

    async fn save(&self, document: &Value) -> Result<()> {
        *self.document.lock().await = Some(document.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        MEMORY_LOCATION.to_string()
    }
}

#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn DocumentStore>,
}

impl Storage {
    /// `":memory:"` selects the in-memory backend, anything else is a file path.
    pub fn new(location: &str) -> Result<Self> {
        let location = location.trim();
        if location == MEMORY_LOCATION {
            return Ok(Self::from_backend(MemoryDocumentStore::default()));
        }
        if location.is_empty() {
            anyhow::bail!("config location cannot be empty");
        }
        Ok(Self::from_backend(FileDocumentStore::new(location)?))
    }

    pub fn from_backend(backend: impl DocumentStore + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn location(&self) -> String {
        self.backend.describe()
    }

    pub async fn health_check(&self) -> Result<()> {
        self.backend
            .load()
            .await
            .map(|_| ())
            .context("config document is not readable")
    }

    pub async fn load_raw(&self) -> Result<Value> {
        self.backend.load().await
    }

    pub async fn load_document(&self) -> Result<ConfigDocument> {
        let value = self.backend.load().await?;
        ConfigDocument::new(value)
            .with_context(|| format!("'{}' does not hold a JSON object", self.location()))
    }

    pub async fn save_document(&self, document: &ConfigDocument) -> Result<()> {
        self.backend.save(&document.to_value()).await
    }
}

/// Built-in season calendar unless `path` names a JSON calendar file.
pub fn load_calendar(path: Option<&Path>) -> Result<Calendar> {
    let Some(path) = path else {
        return Ok(Calendar::default_season());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read calendar '{}'", path.display()))?;
    let calendar = Calendar::from_json_str(&raw)
        .with_context(|| format!("invalid calendar '{}'", path.display()))?;
    info!(path = %path.display(), turns = calendar.turn_count(), "calendar loaded");
    Ok(calendar)
}

fn ensure_parent_dir_exists(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for config '{}'",
            parent.display(),
            path.display()
        )
    })?;

    Ok(())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
