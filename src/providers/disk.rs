use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{MedMinderError, Result};
use crate::interfaces::storage::FileStorage;

/// File-per-blob storage rooted at a data directory.
pub struct DiskStorage {
    data_dir: PathBuf,
}

impl DiskStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| MedMinderError::Storage(e.to_string()))?;
        Ok(Self { data_dir })
    }
}

#[async_trait]
impl FileStorage for DiskStorage {
    async fn read_text(&self, name: &str) -> Result<Option<String>> {
        let path = self.data_dir.join(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MedMinderError::Storage(e.to_string())),
        }
    }

    async fn write_text(&self, name: &str, content: &str) -> Result<()> {
        let path = self.data_dir.join(name);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| MedMinderError::Storage(e.to_string()))
    }

    fn file_path(&self, name: &str) -> String {
        self.data_dir.join(name).to_string_lossy().into_owned()
    }
}
