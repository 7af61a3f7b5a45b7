use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::interfaces::storage::FileStorage;

/// In-memory storage for tests and platforms without file access.
/// Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryStorage {
    files: RwLock<HashMap<String, String>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl FileStorage for InMemoryStorage {
    async fn read_text(&self, name: &str) -> Result<Option<String>> {
        let guard = self.files.read().await;
        Ok(guard.get(name).cloned())
    }

    async fn write_text(&self, name: &str, content: &str) -> Result<()> {
        let mut guard = self.files.write().await;
        guard.insert(name.to_string(), content.to_string());
        Ok(())
    }

    fn file_path(&self, name: &str) -> String {
        format!("memory://{name}")
    }
}
