use async_trait::async_trait;

use crate::error::Result;

/// Text-blob persistence keyed by logical file name.
///
/// Writes replace the whole blob; there is no partial-update format. A
/// missing blob reads as `None`.
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn read_text(&self, name: &str) -> Result<Option<String>>;
    async fn write_text(&self, name: &str, content: &str) -> Result<()>;
    fn file_path(&self, name: &str) -> String;
}
