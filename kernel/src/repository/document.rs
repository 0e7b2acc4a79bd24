use async_trait::async_trait;
use shared::error::AppResult;
use std::sync::Arc;

use crate::model::{
    document::{DocumentId, DocumentMeta, Grid},
    session::AccessCredential,
};

/// External spreadsheet/drive store, as seen by one authenticated user.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_by_title(&self, title: &str) -> AppResult<Option<DocumentMeta>>;
    // Fails with `AppError::StaleDocument` when the id is no longer reachable.
    async fn get(&self, id: &DocumentId) -> AppResult<DocumentMeta>;
    async fn create(&self, title: &str, tabs: &[String]) -> AppResult<DocumentMeta>;
    async fn read_range(&self, id: &DocumentId, range: &str) -> AppResult<Grid>;
    async fn write_range(&self, id: &DocumentId, range: &str, values: Grid) -> AppResult<()>;
    // Read-only grant; granting twice succeeds.
    async fn share_reader(&self, id: &DocumentId, email: &str) -> AppResult<()>;
    // Revoking a user without a grant succeeds.
    async fn revoke(&self, id: &DocumentId, email: &str) -> AppResult<()>;
}

/// Builds a per-user [`DocumentStore`] from that user's credential.
#[async_trait]
pub trait DocumentStoreFactory: Send + Sync {
    async fn connect(&self, credential: &AccessCredential) -> AppResult<Arc<dyn DocumentStore>>;
}
