use async_trait::async_trait;
use kernel::model::{
    document::{DocumentId, DocumentMeta, Grid},
    normalize_email,
    session::AccessCredential,
};
use kernel::repository::document::{DocumentStore, DocumentStoreFactory};
use parking_lot::Mutex;
use serde_json::Value;
use shared::error::{AppError, AppResult};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use super::parse_range;

#[derive(Debug, Default)]
struct StoredDocument {
    title: String,
    tab_order: Vec<String>,
    tabs: HashMap<String, Grid>,
    readers: BTreeSet<String>,
}

#[derive(Default)]
struct Workspace {
    documents: BTreeMap<DocumentId, StoredDocument>,
    failing_shares: BTreeSet<String>,
}

/// Process-local document store. Every user sees the same workspace, so a
/// workbook created through one credential is reachable through any other.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    workspace: Arc<Mutex<Workspace>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a workbook as if it had been deleted out-of-band.
    pub fn delete(&self, id: &DocumentId) -> bool {
        self.workspace.lock().documents.remove(id).is_some()
    }

    pub fn tab_values(&self, id: &DocumentId, tab: &str) -> Option<Grid> {
        self.workspace
            .lock()
            .documents
            .get(id)
            .and_then(|d| d.tabs.get(tab).cloned())
    }

    pub fn readers(&self, id: &DocumentId) -> BTreeSet<String> {
        self.workspace
            .lock()
            .documents
            .get(id)
            .map(|d| d.readers.clone())
            .unwrap_or_default()
    }

    pub fn document_count(&self) -> usize {
        self.workspace.lock().documents.len()
    }

    /// Makes every future grant to `email` fail.
    pub fn fail_shares_to(&self, email: &str) {
        self.workspace
            .lock()
            .failing_shares
            .insert(normalize_email(email));
    }

    fn meta(id: &DocumentId, doc: &StoredDocument) -> DocumentMeta {
        DocumentMeta {
            id: id.clone(),
            title: doc.title.clone(),
            sheets: doc.tab_order.clone(),
        }
    }
}

fn stale(id: &DocumentId) -> AppError {
    AppError::StaleDocument(id.to_string())
}

fn bad_range(range: &str) -> AppError {
    AppError::ExternalServiceError(format!("unable to parse range: {range}"))
}

fn is_blank(value: &Value) -> bool {
    matches!(value, Value::Null) || value.as_str().is_some_and(str::is_empty)
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_by_title(&self, title: &str) -> AppResult<Option<DocumentMeta>> {
        let workspace = self.workspace.lock();
        Ok(workspace
            .documents
            .iter()
            .find(|(_, d)| d.title == title)
            .map(|(id, d)| Self::meta(id, d)))
    }

    async fn get(&self, id: &DocumentId) -> AppResult<DocumentMeta> {
        let workspace = self.workspace.lock();
        let doc = workspace.documents.get(id).ok_or_else(|| stale(id))?;
        Ok(Self::meta(id, doc))
    }

    async fn create(&self, title: &str, tabs: &[String]) -> AppResult<DocumentMeta> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = DocumentId::new(format!("mem-{n}"));
        let doc = StoredDocument {
            title: title.to_string(),
            tab_order: tabs.to_vec(),
            tabs: tabs.iter().map(|t| (t.clone(), Grid::new())).collect(),
            readers: BTreeSet::new(),
        };
        let meta = Self::meta(&id, &doc);
        self.workspace.lock().documents.insert(id, doc);
        Ok(meta)
    }

    /// Trailing blank cells and rows are omitted, like the hosted store does.
    async fn read_range(&self, id: &DocumentId, range: &str) -> AppResult<Grid> {
        let (tab, last_col, rows) = parse_range(range).ok_or_else(|| bad_range(range))?;
        let workspace = self.workspace.lock();
        let doc = workspace.documents.get(id).ok_or_else(|| stale(id))?;
        let grid = doc.tabs.get(tab).ok_or_else(|| bad_range(range))?;

        let mut out: Grid = grid
            .iter()
            .take(rows)
            .map(|row| {
                let mut row: Vec<Value> = row.iter().take(last_col + 1).cloned().collect();
                while row.last().is_some_and(is_blank) {
                    row.pop();
                }
                row
            })
            .collect();
        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    async fn write_range(&self, id: &DocumentId, range: &str, values: Grid) -> AppResult<()> {
        let (tab, last_col, rows) = parse_range(range).ok_or_else(|| bad_range(range))?;
        if values.len() > rows || values.iter().any(|r| r.len() > last_col + 1) {
            return Err(AppError::ExternalServiceError(format!(
                "values exceed range {range}"
            )));
        }
        let mut workspace = self.workspace.lock();
        let doc = workspace.documents.get_mut(id).ok_or_else(|| stale(id))?;
        let grid = doc.tabs.get_mut(tab).ok_or_else(|| bad_range(range))?;

        if grid.len() < values.len() {
            grid.resize(values.len(), Vec::new());
        }
        for (r, row) in values.into_iter().enumerate() {
            let target = &mut grid[r];
            if target.len() < row.len() {
                target.resize(row.len(), Value::from(""));
            }
            for (c, v) in row.into_iter().enumerate() {
                target[c] = v;
            }
        }
        Ok(())
    }

    async fn share_reader(&self, id: &DocumentId, email: &str) -> AppResult<()> {
        let email = normalize_email(email);
        let mut workspace = self.workspace.lock();
        if workspace.failing_shares.contains(&email) {
            return Err(AppError::ExternalServiceError(format!(
                "sharing with {email} was rejected"
            )));
        }
        let doc = workspace.documents.get_mut(id).ok_or_else(|| stale(id))?;
        doc.readers.insert(email);
        Ok(())
    }

    async fn revoke(&self, id: &DocumentId, email: &str) -> AppResult<()> {
        let email = normalize_email(email);
        let mut workspace = self.workspace.lock();
        let doc = workspace.documents.get_mut(id).ok_or_else(|| stale(id))?;
        doc.readers.remove(&email);
        Ok(())
    }
}

/// Hands out the same shared store to every credential that carries a token.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStoreFactory {
    store: InMemoryDocumentStore,
}

impl InMemoryDocumentStoreFactory {
    pub fn new(store: InMemoryDocumentStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DocumentStoreFactory for InMemoryDocumentStoreFactory {
    async fn connect(&self, credential: &AccessCredential) -> AppResult<Arc<dyn DocumentStore>> {
        if !credential.is_usable() {
            return Err(AppError::ServiceInitError("missing access token".into()));
        }
        Ok(Arc::new(self.store.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn written_values_read_back_without_trailing_blanks() -> anyhow::Result<()> {
        let store = InMemoryDocumentStore::new();
        let doc = store.create("Book", &["MAJ".to_string()]).await?;
        store
            .write_range(
                &doc.id,
                "MAJ!A1:C3",
                vec![
                    vec![json!("a"), json!("b"), json!("")],
                    vec![json!(""), json!(""), json!("")],
                    vec![json!("c")],
                ],
            )
            .await?;

        let read = store.read_range(&doc.id, "MAJ!A1:Z50").await?;
        assert_eq!(
            read,
            vec![vec![json!("a"), json!("b")], vec![], vec![json!("c")]]
        );
        Ok(())
    }

    #[tokio::test]
    async fn deleted_document_is_stale() -> anyhow::Result<()> {
        let store = InMemoryDocumentStore::new();
        let doc = store.create("Book", &["MAJ".to_string()]).await?;
        assert!(store.delete(&doc.id));
        assert!(matches!(
            store.get(&doc.id).await.unwrap_err(),
            AppError::StaleDocument(_)
        ));
        assert!(store.find_by_title("Book").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn sharing_is_idempotent() -> anyhow::Result<()> {
        let store = InMemoryDocumentStore::new();
        let doc = store.create("Book", &[]).await?;
        store.share_reader(&doc.id, "Alice@example.com").await?;
        store.share_reader(&doc.id, "alice@example.com").await?;
        assert_eq!(store.readers(&doc.id).len(), 1);
        store.revoke(&doc.id, "alice@example.com").await?;
        store.revoke(&doc.id, "alice@example.com").await?;
        assert!(store.readers(&doc.id).is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn factory_rejects_empty_token() {
        let factory = InMemoryDocumentStoreFactory::default();
        let credential = AccessCredential {
            access_token: " ".into(),
            refresh_token: None,
            expires_at: None,
        };
        assert!(matches!(
            factory.connect(&credential).await.err(),
            Some(AppError::ServiceInitError(_))
        ));
    }
}
