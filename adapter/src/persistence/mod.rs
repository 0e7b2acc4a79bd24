use kernel::model::snapshot::{EmployeeShops, EmployerShops, RegistrySnapshot};
use kernel::repository::shop::ShopRepository;
use serde::{de::DeserializeOwned, Serialize};
use shared::error::{AppError, AppResult};
use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

pub const EMPLOYER_SHOPS_FILE: &str = "shops_data.json";
pub const EMPLOYEE_SHOPS_FILE: &str = "employee_shops_data.json";

/// Two JSON files in one directory, one per registry map.
#[derive(Debug, Clone)]
pub struct DurableStore {
    dir: PathBuf,
}

impl DurableStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Missing or empty files load as empty maps. A reverse index that
    /// disagrees with the rosters is rebuilt from the rosters.
    pub fn load(&self) -> AppResult<RegistrySnapshot> {
        let employer_shops: EmployerShops = read_json(&self.dir.join(EMPLOYER_SHOPS_FILE))?;
        let employee_shops: EmployeeShops = read_json(&self.dir.join(EMPLOYEE_SHOPS_FILE))?;
        let mut snapshot = RegistrySnapshot {
            employer_shops,
            employee_shops,
        };

        if snapshot.reconcile() {
            tracing::warn!(
                dir = %self.dir.display(),
                "employee index disagreed with shop rosters; rebuilt from rosters"
            );
        }
        tracing::info!(
            employers = snapshot.employer_shops.len(),
            employees = snapshot.employee_shops.len(),
            "loaded registry"
        );
        Ok(snapshot)
    }

    /// Each file is replaced atomically; a crash leaves either the old or
    /// the new content, never a torn file.
    pub fn save(&self, snapshot: &RegistrySnapshot) -> AppResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(persistence_error)?;
        write_json_atomic(&self.dir, EMPLOYER_SHOPS_FILE, &snapshot.employer_shops)?;
        write_json_atomic(&self.dir, EMPLOYEE_SHOPS_FILE, &snapshot.employee_shops)?;
        Ok(())
    }
}

fn persistence_error(e: impl std::fmt::Display) -> AppError {
    AppError::PersistenceError(e.to_string())
}

fn read_json<T: DeserializeOwned + Default>(path: &Path) -> AppResult<T> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(persistence_error(format!("{}: {e}", path.display()))),
    };
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&raw).map_err(|e| persistence_error(format!("{}: {e}", path.display())))
}

fn write_json_atomic<T: Serialize>(dir: &Path, name: &str, value: &T) -> AppResult<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(persistence_error)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(persistence_error)?;
    tmp.write_all(&bytes).map_err(persistence_error)?;
    tmp.as_file().sync_all().map_err(persistence_error)?;
    tmp.persist(dir.join(name))
        .map_err(|e| persistence_error(e.error))?;
    Ok(())
}

/// Handle mutations use to ask for a save. Requests coalesce: while one is
/// pending, further requests are absorbed by it.
#[derive(Debug, Clone)]
pub struct SaveNotifier(mpsc::Sender<()>);

impl SaveNotifier {
    pub fn request(&self) {
        match self.0.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
            Err(mpsc::error::TrySendError::Closed(())) => {
                tracing::warn!("registry writer has stopped; change will not be persisted");
            }
        }
    }
}

pub fn save_channel() -> (SaveNotifier, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(1);
    (SaveNotifier(tx), rx)
}

/// Running writer task. Shutting it down lets any save in progress finish,
/// then writes the final state once.
pub struct RegistryWriter {
    stop: oneshot::Sender<()>,
    task: JoinHandle<AppResult<()>>,
}

impl RegistryWriter {
    pub async fn shutdown(self) -> AppResult<()> {
        if self.stop.send(()).is_err() {
            tracing::warn!("registry writer stopped before shutdown");
        }
        self.task.await.map_err(persistence_error)?
    }
}

/// Single writer: each request persists a fresh snapshot taken after the
/// request was observed, so the last write always reflects the latest state.
pub fn spawn_writer(
    store: DurableStore,
    shops: Arc<dyn ShopRepository>,
    mut requests: mpsc::Receiver<()>,
) -> RegistryWriter {
    let (stop, mut stopped) = oneshot::channel();
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = &mut stopped => break,
                request = requests.recv() => {
                    if request.is_none() {
                        break;
                    }
                    if let Err(e) = flush(&store, shops.as_ref()).await {
                        tracing::error!(error.message = %e, "failed to persist registry");
                    }
                }
            }
        }
        let flushed = flush(&store, shops.as_ref()).await;
        tracing::debug!("registry writer finished");
        flushed
    });
    RegistryWriter { stop, task }
}

pub async fn flush(store: &DurableStore, shops: &dyn ShopRepository) -> AppResult<()> {
    let snapshot = shops.snapshot().await;
    let store = store.clone();
    tokio::task::spawn_blocking(move || store.save(&snapshot))
        .await
        .map_err(persistence_error)?
}
