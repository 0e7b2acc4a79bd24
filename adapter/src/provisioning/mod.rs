use kernel::model::{
    document::{
        column_label, document_title, grid_range, management_grid, year_document_tabs, DocumentId,
        DocumentMeta, Grid, MANAGEMENT_TAB, MAX_COLUMNS,
    },
    employee::Employee,
    id::ShopId,
    schedule::{month::Month, ScheduleGrid},
    session::AccessCredential,
    shop::{
        event::{EvictDocument, RecordDocument},
        RosterChange, Shop,
    },
};
use kernel::repository::{
    document::{DocumentStore, DocumentStoreFactory},
    shop::ShopRepository,
};
use parking_lot::RwLock;
use serde_json::Value;
use shared::error::{AppError, AppResult};
use std::{collections::HashMap, sync::Arc};

/// Month tabs are always written across the full A..Z width so columns left
/// over from a larger roster are cleared.
const MONTH_TAB_COLUMNS: usize = MAX_COLUMNS;

/// Document client bound to one user's credential.
pub struct ProvisioningClient {
    store: Arc<dyn DocumentStore>,
    access_token: String,
    // one document operation at a time per user
    gate: tokio::sync::Mutex<()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerationOutcome {
    Completed,
    /// The roster changed again while regenerating; the newer change owns the result.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct YearDocument {
    pub meta: DocumentMeta,
    pub created: bool,
}

pub struct DocumentProvisioner {
    factory: Arc<dyn DocumentStoreFactory>,
    shops: Arc<dyn ShopRepository>,
    clients: RwLock<HashMap<String, Arc<ProvisioningClient>>>,
}

impl DocumentProvisioner {
    pub fn new(factory: Arc<dyn DocumentStoreFactory>, shops: Arc<dyn ShopRepository>) -> Self {
        Self {
            factory,
            shops,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Cached client for `identity`; rebuilt when the credential was renewed.
    pub async fn client(
        &self,
        identity: &str,
        credential: &AccessCredential,
    ) -> AppResult<Arc<ProvisioningClient>> {
        if let Some(client) = self.cached(identity, credential) {
            return Ok(client);
        }

        let store = self.factory.connect(credential).await.inspect_err(|e| {
            tracing::error!(identity, error.message = %e, "failed to build document client");
        })?;
        let built = Arc::new(ProvisioningClient {
            store,
            access_token: credential.access_token.clone(),
            gate: tokio::sync::Mutex::new(()),
        });

        let mut clients = self.clients.write();
        match clients.get(identity) {
            Some(existing) if existing.access_token == credential.access_token => {
                Ok(existing.clone())
            }
            _ => {
                clients.insert(identity.to_string(), built.clone());
                Ok(built)
            }
        }
    }

    fn cached(&self, identity: &str, credential: &AccessCredential) -> Option<Arc<ProvisioningClient>> {
        self.clients
            .read()
            .get(identity)
            .filter(|c| c.access_token == credential.access_token)
            .cloned()
    }

    pub fn evict_client(&self, identity: &str) -> bool {
        self.clients.write().remove(identity).is_some()
    }

    /// Opens the workbook of `shop` for `year`. A cached id the store no
    /// longer accepts is evicted and replaced once. Without `allow_create`
    /// a missing workbook is reported as not found.
    pub async fn open_year_document(
        &self,
        identity: &str,
        credential: &AccessCredential,
        employer: &str,
        shop: &Shop,
        year: i32,
        allow_create: bool,
    ) -> AppResult<YearDocument> {
        let client = self.client(identity, credential).await?;
        let _gate = client.gate.lock().await;
        let store = client.store.as_ref();

        if let Some(id) = shop.spreadsheets.get(&year) {
            match store.get(id).await {
                Ok(meta) => return Ok(YearDocument { meta, created: false }),
                Err(AppError::StaleDocument(_)) => {
                    self.shops
                        .evict_document(EvictDocument::new(
                            employer.to_string(),
                            shop.id,
                            year,
                            id.clone(),
                        ))
                        .await?;
                }
                Err(e) => return Err(e),
            }
        }

        if !allow_create {
            return Err(AppError::EntityNotFound(format!(
                "No schedule document for {year}"
            )));
        }
        self.find_or_create_year_document(store, employer, shop, year)
            .await
    }

    async fn find_or_create_year_document(
        &self,
        store: &dyn DocumentStore,
        employer: &str,
        shop: &Shop,
        year: i32,
    ) -> AppResult<YearDocument> {
        let title = document_title(&shop.name, year);
        if let Some(meta) = store.find_by_title(&title).await? {
            self.record(employer, shop.id, year, &meta.id).await?;
            return Ok(YearDocument {
                meta,
                created: false,
            });
        }

        let meta = store.create(&title, &year_document_tabs()).await?;
        self.record(employer, shop.id, year, &meta.id).await?;

        let roster = shop.roster();
        for month in Month::ALL {
            generate_month_schedule(store, &meta.id, month, &roster, year).await?;
        }
        write_management_tab(store, &meta.id, &shop.name, &roster).await?;
        for employee in &roster {
            if let Err(e) = store.share_reader(&meta.id, &employee.email).await {
                tracing::warn!(
                    document_id = %meta.id,
                    employee = %employee.email,
                    error.message = %e,
                    "failed to share new document"
                );
            }
        }

        tracing::info!(shop_id = %shop.id, year, document_id = %meta.id, "provisioned year document");
        Ok(YearDocument {
            meta,
            created: true,
        })
    }

    async fn record(
        &self,
        employer: &str,
        shop_id: ShopId,
        year: i32,
        id: &DocumentId,
    ) -> AppResult<()> {
        self.shops
            .record_document(RecordDocument::new(
                employer.to_string(),
                shop_id,
                year,
                id.clone(),
            ))
            .await
    }

    /// Rewrites every month tab of one year for the roster of `shop`,
    /// stopping as soon as the live roster has moved past `shop.roster_version`.
    pub async fn regenerate_all_months(
        &self,
        identity: &str,
        credential: &AccessCredential,
        employer: &str,
        shop: &Shop,
        document_id: &DocumentId,
        year: i32,
    ) -> AppResult<RegenerationOutcome> {
        let client = self.client(identity, credential).await?;
        let _gate = client.gate.lock().await;
        self.regenerate(client.store.as_ref(), employer, shop, document_id, year)
            .await
    }

    async fn regenerate(
        &self,
        store: &dyn DocumentStore,
        employer: &str,
        shop: &Shop,
        document_id: &DocumentId,
        year: i32,
    ) -> AppResult<RegenerationOutcome> {
        let roster = shop.roster();
        for month in Month::ALL {
            if self.is_superseded(employer, shop).await? {
                tracing::info!(
                    shop_id = %shop.id,
                    year,
                    version = shop.roster_version,
                    "regeneration superseded by a newer roster"
                );
                return Ok(RegenerationOutcome::Superseded);
            }
            generate_month_schedule(store, document_id, month, &roster, year).await?;
        }
        Ok(RegenerationOutcome::Completed)
    }

    async fn is_superseded(&self, employer: &str, shop: &Shop) -> AppResult<bool> {
        let live = self.shops.roster_version(employer, shop.id).await?;
        Ok(live > shop.roster_version)
    }

    /// Brings every year document of `shop` in line with a roster change:
    /// grant or revoke access, regenerate the month tabs and rewrite the
    /// management tab. Failures are collected; the registry change stands.
    pub async fn sync_roster_change(
        &self,
        identity: &str,
        credential: &AccessCredential,
        employer: &str,
        shop: &Shop,
        change: &RosterChange,
    ) -> Vec<String> {
        let mut errors = Vec::new();
        if shop.spreadsheets.is_empty() {
            return errors;
        }
        let client = match self.client(identity, credential).await {
            Ok(client) => client,
            Err(e) => return vec![e.to_string()],
        };
        let _gate = client.gate.lock().await;
        let store = client.store.as_ref();

        // Access changes go to every year even if regeneration is cut short.
        for (year, id) in &shop.spreadsheets {
            let access = match change {
                RosterChange::Added(email) => store.share_reader(id, email).await,
                RosterChange::Removed(email) => store.revoke(id, email).await,
            };
            if let Err(e) = access {
                tracing::warn!(shop_id = %shop.id, year, document_id = %id, error.message = %e, "failed to update sharing");
                errors.push(format!("{year}: sharing update failed: {e}"));
            }
        }

        for (year, id) in &shop.spreadsheets {
            match self.regenerate(store, employer, shop, id, *year).await {
                Ok(RegenerationOutcome::Completed) => {}
                Ok(RegenerationOutcome::Superseded) => break,
                Err(e) => {
                    tracing::error!(shop_id = %shop.id, year, document_id = %id, error.message = %e, "failed to regenerate schedules");
                    errors.push(format!("{year}: schedule regeneration failed: {e}"));
                    continue;
                }
            }

            if let Err(e) = write_management_tab(store, id, &shop.name, &shop.roster()).await {
                tracing::error!(shop_id = %shop.id, year, document_id = %id, error.message = %e, "failed to write management tab");
                errors.push(format!("{year}: management tab update failed: {e}"));
            }
        }
        errors
    }

    /// Revokes every roster employee from every year document of a deleted shop.
    pub async fn revoke_shop(
        &self,
        identity: &str,
        credential: &AccessCredential,
        shop: &Shop,
    ) -> Vec<String> {
        if shop.spreadsheets.is_empty() || shop.employees.is_empty() {
            return Vec::new();
        }
        let client = match self.client(identity, credential).await {
            Ok(client) => client,
            Err(e) => return vec![e.to_string()],
        };
        let _gate = client.gate.lock().await;

        let mut errors = Vec::new();
        for (year, id) in &shop.spreadsheets {
            for email in shop.employees.keys() {
                if let Err(e) = client.store.revoke(id, email).await {
                    tracing::warn!(shop_id = %shop.id, year, document_id = %id, employee = %email, error.message = %e, "failed to revoke access");
                    errors.push(format!("{year}: revoking {email} failed: {e}"));
                }
            }
        }
        errors
    }

    pub async fn read_range(
        &self,
        identity: &str,
        credential: &AccessCredential,
        document_id: &DocumentId,
        range: &str,
    ) -> AppResult<Grid> {
        let client = self.client(identity, credential).await?;
        let _gate = client.gate.lock().await;
        client.store.read_range(document_id, range).await
    }

    pub async fn write_range(
        &self,
        identity: &str,
        credential: &AccessCredential,
        document_id: &DocumentId,
        range: &str,
        values: Grid,
    ) -> AppResult<()> {
        let client = self.client(identity, credential).await?;
        let _gate = client.gate.lock().await;
        client.store.write_range(document_id, range, values).await
    }
}

/// Writes a fresh template for one month.
pub async fn generate_month_schedule(
    store: &dyn DocumentStore,
    document_id: &DocumentId,
    month: Month,
    roster: &[Employee],
    year: i32,
) -> AppResult<()> {
    let grid = ScheduleGrid::template(month, year, roster);
    if grid.width() > MONTH_TAB_COLUMNS {
        return Err(AppError::ValidationError(format!(
            "{} employees do not fit on a month tab",
            roster.len()
        )));
    }
    let values: Grid = grid
        .to_values()
        .into_iter()
        .map(|mut row| {
            row.resize(MONTH_TAB_COLUMNS, Value::from(""));
            row
        })
        .collect();
    let range = format!(
        "{}!A1:{}{}",
        month.tab_name(),
        column_label(MONTH_TAB_COLUMNS - 1),
        values.len()
    );
    store.write_range(document_id, &range, values).await
}

pub async fn write_management_tab(
    store: &dyn DocumentStore,
    document_id: &DocumentId,
    shop_name: &str,
    roster: &[Employee],
) -> AppResult<()> {
    let values = management_grid(shop_name, roster);
    let range = grid_range(MANAGEMENT_TAB, 3, values.len());
    store.write_range(document_id, &range, values).await
}
