use async_trait::async_trait;
use chrono::Utc;
use kernel::model::{
    employee::Employee,
    id::ShopId,
    normalize_email,
    role::Role,
    schedule::MAX_EMPLOYEE_COLUMNS,
    shop::{
        event::{AddEmployee, CreateShop, DeleteShop, EvictDocument, RecordDocument, RemoveEmployee},
        Shop, ShopSummary,
    },
    snapshot::RegistrySnapshot,
};
use kernel::repository::shop::ShopRepository;
use parking_lot::RwLock;
use shared::error::{AppError, AppResult};
use std::collections::HashMap;

use crate::persistence::SaveNotifier;

#[derive(Default)]
struct EmployerShops {
    shops: HashMap<String, HashMap<ShopId, Shop>>,
    // shop id -> owning employer
    owners: HashMap<ShopId, String>,
}

impl EmployerShops {
    fn shop_mut(&mut self, employer: &str, shop_id: ShopId) -> AppResult<&mut Shop> {
        self.shops
            .get_mut(employer)
            .and_then(|shops| shops.get_mut(&shop_id))
            .ok_or_else(|| shop_not_found(shop_id))
    }

    fn shop(&self, employer: &str, shop_id: ShopId) -> AppResult<&Shop> {
        self.shops
            .get(employer)
            .and_then(|shops| shops.get(&shop_id))
            .ok_or_else(|| shop_not_found(shop_id))
    }
}

/// In-memory authorization registry.
///
/// Lock order is always `employer_shops` before `employee_shops`; every
/// operation holds the locks it needs for its whole duration and never
/// across an await point.
pub struct ShopRepositoryImpl {
    employer_emails: Vec<String>,
    employer_shops: RwLock<EmployerShops>,
    employee_shops: RwLock<HashMap<String, Vec<ShopId>>>,
    save_requests: Option<SaveNotifier>,
}

impl ShopRepositoryImpl {
    pub fn new(employer_emails: Vec<String>, snapshot: RegistrySnapshot) -> Self {
        let RegistrySnapshot {
            employer_shops,
            employee_shops,
        } = snapshot;

        let mut state = EmployerShops::default();
        for (employer, shops) in employer_shops {
            let employer = normalize_email(&employer);
            for (id, shop) in shops {
                state.owners.insert(id, employer.clone());
                state.shops.entry(employer.clone()).or_default().insert(id, shop);
            }
        }

        Self {
            employer_emails: employer_emails.iter().map(|e| normalize_email(e)).collect(),
            employer_shops: RwLock::new(state),
            employee_shops: RwLock::new(employee_shops.into_iter().collect()),
            save_requests: None,
        }
    }

    pub fn with_save_notifier(mut self, notifier: SaveNotifier) -> Self {
        self.save_requests = Some(notifier);
        self
    }

    fn is_employer(&self, identity: &str) -> bool {
        let identity = normalize_email(identity);
        self.employer_emails.iter().any(|e| *e == identity)
    }

    fn request_save(&self) {
        if let Some(notifier) = &self.save_requests {
            notifier.request();
        }
    }
}

fn shop_not_found(shop_id: ShopId) -> AppError {
    AppError::EntityNotFound(format!("Shop {shop_id} not found"))
}

fn sorted_summaries<'a>(shops: impl Iterator<Item = &'a Shop>) -> Vec<ShopSummary> {
    let mut summaries: Vec<ShopSummary> = shops.map(Shop::summary).collect();
    summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
    summaries
}

#[async_trait]
impl ShopRepository for ShopRepositoryImpl {
    async fn create_shop(&self, event: CreateShop) -> AppResult<ShopId> {
        let name = event.name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError("Shop name is required".into()));
        }
        let employer = normalize_email(&event.employer);
        let shop = Shop::new(name.to_string(), Utc::now());
        let shop_id = shop.id;

        {
            let mut state = self.employer_shops.write();
            state.owners.insert(shop_id, employer.clone());
            state.shops.entry(employer.clone()).or_default().insert(shop_id, shop);
        }
        self.request_save();

        tracing::info!(%shop_id, %employer, shop_name = name, "created shop");
        Ok(shop_id)
    }

    async fn delete_shop(&self, event: DeleteShop) -> AppResult<Shop> {
        let employer = normalize_email(&event.employer);
        let removed = {
            let mut state = self.employer_shops.write();
            let mut index = self.employee_shops.write();

            let shop = state
                .shops
                .get_mut(&employer)
                .and_then(|shops| shops.remove(&event.shop_id))
                .ok_or_else(|| shop_not_found(event.shop_id))?;
            state.owners.remove(&event.shop_id);

            for email in shop.employees.keys() {
                if let Some(ids) = index.get_mut(email) {
                    ids.retain(|id| *id != event.shop_id);
                    if ids.is_empty() {
                        index.remove(email);
                    }
                }
            }
            shop
        };
        self.request_save();

        tracing::info!(shop_id = %event.shop_id, %employer, "deleted shop");
        Ok(removed)
    }

    async fn list_shops_for(&self, identity: &str, role: Role) -> AppResult<Vec<ShopSummary>> {
        let identity = normalize_email(identity);
        let state = self.employer_shops.read();
        let summaries = match role {
            Role::Employer => state
                .shops
                .get(&identity)
                .map(|shops| sorted_summaries(shops.values()))
                .unwrap_or_default(),
            Role::Employee => {
                let index = self.employee_shops.read();
                let ids = index.get(&identity).cloned().unwrap_or_default();
                sorted_summaries(ids.iter().filter_map(|id| {
                    let employer = state.owners.get(id)?;
                    let shop = state.shops.get(employer)?.get(id)?;
                    shop.has_employee(&identity).then_some(shop)
                }))
            }
            Role::Unauthorized => Vec::new(),
        };
        Ok(summaries)
    }

    async fn find_shop(&self, employer: &str, shop_id: ShopId) -> AppResult<Shop> {
        let employer = normalize_email(employer);
        self.employer_shops.read().shop(&employer, shop_id).cloned()
    }

    async fn add_employee(&self, event: AddEmployee) -> AppResult<Shop> {
        let employer = normalize_email(&event.employer);
        let email = normalize_email(&event.email);
        let name = event.name.trim().to_string();
        if email.is_empty() || name.is_empty() {
            return Err(AppError::ValidationError(
                "Employee email and name are required".into(),
            ));
        }

        let shop = {
            let mut state = self.employer_shops.write();
            let mut index = self.employee_shops.write();

            let shop = state.shop_mut(&employer, event.shop_id)?;
            if !shop.employees.contains_key(&email)
                && shop.employees.len() >= MAX_EMPLOYEE_COLUMNS
            {
                return Err(AppError::ValidationError(format!(
                    "A shop can have at most {MAX_EMPLOYEE_COLUMNS} employees"
                )));
            }
            shop.employees.insert(
                email.clone(),
                Employee {
                    email: email.clone(),
                    name,
                    hourly_rate: Employee::effective_rate(event.hourly_rate),
                },
            );
            shop.roster_version += 1;
            shop.updated_at = Utc::now();

            let ids = index.entry(email.clone()).or_default();
            if !ids.contains(&event.shop_id) {
                ids.push(event.shop_id);
            }
            shop.clone()
        };
        self.request_save();

        tracing::info!(shop_id = %event.shop_id, %employer, employee = %email, "added employee");
        Ok(shop)
    }

    async fn remove_employee(&self, event: RemoveEmployee) -> AppResult<Shop> {
        let employer = normalize_email(&event.employer);
        let email = normalize_email(&event.email);

        let (shop, changed) = {
            let mut state = self.employer_shops.write();
            let mut index = self.employee_shops.write();

            let shop = state.shop_mut(&employer, event.shop_id)?;
            let changed = shop.employees.remove(&email).is_some();
            if changed {
                shop.roster_version += 1;
                shop.updated_at = Utc::now();
            }

            let mut index_changed = false;
            if let Some(ids) = index.get_mut(&email) {
                let before = ids.len();
                ids.retain(|id| *id != event.shop_id);
                index_changed = ids.len() != before;
                if ids.is_empty() {
                    index.remove(&email);
                }
            }
            (shop.clone(), changed || index_changed)
        };

        if changed {
            self.request_save();
            tracing::info!(shop_id = %event.shop_id, %employer, employee = %email, "removed employee");
        }
        Ok(shop)
    }

    async fn resolve_role(&self, identity: &str) -> Role {
        if self.is_employer(identity) {
            return Role::Employer;
        }
        let identity = normalize_email(identity);
        match self.employee_shops.read().get(&identity) {
            Some(ids) if !ids.is_empty() => Role::Employee,
            _ => Role::Unauthorized,
        }
    }

    async fn find_employer_and_shop(
        &self,
        shop_id: ShopId,
        employee: &str,
    ) -> AppResult<(String, Shop)> {
        let employee = normalize_email(employee);
        let state = self.employer_shops.read();
        let employer = state.owners.get(&shop_id).ok_or_else(|| shop_not_found(shop_id))?;
        let shop = state.shop(employer, shop_id)?;
        if !shop.has_employee(&employee) {
            return Err(shop_not_found(shop_id));
        }
        Ok((employer.clone(), shop.clone()))
    }

    async fn record_document(&self, event: RecordDocument) -> AppResult<()> {
        let employer = normalize_email(&event.employer);
        let changed = {
            let mut state = self.employer_shops.write();
            let shop = state.shop_mut(&employer, event.shop_id)?;
            let previous = shop.spreadsheets.insert(event.year, event.document_id.clone());
            let changed = previous.as_ref() != Some(&event.document_id);
            if changed {
                shop.updated_at = Utc::now();
            }
            changed
        };
        if changed {
            self.request_save();
            tracing::info!(
                shop_id = %event.shop_id,
                year = event.year,
                document_id = %event.document_id,
                "recorded year document"
            );
        }
        Ok(())
    }

    async fn evict_document(&self, event: EvictDocument) -> AppResult<bool> {
        let employer = normalize_email(&event.employer);
        let evicted = {
            let mut state = self.employer_shops.write();
            let shop = state.shop_mut(&employer, event.shop_id)?;
            let current = shop.spreadsheets.get(&event.year) == Some(&event.document_id);
            if current {
                shop.spreadsheets.remove(&event.year);
            }
            current
        };
        if evicted {
            self.request_save();
            tracing::warn!(
                shop_id = %event.shop_id,
                year = event.year,
                document_id = %event.document_id,
                "evicted stale year document"
            );
        }
        Ok(evicted)
    }

    async fn roster_version(&self, employer: &str, shop_id: ShopId) -> AppResult<u64> {
        let employer = normalize_email(employer);
        self.employer_shops
            .read()
            .shop(&employer, shop_id)
            .map(|s| s.roster_version)
    }

    async fn snapshot(&self) -> RegistrySnapshot {
        let state = self.employer_shops.read();
        let index = self.employee_shops.read();
        RegistrySnapshot {
            employer_shops: state
                .shops
                .iter()
                .map(|(employer, shops)| {
                    (
                        employer.clone(),
                        shops.iter().map(|(id, s)| (*id, s.clone())).collect(),
                    )
                })
                .collect(),
            employee_shops: index
                .iter()
                .map(|(email, ids)| (email.clone(), ids.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::model::id::DocumentId;
    use proptest::prelude::*;

    const BOSS: &str = "boss@example.com";

    fn repo() -> ShopRepositoryImpl {
        ShopRepositoryImpl::new(vec![BOSS.into()], RegistrySnapshot::default())
    }

    async fn shop_with(repo: &ShopRepositoryImpl, employees: &[&str]) -> anyhow::Result<ShopId> {
        let id = repo.create_shop(CreateShop::new(BOSS.into(), "Shop".into())).await?;
        for e in employees {
            repo.add_employee(AddEmployee::new(BOSS.into(), id, e.to_string(), "Name".into(), 30.0))
                .await?;
        }
        Ok(id)
    }

    #[tokio::test]
    async fn create_trims_name_and_lists_shop() -> anyhow::Result<()> {
        let repo = repo();
        let id = repo
            .create_shop(CreateShop::new(BOSS.into(), "Downtown ".into()))
            .await?;

        let shops = repo.list_shops_for(BOSS, Role::Employer).await?;
        assert_eq!(shops.len(), 1);
        assert_eq!(shops[0].id, id);
        assert_eq!(shops[0].name, "Downtown");
        Ok(())
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let err = repo()
            .create_shop(CreateShop::new(BOSS.into(), "   ".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn delete_removes_shop_and_reverse_index() -> anyhow::Result<()> {
        let repo = repo();
        let keep = shop_with(&repo, &["alice@example.com"]).await?;
        let gone = shop_with(&repo, &["alice@example.com", "carol@example.com"]).await?;

        let removed = repo.delete_shop(DeleteShop::new(BOSS.into(), gone)).await?;
        assert_eq!(removed.employees.len(), 2);

        let listed: Vec<ShopId> = repo
            .list_shops_for(BOSS, Role::Employer)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(listed, vec![keep]);

        let snapshot = repo.snapshot().await;
        assert_eq!(snapshot.employee_shops["alice@example.com"], vec![keep]);
        assert!(!snapshot.employee_shops.contains_key("carol@example.com"));
        assert!(snapshot.is_consistent());
        assert_eq!(repo.resolve_role("carol@example.com").await, Role::Unauthorized);
        Ok(())
    }

    #[tokio::test]
    async fn delete_of_foreign_shop_is_not_found() -> anyhow::Result<()> {
        let repo = repo();
        let id = shop_with(&repo, &[]).await?;
        let err = repo
            .delete_shop(DeleteShop::new("other@example.com".into(), id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EntityNotFound(_)));
        Ok(())
    }

    #[tokio::test]
    async fn add_employee_upserts_and_defaults_rate() -> anyhow::Result<()> {
        let repo = repo();
        let id = shop_with(&repo, &[]).await?;

        let shop = repo
            .add_employee(AddEmployee::new(
                BOSS.into(),
                id,
                " Alice@Example.com ".into(),
                "Alice".into(),
                -5.0,
            ))
            .await?;
        assert_eq!(shop.employees["alice@example.com"].hourly_rate, 30.0);
        assert_eq!(shop.roster_version, 1);

        let shop = repo
            .add_employee(AddEmployee::new(
                BOSS.into(),
                id,
                "alice@example.com".into(),
                "Alice B".into(),
                42.0,
            ))
            .await?;
        assert_eq!(shop.employees.len(), 1);
        assert_eq!(shop.employees["alice@example.com"].name, "Alice B");
        assert_eq!(shop.employees["alice@example.com"].hourly_rate, 42.0);

        let snapshot = repo.snapshot().await;
        assert_eq!(snapshot.employee_shops["alice@example.com"], vec![id]);
        assert_eq!(repo.resolve_role("alice@example.com").await, Role::Employee);
        Ok(())
    }

    #[tokio::test]
    async fn roster_is_limited_to_schedule_width() -> anyhow::Result<()> {
        let repo = repo();
        let emails: Vec<String> = (0..MAX_EMPLOYEE_COLUMNS)
            .map(|i| format!("e{i}@example.com"))
            .collect();
        let refs: Vec<&str> = emails.iter().map(String::as_str).collect();
        let id = shop_with(&repo, &refs).await?;

        let err = repo
            .add_employee(AddEmployee::new(
                BOSS.into(),
                id,
                "late@example.com".into(),
                "Late".into(),
                30.0,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(repo.resolve_role("late@example.com").await, Role::Unauthorized);

        // Updating someone already rostered still works at capacity.
        let shop = repo
            .add_employee(AddEmployee::new(
                BOSS.into(),
                id,
                "e0@example.com".into(),
                "Renamed".into(),
                31.0,
            ))
            .await?;
        assert_eq!(shop.employees.len(), MAX_EMPLOYEE_COLUMNS);
        assert_eq!(shop.employees["e0@example.com"].name, "Renamed");
        Ok(())
    }

    #[tokio::test]
    async fn add_employee_to_missing_shop_is_not_found() {
        let err = repo()
            .add_employee(AddEmployee::new(
                BOSS.into(),
                ShopId::new(),
                "alice@example.com".into(),
                "Alice".into(),
                30.0,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EntityNotFound(_)));
    }

    #[tokio::test]
    async fn remove_employee_is_idempotent() -> anyhow::Result<()> {
        let repo = repo();
        let id = shop_with(&repo, &["alice@example.com", "bob@example.com"]).await?;

        repo.remove_employee(RemoveEmployee::new(BOSS.into(), id, "alice@example.com".into()))
            .await?;
        let once = repo.snapshot().await;
        repo.remove_employee(RemoveEmployee::new(BOSS.into(), id, "alice@example.com".into()))
            .await?;
        let twice = repo.snapshot().await;

        assert_eq!(once, twice);
        assert!(!twice.employee_shops.contains_key("alice@example.com"));
        assert!(twice.is_consistent());
        Ok(())
    }

    #[tokio::test]
    async fn roles_follow_allow_list_and_index() -> anyhow::Result<()> {
        let repo = repo();
        shop_with(&repo, &["alice@example.com"]).await?;

        assert_eq!(repo.resolve_role(" BOSS@example.com").await, Role::Employer);
        assert_eq!(repo.resolve_role("alice@example.com").await, Role::Employee);
        assert_eq!(repo.resolve_role("bob@example.com").await, Role::Unauthorized);
        Ok(())
    }

    #[tokio::test]
    async fn employee_lookup_requires_roster_membership() -> anyhow::Result<()> {
        let repo = repo();
        let id = shop_with(&repo, &["alice@example.com"]).await?;

        let (employer, shop) = repo.find_employer_and_shop(id, "alice@example.com").await?;
        assert_eq!(employer, BOSS);
        assert_eq!(shop.id, id);

        let err = repo
            .find_employer_and_shop(id, "bob@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EntityNotFound(_)));

        let shops = repo.list_shops_for("alice@example.com", Role::Employee).await?;
        assert_eq!(shops.len(), 1);
        assert!(repo
            .list_shops_for("bob@example.com", Role::Employee)
            .await?
            .is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn evict_only_drops_matching_document() -> anyhow::Result<()> {
        let repo = repo();
        let id = shop_with(&repo, &[]).await?;
        let doc = DocumentId::new("doc-1");
        repo.record_document(RecordDocument::new(BOSS.into(), id, 2025, doc.clone()))
            .await?;

        let other = EvictDocument::new(BOSS.into(), id, 2025, DocumentId::new("doc-2"));
        assert!(!repo.evict_document(other).await?);
        assert!(repo
            .evict_document(EvictDocument::new(BOSS.into(), id, 2025, doc))
            .await?);
        assert!(repo.find_shop(BOSS, id).await?.spreadsheets.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn loads_from_snapshot() -> anyhow::Result<()> {
        let source = repo();
        let id = shop_with(&source, &["alice@example.com"]).await?;
        let snapshot = source.snapshot().await;

        let loaded = ShopRepositoryImpl::new(vec![BOSS.into()], snapshot.clone());
        assert_eq!(loaded.snapshot().await, snapshot);
        assert!(loaded.find_employer_and_shop(id, "alice@example.com").await.is_ok());
        Ok(())
    }

    #[derive(Debug, Clone)]
    enum Op {
        Create,
        Delete(usize),
        Add(usize, usize),
        Remove(usize, usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Create),
            (0usize..4).prop_map(Op::Delete),
            (0usize..4, 0usize..5).prop_map(|(s, e)| Op::Add(s, e)),
            (0usize..4, 0usize..5).prop_map(|(s, e)| Op::Remove(s, e)),
        ]
    }

    proptest! {
        #[test]
        fn reverse_index_matches_rosters(ops in proptest::collection::vec(op(), 1..40)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let repo = repo();
                let mut shops: Vec<ShopId> = Vec::new();
                for op in ops {
                    match op {
                        Op::Create => {
                            shops.push(repo.create_shop(CreateShop::new(BOSS.into(), "S".into())).await.unwrap());
                        }
                        Op::Delete(i) if !shops.is_empty() => {
                            let id = shops.remove(i % shops.len());
                            repo.delete_shop(DeleteShop::new(BOSS.into(), id)).await.unwrap();
                        }
                        Op::Add(s, e) if !shops.is_empty() => {
                            let id = shops[s % shops.len()];
                            repo.add_employee(AddEmployee::new(BOSS.into(), id, format!("e{e}@example.com"), "E".into(), 30.0)).await.unwrap();
                        }
                        Op::Remove(s, e) if !shops.is_empty() => {
                            let id = shops[s % shops.len()];
                            repo.remove_employee(RemoveEmployee::new(BOSS.into(), id, format!("e{e}@example.com"))).await.unwrap();
                        }
                        _ => {}
                    }
                    let snapshot = repo.snapshot().await;
                    assert!(snapshot.is_consistent());
                    for e in 0..5 {
                        let email = format!("e{e}@example.com");
                        let role = repo.resolve_role(&email).await;
                        let indexed = snapshot.employee_shops.get(&email).is_some_and(|ids| !ids.is_empty());
                        assert_eq!(role == Role::Employee, indexed);
                        assert_ne!(role, Role::Employer);
                    }
                }
            });
        }
    }
}
