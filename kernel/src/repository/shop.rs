use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{
    id::ShopId,
    role::Role,
    shop::{
        event::{AddEmployee, CreateShop, DeleteShop, EvictDocument, RecordDocument, RemoveEmployee},
        Shop, ShopSummary,
    },
    snapshot::RegistrySnapshot,
};

/// Employer -> shop -> roster registry together with the employee -> shops
/// reverse index. Every operation is atomic with respect to the others.
#[async_trait]
pub trait ShopRepository: Send + Sync {
    async fn create_shop(&self, event: CreateShop) -> AppResult<ShopId>;
    // Returns the removed shop so callers can clean up its documents.
    async fn delete_shop(&self, event: DeleteShop) -> AppResult<Shop>;
    async fn list_shops_for(&self, identity: &str, role: Role) -> AppResult<Vec<ShopSummary>>;
    async fn find_shop(&self, employer: &str, shop_id: ShopId) -> AppResult<Shop>;
    // Returns the shop as it stands after the upsert.
    async fn add_employee(&self, event: AddEmployee) -> AppResult<Shop>;
    // Idempotent; returns the shop as it stands after the removal.
    async fn remove_employee(&self, event: RemoveEmployee) -> AppResult<Shop>;
    async fn resolve_role(&self, identity: &str) -> Role;
    // Requires actual roster membership, not just a reverse-index entry.
    async fn find_employer_and_shop(
        &self,
        shop_id: ShopId,
        employee: &str,
    ) -> AppResult<(String, Shop)>;
    async fn record_document(&self, event: RecordDocument) -> AppResult<()>;
    // Returns whether an entry was actually dropped.
    async fn evict_document(&self, event: EvictDocument) -> AppResult<bool>;
    async fn roster_version(&self, employer: &str, shop_id: ShopId) -> AppResult<u64>;
    async fn snapshot(&self) -> RegistrySnapshot;
}
