use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{id::ShopId, shop::Shop};

pub type EmployerShops = BTreeMap<String, BTreeMap<ShopId, Shop>>;
pub type EmployeeShops = BTreeMap<String, Vec<ShopId>>;

/// Point-in-time copy of the authorization registry, in persisted shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub employer_shops: EmployerShops,
    pub employee_shops: EmployeeShops,
}

impl RegistrySnapshot {
    /// Reverse index implied by the rosters.
    pub fn derived_employee_shops(&self) -> EmployeeShops {
        let mut index: BTreeMap<String, BTreeSet<ShopId>> = BTreeMap::new();
        for shops in self.employer_shops.values() {
            for shop in shops.values() {
                for email in shop.employees.keys() {
                    index.entry(email.clone()).or_default().insert(shop.id);
                }
            }
        }
        index
            .into_iter()
            .map(|(email, ids)| (email, ids.into_iter().collect()))
            .collect()
    }

    pub fn is_consistent(&self) -> bool {
        let stored: EmployeeShops = self
            .employee_shops
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(email, ids)| {
                let mut ids = ids.clone();
                ids.sort();
                ids.dedup();
                (email.clone(), ids)
            })
            .collect();
        stored == self.derived_employee_shops()
    }

    /// Rebuilds the reverse index from the rosters; returns true when it had diverged.
    pub fn reconcile(&mut self) -> bool {
        if self.is_consistent() {
            return false;
        }
        self.employee_shops = self.derived_employee_shops();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::Employee;
    use chrono::Utc;

    fn snapshot_with_one_employee() -> (RegistrySnapshot, ShopId) {
        let mut shop = Shop::new("Downtown".into(), Utc::now());
        shop.employees.insert(
            "alice@example.com".into(),
            Employee {
                email: "alice@example.com".into(),
                name: "Alice".into(),
                hourly_rate: 35.0,
            },
        );
        let id = shop.id;
        let mut snapshot = RegistrySnapshot::default();
        snapshot
            .employer_shops
            .entry("boss@example.com".into())
            .or_default()
            .insert(id, shop);
        (snapshot, id)
    }

    #[test]
    fn reconcile_restores_missing_index_entries() {
        let (mut snapshot, id) = snapshot_with_one_employee();
        assert!(!snapshot.is_consistent());
        assert!(snapshot.reconcile());
        assert_eq!(snapshot.employee_shops["alice@example.com"], vec![id]);
        assert!(!snapshot.reconcile());
    }

    #[test]
    fn reconcile_drops_dangling_index_entries() {
        let (mut snapshot, id) = snapshot_with_one_employee();
        snapshot
            .employee_shops
            .insert("alice@example.com".into(), vec![id]);
        snapshot
            .employee_shops
            .insert("ghost@example.com".into(), vec![ShopId::new()]);
        assert!(snapshot.reconcile());
        assert!(!snapshot.employee_shops.contains_key("ghost@example.com"));
    }
}
