use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{employee::Employee, id::{DocumentId, ShopId}};

pub mod event;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    pub id: ShopId,
    pub name: String,
    /// Roster keyed by normalized employee email.
    #[serde(default)]
    pub employees: BTreeMap<String, Employee>,
    /// Year -> workbook holding that year's schedule.
    #[serde(default)]
    pub spreadsheets: BTreeMap<i32, DocumentId>,
    /// Bumped on every roster change; stamps template regenerations.
    #[serde(default)]
    pub roster_version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shop {
    pub fn new(name: String, now: DateTime<Utc>) -> Self {
        Self {
            id: ShopId::new(),
            name,
            employees: BTreeMap::new(),
            spreadsheets: BTreeMap::new(),
            roster_version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_employee(&self, email: &str) -> bool {
        self.employees.contains_key(email)
    }

    /// Employees in column order (sorted by email).
    pub fn roster(&self) -> Vec<Employee> {
        self.employees.values().cloned().collect()
    }

    pub fn summary(&self) -> ShopSummary {
        ShopSummary {
            id: self.id,
            name: self.name.clone(),
            employee_count: self.employees.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Roster edit whose document side effects still have to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterChange {
    Added(String),
    Removed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopSummary {
    pub id: ShopId,
    pub name: String,
    pub employee_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
