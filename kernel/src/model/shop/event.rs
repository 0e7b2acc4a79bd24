use derive_new::new;

use crate::model::id::{DocumentId, ShopId};

#[derive(new, Debug)]
pub struct CreateShop {
    pub employer: String,
    pub name: String,
}

#[derive(new, Debug)]
pub struct DeleteShop {
    pub employer: String,
    pub shop_id: ShopId,
}

#[derive(new, Debug)]
pub struct AddEmployee {
    pub employer: String,
    pub shop_id: ShopId,
    pub email: String,
    pub name: String,
    pub hourly_rate: f64,
}

#[derive(new, Debug)]
pub struct RemoveEmployee {
    pub employer: String,
    pub shop_id: ShopId,
    pub email: String,
}

#[derive(new, Debug)]
pub struct RecordDocument {
    pub employer: String,
    pub shop_id: ShopId,
    pub year: i32,
    pub document_id: DocumentId,
}

/// Drops a cached workbook id, but only if it still points at `document_id`.
#[derive(new, Debug)]
pub struct EvictDocument {
    pub employer: String,
    pub shop_id: ShopId,
    pub year: i32,
    pub document_id: DocumentId,
}
