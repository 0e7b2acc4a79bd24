pub mod document;
pub mod identity;
pub mod session;
pub mod shop;
