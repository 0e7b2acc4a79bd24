pub mod auth;
pub mod employee;
pub mod health;
pub mod schedule;
pub mod shop;
pub mod spreadsheet;
