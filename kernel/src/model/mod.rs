pub mod document;
pub mod employee;
pub mod id;
pub mod role;
pub mod schedule;
pub mod session;
pub mod shop;
pub mod snapshot;
pub mod user;

/// Canonical form of an email used as an identity key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
