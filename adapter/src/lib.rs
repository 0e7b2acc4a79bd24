pub mod document;
pub mod oauth;
pub mod persistence;
pub mod provisioning;
pub mod repository;
pub mod token;
