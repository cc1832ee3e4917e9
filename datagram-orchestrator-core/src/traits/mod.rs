//! Storage layer abstraction trait definition

mod account_repository;
mod activity_log;
mod client_factory;
mod config_repository;
mod credential_store;
mod operation_cache;

pub use account_repository::AccountRepository;
pub use activity_log::{ActivityLog, LogLines};
pub use client_factory::{ClientFactory, GithubClientFactory};
pub use config_repository::ConfigRepository;
pub use credential_store::CredentialStore;
pub use operation_cache::OperationCache;
