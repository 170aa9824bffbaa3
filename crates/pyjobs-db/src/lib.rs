//! Relational persistence for the job board.
//!
//! This crate provides:
//! - Repository traits for jobs, applications, accounts and API keys
//! - A PostgreSQL store on sqlx with bundled migrations
//! - An in-memory store with the same uniqueness rules

pub mod error;
pub mod memory;
pub mod pg;
pub mod store;

pub use error::{DbError, DbResult};
pub use memory::InMemoryStore;
pub use pg::{connect, run_migrations, PgStore};
pub use store::{
    AccountRepository, ApiKeyRepository, ApplicationRepository, JobFilter, JobRepository, Store,
    APPLICATION_UNIQUE_CONSTRAINT,
};
