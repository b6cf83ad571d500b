//! SQLite persistence for the approval workflow: pooled connections,
//! embedded migrations, repository traits over the schema, and the demo
//! fixture dataset used by the CLI and tests.

pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{DemoDataset, SeedResult, TimesheetSeedInfo, VerificationResult};
