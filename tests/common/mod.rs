//! Common test infrastructure
//!
//! Integration tests only import from this module:
//!
//! ```no_run
//! mod common;
//! use common::TestEnv;
//!
//! #[tokio::test]
//! async fn test_backfill() {
//!     let env = TestEnv::ready();
//!     env.seed_messages(10);
//!     env.schedule().unwrap();
//!     env.backfill.flush().await.unwrap();
//!     assert_eq!(env.indexed_ids().len(), 10);
//! }
//! ```
#![allow(dead_code)]

mod env;
mod spies;

pub use env::{wait_until, TestEnv};
pub use env::BATCH_BUDGET;
pub use spies::{CountingInteractionStore, Observation, ObservingIndexer};
