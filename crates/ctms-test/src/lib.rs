//! # ctms-test
//!
//! Testing utilities for the CTMS deployment tooling.
//!
//! ## Features
//!
//! - **[`MockCatalog`]**: in-memory [`SchemaConnection`](ctms_db::deploy::SchemaConnection)
//!   that records executed statements and learns definitions from them
//! - **[`SqlTree`]**: temporary `sql/` + `stored_procedures/` layout with a
//!   procedure manifest, ready to turn into a deployment plan
//! - **[`LogCapture`]**: records tracing events for assertions
//! - **TestContainers** (feature `testcontainers`): disposable PostgreSQL server
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ctms_db::deploy::deploy_all;
//! use ctms_test::{MockCatalog, SqlTree};
//!
//! #[tokio::test]
//! async fn test_second_run_is_a_no_op() {
//!     let mut tree = SqlTree::new();
//!     tree.write_schema("views.sql", "CREATE VIEW v AS SELECT 1;");
//!     let plan = tree.plan();
//!     let mut catalog = MockCatalog::new();
//!
//!     deploy_all(&mut catalog, &plan, vec![], today()).await.unwrap();
//!     let second = deploy_all(&mut catalog, &plan, vec![], today()).await.unwrap();
//!     assert_eq!(second.executed(), 0);
//! }
//! ```

pub mod fixtures;
pub mod logging;
pub mod mock;
pub mod tree;

pub use logging::LogCapture;
pub use mock::{MockCatalog, MockRoutine};
pub use tree::SqlTree;

#[cfg(feature = "testcontainers")]
pub use fixtures::testcontainers::{ContainerAsync, GenericImage, postgres_container};
