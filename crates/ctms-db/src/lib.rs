//! # ctms-db
//!
//! Database layer of the clinical trial management system tooling.
//!
//! The [`deploy`] module holds the idempotent schema deployment engine used
//! to bootstrap and update the PostgreSQL schema, seed data and stored
//! procedures.

pub mod deploy;

pub use deploy::{
	DeployError, DeploymentOutcome, DeploymentPlan, FileReport, ManifestEntry, ProcedureManifest,
	SchemaConnection, SchemaDeployer, TableCatalog, run_apply, run_bootstrap,
};
