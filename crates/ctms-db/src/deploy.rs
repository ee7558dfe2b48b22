//! # Schema deployment
//!
//! Idempotent application of SQL files to a live PostgreSQL database.
//!
//! Every file is split into statements ([`splitter`]). Statements that create
//! a named table, view, materialized view, function or procedure
//! ([`identifier`]) are compared against the definition the server currently
//! holds ([`catalog`]) after normalization ([`normalizer`]); matching
//! statements are skipped, everything else is executed ([`executor`]).
//!
//! A bootstrap run ([`bootstrap`]) applies the ordered schema files and any
//! stored-procedure files the [`manifest`] has not recorded as deployed, all
//! inside a single transaction. The manifest is rewritten only after the
//! transaction commits.
//!
//! ```rust,no_run
//! use ctms_db::deploy::{DeploymentPlan, run_bootstrap};
//! use sqlx::Connection;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut conn = sqlx::PgConnection::connect("postgresql://postgres@localhost/ctms").await?;
//! let plan = DeploymentPlan::new("database/stored_procedures", "database/stored_procedures/procedures.json")
//! 	.with_schema_file("database/sql/vocabulary_tables.sql");
//! let outcome = run_bootstrap(&mut conn, &plan, chrono::Local::now().date_naive()).await?;
//! println!("{} statements executed", outcome.executed());
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod catalog;
pub mod executor;
pub mod identifier;
pub mod manifest;
pub mod normalizer;
pub mod postgres;
pub mod splitter;

pub use bootstrap::{DeploymentOutcome, DeploymentPlan, deploy_all, run_apply, run_bootstrap};
pub use catalog::{
	DefinitionFetcher, RoutineQuery, SchemaConnection, TABLE_DEFINITION_FUNCTION,
	TABLE_DEFINITION_SIGNATURE,
};
pub use executor::{FileReport, SchemaDeployer, StatementOutcome};
pub use identifier::{ObjectKind, ObjectRef, QualifiedName, identify_object};
pub use manifest::{ManifestEntry, ProcedureManifest, TableCatalog, TableCatalogEntry};
pub use normalizer::{DEFAULT_SCHEMA, normalize_sql, normalize_sql_in_schema};
pub use splitter::{QuoteContext, split_statements};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
	/// A schema or stored-procedure file does not exist
	#[error("SQL file missing: {}", path.display())]
	MissingFile { path: PathBuf },

	/// A metadata file (procedure manifest, table catalog) does not exist
	#[error("Configuration file missing: {}", path.display())]
	ConfigurationMissing { path: PathBuf },

	/// A metadata file exists but does not hold a list of objects
	#[error("Invalid configuration in {}: {reason}", path.display())]
	ConfigurationInvalid { path: PathBuf, reason: String },

	/// Routine lookup matched zero or several catalog rows
	///
	/// Never escapes the fetcher: it is logged and the definition treated
	/// as unknown, which forces the statement to run.
	#[error("Ambiguous catalog match for {name}: {candidates} candidates")]
	AmbiguousCatalogMatch { name: String, candidates: usize },

	/// The server rejected a statement
	#[error("Failed to execute statement from {source_label}: {source}\n  --> {statement}")]
	ExecutionFailure {
		source_label: String,
		statement: String,
		#[source]
		source: sqlx::Error,
	},

	#[error("Catalog error: {0}")]
	Catalog(#[from] sqlx::Error),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DeployError>;
