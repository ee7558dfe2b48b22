//! # CTMS deploy
//!
//! Idempotent PostgreSQL schema deployment for the clinical trial
//! management system.
//!
//! Schema files are split into statements, and every statement that defines
//! a table, view, function or procedure is compared against the definition
//! already present in the database. Unchanged definitions are skipped; the
//! rest is executed inside a single transaction. Stored procedures listed in
//! the procedure manifest are deployed once and recorded as deployed.
//!
//! ## Feature Flags
//!
//! - `db` - deployment engine ([`db`])
//! - `conf` - settings resolution ([`conf`])
//! - `commands` - command implementations used by `ctms-admin` ([`commands`])
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use ctms::prelude::*;
//! use sqlx::Connection;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load(None)?;
//! let layout = &settings.layout;
//! let plan = DeploymentPlan::new(layout.procedures_dir(), layout.manifest_path())
//! 	.with_schema_files(layout.schema_paths());
//!
//! let mut conn = sqlx::PgConnection::connect(&settings.database()?.to_url()).await?;
//! let outcome = run_bootstrap(&mut conn, &plan, chrono::Local::now().date_naive()).await?;
//! println!("{} executed, {} unchanged", outcome.executed(), outcome.skipped());
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "commands")]
pub use ctms_commands as commands;
#[cfg(feature = "conf")]
pub use ctms_conf as conf;
#[cfg(feature = "db")]
pub use ctms_db as db;

/// Common imports for deployment tooling
pub mod prelude {
	#[cfg(feature = "commands")]
	pub use ctms_commands::{BaseCommand, CommandContext, CommandError, CommandResult};
	#[cfg(feature = "conf")]
	pub use ctms_conf::{DatabaseConfig, DeployLayout, Settings, SettingsError};
	#[cfg(feature = "db")]
	pub use ctms_db::{
		DeployError, DeploymentOutcome, DeploymentPlan, FileReport, ManifestEntry,
		ProcedureManifest, SchemaConnection, SchemaDeployer, run_apply, run_bootstrap,
	};
}
