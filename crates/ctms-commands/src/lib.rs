//! # CTMS Commands
//!
//! Management commands for the schema deployment tooling.
//!
//! ## Available Commands
//!
//! - `bootstrap`: apply the schema files and pending stored procedures in one
//!   transaction, then record the procedures in the manifest
//! - `apply`: apply arbitrary SQL files through the same pipeline
//! - `procedures`: list the manifest with deployment status
//! - `tables`: list the table catalog
//! - `inspect`: show how a SQL file is split, identified and normalized,
//!   without a database
//!
//! ## Example
//!
//! ```rust,no_run
//! use ctms_commands::{BaseCommand, CommandContext, InspectCommand};
//!
//! # async fn example() -> ctms_commands::CommandResult<()> {
//! let ctx = CommandContext::new(vec!["database/sql/supporting_objects.sql".to_string()]);
//! InspectCommand.execute(&ctx).await?;
//! # Ok(())
//! # }
//! ```

pub mod base;
pub mod builtin;
pub mod context;
pub mod logging;

pub use base::{BaseCommand, CommandError, CommandResult};
pub use builtin::{
	ApplyCommand, BootstrapCommand, InspectCommand, ProceduresCommand, StatementSummary,
	TablesCommand, describe_statement,
};
pub use context::CommandContext;
pub use logging::init_logging;
