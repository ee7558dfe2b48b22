//! Command trait and errors

use crate::CommandContext;
use async_trait::async_trait;
use ctms_conf::SettingsError;
use ctms_db::DeployError;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
	#[error("Invalid arguments: {0}")]
	InvalidArguments(String),

	#[error("{0}")]
	ExecutionError(String),

	#[error(transparent)]
	Settings(#[from] SettingsError),

	#[error(transparent)]
	Deploy(#[from] DeployError),

	#[error("Failed to connect to {url}: {source}")]
	Connection {
		/// Connection URL with the password masked
		url: String,
		#[source]
		source: sqlx::Error,
	},
}

pub type CommandResult<T> = Result<T, CommandError>;

/// A management command
#[async_trait]
pub trait BaseCommand: Send + Sync {
	/// Command name as typed on the command line
	fn name(&self) -> &str;

	/// One-line help text
	fn description(&self) -> &str;

	async fn execute(&self, ctx: &CommandContext) -> CommandResult<()>;
}
