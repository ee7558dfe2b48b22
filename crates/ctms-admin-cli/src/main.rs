//! CTMS Admin CLI
//!
//! Deploys the clinical trial management schema, seed data and stored
//! procedures to PostgreSQL.
//!
//! ## Usage
//!
//! ```bash
//! ctms-admin bootstrap
//! ctms-admin -v apply database/sql/supporting_objects.sql
//! ctms-admin procedures
//! ctms-admin inspect database/sql/clinical_trial_tables.sql
//! ```
//!
//! The connection is configured with `DATABASE_URL` or `DB_NAME`, `DB_USER`,
//! `DB_PASSWORD`, `DB_HOST` and `DB_PORT`, read from the environment or a
//! `.env` file.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;
use ctms_commands::{
	ApplyCommand, BaseCommand, BootstrapCommand, CommandContext, CommandResult, InspectCommand,
	ProceduresCommand, TablesCommand, init_logging,
};

#[derive(Parser)]
#[command(name = "ctms-admin")]
#[command(about = "CTMS database deployment utility", long_about = None)]
#[command(version)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Verbosity level (can be repeated)
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	verbosity: u8,

	/// TOML settings file overriding the directory layout
	#[arg(long, value_name = "FILE", global = true)]
	settings: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
	/// Apply the schema files and pending stored procedures
	///
	/// Everything runs in a single transaction. Statements whose object
	/// already has an identical definition are skipped. Stored procedures
	/// are recorded in the manifest once the transaction has committed.
	Bootstrap,

	/// Apply SQL files, skipping unchanged definitions
	Apply {
		/// SQL files, applied in the given order
		#[arg(value_name = "FILE", required = true)]
		files: Vec<PathBuf>,
	},

	/// List stored procedures and their deployment status
	Procedures,

	/// List the table catalog
	Tables,

	/// Show statements, detected objects and normalized forms of a SQL file
	Inspect {
		/// SQL file to inspect
		#[arg(value_name = "FILE")]
		file: PathBuf,

		/// Schema whose qualifier is ignored (defaults to the configured schema)
		#[arg(long)]
		schema: Option<String>,
	},
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
	let cli = Cli::parse();
	init_logging(cli.verbosity);

	let mut ctx = CommandContext::default();
	ctx.set_verbosity(cli.verbosity);
	if let Some(settings) = &cli.settings {
		ctx.set_option("settings".to_string(), settings.display().to_string());
	}

	let result = match cli.command {
		Commands::Bootstrap => run_command(&BootstrapCommand, ctx).await,
		Commands::Apply { files } => {
			for file in files {
				ctx.add_arg(file.display().to_string());
			}
			run_command(&ApplyCommand, ctx).await
		}
		Commands::Procedures => run_command(&ProceduresCommand, ctx).await,
		Commands::Tables => run_command(&TablesCommand, ctx).await,
		Commands::Inspect { file, schema } => {
			ctx.add_arg(file.display().to_string());
			if let Some(schema) = schema {
				ctx.set_option("schema".to_string(), schema);
			}
			run_command(&InspectCommand, ctx).await
		}
	};

	if let Err(e) = result {
		eprintln!("{} {}", "Error:".red().bold(), e);
		process::exit(1);
	}
}

async fn run_command(cmd: &dyn BaseCommand, ctx: CommandContext) -> CommandResult<()> {
	tracing::debug!(command = cmd.name(), args = ?ctx.args, "Running command");
	cmd.execute(&ctx).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn test_cli_definition() {
		Cli::command().debug_assert();
	}

	#[test]
	fn test_parse_apply_with_global_flags() {
		let cli = Cli::try_parse_from([
			"ctms-admin",
			"apply",
			"a.sql",
			"b.sql",
			"-vv",
			"--settings",
			"ctms.toml",
		])
		.unwrap();

		assert_eq!(cli.verbosity, 2);
		assert_eq!(cli.settings, Some(PathBuf::from("ctms.toml")));
		match cli.command {
			Commands::Apply { files } => {
				assert_eq!(files, vec![PathBuf::from("a.sql"), PathBuf::from("b.sql")])
			}
			_ => panic!("expected apply"),
		}
	}

	#[test]
	fn test_inspect_schema_is_optional() {
		let cli = Cli::try_parse_from(["ctms-admin", "inspect", "a.sql"]).unwrap();
		match cli.command {
			Commands::Inspect { schema, .. } => assert_eq!(schema, None),
			_ => panic!("expected inspect"),
		}

		let cli =
			Cli::try_parse_from(["ctms-admin", "inspect", "a.sql", "--schema", "ctms"]).unwrap();
		match cli.command {
			Commands::Inspect { schema, .. } => assert_eq!(schema.as_deref(), Some("ctms")),
			_ => panic!("expected inspect"),
		}
	}

	#[test]
	fn test_apply_requires_a_file() {
		assert!(Cli::try_parse_from(["ctms-admin", "apply"]).is_err());
	}
}
