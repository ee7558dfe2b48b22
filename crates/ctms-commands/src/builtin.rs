//! Built-in commands
//!
//! Deployment commands included with the CTMS tooling.

use crate::{BaseCommand, CommandContext, CommandError, CommandResult};
use async_trait::async_trait;
use colored::Colorize;
use ctms_conf::Settings;
use ctms_db::deploy::{
	DeploymentPlan, FileReport, ObjectRef, ProcedureManifest, TableCatalog, identify_object,
	normalize_sql_in_schema, run_apply, run_bootstrap, split_statements,
};
use sqlx::{Connection, PgConnection};
use std::path::{Path, PathBuf};

/// Full deployment of schema files and pending stored procedures
pub struct BootstrapCommand;

#[async_trait]
impl BaseCommand for BootstrapCommand {
	fn name(&self) -> &str {
		"bootstrap"
	}

	fn description(&self) -> &str {
		"Apply schema files and pending stored procedures in one transaction"
	}

	async fn execute(&self, ctx: &CommandContext) -> CommandResult<()> {
		let settings = load_settings(ctx)?;
		let layout = &settings.layout;
		let plan = DeploymentPlan::new(layout.procedures_dir(), layout.manifest_path())
			.with_schema_files(layout.schema_paths())
			.with_default_schema(settings.default_schema.clone());

		ctx.verbose(&format!("Manifest: {}", plan.manifest_path.display()));
		let mut conn = connect(ctx, &settings).await?;

		ctx.info("Deploying schema...");
		let run_date = chrono::Local::now().date_naive();
		let outcome = run_bootstrap(&mut conn, &plan, run_date).await?;

		for report in outcome.schema_reports.iter().chain(&outcome.procedure_reports) {
			print_report(ctx, report);
		}
		if outcome.procedure_reports.is_empty() {
			ctx.info("No pending stored procedures");
		}
		if outcome.manifest_changed {
			ctx.info(&format!(
				"Recorded {} stored procedure(s) in {}",
				outcome.procedure_reports.len(),
				plan.manifest_path.display()
			));
		}
		ctx.success(&format!(
			"Deployment committed: {} executed, {} unchanged",
			outcome.executed(),
			outcome.skipped()
		));

		close(conn).await;
		Ok(())
	}
}

/// Apply arbitrary SQL files without touching the manifest
pub struct ApplyCommand;

#[async_trait]
impl BaseCommand for ApplyCommand {
	fn name(&self) -> &str {
		"apply"
	}

	fn description(&self) -> &str {
		"Apply SQL files in one transaction, skipping unchanged definitions"
	}

	async fn execute(&self, ctx: &CommandContext) -> CommandResult<()> {
		if ctx.args.is_empty() {
			return Err(CommandError::InvalidArguments(
				"at least one SQL file is required".to_string(),
			));
		}
		let paths: Vec<&Path> = ctx.args.iter().map(Path::new).collect();

		let settings = load_settings(ctx)?;
		let mut conn = connect(ctx, &settings).await?;

		let reports = run_apply(&mut conn, &paths, &settings.default_schema).await?;
		for report in &reports {
			print_report(ctx, report);
		}
		let executed: usize = reports.iter().map(|r| r.executed).sum();
		let skipped: usize = reports.iter().map(|r| r.skipped).sum();
		ctx.success(&format!(
			"Applied {} file(s): {} executed, {} unchanged",
			reports.len(),
			executed,
			skipped
		));

		close(conn).await;
		Ok(())
	}
}

/// List the stored procedure manifest
pub struct ProceduresCommand;

#[async_trait]
impl BaseCommand for ProceduresCommand {
	fn name(&self) -> &str {
		"procedures"
	}

	fn description(&self) -> &str {
		"List stored procedures and their deployment status"
	}

	async fn execute(&self, ctx: &CommandContext) -> CommandResult<()> {
		let settings = load_settings(ctx)?;
		let manifest = ProcedureManifest::new(settings.layout.manifest_path());
		let entries = manifest.load()?;

		ctx.verbose(&format!("Manifest: {}", manifest.path().display()));
		for entry in &entries {
			let status = if entry.updated() {
				"deployed".green()
			} else {
				"pending".yellow()
			};
			let date = entry
				.date_update()
				.map(|d| d.to_string())
				.unwrap_or_else(|| "-".to_string());
			println!(
				"  {:<10} {:<12} {} ({})",
				status,
				date,
				entry.display_name(),
				entry.filename().unwrap_or("<no file>")
			);
		}

		let pending = ProcedureManifest::pending(&entries).count();
		ctx.info(&format!("{} procedure(s), {} pending", entries.len(), pending));
		Ok(())
	}
}

/// List the table catalog
pub struct TablesCommand;

#[async_trait]
impl BaseCommand for TablesCommand {
	fn name(&self) -> &str {
		"tables"
	}

	fn description(&self) -> &str {
		"List the tables recorded in the table catalog"
	}

	async fn execute(&self, ctx: &CommandContext) -> CommandResult<()> {
		let settings = load_settings(ctx)?;
		let catalog = TableCatalog::new(settings.layout.table_catalog_path());
		let entries = catalog.load()?;

		let names = TableCatalog::names(&entries);
		for name in &names {
			println!("  {}", name);
		}
		if names.len() < entries.len() {
			ctx.warning(&format!(
				"{} catalog record(s) without a name",
				entries.len() - names.len()
			));
		}
		ctx.info(&format!("{} table(s) in {}", names.len(), catalog.path().display()));
		Ok(())
	}
}

/// Show how a file would be processed, without a database
pub struct InspectCommand;

impl InspectCommand {
	/// Schema given with `--schema`, else the configured default schema.
	pub fn default_schema(&self, ctx: &CommandContext) -> CommandResult<String> {
		match ctx.option("schema") {
			Some(schema) => Ok(schema.clone()),
			None => Ok(load_settings(ctx)?.default_schema),
		}
	}
}

#[async_trait]
impl BaseCommand for InspectCommand {
	fn name(&self) -> &str {
		"inspect"
	}

	fn description(&self) -> &str {
		"Show the statements of a SQL file with their object and normalized form"
	}

	async fn execute(&self, ctx: &CommandContext) -> CommandResult<()> {
		let path = ctx
			.arg(0)
			.map(PathBuf::from)
			.ok_or_else(|| CommandError::InvalidArguments("a SQL file is required".to_string()))?;
		if !path.is_file() {
			return Err(ctms_db::DeployError::MissingFile { path }.into());
		}
		let sql = std::fs::read_to_string(&path).map_err(|e| {
			CommandError::ExecutionError(format!("Failed to read {}: {}", path.display(), e))
		})?;

		let default_schema = self.default_schema(ctx)?;
		let statements = split_statements(&sql);
		for (index, statement) in statements.iter().enumerate() {
			let summary = describe_statement(statement, &default_schema);
			let object = match &summary.object {
				Some(object) => object.to_string().bold(),
				None => "statement (always executed)".dimmed(),
			};
			println!("{} {}", format!("[{}]", index + 1).cyan(), object);
			println!("    {}", summary.normalized);
			if ctx.verbosity() > 0 {
				for line in statement.lines() {
					println!("    | {}", line);
				}
			}
		}
		ctx.info(&format!(
			"{} statement(s) in {}",
			statements.len(),
			path.display()
		));
		Ok(())
	}
}

/// What the deployment pipeline sees in one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementSummary {
	/// Object the statement creates, if it is tracked
	pub object: Option<ObjectRef>,
	/// Form used for comparison with the live definition
	pub normalized: String,
}

pub fn describe_statement(statement: &str, default_schema: &str) -> StatementSummary {
	StatementSummary {
		object: identify_object(statement),
		normalized: normalize_sql_in_schema(statement, default_schema),
	}
}

fn load_settings(ctx: &CommandContext) -> CommandResult<Settings> {
	let settings = Settings::load(ctx.settings_file())?;
	ctx.verbose(&format!("Base directory: {}", settings.layout.base_dir.display()));
	Ok(settings)
}

async fn connect(ctx: &CommandContext, settings: &Settings) -> CommandResult<PgConnection> {
	let database = settings.database()?;
	let url = database.redacted_url();
	ctx.verbose(&format!("Connecting to {}", url));
	tracing::info!(url = %url, "Connecting to database");

	PgConnection::connect(&database.to_url())
		.await
		.map_err(|source| CommandError::Connection { url, source })
}

async fn close(conn: PgConnection) {
	if let Err(e) = conn.close().await {
		tracing::warn!(error = %e, "Failed to close database connection");
	}
}

fn print_report(ctx: &CommandContext, report: &FileReport) {
	let marker = if report.changed() {
		"applied".green()
	} else {
		"unchanged".dimmed()
	};
	println!(
		"  {:<10} {} ({} executed, {} unchanged)",
		marker, report.label, report.executed, report.skipped
	);
	ctx.verbose(&format!("Finished {}", report.label));
}

#[cfg(test)]
mod tests {
	use super::*;
	use ctms_db::deploy::ObjectKind;
	use rstest::rstest;

	#[rstest]
	fn test_describe_tracked_statement() {
		let summary = describe_statement(
			"CREATE OR REPLACE VIEW public.open_trials AS\n  SELECT id FROM trials;",
			"public",
		);

		let object = summary.object.unwrap();
		assert_eq!(object.kind, ObjectKind::View);
		assert_eq!(object.name.name, "open_trials");
		assert_eq!(summary.normalized, "create view open_trials as select id from trials");
	}

	#[rstest]
	fn test_describe_untracked_statement() {
		let summary = describe_statement("INSERT INTO phases VALUES ('I');", "public");

		assert!(summary.object.is_none());
		assert_eq!(summary.normalized, "insert into phases values ('i')");
	}

	#[rstest]
	#[case(&BootstrapCommand as &dyn BaseCommand, "bootstrap")]
	#[case(&ApplyCommand as &dyn BaseCommand, "apply")]
	#[case(&ProceduresCommand as &dyn BaseCommand, "procedures")]
	#[case(&TablesCommand as &dyn BaseCommand, "tables")]
	#[case(&InspectCommand as &dyn BaseCommand, "inspect")]
	fn test_command_names(#[case] command: &dyn BaseCommand, #[case] expected: &str) {
		assert_eq!(command.name(), expected);
		assert!(!command.description().is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_apply_requires_files() {
		let result = ApplyCommand.execute(&CommandContext::default()).await;
		assert!(matches!(result, Err(CommandError::InvalidArguments(_))));
	}

	#[rstest]
	#[tokio::test]
	async fn test_inspect_missing_file() {
		let ctx = CommandContext::new(vec!["/nonexistent/schema.sql".to_string()]);
		let result = InspectCommand.execute(&ctx).await;
		assert!(matches!(
			result,
			Err(CommandError::Deploy(ctms_db::DeployError::MissingFile { .. }))
		));
	}
}
