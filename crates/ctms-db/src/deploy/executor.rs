//! Per-file deployment pipeline

use super::catalog::{DefinitionFetcher, SchemaConnection};
use super::identifier::identify_object;
use super::normalizer::{DEFAULT_SCHEMA, normalize_sql_in_schema};
use super::splitter::split_statements;
use super::{DeployError, Result};
use std::path::Path;

const STATEMENT_EXCERPT_CHARS: usize = 200;

/// What happened to a single statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementOutcome {
	/// Sent to the server.
	Executed,
	/// The live definition already matches; nothing was sent.
	Unchanged,
}

/// Summary of one applied file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
	pub label: String,
	pub executed: usize,
	pub skipped: usize,
}

impl FileReport {
	fn new(label: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			executed: 0,
			skipped: 0,
		}
	}

	/// Whether any statement of the file was executed.
	pub fn changed(&self) -> bool {
		self.executed > 0
	}
}

/// Applies SQL through the split / identify / compare / execute pipeline.
///
/// One deployer corresponds to one deployment run: it owns the
/// [`DefinitionFetcher`] and therefore its cached capability flag.
pub struct SchemaDeployer<'c, C: SchemaConnection + ?Sized> {
	conn: &'c mut C,
	fetcher: DefinitionFetcher,
	default_schema: String,
}

impl<'c, C: SchemaConnection + ?Sized> SchemaDeployer<'c, C> {
	pub fn new(conn: &'c mut C) -> Self {
		Self {
			conn,
			fetcher: DefinitionFetcher::new(),
			default_schema: DEFAULT_SCHEMA.to_string(),
		}
	}

	/// Schema whose qualifier is ignored when comparing definitions.
	pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
		self.default_schema = schema.into();
		self
	}

	pub fn fetcher(&self) -> &DefinitionFetcher {
		&self.fetcher
	}

	/// Apply every statement of the file at `path`.
	///
	/// Fails with [`DeployError::MissingFile`] before anything runs if the
	/// file does not exist.
	pub async fn apply_file(&mut self, path: &Path) -> Result<FileReport> {
		if !path.is_file() {
			return Err(DeployError::MissingFile {
				path: path.to_path_buf(),
			});
		}
		let sql = std::fs::read_to_string(path)?;
		let label = path.display().to_string();

		tracing::info!(path = %label, "Applying SQL file");
		self.apply_sql(&label, &sql).await
	}

	/// Apply every statement of `sql`, reporting under `label`.
	pub async fn apply_sql(&mut self, label: &str, sql: &str) -> Result<FileReport> {
		let mut report = FileReport::new(label);
		for statement in split_statements(sql) {
			match self.apply_statement(label, &statement).await? {
				StatementOutcome::Executed => report.executed += 1,
				StatementOutcome::Unchanged => report.skipped += 1,
			}
		}

		tracing::debug!(
			file = %label,
			executed = report.executed,
			skipped = report.skipped,
			"File applied"
		);
		Ok(report)
	}

	/// Execute `statement` unless it creates an object whose live definition
	/// already matches.
	pub async fn apply_statement(&mut self, label: &str, statement: &str) -> Result<StatementOutcome> {
		if let Some(object) = identify_object(statement) {
			let live = self.fetcher.fetch(&mut *self.conn, &object).await?;
			match live {
				Some(live)
					if normalize_sql_in_schema(&live, &self.default_schema)
						== normalize_sql_in_schema(statement, &self.default_schema) =>
				{
					tracing::info!(object = %object, "No changes");
					return Ok(StatementOutcome::Unchanged);
				}
				Some(_) => tracing::debug!(object = %object, "Definition differs; applying"),
				None => tracing::debug!(object = %object, "No live definition; applying"),
			}
		}

		self.conn
			.execute(statement)
			.await
			.map_err(|source| DeployError::ExecutionFailure {
				source_label: label.to_string(),
				statement: excerpt(statement),
				source,
			})?;
		Ok(StatementOutcome::Executed)
	}
}

fn excerpt(statement: &str) -> String {
	let mut chars = statement.chars();
	let head: String = chars.by_ref().take(STATEMENT_EXCERPT_CHARS).collect();
	if chars.next().is_some() {
		format!("{}...", head)
	} else {
		head
	}
}
