//! Whole-run orchestration
//!
//! A run applies the ordered schema files, then every stored-procedure file
//! the manifest has not recorded as deployed. [`run_bootstrap`] performs the
//! run inside one transaction and persists the manifest only once the
//! transaction has committed.

use super::catalog::SchemaConnection;
use super::executor::{FileReport, SchemaDeployer};
use super::manifest::{ManifestEntry, ProcedureManifest};
use super::normalizer::DEFAULT_SCHEMA;
use super::{DeployError, Result};
use chrono::NaiveDate;
use sqlx::{Connection, PgConnection};
use std::path::{Path, PathBuf};

/// Inputs of a deployment run.
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
	/// Schema files, applied in this order.
	pub schema_files: Vec<PathBuf>,
	/// Directory the manifest's `filename` entries are relative to.
	pub procedures_dir: PathBuf,
	/// Location of the procedure manifest.
	pub manifest_path: PathBuf,
	/// Schema whose qualifier is ignored when comparing definitions.
	pub default_schema: String,
}

impl DeploymentPlan {
	pub fn new(procedures_dir: impl Into<PathBuf>, manifest_path: impl Into<PathBuf>) -> Self {
		Self {
			schema_files: Vec::new(),
			procedures_dir: procedures_dir.into(),
			manifest_path: manifest_path.into(),
			default_schema: DEFAULT_SCHEMA.to_string(),
		}
	}

	pub fn with_schema_file(mut self, path: impl Into<PathBuf>) -> Self {
		self.schema_files.push(path.into());
		self
	}

	pub fn with_schema_files<I, P>(mut self, paths: I) -> Self
	where
		I: IntoIterator<Item = P>,
		P: Into<PathBuf>,
	{
		self.schema_files.extend(paths.into_iter().map(Into::into));
		self
	}

	pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
		self.default_schema = schema.into();
		self
	}

	pub fn manifest(&self) -> ProcedureManifest {
		ProcedureManifest::new(&self.manifest_path)
	}
}

/// Result of a deployment run.
#[derive(Debug, Clone)]
pub struct DeploymentOutcome {
	/// Reports for the schema files, in plan order.
	pub schema_reports: Vec<FileReport>,
	/// Reports for the stored-procedure files deployed in this run.
	pub procedure_reports: Vec<FileReport>,
	/// Manifest entries after the run.
	pub manifest: Vec<ManifestEntry>,
	/// Whether any manifest entry was modified.
	pub manifest_changed: bool,
}

impl DeploymentOutcome {
	fn reports(&self) -> impl Iterator<Item = &FileReport> {
		self.schema_reports.iter().chain(&self.procedure_reports)
	}

	/// Statements executed across all files.
	pub fn executed(&self) -> usize {
		self.reports().map(|r| r.executed).sum()
	}

	/// Statements skipped as unchanged across all files.
	pub fn skipped(&self) -> usize {
		self.reports().map(|r| r.skipped).sum()
	}
}

/// Apply the schema files and pending stored procedures of `plan` on `conn`.
///
/// No transaction handling happens here; callers wrap the connection in a
/// transaction. `entries` are only modified in memory.
pub async fn deploy_all<C>(
	conn: &mut C,
	plan: &DeploymentPlan,
	mut entries: Vec<ManifestEntry>,
	run_date: NaiveDate,
) -> Result<DeploymentOutcome>
where
	C: SchemaConnection + ?Sized,
{
	let mut deployer = SchemaDeployer::new(conn).with_default_schema(plan.default_schema.clone());

	let mut schema_reports = Vec::with_capacity(plan.schema_files.len());
	for path in &plan.schema_files {
		schema_reports.push(deployer.apply_file(path).await?);
	}

	let mut procedure_reports = Vec::new();
	let mut manifest_changed = false;
	for entry in entries.iter_mut().filter(|entry| !entry.updated()) {
		let filename = entry
			.filename()
			.filter(|f| !f.is_empty())
			.ok_or_else(|| DeployError::ConfigurationInvalid {
				path: plan.manifest_path.clone(),
				reason: format!(
					"stored procedure metadata for {} is missing a filename",
					entry.display_name()
				),
			})?;

		let report = deployer.apply_file(&plan.procedures_dir.join(filename)).await?;
		tracing::info!(
			procedure = entry.display_name(),
			changed = report.changed(),
			"Stored procedure deployed"
		);
		entry.mark_deployed(run_date);
		manifest_changed = true;
		procedure_reports.push(report);
	}

	Ok(DeploymentOutcome {
		schema_reports,
		procedure_reports,
		manifest: entries,
		manifest_changed,
	})
}

/// Run a complete deployment atomically.
///
/// The manifest is loaded up front, every statement runs in one
/// transaction, and the manifest is rewritten only after a successful
/// commit. On any failure the transaction is rolled back and the manifest
/// file is left untouched.
pub async fn run_bootstrap(
	conn: &mut PgConnection,
	plan: &DeploymentPlan,
	run_date: NaiveDate,
) -> Result<DeploymentOutcome> {
	let manifest = plan.manifest();
	let entries = manifest.load()?;

	let mut tx = conn.begin().await?;
	let outcome = match deploy_all(&mut *tx, plan, entries, run_date).await {
		Ok(outcome) => outcome,
		Err(e) => {
			tracing::error!(error = %e, "Deployment failed; rolling back");
			if let Err(rollback) = tx.rollback().await {
				tracing::warn!(error = %rollback, "Rollback failed");
			}
			return Err(e);
		}
	};
	tx.commit().await?;
	tracing::info!(
		executed = outcome.executed(),
		skipped = outcome.skipped(),
		"Deployment committed"
	);

	if outcome.manifest_changed {
		manifest.save(&outcome.manifest)?;
	}
	Ok(outcome)
}

/// Apply arbitrary SQL files in one transaction, without touching the
/// manifest.
pub async fn run_apply(
	conn: &mut PgConnection,
	paths: &[&Path],
	default_schema: &str,
) -> Result<Vec<FileReport>> {
	let mut tx = conn.begin().await?;
	let reports = match apply_paths(&mut *tx, paths, default_schema).await {
		Ok(reports) => reports,
		Err(e) => {
			tracing::error!(error = %e, "Apply failed; rolling back");
			if let Err(rollback) = tx.rollback().await {
				tracing::warn!(error = %rollback, "Rollback failed");
			}
			return Err(e);
		}
	};
	tx.commit().await?;
	Ok(reports)
}

async fn apply_paths<C>(conn: &mut C, paths: &[&Path], default_schema: &str) -> Result<Vec<FileReport>>
where
	C: SchemaConnection + ?Sized,
{
	let mut deployer = SchemaDeployer::new(conn).with_default_schema(default_schema);
	let mut reports = Vec::with_capacity(paths.len());
	for path in paths {
		reports.push(deployer.apply_file(path).await?);
	}
	Ok(reports)
}
