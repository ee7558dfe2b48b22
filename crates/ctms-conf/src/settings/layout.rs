//! On-disk layout of the SQL sources

use super::env::{Env, EnvError};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_DIR: &str = "database";

/// Schema files applied by a bootstrap run, in order.
pub const DEFAULT_SCHEMA_FILES: [&str; 5] = [
	"vocabulary_tables.sql",
	"auth_tables_postgres.sql",
	"clinical_trial_tables.sql",
	"supporting_objects.sql",
	"vocabulary_seed.sql",
];

/// Where schema files, stored procedures and their metadata live.
///
/// ```text
/// <base>/
/// ├── sql/
/// │   ├── tables.json
/// │   └── <schema files>
/// └── stored_procedures/
///     ├── procedures.json
///     └── <procedure files>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployLayout {
	pub base_dir: PathBuf,
	/// Schema file names relative to [`DeployLayout::sql_dir`].
	pub schema_files: Vec<String>,
}

impl DeployLayout {
	pub fn new(base_dir: impl Into<PathBuf>) -> Self {
		Self {
			base_dir: base_dir.into(),
			schema_files: DEFAULT_SCHEMA_FILES.iter().map(|f| f.to_string()).collect(),
		}
	}

	/// Base directory from `CTMS_BASE_DIR`, default `database`.
	pub fn from_env(env: &Env) -> Result<Self, EnvError> {
		let base_dir = env.path_with_default("CTMS_BASE_DIR", Some(PathBuf::from(DEFAULT_BASE_DIR)))?;
		Ok(Self::new(base_dir))
	}

	pub fn with_schema_files<I, S>(mut self, files: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.schema_files = files.into_iter().map(Into::into).collect();
		self
	}

	pub fn sql_dir(&self) -> PathBuf {
		self.base_dir.join("sql")
	}

	pub fn procedures_dir(&self) -> PathBuf {
		self.base_dir.join("stored_procedures")
	}

	pub fn manifest_path(&self) -> PathBuf {
		self.procedures_dir().join("procedures.json")
	}

	pub fn table_catalog_path(&self) -> PathBuf {
		self.sql_dir().join("tables.json")
	}

	/// Schema files resolved under the SQL directory, in application order.
	pub fn schema_paths(&self) -> Vec<PathBuf> {
		let sql_dir = self.sql_dir();
		self.schema_files.iter().map(|f| sql_dir.join(f)).collect()
	}

	/// Resolve a relative `base_dir` against `root`.
	pub fn rooted_at(mut self, root: &Path) -> Self {
		if self.base_dir.is_relative() {
			self.base_dir = root.join(&self.base_dir);
		}
		self
	}
}

impl Default for DeployLayout {
	fn default() -> Self {
		Self::new(DEFAULT_BASE_DIR)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_default_layout_paths() {
		let layout = DeployLayout::default();

		assert_eq!(
			layout.manifest_path(),
			Path::new("database/stored_procedures/procedures.json")
		);
		assert_eq!(layout.table_catalog_path(), Path::new("database/sql/tables.json"));
		assert_eq!(
			layout.schema_paths().first().map(PathBuf::as_path),
			Some(Path::new("database/sql/vocabulary_tables.sql"))
		);
		assert_eq!(
			layout.schema_paths().last().map(PathBuf::as_path),
			Some(Path::new("database/sql/vocabulary_seed.sql"))
		);
	}

	#[rstest]
	fn test_base_dir_from_env() {
		let env = Env::from_map([("CTMS_BASE_DIR", "/srv/ctms/db")]);

		let layout = DeployLayout::from_env(&env).unwrap();

		assert_eq!(layout.procedures_dir(), Path::new("/srv/ctms/db/stored_procedures"));
	}

	#[rstest]
	#[case("database", "/opt/app/database")]
	#[case("/srv/db", "/srv/db")]
	fn test_rooted_at(#[case] base: &str, #[case] expected: &str) {
		let layout = DeployLayout::new(base).rooted_at(Path::new("/opt/app"));
		assert_eq!(layout.base_dir, Path::new(expected));
	}
}
