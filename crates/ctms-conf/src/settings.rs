//! Settings resolution
//!
//! Precedence, lowest first: built-in defaults, the process environment
//! (after loading `.env`), then the optional TOML settings file.

pub mod database_config;
pub mod env;
pub mod layout;

pub use database_config::DatabaseConfig;
pub use env::{Env, EnvError, validate_env_var_name};
pub use layout::{DEFAULT_SCHEMA_FILES, DeployLayout};

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Schema whose qualifier is ignored when comparing definitions.
pub const DEFAULT_SCHEMA: &str = "public";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error(transparent)]
	Env(#[from] EnvError),

	#[error("Missing database environment variables: {}", .0.join(", "))]
	MissingDatabaseVariables(Vec<String>),

	#[error("Failed to read settings file {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Invalid settings file {}: {source}", path.display())]
	Toml {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},
}

/// Contents of a TOML settings file. Every key is optional.
///
/// ```toml
/// base_dir = "database"
/// default_schema = "public"
/// schema_files = ["vocabulary_tables.sql", "clinical_trial_tables.sql"]
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
	pub base_dir: Option<PathBuf>,
	pub schema_files: Option<Vec<String>>,
	pub default_schema: Option<String>,
}

impl SettingsFile {
	pub fn from_path(path: &Path) -> Result<Self, SettingsError> {
		let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		toml::from_str(&content).map_err(|source| SettingsError::Toml {
			path: path.to_path_buf(),
			source,
		})
	}
}

/// Everything a deployment command needs to run.
///
/// The database connection is resolved on demand so that commands working
/// only on files run without database variables.
#[derive(Debug, Clone)]
pub struct Settings {
	pub layout: DeployLayout,
	pub default_schema: String,
	env: Env,
}

impl Settings {
	/// Load `.env` if present, then resolve from the process environment and
	/// the optional settings file.
	pub fn load(settings_file: Option<&Path>) -> Result<Self, SettingsError> {
		dotenv::dotenv().ok();
		Self::resolve(Env::new(), settings_file)
	}

	/// Resolve from `env` and the optional settings file.
	///
	/// A relative `base_dir` in the file is taken relative to the file's
	/// directory.
	pub fn resolve(env: Env, settings_file: Option<&Path>) -> Result<Self, SettingsError> {
		let mut layout = DeployLayout::from_env(&env)?;
		let mut default_schema = env.str_with_default("CTMS_DEFAULT_SCHEMA", Some(DEFAULT_SCHEMA))?;

		if let Some(path) = settings_file {
			let file = SettingsFile::from_path(path)?;
			if let Some(base_dir) = file.base_dir {
				let root = path.parent().unwrap_or(Path::new(""));
				layout = DeployLayout {
					base_dir,
					..layout
				}
				.rooted_at(root);
			}
			if let Some(schema_files) = file.schema_files {
				layout = layout.with_schema_files(schema_files);
			}
			if let Some(schema) = file.default_schema {
				default_schema = schema;
			}
		}

		Ok(Self {
			layout,
			default_schema,
			env,
		})
	}

	/// Database connection settings from the environment.
	pub fn database(&self) -> Result<DatabaseConfig, SettingsError> {
		DatabaseConfig::from_env(&self.env)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use serial_test::serial;
	use tempfile::TempDir;

	#[fixture]
	fn db_env() -> Env {
		Env::from_map([
			("DB_NAME", "ctms"),
			("DB_USER", "deployer"),
			("CTMS_BASE_DIR", "/var/lib/ctms"),
		])
	}

	#[rstest]
	fn test_resolve_from_env_only(db_env: Env) {
		let settings = Settings::resolve(db_env, None).unwrap();

		assert_eq!(settings.layout.base_dir, Path::new("/var/lib/ctms"));
		assert_eq!(settings.layout.schema_files.len(), DEFAULT_SCHEMA_FILES.len());
		assert_eq!(settings.default_schema, "public");
		assert_eq!(
			settings.database().unwrap().to_url(),
			"postgresql://deployer@localhost:5432/ctms"
		);
	}

	#[rstest]
	fn test_layout_resolves_without_database_variables() {
		let settings = Settings::resolve(Env::from_map([("CTMS_BASE_DIR", "db")]), None).unwrap();

		assert_eq!(settings.layout.sql_dir(), Path::new("db/sql"));
		assert!(matches!(
			settings.database(),
			Err(SettingsError::MissingDatabaseVariables(_))
		));
	}

	#[rstest]
	fn test_settings_file_overrides_layout(db_env: Env) {
		// Arrange
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("ctms.toml");
		std::fs::write(
			&path,
			r#"
base_dir = "db"
default_schema = "ctms"
schema_files = ["core.sql", "seed.sql"]
"#,
		)
		.unwrap();

		// Act
		let settings = Settings::resolve(db_env, Some(&path)).unwrap();

		// Assert
		assert_eq!(settings.layout.base_dir, dir.path().join("db"));
		assert_eq!(settings.layout.schema_files, vec!["core.sql", "seed.sql"]);
		assert_eq!(settings.default_schema, "ctms");
	}

	#[rstest]
	fn test_unknown_settings_key_is_rejected(db_env: Env) {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("ctms.toml");
		std::fs::write(&path, "schema = \"typo\"\n").unwrap();

		let result = Settings::resolve(db_env, Some(&path));

		assert!(matches!(result, Err(SettingsError::Toml { .. })));
	}

	#[rstest]
	fn test_missing_settings_file(db_env: Env) {
		let result = Settings::resolve(db_env, Some(Path::new("/nonexistent/ctms.toml")));
		assert!(matches!(result, Err(SettingsError::Io { .. })));
	}

	#[rstest]
	#[serial(env)]
	fn test_load_reads_process_environment() {
		// SAFETY: Setting environment variables is unsafe in multi-threaded programs.
		// This test uses #[serial] to ensure exclusive access to environment variables.
		unsafe {
			std::env::set_var("DATABASE_URL", "postgres://ci@localhost/ctms_ci");
		}

		let database = Settings::load(None).unwrap().database().unwrap();

		// SAFETY: Removing environment variables is unsafe in multi-threaded programs.
		// This test uses #[serial] to ensure exclusive access to environment variables.
		unsafe {
			std::env::remove_var("DATABASE_URL");
		}
		assert_eq!(database.to_url(), "postgres://ci@localhost/ctms_ci");
	}
}
