//! Environment variable handling module
//!
//! Typed access to environment variables, either from the process
//! environment or from an explicit map.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Environment variable reader with prefix support
#[derive(Debug, Clone, Default)]
pub struct Env {
	/// Optional prefix for environment variables (e.g., "CTMS_")
	pub prefix: Option<String>,

	/// Fixed variable set used instead of the process environment
	vars: Option<HashMap<String, String>>,
}

impl Env {
	/// Read from the process environment
	pub fn new() -> Self {
		Self::default()
	}

	/// Read from `vars` only, ignoring the process environment
	pub fn from_map<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			prefix: None,
			vars: Some(
				vars.into_iter()
					.map(|(k, v)| (k.into(), v.into()))
					.collect(),
			),
		}
	}

	/// Set a prefix for all environment variable lookups
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}

	fn get_key_name(&self, key: &str) -> String {
		match &self.prefix {
			Some(prefix) => format!("{}{}", prefix, key),
			None => key.to_string(),
		}
	}

	fn lookup(&self, full_key: &str) -> Option<String> {
		match &self.vars {
			Some(vars) => vars.get(full_key).cloned(),
			None => env::var(full_key).ok(),
		}
	}

	/// Read an optional value; empty strings count as unset
	pub fn opt(&self, key: &str) -> Result<Option<String>, EnvError> {
		let full_key = self.get_key_name(key);
		validate_env_var_name(&full_key)?;
		Ok(self.lookup(&full_key).filter(|v| !v.is_empty()))
	}

	/// Read a string value from environment
	pub fn str(&self, key: &str) -> Result<String, EnvError> {
		self.str_with_default(key, None)
	}

	/// Read a string value with a default
	pub fn str_with_default(&self, key: &str, default: Option<&str>) -> Result<String, EnvError> {
		match self.opt(key)? {
			Some(val) => Ok(val),
			None => match default {
				Some(d) => Ok(d.to_string()),
				None => Err(EnvError::MissingVariable(self.get_key_name(key))),
			},
		}
	}

	/// Read an integer value with a default
	pub fn int_with_default(&self, key: &str, default: Option<i64>) -> Result<i64, EnvError> {
		match self.opt(key)? {
			Some(val) => val.trim().parse::<i64>().map_err(|e| EnvError::ParseError {
				key: self.get_key_name(key),
				value_len: val.len(),
				error: e.to_string(),
			}),
			None => match default {
				Some(d) => Ok(d),
				None => Err(EnvError::MissingVariable(self.get_key_name(key))),
			},
		}
	}

	/// Read a path value with a default
	pub fn path_with_default(
		&self,
		key: &str,
		default: Option<PathBuf>,
	) -> Result<PathBuf, EnvError> {
		match self.opt(key)? {
			Some(val) => Ok(PathBuf::from(val)),
			None => match default {
				Some(d) => Ok(d),
				None => Err(EnvError::MissingVariable(self.get_key_name(key))),
			},
		}
	}
}

/// Validates an environment variable name.
///
/// Rejects names that are empty, contain control characters, or contain
/// the `=` character.
pub fn validate_env_var_name(name: &str) -> Result<(), EnvError> {
	if name.is_empty() {
		return Err(EnvError::InvalidVariableName {
			name: name.to_string(),
			reason: "environment variable name must not be empty".to_string(),
		});
	}

	if let Some(pos) = name.find(|c: char| c.is_control()) {
		return Err(EnvError::InvalidVariableName {
			name: name.to_string(),
			reason: format!(
				"environment variable name contains control character at position {}",
				pos
			),
		});
	}

	if name.contains('=') {
		return Err(EnvError::InvalidVariableName {
			name: name.to_string(),
			reason: "environment variable name must not contain '='".to_string(),
		});
	}

	Ok(())
}

/// Environment variable errors
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
	#[error("Missing environment variable: {0}")]
	MissingVariable(String),

	#[error("Failed to parse environment variable '{key}' (value length: {value_len}): {error}")]
	ParseError {
		key: String,
		/// Length of the original value; the value itself may be a secret
		value_len: usize,
		error: String,
	},

	#[error("Invalid environment variable name '{name}': {reason}")]
	InvalidVariableName { name: String, reason: String },
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serial_test::serial;

	#[rstest]
	#[serial(env)]
	fn test_env_str_from_process() {
		// SAFETY: Setting environment variables is unsafe in multi-threaded programs.
		// This test uses #[serial] to ensure exclusive access to environment variables.
		unsafe {
			env::set_var("CTMS_TEST_STR", "hello");
		}
		let env = Env::new().with_prefix("CTMS_");
		assert_eq!(env.str("TEST_STR").unwrap(), "hello");
		// SAFETY: Removing environment variables is unsafe in multi-threaded programs.
		// This test uses #[serial] to ensure exclusive access to environment variables.
		unsafe {
			env::remove_var("CTMS_TEST_STR");
		}
	}

	#[rstest]
	fn test_env_map_ignores_process_environment() {
		let env = Env::from_map([("DB_HOST", "db.internal")]);
		assert_eq!(env.str("DB_HOST").unwrap(), "db.internal");
		assert!(matches!(
			env.str("PATH"),
			Err(EnvError::MissingVariable(key)) if key == "PATH"
		));
	}

	#[rstest]
	fn test_empty_value_counts_as_unset() {
		let env = Env::from_map([("DB_PASSWORD", "")]);
		assert_eq!(env.opt("DB_PASSWORD").unwrap(), None);
		assert_eq!(
			env.str_with_default("DB_PASSWORD", Some("fallback")).unwrap(),
			"fallback"
		);
	}

	#[rstest]
	#[case("5433", 5433)]
	#[case(" 6543 ", 6543)]
	fn test_int_with_default_parses(#[case] raw: &str, #[case] expected: i64) {
		let env = Env::from_map([("DB_PORT", raw)]);
		assert_eq!(env.int_with_default("DB_PORT", Some(5432)).unwrap(), expected);
	}

	#[rstest]
	fn test_int_parse_error_hides_value() {
		// Arrange
		let env = Env::from_map([("DB_PORT", "s3cr3t")]);

		// Act
		let err = env.int_with_default("DB_PORT", Some(5432)).unwrap_err();

		// Assert
		let message = err.to_string();
		assert!(message.contains("value length: 6"));
		assert!(!message.contains("s3cr3t"));
	}

	#[rstest]
	#[case("")]
	#[case("BAD=NAME")]
	#[case("BAD\nNAME")]
	fn test_invalid_variable_names(#[case] name: &str) {
		assert!(matches!(
			validate_env_var_name(name),
			Err(EnvError::InvalidVariableName { .. })
		));
	}
}
