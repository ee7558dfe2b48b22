//! Deployment metadata files
//!
//! Both the stored-procedure manifest (`procedures.json`) and the table
//! catalog (`tables.json`) are JSON lists of objects. They are loaded whole,
//! mutated in memory and written back whole: pretty-printed with a trailing
//! newline, through a temporary file renamed over the original.

use super::{DeployError, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};

const NAME_KEY: &str = "name";
const FILENAME_KEY: &str = "filename";
const UPDATED_KEY: &str = "updated";
const DATE_UPDATE_KEY: &str = "date_update";

/// One stored-procedure file and its deployment state.
///
/// The entry is kept as the JSON object read from the manifest, so keys
/// keep their order and keys this tool does not interpret are written back
/// unchanged. Deployment only touches `updated` and `date_update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestEntry(Map<String, Value>);

impl ManifestEntry {
	pub fn new(name: impl Into<String>, filename: impl Into<String>) -> Self {
		let mut fields = Map::new();
		fields.insert(NAME_KEY.to_string(), Value::String(name.into()));
		fields.insert(FILENAME_KEY.to_string(), Value::String(filename.into()));
		fields.insert(UPDATED_KEY.to_string(), Value::Bool(false));
		fields.insert(DATE_UPDATE_KEY.to_string(), Value::Null);
		Self(fields)
	}

	/// Display name of the procedure.
	pub fn name(&self) -> Option<&str> {
		self.0.get(NAME_KEY).and_then(Value::as_str)
	}

	/// Path of the SQL file, relative to the procedures directory.
	pub fn filename(&self) -> Option<&str> {
		self.0.get(FILENAME_KEY).and_then(Value::as_str)
	}

	/// Whether the file has been deployed at least once.
	pub fn updated(&self) -> bool {
		self.0
			.get(UPDATED_KEY)
			.and_then(Value::as_bool)
			.unwrap_or(false)
	}

	/// Date of the last deployment.
	pub fn date_update(&self) -> Option<NaiveDate> {
		self.0
			.get(DATE_UPDATE_KEY)
			.and_then(Value::as_str)
			.and_then(|date| date.parse().ok())
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	pub fn set_updated(&mut self, updated: bool) {
		self.0.insert(UPDATED_KEY.to_string(), Value::Bool(updated));
	}

	pub fn set_date_update(&mut self, date: Option<NaiveDate>) {
		let value = date.map_or(Value::Null, |d| Value::String(d.to_string()));
		self.0.insert(DATE_UPDATE_KEY.to_string(), value);
	}

	/// Set `filename`, or remove the key for `None`.
	pub fn set_filename(&mut self, filename: Option<&str>) {
		match filename {
			Some(filename) => {
				self.0
					.insert(FILENAME_KEY.to_string(), Value::String(filename.to_string()));
			}
			None => {
				self.0.remove(FILENAME_KEY);
			}
		}
	}

	pub fn display_name(&self) -> &str {
		self.name().unwrap_or("<unknown>")
	}

	/// Record a deployment made on `run_date`.
	pub fn mark_deployed(&mut self, run_date: NaiveDate) {
		self.set_updated(true);
		self.set_date_update(Some(run_date));
	}

	/// Check the types of the keys this tool reads.
	fn validate(&self) -> std::result::Result<(), String> {
		for key in [NAME_KEY, FILENAME_KEY] {
			match self.0.get(key) {
				None | Some(Value::Null | Value::String(_)) => {}
				Some(other) => return Err(format!("`{}` must be a string, found {}", key, other)),
			}
		}
		match self.0.get(UPDATED_KEY) {
			None | Some(Value::Null | Value::Bool(_)) => {}
			Some(other) => return Err(format!("`{}` must be a boolean, found {}", UPDATED_KEY, other)),
		}
		match self.0.get(DATE_UPDATE_KEY) {
			None | Some(Value::Null) => Ok(()),
			Some(Value::String(date)) if date.parse::<NaiveDate>().is_ok() => Ok(()),
			Some(other) => Err(format!(
				"`{}` must be a YYYY-MM-DD date or null, found {}",
				DATE_UPDATE_KEY, other
			)),
		}
	}
}

/// The persisted list of stored-procedure deployment records.
#[derive(Debug, Clone)]
pub struct ProcedureManifest {
	path: PathBuf,
}

impl ProcedureManifest {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Load all entries in file order.
	///
	/// # Errors
	///
	/// [`DeployError::ConfigurationMissing`] when the file does not exist,
	/// [`DeployError::ConfigurationInvalid`] when it is not a JSON list of
	/// objects, or when `name`, `filename`, `updated` or `date_update` has
	/// the wrong type.
	pub fn load(&self) -> Result<Vec<ManifestEntry>> {
		let entries: Vec<ManifestEntry> = load_records(&self.path)?;
		for (index, entry) in entries.iter().enumerate() {
			entry
				.validate()
				.map_err(|reason| DeployError::ConfigurationInvalid {
					path: self.path.clone(),
					reason: format!("entry {}: {}", index, reason),
				})?;
		}
		Ok(entries)
	}

	/// Replace the file with `entries`.
	pub fn save(&self, entries: &[ManifestEntry]) -> Result<()> {
		save_records(&self.path, entries)?;
		tracing::info!(path = %self.path.display(), entries = entries.len(), "Procedure manifest saved");
		Ok(())
	}

	/// Entries not yet deployed, in manifest order.
	pub fn pending(entries: &[ManifestEntry]) -> impl Iterator<Item = &ManifestEntry> {
		entries.iter().filter(|entry| !entry.updated())
	}
}

/// A free-form table catalog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableCatalogEntry(pub Map<String, Value>);

impl TableCatalogEntry {
	pub fn name(&self) -> Option<&str> {
		self.0.get("name").and_then(Value::as_str)
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}
}

/// Table metadata kept next to the schema files.
#[derive(Debug, Clone)]
pub struct TableCatalog {
	path: PathBuf,
}

impl TableCatalog {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn load(&self) -> Result<Vec<TableCatalogEntry>> {
		load_records(&self.path)
	}

	pub fn save(&self, entries: &[TableCatalogEntry]) -> Result<()> {
		save_records(&self.path, entries)
	}

	/// Names of all catalogued tables, skipping records without one.
	pub fn names(entries: &[TableCatalogEntry]) -> Vec<&str> {
		entries.iter().filter_map(TableCatalogEntry::name).collect()
	}
}

fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
	if !path.exists() {
		return Err(DeployError::ConfigurationMissing {
			path: path.to_path_buf(),
		});
	}

	let text = std::fs::read_to_string(path)?;
	let invalid = |reason: String| DeployError::ConfigurationInvalid {
		path: path.to_path_buf(),
		reason,
	};

	let value: Value = serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;
	let Value::Array(items) = value else {
		return Err(invalid("expected a list of objects".to_string()));
	};

	items
		.into_iter()
		.enumerate()
		.map(|(index, item)| {
			if !item.is_object() {
				return Err(invalid(format!("entry {} is not an object", index)));
			}
			serde_json::from_value(item).map_err(|e| invalid(format!("entry {}: {}", index, e)))
		})
		.collect()
}

fn save_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
	let mut text = serde_json::to_string_pretty(records)?;
	text.push('\n');

	let dir = match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent,
		_ => Path::new("."),
	};
	let mut file = tempfile::NamedTempFile::new_in(dir)?;
	file.write_all(text.as_bytes())?;
	file.as_file().sync_all()?;
	file.persist(path).map_err(|e| e.error)?;
	Ok(())
}
