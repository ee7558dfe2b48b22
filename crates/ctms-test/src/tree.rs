//! Temporary deployment tree

use ctms_db::deploy::{DeploymentPlan, ManifestEntry};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A `sql/` and `stored_procedures/` layout inside a temporary directory.
///
/// Schema files are added to the plan in the order they are written. The
/// directory is removed when the tree is dropped.
pub struct SqlTree {
	dir: TempDir,
	schema_files: Vec<PathBuf>,
}

impl SqlTree {
	pub fn new() -> Self {
		let dir = TempDir::new().expect("Failed to create temporary directory");
		fs::create_dir_all(dir.path().join("sql")).expect("Failed to create sql directory");
		fs::create_dir_all(dir.path().join("stored_procedures"))
			.expect("Failed to create stored_procedures directory");
		Self {
			dir,
			schema_files: Vec::new(),
		}
	}

	pub fn root(&self) -> &Path {
		self.dir.path()
	}

	pub fn sql_dir(&self) -> PathBuf {
		self.root().join("sql")
	}

	pub fn procedures_dir(&self) -> PathBuf {
		self.root().join("stored_procedures")
	}

	pub fn manifest_path(&self) -> PathBuf {
		self.procedures_dir().join("procedures.json")
	}

	/// Write a schema file and append it to the plan order.
	pub fn write_schema(&mut self, name: &str, sql: &str) -> PathBuf {
		let path = self.sql_dir().join(name);
		fs::write(&path, sql).expect("Failed to write schema file");
		self.schema_files.push(path.clone());
		path
	}

	/// Register a schema file the plan expects without creating it.
	pub fn expect_schema(&mut self, name: &str) -> PathBuf {
		let path = self.sql_dir().join(name);
		self.schema_files.push(path.clone());
		path
	}

	pub fn write_procedure(&self, filename: &str, sql: &str) -> PathBuf {
		let path = self.procedures_dir().join(filename);
		fs::write(&path, sql).expect("Failed to write stored procedure file");
		path
	}

	pub fn write_manifest(&self, entries: &[ManifestEntry]) {
		let mut text = serde_json::to_string_pretty(entries).expect("Failed to serialize manifest");
		text.push('\n');
		fs::write(self.manifest_path(), text).expect("Failed to write manifest");
	}

	/// Write the manifest verbatim.
	pub fn write_manifest_text(&self, text: &str) {
		fs::write(self.manifest_path(), text).expect("Failed to write manifest");
	}

	pub fn read_manifest_text(&self) -> String {
		fs::read_to_string(self.manifest_path()).expect("Failed to read manifest")
	}

	pub fn plan(&self) -> DeploymentPlan {
		DeploymentPlan::new(self.procedures_dir(), self.manifest_path())
			.with_schema_files(self.schema_files.iter().cloned())
	}
}

impl Default for SqlTree {
	fn default() -> Self {
		Self::new()
	}
}
