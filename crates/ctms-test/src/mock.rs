//! In-memory catalog
//!
//! [`MockCatalog`] stands in for a PostgreSQL connection. It answers the
//! catalog lookups of the deployment pipeline from maps seeded by the test,
//! records every executed statement, and updates those maps when an
//! executed statement creates a table, view or routine, so a second run
//! over the same SQL sees the definitions the first run installed.

use async_trait::async_trait;
use ctms_db::deploy::{
	DEFAULT_SCHEMA, ObjectKind, QualifiedName, RoutineQuery, SchemaConnection, identify_object,
};
use std::collections::{HashMap, HashSet};

/// A routine row as the mock's `pg_proc` holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRoutine {
	pub schema: String,
	pub name: String,
	pub prokind: String,
	/// Argument types, comparable case-insensitively like `oidvectortypes`.
	pub signature: String,
	pub definition: String,
}

/// In-memory [`SchemaConnection`].
///
/// # Example
///
/// ```rust
/// use ctms_test::MockCatalog;
///
/// let catalog = MockCatalog::new()
/// 	.with_view("trial_summary", "SELECT 1 AS one")
/// 	.failing_on("DROP TABLE");
/// assert!(catalog.executed().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MockCatalog {
	relations: HashMap<String, String>,
	table_definitions: HashMap<String, String>,
	view_definitions: HashMap<String, String>,
	routines: Vec<MockRoutine>,
	functions: HashSet<String>,
	executed: Vec<String>,
	fail_on: Option<String>,
	function_lookups: usize,
}

impl MockCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seed an existing view with the body `pg_get_viewdef` would return.
	pub fn with_view(mut self, name: &str, body: &str) -> Self {
		let relation = self.register_relation(name);
		self.view_definitions.insert(relation, body.to_string());
		self
	}

	/// Seed an existing table. `definition` is what the table-definition
	/// function renders, if the catalog offers it.
	pub fn with_table(mut self, name: &str, definition: &str) -> Self {
		let relation = self.register_relation(name);
		self.table_definitions.insert(relation, definition.to_string());
		self
	}

	/// Make the table-definition function visible in `pg_proc`.
	pub fn with_table_definition_function(self) -> Self {
		self.with_function(ctms_db::deploy::TABLE_DEFINITION_SIGNATURE)
	}

	/// Register a routine signature such as `pg_get_tabledef(text, text)`.
	pub fn with_function(mut self, signature: &str) -> Self {
		self.functions.insert(Self::signature_key(signature));
		self
	}

	pub fn with_routine(mut self, routine: MockRoutine) -> Self {
		self.routines.push(routine);
		self
	}

	/// Reject every statement containing `fragment`.
	pub fn failing_on(mut self, fragment: impl Into<String>) -> Self {
		self.fail_on = Some(fragment.into());
		self
	}

	/// Statements executed so far, in order.
	pub fn executed(&self) -> &[String] {
		&self.executed
	}

	/// Number of routine existence checks performed.
	pub fn function_lookups(&self) -> usize {
		self.function_lookups
	}

	pub fn routines(&self) -> &[MockRoutine] {
		&self.routines
	}

	fn signature_key(signature: &str) -> String {
		signature
			.chars()
			.filter(|c| !c.is_whitespace())
			.collect::<String>()
			.to_lowercase()
	}

	fn relation_key(name: &QualifiedName) -> String {
		format!(
			"{}.{}",
			name.schema.as_deref().unwrap_or(DEFAULT_SCHEMA),
			name.name
		)
	}

	fn register_relation(&mut self, raw: &str) -> String {
		let name = QualifiedName::parse(raw);
		let resolved = match name.schema.as_deref() {
			None | Some(DEFAULT_SCHEMA) => name.name.clone(),
			Some(schema) => format!("{}.{}", schema, name.name),
		};
		self.relations
			.insert(Self::relation_key(&name), resolved.clone());
		resolved
	}

	fn learn(&mut self, sql: &str) {
		let Some(object) = identify_object(sql) else {
			return;
		};

		match object.kind {
			ObjectKind::Table => {
				let relation = self.register_relation(&object.name.raw);
				self.table_definitions
					.entry(relation)
					.or_insert_with(|| sql.to_string());
			}
			ObjectKind::View | ObjectKind::MaterializedView => {
				let relation = self.register_relation(&object.name.raw);
				if let Some(at) = sql.to_ascii_uppercase().find(" AS ") {
					self.view_definitions
						.insert(relation, sql[at + 4..].trim().to_string());
				}
			}
			ObjectKind::Function | ObjectKind::Procedure => {
				let routine = MockRoutine {
					schema: object
						.name
						.schema
						.clone()
						.unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
					name: object.name.name.clone(),
					prokind: object.kind.prokind().unwrap_or("f").to_string(),
					signature: object.signature.clone().unwrap_or_default(),
					definition: sql.to_string(),
				};
				match self.routines.iter_mut().find(|r| {
					r.schema == routine.schema
						&& r.name == routine.name
						&& r.prokind == routine.prokind
						&& r.signature.eq_ignore_ascii_case(&routine.signature)
				}) {
					Some(existing) => *existing = routine,
					None => self.routines.push(routine),
				}
			}
		}
	}
}

#[async_trait]
impl SchemaConnection for MockCatalog {
	async fn execute(&mut self, sql: &str) -> Result<(), sqlx::Error> {
		if let Some(fragment) = &self.fail_on
			&& sql.contains(fragment.as_str())
		{
			return Err(sqlx::Error::Protocol(format!(
				"mock catalog rejected statement containing {:?}",
				fragment
			)));
		}
		self.executed.push(sql.to_string());
		self.learn(sql);
		Ok(())
	}

	async fn resolve_relation(&mut self, name: &str) -> Result<Option<String>, sqlx::Error> {
		let key = Self::relation_key(&QualifiedName::parse(name));
		Ok(self.relations.get(&key).cloned())
	}

	async fn function_exists(&mut self, signature: &str) -> Result<bool, sqlx::Error> {
		self.function_lookups += 1;
		Ok(self.functions.contains(&Self::signature_key(signature)))
	}

	async fn table_definition(&mut self, relation: &str) -> Result<Option<String>, sqlx::Error> {
		Ok(self.table_definitions.get(relation).cloned())
	}

	async fn view_definition(&mut self, relation: &str) -> Result<Option<String>, sqlx::Error> {
		Ok(self.view_definitions.get(relation).cloned())
	}

	async fn routine_definitions(
		&mut self,
		query: &RoutineQuery<'_>,
	) -> Result<Vec<String>, sqlx::Error> {
		Ok(self
			.routines
			.iter()
			.filter(|r| r.name == query.name && r.prokind == query.prokind)
			.filter(|r| query.schema.is_none_or(|schema| r.schema == schema))
			.filter(|r| {
				query
					.signature
					.is_none_or(|signature| r.signature.eq_ignore_ascii_case(signature))
			})
			.map(|r| r.definition.clone())
			.collect())
	}
}
