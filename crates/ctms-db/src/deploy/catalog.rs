//! Live definition lookup
//!
//! Reads the definition the server currently holds for an object named by a
//! DDL statement. Lookups are never cached; the only state kept across calls
//! is whether the server offers a table-definition rendering function.

use super::identifier::{ObjectKind, ObjectRef};
use super::{DeployError, Result};
use async_trait::async_trait;

/// Name of the optional extension function rendering `CREATE TABLE` text.
pub const TABLE_DEFINITION_FUNCTION: &str = "pg_get_tabledef";

/// The only overload of [`TABLE_DEFINITION_FUNCTION`] the fetcher calls.
pub const TABLE_DEFINITION_SIGNATURE: &str = "pg_get_tabledef(regclass)";

/// Filter for a routine lookup in `pg_proc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineQuery<'a> {
	/// Folded routine name.
	pub name: &'a str,
	/// `pg_proc.prokind` (`f` or `p`).
	pub prokind: &'a str,
	/// Folded schema, when the statement qualified the name.
	pub schema: Option<&'a str>,
	/// Argument types, when the parameter list could be extracted.
	pub signature: Option<&'a str>,
}

/// Database operations the deployment pipeline relies on.
///
/// Implemented for `sqlx::PgConnection` (and therefore for an open
/// transaction through `&mut *tx`); tests substitute an in-memory catalog.
#[async_trait]
pub trait SchemaConnection: Send {
	/// Execute one statement.
	async fn execute(&mut self, sql: &str) -> std::result::Result<(), sqlx::Error>;

	/// `to_regclass(name)::text`, `None` when the relation does not exist.
	async fn resolve_relation(&mut self, name: &str)
	-> std::result::Result<Option<String>, sqlx::Error>;

	/// Whether the routine `signature` (`name(argtype, ...)`) exists, as
	/// answered by `to_regprocedure`.
	async fn function_exists(&mut self, signature: &str)
	-> std::result::Result<bool, sqlx::Error>;

	/// Rendered `CREATE TABLE` text for a resolved relation. Only called
	/// once [`TABLE_DEFINITION_SIGNATURE`] is known to exist.
	async fn table_definition(
		&mut self,
		relation: &str,
	) -> std::result::Result<Option<String>, sqlx::Error>;

	/// `pg_get_viewdef` body for a resolved relation.
	async fn view_definition(
		&mut self,
		relation: &str,
	) -> std::result::Result<Option<String>, sqlx::Error>;

	/// `pg_get_functiondef` of every routine matching `query`.
	async fn routine_definitions(
		&mut self,
		query: &RoutineQuery<'_>,
	) -> std::result::Result<Vec<String>, sqlx::Error>;
}

/// Fetches live definitions, caching the table-definition capability for
/// the lifetime of one deployment run.
#[derive(Debug, Default)]
pub struct DefinitionFetcher {
	table_definition_available: Option<bool>,
}

impl DefinitionFetcher {
	pub fn new() -> Self {
		Self::default()
	}

	/// Cached capability flag, `None` until the first table lookup.
	pub fn table_definition_available(&self) -> Option<bool> {
		self.table_definition_available
	}

	/// Current definition of `object`, or `None` when it does not exist or
	/// cannot be determined unambiguously.
	pub async fn fetch<C>(&mut self, conn: &mut C, object: &ObjectRef) -> Result<Option<String>>
	where
		C: SchemaConnection + ?Sized,
	{
		match object.kind {
			ObjectKind::Table => self.fetch_table(conn, object).await,
			ObjectKind::View | ObjectKind::MaterializedView => {
				Self::fetch_view(conn, object).await
			}
			ObjectKind::Function | ObjectKind::Procedure => {
				match Self::fetch_routine(conn, object).await {
					Ok(definition) => Ok(Some(definition)),
					Err(DeployError::AmbiguousCatalogMatch { name, candidates }) => {
						tracing::warn!(
							object = %name,
							candidates,
							"Routine lookup is not conclusive; treating definition as unknown"
						);
						Ok(None)
					}
					Err(e) => Err(e),
				}
			}
		}
	}

	async fn fetch_table<C>(&mut self, conn: &mut C, object: &ObjectRef) -> Result<Option<String>>
	where
		C: SchemaConnection + ?Sized,
	{
		let Some(relation) = conn.resolve_relation(&object.name.raw).await? else {
			return Ok(None);
		};

		if !self.has_table_definition_function(conn).await? {
			return Ok(None);
		}

		Ok(conn.table_definition(&relation).await?)
	}

	async fn has_table_definition_function<C>(&mut self, conn: &mut C) -> Result<bool>
	where
		C: SchemaConnection + ?Sized,
	{
		if let Some(available) = self.table_definition_available {
			return Ok(available);
		}
		let available = conn.function_exists(TABLE_DEFINITION_SIGNATURE).await?;
		if !available {
			tracing::warn!(
				function = TABLE_DEFINITION_SIGNATURE,
				"Table definition function not available; table statements will always be executed"
			);
		}
		self.table_definition_available = Some(available);
		Ok(available)
	}

	async fn fetch_view<C>(conn: &mut C, object: &ObjectRef) -> Result<Option<String>>
	where
		C: SchemaConnection + ?Sized,
	{
		let Some(relation) = conn.resolve_relation(&object.name.raw).await? else {
			return Ok(None);
		};
		let Some(body) = conn.view_definition(&relation).await? else {
			return Ok(None);
		};

		let keyword = match object.kind {
			ObjectKind::MaterializedView => "CREATE MATERIALIZED VIEW",
			_ => "CREATE VIEW",
		};
		Ok(Some(format!("{} {} AS {}", keyword, relation, body)))
	}

	async fn fetch_routine<C>(conn: &mut C, object: &ObjectRef) -> Result<String>
	where
		C: SchemaConnection + ?Sized,
	{
		let prokind = object.kind.prokind().unwrap_or("f");
		let query = RoutineQuery {
			name: &object.name.name,
			prokind,
			schema: object.name.schema.as_deref(),
			signature: object.signature.as_deref(),
		};

		let mut definitions = conn.routine_definitions(&query).await?;
		if definitions.len() == 1 {
			return Ok(definitions.remove(0));
		}
		Err(DeployError::AmbiguousCatalogMatch {
			name: object.to_string(),
			candidates: definitions.len(),
		})
	}
}
