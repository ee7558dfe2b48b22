//! PostgreSQL implementation of [`SchemaConnection`]
//!
//! Statements go through the simple query protocol (`sqlx::raw_sql`) so
//! dollar-quoted bodies and positional parameters inside routine bodies are
//! passed to the server untouched. Catalog queries are parameterized.

use super::catalog::{RoutineQuery, SchemaConnection, TABLE_DEFINITION_FUNCTION};
use async_trait::async_trait;
use sqlx::PgConnection;

const RESOLVE_RELATION_SQL: &str = "SELECT to_regclass($1)::text";

const FUNCTION_EXISTS_SQL: &str = "SELECT to_regprocedure($1) IS NOT NULL";

const VIEW_DEFINITION_SQL: &str = "SELECT pg_get_viewdef($1::regclass, true)";

const ROUTINE_DEFINITIONS_SQL: &str = r#"
	SELECT pg_get_functiondef(p.oid)
	FROM pg_proc p
	JOIN pg_namespace n ON n.oid = p.pronamespace
	WHERE p.proname = $1
		AND p.prokind = $2::"char"
		AND ($3::text IS NULL OR n.nspname = $3)
		AND ($4::text IS NULL OR lower(oidvectortypes(p.proargtypes)) = lower($4))
	ORDER BY p.oid
"#;

#[async_trait]
impl SchemaConnection for PgConnection {
	async fn execute(&mut self, sql: &str) -> Result<(), sqlx::Error> {
		sqlx::Executor::execute(&mut *self, sqlx::raw_sql(sql)).await?;
		Ok(())
	}

	async fn resolve_relation(&mut self, name: &str) -> Result<Option<String>, sqlx::Error> {
		sqlx::query_scalar::<_, Option<String>>(RESOLVE_RELATION_SQL)
			.bind(name)
			.fetch_one(&mut *self)
			.await
	}

	async fn function_exists(&mut self, signature: &str) -> Result<bool, sqlx::Error> {
		sqlx::query_scalar::<_, bool>(FUNCTION_EXISTS_SQL)
			.bind(signature)
			.fetch_one(&mut *self)
			.await
	}

	async fn table_definition(&mut self, relation: &str) -> Result<Option<String>, sqlx::Error> {
		let sql = format!("SELECT {}($1::regclass)", TABLE_DEFINITION_FUNCTION);
		sqlx::query_scalar::<_, Option<String>>(&sql)
			.bind(relation)
			.fetch_one(&mut *self)
			.await
	}

	async fn view_definition(&mut self, relation: &str) -> Result<Option<String>, sqlx::Error> {
		sqlx::query_scalar::<_, Option<String>>(VIEW_DEFINITION_SQL)
			.bind(relation)
			.fetch_one(&mut *self)
			.await
	}

	async fn routine_definitions(
		&mut self,
		query: &RoutineQuery<'_>,
	) -> Result<Vec<String>, sqlx::Error> {
		sqlx::query_scalar::<_, String>(ROUTINE_DEFINITIONS_SQL)
			.bind(query.name)
			.bind(query.prokind)
			.bind(query.schema)
			.bind(query.signature)
			.fetch_all(&mut *self)
			.await
	}
}
