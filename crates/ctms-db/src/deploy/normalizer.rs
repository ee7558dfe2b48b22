//! SQL normalization for definition comparison
//!
//! Two definitions are considered equal for deployment purposes when their
//! normalized forms are identical strings. The normalization is purely
//! textual: reordered columns or rewritten expressions still compare as
//! different and cause a (harmless) re-apply.

use regex::Regex;
use std::sync::LazyLock;

/// Schema whose qualifier is stripped when no other schema is configured.
pub use ctms_conf::settings::DEFAULT_SCHEMA;

static LINE_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"--[^\n]*").unwrap());
static BLOCK_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static OR_REPLACE_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?i)\bCREATE OR REPLACE\b").unwrap());
static IF_NOT_EXISTS_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?i)\s*\bIF NOT EXISTS\b").unwrap());

/// Remove `--` line comments and `/* */` block comments.
pub fn strip_comments(sql: &str) -> String {
	let sql = BLOCK_COMMENT_RE.replace_all(sql, " ");
	LINE_COMMENT_RE.replace_all(&sql, "").into_owned()
}

/// Normalize a statement, stripping the `public` schema qualifier.
///
/// # Examples
///
/// ```
/// use ctms_db::deploy::normalizer::normalize_sql;
///
/// assert_eq!(
/// 	normalize_sql("CREATE OR REPLACE VIEW public.v AS SELECT 1"),
/// 	normalize_sql("CREATE VIEW v AS\n  SELECT 1;"),
/// );
/// ```
pub fn normalize_sql(sql: &str) -> String {
	normalize_sql_in_schema(sql, DEFAULT_SCHEMA)
}

/// Normalize a statement, stripping qualifiers naming `default_schema`.
pub fn normalize_sql_in_schema(sql: &str, default_schema: &str) -> String {
	let sql = strip_comments(sql);
	let sql = strip_terminator(&sql);
	let sql = WHITESPACE_RE.replace_all(sql, " ");
	let sql = strip_schema_qualifier(&sql, default_schema);
	let sql = OR_REPLACE_RE.replace_all(&sql, "CREATE");
	let sql = IF_NOT_EXISTS_RE.replace_all(&sql, "");
	sql.trim().to_lowercase()
}

fn strip_terminator(sql: &str) -> &str {
	sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

/// Drop `schema.` and `"schema".` prefixes that are not part of a longer
/// identifier.
fn strip_schema_qualifier(sql: &str, schema: &str) -> String {
	if schema.is_empty() {
		return sql.to_string();
	}
	let escaped = regex::escape(schema);
	let pattern = format!(r#"(?i)(^|[^\w$."])(?:"{escaped}"|\b{escaped})\."#);
	match Regex::new(&pattern) {
		Ok(re) => re.replace_all(sql, "$1").into_owned(),
		Err(_) => sql.to_string(),
	}
}
