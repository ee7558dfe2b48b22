//! Object identification for DDL statements
//!
//! Recognises `CREATE [OR REPLACE] {TABLE | VIEW | MATERIALIZED VIEW |
//! FUNCTION | PROCEDURE} [IF NOT EXISTS] <name>` headers and extracts what the
//! catalog lookup needs: the object kind, its (possibly schema-qualified)
//! name and, for routines, the argument type signature.

use super::normalizer::strip_comments;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

const IDENT: &str = r#"(?:"(?:[^"]|"")+"|[A-Za-z_][\w$]*)"#;

static CREATE_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(&format!(
		r"(?is)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(TABLE|VIEW|MATERIALIZED\s+VIEW|FUNCTION|PROCEDURE)\s+(?:IF\s+NOT\s+EXISTS\s+)?({IDENT}(?:\s*\.\s*{IDENT})?)"
	))
	.unwrap()
});
static DEFAULT_CLAUSE_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?is)(?:\s+DEFAULT\s|\s*=).*$").unwrap());

const PARAMETER_MODES: [&str; 4] = ["IN", "OUT", "INOUT", "VARIADIC"];

/// Kind of schema object a statement creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
	Table,
	View,
	MaterializedView,
	Function,
	Procedure,
}

impl ObjectKind {
	fn from_keyword(keyword: &str) -> Option<Self> {
		let keyword = keyword.split_whitespace().collect::<Vec<_>>().join(" ");
		match keyword.to_ascii_uppercase().as_str() {
			"TABLE" => Some(Self::Table),
			"VIEW" => Some(Self::View),
			"MATERIALIZED VIEW" => Some(Self::MaterializedView),
			"FUNCTION" => Some(Self::Function),
			"PROCEDURE" => Some(Self::Procedure),
			_ => None,
		}
	}

	/// Whether the object lives in `pg_proc`.
	pub fn is_routine(self) -> bool {
		matches!(self, Self::Function | Self::Procedure)
	}

	/// `pg_proc.prokind` value for routines.
	pub fn prokind(self) -> Option<&'static str> {
		match self {
			Self::Function => Some("f"),
			Self::Procedure => Some("p"),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Table => "TABLE",
			Self::View => "VIEW",
			Self::MaterializedView => "MATERIALIZED VIEW",
			Self::Function => "FUNCTION",
			Self::Procedure => "PROCEDURE",
		}
	}
}

impl fmt::Display for ObjectKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Object name as written in the statement plus its catalog-folded parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
	/// Name exactly as written, suitable for `to_regclass`.
	pub raw: String,
	/// Folded schema, if the name was qualified.
	pub schema: Option<String>,
	/// Folded object name.
	pub name: String,
}

impl QualifiedName {
	/// Parse `schema.name`, `"Schema"."Name"` or a bare name.
	///
	/// Unquoted identifiers fold to lower case; quoted ones keep their case
	/// with doubled quotes collapsed.
	pub fn parse(raw: &str) -> Self {
		let parts = split_top_level(raw, b'.');
		let mut folded: Vec<String> = parts.iter().map(|p| fold_identifier(p)).collect();
		let name = folded.pop().unwrap_or_default();
		let schema = folded.pop();
		let raw = parts
			.iter()
			.map(|p| p.trim())
			.collect::<Vec<_>>()
			.join(".");
		Self { raw, schema, name }
	}
}

impl fmt::Display for QualifiedName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.raw)
	}
}

/// A DDL object reference derived from a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
	pub kind: ObjectKind,
	pub name: QualifiedName,
	/// Normalized argument types for routines; `None` when the parameter
	/// list could not be extracted or the object is not a routine.
	pub signature: Option<String>,
}

impl fmt::Display for ObjectRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.kind, self.name)?;
		if let Some(signature) = &self.signature {
			write!(f, "({})", signature)?;
		}
		Ok(())
	}
}

/// Classify `statement`, returning `None` for anything that is not a
/// trackable `CREATE` of a table, view, materialized view or routine.
///
/// # Examples
///
/// ```
/// use ctms_db::deploy::identifier::{ObjectKind, identify_object};
///
/// let object = identify_object(
/// 	"CREATE OR REPLACE FUNCTION public.enroll(p_trial integer, p_site text DEFAULT 'HQ') RETURNS void AS $$ $$ LANGUAGE sql",
/// )
/// .unwrap();
/// assert_eq!(object.kind, ObjectKind::Function);
/// assert_eq!(object.name.schema.as_deref(), Some("public"));
/// assert_eq!(object.signature.as_deref(), Some("integer, text"));
///
/// assert!(identify_object("INSERT INTO trials VALUES (1)").is_none());
/// ```
pub fn identify_object(statement: &str) -> Option<ObjectRef> {
	let text = strip_comments(statement);
	let captures = CREATE_HEADER_RE.captures(&text)?;
	let kind = ObjectKind::from_keyword(captures.get(1)?.as_str())?;
	let name_match = captures.get(2)?;
	let name = QualifiedName::parse(name_match.as_str());

	let signature = if kind.is_routine() {
		let keep_out = kind == ObjectKind::Procedure;
		parameter_list(&text[name_match.end()..]).map(|params| reduce_signature(params, keep_out))
	} else {
		None
	};

	Some(ObjectRef {
		kind,
		name,
		signature,
	})
}

/// Return the text between the parentheses that directly follow the name.
fn parameter_list(rest: &str) -> Option<&str> {
	let rest = rest.trim_start();
	if !rest.starts_with('(') {
		return None;
	}
	let bytes = rest.as_bytes();
	let mut depth = 0usize;
	let mut quote: Option<u8> = None;
	for (i, &byte) in bytes.iter().enumerate() {
		match quote {
			Some(q) if byte == q => quote = None,
			Some(_) => {}
			None => match byte {
				b'\'' | b'"' => quote = Some(byte),
				b'(' => depth += 1,
				b')' => {
					depth -= 1;
					if depth == 0 {
						return Some(&rest[1..i]);
					}
				}
				_ => {}
			},
		}
	}
	None
}

/// Reduce a raw parameter list to comma-joined argument types.
///
/// The result lines up with `pg_proc.proargtypes`: functions leave `OUT`
/// parameters out of it, procedures keep them.
fn reduce_signature(params: &str, keep_out: bool) -> String {
	split_top_level(params, b',')
		.into_iter()
		.filter_map(|param| {
			let param = DEFAULT_CLAUSE_RE.replace(param.trim(), "");
			let mut tokens = split_top_level_whitespace(&param);
			if !keep_out && tokens.first().is_some_and(|t| t.eq_ignore_ascii_case("OUT")) {
				return None;
			}
			if tokens
				.first()
				.is_some_and(|t| PARAMETER_MODES.iter().any(|m| t.eq_ignore_ascii_case(m)))
			{
				tokens.remove(0);
			}
			if tokens.len() > 1 {
				tokens.remove(0);
			}
			(!tokens.is_empty()).then(|| tokens.join(" "))
		})
		.collect::<Vec<_>>()
		.join(", ")
}

/// Split on `separator` outside parentheses and quotes.
fn split_top_level(text: &str, separator: u8) -> Vec<&str> {
	let mut parts = Vec::new();
	let mut depth = 0usize;
	let mut quote: Option<u8> = None;
	let mut start = 0;
	for (i, &byte) in text.as_bytes().iter().enumerate() {
		match quote {
			Some(q) if byte == q => quote = None,
			Some(_) => {}
			None => match byte {
				b'\'' | b'"' => quote = Some(byte),
				b'(' | b'[' => depth += 1,
				b')' | b']' => depth = depth.saturating_sub(1),
				b if b == separator && depth == 0 => {
					parts.push(&text[start..i]);
					start = i + 1;
				}
				_ => {}
			},
		}
	}
	parts.push(&text[start..]);
	parts
}

fn split_top_level_whitespace(text: &str) -> Vec<String> {
	let mut tokens = Vec::new();
	let mut current = String::new();
	let mut depth = 0usize;
	let mut quote: Option<char> = None;
	for c in text.chars() {
		match quote {
			Some(q) if c == q => quote = None,
			Some(_) => {}
			None => match c {
				'\'' | '"' => quote = Some(c),
				'(' | '[' => depth += 1,
				')' | ']' => depth = depth.saturating_sub(1),
				c if c.is_whitespace() && depth == 0 => {
					if !current.is_empty() {
						tokens.push(std::mem::take(&mut current));
					}
					continue;
				}
				_ => {}
			},
		}
		current.push(c);
	}
	if !current.is_empty() {
		tokens.push(current);
	}
	tokens
}

fn fold_identifier(part: &str) -> String {
	let part = part.trim();
	match part.strip_prefix('"').and_then(|p| p.strip_suffix('"')) {
		Some(quoted) => quoted.replace("\"\"", "\""),
		None => part.to_lowercase(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("CREATE TABLE trials (id int)", ObjectKind::Table, "trials")]
	#[case("create table if not exists public.sites (id int)", ObjectKind::Table, "public.sites")]
	#[case("CREATE OR REPLACE VIEW v_active AS SELECT 1", ObjectKind::View, "v_active")]
	#[case(
		"CREATE MATERIALIZED VIEW\n  reporting.enrollment AS SELECT 1",
		ObjectKind::MaterializedView,
		"reporting.enrollment"
	)]
	#[case("CREATE PROCEDURE close_trial() AS $$ $$ LANGUAGE sql", ObjectKind::Procedure, "close_trial")]
	fn test_identify_kind_and_name(
		#[case] sql: &str,
		#[case] kind: ObjectKind,
		#[case] raw_name: &str,
	) {
		let object = identify_object(sql).unwrap();
		assert_eq!(object.kind, kind);
		assert_eq!(object.name.raw, raw_name);
	}

	#[rstest]
	#[case("INSERT INTO trials VALUES (1)")]
	#[case("GRANT SELECT ON trials TO reporting")]
	#[case("ALTER TABLE trials ADD COLUMN phase text")]
	#[case("CREATE INDEX idx_trials_phase ON trials (phase)")]
	#[case("CREATE UNIQUE INDEX idx ON trials (id)")]
	fn test_non_trackable_statements(#[case] sql: &str) {
		assert!(identify_object(sql).is_none());
	}

	#[rstest]
	fn test_leading_comment_is_ignored() {
		// Arrange
		let sql = "-- vocabulary lookups\n/* v2 */\nCREATE TABLE vocabulary (code text)";

		// Act
		let object = identify_object(sql);

		// Assert
		assert_eq!(object.map(|o| o.name.name), Some("vocabulary".to_string()));
	}

	#[rstest]
	fn test_quoted_names_keep_case() {
		let object = identify_object(r#"CREATE VIEW "Reporting"."Active ""Trials""" AS SELECT 1"#)
			.unwrap();
		assert_eq!(object.name.schema.as_deref(), Some("Reporting"));
		assert_eq!(object.name.name, r#"Active "Trials""#);
	}

	#[rstest]
	fn test_unquoted_names_fold_to_lower_case() {
		let object = identify_object("CREATE FUNCTION Audit.Log_Event() RETURNS void AS $$ $$ LANGUAGE sql")
			.unwrap();
		assert_eq!(object.name.schema.as_deref(), Some("audit"));
		assert_eq!(object.name.name, "log_event");
		assert_eq!(object.name.raw, "Audit.Log_Event");
	}

	#[rstest]
	#[case("f()", Some(""))]
	#[case("f(integer)", Some("integer"))]
	#[case("f(p_id integer, p_name text)", Some("integer, text"))]
	#[case("f(IN p_id integer, OUT p_total bigint)", Some("integer"))]
	#[case("f(OUT p_total bigint)", Some(""))]
	#[case("f(INOUT counter int, VARIADIC vals int[])", Some("int, int[]"))]
	#[case("f(p_amount numeric(10, 2) DEFAULT 0, p_flag boolean = false)", Some("numeric(10, 2), boolean"))]
	#[case("f(p_code text DEFAULT 'a,b')", Some("text"))]
	#[case("f", None)]
	#[case("f(p_id integer", None)]
	fn test_routine_signature(#[case] header: &str, #[case] expected: Option<&str>) {
		// Arrange
		let sql = format!("CREATE OR REPLACE FUNCTION {} RETURNS void AS $$ $$ LANGUAGE sql", header);

		// Act
		let object = identify_object(&sql).unwrap();

		// Assert
		assert_eq!(object.signature.as_deref(), expected);
	}

	#[rstest]
	fn test_procedure_signature_keeps_out_parameters() {
		let object = identify_object(
			"CREATE PROCEDURE count_sites(IN p_trial integer, OUT p_total bigint) AS $$ $$ LANGUAGE plpgsql",
		)
		.unwrap();
		assert_eq!(object.signature.as_deref(), Some("integer, bigint"));
	}

	#[rstest]
	fn test_tables_have_no_signature() {
		let object = identify_object("CREATE TABLE t (a int, b int)").unwrap();
		assert!(object.signature.is_none());
	}

	#[rstest]
	fn test_display_includes_signature() {
		let object = identify_object("CREATE PROCEDURE p(a int) AS $$ $$ LANGUAGE sql").unwrap();
		assert_eq!(object.to_string(), "PROCEDURE p(int)");
	}
}
