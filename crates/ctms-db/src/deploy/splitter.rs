//! Quote-aware statement splitter
//!
//! Breaks a SQL script into top-level statements. Semicolons only terminate a
//! statement when the scanner is outside string literals, quoted identifiers,
//! dollar-quoted bodies and comments, so PL/pgSQL function bodies survive
//! intact.
//!
//! The scanner never fails: an unterminated quote simply swallows the rest of
//! the input into one final statement.

/// Lexical context the scanner is currently in.
///
/// Exactly one context is active at any time. Dollar quotes borrow their tag
/// (including both `$` delimiters) from the scanned text so the closing tag
/// can be matched verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteContext<'a> {
	None,
	SingleQuoted,
	DoubleQuoted,
	DollarQuoted(&'a str),
}

/// Split `text` into trimmed, non-empty statements.
///
/// The terminating semicolons are consumed; everything else, comments
/// included, is kept verbatim. A trailing statement without a terminator is
/// returned as well.
///
/// # Examples
///
/// ```
/// use ctms_db::deploy::splitter::split_statements;
///
/// let sql = "CREATE FUNCTION f() RETURNS int AS $$ BEGIN RETURN 1; END; $$ LANGUAGE plpgsql;\nSELECT f()";
/// let statements = split_statements(sql);
/// assert_eq!(statements.len(), 2);
/// assert!(statements[0].ends_with("LANGUAGE plpgsql"));
/// assert_eq!(statements[1], "SELECT f()");
/// ```
pub fn split_statements(text: &str) -> Vec<String> {
	let bytes = text.as_bytes();
	let mut statements = Vec::new();
	let mut context = QuoteContext::None;
	let mut start = 0;
	let mut i = 0;

	while i < bytes.len() {
		let byte = bytes[i];
		match context {
			QuoteContext::None => match byte {
				b'\'' => context = QuoteContext::SingleQuoted,
				b'"' => context = QuoteContext::DoubleQuoted,
				b'$' => {
					if let Some(tag) = dollar_tag_at(text, i) {
						context = QuoteContext::DollarQuoted(tag);
						i += tag.len();
						continue;
					}
				}
				b'-' if bytes.get(i + 1) == Some(&b'-') => {
					i = text[i..].find('\n').map_or(bytes.len(), |offset| i + offset);
					continue;
				}
				b'/' if bytes.get(i + 1) == Some(&b'*') => {
					i = text[i + 2..]
						.find("*/")
						.map_or(bytes.len(), |offset| i + 2 + offset + 2);
					continue;
				}
				b';' => {
					push_statement(&mut statements, &text[start..i]);
					start = i + 1;
				}
				_ => {}
			},
			QuoteContext::SingleQuoted => {
				if byte == b'\'' {
					context = QuoteContext::None;
				}
			}
			QuoteContext::DoubleQuoted => {
				if byte == b'"' {
					context = QuoteContext::None;
				}
			}
			QuoteContext::DollarQuoted(tag) => {
				if byte == b'$' && text[i..].starts_with(tag) {
					context = QuoteContext::None;
					i += tag.len();
					continue;
				}
			}
		}
		i += 1;
	}

	push_statement(&mut statements, &text[start..]);
	statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
	let trimmed = raw.trim();
	if !trimmed.is_empty() {
		statements.push(trimmed.to_string());
	}
}

/// Lex a dollar-quote tag (`$`, identifier characters, `$`) starting at `at`.
fn dollar_tag_at(text: &str, at: usize) -> Option<&str> {
	let rest = &text[at + 1..];
	let body_len = rest
		.bytes()
		.take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
		.count();
	if rest.as_bytes().get(body_len) == Some(&b'$') {
		Some(&text[at..at + body_len + 2])
	} else {
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_dollar_body_with_semicolons_is_one_statement() {
		// Arrange
		let sql =
			"CREATE FUNCTION f() RETURNS int AS $$ BEGIN RETURN 1; END; $$ LANGUAGE plpgsql;";

		// Act
		let statements = split_statements(sql);

		// Assert
		assert_eq!(statements.len(), 1);
		assert_eq!(
			statements[0],
			"CREATE FUNCTION f() RETURNS int AS $$ BEGIN RETURN 1; END; $$ LANGUAGE plpgsql"
		);
	}

	#[rstest]
	fn test_escaped_quote_and_semicolon_in_literal() {
		let statements = split_statements("SELECT 'a;b''c';");
		assert_eq!(statements, vec!["SELECT 'a;b''c'".to_string()]);
	}

	#[rstest]
	fn test_named_dollar_tags_must_match() {
		// Arrange
		let sql = r#"
CREATE FUNCTION outer_fn() RETURNS text AS $body$
BEGIN
	RETURN $inner$ nested; $body is not a tag $inner$;
END;
$body$ LANGUAGE plpgsql;
SELECT 1;
"#;

		// Act
		let statements = split_statements(sql);

		// Assert
		assert_eq!(statements.len(), 2);
		assert!(statements[0].starts_with("CREATE FUNCTION outer_fn()"));
		assert!(statements[0].ends_with("$body$ LANGUAGE plpgsql"));
		assert_eq!(statements[1], "SELECT 1");
	}

	#[rstest]
	fn test_positional_parameter_is_not_a_tag() {
		let sql = "CREATE FUNCTION add(a int, b int) RETURNS int AS 'SELECT $1 + $2;' LANGUAGE sql; SELECT 2;";
		let statements = split_statements(sql);
		assert_eq!(statements.len(), 2);
		assert!(statements[0].contains("$1 + $2;"));
	}

	#[rstest]
	fn test_double_quoted_identifier_with_semicolon() {
		let statements = split_statements(r#"CREATE TABLE "odd;name" (id int); SELECT 1"#);
		assert_eq!(
			statements,
			vec![
				r#"CREATE TABLE "odd;name" (id int)"#.to_string(),
				"SELECT 1".to_string()
			]
		);
	}

	#[rstest]
	fn test_comments_do_not_open_quotes_or_terminate() {
		// Arrange
		let sql = "-- don't split here; please\nCREATE TABLE t (id int); /* it's; fine */ SELECT 1;";

		// Act
		let statements = split_statements(sql);

		// Assert
		assert_eq!(statements.len(), 2);
		assert_eq!(
			statements[0],
			"-- don't split here; please\nCREATE TABLE t (id int)"
		);
		assert_eq!(statements[1], "/* it's; fine */ SELECT 1");
	}

	#[rstest]
	#[case("SELECT 1", vec!["SELECT 1"])]
	#[case("SELECT 1;;  ;\n", vec!["SELECT 1"])]
	#[case("  \n\t ", vec![])]
	#[case("SELECT 1; SELECT 2", vec!["SELECT 1", "SELECT 2"])]
	fn test_terminators_and_trailing_input(#[case] sql: &str, #[case] expected: Vec<&str>) {
		assert_eq!(split_statements(sql), expected);
	}

	#[rstest]
	fn test_unterminated_dollar_quote_degrades_to_one_statement() {
		let statements = split_statements("SELECT 1; DO $$ BEGIN PERFORM 1; END;");
		assert_eq!(
			statements,
			vec![
				"SELECT 1".to_string(),
				"DO $$ BEGIN PERFORM 1; END;".to_string()
			]
		);
	}

	#[rstest]
	fn test_non_ascii_text_is_preserved() {
		let statements = split_statements("INSERT INTO t VALUES ('essai clinique — phase Ⅱ;');");
		assert_eq!(
			statements,
			vec!["INSERT INTO t VALUES ('essai clinique — phase Ⅱ;')".to_string()]
		);
	}
}
