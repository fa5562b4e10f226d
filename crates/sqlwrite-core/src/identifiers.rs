//! Identifier quoting and validation.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Quote an identifier with double quotes, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote an identifier with backticks (MySQL), doubling embedded backticks.
pub fn quote_ident_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn plain_identifier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("static regex"))
}

/// Check that a name is safe to splice unquoted into SQL (savepoint names,
/// session variable names).
#[allow(clippy::result_large_err)]
pub fn validate_plain_identifier(name: &str) -> Result<()> {
    if plain_identifier().is_match(name) {
        Ok(())
    } else {
        Err(Error::config(format!(
            "'{name}' is not a valid identifier (letters, digits and '_', at most 63 characters)"
        )))
    }
}

/// Replace every character that is not valid in a plain identifier with `_`.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out.truncate(63);
    out
}
