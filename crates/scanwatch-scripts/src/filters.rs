//! Custom SQL filters for MiniJinja

use minijinja::Environment;

/// SQL-specific filters
pub struct SqlFilters;

impl SqlFilters {
    /// Quote a string for SQL
    pub fn sqlquote(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Render an Oracle identifier, quoting only the parts that need it.
    ///
    /// Parts that are valid unquoted names (letter first, then letters,
    /// digits, `_`, `$` or `#`) are upper-cased; anything else is wrapped in
    /// double quotes and kept verbatim.
    pub fn identifier(value: &str) -> String {
        value
            .split('.')
            .map(|part| {
                let mut chars = part.chars();
                let plain = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                    && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '#'));
                if plain {
                    part.to_ascii_uppercase()
                } else {
                    format!("\"{}\"", part.replace('"', "\"\""))
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Turn every line into an SQL line comment
    pub fn comment(value: &str) -> String {
        value
            .lines()
            .map(|line| {
                let line = line.trim_end();
                if line.is_empty() {
                    "--".to_string()
                } else {
                    format!("-- {}", line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Register all SQL filters with a MiniJinja environment
pub fn register_filters(env: &mut Environment) {
    env.add_filter("sqlquote", |value: String| SqlFilters::sqlquote(&value));
    env.add_filter("identifier", |value: String| SqlFilters::identifier(&value));
    env.add_filter("comment", |value: String| SqlFilters::comment(&value));
}
