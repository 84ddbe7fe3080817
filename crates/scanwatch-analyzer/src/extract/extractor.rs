//! Approximate SQL feature extraction
//!
//! Tables come from a real parse of the statement. Predicates are cut out
//! of the first WHERE clause lexically: split on top-level `AND`, keep the
//! first `OR` disjunct, drop enclosing parentheses. Nested boolean
//! expressions with mixed `AND`/`OR` precedence are only approximated.

use super::lexer::{self, Token};
use scanwatch_core::RawQueryRecord;
use serde::{Deserialize, Serialize};
use sqlparser::ast::{Ident, ObjectName, Query, TableFactor, Visit, Visitor};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::collections::{BTreeMap, HashSet};
use std::ops::ControlFlow;

/// Pipeline stage at which extraction gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStage {
    Lexing,
    Parsing,
}

/// Low-severity note explaining why a statement yielded no features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionDiagnostic {
    pub stage: ExtractionStage,
    pub message: String,
}

/// Structural features of one statement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFeatures {
    /// Referenced tables, first-seen order, no duplicates
    pub tables: Vec<String>,
    /// Normalized WHERE conjuncts, first-seen order, no duplicates
    pub predicates: Vec<String>,
    /// Table aliases of the statement, alias to table name
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// Set when the statement could not be parsed
    pub diagnostic: Option<ExtractionDiagnostic>,
}

impl QueryFeatures {
    fn failed(stage: ExtractionStage, message: impl Into<String>) -> Self {
        Self {
            tables: Vec::new(),
            predicates: Vec::new(),
            aliases: BTreeMap::new(),
            diagnostic: Some(ExtractionDiagnostic {
                stage,
                message: message.into(),
            }),
        }
    }

    /// Returns true if extraction degraded to empty features
    pub fn is_degraded(&self) -> bool {
        self.diagnostic.is_some()
    }
}

/// A statement together with its extracted features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub record: RawQueryRecord,
    pub tables: Vec<String>,
    pub predicates: Vec<String>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    pub schema: Option<String>,
}

impl ParsedQuery {
    /// Combine a record with its features
    pub fn new(record: RawQueryRecord, features: QueryFeatures) -> Self {
        Self {
            record,
            tables: features.tables,
            predicates: features.predicates,
            aliases: features.aliases,
            schema: None,
        }
    }

    /// Sets the owning schema
    pub fn with_schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    /// First referenced table, if any
    pub fn primary_table(&self) -> Option<&str> {
        self.tables.first().map(String::as_str)
    }
}

/// Swap point for the statement analysis strategy
pub trait FeatureExtractor: Send + Sync {
    /// Extract features; never fails, degrades to empty features instead
    fn extract(&self, sql: &str) -> QueryFeatures;
}

/// Best-effort extractor built on `sqlparser` and a lexical predicate splitter
#[derive(Debug, Clone, Default)]
pub struct ApproximateExtractor;

impl ApproximateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FeatureExtractor for ApproximateExtractor {
    fn extract(&self, sql: &str) -> QueryFeatures {
        let tokens = match lexer::tokenize(sql) {
            Ok(tokens) => tokens,
            Err(err) => {
                tracing::debug!(error = %err, "statement could not be tokenized");
                return QueryFeatures::failed(ExtractionStage::Lexing, err.to_string());
            }
        };

        let (tables, aliases) = match extract_tables(sql) {
            Ok(found) => found,
            Err(message) => {
                tracing::debug!(error = %message, "statement could not be parsed");
                return QueryFeatures::failed(ExtractionStage::Parsing, message);
            }
        };

        QueryFeatures {
            tables,
            predicates: extract_predicates(&tokens),
            aliases,
            diagnostic: None,
        }
    }
}

#[derive(Default)]
struct RelationCollector {
    relations: Vec<String>,
    aliases: Vec<(String, String)>,
    cte_names: HashSet<String>,
}

impl Visitor for RelationCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.cte_names.insert(canonical_ident(&cte.alias.name));
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        let name = canonical_name(relation);
        if !name.is_empty() {
            self.relations.push(name);
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, table_factor: &TableFactor) -> ControlFlow<Self::Break> {
        if let TableFactor::Table {
            name,
            alias: Some(alias),
            ..
        } = table_factor
        {
            self.aliases
                .push((canonical_ident(&alias.name), canonical_name(name)));
        }
        ControlFlow::Continue(())
    }
}

fn canonical_name(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(canonical_ident)
        .collect::<Vec<_>>()
        .join(".")
}

/// Unquoted identifiers are case-insensitive and canonicalized upper-case
fn canonical_ident(ident: &Ident) -> String {
    match ident.quote_style {
        Some(_) => ident.value.clone(),
        None => ident.value.to_uppercase(),
    }
}

type TablesAndAliases = (Vec<String>, BTreeMap<String, String>);

fn extract_tables(sql: &str) -> Result<TablesAndAliases, String> {
    let statements =
        Parser::parse_sql(&GenericDialect {}, sql).map_err(|err| err.to_string())?;

    let mut collector = RelationCollector::default();
    for statement in &statements {
        let _ = statement.visit(&mut collector);
    }

    let RelationCollector {
        relations,
        aliases,
        cte_names,
    } = collector;

    let tables = dedup_preserving_order(
        relations
            .into_iter()
            .filter(|name| !cte_names.contains(name)),
    );
    let mut alias_map = BTreeMap::new();
    for (alias, table) in aliases {
        if !cte_names.contains(&table) {
            alias_map.entry(alias).or_insert(table);
        }
    }
    Ok((tables, alias_map))
}

/// Normalized conjuncts of the first WHERE clause
pub(crate) fn extract_predicates(tokens: &[Token]) -> Vec<String> {
    let Some(where_idx) = tokens.iter().position(|t| t.is_keyword("WHERE")) else {
        return Vec::new();
    };

    let rest = &tokens[where_idx + 1..];
    let end = rest
        .iter()
        .position(|t| t.is_symbol(";"))
        .unwrap_or(rest.len());
    let clause = &rest[..end];

    let conjuncts = split_top_level(clause, "AND").into_iter().map(|conjunct| {
        let conjunct = strip_enclosing_parens(conjunct);
        let first_disjunct = split_top_level(conjunct, "OR")
            .into_iter()
            .next()
            .unwrap_or_default();
        lexer::render(strip_enclosing_parens(first_disjunct))
    });

    dedup_preserving_order(conjuncts.filter(|p| !p.trim().is_empty()))
}

/// Splits on a keyword outside parentheses; `BETWEEN x AND y` is kept whole
fn split_top_level<'a>(tokens: &'a [Token], keyword: &str) -> Vec<&'a [Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut pending_between = false;

    for (idx, token) in tokens.iter().enumerate() {
        if token.is_symbol("(") {
            depth += 1;
        } else if token.is_symbol(")") {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_keyword("BETWEEN") {
            pending_between = true;
        } else if depth == 0 && token.is_keyword(keyword) {
            if keyword.eq_ignore_ascii_case("AND") && pending_between {
                pending_between = false;
                continue;
            }
            parts.push(&tokens[start..idx]);
            start = idx + 1;
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// Removes parentheses wrapping the whole token run, repeatedly
fn strip_enclosing_parens(mut tokens: &[Token]) -> &[Token] {
    while tokens.len() >= 2
        && tokens[0].is_symbol("(")
        && tokens[tokens.len() - 1].is_symbol(")")
        && closing_paren_index(tokens) == Some(tokens.len() - 1)
    {
        tokens = &tokens[1..tokens.len() - 1];
    }
    tokens
}

fn closing_paren_index(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate() {
        if token.is_symbol("(") {
            depth += 1;
        } else if token.is_symbol(")") {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(idx);
            }
        }
    }
    None
}

fn dedup_preserving_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// A column named by a predicate, with the qualifier it was written with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Table name or alias before the column, upper-cased
    pub qualifier: Option<String>,
    pub name: String,
}

/// Leading column of a normalized predicate (`O.STATUS = ?` gives `STATUS`).
pub fn predicate_column(predicate: &str) -> Option<String> {
    column_reference(predicate).map(|column| column.name)
}

/// Leading column of a normalized predicate together with its qualifier.
///
/// Returns `None` when the predicate starts with a literal, a function call
/// or a keyword such as `NOT` or `EXISTS`.
pub fn column_reference(predicate: &str) -> Option<ColumnRef> {
    const NON_COLUMN_WORDS: [&str; 4] = ["NOT", "EXISTS", "CASE", "NULL"];

    let tokens = lexer::tokenize(predicate).ok()?;
    let mut iter = tokens.iter();
    let first = iter.next()?;
    if iter.next().is_some_and(|t| t.is_symbol("(")) {
        return None;
    }

    match first {
        Token::Word(word)
            if !NON_COLUMN_WORDS
                .iter()
                .any(|kw| word.eq_ignore_ascii_case(kw)) =>
        {
            let word = word.to_ascii_uppercase();
            Some(match word.rsplit_once('.') {
                Some((qualifier, name)) => ColumnRef {
                    qualifier: Some(qualifier.to_string()),
                    name: name.to_string(),
                },
                None => ColumnRef {
                    qualifier: None,
                    name: word,
                },
            })
        }
        Token::QuotedIdent(ident) => Some(ColumnRef {
            qualifier: None,
            name: ident.clone(),
        }),
        _ => None,
    }
}
