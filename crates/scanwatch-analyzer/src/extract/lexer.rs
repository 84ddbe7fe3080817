//! Lightweight SQL tokenizer used for predicate extraction
//!
//! It only knows enough about SQL to find clause keywords, keep quoted
//! text intact, skip comments and optimizer hints, and tell literals apart
//! from identifiers.

use std::fmt;

/// A lexical token of a SQL statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// Unquoted identifier or keyword, possibly dotted (`o.status`)
    Word(String),
    /// Double-quoted identifier, kept verbatim without the quotes
    QuotedIdent(String),
    /// Number, string literal or bind variable
    Literal,
    /// Operator or punctuation
    Symbol(String),
}

impl Token {
    /// Returns true if this is the given keyword (case-insensitive)
    pub(crate) fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(word) if word.eq_ignore_ascii_case(keyword))
    }

    /// Returns true if this is the given punctuation symbol
    pub(crate) fn is_symbol(&self, symbol: &str) -> bool {
        matches!(self, Token::Symbol(s) if s == symbol)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(word) => write!(f, "{}", word.to_ascii_uppercase()),
            Token::QuotedIdent(ident) => write!(f, "\"{}\"", ident),
            Token::Literal => write!(f, "?"),
            Token::Symbol(symbol) => write!(f, "{}", symbol),
        }
    }
}

/// Tokenizer failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LexError {
    pub message: String,
    pub offset: usize,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

const TWO_CHAR_OPERATORS: [&str; 7] = ["<=", ">=", "<>", "!=", "||", ":=", "=>"];

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '#')
}

/// Splits `sql` into tokens, dropping whitespace and comments
pub(crate) fn tokenize(sql: &str) -> Result<Vec<Token>, LexError> {
    let chars: Vec<char> = sql.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c.is_whitespace() {
            i += 1;
        } else if c == '-' && next == Some('-') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && next == Some('*') {
            let start = i;
            i += 2;
            loop {
                if i + 1 >= chars.len() {
                    return Err(LexError {
                        message: "unterminated comment".to_string(),
                        offset: start,
                    });
                }
                if chars[i] == '*' && chars[i + 1] == '/' {
                    i += 2;
                    break;
                }
                i += 1;
            }
        } else if c == '\'' {
            i = skip_quoted(&chars, i, '\'')?;
            tokens.push(Token::Literal);
        } else if c == '"' {
            let start = i;
            i = skip_quoted(&chars, i, '"')?;
            let ident: String = chars[start + 1..i - 1].iter().collect();
            tokens.push(Token::QuotedIdent(ident.replace("\"\"", "\"")));
        } else if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) {
            i = skip_number(&chars, i);
            tokens.push(Token::Literal);
        } else if (c == ':' && next.is_some_and(|n| n.is_alphanumeric() || n == '_')) || c == '?'
        {
            i += 1;
            while i < chars.len() && is_ident_part(chars[i]) {
                i += 1;
            }
            tokens.push(Token::Literal);
        } else if is_ident_start(c) {
            let start = i;
            while i < chars.len() {
                if is_ident_part(chars[i]) {
                    i += 1;
                } else if chars[i] == '.' && chars.get(i + 1).is_some_and(|n| is_ident_start(*n))
                {
                    i += 1;
                } else {
                    break;
                }
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
        } else {
            let pair: String = chars[i..chars.len().min(i + 2)].iter().collect();
            if TWO_CHAR_OPERATORS.contains(&pair.as_str()) {
                tokens.push(Token::Symbol(pair));
                i += 2;
            } else {
                tokens.push(Token::Symbol(c.to_string()));
                i += 1;
            }
        }
    }

    Ok(tokens)
}

/// Returns the index just past the closing quote; doubled quotes are escapes
fn skip_quoted(chars: &[char], start: usize, quote: char) -> Result<usize, LexError> {
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Ok(i + 1);
        }
        i += 1;
    }
    Err(LexError {
        message: format!("unterminated {} quote", quote),
        offset: start,
    })
}

fn skip_number(chars: &[char], start: usize) -> usize {
    let mut i = start;
    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
        i += 1;
    }
    if i < chars.len() && matches!(chars[i], 'e' | 'E') {
        let mut j = i + 1;
        if j < chars.len() && matches!(chars[j], '+' | '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            i = j;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        }
    }
    i
}

/// Renders tokens in canonical form, separated by single spaces
pub(crate) fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
