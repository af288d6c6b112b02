//! Route pattern compilation.
//!
//! # Responsibilities
//! - Turn `/user/:id` and `/docs/*` templates into anchored regexes
//! - Record parameter names in capture order
//! - Reject patterns with more than one wildcard
//!
//! # Design Decisions
//! - Compiled once at registration, immutable afterwards
//! - `:name` never spans a `/`; `*` may
//! - Literal text is regex-escaped, so `.`, `+`, `(` etc. match themselves

use regex::Regex;
use thiserror::Error;

/// Parameter name under which the wildcard capture is reported.
pub const WILDCARD_PARAM: &str = "*";

/// Errors produced while compiling a route pattern.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("pattern must start with '/'")]
    MissingLeadingSlash,

    #[error("pattern contains more than one wildcard")]
    MultipleWildcards,

    #[error("parameter name missing after ':' at byte {0}")]
    EmptyParam(usize),

    #[error("parameter '{0}' appears more than once")]
    DuplicateParam(String),

    #[error("regex compilation failed: {0}")]
    Regex(#[from] regex::Error),
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    param_names: Vec<String>,
    regex: Regex,
}

impl CompiledPattern {
    /// Compile a pattern into a matcher.
    pub fn compile(pattern: &str) -> Result<Self, RouteError> {
        if !pattern.starts_with('/') {
            return Err(RouteError::MissingLeadingSlash);
        }

        let mut expr = String::with_capacity(pattern.len() + 8);
        let mut param_names: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut wildcard_seen = false;

        expr.push('^');
        let mut chars = pattern.char_indices().peekable();
        while let Some((pos, c)) = chars.next() {
            match c {
                ':' => {
                    expr.push_str(&regex::escape(&literal));
                    literal.clear();

                    let mut name = String::new();
                    while let Some(&(_, n)) = chars.peek() {
                        if n.is_ascii_alphanumeric() || n == '_' {
                            name.push(n);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if name.is_empty() {
                        return Err(RouteError::EmptyParam(pos));
                    }
                    if param_names.contains(&name) {
                        return Err(RouteError::DuplicateParam(name));
                    }
                    param_names.push(name);
                    expr.push_str("([^/]+)");
                }
                '*' => {
                    if wildcard_seen {
                        return Err(RouteError::MultipleWildcards);
                    }
                    wildcard_seen = true;
                    expr.push_str(&regex::escape(&literal));
                    literal.clear();
                    param_names.push(WILDCARD_PARAM.to_string());
                    expr.push_str("(.*)");
                }
                _ => literal.push(c),
            }
        }
        expr.push_str(&regex::escape(&literal));
        expr.push('$');

        Ok(Self {
            source: pattern.to_string(),
            param_names,
            regex: Regex::new(&expr)?,
        })
    }

    /// The pattern text this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parameter names in left-to-right order.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Match a path, returning raw (still percent-encoded) captures paired
    /// with their parameter names.
    pub fn captures<'p>(&self, path: &'p str) -> Option<Vec<(&str, &'p str)>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.param_names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = caps.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
                    (name.as_str(), value)
                })
                .collect(),
        )
    }
}
