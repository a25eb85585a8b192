//! API version predicate.
//!
//! A declared value is one or more version expressions; the predicate passes if any
//! expression passes. Each expression is a comma-separated list of clauses
//! `<op><version>` with `op` in `>`, `<`, `==`, `>=`, `<=`; a bare version means `==`.
//!
//! How clauses inside one expression combine depends on [`ClauseMode`].

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{invalid_value, Captures, Predicate, PredicateConfig};
use crate::error::{ConfigResult, DispatchError};
use crate::http::request::{ApiVersion, ApiVersionExt, Request};

/// Combination rule for the clauses of one version expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseMode {
    /// Clauses live in an unordered set and whichever is iterated first decides.
    #[default]
    First,
    /// Every clause must hold.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Op {
    Gt,
    Lt,
    Eq,
    Ge,
    Le,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Gt => ">",
            Op::Lt => "<",
            Op::Eq => "==",
            Op::Ge => ">=",
            Op::Le => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Clause {
    op: Op,
    version: ApiVersion,
}

impl Clause {
    fn parse(raw: &str) -> ConfigResult<Self> {
        let raw = raw.trim();
        let (op, rest) = if let Some(rest) = raw.strip_prefix(">=") {
            (Op::Ge, rest)
        } else if let Some(rest) = raw.strip_prefix("<=") {
            (Op::Le, rest)
        } else if let Some(rest) = raw.strip_prefix("==") {
            (Op::Eq, rest)
        } else if let Some(rest) = raw.strip_prefix('>') {
            (Op::Gt, rest)
        } else if let Some(rest) = raw.strip_prefix('<') {
            (Op::Lt, rest)
        } else {
            (Op::Eq, raw)
        };
        let version = rest
            .parse::<ApiVersion>()
            .map_err(|e| invalid_value("api_version", e.to_string()))?;
        Ok(Self { op, version })
    }

    fn matches(&self, requested: &ApiVersion) -> bool {
        match self.op {
            Op::Gt => requested > &self.version,
            Op::Lt => requested < &self.version,
            Op::Eq => requested == &self.version,
            Op::Ge => requested >= &self.version,
            Op::Le => requested <= &self.version,
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.symbol(), self.version)
    }
}

#[derive(Debug, Clone)]
struct Expression {
    source: String,
    clauses: HashSet<Clause>,
}

impl Expression {
    fn parse(source: &str) -> ConfigResult<Self> {
        let clauses = source
            .split(',')
            .map(Clause::parse)
            .collect::<ConfigResult<HashSet<_>>>()?;
        Ok(Self {
            source: source.trim().to_string(),
            clauses,
        })
    }

    fn matches(&self, requested: &ApiVersion, mode: ClauseMode) -> bool {
        match mode {
            ClauseMode::First => self
                .clauses
                .iter()
                .next()
                .map_or(true, |clause| clause.matches(requested)),
            ClauseMode::All => self.clauses.iter().all(|clause| clause.matches(requested)),
        }
    }
}

/// Passes when the request's API version satisfies a declared expression.
#[derive(Debug, Clone)]
pub struct ApiVersionPredicate {
    expressions: Vec<Expression>,
    mode: ClauseMode,
    default_version: ApiVersion,
}

impl ApiVersionPredicate {
    pub fn new<I, S>(expressions: I, mode: ClauseMode, default_version: ApiVersion) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut expressions = expressions
            .into_iter()
            .map(|e| Expression::parse(e.as_ref()))
            .collect::<ConfigResult<Vec<_>>>()?;
        if expressions.is_empty() {
            return Err(invalid_value("api_version", "no version expression given"));
        }
        expressions.sort_by(|a, b| a.source.cmp(&b.source));
        Ok(Self {
            expressions,
            mode,
            default_version,
        })
    }

    /// Accepts a string or an array of strings.
    pub fn from_value(value: &Value, config: &PredicateConfig) -> ConfigResult<Self> {
        let expressions: Vec<&str> = match value {
            Value::String(s) => vec![s.as_str()],
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().ok_or_else(|| invalid_value("api_version", "expected strings")))
                .collect::<ConfigResult<_>>()?,
            _ => return Err(invalid_value("api_version", "expected a string or a list of strings")),
        };
        Self::new(expressions, config.version_clauses, config.default_api_version.clone())
    }
}

impl Predicate for ApiVersionPredicate {
    fn text(&self) -> String {
        let sources: Vec<&str> = self.expressions.iter().map(|e| e.source.as_str()).collect();
        format!("api_version<{}>", sources.join("|"))
    }

    fn evaluate(&self, _captures: &Captures, request: &Request) -> Result<bool, DispatchError> {
        let requested = request.api_version().unwrap_or(&self.default_version);
        Ok(self
            .expressions
            .iter()
            .any(|e| e.matches(requested, self.mode)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn request(version: &str) -> Request {
        let mut req = Request::new(Bytes::new());
        req.extensions_mut().insert(version.parse::<ApiVersion>().unwrap());
        req
    }

    fn predicate(expr: &str, mode: ClauseMode) -> ApiVersionPredicate {
        ApiVersionPredicate::new([expr], mode, ApiVersion::new(vec![1, 0])).unwrap()
    }

    fn passes(p: &ApiVersionPredicate, version: &str) -> bool {
        p.evaluate(&Captures::new(), &request(version)).unwrap()
    }

    #[test]
    fn test_single_clause_operators() {
        for mode in [ClauseMode::First, ClauseMode::All] {
            assert!(passes(&predicate("1.2", mode), "1.2"));
            assert!(passes(&predicate("==1.2", mode), "1.2.0"));
            assert!(passes(&predicate(">1.2", mode), "1.10"));
            assert!(!passes(&predicate("<1.2", mode), "1.2"));
            assert!(passes(&predicate(">=2", mode), "2.0"));
            assert!(passes(&predicate("<=2", mode), "1.9"));
        }
    }

    #[test]
    fn test_all_mode_requires_every_clause() {
        let p = predicate(">=1.0, <2.0", ClauseMode::All);
        assert!(passes(&p, "1.5"));
        assert!(!passes(&p, "2.0"));
        assert!(!passes(&p, "0.9"));
    }

    #[test]
    fn test_first_mode_outcome_is_one_of_the_clauses() {
        // Which clause decides is unspecified; the result must equal one clause's result.
        let p = predicate(">=1.0, <2.0", ClauseMode::First);
        let ge = passes(&predicate(">=1.0", ClauseMode::All), "2.5");
        let lt = passes(&predicate("<2.0", ClauseMode::All), "2.5");
        let outcome = passes(&p, "2.5");
        assert!(outcome == ge || outcome == lt);

        // When all clauses agree the mode makes no difference.
        assert!(passes(&p, "1.5"));
    }

    #[test]
    fn test_expressions_are_alternatives() {
        let p = ApiVersionPredicate::new(["1.0", "3.0"], ClauseMode::All, ApiVersion::new(vec![1])).unwrap();
        assert!(passes(&p, "3"));
        assert!(!passes(&p, "2"));
        assert_eq!(p.text(), "api_version<1.0|3.0>");
    }

    #[test]
    fn test_default_version_used_when_missing() {
        let p = predicate("1.0", ClauseMode::All);
        let req = Request::new(Bytes::new());
        assert!(p.evaluate(&Captures::new(), &req).unwrap());
    }

    #[test]
    fn test_invalid_expression() {
        assert!(ApiVersionPredicate::new([">=x"], ClauseMode::All, ApiVersion::new(vec![1])).is_err());
    }
}
