//! Route pattern compiler.
//!
//! # Grammar
//! ```text
//! pattern     = { literal | placeholder }
//! placeholder = "{" name [ ":" constraint ] "}"
//! constraint  = regex text (may contain balanced braces) | "<" dotted.reference ">"
//! ```
//!
//! # Responsibilities
//! - `normalize`: strip constraints out of the pattern into a rule map
//! - `complete`: re-render every placeholder into a target dialect
//!
//! # Design Decisions
//! - A placeholder closes only when the brace count returns to zero
//! - Literal text is never rewritten or escaped
//! - Placeholders without a rule get `[^/]+`

use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{ConfigError, ConfigResult};
use crate::sums::{SumType, SumTypeRegistry};

/// Constraint used when a placeholder has no explicit rule.
pub const DEFAULT_RULE: &str = "[^/]+";

/// A typed constraint attached to a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Raw regular expression text.
    Regex(String),
    /// Alternation over the serialized values of a sum type.
    Sum(Arc<SumType>),
}

impl Rule {
    pub fn as_regex(&self) -> Option<&str> {
        match self {
            Rule::Regex(r) => Some(r),
            Rule::Sum(_) => None,
        }
    }

    pub fn as_sum(&self) -> Option<&Arc<SumType>> {
        match self {
            Rule::Sum(s) => Some(s),
            Rule::Regex(_) => None,
        }
    }

    /// Regular expression text this rule expands to.
    pub fn expand(&self) -> String {
        match self {
            Rule::Regex(r) => r.clone(),
            Rule::Sum(sum) => {
                let alternatives: Vec<String> =
                    sum.values().into_iter().map(regex::escape).collect();
                format!("(?:{})", alternatives.join("|"))
            }
        }
    }
}

/// Placeholder name -> constraint.
pub type Rules = IndexMap<String, Rule>;

/// One lexical piece of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Literal(&'a str),
    Placeholder {
        name: &'a str,
        constraint: Option<&'a str>,
    },
}

fn pattern_error(pattern: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Pattern {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

/// Split a pattern into literal runs and placeholders.
pub fn tokenize(pattern: &str) -> ConfigResult<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut chars = pattern.char_indices();

    while let Some((start, c)) = chars.next() {
        if c != '{' {
            continue;
        }
        if literal_start < start {
            tokens.push(Token::Literal(&pattern[literal_start..start]));
        }

        let mut depth = 1usize;
        let mut end = None;
        for (i, c) in chars.by_ref() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let end = end.ok_or_else(|| pattern_error(pattern, "unexpected end of a route pattern"))?;

        let inner = &pattern[start + 1..end];
        let (name, constraint) = match inner.split_once(':') {
            Some((name, rule)) => (name, Some(rule)),
            None => (inner, None),
        };
        tokens.push(Token::Placeholder { name, constraint });
        literal_start = end + 1;
    }

    if literal_start < pattern.len() {
        tokens.push(Token::Literal(&pattern[literal_start..]));
    }
    Ok(tokens)
}

fn check_placeholder_name(pattern: &str, name: &str, seen: &mut Vec<String>) -> ConfigResult<()> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(pattern_error(pattern, format!("invalid placeholder name \"{}\"", name)));
    }
    if seen.iter().any(|s| s == name) {
        return Err(pattern_error(pattern, format!("placeholder \"{}\" appears twice", name)));
    }
    seen.push(name.to_string());
    Ok(())
}

fn sum_reference(constraint: &str) -> Option<&str> {
    let inner = constraint.strip_prefix('<')?.strip_suffix('>')?;
    let valid = !inner.is_empty()
        && inner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':'));
    valid.then_some(inner)
}

/// Parse a pattern into its canonical `{name}` form and the extracted rules.
pub fn normalize(pattern: &str, sums: &SumTypeRegistry) -> ConfigResult<(String, Rules)> {
    let mut canonical = String::with_capacity(pattern.len());
    let mut rules = Rules::new();
    let mut seen = Vec::new();

    for token in tokenize(pattern)? {
        match token {
            Token::Literal(text) => canonical.push_str(text),
            Token::Placeholder { name, constraint } => {
                check_placeholder_name(pattern, name, &mut seen)?;
                match constraint {
                    Some("") => return Err(pattern_error(pattern, format!("empty constraint for \"{}\"", name))),
                    Some(rule) => {
                        let rule = match sum_reference(rule) {
                            Some(path) => Rule::Sum(sums.resolve(path)?),
                            None => {
                                Regex::new(rule).map_err(|e| pattern_error(pattern, e.to_string()))?;
                                Rule::Regex(rule.to_string())
                            }
                        };
                        rules.insert(name.to_string(), rule);
                    }
                    None => {}
                }
                canonical.push('{');
                canonical.push_str(name);
                canonical.push('}');
            }
        }
    }
    Ok((canonical, rules))
}

/// Re-render placeholders using `format(name, rule_regex)`.
pub fn complete<F>(pattern: &str, rules: &Rules, format: F) -> ConfigResult<String>
where
    F: Fn(&str, &str) -> String,
{
    let mut out = String::with_capacity(pattern.len() * 2);
    for token in tokenize(pattern)? {
        match token {
            Token::Literal(text) => out.push_str(text),
            Token::Placeholder { name, constraint: Some(rule) } => out.push_str(&format(name, rule)),
            Token::Placeholder { name, constraint: None } => {
                let rule = rules
                    .get(name)
                    .map(Rule::expand)
                    .unwrap_or_else(|| DEFAULT_RULE.to_string());
                out.push_str(&format(name, &rule));
            }
        }
    }
    Ok(out)
}

/// `{name:rule}`: the pattern language's own syntax.
pub fn native_format(name: &str, rule: &str) -> String {
    format!("{{{}:{}}}", name, rule)
}

/// `(?P<name>rule)`: named capture groups for the `regex` crate.
pub fn regex_format(name: &str, rule: &str) -> String {
    format!("(?P<{}>{})", name, rule)
}

/// Placeholder names in order of appearance.
pub fn placeholders(pattern: &str) -> ConfigResult<Vec<String>> {
    Ok(tokenize(pattern)?
        .into_iter()
        .filter_map(|t| match t {
            Token::Placeholder { name, .. } => Some(name.to_string()),
            Token::Literal(_) => None,
        })
        .collect())
}
