//! Path matching against compiled route patterns.
//!
//! # Responsibilities
//! - Compile canonical route patterns into anchored regular expressions
//! - Extract named captures from a request path
//! - Pick the first matching entry in registration order
//!
//! # Design Decisions
//! - Patterns are rendered with the named-capture dialect of the pattern compiler
//! - Leading `/` is stripped from both pattern and path before matching
//! - Optional groups that did not participate produce no capture
//! - Deterministic: same path always matches the same entry

use regex::Regex;

use super::pattern::{complete, regex_format, Rules};
use crate::error::{ConfigError, ConfigResult};
use crate::predicates::Captures;

/// Something that can match a request path.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns the captures if the path matches.
    fn captures(&self, path: &str) -> Option<Captures>;
}

/// Anchored regex built from a route pattern.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    source: String,
    regex: Regex,
}

impl PathMatcher {
    /// Compile `pattern` with `rules`; `suffix` is raw regex appended before the end anchor.
    pub fn compile(pattern: &str, rules: &Rules, suffix: &str) -> ConfigResult<Self> {
        let body = complete(pattern.trim_start_matches('/'), rules, regex_format)?;
        let source = format!("^{}{}$", body, suffix);
        let regex = Regex::new(&source).map_err(|e| ConfigError::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl Matcher for PathMatcher {
    fn captures(&self, path: &str) -> Option<Captures> {
        let path = path.trim_start_matches('/');
        let caps = self.regex.captures(path)?;
        Some(
            self.regex
                .capture_names()
                .flatten()
                .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
                .collect(),
        )
    }
}

/// Ordered list of matchers, first match wins.
#[derive(Debug)]
pub struct RouteMatcher<T> {
    entries: Vec<(PathMatcher, T)>,
}

impl<T> Default for RouteMatcher<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> RouteMatcher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, matcher: PathMatcher, target: T) {
        self.entries.push((matcher, target));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose pattern matches `path`.
    pub fn find(&self, path: &str) -> Option<(&T, Captures)> {
        self.entries
            .iter()
            .find_map(|(matcher, target)| matcher.captures(path).map(|caps| (target, caps)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathMatcher, &T)> {
        self.entries.iter().map(|(m, t)| (m, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::pattern::Rule;

    #[test]
    fn test_path_matcher_captures() {
        let matcher = PathMatcher::compile("/users/{id}", &Rules::new(), "").unwrap();
        assert_eq!(matcher.as_str(), "^users/(?P<id>[^/]+)$");

        let caps = matcher.captures("/users/42").unwrap();
        assert_eq!(caps["id"], "42");
        assert!(matcher.captures("/users/42/posts").is_none());
        assert!(matcher.captures("/users/").is_none());
    }

    #[test]
    fn test_rules_constrain_matches() {
        let mut rules = Rules::new();
        rules.insert("id".into(), Rule::Regex("[0-9]+".into()));
        let matcher = PathMatcher::compile("/users/{id}", &rules, "").unwrap();
        assert!(matcher.captures("/users/7").is_some());
        assert!(matcher.captures("/users/abc").is_none());
    }

    #[test]
    fn test_optional_suffix() {
        let matcher =
            PathMatcher::compile("/orders", &Rules::new(), "(?:/(?P<pk>[^/.]+))?").unwrap();
        assert!(!matcher.captures("/orders").unwrap().contains_key("pk"));
        assert_eq!(matcher.captures("/orders/9").unwrap()["pk"], "9");
    }

    #[test]
    fn test_first_match_wins() {
        let mut router = RouteMatcher::new();
        router.push(PathMatcher::compile("/a/{x}", &Rules::new(), "").unwrap(), "first");
        router.push(PathMatcher::compile("/a/b", &Rules::new(), "").unwrap(), "second");

        let (target, caps) = router.find("/a/b").unwrap();
        assert_eq!(*target, "first");
        assert_eq!(caps["x"], "b");
        assert!(router.find("/c").is_none());
    }
}
