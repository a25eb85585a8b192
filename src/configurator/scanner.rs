//! Declaration discovery.
//!
//! # Data Flow
//! ```text
//! http_endpoint! (link time)          Configurator::declare (run time)
//!     → inventory table                   → explicit list
//!     → Configurator::scan: filter by package, category, ignore rules
//!     → sorted by (file, line) so declaration order is stable
//!     → callback(&mut Scanner, name) for each declaration
//! ```
//!
//! # Design Decisions
//! - Discovery walks a static table instead of reflecting over live modules
//! - Ignore rules match module paths (`a::b::c`), one rule per function or regex

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use super::Configurator;
use crate::error::{ConfigError, ConfigResult};
use crate::routing::Scope;
use crate::views::{EndpointSpec, ViewTarget};

/// Category given to declarations that do not name one.
pub const DEFAULT_CATEGORY: &str = "frameroute";

/// Module path segments skipped by default.
pub const DEFAULT_IGNORED_SEGMENTS: [&str; 4] = ["cache", "migrations", "tests", "test"];

/// Deferred registration run when its declaration is scanned.
pub type Callback = fn(&mut Scanner<'_>, &str) -> ConfigResult<()>;

/// One declared endpoint awaiting a scan.
#[derive(Debug, Clone, Copy)]
pub struct Declaration {
    pub module_path: &'static str,
    pub file: &'static str,
    pub line: u32,
    pub category: &'static str,
    pub name: &'static str,
    pub callback: Callback,
}

impl Declaration {
    pub const fn new(
        module_path: &'static str,
        file: &'static str,
        line: u32,
        name: &'static str,
        callback: Callback,
    ) -> Self {
        Self {
            module_path,
            file,
            line,
            category: DEFAULT_CATEGORY,
            name,
            callback,
        }
    }

    pub const fn in_category(mut self, category: &'static str) -> Self {
        self.category = category;
        self
    }

    /// True when the declaration lives in `package` or one of its submodules.
    pub fn within(&self, package: &str) -> bool {
        match self.module_path.strip_prefix(package) {
            Some("") => true,
            Some(rest) => rest.starts_with("::"),
            None => false,
        }
    }
}

inventory::collect!(Declaration);

/// Handle passed to declaration callbacks during a scan.
pub struct Scanner<'a> {
    configurator: &'a mut Configurator,
    scope: Scope,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(configurator: &'a mut Configurator, scope: Scope) -> Self {
        Self { configurator, scope }
    }

    pub fn configurator(&mut self) -> &mut Configurator {
        self.configurator
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Register a view on a route of the scanned namespace.
    pub fn add_endpoint(&mut self, target: ViewTarget, spec: EndpointSpec) -> ConfigResult<()> {
        self.configurator.add_endpoint(&self.scope, target, spec)
    }
}

/// Predicate over module paths; a match skips the module.
#[derive(Clone)]
pub struct Ignore {
    label: String,
    test: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl Ignore {
    pub fn func<F>(label: impl Into<String>, test: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            test: Arc::new(test),
        }
    }

    /// Skip modules whose path matches the regular expression.
    pub fn regex(pattern: &str) -> ConfigResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| ConfigError::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::func(pattern, move |path| regex.is_match(path)))
    }

    /// Skip modules having `segment` as one of their path components.
    pub fn segment(segment: &str) -> Self {
        let owned = segment.to_string();
        Self::func(segment, move |path| path.split("::").any(|s| s == owned))
    }

    pub fn matches(&self, module_path: &str) -> bool {
        (self.test)(module_path)
    }
}

impl fmt::Debug for Ignore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ignore({})", self.label)
    }
}

/// Cache, migration and test modules.
pub fn default_ignores() -> Vec<Ignore> {
    DEFAULT_IGNORED_SEGMENTS.iter().map(|s| Ignore::segment(s)).collect()
}

/// Compile a list of regular expressions into ignore rules.
pub fn ignore_rules<S: AsRef<str>>(patterns: &[S]) -> ConfigResult<Vec<Ignore>> {
    patterns.iter().map(|p| Ignore::regex(p.as_ref())).collect()
}

/// Options of one `Configurator::scan` call.
#[derive(Debug, Clone)]
pub struct Scan {
    pub package: String,
    pub categories: Option<Vec<String>>,
    pub ignore: Option<Vec<Ignore>>,
    pub namespace: Option<String>,
}

impl Scan {
    /// Scan `package` and its submodules, e.g. `Scan::new(module_path!())`.
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            categories: None,
            ignore: None,
            namespace: None,
        }
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn ignore(mut self, ignore: Vec<Ignore>) -> Self {
        self.ignore = Some(ignore);
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Declarations selected by a scan, in declaration order.
pub(crate) fn select(
    declarations: impl IntoIterator<Item = Declaration>,
    package: &str,
    categories: Option<&[String]>,
    ignore: &[Ignore],
) -> Vec<Declaration> {
    let mut selected: Vec<Declaration> = declarations
        .into_iter()
        .filter(|d| d.within(package))
        .filter(|d| categories.map_or(true, |cats| cats.iter().any(|c| c == d.category)))
        .filter(|d| {
            let skipped = ignore.iter().any(|rule| rule.matches(d.module_path));
            if skipped {
                tracing::debug!(module = d.module_path, name = d.name, "Declaration ignored");
            }
            !skipped
        })
        .collect();
    selected.sort_by(|a, b| a.file.cmp(b.file).then(a.line.cmp(&b.line)));
    selected
}

/// Declare an endpoint for discovery by `Configurator::scan`.
///
/// ```ignore
/// frameroute::http_endpoint!(list_orders,
///     ViewTarget::function("list_orders", list_orders),
///     EndpointSpec::new("orders").request_method(["GET"]).renderer("json"));
/// ```
#[macro_export]
macro_rules! http_endpoint {
    ($name:ident, $target:expr, $spec:expr $(,)?) => {
        $crate::http_endpoint!(@category $crate::configurator::DEFAULT_CATEGORY, $name, $target, $spec);
    };
    (@category $category:expr, $name:ident, $target:expr, $spec:expr $(,)?) => {
        const _: () = {
            fn __frameroute_endpoint(
                scanner: &mut $crate::configurator::Scanner<'_>,
                _name: &str,
            ) -> $crate::ConfigResult<()> {
                scanner.add_endpoint($target, $spec)
            }

            $crate::inventory::submit! {
                $crate::configurator::Declaration::new(
                    module_path!(),
                    file!(),
                    line!(),
                    stringify!($name),
                    __frameroute_endpoint,
                )
                .in_category($category)
            }
        };
    };
}
