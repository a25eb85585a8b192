//! Configuration units: named bundles of entry points that `include` can run.

use indexmap::IndexMap;

use super::Configurator;
use crate::error::ConfigResult;
use crate::routing::Scope;

/// Entry point used when `include` names none.
pub const DEFAULT_ENTRY_POINT: &str = "includeme";

/// Function run by `include` with the scope of the included unit.
pub type EntryPoint = fn(&mut Configurator, &Scope) -> ConfigResult<()>;

/// An includable unit of configuration.
#[derive(Debug, Clone)]
pub struct ConfigUnit {
    path: String,
    source: Option<String>,
    entry_points: IndexMap<String, EntryPoint>,
}

impl ConfigUnit {
    /// Unit identified by a module path such as `shop::orders`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: None,
            entry_points: IndexMap::new(),
        }
    }

    /// File the unit was defined in.
    pub fn source(mut self, file: impl Into<String>) -> Self {
        self.source = Some(file.into());
        self
    }

    pub fn entry_point(mut self, name: impl Into<String>, entry: EntryPoint) -> Self {
        self.entry_points.insert(name.into(), entry);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn source_file(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn get(&self, entry_point: &str) -> Option<EntryPoint> {
        self.entry_points.get(entry_point).copied()
    }

    /// Enclosing package of the unit; the default namespace for `include`.
    pub fn package(&self) -> &str {
        match self.path.rfind("::") {
            Some(pos) => &self.path[..pos],
            None => &self.path,
        }
    }

    pub(crate) fn merge(&mut self, other: ConfigUnit) {
        if self.source.is_none() {
            self.source = other.source;
        }
        for (name, entry) in other.entry_points {
            self.entry_points.entry(name).or_insert(entry);
        }
    }
}

/// Link-time record of one entry point, submitted by `config_unit!`.
#[derive(Debug, Clone, Copy)]
pub struct UnitDeclaration {
    pub path: &'static str,
    pub source: &'static str,
    pub entry_point: &'static str,
    pub func: EntryPoint,
}

impl UnitDeclaration {
    pub const fn new(
        path: &'static str,
        source: &'static str,
        entry_point: &'static str,
        func: EntryPoint,
    ) -> Self {
        Self {
            path,
            source,
            entry_point,
            func,
        }
    }

    pub(crate) fn to_unit(self) -> ConfigUnit {
        ConfigUnit::new(self.path)
            .source(self.source)
            .entry_point(self.entry_point, self.func)
    }
}

inventory::collect!(UnitDeclaration);

/// Register functions of the current module as entry points of a configuration unit.
///
/// ```ignore
/// fn includeme(config: &mut Configurator, scope: &Scope) -> ConfigResult<()> {
///     config.add_route(scope, "orders", "/orders")?;
///     Ok(())
/// }
/// frameroute::config_unit!(includeme);
/// ```
#[macro_export]
macro_rules! config_unit {
    ($($entry:ident),+ $(,)?) => {
        $(
            $crate::inventory::submit! {
                $crate::configurator::UnitDeclaration::new(
                    module_path!(),
                    file!(),
                    stringify!($entry),
                    $entry,
                )
            }
        )+
    };
}
