//! Frozen application registry.
//!
//! Produced once by `Configurator::freeze`. Holds no interior mutability, so it is
//! shared across threads behind an `Arc` and read without locking.

use indexmap::IndexMap;

use crate::routing::{Namespace, Route};
use crate::sums::SumTypeMeta;

/// Read-only snapshot of every namespace's routes and the sum type metadata.
#[derive(Debug)]
pub struct AppRegistry {
    routes: IndexMap<String, Namespace>,
    sums: IndexMap<String, SumTypeMeta>,
}

impl AppRegistry {
    pub(crate) fn new(routes: IndexMap<String, Namespace>, sums: IndexMap<String, SumTypeMeta>) -> Self {
        Self { routes, sums }
    }

    /// namespace -> (route name -> route)
    pub fn routes(&self) -> &IndexMap<String, Namespace> {
        &self.routes
    }

    pub fn namespace(&self, namespace: &str) -> Option<&Namespace> {
        self.routes.get(namespace)
    }

    pub fn route(&self, namespace: &str, name: &str) -> Option<&Route> {
        self.routes.get(namespace)?.get(name)
    }

    pub fn sums(&self) -> &IndexMap<String, SumTypeMeta> {
        &self.sums
    }

    pub fn sum(&self, path: &str) -> Option<&SumTypeMeta> {
        self.sums.get(path)
    }
}
