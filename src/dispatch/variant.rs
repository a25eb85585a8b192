//! Runtime projection of view metadata.

use std::fmt;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::http::request::Request;
use crate::predicates::{Captures, Predicate};
use crate::views::{Handler, HandlerShape, Renderer, ViewMeta};

/// One candidate handler of a dispatcher.
#[derive(Clone)]
pub struct ViewVariant {
    pub route_name: String,
    /// Name of the registered view object.
    pub view: String,
    pub shape: HandlerShape,
    /// Resolved and decorated callable.
    pub handler: Handler,
    pub attr: Option<String>,
    pub renderer: Arc<dyn Renderer>,
    pub predicates: Vec<Arc<dyn Predicate>>,
    pub signature: String,
}

impl ViewVariant {
    pub fn from_meta(meta: &ViewMeta) -> Self {
        Self {
            route_name: meta.route_name.clone(),
            view: meta.target.name().to_string(),
            shape: meta.shape,
            handler: meta.decorated_handler(),
            attr: meta.attr.clone(),
            renderer: meta.renderer.clone(),
            predicates: meta.predicates.clone(),
            signature: meta.signature.clone(),
        }
    }

    /// True for resource variants, which also answer on the item path.
    pub fn serves_items(&self) -> bool {
        self.shape == HandlerShape::CollectionResource
    }

    /// Evaluate the chain in order; stops at the first `false` or error.
    pub fn accepts(&self, captures: &Captures, request: &Request) -> Result<bool, DispatchError> {
        for predicate in &self.predicates {
            if !predicate.evaluate(captures, request)? {
                tracing::debug!(
                    predicate = %predicate.text(),
                    method = %request.method(),
                    path = %request.uri().path(),
                    "Predicate failed"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Debug for ViewVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewVariant")
            .field("route_name", &self.route_name)
            .field("handler", &self.handler)
            .field("shape", &self.shape)
            .field("predicates", &self.signature)
            .finish()
    }
}
