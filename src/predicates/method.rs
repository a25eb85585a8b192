//! Request method predicate.

use serde_json::Value;

use super::{invalid_value, Captures, Predicate};
use crate::error::{ConfigResult, DispatchError};
use crate::http::request::Request;

/// Passes when the request method is in a declared set.
///
/// Methods are uppercased and sorted. Declaring `GET` also admits `HEAD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMethodPredicate {
    methods: Vec<String>,
}

impl RequestMethodPredicate {
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut methods: Vec<String> = methods
            .into_iter()
            .map(|m| m.as_ref().trim().to_ascii_uppercase())
            .collect();
        if methods.iter().any(|m| m == "GET") && !methods.iter().any(|m| m == "HEAD") {
            methods.push("HEAD".to_string());
        }
        methods.sort();
        methods.dedup();
        Self { methods }
    }

    /// Accepts a string or an array of strings.
    pub fn from_value(value: &Value) -> ConfigResult<Self> {
        match value {
            Value::String(s) => Ok(Self::new([s])),
            Value::Array(items) => {
                let methods = items
                    .iter()
                    .map(|v| {
                        v.as_str()
                            .ok_or_else(|| invalid_value("request_method", "expected a list of strings"))
                    })
                    .collect::<ConfigResult<Vec<_>>>()?;
                if methods.is_empty() {
                    return Err(invalid_value("request_method", "empty method list"));
                }
                Ok(Self::new(methods))
            }
            _ => Err(invalid_value("request_method", "expected a string or a list of strings")),
        }
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }
}

impl Predicate for RequestMethodPredicate {
    fn text(&self) -> String {
        format!("request_method<{}>", self.methods.join(","))
    }

    fn evaluate(&self, _captures: &Captures, request: &Request) -> Result<bool, DispatchError> {
        let method = request.method().as_str();
        Ok(self.methods.iter().any(|m| m == method))
    }
}
