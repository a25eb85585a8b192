//! Request representation seen by predicates and handlers.
//!
//! # Responsibilities
//! - Fix the request type used by dispatch (`http::Request` with a buffered body)
//! - Carry the resolved API version as a request extension
//! - Parse and compare dotted API versions
//! - Generate request IDs (UUID v4) for the adapter's request-id layers
//!
//! # Design Decisions
//! - Body is buffered before dispatch so predicates can inspect the payload
//! - Versions compare numerically component by component; missing components are zero

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use axum::body::Bytes;
use axum::http::HeaderValue;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Request type handed to predicates and handlers.
pub type Request = axum::http::Request<Bytes>;

/// Header carrying the request ID assigned by the adapter.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Assigns a fresh UUID v4 to requests that arrive without an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID header value, or `"unknown"` when absent.
pub fn request_id<B>(request: &axum::http::Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// A dotted numeric API version such as `1.10` or `2`.
#[derive(Debug, Clone, Eq)]
pub struct ApiVersion {
    parts: Vec<u64>,
}

impl ApiVersion {
    pub fn new(parts: impl Into<Vec<u64>>) -> Self {
        Self { parts: parts.into() }
    }

    pub fn parts(&self) -> &[u64] {
        &self.parts
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.parts.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Error for version strings that are not dotted integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidVersion(pub String);

impl fmt::Display for InvalidVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid API version: \"{}\"", self.0)
    }
}

impl std::error::Error for InvalidVersion {}

impl FromStr for ApiVersion {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(InvalidVersion(s.to_string()));
        }
        trimmed
            .split('.')
            .map(|p| p.parse::<u64>().map_err(|_| InvalidVersion(s.to_string())))
            .collect::<Result<Vec<_>, _>>()
            .map(ApiVersion::new)
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ApiVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Hash for ApiVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let significant = self
            .parts
            .iter()
            .rposition(|p| *p != 0)
            .map_or(0, |i| i + 1);
        self.parts[..significant].hash(state);
    }
}

/// Extension trait for reading the resolved version off a request.
pub trait ApiVersionExt {
    fn api_version(&self) -> Option<&ApiVersion>;
}

impl<B> ApiVersionExt for axum::http::Request<B> {
    fn api_version(&self) -> Option<&ApiVersion> {
        self.extensions().get::<ApiVersion>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_is_uuid() {
        let request = axum::http::Request::new(Bytes::new());
        let id = UuidRequestId.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
        assert_eq!(request_id(&request), "unknown");
    }

    #[test]
    fn test_version_ordering() {
        let v = |s: &str| s.parse::<ApiVersion>().unwrap();
        assert!(v("1.10") > v("1.9"));
        assert_eq!(v("2"), v("2.0.0"));
        assert!(v("v3.1") > v("3"));
        assert!("1.x".parse::<ApiVersion>().is_err());
        assert!("".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn test_version_extension() {
        let mut req = Request::new(Bytes::new());
        assert!(req.api_version().is_none());
        req.extensions_mut().insert(ApiVersion::new(vec![1, 2]));
        assert_eq!(req.api_version().unwrap().to_string(), "1.2");
    }
}
