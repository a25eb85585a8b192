//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, body buffering)
//!     → request.rs (buffered request, API version extension)
//!     → dispatch (route match, variant selection)
//!     → response.rs (status responses)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ApiVersion, ApiVersionExt, Request, UuidRequestId, X_REQUEST_ID};
pub use response::Response;
pub use server::AppService;
