use crate::error::Result;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

/// A blocking request/response channel to the remote API.
///
/// Paths are relative to the API root (e.g. `workspaces/acme/projects/`).
/// Implementations turn non-2xx responses into [`crate::error::PlaneError::Http`].
pub trait Transport: Send + Sync {
    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value>;
}

/// Produces independent transports, one per logical batch of calls.
pub trait Connector: Send + Sync {
    fn connect(&self) -> Arc<dyn Transport>;
}
