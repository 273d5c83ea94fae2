//! In-memory transport for exercising the client, cache, and resolver.

use super::transport::{Connector, Method, Transport};
use crate::error::{PlaneError, Result};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
enum Reply {
    Body(Value),
    Status(u16),
}

/// Routes `GET path` to canned replies and records every request path.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Serve `body` at `path`.
    pub fn route(&self, path: &str, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Reply::Body(body));
    }

    /// Serve a single, final page of `results` at `path`.
    pub fn list(&self, path: &str, results: Value) {
        self.route(
            path,
            json!({"results": results, "next_page_results": false, "next_cursor": null}),
        );
    }

    pub fn fail(&self, path: &str, status: u16) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Reply::Status(status));
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|p| *p == path).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Transport for FakeTransport {
    fn request(
        &self,
        _method: Method,
        path: &str,
        _query: &[(String, String)],
        _body: Option<&Value>,
    ) -> Result<Value> {
        self.calls.lock().unwrap().push(path.to_string());
        let reply = self.routes.lock().unwrap().get(path).cloned();
        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Status(status)) => Err(PlaneError::Http {
                status,
                message: format!("HTTP {}", status),
            }),
            None => Err(PlaneError::Http {
                status: 404,
                message: "Not found.".to_string(),
            }),
        }
    }
}

/// Hands out the same fake so tests can inspect every call, counting each `connect`.
pub struct FakeConnector {
    transport: Arc<FakeTransport>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(transport: &Arc<FakeTransport>) -> Arc<Self> {
        Arc::new(Self {
            transport: Arc::clone(transport),
            connects: AtomicUsize::new(0),
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    fn connect(&self) -> Arc<dyn Transport> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.transport.clone()
    }
}
