//! In-memory [`Session`] for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ClientError, Result};
use crate::session::Session;

/// Serves canned bodies by exact URL and records every request.
#[derive(Default)]
pub struct FakeSession {
    routes: Mutex<HashMap<String, Vec<String>>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeSession {
    /// Queue `body` for `url`. Multiple bodies are served in order; the last
    /// one repeats.
    pub fn route(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.into())
            .or_default()
            .push(body.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn serve(&self, url: &str) -> Result<String> {
        self.calls.lock().unwrap().push(url.to_string());
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(url) {
            Some(bodies) if bodies.len() > 1 => Ok(bodies.remove(0)),
            Some(bodies) => Ok(bodies[0].clone()),
            None => Err(ClientError::HttpStatus {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn get(&self, url: &str) -> Result<String> {
        self.serve(url)
    }

    async fn post(&self, url: &str, _body: &str) -> Result<String> {
        self.serve(url)
    }
}
