//! HTTP host for a strategy, the counterpart of [`RemoteStrategy`].
//!
//! [`RemoteStrategy`]: crate::strategy::RemoteStrategy

use std::net::SocketAddr;

use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, info, warn};

use crate::strategy::Strategy;
use crate::wire::{TurnRequestBody, TurnResponseBody};

/// Body returned when the hosted strategy fails to produce an action.
pub const ACTION_FAILED: &str = "Failed to commit action";

/// Errors from running a strategy server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be opened.
    #[error("failed to bind {addr}: {reason}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying error text.
        reason: String,
    },
    /// Accepting a connection failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Serves one strategy on `POST /turn`.
pub struct StrategyServer {
    server: Server,
    strategy: Box<dyn Strategy>,
}

impl std::fmt::Debug for StrategyServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyServer")
            .field("addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

impl StrategyServer {
    /// Listen on `addr` (e.g. `127.0.0.1:8000`, or port 0 for any free port).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub fn bind(addr: &str, strategy: Box<dyn Strategy>) -> Result<Self, ServerError> {
        let server = Server::http(addr).map_err(|e| ServerError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { server, strategy })
    }

    /// Address actually bound.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Accept and answer one request.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if accepting the connection fails.
    pub fn handle_next(&mut self) -> Result<(), ServerError> {
        let request = self.server.recv()?;
        self.respond(request);
        Ok(())
    }

    /// Answer requests until accepting fails.
    ///
    /// # Errors
    ///
    /// Returns the I/O error that stopped the loop.
    pub fn serve(&mut self) -> Result<(), ServerError> {
        if let Some(addr) = self.local_addr() {
            info!(%addr, "strategy server listening");
        }
        loop {
            self.handle_next()?;
        }
    }

    fn respond(&mut self, mut request: Request) {
        let mut body = String::new();
        let (status, text) = if let Err(e) = request.as_reader().read_to_string(&mut body) {
            (400, format!("unreadable body: {e}"))
        } else {
            self.route(request.method(), request.url(), &body)
        };
        debug!(method = %request.method(), url = request.url(), status, "request handled");

        let mut response = Response::from_string(text).with_status_code(status);
        if status == 200
            && let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        {
            response.add_header(header);
        }
        if let Err(e) = request.respond(response) {
            warn!(error = %e, "failed to send response");
        }
    }

    fn route(&mut self, method: &Method, url: &str, body: &str) -> (u16, String) {
        let path = url.split('?').next().unwrap_or(url).trim_end_matches('/');
        if path != "/turn" {
            return (404, "not found".to_string());
        }
        if *method != Method::Post {
            return (405, "use POST".to_string());
        }

        let input = match serde_json::from_str::<TurnRequestBody>(body)
            .map_err(|e| e.to_string())
            .and_then(|b| b.into_input().map_err(|e| e.to_string()))
        {
            Ok(input) => input,
            Err(e) => return (400, format!("invalid turn request: {e}")),
        };

        match self.strategy.turn(&input) {
            Ok(action) => match serde_json::to_string(&TurnResponseBody::new(&action)) {
                Ok(json) => (200, json),
                Err(e) => (500, e.to_string()),
            },
            Err(e) => {
                warn!(error = %e, "hosted strategy failed");
                (404, ACTION_FAILED.to_string())
            }
        }
    }
}
