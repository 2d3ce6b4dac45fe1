//! Strategy client that forwards each turn to an HTTP endpoint.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use super::{Strategy, StrategyError, TurnInput};
use crate::game::ActionRequest;
use crate::wire::{self, TurnRequestBody, TurnResponseBody};

/// Upper bound on a single HTTP exchange. The arbiter's deadline is what
/// actually limits a turn; this only lets a stuck worker thread recover.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A strategy served by a remote process speaking the JSON protocol of
/// [`crate::wire`].
#[derive(Debug, Clone)]
pub struct RemoteStrategy {
    client: Client,
    endpoint: String,
}

impl RemoteStrategy {
    /// Client for the server at `base_url`; turns are posted to `{base_url}/turn`.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::Transport`] if the URL is empty or the HTTP
    /// client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, StrategyError> {
        let base_url = base_url.trim_end_matches('/');
        if base_url.is_empty() {
            return Err(StrategyError::Transport("empty strategy URL".to_string()));
        }
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| StrategyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{base_url}/turn"),
        })
    }

    /// The URL turns are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Strategy for RemoteStrategy {
    fn turn(&mut self, input: &TurnInput) -> Result<ActionRequest, StrategyError> {
        let body = TurnRequestBody::from_input(input);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|e| StrategyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(StrategyError::Failed(format!(
                "{} answered {status}: {}",
                self.endpoint,
                text.trim()
            )));
        }

        let reply: TurnResponseBody = response
            .json()
            .map_err(|e| StrategyError::Transport(format!("invalid response body: {e}")))?;
        debug!(endpoint = %self.endpoint, action = %reply.action, "remote strategy answered");
        Ok(wire::action_from_wire(&reply.action)?)
    }
}
