//! Detached bridge shutdown.
//!
//! The administrative shutdown call races the connectivity probes: its
//! network latency must not block observation, so it runs on a spawned task
//! the scenario never joins. Failures land in a shared slot instead of being
//! printed and lost, and the scenario checks that slot when it concludes.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use crate::error::ScenarioError;

/// One bridge shutdown command. Built once per run; at most one is issued.
#[derive(Debug, Clone)]
pub struct ShutdownRequest {
	pub endpoint: Url,
	pub graceful: bool,
}

/// Collaborator seam for the administrative shutdown transport.
#[async_trait]
pub trait BridgeControl: Send + Sync {
	async fn shutdown(&self, request: &ShutdownRequest) -> anyhow::Result<()>;
}

/// REST-backed [`BridgeControl`] against the bridge's shutdown endpoint.
pub struct RestBridgeControl {
	client: reqwest::Client,
}

impl RestBridgeControl {
	pub fn new() -> Self {
		Self {
			client: reqwest::Client::new(),
		}
	}
}

impl Default for RestBridgeControl {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl BridgeControl for RestBridgeControl {
	async fn shutdown(&self, request: &ShutdownRequest) -> anyhow::Result<()> {
		let url = shutdown_url(&request.endpoint)?;
		self.client
			.post(url)
			.json(&shutdown_body(request.graceful))
			.send()
			.await?
			.error_for_status()?;
		Ok(())
	}
}

fn shutdown_url(endpoint: &Url) -> anyhow::Result<Url> {
	Ok(endpoint.join("colibri/shutdown")?)
}

fn shutdown_body(graceful: bool) -> serde_json::Value {
	json!({ "graceful-shutdown": graceful })
}

/// Handle to the detached shutdown task's error slot.
pub struct ShutdownHandle {
	slot: Arc<Mutex<Option<String>>>,
}

impl ShutdownHandle {
	/// Takes the recorded failure, if any, as a scenario error.
	pub fn take_failure(&self) -> Option<ScenarioError> {
		self.slot.lock().take().map(ScenarioError::ShutdownCall)
	}
}

/// Fires the shutdown request on a detached task and returns the handle the
/// scenario checks later. The caller proceeds to probing immediately.
pub fn trigger(control: Arc<dyn BridgeControl>, request: ShutdownRequest) -> ShutdownHandle {
	let slot = Arc::new(Mutex::new(None));
	let task_slot = slot.clone();

	tokio::spawn(async move {
		info!(
			target = "migration.shutdown",
			endpoint = %request.endpoint,
			graceful = request.graceful,
			"sending bridge shutdown"
		);
		if let Err(err) = control.shutdown(&request).await {
			warn!(target = "migration.shutdown", error = %err, "bridge shutdown call failed");
			*task_slot.lock() = Some(err.to_string());
		}
	});

	ShutdownHandle { slot }
}

#[cfg(test)]
mod tests {
	use super::*;

	struct FailingControl;

	#[async_trait]
	impl BridgeControl for FailingControl {
		async fn shutdown(&self, _request: &ShutdownRequest) -> anyhow::Result<()> {
			Err(anyhow::anyhow!("connection refused"))
		}
	}

	struct OkControl;

	#[async_trait]
	impl BridgeControl for OkControl {
		async fn shutdown(&self, _request: &ShutdownRequest) -> anyhow::Result<()> {
			Ok(())
		}
	}

	fn request() -> ShutdownRequest {
		ShutdownRequest {
			endpoint: Url::parse("http://localhost:8080").unwrap(),
			graceful: true,
		}
	}

	#[test]
	fn shutdown_url_appends_colibri_path() {
		let url = shutdown_url(&Url::parse("http://localhost:8080").unwrap()).unwrap();
		assert_eq!(url.as_str(), "http://localhost:8080/colibri/shutdown");
	}

	#[test]
	fn shutdown_body_carries_graceful_flag() {
		assert_eq!(shutdown_body(true), json!({ "graceful-shutdown": true }));
		assert_eq!(shutdown_body(false), json!({ "graceful-shutdown": false }));
	}

	#[tokio::test]
	async fn failure_lands_in_the_slot() {
		let handle = trigger(Arc::new(FailingControl), request());
		tokio::time::sleep(std::time::Duration::from_millis(50)).await;
		let err = handle.take_failure().expect("failure should be recorded");
		assert!(matches!(err, ScenarioError::ShutdownCall(_)));
		// Taking the failure drains the slot.
		assert!(handle.take_failure().is_none());
	}

	#[tokio::test]
	async fn success_leaves_the_slot_empty() {
		let handle = trigger(Arc::new(OkControl), request());
		tokio::time::sleep(std::time::Duration::from_millis(50)).await;
		assert!(handle.take_failure().is_none());
	}
}
