//! Collaborator seams for participant sessions.
//!
//! The driver never owns browser automation: it consumes sessions through
//! [`SessionFactory`] and [`ParticipantSession`] and only observes transport
//! state by polling. Phase transitions are driven externally by the
//! underlying transport.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

/// Config key forcing a session onto a specific bridge instead of the
/// orchestrator's normal selection.
pub const ENFORCED_BRIDGE_KEY: &str = "enforcedBridge";

/// Observable state of a participant's transport-layer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityPhase {
	Connecting,
	Connected,
	Disconnected,
	Failed,
}

impl fmt::Display for ConnectivityPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ConnectivityPhase::Connecting => "connecting",
			ConnectivityPhase::Connected => "connected",
			ConnectivityPhase::Disconnected => "disconnected",
			ConnectivityPhase::Failed => "failed",
		};
		f.write_str(s)
	}
}

/// Which of the two conference participants a session plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParticipantRole {
	Owner,
	SecondParticipant,
}

impl fmt::Display for ParticipantRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ParticipantRole::Owner => "owner",
			ParticipantRole::SecondParticipant => "second participant",
		};
		f.write_str(s)
	}
}

/// A config override applied when a session joins the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOverride {
	pub key: String,
	pub value: String,
}

impl ConfigOverride {
	pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			value: value.into(),
		}
	}
}

/// One conference participant's runtime, owned by the external
/// browser-automation collaborator.
#[async_trait]
pub trait ParticipantSession: Send + Sync {
	fn role(&self) -> ParticipantRole;

	/// Joins the shared signaling room with the given config overrides.
	/// The driver bounds this call with its own timeout.
	async fn join(&self, room: &str, overrides: &[ConfigOverride]) -> anyhow::Result<()>;

	/// Synchronous accessor for the current transport phase. Poll-only; the
	/// driver never mutates connectivity state.
	fn connectivity_phase(&self) -> ConnectivityPhase;

	/// Mutates a config key on the live, already-joined session. `None`
	/// clears the key.
	async fn set_config_override(&self, key: &str, value: Option<&str>) -> anyhow::Result<()>;

	/// Tears the session down. Must be idempotent: disposing a session that
	/// is already gone is a no-op, not an error.
	async fn dispose(&self);
}

/// Creates un-joined participant sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
	async fn create(&self, role: ParticipantRole) -> anyhow::Result<std::sync::Arc<dyn ParticipantSession>>;
}
