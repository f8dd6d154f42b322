use std::time::Duration;

use thiserror::Error;

use crate::session::{ConnectivityPhase, ParticipantRole};

pub type Result<T> = std::result::Result<T, ScenarioError>;

/// Failure taxonomy for a migration scenario run.
///
/// None of these are retried: the scenario is a single-shot assertion, and
/// retrying would mask genuine orchestrator regressions.
#[derive(Debug, Error)]
pub enum ScenarioError {
	/// Required configuration absent or malformed. Raised before any session
	/// is created.
	#[error("precondition missing: {0}")]
	PreconditionMissing(String),

	/// A participant session failed to create or join the signaling room.
	#[error("setup failed for {role}: {reason}")]
	Setup { role: ParticipantRole, reason: String },

	/// The detached bridge shutdown call failed. Recorded asynchronously and
	/// surfaced when the scenario checks the shared error slot.
	#[error("bridge shutdown call failed: {0}")]
	ShutdownCall(String),

	/// A connectivity phase was not observed within its budget.
	#[error("timeout after {timeout:?} waiting for {role} to reach {target}")]
	Timeout {
		role: ParticipantRole,
		target: ConnectivityPhase,
		timeout: Duration,
	},
}

impl ScenarioError {
	pub fn is_timeout(&self) -> bool {
		matches!(self, ScenarioError::Timeout { .. })
	}
}
