//! Polling connectivity probe.
//!
//! Transport state is only observable through the collaborator's synchronous
//! accessor, so the probe actively samples it rather than waiting for a push.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::{Result, ScenarioError};
use crate::session::{ConnectivityPhase, ParticipantSession};

/// Sampling interval. Short relative to the smallest budget in use (10s),
/// so detection latency is negligible.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Blocks until `session` reports `target`, returning the elapsed time, or
/// fails with [`ScenarioError::Timeout`] once `timeout` (measured from call
/// entry) has passed.
pub async fn wait_for_phase(session: &dyn ParticipantSession, target: ConnectivityPhase, timeout: Duration) -> Result<Duration> {
	let started = Instant::now();

	loop {
		let phase = session.connectivity_phase();
		if phase == target {
			let elapsed = started.elapsed();
			debug!(
				target = "migration.probe",
				role = %session.role(),
				phase = %target,
				elapsed_ms = elapsed.as_millis() as u64,
				"phase observed"
			);
			return Ok(elapsed);
		}

		let elapsed = started.elapsed();
		if elapsed >= timeout {
			return Err(ScenarioError::Timeout {
				role: session.role(),
				target,
				timeout,
			});
		}

		trace!(
			target = "migration.probe",
			role = %session.role(),
			current = %phase,
			waiting_for = %target,
			"polling"
		);
		tokio::time::sleep(POLL_INTERVAL.min(timeout - elapsed)).await;
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use parking_lot::Mutex;

	use super::*;
	use crate::session::{ConfigOverride, ParticipantRole};

	struct ScriptedSession {
		phase: Mutex<ConnectivityPhase>,
	}

	impl ScriptedSession {
		fn new(phase: ConnectivityPhase) -> Arc<Self> {
			Arc::new(Self { phase: Mutex::new(phase) })
		}

		fn set_phase(&self, phase: ConnectivityPhase) {
			*self.phase.lock() = phase;
		}
	}

	#[async_trait::async_trait]
	impl ParticipantSession for ScriptedSession {
		fn role(&self) -> ParticipantRole {
			ParticipantRole::Owner
		}

		async fn join(&self, _room: &str, _overrides: &[ConfigOverride]) -> anyhow::Result<()> {
			Ok(())
		}

		fn connectivity_phase(&self) -> ConnectivityPhase {
			*self.phase.lock()
		}

		async fn set_config_override(&self, _key: &str, _value: Option<&str>) -> anyhow::Result<()> {
			Ok(())
		}

		async fn dispose(&self) {}
	}

	#[tokio::test(start_paused = true)]
	async fn returns_immediately_when_phase_already_matches() {
		let session = ScriptedSession::new(ConnectivityPhase::Connected);
		let elapsed = wait_for_phase(session.as_ref(), ConnectivityPhase::Connected, Duration::from_secs(10))
			.await
			.unwrap();
		assert_eq!(elapsed, Duration::ZERO);
	}

	#[tokio::test(start_paused = true)]
	async fn observes_phase_reached_mid_wait() {
		let session = ScriptedSession::new(ConnectivityPhase::Connecting);
		let flipper = session.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_secs(3)).await;
			flipper.set_phase(ConnectivityPhase::Connected);
		});

		let elapsed = wait_for_phase(session.as_ref(), ConnectivityPhase::Connected, Duration::from_secs(10))
			.await
			.unwrap();
		assert!(elapsed >= Duration::from_secs(3), "elapsed: {elapsed:?}");
		assert!(elapsed < Duration::from_secs(4), "elapsed: {elapsed:?}");
	}

	#[tokio::test(start_paused = true)]
	async fn times_out_when_phase_never_reached() {
		let session = ScriptedSession::new(ConnectivityPhase::Connecting);
		let err = wait_for_phase(session.as_ref(), ConnectivityPhase::Connected, Duration::from_secs(10))
			.await
			.unwrap_err();
		match err {
			ScenarioError::Timeout { role, target, timeout } => {
				assert_eq!(role, ParticipantRole::Owner);
				assert_eq!(target, ConnectivityPhase::Connected);
				assert_eq!(timeout, Duration::from_secs(10));
			}
			other => panic!("expected timeout, got {other}"),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn failed_does_not_satisfy_a_disconnected_wait() {
		let session = ScriptedSession::new(ConnectivityPhase::Failed);
		let err = wait_for_phase(session.as_ref(), ConnectivityPhase::Disconnected, Duration::from_secs(5))
			.await
			.unwrap_err();
		assert!(err.is_timeout());
	}
}
