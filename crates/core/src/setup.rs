//! Participant creation and guaranteed teardown.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{Result, ScenarioError};
use crate::session::{ConfigOverride, ENFORCED_BRIDGE_KEY, ParticipantRole, ParticipantSession, SessionFactory};

/// Budget for a created session to join the signaling room.
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Scenario-scoped registry of live sessions, passed through
/// setup/run/teardown instead of living in ambient state.
///
/// Reusable across runs: disposing drains the registry, so a second call is
/// a no-op and a context reused for a new run starts clean.
#[derive(Default)]
pub struct ScenarioContext {
	sessions: Mutex<Vec<Arc<dyn ParticipantSession>>>,
}

impl ScenarioContext {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a session for teardown. Called before the session joins, so
	/// a failed join still gets cleaned up.
	pub fn register(&self, session: Arc<dyn ParticipantSession>) {
		self.sessions.lock().push(session);
	}

	pub fn live_sessions(&self) -> usize {
		self.sessions.lock().len()
	}

	/// Disposes every registered session. Idempotent by draining; individual
	/// `dispose` calls tolerate already-gone sessions per the trait contract.
	pub async fn dispose_all(&self) {
		let sessions: Vec<_> = self.sessions.lock().drain(..).collect();
		if sessions.is_empty() {
			return;
		}
		info!(target = "migration.teardown", count = sessions.len(), "disposing sessions");
		for session in sessions {
			debug!(target = "migration.teardown", role = %session.role(), "dispose");
			session.dispose().await;
		}
	}
}

/// Creates the two conference participants and waits for each to join the
/// signaling room.
pub struct ParticipantSetup<'a> {
	factory: &'a dyn SessionFactory,
	room: &'a str,
}

impl<'a> ParticipantSetup<'a> {
	pub fn new(factory: &'a dyn SessionFactory, room: &'a str) -> Self {
		Self { factory, room }
	}

	/// Creates the owner session pinned to `bridge_id` via the
	/// `enforcedBridge` override.
	pub async fn create_owner(&self, ctx: &ScenarioContext, bridge_id: &str) -> Result<Arc<dyn ParticipantSession>> {
		let overrides = vec![ConfigOverride::new(ENFORCED_BRIDGE_KEY, bridge_id)];
		self.create(ctx, ParticipantRole::Owner, overrides).await
	}

	pub async fn create_second_participant(&self, ctx: &ScenarioContext) -> Result<Arc<dyn ParticipantSession>> {
		self.create(ctx, ParticipantRole::SecondParticipant, Vec::new()).await
	}

	async fn create(&self, ctx: &ScenarioContext, role: ParticipantRole, overrides: Vec<ConfigOverride>) -> Result<Arc<dyn ParticipantSession>> {
		let session = self.factory.create(role).await.map_err(|err| ScenarioError::Setup {
			role,
			reason: format!("session creation failed: {err}"),
		})?;
		ctx.register(session.clone());

		info!(target = "migration.setup", %role, room = self.room, "joining signaling room");
		match tokio::time::timeout(JOIN_TIMEOUT, session.join(self.room, &overrides)).await {
			Ok(Ok(())) => Ok(session),
			Ok(Err(err)) => Err(ScenarioError::Setup {
				role,
				reason: format!("failed to join room: {err}"),
			}),
			Err(_) => Err(ScenarioError::Setup {
				role,
				reason: format!("did not join room within {JOIN_TIMEOUT:?}"),
			}),
		}
	}
}
