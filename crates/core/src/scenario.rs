//! Bridge-migration scenario state machine.
//!
//! Sequences participant setup, un-pins the owner's bridge preference, fires
//! the detached shutdown, then drives both participants through
//! disconnect-then-reconnect assertions with independent budgets. Teardown
//! runs regardless of outcome.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tokio::time::Instant;
use tracing::{error, info};

use crate::config::ScenarioConfig;
use crate::error::{Result, ScenarioError};
use crate::probe::wait_for_phase;
use crate::session::{ConnectivityPhase, ENFORCED_BRIDGE_KEY, ParticipantRole, ParticipantSession, SessionFactory};
use crate::setup::{ParticipantSetup, ScenarioContext};
use crate::shutdown::{BridgeControl, ShutdownHandle, ShutdownRequest, trigger};

/// Budget for each participant's initial transport connectivity.
pub const INITIAL_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Budget for each participant to lose connectivity after the shutdown is
/// dispatched.
pub const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(45);

/// Budget for each participant to regain connectivity on the new bridge.
pub const RECONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Scenario progress. `Failed` is not listed: a failure is reported as the
/// state that was being driven when it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScenarioState {
	Init,
	Setup,
	PreConnected,
	Migrating,
	DisconnectObserved,
	ReconnectObserved,
	Done,
}

impl fmt::Display for ScenarioState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ScenarioState::Init => "init",
			ScenarioState::Setup => "setup",
			ScenarioState::PreConnected => "preConnected",
			ScenarioState::Migrating => "migrating",
			ScenarioState::DisconnectObserved => "disconnectObserved",
			ScenarioState::ReconnectObserved => "reconnectObserved",
			ScenarioState::Done => "done",
		};
		f.write_str(s)
	}
}

/// One observed phase transition, for CI log triage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseObservation {
	/// State the scenario was driving when the phase was observed.
	pub state: ScenarioState,
	pub role: ParticipantRole,
	pub phase: ConnectivityPhase,
	/// Time this wait took, from probe entry.
	pub elapsed_ms: u64,
	/// Time since scenario start.
	pub at_ms: u64,
}

/// Outcome of one scenario run.
#[derive(Debug)]
pub struct ScenarioResult {
	pub passed: bool,
	/// State being driven when the run failed.
	pub failed_state: Option<ScenarioState>,
	pub failure: Option<ScenarioError>,
	pub observations: Vec<PhaseObservation>,
	pub total_elapsed: Duration,
}

impl ScenarioResult {
	/// JSON rendering of the result for CI logs.
	pub fn summary(&self) -> serde_json::Value {
		json!({
			"passed": self.passed,
			"failedState": self.failed_state,
			"failure": self.failure.as_ref().map(|err| err.to_string()),
			"observations": self.observations,
			"totalElapsedMs": self.total_elapsed.as_millis() as u64,
		})
	}
}

struct RunTrace {
	state: ScenarioState,
	observations: Vec<PhaseObservation>,
	shutdown: Option<ShutdownHandle>,
	started: Instant,
}

impl RunTrace {
	fn record(&mut self, role: ParticipantRole, phase: ConnectivityPhase, elapsed: Duration) {
		self.observations.push(PhaseObservation {
			state: self.state,
			role,
			phase,
			elapsed_ms: elapsed.as_millis() as u64,
			at_ms: self.started.elapsed().as_millis() as u64,
		});
	}

	fn enter(&mut self, state: ScenarioState) {
		info!(target = "migration.scenario", %state, at_ms = self.started.elapsed().as_millis() as u64, "state");
		self.state = state;
	}

	/// Root-cause check: a recorded shutdown-call failure outranks the probe
	/// timeout it caused.
	fn shutdown_failure(&self) -> Option<ScenarioError> {
		self.shutdown.as_ref().and_then(|handle| handle.take_failure())
	}
}

/// Drives one conference migration end to end.
pub struct MigrationScenario {
	config: ScenarioConfig,
	factory: Arc<dyn SessionFactory>,
	control: Arc<dyn BridgeControl>,
}

impl MigrationScenario {
	pub fn new(config: ScenarioConfig, factory: Arc<dyn SessionFactory>, control: Arc<dyn BridgeControl>) -> Self {
		Self { config, factory, control }
	}

	/// Runs the scenario. Teardown runs on every exit path, and the context
	/// is swept on entry to clear anything leaked by a previous run.
	pub async fn run(&self, ctx: &ScenarioContext) -> ScenarioResult {
		let started = Instant::now();
		ctx.dispose_all().await;

		let mut trace = RunTrace {
			state: ScenarioState::Init,
			observations: Vec::new(),
			shutdown: None,
			started,
		};

		let mut outcome = self.drive(ctx, &mut trace).await;
		ctx.dispose_all().await;

		// The detached call is never awaited, so its failure may only be
		// visible once the probes are done.
		if outcome.is_ok() {
			if let Some(err) = trace.shutdown_failure() {
				outcome = Err(err);
			}
		}

		let total_elapsed = started.elapsed();
		match &outcome {
			Ok(()) => {
				info!(
					target = "migration.scenario",
					total_elapsed_ms = total_elapsed.as_millis() as u64,
					"migration scenario passed"
				);
			}
			Err(err) => {
				error!(
					target = "migration.scenario",
					state = %trace.state,
					%err,
					"migration scenario failed"
				);
			}
		}

		ScenarioResult {
			passed: outcome.is_ok(),
			failed_state: outcome.as_ref().err().map(|_| trace.state),
			failure: outcome.err(),
			observations: trace.observations,
			total_elapsed,
		}
	}

	async fn drive(&self, ctx: &ScenarioContext, trace: &mut RunTrace) -> Result<()> {
		if self.config.bridge_id.is_empty() {
			return Err(ScenarioError::PreconditionMissing(
				"the bridge to be migrated has not been specified".to_string(),
			));
		}
		info!(
			target = "migration.scenario",
			bridge = %self.config.bridge_id,
			endpoint = %self.config.rest_endpoint,
			room = %self.config.room,
			"starting conference migration scenario"
		);

		trace.enter(ScenarioState::Setup);
		let setup = ParticipantSetup::new(self.factory.as_ref(), &self.config.room);
		let owner = setup.create_owner(ctx, &self.config.bridge_id).await?;
		let second = setup.create_second_participant(ctx).await?;

		self.watch(trace, owner.as_ref(), ConnectivityPhase::Connected, INITIAL_CONNECT_TIMEOUT).await?;
		self.watch(trace, second.as_ref(), ConnectivityPhase::Connected, INITIAL_CONNECT_TIMEOUT).await?;
		trace.enter(ScenarioState::PreConnected);

		// Un-pin the owner on the live session so the orchestrator is free to
		// move it, then kill the bridge. Strictly ordered: the shutdown races
		// the probes, never the initial join.
		owner
			.set_config_override(ENFORCED_BRIDGE_KEY, None)
			.await
			.map_err(|err| ScenarioError::Setup {
				role: ParticipantRole::Owner,
				reason: format!("failed to clear bridge pin: {err}"),
			})?;
		trace.shutdown = Some(trigger(
			self.control.clone(),
			ShutdownRequest {
				endpoint: self.config.rest_endpoint.clone(),
				graceful: true,
			},
		));
		trace.enter(ScenarioState::Migrating);

		// Owner first: migration is expected to hit the pinned session first.
		self.watch(trace, owner.as_ref(), ConnectivityPhase::Disconnected, DISCONNECT_TIMEOUT).await?;
		self.watch(trace, second.as_ref(), ConnectivityPhase::Disconnected, DISCONNECT_TIMEOUT).await?;
		trace.enter(ScenarioState::DisconnectObserved);

		self.watch(trace, owner.as_ref(), ConnectivityPhase::Connected, RECONNECT_TIMEOUT).await?;
		self.watch(trace, second.as_ref(), ConnectivityPhase::Connected, RECONNECT_TIMEOUT).await?;
		trace.enter(ScenarioState::ReconnectObserved);

		trace.enter(ScenarioState::Done);
		Ok(())
	}

	async fn watch(&self, trace: &mut RunTrace, session: &dyn ParticipantSession, target: ConnectivityPhase, timeout: Duration) -> Result<()> {
		match wait_for_phase(session, target, timeout).await {
			Ok(elapsed) => {
				trace.record(session.role(), target, elapsed);
				Ok(())
			}
			Err(err) => match trace.shutdown_failure() {
				Some(root) => Err(root),
				None => Err(err),
			},
		}
	}
}
