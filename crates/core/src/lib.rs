//! End-to-end driver for conference bridge-migration testing.
//!
//! Validates that a conferencing deployment survives the failure of one
//! media-routing bridge: the scenario pins a conference onto a designated
//! bridge, gracefully shuts that bridge down out-of-band, and asserts that
//! both participants disconnect and then reconnect within bounded windows.
//! Migration itself belongs to the external conference focus and its bridges;
//! this crate only drives and observes.
//!
//! Browser automation is supplied by the harness through the
//! [`session::SessionFactory`] and [`session::ParticipantSession`] traits.

pub mod config;
pub mod error;
pub mod logging;
pub mod probe;
pub mod scenario;
pub mod session;
pub mod setup;
pub mod shutdown;

pub use config::ScenarioConfig;
pub use error::{Result, ScenarioError};
pub use scenario::{MigrationScenario, PhaseObservation, ScenarioResult, ScenarioState};
pub use session::{ConfigOverride, ConnectivityPhase, ParticipantRole, ParticipantSession, SessionFactory};
pub use setup::ScenarioContext;
pub use shutdown::{BridgeControl, RestBridgeControl, ShutdownRequest};
