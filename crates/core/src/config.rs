//! Scenario configuration from the environment.

use std::env;

use url::Url;

use crate::error::{Result, ScenarioError};

/// Identifier of the bridge the conference is pinned to and then killed.
/// Required; the scenario refuses to run without it.
pub const MIGRATED_BRIDGE_ENV: &str = "MIGRATED_BRIDGE_ID";

/// REST endpoint of the bridge to shut down.
pub const BRIDGE_REST_ENDPOINT_ENV: &str = "BRIDGE_REST_ENDPOINT";

/// Local bridge REST address used when [`BRIDGE_REST_ENDPOINT_ENV`] is unset.
pub const DEFAULT_BRIDGE_REST_ENDPOINT: &str = "http://localhost:8080";

const DEFAULT_ROOM: &str = "bridge-migration-test";

/// Immutable inputs for one scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
	/// Bridge the conference is forced onto and then shut down.
	pub bridge_id: String,
	/// REST endpoint of that bridge.
	pub rest_endpoint: Url,
	/// Signaling room both participants join.
	pub room: String,
}

impl ScenarioConfig {
	pub fn new(bridge_id: impl Into<String>, rest_endpoint: Url) -> Result<Self> {
		let bridge_id = bridge_id.into();
		if bridge_id.is_empty() {
			return Err(ScenarioError::PreconditionMissing(format!(
				"{MIGRATED_BRIDGE_ENV} must identify the bridge to migrate from"
			)));
		}
		Ok(Self {
			bridge_id,
			rest_endpoint,
			room: DEFAULT_ROOM.to_string(),
		})
	}

	/// Reads configuration from the environment. Empty values count as unset.
	pub fn from_env() -> Result<Self> {
		let bridge_id = non_empty_var(MIGRATED_BRIDGE_ENV).ok_or_else(|| {
			ScenarioError::PreconditionMissing(format!(
				"{MIGRATED_BRIDGE_ENV} must identify the bridge to migrate from"
			))
		})?;

		let endpoint = non_empty_var(BRIDGE_REST_ENDPOINT_ENV).unwrap_or_else(|| DEFAULT_BRIDGE_REST_ENDPOINT.to_string());
		let rest_endpoint = Url::parse(&endpoint).map_err(|err| {
			ScenarioError::PreconditionMissing(format!("{BRIDGE_REST_ENDPOINT_ENV} is not a valid URL ({endpoint}): {err}"))
		})?;

		Self::new(bridge_id, rest_endpoint)
	}

	/// Overrides the signaling room name.
	pub fn with_room(mut self, room: impl Into<String>) -> Self {
		self.room = room.into();
		self
	}
}

fn non_empty_var(name: &str) -> Option<String> {
	env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_bridge_id_is_precondition_failure() {
		temp_env::with_vars([(MIGRATED_BRIDGE_ENV, None::<&str>), (BRIDGE_REST_ENDPOINT_ENV, None)], || {
			let err = ScenarioConfig::from_env().unwrap_err();
			assert!(matches!(err, ScenarioError::PreconditionMissing(_)), "got: {err}");
		});
	}

	#[test]
	fn empty_bridge_id_counts_as_missing() {
		temp_env::with_vars([(MIGRATED_BRIDGE_ENV, Some("")), (BRIDGE_REST_ENDPOINT_ENV, None)], || {
			let err = ScenarioConfig::from_env().unwrap_err();
			assert!(matches!(err, ScenarioError::PreconditionMissing(_)));
		});
	}

	#[test]
	fn endpoint_defaults_to_local_bridge() {
		temp_env::with_vars([(MIGRATED_BRIDGE_ENV, Some("jvb-1")), (BRIDGE_REST_ENDPOINT_ENV, None)], || {
			let config = ScenarioConfig::from_env().unwrap();
			assert_eq!(config.rest_endpoint.as_str(), "http://localhost:8080/");
			assert_eq!(config.bridge_id, "jvb-1");
		});
	}

	#[test]
	fn empty_endpoint_falls_back_to_default() {
		temp_env::with_vars([(MIGRATED_BRIDGE_ENV, Some("jvb-1")), (BRIDGE_REST_ENDPOINT_ENV, Some(""))], || {
			let config = ScenarioConfig::from_env().unwrap();
			assert_eq!(config.rest_endpoint.as_str(), "http://localhost:8080/");
		});
	}

	#[test]
	fn explicit_endpoint_is_used() {
		temp_env::with_vars(
			[(MIGRATED_BRIDGE_ENV, Some("jvb-1")), (BRIDGE_REST_ENDPOINT_ENV, Some("http://bridge-2.internal:9090"))],
			|| {
				let config = ScenarioConfig::from_env().unwrap();
				assert_eq!(config.rest_endpoint.as_str(), "http://bridge-2.internal:9090/");
			},
		);
	}

	#[test]
	fn malformed_endpoint_is_precondition_failure() {
		temp_env::with_vars(
			[(MIGRATED_BRIDGE_ENV, Some("jvb-1")), (BRIDGE_REST_ENDPOINT_ENV, Some("not a url"))],
			|| {
				let err = ScenarioConfig::from_env().unwrap_err();
				assert!(matches!(err, ScenarioError::PreconditionMissing(_)));
			},
		);
	}

	#[test]
	fn room_override() {
		let config = ScenarioConfig::new("jvb-1", Url::parse("http://localhost:8080").unwrap())
			.unwrap()
			.with_room("smoke-room");
		assert_eq!(config.room, "smoke-room");
	}
}
