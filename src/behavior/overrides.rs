//! Per-resource behavioral overrides

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::FailureScenario;
use crate::kind::ResourceKey;

/// Behavioral exception for a single resource instance
///
/// Overrides never expire; they live until cleared or the process exits.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOverride {
    /// Forced delay before the next reconciliation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<u64>,

    /// Failure to inject on the next reconciliation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_fail: Option<FailureScenario>,

    /// Never fail, regardless of other settings
    #[serde(default)]
    pub force_success: bool,
}

impl ResourceOverride {
    /// Override that only forces a delay
    pub fn delay(delay: Duration) -> Self {
        Self {
            delay_seconds: Some(delay.as_secs()),
            ..Default::default()
        }
    }

    /// Override that only forces a failure
    pub fn failure(scenario: FailureScenario) -> Self {
        Self {
            force_fail: Some(scenario),
            ..Default::default()
        }
    }

    /// Override that only forces success
    pub fn success() -> Self {
        Self {
            force_success: true,
            ..Default::default()
        }
    }

    /// Forced delay, if any
    pub fn forced_delay(&self) -> Option<Duration> {
        self.delay_seconds.map(Duration::from_secs)
    }

    /// Whether this override changes nothing
    pub fn is_empty(&self) -> bool {
        self.delay_seconds.is_none() && self.force_fail.is_none() && !self.force_success
    }
}

/// An override together with the resource it applies to
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverrideEntry {
    /// Resource identity
    pub key: ResourceKey,
    /// Active override
    #[serde(rename = "override")]
    pub override_: ResourceOverride,
}
