//! Provisioning state — persisted flags, phases and the credential retry
//! policy.

use std::fmt;

/// Flag-store key recording a confirmed bus registration.
pub const BUS_PROVISIONED_KEY: &str = "mqtt_prov";

/// Flag-store namespace used by the device.
pub const DEFAULT_NAMESPACE: &str = "storage";

/// Consecutive credential failures tolerated before the partially received
/// credentials are discarded.
pub const PROV_MAX_RETRY: u32 = 3;

/// The two persisted booleans that decide how much of the handshake runs
/// on boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisioningState {
    /// Network credentials are stored (owned by the network manager).
    pub network_provisioned: bool,
    /// The backend confirmed our registration (owned by the orchestrator).
    pub bus_provisioned: bool,
}

impl ProvisioningState {
    /// Both phases are done; drives the "operational" status indicator.
    #[must_use]
    pub fn is_operational(&self) -> bool {
        self.network_provisioned && self.bus_provisioned
    }
}

/// Where the orchestrator currently is in the handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProvisioningPhase {
    #[default]
    Cold,
    AwaitingNetwork,
    NetworkReady,
    AwaitingBusAck,
    Provisioned,
}

impl fmt::Display for ProvisioningPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cold => f.write_str("cold"),
            Self::AwaitingNetwork => f.write_str("awaiting_network"),
            Self::NetworkReady => f.write_str("network_ready"),
            Self::AwaitingBusAck => f.write_str("awaiting_bus_ack"),
            Self::Provisioned => f.write_str("provisioned"),
        }
    }
}

/// What to do after a credential exchange failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Keep the current credentials and let the exchange retry.
    Retry { attempt: u32 },
    /// The ceiling was hit: discard partial credentials and re-arm.
    ResetCredentials,
}

/// Counts consecutive credential failures since the last success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialRetry {
    failures: u32,
    ceiling: u32,
}

impl Default for CredentialRetry {
    fn default() -> Self {
        Self::new(PROV_MAX_RETRY)
    }
}

impl CredentialRetry {
    #[must_use]
    pub fn new(ceiling: u32) -> Self {
        Self {
            failures: 0,
            ceiling: ceiling.max(1),
        }
    }

    /// Record a failure. Resets the counter when the ceiling is reached.
    pub fn record_failure(&mut self) -> RetryDecision {
        self.failures += 1;
        if self.failures >= self.ceiling {
            self.failures = 0;
            RetryDecision::ResetCredentials
        } else {
            RetryDecision::Retry {
                attempt: self.failures,
            }
        }
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
    }

    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_be_operational_only_when_both_flags_set() {
        let mut state = ProvisioningState::default();
        assert!(!state.is_operational());
        state.network_provisioned = true;
        assert!(!state.is_operational());
        state.bus_provisioned = true;
        assert!(state.is_operational());
    }

    #[test]
    fn should_start_cold() {
        assert_eq!(ProvisioningPhase::default(), ProvisioningPhase::Cold);
    }

    #[test]
    fn should_display_snake_case_phase() {
        assert_eq!(
            ProvisioningPhase::AwaitingBusAck.to_string(),
            "awaiting_bus_ack"
        );
    }

    #[test]
    fn should_reset_credentials_on_third_consecutive_failure() {
        let mut retry = CredentialRetry::default();
        assert_eq!(retry.record_failure(), RetryDecision::Retry { attempt: 1 });
        assert_eq!(retry.record_failure(), RetryDecision::Retry { attempt: 2 });
        assert_eq!(retry.record_failure(), RetryDecision::ResetCredentials);
        assert_eq!(retry.failures(), 0);
    }

    #[test]
    fn should_count_only_failures_since_last_success() {
        let mut retry = CredentialRetry::default();
        retry.record_failure();
        retry.record_failure();
        retry.record_success();
        assert_eq!(retry.record_failure(), RetryDecision::Retry { attempt: 1 });
    }

    #[test]
    fn should_start_over_after_reset() {
        let mut retry = CredentialRetry::new(2);
        retry.record_failure();
        assert_eq!(retry.record_failure(), RetryDecision::ResetCredentials);
        assert_eq!(retry.record_failure(), RetryDecision::Retry { attempt: 1 });
    }
}
