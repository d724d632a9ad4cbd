//! Health report types.

use serde::{Deserialize, Serialize};

/// Aggregate service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Everything reachable.
    Ok,
    /// One dependency unreachable; the fallback keeps requests served.
    Degraded,
    /// Neither the provider nor the configured store is reachable.
    ///
    /// Requests are still answered by the extractive fallback, but no
    /// external dependency works, so `/v1/healthz` reports 503 and load
    /// balancers can route to an instance that still reaches them.
    Error,
}

/// Reachability of a single dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Ok,
    Error,
    /// Not configured; does not affect the aggregate status.
    Disabled,
}

impl ComponentStatus {
    pub(crate) fn is_down(self) -> bool {
        self == ComponentStatus::Error
    }
}

/// Per-dependency checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthChecks {
    pub generative: ComponentStatus,
    pub store: ComponentStatus,
}

impl HealthChecks {
    /// Fold component checks into the aggregate status.
    pub fn status(&self) -> HealthStatus {
        match (self.generative.is_down(), self.store.is_down()) {
            (false, false) => HealthStatus::Ok,
            (true, true) => HealthStatus::Error,
            _ => HealthStatus::Degraded,
        }
    }
}

/// Result of [`Orchestrator::health`](crate::Orchestrator::health).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checks: HealthChecks,
    pub latency_ms: u64,
    /// RFC 3339 UTC timestamp of the check.
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_folding() {
        let check = |generative, store| HealthChecks { generative, store }.status();
        assert_eq!(check(ComponentStatus::Ok, ComponentStatus::Ok), HealthStatus::Ok);
        assert_eq!(
            check(ComponentStatus::Ok, ComponentStatus::Disabled),
            HealthStatus::Ok
        );
        assert_eq!(
            check(ComponentStatus::Error, ComponentStatus::Ok),
            HealthStatus::Degraded
        );
        assert_eq!(
            check(ComponentStatus::Error, ComponentStatus::Disabled),
            HealthStatus::Degraded
        );
        assert_eq!(
            check(ComponentStatus::Ok, ComponentStatus::Error),
            HealthStatus::Degraded
        );
        assert_eq!(
            check(ComponentStatus::Error, ComponentStatus::Error),
            HealthStatus::Error
        );
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&HealthStatus::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
    }
}
