//! Trust and alert classification.
//!
//! Pure functions mapping raw telemetry and alert payloads into a risk tier
//! and normalized severity / event-type values. No I/O here; this is the only
//! part of the pipeline unit-testable without stubs.

use serde::{Deserialize, Serialize};

use crate::storage::types::{EventType, Severity};

/// Three-level risk classification derived from a trust score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Normal,
    Suspicious,
    Critical,
}

/// Maps a trust score to its risk tier.
///
/// Tiers are contiguous and exhaustive over the whole number line, inclusive
/// on the lower bound of each tier: `>= 70` Normal, `40..70` Suspicious,
/// `< 40` Critical. Scores are not clamped here; callers clamp where the
/// [0, 100] data-model range matters.
pub fn classify_trust(score: f64) -> RiskTier {
    if score >= 70.0 {
        RiskTier::Normal
    } else if score >= 40.0 {
        RiskTier::Suspicious
    } else {
        RiskTier::Critical
    }
}

/// Normalizes a raw alert severity. Anything outside the closed set
/// {info, warning, critical} (including absence) defaults to `warning`,
/// the alert-payload default.
pub fn classify_severity(raw: Option<&str>) -> Severity {
    raw.and_then(|s| s.parse().ok()).unwrap_or(Severity::Warning)
}

/// Normalizes a raw severity for general activity records, defaulting to
/// `info` rather than `warning`.
pub fn classify_activity_severity(raw: Option<&str>) -> Severity {
    raw.and_then(|s| s.parse().ok()).unwrap_or(Severity::Info)
}

/// Normalizes a raw event type; unrecognized or absent values default to
/// `other`.
pub fn classify_event_type(raw: Option<&str>) -> EventType {
    raw.and_then(|s| s.parse().ok()).unwrap_or(EventType::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_tier_boundaries() {
        assert_eq!(classify_trust(85.0), RiskTier::Normal);
        assert_eq!(classify_trust(70.0), RiskTier::Normal);
        assert_eq!(classify_trust(69.0), RiskTier::Suspicious);
        assert_eq!(classify_trust(40.0), RiskTier::Suspicious);
        assert_eq!(classify_trust(39.0), RiskTier::Critical);
        assert_eq!(classify_trust(0.0), RiskTier::Critical);
    }

    #[test]
    fn trust_tier_is_not_clamped() {
        assert_eq!(classify_trust(150.0), RiskTier::Normal);
        assert_eq!(classify_trust(-10.0), RiskTier::Critical);
    }

    #[test]
    fn severity_defaults() {
        assert_eq!(classify_severity(Some("critical")), Severity::Critical);
        assert_eq!(classify_severity(Some("bogus")), Severity::Warning);
        assert_eq!(classify_severity(None), Severity::Warning);
        assert_eq!(classify_activity_severity(None), Severity::Info);
        assert_eq!(classify_activity_severity(Some("warning")), Severity::Warning);
    }

    #[test]
    fn event_type_defaults() {
        assert_eq!(classify_event_type(Some("process")), EventType::Process);
        assert_eq!(classify_event_type(Some("telepathy")), EventType::Other);
        assert_eq!(classify_event_type(None), EventType::Other);
    }
}
