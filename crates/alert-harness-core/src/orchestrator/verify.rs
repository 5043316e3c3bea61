// crates/alert-harness-core/src/orchestrator/verify.rs
// ============================================================================
// Module: Expectation Evaluation
// Description: Pure check of observed alerts against expectations.
// Purpose: Decide, per poll, whether a positive expectation is met.
// Dependencies: std
// ============================================================================

//! ## Overview
//! An expectation holds when:
//! - at least `num_alerts` alerts were delivered in total,
//! - the last delivered alert is firing and carries every expected label and
//!   annotation,
//! - every entry of `expected_alerts` is matched by some firing alert.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use super::AlertExpectations;
use crate::webhook::FiringAlert;

// ============================================================================
// SECTION: Verdict
// ============================================================================

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Every expectation holds.
    Satisfied,
    /// Something is still missing.
    Pending {
        /// Unmet expectations, one per line.
        missing: Vec<String>,
    },
}

impl Verdict {
    /// Returns true when satisfied.
    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

/// Evaluates a positive expectation against the alerts seen so far.
#[must_use]
pub fn evaluate(expectations: &AlertExpectations, alerts: &[FiringAlert]) -> Verdict {
    let mut missing = Vec::new();
    if alerts.len() < expectations.num_alerts {
        missing.push(format!(
            "expected at least {} alert(s), observed {}",
            expectations.num_alerts,
            alerts.len()
        ));
    }
    match alerts.last() {
        None => missing.push("no alert delivered".to_string()),
        Some(last) => {
            if !last.is_firing() {
                missing.push("last alert is not firing".to_string());
            }
            diff_into(&mut missing, "label", &expectations.verify_labels, &last.labels);
            diff_into(
                &mut missing,
                "annotation",
                &expectations.verify_annotations,
                &last.annotations,
            );
        }
    }
    for (index, expected) in expectations.expected_alerts.iter().enumerate() {
        let matched = alerts.iter().any(|alert| {
            alert.is_firing()
                && is_superset(&alert.labels, &expected.labels)
                && is_superset(&alert.annotations, &expected.annotations)
        });
        if !matched {
            let labels: Vec<String> =
                expected.labels.iter().map(|(key, value)| format!("{key}={value}")).collect();
            missing.push(format!(
                "expected_alerts[{index}] not matched by any firing alert: {{{}}}",
                labels.join(", ")
            ));
        }
    }
    if missing.is_empty() { Verdict::Satisfied } else { Verdict::Pending { missing } }
}

/// Returns true when `observed` contains every pair of `expected`.
#[must_use]
pub fn is_superset(
    observed: &BTreeMap<String, String>,
    expected: &BTreeMap<String, String>,
) -> bool {
    expected.iter().all(|(key, value)| observed.get(key) == Some(value))
}

fn diff_into(
    missing: &mut Vec<String>,
    kind: &str,
    expected: &BTreeMap<String, String>,
    observed: &BTreeMap<String, String>,
) {
    for (key, value) in expected {
        match observed.get(key) {
            Some(actual) if actual == value => {}
            Some(actual) => {
                missing.push(format!("{kind} {key}: expected {value}, observed {actual}"));
            }
            None => missing.push(format!("{kind} {key}: expected {value}, absent")),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
