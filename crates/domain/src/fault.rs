//! Business fault vocabulary.
//!
//! A *failure* is what the caller observes; a *fault* is its cause, and the
//! fault's *errors* say exactly what was wrong. A failed process carries one
//! fault per failing stage.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FaultKind {
    #[default]
    General,
    /// Bad input. Never retried.
    Validation,
    /// The engine met a record or route it cannot interpret.
    InconsistentInternalState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    #[serde(default)]
    pub kind: FaultKind,
    pub description: String,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl Fault {
    pub fn new(kind: FaultKind, description: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            errors,
        }
    }

    pub fn general(description: impl Into<String>, errors: Vec<String>) -> Self {
        Self::new(FaultKind::General, description, errors)
    }

    pub fn validation(description: impl Into<String>, errors: Vec<String>) -> Self {
        Self::new(FaultKind::Validation, description, errors)
    }

    pub fn inconsistent_internal_state(description: impl Into<String>) -> Self {
        Self::new(FaultKind::InconsistentInternalState, description, Vec::new())
    }

    pub fn is_validation(&self) -> bool {
        self.kind == FaultKind::Validation
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description)?;
        if !self.errors.is_empty() {
            write!(f, " ({})", self.errors.join("; "))?;
        }
        Ok(())
    }
}

/// Failure of a stage or of the whole process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessFailure {
    pub faults: Vec<Fault>,
}

impl ProcessFailure {
    pub fn new(faults: Vec<Fault>) -> Self {
        Self { faults }
    }

    pub fn single(fault: Fault) -> Self {
        Self {
            faults: vec![fault],
        }
    }

    pub fn inconsistent_internal_state(description: impl Into<String>) -> Self {
        Self::single(Fault::inconsistent_internal_state(description))
    }

    /// Description of the first fault, if any.
    pub fn description(&self) -> Option<&str> {
        self.faults.first().map(|f| f.description.as_str())
    }
}

impl From<Fault> for ProcessFailure {
    fn from(fault: Fault) -> Self {
        Self::single(fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_uses_camel_case_names() {
        let fault = Fault::inconsistent_internal_state("Inconsistent internal state");
        let json = serde_json::to_value(&fault).unwrap();
        assert_eq!(json["kind"], "inconsistentInternalState");
        assert_eq!(json["errors"], serde_json::json!([]));
    }

    #[test]
    fn kind_defaults_to_general_when_absent() {
        let fault: Fault =
            serde_json::from_value(serde_json::json!({"description": "Carrier down"})).unwrap();
        assert_eq!(fault.kind, FaultKind::General);
        assert!(fault.errors.is_empty());
    }

    #[test]
    fn display_lists_errors() {
        let fault = Fault::validation(
            "Invalid request",
            vec!["ShipmentId must be specified".to_string()],
        );
        assert!(fault.is_validation());
        assert_eq!(
            fault.to_string(),
            "Invalid request (ShipmentId must be specified)"
        );
    }

    #[test]
    fn single_fault_failure() {
        let failure: ProcessFailure = Fault::general("Carrier manifestation failed", vec![]).into();
        assert_eq!(failure.faults.len(), 1);
        assert_eq!(failure.description(), Some("Carrier manifestation failed"));
        assert_eq!(ProcessFailure::new(vec![]).description(), None);
    }
}
