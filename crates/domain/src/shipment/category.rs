use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomainError;

use super::ProcessRequest;

/// Which composed pipeline fulfils a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessCategory {
    #[serde(rename = "domestic")]
    Domestic,
    #[serde(rename = "international")]
    International,
    #[serde(rename = "international-pt")]
    InternationalWithPaperlessTrade,
}

impl ProcessCategory {
    pub const ALL: [ProcessCategory; 3] = [
        ProcessCategory::Domestic,
        ProcessCategory::International,
        ProcessCategory::InternationalWithPaperlessTrade,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessCategory::Domestic => "domestic",
            ProcessCategory::International => "international",
            ProcessCategory::InternationalWithPaperlessTrade => "international-pt",
        }
    }

    /// International shipments travel with a customs invoice.
    pub fn includes_customs_invoice(&self) -> bool {
        !matches!(self, ProcessCategory::Domestic)
    }
}

impl std::fmt::Display for ProcessCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| DomainError::UnknownCategory(s.to_string()))
    }
}

/// Picks the category from the first character of a validated id.
pub fn classify(request: &ProcessRequest) -> ProcessCategory {
    match request.id.chars().next() {
        Some('1') => ProcessCategory::Domestic,
        Some('2') => ProcessCategory::InternationalWithPaperlessTrade,
        _ => ProcessCategory::International,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::shipment::Leg;

    fn request(id: &str) -> ProcessRequest {
        ProcessRequest::new(
            id,
            vec![Leg::new("c", "s", "r", "l")],
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            "UTC",
        )
    }

    #[test]
    fn classifies_by_first_character() {
        assert_eq!(classify(&request("1234")), ProcessCategory::Domestic);
        assert_eq!(
            classify(&request("2234")),
            ProcessCategory::InternationalWithPaperlessTrade
        );
        assert_eq!(classify(&request("3234")), ProcessCategory::International);
        assert_eq!(classify(&request("A1")), ProcessCategory::International);
    }

    #[test]
    fn names_parse_back() {
        for category in ProcessCategory::ALL {
            assert_eq!(category.as_str().parse::<ProcessCategory>().unwrap(), category);
            assert_eq!(
                serde_json::to_value(category).unwrap(),
                serde_json::json!(category.as_str())
            );
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = "n/a".parse::<ProcessCategory>().unwrap_err();
        assert!(matches!(err, DomainError::UnknownCategory(ref name) if name == "n/a"));
    }

    #[test]
    fn only_domestic_skips_customs_invoice() {
        assert!(!ProcessCategory::Domestic.includes_customs_invoice());
        assert!(ProcessCategory::International.includes_customs_invoice());
    }
}
