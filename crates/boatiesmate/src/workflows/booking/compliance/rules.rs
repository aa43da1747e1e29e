use std::fmt;

use serde::{Deserialize, Serialize};

use super::super::domain::{MarinaId, Vessel};

const DEFAULT_EXPIRING_SOON_DAYS: i64 = 30;

/// Document category such as `EWoF`, `INSURANCE`, or `SHORE_POWER_LEAD_TEST`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentType(pub String);

impl DocumentType {
    pub const INSURANCE: &'static str = "INSURANCE";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Coverage minimums only apply to insurance documents.
    pub fn is_insurance(&self) -> bool {
        self.0 == Self::INSURANCE
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-marina requirement for a document of one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceRule {
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub expiry_grace_days: i64,
    #[serde(default = "default_expiring_soon_days")]
    pub expiring_soon_days: i64,
    #[serde(default, rename = "minCoverageNZD")]
    pub min_coverage_nzd: Option<u64>,
    #[serde(default)]
    pub applies_when: Option<RulePredicate>,
}

impl ComplianceRule {
    pub fn required(doc_type: impl Into<String>) -> Self {
        Self {
            doc_type: DocumentType::new(doc_type),
            required: true,
            expiry_grace_days: 0,
            expiring_soon_days: DEFAULT_EXPIRING_SOON_DAYS,
            min_coverage_nzd: None,
            applies_when: None,
        }
    }

    pub fn optional(doc_type: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(doc_type)
        }
    }

    pub fn with_grace_days(mut self, days: i64) -> Self {
        self.expiry_grace_days = days;
        self
    }

    pub fn with_expiring_soon_days(mut self, days: i64) -> Self {
        self.expiring_soon_days = days;
        self
    }

    pub fn with_min_coverage(mut self, amount_nzd: u64) -> Self {
        self.min_coverage_nzd = Some(amount_nzd);
        self
    }

    pub fn when(mut self, predicate: RulePredicate) -> Self {
        self.applies_when = Some(predicate);
        self
    }

    /// Minimum coverage that is actually enforced for this rule.
    pub fn enforced_min_coverage(&self) -> Option<u64> {
        self.min_coverage_nzd
            .filter(|amount| *amount > 0 && self.doc_type.is_insurance())
    }

    pub fn applies_to(&self, vessel: Option<&Vessel>) -> bool {
        self.applies_when
            .as_ref()
            .map_or(true, |predicate| predicate.matches(vessel))
    }
}

fn default_expiring_soon_days() -> i64 {
    DEFAULT_EXPIRING_SOON_DAYS
}

/// Condition on vessel attributes that must hold for a rule to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePredicate {
    #[serde(default)]
    pub has_shore_power: Option<bool>,
}

impl RulePredicate {
    pub fn has_shore_power(value: bool) -> Self {
        Self {
            has_shore_power: Some(value),
        }
    }

    /// An unknown vessel is treated as having no shore power.
    pub fn matches(&self, vessel: Option<&Vessel>) -> bool {
        match self.has_shore_power {
            Some(expected) => vessel.map_or(false, |vessel| vessel.has_shore_power) == expected,
            None => true,
        }
    }
}

/// Rule set configured for one marina.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarinaRequirements {
    pub marina_id: MarinaId,
    pub required_documents: Vec<ComplianceRule>,
}
