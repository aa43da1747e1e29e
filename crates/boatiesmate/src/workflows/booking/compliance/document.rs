use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::super::domain::VesselId;
use super::super::range::parse_calendar_date;
use super::rules::{ComplianceRule, DocumentType};

/// Compliance document metadata held for a vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: u64,
    pub vessel_id: VesselId,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub policy_number: Option<String>,
    #[serde(default, rename = "coverageAmountNZD")]
    pub coverage_amount_nzd: Option<u64>,
    /// Stored as written; read through [`Document::expiry`].
    #[serde(default)]
    pub issue_date: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
}

impl Document {
    /// Expiry date when present and readable.
    pub fn expiry(&self) -> Option<NaiveDate> {
        self.expiry_date.as_deref().and_then(parse_calendar_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    Valid,
    ExpiringSoon,
    Expired,
    Invalid,
    Missing,
}

impl DocumentState {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentState::Valid => "valid",
            DocumentState::ExpiringSoon => "expiring_soon",
            DocumentState::Expired => "expired",
            DocumentState::Invalid => "invalid",
            DocumentState::Missing => "missing",
        }
    }

    /// States that block booking when the rule is required.
    pub const fn is_blocking(self) -> bool {
        matches!(
            self,
            DocumentState::Missing | DocumentState::Expired | DocumentState::Invalid
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    MissingDocument,
    NonCompliant,
    ExpiringSoon,
    Expired,
    NoExpiryDate,
    InsuranceMinCover,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentIssue {
    pub code: IssueCode,
    pub message: String,
}

/// Outcome of checking one document against one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCompliance {
    pub state: DocumentState,
    pub issues: Vec<DocumentIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_left: Option<i64>,
}

impl DocumentCompliance {
    pub fn missing() -> Self {
        Self {
            state: DocumentState::Missing,
            issues: Vec::new(),
            days_left: None,
        }
    }

    fn with_issue(state: DocumentState, code: IssueCode, message: String) -> Self {
        Self {
            state,
            issues: vec![DocumentIssue { code, message }],
            days_left: None,
        }
    }
}

/// Classify `document` under `rule` as of `today`.
///
/// Precedence: expired, expiring soon, insufficient cover, valid.
pub fn classify_document(
    document: &Document,
    rule: &ComplianceRule,
    today: NaiveDate,
) -> DocumentCompliance {
    let Some(expiry) = document.expiry() else {
        return DocumentCompliance::with_issue(
            DocumentState::Missing,
            IssueCode::NoExpiryDate,
            "Document expiryDate is missing/invalid.".to_string(),
        );
    };

    // A grace period beyond the calendar never lapses.
    let expired = Duration::try_days(rule.expiry_grace_days)
        .and_then(|grace| expiry.checked_add_signed(grace))
        .map_or(false, |limit| limit < today);
    if expired {
        return DocumentCompliance::with_issue(
            DocumentState::Expired,
            IssueCode::Expired,
            "Document is expired.".to_string(),
        );
    }

    let days_left = (expiry - today).num_days();
    if (0..=rule.expiring_soon_days).contains(&days_left) {
        let mut compliance = DocumentCompliance::with_issue(
            DocumentState::ExpiringSoon,
            IssueCode::ExpiringSoon,
            format!("Document expires in {days_left} day(s)."),
        );
        compliance.days_left = Some(days_left);
        return compliance;
    }

    if let Some(minimum) = rule.enforced_min_coverage() {
        if document.coverage_amount_nzd.unwrap_or(0) < minimum {
            let mut compliance = DocumentCompliance::with_issue(
                DocumentState::Invalid,
                IssueCode::InsuranceMinCover,
                format!("Insurance cover must be at least {minimum}."),
            );
            compliance.days_left = Some(days_left);
            return compliance;
        }
    }

    DocumentCompliance {
        state: DocumentState::Valid,
        issues: Vec::new(),
        days_left: Some(days_left),
    }
}
