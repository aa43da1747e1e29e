//! Vessel document compliance against a marina's requirement rules.
//!
//! The verdict is recomputed from current documents and rules on every call; nothing is
//! cached between evaluations.

mod document;
mod rules;

pub use document::{
    classify_document, Document, DocumentCompliance, DocumentIssue, DocumentState, IssueCode,
};
pub use rules::{ComplianceRule, DocumentType, MarinaRequirements, RulePredicate};

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::Vessel;

/// Distinguishes "evaluated and passed" from "nothing to evaluate".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceMode {
    Evaluated,
    NoRulesConfigured,
}

/// Blocking issue or warning attributed to a document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceIssue {
    pub code: IssueCode,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEvaluation {
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub required: bool,
    pub document: Option<Document>,
    pub compliance: DocumentCompliance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceResult {
    pub mode: ComplianceMode,
    pub eligible_to_book: bool,
    pub blocking_issues: Vec<ComplianceIssue>,
    pub warnings: Vec<ComplianceIssue>,
    pub evaluated_documents: Vec<DocumentEvaluation>,
}

impl ComplianceResult {
    pub fn no_rules_configured() -> Self {
        Self {
            mode: ComplianceMode::NoRulesConfigured,
            eligible_to_book: true,
            blocking_issues: Vec::new(),
            warnings: Vec::new(),
            evaluated_documents: Vec::new(),
        }
    }

    pub fn state_of(&self, doc_type: &str) -> Option<DocumentState> {
        self.evaluated_documents
            .iter()
            .find(|evaluation| evaluation.doc_type.0 == doc_type)
            .map(|evaluation| evaluation.compliance.state)
    }
}

/// Evaluate `documents` held by `vessel` against a marina's `rules`.
///
/// `rules == None` means the marina has no compliance configuration, which is reported
/// as [`ComplianceMode::NoRulesConfigured`] and does not block.
pub fn evaluate_compliance(
    vessel: Option<&Vessel>,
    documents: &[Document],
    rules: Option<&[ComplianceRule]>,
    today: NaiveDate,
) -> ComplianceResult {
    let Some(rules) = rules else {
        return ComplianceResult::no_rules_configured();
    };

    let mut blocking_issues = Vec::new();
    let mut warnings = Vec::new();
    let mut evaluated_documents = Vec::new();

    for rule in rules.iter().filter(|rule| rule.applies_to(vessel)) {
        let Some(document) = latest_document(documents, &rule.doc_type) else {
            if rule.required {
                blocking_issues.push(ComplianceIssue {
                    code: IssueCode::MissingDocument,
                    doc_type: rule.doc_type.clone(),
                    message: format!("{} is required but missing.", rule.doc_type),
                });
            }
            evaluated_documents.push(DocumentEvaluation {
                doc_type: rule.doc_type.clone(),
                required: rule.required,
                document: None,
                compliance: DocumentCompliance::missing(),
            });
            continue;
        };

        let compliance = classify_document(document, rule, today);

        if rule.required && compliance.state.is_blocking() {
            blocking_issues.push(ComplianceIssue {
                code: IssueCode::NonCompliant,
                doc_type: rule.doc_type.clone(),
                message: format!(
                    "{} is not compliant ({}).",
                    rule.doc_type,
                    compliance.state.label()
                ),
            });
        }

        if compliance.state == DocumentState::ExpiringSoon {
            let message = compliance
                .issues
                .first()
                .map(|issue| issue.message.clone())
                .unwrap_or_else(|| format!("{} expiring soon.", rule.doc_type));
            warnings.push(ComplianceIssue {
                code: IssueCode::ExpiringSoon,
                doc_type: rule.doc_type.clone(),
                message,
            });
        }

        evaluated_documents.push(DocumentEvaluation {
            doc_type: rule.doc_type.clone(),
            required: rule.required,
            document: Some(document.clone()),
            compliance,
        });
    }

    ComplianceResult {
        mode: ComplianceMode::Evaluated,
        eligible_to_book: blocking_issues.is_empty(),
        blocking_issues,
        warnings,
        evaluated_documents,
    }
}

/// Document of `doc_type` with the latest expiry. Documents without a readable expiry
/// sort last; ties keep the earliest entry.
fn latest_document<'a>(documents: &'a [Document], doc_type: &DocumentType) -> Option<&'a Document> {
    documents
        .iter()
        .filter(|document| &document.doc_type == doc_type)
        .fold(None, |best: Option<&Document>, candidate| match best {
            Some(current) if current.expiry() >= candidate.expiry() => Some(current),
            _ => Some(candidate),
        })
}
