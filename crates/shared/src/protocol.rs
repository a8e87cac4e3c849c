use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Answers, BuildKind, Category, ContactInfo, FeatureId};

/// Structured request body. Sent as-is when nothing is attached; flattened
/// into multipart text fields otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub profile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_other_note: Option<String>,
    pub build_kind: BuildKind,
    pub features: Vec<FeatureId>,
    pub idea_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_hosting: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactInfo>,
}

/// File bytes resolved from a staged preview right before sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Acknowledgement body of a 2xx response. The backend contract does not fix
/// a shape, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmissionReceipt {
    #[serde(alias = "orderId", alias = "requestId")]
    pub id: Option<String>,
    pub message: Option<String>,
}

pub const DRAFT_FORMAT_VERSION: u8 = 1;

/// Snapshot written to local storage when a submission fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDraft {
    pub version: u8,
    pub saved_at: DateTime<Utc>,
    pub profile: String,
    pub answers: Answers,
    #[serde(default)]
    pub attachment_names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_tolerates_alternate_id_names_and_extra_fields() {
        let receipt: SubmissionReceipt =
            serde_json::from_str(r#"{"orderId":"42","status":"queued"}"#).expect("decode");
        assert_eq!(receipt.id.as_deref(), Some("42"));
        assert_eq!(receipt.message, None);
    }

    #[test]
    fn payload_omits_unset_optionals() {
        let payload = SubmissionPayload {
            profile: "project_request".into(),
            category: Some(Category::Commercial),
            category_other_note: None,
            build_kind: BuildKind::Website,
            features: vec![FeatureId::new("seo_optimization")],
            idea_summary: "A storefront for handmade goods".into(),
            target_audience: None,
            domain: None,
            has_hosting: None,
            project_name: None,
            budget: None,
            timeline: None,
            additional_notes: None,
            contact: None,
        };
        let json = serde_json::to_value(&payload).expect("encode");
        assert_eq!(json["buildKind"], "website");
        assert!(json.get("domain").is_none());
        assert!(json.get("contact").is_none());
    }
}
