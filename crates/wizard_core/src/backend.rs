use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{OutgoingAttachment, SubmissionPayload, SubmissionReceipt},
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::profile::WizardProfile;

pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything needed for one outbound request.
#[derive(Debug, Clone)]
pub struct Submission {
    pub profile: &'static WizardProfile,
    pub payload: SubmissionPayload,
    pub attachments: Vec<OutgoingAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("submission timed out after {0:?}")]
    Timeout(Duration),
    #[error("could not reach the request backend: {0}")]
    Transport(String),
    #[error("request backend answered {status}: {message}")]
    Status {
        status: u16,
        code: Option<ErrorCode>,
        message: String,
    },
    #[error("attachment '{file_name}' could not be prepared: {reason}")]
    Attachment { file_name: String, reason: String },
    #[error("submission was cancelled before the backend answered")]
    Cancelled,
}

#[async_trait]
pub trait SubmissionBackend: Send + Sync {
    async fn submit(&self, submission: &Submission) -> Result<SubmissionReceipt, SubmissionError>;
}

pub struct HttpSubmissionBackend {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpSubmissionBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for request submission")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn endpoint_url(&self, profile: &WizardProfile) -> String {
        format!("{}{}", self.base_url, profile.endpoint_path)
    }

    fn classify(&self, err: reqwest::Error) -> SubmissionError {
        if err.is_timeout() {
            SubmissionError::Timeout(self.timeout)
        } else {
            SubmissionError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl SubmissionBackend for HttpSubmissionBackend {
    async fn submit(&self, submission: &Submission) -> Result<SubmissionReceipt, SubmissionError> {
        let url = self.endpoint_url(submission.profile);
        let request = self.http.post(&url);
        let request = if submission.attachments.is_empty() {
            request.json(&submission.payload)
        } else {
            request.multipart(multipart_form(submission)?)
        };
        info!(
            %url,
            attachments = submission.attachments.len(),
            "submitting project request"
        );

        let response = request.send().await.map_err(|err| self.classify(err))?;
        let status = response.status();
        let body = response.text().await.map_err(|err| self.classify(err))?;

        if !status.is_success() {
            let api_error = serde_json::from_str::<ApiError>(&body).ok();
            warn!(status = status.as_u16(), "request backend rejected submission");
            return Err(SubmissionError::Status {
                status: status.as_u16(),
                code: api_error.as_ref().map(|e| e.code),
                message: api_error
                    .map(|e| e.message)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
            });
        }

        if body.trim().is_empty() {
            return Ok(SubmissionReceipt::default());
        }
        Ok(serde_json::from_str(&body).unwrap_or_else(|err| {
            debug!(error = %err, "unrecognised acknowledgement body");
            SubmissionReceipt::default()
        }))
    }
}

struct FormBuilder {
    form: Form,
    folded: Vec<String>,
}

impl FormBuilder {
    fn field(mut self, name: Option<&'static str>, label: &str, value: Option<String>) -> Self {
        let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
            return self;
        };
        match name {
            Some(name) => self.form = self.form.text(name, value),
            None => self.folded.push(format!("{label}: {value}")),
        }
        self
    }
}

/// Text fields named per profile, features as a JSON array string and every
/// file under the profile's attachment field.
pub fn multipart_form(submission: &Submission) -> Result<Form, SubmissionError> {
    let names = &submission.profile.fields;
    let p = &submission.payload;
    let contact = p.contact.clone().unwrap_or_default();

    let features = serde_json::Value::from(
        p.features.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
    )
    .to_string();
    let builder = FormBuilder {
        form: Form::new()
            .text("profile", p.profile.clone())
            .text(names.build_kind, p.build_kind.as_str())
            .text(names.features, features)
            .text(names.idea_summary, p.idea_summary.clone()),
        folded: Vec::new(),
    }
    .field(names.category, "Category", p.category.map(|c| c.as_str().to_string()))
    .field(names.category_other_note, "Category note", p.category_other_note.clone())
    .field(names.target_audience, "Target audience", p.target_audience.clone())
    .field(names.domain, "Domain", p.domain.clone())
    .field(
        names.has_hosting,
        "Has hosting",
        p.has_hosting.map(|h| h.to_string()),
    )
    .field(names.project_name, "Project name", p.project_name.clone())
    .field(names.budget, "Budget", p.budget.clone())
    .field(names.timeline, "Timeline", p.timeline.clone())
    .field(names.contact_name, "Name", Some(contact.name))
    .field(names.contact_email, "Email", Some(contact.email))
    .field(names.contact_phone, "Phone", Some(contact.phone))
    .field(names.contact_company, "Company", contact.company);

    let FormBuilder { mut form, folded } = builder;
    let notes: Vec<String> = p
        .additional_notes
        .iter()
        .cloned()
        .chain(folded)
        .collect();
    if !notes.is_empty() {
        form = form.text(names.notes, notes.join("\n\n"));
    }

    for attachment in &submission.attachments {
        let part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.clone())
            .mime_str(&attachment.mime_type)
            .map_err(|err| SubmissionError::Attachment {
                file_name: attachment.file_name.clone(),
                reason: err.to_string(),
            })?;
        form = form.part(names.attachments, part);
    }
    Ok(form)
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
