//! The request wizard: one linear form session plus the collaborators it
//! reports to.
//!
//! The controller never talks to a view directly. Views read state through
//! the accessors, write through [`WizardController::set_field`] and receive
//! feedback through the injected [`Notifier`].

use std::sync::Arc;

use chrono::Utc;
use shared::{
    catalog::{self, FeatureDescriptor},
    domain::{
        Answers, Category, FeatureId, Locale, Notification, NotificationKind, SubmissionState,
    },
    error::{FileRejectedError, RejectReason},
    protocol::{
        OutgoingAttachment, PersistedDraft, SubmissionPayload, SubmissionReceipt,
        DRAFT_FORMAT_VERSION,
    },
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    attachments::{
        check_file, AttachmentBatch, IncomingFile, MemoryPreviewStore, PreviewHandle,
        PreviewStore, StagedAttachment, StagedAttachmentInfo, MAX_ATTACHMENTS,
        MAX_ATTACHMENT_BYTES,
    },
    backend::{HttpSubmissionBackend, Submission, SubmissionBackend, SubmissionError},
    config::{prepare_draft_dir, Settings},
    fallback::{
        summarize, DraftStore, FileDraftStore, MailComposer, MailtoDraft, SystemMailComposer,
        DRAFT_KEY,
    },
    fields::FieldUpdate,
    i18n::{fill, Catalog, Translator},
    notify::{Notifier, TracingNotifier},
    profile::{ProfileKind, StepKind, WizardProfile},
    validation::{validate_all, validate_step, ValidationError},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("step {step} is incomplete: {source}")]
    Validation {
        step: usize,
        #[source]
        source: ValidationError,
    },
    #[error("cannot stage {incoming} more file(s): {staged} already staged, limit is {max}")]
    TooManyFiles {
        staged: usize,
        incoming: usize,
        max: usize,
    },
    #[error("attachment index {index} is out of range ({len} staged)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("submission is only possible from the review step (at step {step} of {last})")]
    NotAtReview { step: usize, last: usize },
    #[error("a submission is already in flight")]
    SubmissionInFlight,
}

/// What happened to a submission the backend did not accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackReport {
    pub error: SubmissionError,
    pub draft_saved: bool,
    pub mail_opened: bool,
    pub mailto: MailtoDraft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(SubmissionReceipt),
    PreservedLocally(FallbackReport),
}

#[derive(Debug, Clone)]
pub struct WizardOptions {
    pub profile: ProfileKind,
    pub locale: Locale,
    pub fallback_email: String,
}

impl WizardOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            profile: settings.profile,
            locale: settings.locale,
            fallback_email: settings.fallback_email.clone(),
        }
    }
}

#[derive(Clone)]
pub struct Collaborators {
    pub backend: Arc<dyn SubmissionBackend>,
    pub drafts: Arc<dyn DraftStore>,
    pub mail: Arc<dyn MailComposer>,
    pub notifier: Arc<dyn Notifier>,
    pub previews: Arc<dyn PreviewStore>,
    pub translator: Arc<dyn Translator>,
}

impl Collaborators {
    /// Production wiring: HTTP backend, file drafts, the system mail client
    /// and log-only notifications.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let backend = HttpSubmissionBackend::new(&settings.base_url, settings.submit_timeout())?;
        let draft_dir = prepare_draft_dir(&settings.draft_dir)?;

        let translations = Catalog::with_overrides(settings.translations_path.as_deref())?;

        Ok(Self {
            backend: Arc::new(backend),
            drafts: Arc::new(FileDraftStore::new(draft_dir)),
            mail: Arc::new(SystemMailComposer),
            notifier: Arc::new(TracingNotifier),
            previews: Arc::new(MemoryPreviewStore::new()),
            translator: Arc::new(translations),
        })
    }
}

#[derive(Debug)]
pub struct WizardSession {
    current_step: usize,
    answers: Answers,
    attachments: Vec<StagedAttachment>,
    submission_state: SubmissionState,
}

impl WizardSession {
    fn new() -> Self {
        Self {
            current_step: 1,
            answers: Answers::default(),
            attachments: Vec::new(),
            submission_state: SubmissionState::Idle,
        }
    }

    fn release_attachments(&mut self) -> usize {
        let released = self.attachments.len();
        for attachment in self.attachments.drain(..) {
            attachment.preview.release();
        }
        released
    }
}

pub struct WizardController {
    profile: &'static WizardProfile,
    locale: Locale,
    fallback_email: String,
    deps: Collaborators,
    session: WizardSession,
}

impl WizardController {
    pub fn open(options: WizardOptions, deps: Collaborators) -> Self {
        let profile = options.profile.profile();
        info!(
            profile = profile.name,
            steps = profile.step_count(),
            locale = options.locale.code(),
            "opened request wizard"
        );
        Self {
            profile,
            locale: options.locale,
            fallback_email: options.fallback_email,
            deps,
            session: WizardSession::new(),
        }
    }

    /// Starts over with a fresh session, releasing anything still staged.
    pub fn reopen(&mut self) {
        let released = self.session.release_attachments();
        self.session = WizardSession::new();
        debug!(profile = self.profile.name, released, "reset request wizard");
    }

    pub fn close(mut self) {
        let released = self.session.release_attachments();
        info!(profile = self.profile.name, released, "closed request wizard");
    }

    pub fn profile(&self) -> &'static WizardProfile {
        self.profile
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    pub fn current_step(&self) -> usize {
        self.session.current_step
    }

    pub fn step_count(&self) -> usize {
        self.profile.step_count()
    }

    pub fn current_step_kind(&self) -> StepKind {
        self.profile.steps[self.session.current_step - 1]
    }

    pub fn step_title(&self, kind: StepKind) -> String {
        self.deps
            .translator
            .text(self.locale, kind.title_key(), kind.title())
    }

    pub fn answers(&self) -> &Answers {
        &self.session.answers
    }

    pub fn attachments(&self) -> Vec<StagedAttachmentInfo> {
        self.session.attachments.iter().map(|a| a.info()).collect()
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.session.submission_state
    }

    /// Feature choices for the current build kind with labels in the active
    /// locale.
    pub fn available_features(&self) -> Vec<FeatureDescriptor> {
        catalog::available_features(self.session.answers.build_kind)
            .into_iter()
            .map(|mut descriptor| {
                descriptor.label =
                    self.deps
                        .translator
                        .text(self.locale, &descriptor.label_key, &descriptor.label);
                descriptor
            })
            .collect()
    }

    /// Whether the current step would let `go_next` through. Emits nothing.
    pub fn check_current_step(&self) -> Result<(), ValidationError> {
        validate_step(self.profile, self.session.current_step, &self.session.answers)
    }

    pub fn go_next(&mut self) -> Result<usize, WizardError> {
        let step = self.session.current_step;
        if let Err(source) = self.check_current_step() {
            warn!(
                profile = self.profile.name,
                step,
                field = source.field(),
                "step transition blocked"
            );
            self.notify_validation(&source);
            return Err(WizardError::Validation { step, source });
        }
        if step < self.step_count() {
            self.session.current_step = step + 1;
            info!(profile = self.profile.name, from = step, to = step + 1, "advanced wizard step");
        }
        Ok(self.session.current_step)
    }

    pub fn go_prev(&mut self) -> usize {
        let step = self.session.current_step;
        if step > 1 {
            self.session.current_step = step - 1;
            debug!(profile = self.profile.name, from = step, to = step - 1, "went back a step");
        }
        self.session.current_step
    }

    pub fn set_field(&mut self, update: FieldUpdate) {
        debug!(?update, "field updated");
        update.apply(&mut self.session.answers);
    }

    pub fn select_feature(&mut self, feature: FeatureId) {
        self.session.answers.features.insert(feature);
    }

    pub fn deselect_feature(&mut self, feature: &FeatureId) {
        self.session.answers.features.remove(feature);
    }

    /// Replaces every answer at once, e.g. from a restored draft.
    pub fn prefill(&mut self, answers: Answers) {
        self.session.answers = answers;
    }

    /// Stages a batch. A batch that would exceed the attachment limit is
    /// refused as a whole; otherwise each file is accepted or rejected on its
    /// own.
    pub fn add_attachments(
        &mut self,
        files: Vec<IncomingFile>,
    ) -> Result<AttachmentBatch, WizardError> {
        let staged = self.session.attachments.len();
        if staged + files.len() > MAX_ATTACHMENTS {
            warn!(staged, incoming = files.len(), "attachment batch exceeds limit");
            self.notify(
                NotificationKind::Warning,
                ("attachments.too_many_title", "Too many files"),
                ("attachments.too_many", "You can attach up to {max} files"),
                &[("max", MAX_ATTACHMENTS.to_string())],
            );
            return Err(WizardError::TooManyFiles {
                staged,
                incoming: files.len(),
                max: MAX_ATTACHMENTS,
            });
        }

        let mut batch = AttachmentBatch::default();
        for file in files {
            if let Err(rejection) = check_file(&file) {
                warn!(file = %rejection.file_name, reason = ?rejection.reason, "attachment rejected");
                self.notify_rejection(&rejection);
                batch.rejected.push(rejection);
                continue;
            }
            let IncomingFile {
                file_name,
                size_bytes,
                mime_type,
                source,
            } = file;
            let preview = PreviewHandle::acquire(self.deps.previews.clone(), &file_name, source);
            let attachment = StagedAttachment {
                file_name,
                size_bytes,
                mime_type,
                preview,
            };
            batch.accepted.push(attachment.info());
            self.session.attachments.push(attachment);
        }
        info!(
            accepted = batch.accepted.len(),
            rejected = batch.rejected.len(),
            staged = self.session.attachments.len(),
            "processed attachment batch"
        );
        Ok(batch)
    }

    pub fn remove_attachment(&mut self, index: usize) -> Result<StagedAttachmentInfo, WizardError> {
        let len = self.session.attachments.len();
        if index >= len {
            return Err(WizardError::IndexOutOfRange { index, len });
        }
        let attachment = self.session.attachments.remove(index);
        let info = attachment.info();
        attachment.preview.release();
        debug!(file = %info.file_name, remaining = len - 1, "removed attachment");
        Ok(info)
    }

    /// Sends the request. Backend failures are not errors here: they end in
    /// [`SubmitOutcome::PreservedLocally`] after the fallback path ran.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, WizardError> {
        let payload = self.begin_submission()?;
        let mut guard = InFlight {
            wizard: self,
            armed: true,
        };
        let result = match guard.wizard.build_submission(payload).await {
            Ok(submission) => guard.wizard.deps.backend.submit(&submission).await,
            Err(err) => Err(err),
        };
        guard.armed = false;
        Ok(guard.wizard.finish_submission(result))
    }

    pub(crate) fn begin_submission(&mut self) -> Result<SubmissionPayload, WizardError> {
        if self.session.submission_state == SubmissionState::Submitting {
            warn!(profile = self.profile.name, "submit ignored, request already in flight");
            return Err(WizardError::SubmissionInFlight);
        }
        let step = self.session.current_step;
        let last = self.step_count();
        if step != last {
            return Err(WizardError::NotAtReview { step, last });
        }
        if let Err((step, source)) = validate_all(self.profile, &self.session.answers) {
            warn!(
                profile = self.profile.name,
                step,
                field = source.field(),
                "submission blocked by validation"
            );
            self.notify_validation(&source);
            return Err(WizardError::Validation { step, source });
        }
        let payload = build_payload(self.profile, &self.session.answers)
            .map_err(|source| WizardError::Validation { step: 1, source })?;
        self.session.submission_state = SubmissionState::Submitting;
        Ok(payload)
    }

    async fn build_submission(
        &self,
        payload: SubmissionPayload,
    ) -> Result<Submission, SubmissionError> {
        let mut attachments = Vec::with_capacity(self.session.attachments.len());
        for staged in &self.session.attachments {
            let source = staged
                .preview
                .resolve()
                .ok_or_else(|| SubmissionError::Attachment {
                    file_name: staged.file_name.clone(),
                    reason: "preview is no longer available".into(),
                })?;
            let bytes = source
                .read()
                .await
                .map_err(|err| SubmissionError::Attachment {
                    file_name: staged.file_name.clone(),
                    reason: format!("{err:#}"),
                })?;
            if bytes.len() as u64 > MAX_ATTACHMENT_BYTES {
                return Err(SubmissionError::Attachment {
                    file_name: staged.file_name.clone(),
                    reason: format!(
                        "file grew to {} bytes after it was attached, limit is {MAX_ATTACHMENT_BYTES}",
                        bytes.len()
                    ),
                });
            }
            attachments.push(OutgoingAttachment {
                file_name: staged.file_name.clone(),
                mime_type: staged.mime_type.clone(),
                bytes,
            });
        }
        Ok(Submission {
            profile: self.profile,
            payload,
            attachments,
        })
    }

    pub(crate) fn finish_submission(
        &mut self,
        result: Result<SubmissionReceipt, SubmissionError>,
    ) -> SubmitOutcome {
        match result {
            Ok(receipt) => {
                info!(
                    profile = self.profile.name,
                    receipt_id = receipt.id.as_deref().unwrap_or("-"),
                    "request submitted"
                );
                self.session.submission_state = SubmissionState::Succeeded;
                self.notify(
                    NotificationKind::Success,
                    ("submit.success_title", "Request submitted successfully"),
                    (
                        "submit.success",
                        "We will contact you soon to discuss the project details",
                    ),
                    &[],
                );
                self.reopen();
                SubmitOutcome::Submitted(receipt)
            }
            Err(err) => {
                error!(
                    profile = self.profile.name,
                    error = %err,
                    "submission failed, preserving request locally"
                );
                self.session.submission_state = SubmissionState::Failed;
                SubmitOutcome::PreservedLocally(self.preserve_locally(err))
            }
        }
    }

    /// Leaves `Submitting` when a submit future is dropped before the
    /// backend answered. The answers go through the fallback path so a
    /// retry or a restored draft can pick them up.
    fn abandon_submission(&mut self) {
        if self.session.submission_state != SubmissionState::Submitting {
            return;
        }
        warn!(
            profile = self.profile.name,
            "submission cancelled, preserving request locally"
        );
        self.session.submission_state = SubmissionState::Failed;
        self.preserve_locally(SubmissionError::Cancelled);
    }

    fn preserve_locally(&self, error: SubmissionError) -> FallbackReport {
        let attachment_names: Vec<String> = self
            .session
            .attachments
            .iter()
            .map(|a| a.file_name.clone())
            .collect();

        let draft = PersistedDraft {
            version: DRAFT_FORMAT_VERSION,
            saved_at: Utc::now(),
            profile: self.profile.name.to_string(),
            answers: self.session.answers.clone(),
            attachment_names: attachment_names.clone(),
        };
        let draft_saved = match self.deps.drafts.save(DRAFT_KEY, &draft) {
            Ok(()) => true,
            Err(err) => {
                error!(key = DRAFT_KEY, error = %format!("{err:#}"), "failed to save request draft");
                false
            }
        };

        let mailto = self.mailto_draft(&attachment_names);
        let mail_opened = match self.deps.mail.compose(&mailto) {
            Ok(()) => true,
            Err(err) => {
                error!(to = %mailto.to, error = %format!("{err:#}"), "failed to open mail draft");
                false
            }
        };

        let message = if draft_saved && mail_opened {
            (
                "submit.fallback",
                "Your answers were saved on this device and an email draft was opened so you can send them manually",
            )
        } else {
            (
                "submit.fallback_incomplete",
                "Sending failed. Your answers are still in the form, please try again",
            )
        };
        self.notify(
            NotificationKind::Error,
            ("submit.fallback_title", "Request could not be sent"),
            message,
            &[],
        );
        info!(draft_saved, mail_opened, "fallback path finished");

        FallbackReport {
            error,
            draft_saved,
            mail_opened,
            mailto,
        }
    }

    fn mailto_draft(&self, attachment_names: &[String]) -> MailtoDraft {
        let mut subject =
            self.deps
                .translator
                .text(self.locale, "mail.subject", "New project request");
        if let Some(name) = self.session.answers.project_name.as_deref() {
            subject = format!("{subject} - {name}");
        }
        MailtoDraft {
            to: self.fallback_email.clone(),
            subject,
            body: summarize(
                self.profile,
                &self.session.answers,
                attachment_names,
                self.deps.translator.as_ref(),
                self.locale,
            ),
        }
    }

    /// Prefills answers from the draft a failed submission left behind.
    /// Drafts written by another profile are left alone.
    pub fn restore_draft(&mut self) -> anyhow::Result<bool> {
        let Some(draft) = self.deps.drafts.load(DRAFT_KEY)? else {
            return Ok(false);
        };
        if draft.profile != self.profile.name {
            warn!(
                draft_profile = %draft.profile,
                profile = self.profile.name,
                "ignoring draft saved by another wizard"
            );
            return Ok(false);
        }
        info!(saved_at = %draft.saved_at, "restored request draft");
        self.session.answers = draft.answers;
        Ok(true)
    }

    pub fn discard_draft(&self) -> anyhow::Result<bool> {
        self.deps.drafts.clear(DRAFT_KEY)
    }

    fn notify(
        &self,
        kind: NotificationKind,
        title: (&str, &str),
        message: (&str, &str),
        args: &[(&str, String)],
    ) {
        let translator = &self.deps.translator;
        let title = translator.text(self.locale, title.0, title.1);
        let message = fill(&translator.text(self.locale, message.0, message.1), args);
        self.deps
            .notifier
            .notify(Notification::new(kind, title, message));
    }

    fn notify_validation(&self, err: &ValidationError) {
        let fallback = err.to_string();
        self.notify(
            NotificationKind::Warning,
            ("wizard.step_blocked", "Please complete this step"),
            (err.message_key(), fallback.as_str()),
            &err.args(),
        );
    }

    fn notify_rejection(&self, rejection: &FileRejectedError) {
        let file = ("file", rejection.file_name.clone());
        let (message, args) = match rejection.reason {
            RejectReason::TooLarge { .. } => (
                ("attachments.too_large", "{file} is larger than {max_mb} MB"),
                vec![file, ("max_mb", (MAX_ATTACHMENT_BYTES / (1024 * 1024)).to_string())],
            ),
            RejectReason::UnsupportedType => (
                ("attachments.unsupported", "{file} has an unsupported file type"),
                vec![file],
            ),
        };
        self.notify(
            NotificationKind::Warning,
            ("attachments.rejected_title", "File rejected"),
            message,
            &args,
        );
    }
}

/// Held across the awaits in [`WizardController::submit`]. Dropping it while
/// still armed means the submit future itself was dropped.
struct InFlight<'a> {
    wizard: &'a mut WizardController,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.wizard.abandon_submission();
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Builds the outbound payload. Only called on answers that passed
/// `validate_all`.
fn build_payload(
    profile: &WizardProfile,
    answers: &Answers,
) -> Result<SubmissionPayload, ValidationError> {
    let build_kind = answers
        .build_kind
        .ok_or(ValidationError::MissingBuildKind)?;
    let note = answers.category_other_note.trim();
    let contact = &answers.contact;
    let has_contact = !contact.name.trim().is_empty()
        || !contact.email.trim().is_empty()
        || !contact.phone.trim().is_empty()
        || contact.company.is_some();

    Ok(SubmissionPayload {
        profile: profile.name.to_string(),
        category: answers.category,
        category_other_note: (answers.category == Some(Category::Other) && !note.is_empty())
            .then(|| note.to_string()),
        build_kind,
        features: answers.features.iter().cloned().collect(),
        idea_summary: answers.idea_summary.clone(),
        target_audience: non_blank(&answers.target_audience),
        domain: non_blank(&answers.domain),
        has_hosting: answers.has_hosting,
        project_name: non_blank(&answers.project_name),
        budget: non_blank(&answers.budget),
        timeline: non_blank(&answers.timeline),
        additional_notes: non_blank(&answers.additional_notes),
        contact: has_contact.then(|| contact.clone()),
    })
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
