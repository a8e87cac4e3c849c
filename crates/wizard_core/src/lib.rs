pub mod attachments;
pub mod backend;
pub mod config;
pub mod controller;
pub mod fallback;
pub mod fields;
pub mod i18n;
pub mod notify;
pub mod profile;
pub mod validation;

pub use attachments::{AttachmentBatch, IncomingFile, PreviewStore, StagedAttachmentInfo};
pub use backend::{HttpSubmissionBackend, SubmissionBackend, SubmissionError};
pub use config::{load_settings, Settings};
pub use controller::{
    Collaborators, FallbackReport, SubmitOutcome, WizardController, WizardError, WizardOptions,
};
pub use fallback::{DraftStore, MailComposer, MailtoDraft, DRAFT_KEY};
pub use fields::FieldUpdate;
pub use i18n::{Catalog, Translator};
pub use notify::Notifier;
pub use profile::{ProfileKind, StepKind, WizardProfile};
pub use validation::ValidationError;
