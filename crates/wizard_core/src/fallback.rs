//! Local preservation used when the backend cannot take a submission: a
//! durable draft plus a prefilled email.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use shared::{
    catalog,
    domain::{Answers, Locale},
    protocol::PersistedDraft,
};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{i18n::Translator, profile::WizardProfile};

/// Storage key of the draft written by a failed submission.
pub const DRAFT_KEY: &str = "project_request_draft";

pub trait DraftStore: Send + Sync {
    fn save(&self, key: &str, draft: &PersistedDraft) -> Result<()>;
    fn load(&self, key: &str) -> Result<Option<PersistedDraft>>;
    /// Returns whether a draft existed.
    fn clear(&self, key: &str) -> Result<bool>;
}

/// One JSON file per key under `dir`.
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            bail!("invalid draft key '{key}'");
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl DraftStore for FileDraftStore {
    fn save(&self, key: &str, draft: &PersistedDraft) -> Result<()> {
        let path = self.path_for(key)?;
        let data = serde_json::to_vec_pretty(draft).context("failed to encode draft")?;
        atomic_write(&path, &data)?;
        info!(path = %path.display(), "saved request draft");
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<PersistedDraft>> {
        let path = self.path_for(key)?;
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read draft '{}'", path.display()))
            }
        };
        let draft = serde_json::from_slice(&raw)
            .with_context(|| format!("draft '{}' is not valid JSON", path.display()))?;
        Ok(Some(draft))
    }

    fn clear(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove draft '{}'", path.display()))
            }
        }
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create draft directory '{}'", dir.display()))?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to persist draft '{}'", path.display()))?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailtoDraft {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl MailtoDraft {
    /// RFC 6068 URI: CRLF line breaks, spaces as `%20`. The address keeps
    /// its `@` but has every other reserved character escaped.
    pub fn to_uri(&self) -> String {
        format!(
            "mailto:{}?subject={}&body={}",
            encode_component(&self.to).replace("%40", "@"),
            encode_component(&self.subject),
            encode_component(&self.body)
        )
    }
}

fn encode_component(value: &str) -> String {
    let normalized = value.replace("\r\n", "\n").replace('\n', "\r\n");
    // byte_serialize escapes a literal '+' as %2B, so any remaining '+' is a space.
    url::form_urlencoded::byte_serialize(normalized.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

pub trait MailComposer: Send + Sync {
    fn compose(&self, draft: &MailtoDraft) -> Result<()>;
}

/// Hands the mailto URI to the desktop's default mail client.
pub struct SystemMailComposer;

impl MailComposer for SystemMailComposer {
    fn compose(&self, draft: &MailtoDraft) -> Result<()> {
        let uri = draft.to_uri();
        debug!(to = %draft.to, uri_len = uri.len(), "opening mail composer");
        open::that(&uri).context("failed to open the default mail client")
    }
}

/// Human-readable summary followed by the answers as JSON, so the request
/// can be recovered from the email alone.
pub fn summarize(
    profile: &WizardProfile,
    answers: &Answers,
    attachment_names: &[String],
    translator: &dyn Translator,
    locale: Locale,
) -> String {
    let mut lines = vec![format!("Request type: {}", profile.name)];
    if let Some(category) = answers.category {
        lines.push(format!("Category: {}", category.as_str()));
    }
    if !answers.category_other_note.trim().is_empty() {
        lines.push(format!("Category note: {}", answers.category_other_note.trim()));
    }
    if let Some(kind) = answers.build_kind {
        lines.push(format!("Build: {}", kind.as_str()));
    }
    if !answers.features.is_empty() {
        let labels: Vec<String> = catalog::available_features(answers.build_kind)
            .into_iter()
            .filter(|descriptor| answers.features.contains(&descriptor.id))
            .map(|descriptor| translator.text(locale, &descriptor.label_key, &descriptor.label))
            .collect();
        let listed = if labels.len() == answers.features.len() {
            labels.join(", ")
        } else {
            answers
                .features
                .iter()
                .map(|id| id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        lines.push(format!("Features: {listed}"));
    }
    lines.push(format!("Idea: {}", answers.idea_summary));

    let optional = [
        ("Project name", answers.project_name.as_deref()),
        ("Target audience", answers.target_audience.as_deref()),
        ("Domain", answers.domain.as_deref()),
        ("Budget", answers.budget.as_deref()),
        ("Timeline", answers.timeline.as_deref()),
        ("Notes", answers.additional_notes.as_deref()),
    ];
    lines.extend(
        optional
            .into_iter()
            .filter_map(|(label, value)| value.map(|v| format!("{label}: {v}"))),
    );
    if let Some(hosting) = answers.has_hosting {
        lines.push(format!("Has hosting: {}", if hosting { "yes" } else { "no" }));
    }

    let contact = &answers.contact;
    if !contact.name.trim().is_empty() {
        lines.push(format!("Name: {}", contact.name));
    }
    if !contact.email.trim().is_empty() {
        lines.push(format!("Email: {}", contact.email));
    }
    if !contact.phone.trim().is_empty() {
        lines.push(format!("Phone: {}", contact.phone));
    }
    if let Some(company) = &contact.company {
        lines.push(format!("Company: {company}"));
    }
    if !attachment_names.is_empty() {
        lines.push(format!(
            "Attachments (please attach to this email): {}",
            attachment_names.join(", ")
        ));
    }

    let json = serde_json::to_string(answers).unwrap_or_default();
    format!("{}\n\n---\n{json}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use shared::{
        domain::{BuildKind, Category, FeatureId},
        protocol::DRAFT_FORMAT_VERSION,
    };

    use super::*;
    use crate::{i18n::Catalog, profile::PROJECT_REQUEST};

    fn sample_answers() -> Answers {
        Answers {
            category: Some(Category::Educational),
            build_kind: Some(BuildKind::Platform),
            features: [FeatureId::new("admin_dashboard")].into_iter().collect(),
            idea_summary: "Course portal for 200 students & teachers".into(),
            budget: Some("5k+".into()),
            ..Answers::default()
        }
    }

    #[test]
    fn draft_store_round_trips_and_clears() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileDraftStore::new(dir.path().join("nested"));
        assert!(store.load(DRAFT_KEY).expect("load").is_none());

        let draft = PersistedDraft {
            version: DRAFT_FORMAT_VERSION,
            saved_at: Utc::now(),
            profile: "project_request".into(),
            answers: sample_answers(),
            attachment_names: vec!["brief.pdf".into()],
        };
        store.save(DRAFT_KEY, &draft).expect("save");
        assert!(dir.path().join("nested").join("project_request_draft.json").exists());
        assert_eq!(store.load(DRAFT_KEY).expect("load"), Some(draft));

        assert!(store.clear(DRAFT_KEY).expect("clear"));
        assert!(!store.clear(DRAFT_KEY).expect("clear again"));
    }

    #[test]
    fn draft_keys_cannot_escape_the_directory() {
        let store = FileDraftStore::new("/tmp/drafts");
        assert!(store.path_for("../etc/passwd").is_err());
        assert!(store.path_for("").is_err());
    }

    #[test]
    fn mailto_uri_uses_percent20_and_crlf() {
        let draft = MailtoDraft {
            to: "projects@agency.example".into(),
            subject: "New request + quote".into(),
            body: "line one\nline two".into(),
        };
        let uri = draft.to_uri();
        assert!(uri.starts_with("mailto:projects@agency.example?subject=New%20request%20%2B%20quote"));
        assert!(uri.ends_with("&body=line%20one%0D%0Aline%20two"));
    }

    #[test]
    fn mailto_uri_escapes_reserved_characters_in_address() {
        let draft = MailtoDraft {
            to: "sales&ops?x@agency.example".into(),
            subject: "Hi".into(),
            body: String::new(),
        };
        assert_eq!(
            draft.to_uri(),
            "mailto:sales%26ops%3Fx@agency.example?subject=Hi&body="
        );
    }

    #[test]
    fn summary_lists_answers_and_embeds_json() {
        let answers = sample_answers();
        let body = summarize(
            &PROJECT_REQUEST,
            &answers,
            &["brief.pdf".to_string()],
            &Catalog::empty(),
            Locale::En,
        );
        assert!(body.contains("Category: educational"));
        assert!(body.contains("Features: Admin Dashboard"));
        assert!(body.contains("Budget: 5k+"));
        assert!(body.contains("brief.pdf"));

        let json = body.rsplit("---\n").next().expect("json section");
        let decoded: Answers = serde_json::from_str(json).expect("answers json");
        assert_eq!(decoded, answers);
    }
}
