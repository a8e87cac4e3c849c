use std::collections::BTreeSet;

use shared::domain::{Answers, BuildKind, Category, FeatureId};
use thiserror::Error;

/// A single typed write into [`Answers`]. Applying the same update twice
/// leaves the answers exactly as applying it once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Category(Option<Category>),
    CategoryOtherNote(String),
    BuildKind(Option<BuildKind>),
    Features(BTreeSet<FeatureId>),
    IdeaSummary(String),
    TargetAudience(Option<String>),
    Domain(Option<String>),
    HasHosting(Option<bool>),
    ProjectName(Option<String>),
    Budget(Option<String>),
    Timeline(Option<String>),
    AdditionalNotes(Option<String>),
    ContactName(String),
    ContactEmail(String),
    ContactPhone(String),
    ContactCompany(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldParseError {
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl FieldUpdate {
    /// Parses a `name=value` style assignment. Field names are accepted in
    /// camelCase, snake_case or kebab-case; an empty value clears optional
    /// fields.
    pub fn parse(name: &str, raw: &str) -> Result<Self, FieldParseError> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != '.')
            .collect::<String>()
            .to_ascii_lowercase();
        let invalid = |reason: String| FieldParseError::InvalidValue {
            field: name.to_string(),
            reason,
        };

        let update = match normalized.as_str() {
            "category" => FieldUpdate::Category(
                optional(raw).map(|v| v.parse()).transpose().map_err(invalid)?,
            ),
            "categoryothernote" => FieldUpdate::CategoryOtherNote(raw.to_string()),
            "buildkind" => FieldUpdate::BuildKind(
                optional(raw).map(|v| v.parse()).transpose().map_err(invalid)?,
            ),
            "features" => FieldUpdate::Features(
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(FeatureId::new)
                    .collect(),
            ),
            "ideasummary" => FieldUpdate::IdeaSummary(raw.to_string()),
            "targetaudience" => FieldUpdate::TargetAudience(optional(raw)),
            "domain" => FieldUpdate::Domain(optional(raw)),
            "hashosting" => FieldUpdate::HasHosting(
                optional(raw).map(|v| parse_bool(&v)).transpose().map_err(invalid)?,
            ),
            "projectname" => FieldUpdate::ProjectName(optional(raw)),
            "budget" => FieldUpdate::Budget(optional(raw)),
            "timeline" => FieldUpdate::Timeline(optional(raw)),
            "additionalnotes" | "notes" => FieldUpdate::AdditionalNotes(optional(raw)),
            "contactname" | "name" => FieldUpdate::ContactName(raw.to_string()),
            "contactemail" | "email" => FieldUpdate::ContactEmail(raw.to_string()),
            "contactphone" | "phone" => FieldUpdate::ContactPhone(raw.to_string()),
            "contactcompany" | "company" => FieldUpdate::ContactCompany(optional(raw)),
            _ => return Err(FieldParseError::UnknownField(name.to_string())),
        };
        Ok(update)
    }

    pub fn apply(self, answers: &mut Answers) {
        match self {
            FieldUpdate::Category(v) => answers.category = v,
            FieldUpdate::CategoryOtherNote(v) => answers.category_other_note = v,
            FieldUpdate::BuildKind(v) => answers.build_kind = v,
            FieldUpdate::Features(v) => answers.features = v,
            FieldUpdate::IdeaSummary(v) => answers.idea_summary = v,
            FieldUpdate::TargetAudience(v) => answers.target_audience = v,
            FieldUpdate::Domain(v) => answers.domain = v,
            FieldUpdate::HasHosting(v) => answers.has_hosting = v,
            FieldUpdate::ProjectName(v) => answers.project_name = v,
            FieldUpdate::Budget(v) => answers.budget = v,
            FieldUpdate::Timeline(v) => answers.timeline = v,
            FieldUpdate::AdditionalNotes(v) => answers.additional_notes = v,
            FieldUpdate::ContactName(v) => answers.contact.name = v,
            FieldUpdate::ContactEmail(v) => answers.contact.email = v,
            FieldUpdate::ContactPhone(v) => answers.contact.phone = v,
            FieldUpdate::ContactCompany(v) => answers.contact.company = v,
        }
    }
}

fn optional(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        other => Err(format!("expected yes/no, got '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_in_any_case_style() {
        assert_eq!(
            FieldUpdate::parse("build_kind", "Ecommerce"),
            Ok(FieldUpdate::BuildKind(Some(BuildKind::Ecommerce)))
        );
        assert_eq!(
            FieldUpdate::parse("categoryOtherNote", "charity"),
            Ok(FieldUpdate::CategoryOtherNote("charity".into()))
        );
        assert_eq!(
            FieldUpdate::parse("has-hosting", "yes"),
            Ok(FieldUpdate::HasHosting(Some(true)))
        );
        assert_eq!(
            FieldUpdate::parse("contact.email", "a@b.c"),
            Ok(FieldUpdate::ContactEmail("a@b.c".into()))
        );
    }

    #[test]
    fn empty_value_clears_optional_fields() {
        assert_eq!(FieldUpdate::parse("domain", " "), Ok(FieldUpdate::Domain(None)));
        assert_eq!(FieldUpdate::parse("category", ""), Ok(FieldUpdate::Category(None)));
    }

    #[test]
    fn rejects_unknown_fields_and_bad_values() {
        assert_eq!(
            FieldUpdate::parse("colour", "blue"),
            Err(FieldParseError::UnknownField("colour".into()))
        );
        assert!(matches!(
            FieldUpdate::parse("category", "government"),
            Err(FieldParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            FieldUpdate::parse("hasHosting", "maybe"),
            Err(FieldParseError::InvalidValue { .. })
        ));
    }

    #[test]
    fn feature_list_is_deduplicated() {
        let update = FieldUpdate::parse("features", "seo_optimization, cms_system,seo_optimization")
            .expect("parse");
        let FieldUpdate::Features(features) = update else {
            panic!("expected features update");
        };
        assert_eq!(features.len(), 2);
    }

    #[test]
    fn applying_twice_equals_applying_once() {
        let update = FieldUpdate::parse("features", "seo_optimization,cms_system").expect("parse");
        let mut once = Answers::default();
        update.clone().apply(&mut once);
        let mut twice = Answers::default();
        update.clone().apply(&mut twice);
        update.apply(&mut twice);
        assert_eq!(once, twice);
    }
}
