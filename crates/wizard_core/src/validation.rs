//! Per-step validity predicates. Evaluated only on transitions and at
//! submission; field updates never validate.

use shared::{
    catalog,
    domain::{Answers, Category, FeatureId},
};
use thiserror::Error;

use crate::profile::{StepKind, WizardProfile};

pub const MIN_IDEA_SUMMARY_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("choose a project category")]
    MissingCategory,
    #[error("describe your project category")]
    MissingCategoryNote,
    #[error("choose what you want to build")]
    MissingBuildKind,
    #[error("select at least one feature")]
    NoFeatures,
    #[error("feature '{0}' is not available for the selected build kind")]
    UnavailableFeature(FeatureId),
    #[error("idea summary must be at least {min} characters (currently {actual})")]
    IdeaSummaryTooShort { actual: usize, min: usize },
    #[error("enter your name")]
    MissingContactName,
    #[error("enter a valid email address")]
    InvalidContactEmail,
    #[error("enter a phone number")]
    MissingContactPhone,
}

impl ValidationError {
    /// Answers field to highlight.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingCategory => "category",
            ValidationError::MissingCategoryNote => "categoryOtherNote",
            ValidationError::MissingBuildKind => "buildKind",
            ValidationError::NoFeatures | ValidationError::UnavailableFeature(_) => "features",
            ValidationError::IdeaSummaryTooShort { .. } => "ideaSummary",
            ValidationError::MissingContactName => "contact.name",
            ValidationError::InvalidContactEmail => "contact.email",
            ValidationError::MissingContactPhone => "contact.phone",
        }
    }

    pub fn message_key(&self) -> &'static str {
        match self {
            ValidationError::MissingCategory => "validation.missing_category",
            ValidationError::MissingCategoryNote => "validation.missing_category_note",
            ValidationError::MissingBuildKind => "validation.missing_build_kind",
            ValidationError::NoFeatures => "validation.no_features",
            ValidationError::UnavailableFeature(_) => "validation.unavailable_feature",
            ValidationError::IdeaSummaryTooShort { .. } => "validation.idea_too_short",
            ValidationError::MissingContactName => "validation.missing_contact_name",
            ValidationError::InvalidContactEmail => "validation.invalid_contact_email",
            ValidationError::MissingContactPhone => "validation.missing_contact_phone",
        }
    }

    /// Values substituted into a translated message template.
    pub fn args(&self) -> Vec<(&'static str, String)> {
        match self {
            ValidationError::UnavailableFeature(feature) => vec![("feature", feature.to_string())],
            ValidationError::IdeaSummaryTooShort { actual, min } => {
                vec![("actual", actual.to_string()), ("min", min.to_string())]
            }
            _ => Vec::new(),
        }
    }
}

/// Validates 1-based `step` of `profile`. Steps outside the profile have no
/// predicate.
pub fn validate_step(
    profile: &WizardProfile,
    step: usize,
    answers: &Answers,
) -> Result<(), ValidationError> {
    match profile.step_kind(step) {
        Some(kind) => validate_kind(profile, kind, answers),
        None => Ok(()),
    }
}

pub fn validate_kind(
    profile: &WizardProfile,
    kind: StepKind,
    answers: &Answers,
) -> Result<(), ValidationError> {
    match kind {
        StepKind::Classification => validate_classification(profile, answers),
        StepKind::Features => validate_features(answers),
        StepKind::Details => validate_details(answers),
        StepKind::Contact => validate_contact(answers),
        StepKind::Review => profile
            .steps
            .iter()
            .filter(|k| **k != StepKind::Review)
            .try_for_each(|k| validate_kind(profile, *k, answers)),
    }
}

/// Full-form check used before submission. Reports the first failing step.
pub fn validate_all(
    profile: &WizardProfile,
    answers: &Answers,
) -> Result<(), (usize, ValidationError)> {
    (1..=profile.step_count()).try_for_each(|step| {
        validate_step(profile, step, answers).map_err(|err| (step, err))
    })
}

fn validate_classification(
    profile: &WizardProfile,
    answers: &Answers,
) -> Result<(), ValidationError> {
    match answers.category {
        None if profile.requires_category => return Err(ValidationError::MissingCategory),
        Some(Category::Other) if answers.category_other_note.trim().is_empty() => {
            return Err(ValidationError::MissingCategoryNote)
        }
        _ => {}
    }
    if answers.build_kind.is_none() {
        return Err(ValidationError::MissingBuildKind);
    }
    Ok(())
}

fn validate_features(answers: &Answers) -> Result<(), ValidationError> {
    if answers.features.is_empty() {
        return Err(ValidationError::NoFeatures);
    }
    if let Some(stale) = answers
        .features
        .iter()
        .find(|feature| !catalog::is_available(feature, answers.build_kind))
    {
        return Err(ValidationError::UnavailableFeature(stale.clone()));
    }
    Ok(())
}

fn validate_details(answers: &Answers) -> Result<(), ValidationError> {
    // Counted untrimmed, in characters rather than bytes.
    let actual = answers.idea_summary.chars().count();
    if actual < MIN_IDEA_SUMMARY_CHARS {
        return Err(ValidationError::IdeaSummaryTooShort {
            actual,
            min: MIN_IDEA_SUMMARY_CHARS,
        });
    }
    Ok(())
}

fn validate_contact(answers: &Answers) -> Result<(), ValidationError> {
    let contact = &answers.contact;
    if contact.name.trim().is_empty() {
        return Err(ValidationError::MissingContactName);
    }
    if !looks_like_email(contact.email.trim()) {
        return Err(ValidationError::InvalidContactEmail);
    }
    if contact.phone.trim().is_empty() {
        return Err(ValidationError::MissingContactPhone);
    }
    Ok(())
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !value.contains(' ')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use shared::domain::BuildKind;

    use super::*;
    use crate::profile::{PROJECT_REQUEST, WEB_DEVELOPMENT};

    fn valid_answers() -> Answers {
        Answers {
            category: Some(Category::Commercial),
            build_kind: Some(BuildKind::Website),
            features: [FeatureId::new("seo_optimization")].into_iter().collect(),
            idea_summary: "An online booking site for a dental clinic".into(),
            ..Answers::default()
        }
    }

    #[test]
    fn other_category_requires_a_non_blank_note() {
        let mut answers = valid_answers();
        answers.category = Some(Category::Other);
        answers.category_other_note = "   ".into();
        assert_eq!(
            validate_step(&PROJECT_REQUEST, 1, &answers),
            Err(ValidationError::MissingCategoryNote)
        );

        answers.category_other_note = "non-profit".into();
        assert_eq!(validate_step(&PROJECT_REQUEST, 1, &answers), Ok(()));
    }

    #[test]
    fn idea_length_counts_whitespace_and_characters() {
        let mut answers = valid_answers();
        answers.idea_summary = format!("  {}  ", "a".repeat(16));
        assert_eq!(answers.idea_summary.chars().count(), 20);
        assert_eq!(validate_step(&PROJECT_REQUEST, 3, &answers), Ok(()));

        // 19 Arabic letters is 38 bytes but still too short.
        answers.idea_summary = "م".repeat(19);
        assert_eq!(
            validate_step(&PROJECT_REQUEST, 3, &answers),
            Err(ValidationError::IdeaSummaryTooShort { actual: 19, min: 20 })
        );
    }

    #[test]
    fn features_must_match_current_build_kind() {
        let mut answers = valid_answers();
        answers.features.insert(FeatureId::new("shopping_cart"));
        assert_eq!(
            validate_step(&PROJECT_REQUEST, 2, &answers),
            Err(ValidationError::UnavailableFeature(FeatureId::new("shopping_cart")))
        );

        answers.build_kind = Some(BuildKind::Ecommerce);
        assert_eq!(validate_step(&PROJECT_REQUEST, 2, &answers), Ok(()));
    }

    #[test]
    fn review_is_the_conjunction_of_prior_steps() {
        let mut answers = valid_answers();
        assert_eq!(validate_step(&PROJECT_REQUEST, 4, &answers), Ok(()));

        answers.features.clear();
        assert_eq!(
            validate_step(&PROJECT_REQUEST, 4, &answers),
            Err(ValidationError::NoFeatures)
        );
        assert_eq!(
            validate_all(&PROJECT_REQUEST, &answers),
            Err((2, ValidationError::NoFeatures))
        );
    }

    #[test]
    fn web_development_needs_contact_but_not_category() {
        let mut answers = valid_answers();
        answers.category = None;
        assert_eq!(validate_step(&WEB_DEVELOPMENT, 1, &answers), Ok(()));
        assert_eq!(
            validate_step(&WEB_DEVELOPMENT, 4, &answers),
            Err(ValidationError::MissingContactName)
        );

        answers.contact.name = "Sara".into();
        answers.contact.email = "sara@".into();
        assert_eq!(
            validate_step(&WEB_DEVELOPMENT, 4, &answers),
            Err(ValidationError::InvalidContactEmail)
        );

        answers.contact.email = "sara@example.com".into();
        answers.contact.phone = "+966 500 000 000".into();
        assert_eq!(validate_all(&WEB_DEVELOPMENT, &answers), Ok(()));
    }

    #[test]
    fn steps_outside_the_profile_have_no_predicate() {
        assert_eq!(validate_step(&PROJECT_REQUEST, 9, &Answers::default()), Ok(()));
    }
}
