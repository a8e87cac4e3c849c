//! Wizard variants. Both service lines share one controller and differ only
//! in their step list, endpoint and multipart field names.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    #[default]
    ProjectRequest,
    WebDevelopment,
}

impl ProfileKind {
    pub fn profile(self) -> &'static WizardProfile {
        match self {
            ProfileKind::ProjectRequest => &PROJECT_REQUEST,
            ProfileKind::WebDevelopment => &WEB_DEVELOPMENT,
        }
    }
}

impl FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "project_request" => Ok(ProfileKind::ProjectRequest),
            "web_development" => Ok(ProfileKind::WebDevelopment),
            other => Err(format!("unknown wizard profile '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Classification,
    Features,
    Details,
    Contact,
    Review,
}

impl StepKind {
    pub fn title_key(self) -> &'static str {
        match self {
            StepKind::Classification => "steps.classification",
            StepKind::Features => "steps.features",
            StepKind::Details => "steps.details",
            StepKind::Contact => "steps.contact",
            StepKind::Review => "steps.review",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            StepKind::Classification => "Project Type",
            StepKind::Features => "Features",
            StepKind::Details => "Project Details",
            StepKind::Contact => "Contact Info",
            StepKind::Review => "Review",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Multipart text field names used by a backend endpoint. `None` folds the
/// value into the notes field as a `Label: value` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldNames {
    pub category: Option<&'static str>,
    pub category_other_note: Option<&'static str>,
    pub build_kind: &'static str,
    pub features: &'static str,
    pub idea_summary: &'static str,
    pub target_audience: Option<&'static str>,
    pub domain: Option<&'static str>,
    pub has_hosting: Option<&'static str>,
    pub project_name: Option<&'static str>,
    pub budget: Option<&'static str>,
    pub timeline: Option<&'static str>,
    pub notes: &'static str,
    pub contact_name: Option<&'static str>,
    pub contact_email: Option<&'static str>,
    pub contact_phone: Option<&'static str>,
    pub contact_company: Option<&'static str>,
    pub attachments: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardProfile {
    pub kind: ProfileKind,
    pub name: &'static str,
    pub steps: &'static [StepKind],
    pub endpoint_path: &'static str,
    pub requires_category: bool,
    pub fields: FieldNames,
}

impl WizardProfile {
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// `step` is 1-based.
    pub fn step_kind(&self, step: usize) -> Option<StepKind> {
        step.checked_sub(1).and_then(|idx| self.steps.get(idx)).copied()
    }
}

pub static PROJECT_REQUEST: WizardProfile = WizardProfile {
    kind: ProfileKind::ProjectRequest,
    name: "project_request",
    steps: &[
        StepKind::Classification,
        StepKind::Features,
        StepKind::Details,
        StepKind::Review,
    ],
    endpoint_path: "/api/project-requests",
    requires_category: true,
    fields: FieldNames {
        category: Some("category"),
        category_other_note: Some("categoryOtherNote"),
        build_kind: "buildKind",
        features: "selectedFeatures",
        idea_summary: "ideaSummary",
        target_audience: Some("targetAudience"),
        domain: Some("domain"),
        has_hosting: Some("hasHosting"),
        project_name: Some("projectName"),
        budget: Some("budget"),
        timeline: Some("timeline"),
        notes: "notes",
        contact_name: Some("contactName"),
        contact_email: Some("contactEmail"),
        contact_phone: Some("contactPhone"),
        contact_company: Some("contactCompany"),
        attachments: "attachments",
    },
};

pub static WEB_DEVELOPMENT: WizardProfile = WizardProfile {
    kind: ProfileKind::WebDevelopment,
    name: "web_development",
    steps: &[
        StepKind::Classification,
        StepKind::Features,
        StepKind::Details,
        StepKind::Contact,
        StepKind::Review,
    ],
    endpoint_path: "/api/web-orders",
    requires_category: false,
    fields: FieldNames {
        category: None,
        category_other_note: None,
        build_kind: "siteType",
        features: "selectedFeatures",
        idea_summary: "contentScope",
        target_audience: None,
        domain: None,
        has_hosting: None,
        project_name: Some("siteName"),
        budget: Some("estimatedBudget"),
        timeline: Some("preferredTimeline"),
        notes: "notes",
        contact_name: Some("customerName"),
        contact_email: Some("customerEmail"),
        contact_phone: Some("customerPhone"),
        contact_company: Some("customerCompany"),
        attachments: "attachments",
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_kinds_are_one_based() {
        let profile = ProfileKind::ProjectRequest.profile();
        assert_eq!(profile.step_count(), 4);
        assert_eq!(profile.step_kind(0), None);
        assert_eq!(profile.step_kind(1), Some(StepKind::Classification));
        assert_eq!(profile.step_kind(4), Some(StepKind::Review));
        assert_eq!(profile.step_kind(5), None);
    }

    #[test]
    fn every_profile_ends_with_review() {
        for kind in [ProfileKind::ProjectRequest, ProfileKind::WebDevelopment] {
            let profile = kind.profile();
            assert_eq!(profile.steps.last(), Some(&StepKind::Review), "{}", profile.name);
        }
    }

    #[test]
    fn parses_profile_names() {
        assert_eq!(
            "web-development".parse::<ProfileKind>(),
            Ok(ProfileKind::WebDevelopment)
        );
        assert!("mobile".parse::<ProfileKind>().is_err());
    }
}
