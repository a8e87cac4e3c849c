//! Feature catalog offered at the features step.
//!
//! The list depends on the selected build kind, so it is computed on every
//! call instead of being cached next to the answers.

use serde::{Deserialize, Serialize};

use crate::domain::{BuildKind, FeatureId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureGroup {
    Core,
    Business,
    Ecommerce,
    Technical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    pub id: FeatureId,
    pub group: FeatureGroup,
    /// Translation key for the display name.
    pub label_key: String,
    /// English fallback when no translation is registered.
    pub label: String,
}

struct Entry {
    id: &'static str,
    group: FeatureGroup,
    label: &'static str,
    only_for: Option<BuildKind>,
}

const CATALOG: &[Entry] = &[
    Entry { id: "responsive_design", group: FeatureGroup::Core, label: "Responsive Design", only_for: None },
    Entry { id: "seo_optimization", group: FeatureGroup::Core, label: "SEO Optimization", only_for: None },
    Entry { id: "performance_optimization", group: FeatureGroup::Core, label: "Performance Optimization", only_for: None },
    Entry { id: "ssl_security", group: FeatureGroup::Core, label: "SSL Certificate", only_for: None },
    Entry { id: "cms_system", group: FeatureGroup::Business, label: "Content Management System", only_for: None },
    Entry { id: "user_accounts", group: FeatureGroup::Business, label: "User Accounts", only_for: None },
    Entry { id: "contact_forms", group: FeatureGroup::Business, label: "Contact Forms", only_for: None },
    Entry { id: "analytics_integration", group: FeatureGroup::Business, label: "Analytics Integration", only_for: None },
    Entry { id: "multi_language", group: FeatureGroup::Business, label: "Multi-Language Support", only_for: None },
    Entry { id: "shopping_cart", group: FeatureGroup::Ecommerce, label: "Shopping Cart", only_for: Some(BuildKind::Ecommerce) },
    Entry { id: "payment_gateway", group: FeatureGroup::Ecommerce, label: "Payment Gateway", only_for: Some(BuildKind::Ecommerce) },
    Entry { id: "inventory_management", group: FeatureGroup::Ecommerce, label: "Inventory Management", only_for: Some(BuildKind::Ecommerce) },
    Entry { id: "admin_dashboard", group: FeatureGroup::Technical, label: "Admin Dashboard", only_for: Some(BuildKind::Platform) },
    Entry { id: "api_integration", group: FeatureGroup::Technical, label: "API Integration", only_for: Some(BuildKind::Platform) },
    Entry { id: "backup_system", group: FeatureGroup::Technical, label: "Backup System", only_for: None },
];

/// Features selectable for `build_kind`. With no build kind picked yet only
/// the unconditional features are offered.
pub fn available_features(build_kind: Option<BuildKind>) -> Vec<FeatureDescriptor> {
    CATALOG
        .iter()
        .filter(|entry| entry.only_for.is_none() || entry.only_for == build_kind)
        .map(|entry| FeatureDescriptor {
            id: FeatureId::new(entry.id),
            group: entry.group,
            label_key: format!("features.{}", entry.id),
            label: entry.label.to_string(),
        })
        .collect()
}

pub fn is_available(feature: &FeatureId, build_kind: Option<BuildKind>) -> bool {
    CATALOG.iter().any(|entry| {
        entry.id == feature.as_str() && (entry.only_for.is_none() || entry.only_for == build_kind)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecommerce_unlocks_cart_features() {
        let website = available_features(Some(BuildKind::Website));
        let shop = available_features(Some(BuildKind::Ecommerce));

        let cart = FeatureId::new("shopping_cart");
        assert!(!website.iter().any(|f| f.id == cart));
        assert!(shop.iter().any(|f| f.id == cart));
        assert!(shop.len() > website.len());
    }

    #[test]
    fn no_build_kind_offers_only_unconditional_features() {
        let features = available_features(None);
        assert!(features
            .iter()
            .all(|f| f.group != FeatureGroup::Ecommerce && f.id.as_str() != "admin_dashboard"));
        assert!(is_available(&FeatureId::new("responsive_design"), None));
        assert!(!is_available(&FeatureId::new("api_integration"), None));
        assert!(!is_available(&FeatureId::new("does_not_exist"), Some(BuildKind::Platform)));
    }
}
