//! Translation lookup. Every user-visible string goes through
//! [`Translator::text`] with an inline English fallback.

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};
use shared::domain::Locale;
use tracing::warn;

const BUILTIN_CATALOG: &str = include_str!("../locales/builtin.toml");

pub trait Translator: Send + Sync {
    fn lookup(&self, locale: Locale, key: &str) -> Option<String>;

    fn text(&self, locale: Locale, key: &str, fallback: &str) -> String {
        self.lookup(locale, key)
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Replaces `{name}` placeholders.
pub fn fill(template: &str, args: &[(&str, String)]) -> String {
    args.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<Locale, HashMap<String, String>>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        Self::from_toml_str(BUILTIN_CATALOG).unwrap_or_else(|err| {
            warn!(error = %err, "builtin translation catalog is invalid");
            Self::default()
        })
    }

    /// Top-level tables are locale codes; nested tables flatten into dotted
    /// keys, so `[ar.submit]` + `success = ".."` is `submit.success`.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let root: toml::Table = toml::from_str(raw).context("failed to parse translation catalog")?;
        let mut catalog = Self::default();
        for (code, table) in root {
            let locale: Locale = match code.parse() {
                Ok(locale) => locale,
                Err(err) => {
                    warn!(locale = %code, error = %err, "skipping translation table");
                    continue;
                }
            };
            let toml::Value::Table(table) = table else {
                warn!(locale = %code, "translation locale entry is not a table");
                continue;
            };
            let strings = catalog.entries.entry(locale).or_default();
            flatten_into(strings, "", &table);
        }
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read translations from '{}'", path.display()))?;
        Self::from_toml_str(&raw)
    }

    /// Builtin strings with an optional operator-supplied file layered on top.
    pub fn with_overrides(path: Option<&Path>) -> Result<Self> {
        let mut catalog = Self::builtin();
        if let Some(path) = path {
            catalog.merge(Self::load(path)?);
        }
        Ok(catalog)
    }

    /// Entries of `other` win over entries already present.
    pub fn merge(&mut self, other: Catalog) {
        for (locale, strings) in other.entries {
            self.entries.entry(locale).or_default().extend(strings);
        }
    }

    pub fn len(&self, locale: Locale) -> usize {
        self.entries.get(&locale).map(HashMap::len).unwrap_or(0)
    }
}

fn flatten_into(out: &mut HashMap<String, String>, prefix: &str, table: &toml::Table) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::String(text) => {
                out.insert(full_key, text.clone());
            }
            toml::Value::Table(nested) => flatten_into(out, &full_key, nested),
            other => {
                out.insert(full_key, other.to_string());
            }
        }
    }
}

impl Translator for Catalog {
    fn lookup(&self, locale: Locale, key: &str) -> Option<String> {
        self.entries.get(&locale)?.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_and_quoted_keys_flatten_alike() {
        let catalog = Catalog::from_toml_str(
            r#"
            [ar]
            "submit.success.title" = "تم إرسال الطلب بنجاح"

            [ar.steps]
            features = "الميزات"
            "#,
        )
        .expect("parse");

        assert_eq!(
            catalog.lookup(Locale::Ar, "submit.success.title").as_deref(),
            Some("تم إرسال الطلب بنجاح")
        );
        assert_eq!(catalog.lookup(Locale::Ar, "steps.features").as_deref(), Some("الميزات"));
        assert_eq!(catalog.lookup(Locale::En, "steps.features"), None);
    }

    #[test]
    fn falls_back_to_inline_literal() {
        let catalog = Catalog::empty();
        assert_eq!(catalog.text(Locale::Ar, "missing.key", "Fallback"), "Fallback");
    }

    #[test]
    fn unknown_locales_are_skipped() {
        let catalog = Catalog::from_toml_str("[fr]\nhello = \"bonjour\"\n").expect("parse");
        assert_eq!(catalog.len(Locale::En), 0);
        assert_eq!(catalog.len(Locale::Ar), 0);
    }

    #[test]
    fn builtin_catalog_parses_with_arabic_strings() {
        let catalog = Catalog::builtin();
        assert!(catalog.len(Locale::Ar) > 10);
        assert!(catalog.lookup(Locale::Ar, "submit.success_title").is_some());
        assert!(catalog.lookup(Locale::Ar, "features.shopping_cart").is_some());
    }

    #[test]
    fn merge_overrides_existing_entries() {
        let mut base = Catalog::builtin();
        base.merge(
            Catalog::from_toml_str("[ar]\n\"submit.success_title\" = \"تم\"\n").expect("parse"),
        );
        assert_eq!(base.lookup(Locale::Ar, "submit.success_title").as_deref(), Some("تم"));
    }

    #[test]
    fn override_file_layers_over_builtin() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("strings.toml");
        std::fs::write(&path, "[en.mail]\nsubject = \"Project enquiry\"\n").expect("write");

        let catalog = Catalog::with_overrides(Some(&path)).expect("load");
        assert_eq!(catalog.lookup(Locale::En, "mail.subject").as_deref(), Some("Project enquiry"));
        assert!(catalog.lookup(Locale::Ar, "mail.subject").is_some());

        assert!(Catalog::with_overrides(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn fill_substitutes_named_placeholders() {
        assert_eq!(
            fill("{actual} of {min}", &[("actual", "3".into()), ("min", "20".into())]),
            "3 of 20"
        );
    }
}
