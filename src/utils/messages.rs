//! User-facing message templates.
//!
//! A [`MessageTemplate`] is plain data: a catalog key plus named parameters.
//! Turning it into text is the job of a [`Translator`], so locale handling
//! stays outside the validation code.

use std::collections::HashMap;

pub const FILE_SIZE_KEY: &str = "mautic.asset.asset.error.file.size";
pub const FILE_EXTENSION_KEY: &str = "mautic.asset.asset.error.file.extension";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    pub key: &'static str,
    pub params: Vec<(&'static str, String)>,
}

impl MessageTemplate {
    pub fn new(key: &'static str) -> Self {
        Self {
            key,
            params: Vec::new(),
        }
    }

    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

pub trait Translator: Send + Sync {
    fn translate(&self, template: &MessageTemplate) -> String;
}

/// In-memory catalog using `{name}` placeholders.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<&'static str, String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn english() -> Self {
        Self::new()
            .insert(
                FILE_SIZE_KEY,
                "The file is too large ({fileSize} MB). The maximum allowed size is {maxSize} MB.",
            )
            .insert(
                FILE_EXTENSION_KEY,
                "The file extension {fileExtension} is not allowed. Allowed extensions: {extensions}.",
            )
    }

    pub fn insert(mut self, key: &'static str, text: impl Into<String>) -> Self {
        self.entries.insert(key, text.into());
        self
    }
}

impl Translator for Catalog {
    fn translate(&self, template: &MessageTemplate) -> String {
        // Unknown keys render as the key itself
        let Some(text) = self.entries.get(template.key) else {
            return template.key.to_string();
        };

        template
            .params
            .iter()
            .fold(text.clone(), |acc, (name, value)| {
                acc.replace(&format!("{{{}}}", name), value)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_catalog_substitutes_params() {
        let template = MessageTemplate::new(FILE_SIZE_KEY)
            .with("fileSize", "11.0")
            .with("maxSize", "10.0");

        let text = Catalog::english().translate(&template);
        assert_eq!(
            text,
            "The file is too large (11.0 MB). The maximum allowed size is 10.0 MB."
        );
    }

    #[test]
    fn test_keys_match_the_asset_bundle_catalog() {
        assert_eq!(FILE_SIZE_KEY, "mautic.asset.asset.error.file.size");
        assert_eq!(FILE_EXTENSION_KEY, "mautic.asset.asset.error.file.extension");

        let catalog = Catalog::new().insert(
            "mautic.asset.asset.error.file.extension",
            "{fileExtension} blocked",
        );
        let template = MessageTemplate::new(FILE_EXTENSION_KEY).with("fileExtension", "exe");
        assert_eq!(catalog.translate(&template), "exe blocked");
    }

    #[test]
    fn test_unknown_key_falls_back_to_key() {
        let template = MessageTemplate::new("asset.error.unknown").with("a", "b");
        assert_eq!(Catalog::new().translate(&template), "asset.error.unknown");
    }

    #[test]
    fn test_custom_catalog_entry() {
        let catalog = Catalog::new().insert(FILE_EXTENSION_KEY, "Nope: {fileExtension}");
        let template = MessageTemplate::new(FILE_EXTENSION_KEY).with("fileExtension", "exe");
        assert_eq!(catalog.translate(&template), "Nope: exe");
        assert_eq!(template.param("fileExtension"), Some("exe"));
        assert_eq!(template.param("missing"), None);
    }
}
