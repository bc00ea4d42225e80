//! Language catalog: the ordered option lists offered by the two pickers.

use serde::Serialize;

use super::LanguageCode;

/// One selectable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageOption {
    pub code: LanguageCode,
    pub name: String,
}

impl LanguageOption {
    /// Build from static data. Returns None if `code` is not a valid code.
    pub fn new(code: &str, name: &str) -> Option<Self> {
        Some(Self {
            code: LanguageCode::parse(code)?,
            name: name.to_string(),
        })
    }
}

/// Shared between the source and target lists.
const COMMON: &[(&str, &str)] = &[
    ("ar", "Arabic"),
    ("bg", "Bulgarian"),
    ("cs", "Czech"),
    ("da", "Danish"),
    ("de", "German"),
    ("el", "Greek"),
    ("es", "Spanish"),
    ("et", "Estonian"),
    ("fi", "Finnish"),
    ("fr", "French"),
    ("he", "Hebrew"),
    ("hu", "Hungarian"),
    ("id", "Indonesian"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("lt", "Lithuanian"),
    ("lv", "Latvian"),
    ("nb", "Norwegian Bokmål"),
    ("nl", "Dutch"),
    ("pl", "Polish"),
    ("ro", "Romanian"),
    ("ru", "Russian"),
    ("sk", "Slovak"),
    ("sl", "Slovenian"),
    ("sv", "Swedish"),
    ("th", "Thai"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("vi", "Vietnamese"),
    ("zh", "Chinese"),
];

const SOURCE_ONLY: &[(&str, &str)] = &[("en", "English"), ("pt", "Portuguese")];

const TARGET_ONLY: &[(&str, &str)] = &[
    ("en-GB", "English (British)"),
    ("en-US", "English (American)"),
    ("pt-BR", "Portuguese (Brazilian)"),
    ("pt-PT", "Portuguese (European)"),
    ("zh-HANS", "Chinese (Simplified)"),
    ("zh-HANT", "Chinese (Traditional)"),
];

/// Ordered option lists for both slots.
#[derive(Debug, Clone)]
pub struct LanguageCatalog {
    targets: Vec<LanguageOption>,
    sources: Vec<LanguageOption>,
}

impl LanguageCatalog {
    pub fn new(targets: Vec<LanguageOption>, sources: Vec<LanguageOption>) -> Self {
        Self { targets, sources }
    }

    pub fn targets(&self) -> &[LanguageOption] {
        &self.targets
    }

    pub fn sources(&self) -> &[LanguageOption] {
        &self.sources
    }

    /// Display name for a code, searched in both lists (case-insensitive,
    /// since the translator may report `DE` for `de`). Falls back to the code.
    pub fn display_name(&self, code: &str) -> String {
        self.targets
            .iter()
            .chain(self.sources.iter())
            .find(|o| o.code.as_str().eq_ignore_ascii_case(code))
            .map(|o| o.name.clone())
            .unwrap_or_else(|| code.to_string())
    }
}

impl Default for LanguageCatalog {
    fn default() -> Self {
        let build = |lists: &[&[(&str, &str)]]| -> Vec<LanguageOption> {
            lists
                .iter()
                .flat_map(|l| l.iter())
                .filter_map(|(code, name)| LanguageOption::new(code, name))
                .collect()
        };
        Self {
            targets: build(&[COMMON, TARGET_ONLY]),
            sources: build(&[COMMON, SOURCE_ONLY]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lists_are_complete() {
        let catalog = LanguageCatalog::default();
        assert_eq!(catalog.targets().len(), COMMON.len() + TARGET_ONLY.len());
        assert_eq!(catalog.sources().len(), COMMON.len() + SOURCE_ONLY.len());
        assert_eq!(catalog.targets().last().unwrap().code.as_str(), "zh-HANT");
    }

    #[test]
    fn display_name_is_case_insensitive() {
        let catalog = LanguageCatalog::default();
        assert_eq!(catalog.display_name("DE"), "German");
        assert_eq!(catalog.display_name("en"), "English");
        assert_eq!(catalog.display_name("xx"), "xx");
    }
}
