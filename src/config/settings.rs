use crate::changelog::DEFAULT_VOICE_MARKER;
use crate::dom;
use serde::Deserialize;
use std::fmt;

/// Editor-wide settings. Every field has a default, so an empty file (or
/// no file at all) gives the stock behavior.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct EditorSettings {
    pub landmarks: Landmarks,
    pub repair: RepairSettings,
    pub changelog: ChangelogSettings,
}

/// Which elements the repairer treats as structural landmarks.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Landmarks {
    /// Tags checked for duplicate ids and empty content.
    pub section_tags: Vec<String>,
    /// Tag that must exist somewhere in the document.
    pub footer_tag: String,
}

impl Default for Landmarks {
    fn default() -> Self {
        Self {
            section_tags: vec!["section".to_string()],
            footer_tag: "footer".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RepairSettings {
    pub duplicate_suffix: String,
    /// Keep appending the suffix until the renamed id is unused.
    pub rescan_duplicates: bool,
    pub section_placeholder: String,
    pub footer_placeholder: String,
}

impl Default for RepairSettings {
    fn default() -> Self {
        Self {
            duplicate_suffix: "_dup".to_string(),
            rescan_duplicates: false,
            section_placeholder: "Placeholder content.".to_string(),
            footer_placeholder: "Footer added by repair agent.".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ChangelogSettings {
    pub voice_marker: String,
}

impl Default for ChangelogSettings {
    fn default() -> Self {
        Self {
            voice_marker: DEFAULT_VOICE_MARKER.to_string(),
        }
    }
}

impl EditorSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        let mut issues = Vec::new();

        if self.landmarks.section_tags.is_empty() {
            issues.push(SettingsIssue::Empty("landmarks.section_tags"));
        }
        if self
            .landmarks
            .section_tags
            .iter()
            .any(|tag| !is_tag_name(tag))
        {
            issues.push(SettingsIssue::InvalidTag("landmarks.section_tags"));
        }
        if !is_tag_name(&self.landmarks.footer_tag) {
            issues.push(SettingsIssue::InvalidTag("landmarks.footer_tag"));
        }
        if self.repair.duplicate_suffix.is_empty() {
            issues.push(SettingsIssue::Empty("repair.duplicate_suffix"));
        }
        // A blank placeholder leaves the landmark empty, so repair never settles.
        if renders_blank(&self.repair.section_placeholder) {
            issues.push(SettingsIssue::Empty("repair.section_placeholder"));
        }
        if renders_blank(&self.repair.footer_placeholder) {
            issues.push(SettingsIssue::Empty("repair.footer_placeholder"));
        }
        if self.changelog.voice_marker.trim().is_empty() {
            issues.push(SettingsIssue::Empty("changelog.voice_marker"));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(SettingsError { issues })
        }
    }

    /// Whether `tag` is one of the configured section landmarks.
    pub fn is_section_tag(&self, tag: &str) -> bool {
        self.landmarks
            .section_tags
            .iter()
            .any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Whether `text`, once written into the page, has no visible characters.
fn renders_blank(text: &str) -> bool {
    match dom::parse(text) {
        Ok(doc) => doc.text_content(doc.root()).trim().is_empty(),
        Err(_) => text.trim().is_empty(),
    }
}

fn is_tag_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[derive(Debug, Clone)]
pub struct SettingsError {
    pub issues: Vec<SettingsIssue>,
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SettingsError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsIssue {
    Empty(&'static str),
    InvalidTag(&'static str),
}

impl fmt::Display for SettingsIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsIssue::Empty(field) => write!(f, "setting '{field}' must not be empty"),
            SettingsIssue::InvalidTag(field) => {
                write!(f, "setting '{field}' must hold plain tag names")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = EditorSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.landmarks.section_tags, vec!["section"]);
        assert_eq!(settings.repair.duplicate_suffix, "_dup");
        assert_eq!(settings.changelog.voice_marker, "[Voice]");
    }

    #[test]
    fn section_tag_match_ignores_case() {
        let settings = EditorSettings::default();
        assert!(settings.is_section_tag("SECTION"));
        assert!(!settings.is_section_tag("article"));
    }

    #[test]
    fn validate_collects_every_issue() {
        let mut settings = EditorSettings::default();
        settings.landmarks.section_tags.clear();
        settings.landmarks.footer_tag = "foot er".into();
        settings.repair.duplicate_suffix.clear();

        let err = settings.validate().unwrap_err();
        assert_eq!(
            err.issues,
            vec![
                SettingsIssue::Empty("landmarks.section_tags"),
                SettingsIssue::InvalidTag("landmarks.footer_tag"),
                SettingsIssue::Empty("repair.duplicate_suffix"),
            ]
        );
    }

    #[test]
    fn blank_placeholders_are_rejected() {
        let mut settings = EditorSettings::default();
        settings.repair.section_placeholder = "   ".into();
        settings.repair.footer_placeholder = "&nbsp;<b> </b>".into();

        let err = settings.validate().unwrap_err();
        assert_eq!(
            err.issues,
            vec![
                SettingsIssue::Empty("repair.section_placeholder"),
                SettingsIssue::Empty("repair.footer_placeholder"),
            ]
        );
    }

    #[test]
    fn placeholder_with_markup_and_text_is_accepted() {
        let mut settings = EditorSettings::default();
        settings.repair.section_placeholder = "<em>Coming soon</em>".into();
        assert!(settings.validate().is_ok());
    }
}
