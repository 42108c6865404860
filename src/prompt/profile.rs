use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub const DEFAULT_ASSISTANT_NAME: &str = "Lola";
pub const DEFAULT_SUBJECT_NAME: &str = "my friend";
pub const DEFAULT_LOCATION: &str = "the East Coast";

/// Something with a name and an optional blurb: a project, a piece of gear,
/// an author.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NamedItem {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Education {
    pub university: Option<String>,
    pub degree: Option<String>,
    pub graduation_year: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommunicationStyle {
    pub strengths: Vec<String>,
    pub improvement_areas: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RelationshipPreferences {
    pub seeking: Option<String>,
    pub interests_in_partner: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SocialMedia {
    pub instagram: Option<String>,
    pub substack: Option<String>,
    pub x: Option<String>,
    pub github: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InvestmentPhilosophy {
    pub approach: Option<String>,
    pub key_principles: Vec<String>,
    pub strategy: Option<String>,
}

/// The person the assistant talks about. Every field is optional so partial
/// profiles still render.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PersonaProfile {
    pub assistant_name: Option<String>,
    pub name: Option<String>,
    pub profession: Option<String>,
    pub location: Option<String>,
    pub professional_summary: Option<String>,
    pub interests: Vec<String>,
    pub projects: Vec<NamedItem>,
    pub equipment: Vec<NamedItem>,
    pub education: Education,
    pub favorite_books_authors: Vec<NamedItem>,
    pub communication_style: CommunicationStyle,
    pub investment_philosophy: Option<InvestmentPhilosophy>,
    pub relationship_preferences: RelationshipPreferences,
    pub social_media: SocialMedia,
}

impl PersonaProfile {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read persona profile from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse persona profile in {}", path.display()))
    }

    pub fn assistant_name(&self) -> &str {
        non_blank(&self.assistant_name).unwrap_or(DEFAULT_ASSISTANT_NAME)
    }

    pub fn subject_name(&self) -> &str {
        non_blank(&self.name).unwrap_or(DEFAULT_SUBJECT_NAME)
    }

    pub fn location(&self) -> &str {
        non_blank(&self.location).unwrap_or(DEFAULT_LOCATION)
    }
}

pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
