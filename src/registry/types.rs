//! Domain types of the registry: the stored configuration and the draft used
//! to create or update it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::Secret;

/// Identifier of an authorization group owned by the surrounding catalog
pub type GroupId = i32;

/// Pattern applied when a draft does not provide one
pub const DEFAULT_IDENTIFIER_PATTERN: &str = "{{uuid}}";

/// Account used to authenticate against the provider API.
///
/// The password is never serialized; `Debug` prints it redacted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<Secret>,
    /// A secret is stored but the configured key cannot decrypt it
    #[serde(default, skip_deserializing, skip_serializing_if = "std::ops::Not::not")]
    pub password_unreadable: bool,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: Secret) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password),
            password_unreadable: false,
        }
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

/// Input for `create` and `update`.
///
/// Every field defaults when absent from JSON so that a missing required
/// field is reported by validation rather than by the deserializer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DoiServerDraft {
    pub name: String,
    pub description: Option<String>,
    pub api_url: String,
    pub credentials: Credentials,
    pub landing_page_template: String,
    pub public_url: String,
    pub identifier_pattern: String,
    pub prefix: String,
    pub publication_groups: BTreeSet<GroupId>,
}

impl Default for DoiServerDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            api_url: String::new(),
            credentials: Credentials::default(),
            landing_page_template: String::new(),
            public_url: String::new(),
            identifier_pattern: DEFAULT_IDENTIFIER_PATTERN.to_string(),
            prefix: String::new(),
            publication_groups: BTreeSet::new(),
        }
    }
}

impl DoiServerDraft {
    /// Draft with every required field set and the default identifier pattern
    pub fn new(
        name: impl Into<String>,
        api_url: impl Into<String>,
        landing_page_template: impl Into<String>,
        public_url: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            api_url: api_url.into(),
            landing_page_template: landing_page_template.into(),
            public_url: public_url.into(),
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_identifier_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.identifier_pattern = pattern.into();
        self
    }

    pub fn with_publication_groups(mut self, groups: impl IntoIterator<Item = GroupId>) -> Self {
        self.publication_groups = groups.into_iter().collect();
        self
    }

    /// Trims surrounding whitespace and turns blank optional text into `None`
    pub fn normalized(mut self) -> Self {
        fn trim(value: &mut String) {
            let trimmed = value.trim();
            if trimmed.len() != value.len() {
                *value = trimmed.to_string();
            }
        }
        fn blank_to_none(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        trim(&mut self.name);
        trim(&mut self.api_url);
        trim(&mut self.landing_page_template);
        trim(&mut self.public_url);
        trim(&mut self.identifier_pattern);
        trim(&mut self.prefix);
        self.description = blank_to_none(self.description);
        self.credentials.username = blank_to_none(self.credentials.username);
        if self.identifier_pattern.is_empty() {
            self.identifier_pattern = DEFAULT_IDENTIFIER_PATTERN.to_string();
        }
        self
    }
}

/// A stored DOI server configuration.
///
/// `id` is assigned by the store on creation and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoiServerConfig {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub api_url: String,
    pub credentials: Credentials,
    pub landing_page_template: String,
    pub public_url: String,
    pub identifier_pattern: String,
    pub prefix: String,
    pub publication_groups: BTreeSet<GroupId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DoiServerConfig {
    /// Draft carrying the current values; its password is left unset so an
    /// update built from it keeps the stored secret.
    pub fn to_draft(&self) -> DoiServerDraft {
        DoiServerDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            api_url: self.api_url.clone(),
            credentials: Credentials {
                username: self.credentials.username.clone(),
                ..Credentials::default()
            },
            landing_page_template: self.landing_page_template.clone(),
            public_url: self.public_url.clone(),
            identifier_pattern: self.identifier_pattern.clone(),
            prefix: self.prefix.clone(),
            publication_groups: self.publication_groups.clone(),
        }
    }

    /// Whether members of `group` may publish through this server
    pub fn allows_group(&self, group: GroupId) -> bool {
        self.publication_groups.contains(&group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let draft: DoiServerDraft = serde_json::from_str(r#"{"name": "datacite"}"#).unwrap();

        assert_eq!(draft.name, "datacite");
        assert!(draft.api_url.is_empty());
        assert_eq!(draft.identifier_pattern, DEFAULT_IDENTIFIER_PATTERN);
        assert!(draft.publication_groups.is_empty());
    }

    #[test]
    fn test_normalized_trims_and_blanks() {
        let draft = DoiServerDraft::new(
            "  datacite ",
            " https://mds.test.datacite.org/ ",
            "https://catalog.example.org/records/{{uuid}}",
            "https://doi.org/",
            " 10.5072 ",
        )
        .with_description("   ")
        .with_identifier_pattern("  ")
        .normalized();

        assert_eq!(draft.name, "datacite");
        assert_eq!(draft.api_url, "https://mds.test.datacite.org/");
        assert_eq!(draft.prefix, "10.5072");
        assert_eq!(draft.description, None);
        assert_eq!(draft.identifier_pattern, DEFAULT_IDENTIFIER_PATTERN);
    }

    #[test]
    fn test_credentials_password_is_not_serialized() {
        let credentials = Credentials::new("gn-user", Secret::new("top-secret"));
        let json = serde_json::to_string(&credentials).unwrap();

        assert!(json.contains("gn-user"));
        assert!(!json.contains("top-secret"));
        assert!(!format!("{:?}", credentials).contains("top-secret"));
    }

    #[test]
    fn test_draft_deserializes_password() {
        let draft: DoiServerDraft = serde_json::from_str(
            r#"{"credentials": {"username": "gn", "password": "pw"}, "publication_groups": [3, 2, 3]}"#,
        )
        .unwrap();

        assert_eq!(
            draft.credentials.password.as_ref().map(Secret::expose),
            Some("pw")
        );
        assert_eq!(draft.publication_groups.into_iter().collect::<Vec<_>>(), vec![2, 3]);
    }
}
