//! DOI minting and landing page resolution.
//!
//! Everything here is a pure function of a stored configuration and its
//! inputs; registering the DOI with the provider is the job of an external
//! client fed with a [`RegistrationRequest`].

use std::fmt;

use serde::Serialize;
use url::Url;

use crate::crypto::{CryptoError, Secret};
use crate::error::RegistryError;
use crate::registry::types::DoiServerConfig;
use crate::registry::validation::{
    LANDING_PAGE_PLACEHOLDERS, PATTERN_PLACEHOLDERS, is_forbidden_suffix_char,
};
use crate::template::{Placeholder, Template, TemplateError};

/// A full DOI, `prefix/suffix`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DoiIdentifier {
    prefix: String,
    suffix: String,
}

impl DoiIdentifier {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl fmt::Display for DoiIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.prefix, self.suffix)
    }
}

/// The per-record values an identifier pattern is rendered from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintSeed {
    /// Catalog record UUID, bound to `{{uuid}}`
    pub uuid: String,
    /// Catalog record internal id, bound to `{{id}}`
    pub record_id: Option<i64>,
}

impl MintSeed {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            record_id: None,
        }
    }

    pub fn with_record_id(mut self, record_id: i64) -> Self {
        self.record_id = Some(record_id);
        self
    }
}

/// Everything the external DOI-provider client needs for one registration
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationRequest {
    pub server_id: i32,
    pub api_url: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<Secret>,
    pub doi: String,
    pub prefix: String,
    pub suffix: String,
    pub landing_page: String,
    pub public_url: String,
}

impl RegistrationRequest {
    pub fn build(config: &DoiServerConfig, seed: &MintSeed) -> Result<Self, RegistryError> {
        if config.credentials.password_unreadable {
            return Err(RegistryError::Crypto(CryptoError::DecryptionFailed(format!(
                "stored password of DOI server {} cannot be decrypted with the configured key",
                config.id
            ))));
        }

        let doi = mint_identifier(config, seed)?;
        let landing_page = resolve_landing_page(config, doi.suffix())?;
        let public_url = public_doi_url(config, &doi)?;

        Ok(Self {
            server_id: config.id,
            api_url: config.api_url.clone(),
            username: config.credentials.username.clone(),
            password: config.credentials.password.clone(),
            doi: doi.to_string(),
            prefix: doi.prefix().to_string(),
            suffix: doi.suffix().to_string(),
            landing_page: landing_page.to_string(),
            public_url: public_url.to_string(),
        })
    }
}

/// Renders the server's identifier pattern for `seed`.
///
/// Deterministic: the same configuration and seed always give the same DOI.
pub fn mint_identifier(
    config: &DoiServerConfig,
    seed: &MintSeed,
) -> Result<DoiIdentifier, RegistryError> {
    let uuid = seed.uuid.trim();
    if uuid.is_empty() {
        return Err(RegistryError::invalid("uuid", "is required"));
    }

    let pattern = Template::parse(&config.identifier_pattern)
        .and_then(|t| t.restrict_to(PATTERN_PLACEHOLDERS).map(|_| t))
        .map_err(|err| RegistryError::invalid("identifier_pattern", err.to_string()))?;

    let suffix = pattern
        .render(|placeholder| match placeholder {
            Placeholder::Uuid => Some(uuid.to_string()),
            Placeholder::Id => seed.record_id.map(|id| id.to_string()),
        })
        .map_err(|err| match err {
            TemplateError::Unbound(Placeholder::Id) => RegistryError::invalid(
                "record_id",
                format!(
                    "identifier pattern '{}' requires a record id",
                    config.identifier_pattern
                ),
            ),
            other => RegistryError::invalid("identifier_pattern", other.to_string()),
        })?;

    check_suffix(&suffix)?;

    Ok(DoiIdentifier::new(config.prefix.clone(), suffix))
}

/// Substitutes `suffix` into the landing page template.
pub fn resolve_landing_page(
    config: &DoiServerConfig,
    suffix: &str,
) -> Result<Url, RegistryError> {
    check_suffix(suffix)?;

    let template = Template::parse(&config.landing_page_template)
        .and_then(|t| t.restrict_to(LANDING_PAGE_PLACEHOLDERS).map(|_| t))
        .map_err(|err| RegistryError::invalid("landing_page_template", err.to_string()))?;

    let rendered = template
        .render(|_| Some(suffix.to_string()))
        .map_err(|err| RegistryError::invalid("landing_page_template", err.to_string()))?;

    Url::parse(&rendered).map_err(|err| {
        RegistryError::invalid(
            "landing_page_template",
            format!("'{}' is not an absolute URL: {}", rendered, err),
        )
    })
}

/// Public resolver URL of `doi`, built from the server's public URL prefix.
pub fn public_doi_url(config: &DoiServerConfig, doi: &DoiIdentifier) -> Result<Url, RegistryError> {
    let mut base = config.public_url.clone();
    if !base.ends_with('/') {
        base.push('/');
    }
    let base = Url::parse(&base)
        .map_err(|err| RegistryError::invalid("public_url", err.to_string()))?;

    base.join(&doi.to_string())
        .map_err(|err| RegistryError::invalid("public_url", err.to_string()))
}

fn check_suffix(suffix: &str) -> Result<(), RegistryError> {
    if suffix.is_empty() {
        return Err(RegistryError::invalid("suffix", "must not be empty"));
    }
    if suffix.chars().any(is_forbidden_suffix_char) {
        return Err(RegistryError::invalid(
            "suffix",
            format!(
                "'{}' contains whitespace, control characters, '?' or '#'",
                suffix
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::types::Credentials;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn config(pattern: &str, landing: &str) -> DoiServerConfig {
        DoiServerConfig {
            id: 100,
            name: "datacite-test".to_string(),
            description: None,
            api_url: "https://mds.test.datacite.org".to_string(),
            credentials: Credentials::new("gn", Secret::new("pw")),
            landing_page_template: landing.to_string(),
            public_url: "https://doi.org".to_string(),
            identifier_pattern: pattern.to_string(),
            prefix: "10.5072".to_string(),
            publication_groups: BTreeSet::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn default_config() -> DoiServerConfig {
        config("{{uuid}}", "https://example.org/{{uuid}}")
    }

    #[test]
    fn test_resolve_landing_page_substitutes_suffix() {
        let url = resolve_landing_page(&default_config(), "abc-123").unwrap();
        assert_eq!(url.as_str(), "https://example.org/abc-123");
    }

    #[test]
    fn test_resolve_landing_page_replaces_every_occurrence() {
        let cfg = config("{{uuid}}", "https://example.org/{{uuid}}?view={{uuid}}");
        let url = resolve_landing_page(&cfg, "abc").unwrap();
        assert_eq!(url.as_str(), "https://example.org/abc?view=abc");
    }

    #[test]
    fn test_resolve_landing_page_rejects_unsafe_suffix() {
        for suffix in ["", "a b", "a?b", "a#b"] {
            let result = resolve_landing_page(&default_config(), suffix);
            assert!(
                matches!(result, Err(RegistryError::Validation(ref e)) if e.has_field("suffix")),
                "suffix {:?} should be rejected",
                suffix
            );
        }
    }

    #[test]
    fn test_mint_is_deterministic_per_seed() {
        let cfg = default_config();
        let seed = MintSeed::new("6f0e5b38-5a0e-4a3a-9d6c-0d4f3d3b8c11");

        let first = mint_identifier(&cfg, &seed).unwrap();
        let second = mint_identifier(&cfg, &seed).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.to_string(),
            "10.5072/6f0e5b38-5a0e-4a3a-9d6c-0d4f3d3b8c11"
        );

        let other = mint_identifier(&cfg, &MintSeed::new("0b8a1c2d")).unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn test_mint_with_record_id() {
        let cfg = config("gn.{{id}}.{{uuid}}", "https://example.org/{{uuid}}");
        let doi = mint_identifier(&cfg, &MintSeed::new("abc").with_record_id(42)).unwrap();

        assert_eq!(doi.prefix(), "10.5072");
        assert_eq!(doi.suffix(), "gn.42.abc");
    }

    #[test]
    fn test_mint_requires_record_id_when_pattern_uses_it() {
        let cfg = config("{{id}}", "https://example.org/{{uuid}}");
        let result = mint_identifier(&cfg, &MintSeed::new("abc"));

        assert!(matches!(result, Err(RegistryError::Validation(ref e)) if e.has_field("record_id")));
    }

    #[test]
    fn test_mint_requires_uuid() {
        let result = mint_identifier(&default_config(), &MintSeed::new("  "));
        assert!(matches!(result, Err(RegistryError::Validation(ref e)) if e.has_field("uuid")));
    }

    #[test]
    fn test_mint_rejects_uuid_with_whitespace() {
        let result = mint_identifier(&default_config(), &MintSeed::new("a b"));
        assert!(matches!(result, Err(RegistryError::Validation(ref e)) if e.has_field("suffix")));
    }

    #[test]
    fn test_public_doi_url() {
        let cfg = default_config();
        let doi = DoiIdentifier::new("10.5072", "abc-123");

        assert_eq!(
            public_doi_url(&cfg, &doi).unwrap().as_str(),
            "https://doi.org/10.5072/abc-123"
        );
    }

    #[test]
    fn test_registration_request_redacts_password() {
        let request =
            RegistrationRequest::build(&default_config(), &MintSeed::new("abc-123")).unwrap();

        assert_eq!(request.doi, "10.5072/abc-123");
        assert_eq!(request.landing_page, "https://example.org/abc-123");
        assert_eq!(request.public_url, "https://doi.org/10.5072/abc-123");
        assert_eq!(request.password.as_ref().map(Secret::expose), Some("pw"));

        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("\"pw\""));
        assert!(!format!("{:?}", request).contains("\"pw\""));
    }

    #[test]
    fn test_registration_request_refuses_unreadable_password() {
        let mut cfg = default_config();
        cfg.credentials = Credentials {
            username: Some("gn".to_string()),
            password: None,
            password_unreadable: true,
        };

        assert!(matches!(
            RegistrationRequest::build(&cfg, &MintSeed::new("abc-123")),
            Err(RegistryError::Crypto(_))
        ));
        // minting needs no secret
        assert!(mint_identifier(&cfg, &MintSeed::new("abc-123")).is_ok());
    }
}
