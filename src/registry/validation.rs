//! Field rules for DOI server drafts.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{RegistryError, ValidationErrors};
use crate::registry::types::DoiServerDraft;
use crate::template::{Placeholder, Template};

pub const MAX_NAME_LEN: usize = 32;
pub const MAX_TEXT_LEN: usize = 255;
pub const MAX_USERNAME_LEN: usize = 128;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MAX_PREFIX_LEN: usize = 15;

/// `10.` followed by digit groups, e.g. `10.5072` or `10.1000.10`
static DOI_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^10\.\d+(\.\d+)*$").expect("prefix regex is valid"));

/// Placeholders accepted in identifier patterns
pub const PATTERN_PLACEHOLDERS: &[Placeholder] = &[Placeholder::Uuid, Placeholder::Id];

/// Placeholders accepted in landing page templates
pub const LANDING_PAGE_PLACEHOLDERS: &[Placeholder] = &[Placeholder::Uuid];

/// Validates every field of a (normalized) draft, reporting all violations.
pub fn validate_draft(draft: &DoiServerDraft) -> Result<(), RegistryError> {
    let mut errors = ValidationErrors::new();

    if required(&mut errors, "name", &draft.name) {
        max_len(&mut errors, "name", &draft.name, MAX_NAME_LEN);
    }

    if let Some(description) = &draft.description {
        max_len(&mut errors, "description", description, MAX_TEXT_LEN);
    }

    if required(&mut errors, "api_url", &draft.api_url)
        && max_len(&mut errors, "api_url", &draft.api_url, MAX_TEXT_LEN)
    {
        http_url(&mut errors, "api_url", &draft.api_url);
    }

    if let Some(username) = &draft.credentials.username {
        max_len(&mut errors, "username", username, MAX_USERNAME_LEN);
    }
    if let Some(password) = &draft.credentials.password {
        validate_password_into(&mut errors, password.expose());
    }

    if required(&mut errors, "landing_page_template", &draft.landing_page_template)
        && max_len(
            &mut errors,
            "landing_page_template",
            &draft.landing_page_template,
            MAX_TEXT_LEN,
        )
    {
        landing_page_template(&mut errors, &draft.landing_page_template);
    }

    if required(&mut errors, "public_url", &draft.public_url)
        && max_len(&mut errors, "public_url", &draft.public_url, MAX_TEXT_LEN)
    {
        http_url(&mut errors, "public_url", &draft.public_url);
    }

    if required(&mut errors, "identifier_pattern", &draft.identifier_pattern)
        && max_len(
            &mut errors,
            "identifier_pattern",
            &draft.identifier_pattern,
            MAX_TEXT_LEN,
        )
    {
        identifier_pattern(&mut errors, &draft.identifier_pattern);
    }

    if required(&mut errors, "prefix", &draft.prefix)
        && max_len(&mut errors, "prefix", &draft.prefix, MAX_PREFIX_LEN)
        && !DOI_PREFIX.is_match(&draft.prefix)
    {
        errors.push(
            "prefix",
            "must be a DOI prefix such as '10.5072' (digits after '10.')",
        );
    }

    if let Some(group) = draft.publication_groups.iter().find(|g| **g <= 0) {
        errors.push(
            "publication_groups",
            format!("group id {} is not a valid identifier", group),
        );
    }

    errors.into_result()
}

/// Validates a replacement secret on its own
pub fn validate_password(password: &str) -> Result<(), RegistryError> {
    let mut errors = ValidationErrors::new();
    validate_password_into(&mut errors, password);
    errors.into_result()
}

/// Characters that may not appear in a DOI suffix or in static pattern text
pub fn is_forbidden_suffix_char(c: char) -> bool {
    c.is_whitespace() || c.is_control() || c == '?' || c == '#'
}

fn validate_password_into(errors: &mut ValidationErrors, password: &str) {
    if password.is_empty() {
        errors.push("password", "must not be empty; clear it instead");
    } else {
        max_len(errors, "password", password, MAX_PASSWORD_LEN);
    }
}

fn required(errors: &mut ValidationErrors, field: &'static str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.push(field, "is required");
        false
    } else {
        true
    }
}

fn max_len(errors: &mut ValidationErrors, field: &'static str, value: &str, max: usize) -> bool {
    let len = value.chars().count();
    if len > max {
        errors.push(
            field,
            format!("must be at most {} characters, got {}", max, len),
        );
        false
    } else {
        true
    }
}

fn http_url(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        Ok(url) => errors.push(
            field,
            format!("must be an http(s) URL, got scheme '{}'", url.scheme()),
        ),
        Err(err) => errors.push(field, format!("is not a valid URL: {}", err)),
    }
}

fn landing_page_template(errors: &mut ValidationErrors, value: &str) {
    let template = match Template::parse(value) {
        Ok(template) => template,
        Err(err) => return errors.push("landing_page_template", err.to_string()),
    };
    if let Err(err) = template.restrict_to(LANDING_PAGE_PLACEHOLDERS) {
        return errors.push("landing_page_template", err.to_string());
    }

    // The rendered page must be an absolute URL whatever the suffix
    let sample = template.render(|_| Some("sample".to_string()));
    match sample.as_deref().map(Url::parse) {
        Ok(Ok(url)) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        _ => errors.push(
            "landing_page_template",
            "must render to an absolute http(s) URL",
        ),
    }
}

fn identifier_pattern(errors: &mut ValidationErrors, value: &str) {
    let template = match Template::parse(value) {
        Ok(template) => template,
        Err(err) => return errors.push("identifier_pattern", err.to_string()),
    };
    if let Err(err) = template.restrict_to(PATTERN_PLACEHOLDERS) {
        return errors.push("identifier_pattern", err.to_string());
    }
    if !template.has_placeholders() {
        return errors.push(
            "identifier_pattern",
            "must contain a placeholder such as {{uuid}}",
        );
    }
    if template.literal_text().chars().any(is_forbidden_suffix_char) {
        errors.push(
            "identifier_pattern",
            "must not contain whitespace, control characters, '?' or '#'",
        );
    }
}
