//! `{{placeholder}}` templates used by identifier patterns and landing pages.
//!
//! A template is parsed once into literal and placeholder segments and then
//! rendered against a set of bindings. Parsing rejects unknown placeholder
//! names and stray braces, so a template that parses can always be rendered
//! once its placeholders are bound.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex is valid")
});

/// Placeholder names understood by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Placeholder {
    /// Catalog record UUID (or, in landing pages, the identifier suffix)
    Uuid,
    /// Catalog record internal numeric id
    Id,
}

impl Placeholder {
    pub fn name(self) -> &'static str {
        match self {
            Placeholder::Uuid => "uuid",
            Placeholder::Id => "id",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "uuid" => Some(Placeholder::Uuid),
            "id" => Some(Placeholder::Id),
            _ => None,
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}}}}}", self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder '{{{{{0}}}}}'")]
    UnknownPlaceholder(String),
    #[error("unbalanced braces near position {0}")]
    UnbalancedBraces(usize),
    #[error("placeholder {0} is not allowed here")]
    NotAllowed(Placeholder),
    #[error("no value bound for placeholder {0}")]
    Unbound(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// A parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut cursor = 0;

        for captures in PLACEHOLDER.captures_iter(source) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            push_literal(&mut segments, &source[cursor..whole.start()], cursor)?;

            let name = &captures[1];
            let placeholder = Placeholder::from_name(name)
                .ok_or_else(|| TemplateError::UnknownPlaceholder(name.to_string()))?;
            segments.push(Segment::Placeholder(placeholder));
            cursor = whole.end();
        }
        push_literal(&mut segments, &source[cursor..], cursor)?;

        Ok(Self { segments })
    }

    /// Placeholders in order of appearance (repeats included)
    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(p) => Some(*p),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_placeholders(&self) -> bool {
        self.placeholders().next().is_some()
    }

    /// Fails with the first placeholder not contained in `allowed`
    pub fn restrict_to(&self, allowed: &[Placeholder]) -> Result<(), TemplateError> {
        match self.placeholders().find(|p| !allowed.contains(p)) {
            Some(placeholder) => Err(TemplateError::NotAllowed(placeholder)),
            None => Ok(()),
        }
    }

    /// Concatenation of the literal segments
    pub fn literal_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Literal(text) => Some(text.as_str()),
                Segment::Placeholder(_) => None,
            })
            .collect()
    }

    /// Substitute every placeholder using `bind`
    pub fn render<F>(&self, mut bind: F) -> Result<String, TemplateError>
    where
        F: FnMut(Placeholder) -> Option<String>,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(placeholder) => {
                    let value = bind(*placeholder).ok_or(TemplateError::Unbound(*placeholder))?;
                    out.push_str(&value);
                }
            }
        }
        Ok(out)
    }
}

fn push_literal(
    segments: &mut Vec<Segment>,
    text: &str,
    offset: usize,
) -> Result<(), TemplateError> {
    if let Some(position) = text.find("{{").or_else(|| text.find("}}")) {
        return Err(TemplateError::UnbalancedBraces(offset + position));
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_render_uuid() {
        let template = Template::parse("https://example.org/{{uuid}}").unwrap();
        let rendered = template
            .render(|p| (p == Placeholder::Uuid).then(|| "abc-123".to_string()))
            .unwrap();

        assert_eq!(rendered, "https://example.org/abc-123");
    }

    #[test]
    fn test_whitespace_inside_braces_is_tolerated() {
        let template = Template::parse("gn-{{ id }}-{{uuid }}").unwrap();
        let placeholders: Vec<_> = template.placeholders().collect();

        assert_eq!(placeholders, vec![Placeholder::Id, Placeholder::Uuid]);
        assert_eq!(template.literal_text(), "gn--");
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        assert_eq!(
            Template::parse("{{recordUrl}}"),
            Err(TemplateError::UnknownPlaceholder("recordUrl".to_string()))
        );
    }

    #[test]
    fn test_stray_braces_rejected() {
        assert_eq!(
            Template::parse("prefix-{{uuid"),
            Err(TemplateError::UnbalancedBraces(7))
        );
        assert!(matches!(
            Template::parse("x}}{{uuid}}"),
            Err(TemplateError::UnbalancedBraces(1))
        ));
    }

    #[test]
    fn test_template_without_placeholders() {
        let template = Template::parse("static").unwrap();
        assert!(!template.has_placeholders());
        assert_eq!(template.render(|_| None).unwrap(), "static");
    }

    #[test]
    fn test_restrict_to() {
        let template = Template::parse("{{uuid}}/{{id}}").unwrap();

        assert!(template.restrict_to(&[Placeholder::Uuid, Placeholder::Id]).is_ok());
        assert_eq!(
            template.restrict_to(&[Placeholder::Uuid]),
            Err(TemplateError::NotAllowed(Placeholder::Id))
        );
    }

    #[test]
    fn test_unbound_placeholder_fails_render() {
        let template = Template::parse("{{id}}").unwrap();
        assert_eq!(
            template.render(|_| None),
            Err(TemplateError::Unbound(Placeholder::Id))
        );
    }

    #[test]
    fn test_placeholder_display() {
        assert_eq!(Placeholder::Uuid.to_string(), "{{uuid}}");
    }
}
