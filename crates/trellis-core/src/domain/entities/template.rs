//! Template identifiers and the placeholder engine.
//!
//! The engine understands exactly two constructs:
//!
//! - `{{name}}`: substituted with the bound parameter value, verbatim.
//! - `{{#env tag[,tag]}} ... {{/env}}`: kept only when the render's section
//!   tag is listed. Sections do not nest.
//!
//! Every placeholder must be bound, including placeholders inside sections
//! that end up dropped, so a template either renders for every environment
//! or for none.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;
use crate::domain::parameters::TemplateParameters;
use crate::domain::value_objects::Environment;

/// Identifies one fixed blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateId {
    Env,
    Gitignore,
    Manage,
    Urls,
    Wsgi,
    Asgi,
    SettingsInit,
    SettingsBase,
    Settings(Environment),
    RequirementsBase,
    Requirements(Environment),
}

impl TemplateId {
    /// Every template the blueprint knows, in render order.
    pub fn all() -> Vec<TemplateId> {
        let mut ids = vec![
            Self::Env,
            Self::Gitignore,
            Self::Manage,
            Self::Urls,
            Self::Wsgi,
            Self::Asgi,
            Self::SettingsInit,
            Self::SettingsBase,
        ];
        ids.extend(Environment::ALL.into_iter().map(Self::Settings));
        ids.push(Self::RequirementsBase);
        ids.extend(
            Environment::ALL
                .into_iter()
                .filter(Environment::has_manifest)
                .map(Self::Requirements),
        );
        ids
    }

    /// Tag matched against `{{#env ...}}` sections.
    pub fn section_tag(&self) -> Option<&'static str> {
        match self {
            Self::RequirementsBase | Self::SettingsBase => Some("base"),
            Self::Requirements(env) | Self::Settings(env) => Some(env.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env => f.write_str("env"),
            Self::Gitignore => f.write_str("gitignore"),
            Self::Manage => f.write_str("manage"),
            Self::Urls => f.write_str("urls"),
            Self::Wsgi => f.write_str("wsgi"),
            Self::Asgi => f.write_str("asgi"),
            Self::SettingsInit => f.write_str("settings-init"),
            Self::SettingsBase => f.write_str("settings-base"),
            Self::Settings(env) => write!(f, "settings-{}", env),
            Self::RequirementsBase => f.write_str("requirements-base"),
            Self::Requirements(env) => write!(f, "requirements-{}", env),
        }
    }
}

impl FromStr for TemplateId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        TemplateId::all()
            .into_iter()
            .find(|id| id.to_string() == lowered)
            .ok_or_else(|| DomainError::UnknownTemplate(s.to_string()))
    }
}

/// Expand `source` against `params`.
///
/// `template` names the source in errors. `tag` selects which `{{#env}}`
/// sections survive; `None` drops all of them.
pub fn render_source(
    template: &str,
    source: &str,
    params: &TemplateParameters,
    tag: Option<&str>,
) -> Result<String, DomainError> {
    let malformed = |offset: usize, reason: &str| DomainError::MalformedTemplate {
        template: template.to_string(),
        reason: format!("{} (line {})", reason, line_of(source, offset)),
    };

    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    // Some(active) while inside a section.
    let mut section: Option<bool> = None;

    while let Some(start) = rest.find("{{") {
        let emitting = section.unwrap_or(true);
        if emitting {
            out.push_str(&rest[..start]);
        }

        let offset = source.len() - rest.len() + start;
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| malformed(offset, "unterminated '{{'"))?;
        let directive = after[..end].trim();
        rest = &after[end + 2..];

        if let Some(list) = directive.strip_prefix("#env") {
            if section.is_some() {
                return Err(malformed(offset, "sections cannot nest"));
            }
            let mut tags = list.split(',').map(str::trim).filter(|t| !t.is_empty()).peekable();
            if tags.peek().is_none() {
                return Err(malformed(offset, "section lists no environment tags"));
            }
            let active = tag.is_some_and(|wanted| tags.any(|t| t == wanted));
            section = Some(active);
            rest = strip_newline(rest);
        } else if directive == "/env" {
            if section.take().is_none() {
                return Err(malformed(offset, "'{{/env}}' without an open section"));
            }
            rest = strip_newline(rest);
        } else {
            if directive.is_empty()
                || !directive
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(malformed(
                    offset,
                    &format!("'{}' is not a valid placeholder", directive),
                ));
            }
            let value = params.get(directive).ok_or_else(|| {
                DomainError::MissingTemplateParameter {
                    template: template.to_string(),
                    parameter: directive.to_string(),
                }
            })?;
            if emitting {
                out.push_str(value);
            }
        }
    }

    if section.is_some() {
        return Err(malformed(source.len(), "section is never closed"));
    }
    out.push_str(rest);
    Ok(out)
}

fn strip_newline(s: &str) -> &str {
    s.strip_prefix("\r\n")
        .or_else(|| s.strip_prefix('\n'))
        .unwrap_or(s)
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())].matches('\n').count() + 1
}
