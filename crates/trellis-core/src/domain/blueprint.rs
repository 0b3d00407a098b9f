//! The Django project blueprint: template sources, the two scaffold plans and
//! the rendered result the orchestrator materializes.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::{
    entities::common::Permissions,
    entities::plan::{FileContent, ScaffoldPlan},
    entities::project_structure::ProjectStructure,
    entities::template::{TemplateId, render_source},
    error::DomainError,
    parameters::{PROJECT_NAME, TemplateParameters},
    settings,
    value_objects::Environment,
};

pub const ENV_FILE: &str = ".env";
pub const CREDENTIALS_DIR: &str = "credentials";
pub const CREDENTIALS_ENV_FILE: &str = "credentials/.env";
pub const MANAGE_PY: &str = "manage.py";

/// Directories created empty apart from a `.gitkeep` marker.
pub const ASSET_DIRS: [&str; 5] = ["apps", "static", "staticfiles", "templates", "media"];

// ── .env ─────────────────────────────────────────────────────────────────────

/// One `KEY=value` line of the environment file.
#[derive(Debug, Clone, Copy)]
pub struct EnvEntry {
    pub key: &'static str,
    pub value: &'static str,
    /// Single-quote the value so dotenv parsers keep `#` and friends.
    pub quoted: bool,
}

const fn entry(key: &'static str, value: &'static str, quoted: bool) -> EnvEntry {
    EnvEntry { key, value, quoted }
}

pub const ENV_FILE_ENTRIES: &[EnvEntry] = &[
    entry("SECRET_KEY", "{{secret_key}}", true),
    entry("DEBUG", "{{debug}}", false),
    entry("ALLOWED_HOSTS", "{{allowed_hosts}}", false),
    entry("DB_ENGINE", "django.db.backends.{{db_engine}}", false),
    entry("DB_NAME", "{{db_name}}", false),
    entry("DB_USER", "{{db_user}}", false),
    entry("DB_PASSWORD", "{{db_password}}", true),
    entry("DB_HOST", "{{db_host}}", false),
    entry("DB_PORT", "{{db_port}}", false),
    entry("EMAIL_HOST", "{{email_host}}", false),
    entry("EMAIL_PORT", "{{email_port}}", false),
    entry("EMAIL_HOST_USER", "{{email_host_user}}", false),
    entry("EMAIL_HOST_PASSWORD", "{{email_host_password}}", true),
    entry("EMAIL_USE_TLS", "{{email_use_tls}}", false),
    entry("REDIS_URL", "{{redis_url}}", false),
    entry("LOG_LEVEL", "{{log_level}}", false),
    entry("TIME_ZONE", "{{time_zone}}", false),
    entry("DJANGO_SETTINGS_MODULE", "{{project_name}}.settings.local", false),
];

const ENV_HEADER: &str = "\
# Environment for {{project_name}}, generated by trellis.
# credentials/.env links to this file. Keep both out of version control.

";

fn env_source() -> String {
    let mut out = String::from(ENV_HEADER);
    for entry in ENV_FILE_ENTRIES {
        let value = if entry.quoted {
            format!("'{}'", entry.value)
        } else {
            entry.value.to_string()
        };
        out.push_str(&format!("{}={}\n", entry.key, value));
    }
    out
}

/// Values are substituted first and quoted afterwards, so a `'` inside a
/// password cannot end the quoted value early.
fn render_env(params: &TemplateParameters) -> Result<String, DomainError> {
    let name = TemplateId::Env.to_string();
    let mut out = render_source(&name, ENV_HEADER, params, None)?;
    for entry in ENV_FILE_ENTRIES {
        let value = render_source(&name, entry.value, params, None)?;
        out.push_str(entry.key);
        out.push('=');
        if entry.quoted {
            out.push_str(&single_quoted(&value));
        } else {
            out.push_str(&value);
        }
        out.push('\n');
    }
    Ok(out)
}

/// Single-quote `value` the way python-dotenv reads it back: `\` and `'`
/// get a backslash.
fn single_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if matches!(c, '\\' | '\'') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

// ── Static sources ───────────────────────────────────────────────────────────

const GITIGNORE: &str = "\
# Secrets
.env
credentials/

# Virtual environment
{{venv_dir}}/

# Python
__pycache__/
*.py[cod]

# Local data
db.sqlite3
staticfiles/
media/
";

const MANAGE: &str = r#"#!/usr/bin/env python
"""Django's command-line utility for administrative tasks."""
import os
import sys
from pathlib import Path

from dotenv import load_dotenv


def main():
    """Run administrative tasks."""
    load_dotenv(Path(__file__).resolve().parent / ".env")
    os.environ.setdefault("DJANGO_SETTINGS_MODULE", "{{project_name}}.settings.local")
    try:
        from django.core.management import execute_from_command_line
    except ImportError as exc:
        raise ImportError(
            "Couldn't import Django. Are you sure it's installed and "
            "available on your PYTHONPATH environment variable? Did you "
            "forget to activate a virtual environment?"
        ) from exc
    execute_from_command_line(sys.argv)


if __name__ == "__main__":
    main()
"#;

const URLS: &str = r#""""URL configuration for {{project_name}}."""

from django.contrib import admin
from django.urls import path

urlpatterns = [
    path("admin/", admin.site.urls),
]
"#;

const WSGI: &str = r#""""WSGI config for {{project_name}}."""

import os

from django.core.wsgi import get_wsgi_application

os.environ.setdefault("DJANGO_SETTINGS_MODULE", "{{project_name}}.settings.production")

application = get_wsgi_application()
"#;

const ASGI: &str = r#""""ASGI config for {{project_name}}."""

import os

from django.core.asgi import get_asgi_application

os.environ.setdefault("DJANGO_SETTINGS_MODULE", "{{project_name}}.settings.production")

application = get_asgi_application()
"#;

const SETTINGS_INIT: &str = r#""""
Settings package for {{project_name}}.

Pick a module with DJANGO_SETTINGS_MODULE, e.g. {{project_name}}.settings.local.
"""
"#;

const REQUIREMENTS: &str = "\
{{#env base}}
# Shared by every environment.
{{django_requirement}}
python-dotenv>=1.0
psycopg[binary]>=3.2
redis>=5.0
{{/env}}
{{#env local,staging,production}}
-r base.txt
{{/env}}
{{#env local}}

# Local development
ruff>=0.6
pytest-django>=4.9
ipython>=8.0
{{/env}}
{{#env staging,production}}

# Deployment
gunicorn>=23.0
whitenoise>=6.7
{{/env}}
{{#env production}}
sentry-sdk>=2.0
{{/env}}
";

impl TemplateId {
    /// Unrendered source text.
    pub fn source(&self) -> Cow<'static, str> {
        match self {
            Self::Env => Cow::Owned(env_source()),
            Self::Gitignore => Cow::Borrowed(GITIGNORE),
            Self::Manage => Cow::Borrowed(MANAGE),
            Self::Urls => Cow::Borrowed(URLS),
            Self::Wsgi => Cow::Borrowed(WSGI),
            Self::Asgi => Cow::Borrowed(ASGI),
            Self::SettingsInit => Cow::Borrowed(SETTINGS_INIT),
            Self::SettingsBase => Cow::Owned(settings::base().to_source()),
            Self::Settings(env) => Cow::Owned(settings::variant(*env).to_source()),
            Self::RequirementsBase | Self::Requirements(_) => Cow::Borrowed(REQUIREMENTS),
        }
    }

    /// Render this template. Pure: the same parameters always give the same text.
    pub fn render(&self, params: &TemplateParameters) -> Result<String, DomainError> {
        match self {
            Self::Env => render_env(params),
            _ => render_source(&self.to_string(), &self.source(), params, self.section_tag()),
        }
    }
}

// ── Plans ────────────────────────────────────────────────────────────────────

/// Settings package, manifests, entry points and asset directories.
pub fn structure_plan(package: &str) -> Result<ScaffoldPlan, DomainError> {
    let settings_dir = format!("{}/settings", package);
    let mut builder = ScaffoldPlan::builder()
        .dir(package)
        .empty(format!("{}/__init__.py", package))
        .template(format!("{}/urls.py", package), TemplateId::Urls)
        .template(format!("{}/wsgi.py", package), TemplateId::Wsgi)
        .template(format!("{}/asgi.py", package), TemplateId::Asgi)
        .dir(&settings_dir)
        .template(format!("{}/__init__.py", settings_dir), TemplateId::SettingsInit)
        .template(format!("{}/base.py", settings_dir), TemplateId::SettingsBase);
    for env in Environment::ALL {
        builder = builder.template(
            format!("{}/{}.py", settings_dir, env),
            TemplateId::Settings(env),
        );
    }

    builder = builder
        .dir("requirements")
        .template("requirements/base.txt", TemplateId::RequirementsBase);
    for env in Environment::ALL.into_iter().filter(Environment::has_manifest) {
        builder = builder.template(
            format!("requirements/{}.txt", env),
            TemplateId::Requirements(env),
        );
    }

    for dir in ASSET_DIRS {
        builder = builder.dir(dir);
        if dir == "apps" {
            builder = builder.empty("apps/__init__.py");
        }
        builder = builder.empty(format!("{}/.gitkeep", dir));
    }

    // Last, so a stock manage.py means the structure was never finished.
    builder
        .file_with(
            MANAGE_PY,
            FileContent::Template(TemplateId::Manage),
            Permissions::executable(),
        )
        .build()
}

/// The environment file, its credentials link and `.gitignore`.
pub fn environment_plan() -> Result<ScaffoldPlan, DomainError> {
    ScaffoldPlan::builder()
        .dir_with(CREDENTIALS_DIR, Permissions::restricted())
        .file_with(
            ENV_FILE,
            FileContent::Template(TemplateId::Env),
            Permissions::restricted(),
        )
        .link(CREDENTIALS_ENV_FILE, ENV_FILE)
        .template(".gitignore", TemplateId::Gitignore)
        .build()
}

// ── Rendered blueprint ───────────────────────────────────────────────────────

/// Everything a run writes, rendered up front.
#[derive(Debug, Clone)]
pub struct RenderedBlueprint {
    pub package: String,
    pub structure: ProjectStructure,
    pub environment: ProjectStructure,
    /// Unquoted values of the environment file, keyed like the file.
    pub env_vars: BTreeMap<String, String>,
}

impl RenderedBlueprint {
    /// Render both plans. Fails before anything touches the filesystem when a
    /// parameter is missing or the project name is unusable.
    pub fn render(root: &Path, params: &TemplateParameters) -> Result<Self, DomainError> {
        let package = params
            .get(PROJECT_NAME)
            .ok_or_else(|| DomainError::MissingTemplateParameter {
                template: "blueprint".into(),
                parameter: PROJECT_NAME.into(),
            })?
            .to_string();
        validate_project_name(&package)?;

        let structure = structure_plan(&package)?.render(root, params)?;
        let environment = environment_plan()?.render(root, params)?;

        let mut env_vars = BTreeMap::new();
        for entry in ENV_FILE_ENTRIES {
            let value = render_source(entry.key, entry.value, params, None)?;
            env_vars.insert(entry.key.to_string(), value);
        }

        Ok(Self {
            package,
            structure,
            environment,
            env_vars,
        })
    }

    /// Every entry, structure first.
    pub fn entries(&self) -> impl Iterator<Item = &crate::domain::FsEntry> {
        self.structure
            .entries()
            .iter()
            .chain(self.environment.entries())
    }
}

/// Parse `KEY=value` lines the way dotenv does for the subset this tool
/// writes: comments and blank lines are ignored, `export ` is accepted and one
/// layer of matching quotes is removed.
pub fn parse_env_file(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let value = value.trim();
            let unquoted = if let Some(inner) = strip_quotes(value, '\'') {
                unescape_single_quoted(inner)
            } else {
                strip_quotes(value, '"').unwrap_or(value).to_string()
            };
            Some((key.trim().to_string(), unquoted))
        })
        .collect()
}

fn strip_quotes(value: &str, quote: char) -> Option<&str> {
    value
        .strip_prefix(quote)
        .and_then(|v| v.strip_suffix(quote))
        .filter(|_| value.len() >= 2)
}

fn unescape_single_quoted(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('\\', Some(&next)) if matches!(next, '\\' | '\'') => {
                out.push(next);
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Module names a project package would shadow.
const RESERVED_NAMES: &[&str] = &["django", "test", "site", "os", "sys", "settings", "apps"];

/// The project name doubles as the Python package name.
pub fn validate_project_name(name: &str) -> Result<(), DomainError> {
    let invalid = |reason: &str| DomainError::InvalidProjectName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = name.chars();
    match chars.next() {
        None => return Err(invalid("must not be empty")),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
            return Err(invalid("must start with a letter or underscore"));
        }
        _ => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("may only contain letters, digits and underscores"));
    }
    if PYTHON_KEYWORDS.contains(&name) {
        return Err(invalid("is a Python keyword"));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(invalid("would shadow an existing Python module"));
    }
    Ok(())
}
