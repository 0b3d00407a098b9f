//! Settings modules as explicit composition.
//!
//! A [`SettingsModule`] is an ordered record of top-level assignments. Each
//! environment variant is the base record with an ordered override list
//! applied: an override replaces the assignment in place when the key exists
//! and appends it otherwise. Applying the same key twice keeps the last value.
//!
//! Variant modules are emitted fully composed, so every generated settings
//! file is self-contained and its precedence can be read top to bottom.

use crate::domain::value_objects::Environment;

/// One top-level `KEY = value` assignment. The value is Python source and may
/// contain template placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub key: String,
    pub value: String,
}

impl Assignment {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsModule {
    preamble: String,
    entries: Vec<Assignment>,
}

impl SettingsModule {
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            preamble: preamble.into(),
            entries: Vec::new(),
        }
    }

    /// Replace in place or append.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let assignment = Assignment::new(key, value);
        match self.entries.iter_mut().find(|e| e.key == assignment.key) {
            Some(existing) => existing.value = assignment.value,
            None => self.entries.push(assignment),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Apply overrides in order.
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = Assignment>) -> Self {
        for Assignment { key, value } in overrides {
            self.set(key, value);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Python source for this module.
    pub fn to_source(&self) -> String {
        let mut out = String::with_capacity(self.preamble.len() + self.entries.len() * 64);
        out.push_str(self.preamble.trim_end());
        out.push('\n');
        for entry in &self.entries {
            out.push('\n');
            out.push_str(&entry.key);
            out.push_str(" = ");
            out.push_str(entry.value.trim_end());
            out.push('\n');
        }
        out
    }
}

// ── Django blueprint ─────────────────────────────────────────────────────────

const PREAMBLE: &str = r#""""
Django settings for {{project_name}}.

Generated by trellis. Each module in this package is the base settings with
an explicit list of overrides applied; select one with DJANGO_SETTINGS_MODULE.
"""

import os
from pathlib import Path

from django.utils.csp import CSP

BASE_DIR = Path(__file__).resolve().parent.parent.parent
"#;

const DATABASES_FROM_ENV: &str = r#"{
    "default": {
        "ENGINE": os.environ.get("DB_ENGINE", "django.db.backends.{{db_engine}}"),
        "NAME": os.environ.get("DB_NAME", "{{db_name}}"),
        "USER": os.environ.get("DB_USER", ""),
        "PASSWORD": os.environ.get("DB_PASSWORD", ""),
        "HOST": os.environ.get("DB_HOST", ""),
        "PORT": os.environ.get("DB_PORT", ""),
    }
}"#;

const ALLOWED_HOSTS_FROM_ENV: &str = r#"[
    host.strip()
    for host in os.environ.get("ALLOWED_HOSTS", "").split(",")
    if host.strip()
]"#;

/// The base module every variant starts from.
pub fn base() -> SettingsModule {
    SettingsModule::new(PREAMBLE)
        .with("SECRET_KEY", r#"os.environ["SECRET_KEY"]"#)
        .with("DEBUG", r#"os.environ.get("DEBUG", "False") == "True""#)
        .with("ALLOWED_HOSTS", ALLOWED_HOSTS_FROM_ENV)
        .with(
            "INSTALLED_APPS",
            r#"[
    "django.contrib.admin",
    "django.contrib.auth",
    "django.contrib.contenttypes",
    "django.contrib.sessions",
    "django.contrib.messages",
    "django.contrib.staticfiles",
]"#,
        )
        .with(
            "MIDDLEWARE",
            r#"[
    "django.middleware.security.SecurityMiddleware",
    "django.middleware.csp.ContentSecurityPolicyMiddleware",
    "django.contrib.sessions.middleware.SessionMiddleware",
    "django.middleware.common.CommonMiddleware",
    "django.middleware.csrf.CsrfViewMiddleware",
    "django.contrib.auth.middleware.AuthenticationMiddleware",
    "django.contrib.messages.middleware.MessageMiddleware",
    "django.middleware.clickjacking.XFrameOptionsMiddleware",
]"#,
        )
        .with("ROOT_URLCONF", r#""{{project_name}}.urls""#)
        .with(
            "TEMPLATES",
            r#"[
    {
        "BACKEND": "django.template.backends.django.DjangoTemplates",
        "DIRS": [BASE_DIR / "templates"],
        "APP_DIRS": True,
        "OPTIONS": {
            "context_processors": [
                "django.template.context_processors.request",
                "django.contrib.auth.context_processors.auth",
                "django.contrib.messages.context_processors.messages",
                "django.template.context_processors.csp",
            ],
        },
    },
]"#,
        )
        .with("WSGI_APPLICATION", r#""{{project_name}}.wsgi.application""#)
        .with("ASGI_APPLICATION", r#""{{project_name}}.asgi.application""#)
        .with("DATABASES", DATABASES_FROM_ENV)
        .with(
            "CACHES",
            r#"{
    "default": {
        "BACKEND": "django.core.cache.backends.redis.RedisCache",
        "LOCATION": os.environ.get("REDIS_URL", "{{redis_url}}"),
    }
}"#,
        )
        .with(
            "AUTH_PASSWORD_VALIDATORS",
            r#"[
    {"NAME": "django.contrib.auth.password_validation.UserAttributeSimilarityValidator"},
    {"NAME": "django.contrib.auth.password_validation.MinimumLengthValidator"},
    {"NAME": "django.contrib.auth.password_validation.CommonPasswordValidator"},
    {"NAME": "django.contrib.auth.password_validation.NumericPasswordValidator"},
]"#,
        )
        .with("LANGUAGE_CODE", r#""en-us""#)
        .with("TIME_ZONE", r#"os.environ.get("TIME_ZONE", "{{time_zone}}")"#)
        .with("USE_I18N", "True")
        .with("USE_TZ", "True")
        .with("STATIC_URL", r#""static/""#)
        .with("STATICFILES_DIRS", r#"[BASE_DIR / "static"]"#)
        .with("STATIC_ROOT", r#"BASE_DIR / "staticfiles""#)
        .with("MEDIA_URL", r#""media/""#)
        .with("MEDIA_ROOT", r#"BASE_DIR / "media""#)
        .with("DEFAULT_AUTO_FIELD", r#""django.db.models.BigAutoField""#)
        .with("EMAIL_BACKEND", r#""django.core.mail.backends.smtp.EmailBackend""#)
        .with("EMAIL_HOST", r#"os.environ.get("EMAIL_HOST", "{{email_host}}")"#)
        .with("EMAIL_PORT", r#"int(os.environ.get("EMAIL_PORT", "{{email_port}}"))"#)
        .with("EMAIL_HOST_USER", r#"os.environ.get("EMAIL_HOST_USER", "")"#)
        .with("EMAIL_HOST_PASSWORD", r#"os.environ.get("EMAIL_HOST_PASSWORD", "")"#)
        .with(
            "EMAIL_USE_TLS",
            r#"os.environ.get("EMAIL_USE_TLS", "{{email_use_tls}}") == "True""#,
        )
        .with(
            "SECURE_CSP",
            r#"{
    "default-src": [CSP.SELF],
    "script-src": [CSP.SELF, CSP.NONCE],
    "style-src": [CSP.SELF, CSP.NONCE],
    "img-src": [CSP.SELF, "data:"],
    "object-src": [CSP.NONE],
    "frame-ancestors": [CSP.NONE],
}"#,
        )
        .with(
            "TASKS",
            r#"{
    "default": {
        "BACKEND": "django.tasks.backends.immediate.ImmediateBackend",
    }
}"#,
        )
        .with(
            "LOGGING",
            r#"{
    "version": 1,
    "disable_existing_loggers": False,
    "handlers": {
        "console": {"class": "logging.StreamHandler"},
    },
    "root": {
        "handlers": ["console"],
        "level": os.environ.get("LOG_LEVEL", "{{log_level}}"),
    },
}"#,
        )
}

/// Ordered overrides for one environment.
pub fn overrides(env: Environment) -> Vec<Assignment> {
    match env {
        Environment::Local => vec![
            Assignment::new("DEBUG", "True"),
            Assignment::new("ALLOWED_HOSTS", r#"["localhost", "127.0.0.1", "[::1]"]"#),
            Assignment::new(
                "DATABASES",
                r#"{
    "default": {
        "ENGINE": os.environ.get("DB_ENGINE", "django.db.backends.{{db_engine}}"),
        "NAME": os.environ.get("DB_NAME", "{{db_name}}"),
        "USER": os.environ.get("DB_USER", ""),
        "PASSWORD": os.environ.get("DB_PASSWORD", ""),
        "HOST": os.environ.get("DB_HOST", "localhost"),
        "PORT": os.environ.get("DB_PORT", ""),
        "CONN_MAX_AGE": 0,
    }
}"#,
            ),
            Assignment::new(
                "EMAIL_BACKEND",
                r#""django.core.mail.backends.console.EmailBackend""#,
            ),
            Assignment::new(
                "SECURE_CSP",
                r#"{
    "default-src": [CSP.SELF],
    "script-src": [CSP.SELF, CSP.NONCE, CSP.UNSAFE_EVAL],
    "style-src": [CSP.SELF, CSP.UNSAFE_INLINE],
    "img-src": [CSP.SELF, "data:"],
}"#,
            ),
            Assignment::new(
                "TASKS",
                r#"{
    "default": {
        "BACKEND": "django.tasks.backends.immediate.ImmediateBackend",
    }
}"#,
            ),
        ],
        Environment::Staging => vec![
            Assignment::new("DEBUG", "False"),
            Assignment::new("ALLOWED_HOSTS", ALLOWED_HOSTS_FROM_ENV),
            Assignment::new("DATABASES", production_databases()),
            Assignment::new(
                "EMAIL_BACKEND",
                r#""django.core.mail.backends.smtp.EmailBackend""#,
            ),
            Assignment::new(
                "SECURE_CSP_REPORT_ONLY",
                r#"{
    "default-src": [CSP.SELF],
    "script-src": [CSP.SELF, CSP.NONCE],
    "style-src": [CSP.SELF, CSP.NONCE],
    "object-src": [CSP.NONE],
}"#,
            ),
            Assignment::new(
                "SECURE_CSP",
                r#"{
    "default-src": [CSP.SELF],
    "script-src": [CSP.SELF, CSP.NONCE],
    "style-src": [CSP.SELF, CSP.NONCE, CSP.UNSAFE_INLINE],
    "img-src": [CSP.SELF, "data:"],
    "object-src": [CSP.NONE],
}"#,
            ),
            Assignment::new(
                "TASKS",
                r#"{
    "default": {
        "BACKEND": "django.tasks.backends.immediate.ImmediateBackend",
        "ENQUEUE_ON_COMMIT": True,
    }
}"#,
            ),
        ],
        Environment::Production => vec![
            Assignment::new("DEBUG", "False"),
            Assignment::new("ALLOWED_HOSTS", ALLOWED_HOSTS_FROM_ENV),
            Assignment::new("DATABASES", production_databases()),
            Assignment::new(
                "EMAIL_BACKEND",
                r#""django.core.mail.backends.smtp.EmailBackend""#,
            ),
            Assignment::new(
                "SECURE_CSP",
                r#"{
    "default-src": [CSP.SELF],
    "script-src": [CSP.SELF, CSP.NONCE],
    "style-src": [CSP.SELF, CSP.NONCE],
    "img-src": [CSP.SELF],
    "object-src": [CSP.NONE],
    "base-uri": [CSP.SELF],
    "frame-ancestors": [CSP.NONE],
    "upgrade-insecure-requests": True,
}"#,
            ),
            Assignment::new(
                "TASKS",
                r#"{
    "default": {
        "BACKEND": "django.tasks.backends.immediate.ImmediateBackend",
        "ENQUEUE_ON_COMMIT": True,
    }
}"#,
            ),
            Assignment::new("SECURE_SSL_REDIRECT", "True"),
            Assignment::new("SESSION_COOKIE_SECURE", "True"),
            Assignment::new("CSRF_COOKIE_SECURE", "True"),
            Assignment::new("SECURE_HSTS_SECONDS", "31536000"),
            Assignment::new("SECURE_HSTS_INCLUDE_SUBDOMAINS", "True"),
        ],
        Environment::Testing => vec![
            Assignment::new("DEBUG", "False"),
            Assignment::new("ALLOWED_HOSTS", r#"["testserver", "localhost"]"#),
            Assignment::new(
                "DATABASES",
                r#"{
    "default": {
        "ENGINE": "django.db.backends.sqlite3",
        "NAME": ":memory:",
    }
}"#,
            ),
            Assignment::new(
                "EMAIL_BACKEND",
                r#""django.core.mail.backends.locmem.EmailBackend""#,
            ),
            Assignment::new("SECURE_CSP", "{}"),
            Assignment::new(
                "TASKS",
                r#"{
    "default": {
        "BACKEND": "django.tasks.backends.dummy.DummyBackend",
    }
}"#,
            ),
            Assignment::new(
                "PASSWORD_HASHERS",
                r#"["django.contrib.auth.hashers.MD5PasswordHasher"]"#,
            ),
        ],
    }
}

fn production_databases() -> &'static str {
    r#"{
    "default": {
        "ENGINE": os.environ.get("DB_ENGINE", "django.db.backends.{{db_engine}}"),
        "NAME": os.environ.get("DB_NAME", "{{db_name}}"),
        "USER": os.environ.get("DB_USER", ""),
        "PASSWORD": os.environ.get("DB_PASSWORD", ""),
        "HOST": os.environ.get("DB_HOST", ""),
        "PORT": os.environ.get("DB_PORT", ""),
        "CONN_MAX_AGE": 60,
        "CONN_HEALTH_CHECKS": True,
    }
}"#
}

/// The fully composed module for one environment.
pub fn variant(env: Environment) -> SettingsModule {
    base().with_overrides(overrides(env))
}

/// Keys every variant must override.
pub const OVERRIDDEN_KEYS: [&str; 6] = [
    "DEBUG",
    "ALLOWED_HOSTS",
    "DATABASES",
    "EMAIL_BACKEND",
    "SECURE_CSP",
    "TASKS",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let module = SettingsModule::new("")
            .with("A", "1")
            .with("B", "2")
            .with("A", "3");

        assert_eq!(module.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(module.get("A"), Some("3"));
    }

    #[test]
    fn overrides_are_last_write_wins() {
        let module = SettingsModule::new("").with("DEBUG", "False").with_overrides([
            Assignment::new("DEBUG", "True"),
            Assignment::new("EXTRA", "1"),
            Assignment::new("DEBUG", "None"),
        ]);

        assert_eq!(module.get("DEBUG"), Some("None"));
        assert_eq!(module.keys().collect::<Vec<_>>(), vec!["DEBUG", "EXTRA"]);
    }

    #[test]
    fn every_variant_overrides_the_fixed_keys() {
        for env in Environment::ALL {
            let keys: Vec<String> = overrides(env).into_iter().map(|a| a.key).collect();
            for key in OVERRIDDEN_KEYS {
                assert!(keys.iter().any(|k| k == key), "{env} does not override {key}");
            }
        }
    }

    #[test]
    fn testing_overrides_password_hashers() {
        assert!(variant(Environment::Testing).get("PASSWORD_HASHERS").is_some());
        assert!(variant(Environment::Local).get("PASSWORD_HASHERS").is_none());
    }

    #[test]
    fn production_appends_security_flags_after_base_keys() {
        let module = variant(Environment::Production);
        let keys: Vec<&str> = module.keys().collect();

        assert_eq!(module.get("DEBUG"), Some("False"));
        assert_eq!(keys.last(), Some(&"SECURE_HSTS_INCLUDE_SUBDOMAINS"));
        // DEBUG stays where the base put it.
        assert_eq!(keys.iter().position(|k| *k == "DEBUG"), Some(1));
    }

    #[test]
    fn source_lists_assignments_in_order() {
        let source = SettingsModule::new("# header\n")
            .with("A", "1")
            .with("B", "[\n    2,\n]\n")
            .to_source();

        assert_eq!(source, "# header\n\nA = 1\n\nB = [\n    2,\n]\n");
    }

    #[test]
    fn no_wildcard_imports() {
        for env in Environment::ALL {
            assert!(!variant(env).to_source().contains("import *"));
        }
    }
}
