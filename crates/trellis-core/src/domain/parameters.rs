//! Template parameters.
//!
//! `TemplateParameters` is the untyped, immutable name → value mapping the
//! renderer consumes. `ProjectParameters` is the typed view the CLI fills in;
//! it flattens into `TemplateParameters` exactly once per run.

use std::collections::BTreeMap;

use crate::domain::value_objects::DatabaseEngine;

pub const PROJECT_NAME: &str = "project_name";
pub const SECRET_KEY: &str = "secret_key";
pub const DEBUG: &str = "debug";
pub const ALLOWED_HOSTS: &str = "allowed_hosts";
pub const DB_ENGINE: &str = "db_engine";
pub const DB_NAME: &str = "db_name";
pub const DB_USER: &str = "db_user";
pub const DB_PASSWORD: &str = "db_password";
pub const DB_HOST: &str = "db_host";
pub const DB_PORT: &str = "db_port";
pub const EMAIL_HOST: &str = "email_host";
pub const EMAIL_PORT: &str = "email_port";
pub const EMAIL_HOST_USER: &str = "email_host_user";
pub const EMAIL_HOST_PASSWORD: &str = "email_host_password";
pub const EMAIL_USE_TLS: &str = "email_use_tls";
pub const REDIS_URL: &str = "redis_url";
pub const LOG_LEVEL: &str = "log_level";
pub const TIME_ZONE: &str = "time_zone";
pub const VENV_DIR: &str = "venv_dir";
pub const DJANGO_REQUIREMENT: &str = "django_requirement";

/// Immutable parameter mapping. Build it with [`TemplateParameters::builder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateParameters {
    values: BTreeMap<String, String>,
}

impl TemplateParameters {
    pub fn builder() -> TemplateParametersBuilder {
        TemplateParametersBuilder::default()
    }

    /// Start a new builder seeded with these values.
    pub fn to_builder(&self) -> TemplateParametersBuilder {
        TemplateParametersBuilder {
            values: self.values.clone(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateParametersBuilder {
    values: BTreeMap<String, String>,
}

impl TemplateParametersBuilder {
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn remove(mut self, name: &str) -> Self {
        self.values.remove(name);
        self
    }

    pub fn build(self) -> TemplateParameters {
        TemplateParameters {
            values: self.values,
        }
    }
}

/// Typed project inputs with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectParameters {
    pub project_name: String,
    pub secret_key: String,
    pub debug: bool,
    pub allowed_hosts: Vec<String>,
    pub db_engine: DatabaseEngine,
    pub db_name: Option<String>,
    pub db_user: String,
    pub db_password: String,
    pub db_host: String,
    pub db_port: Option<String>,
    pub email_host: String,
    pub email_port: u16,
    pub email_host_user: String,
    pub email_host_password: String,
    pub email_use_tls: bool,
    pub redis_url: String,
    pub log_level: String,
    pub time_zone: String,
    pub venv_dir: String,
    pub django_requirement: String,
}

impl ProjectParameters {
    pub fn new(project_name: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            secret_key: secret_key.into(),
            debug: true,
            allowed_hosts: vec!["localhost".into(), "127.0.0.1".into()],
            db_engine: DatabaseEngine::default(),
            db_name: None,
            db_user: String::new(),
            db_password: String::new(),
            db_host: "localhost".into(),
            db_port: None,
            email_host: "localhost".into(),
            email_port: 587,
            email_host_user: String::new(),
            email_host_password: String::new(),
            email_use_tls: true,
            redis_url: "redis://localhost:6379/0".into(),
            log_level: "INFO".into(),
            time_zone: "UTC".into(),
            venv_dir: ".venv".into(),
            django_requirement: "Django>=6.0,<6.1".into(),
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_db_engine(mut self, engine: DatabaseEngine) -> Self {
        self.db_engine = engine;
        self
    }

    /// Flatten into the renderer's mapping.
    pub fn into_parameters(self) -> TemplateParameters {
        let db_name = self
            .db_name
            .unwrap_or_else(|| self.db_engine.default_name(&self.project_name));
        let db_port = self
            .db_port
            .unwrap_or_else(|| self.db_engine.default_port().to_string());

        TemplateParameters::builder()
            .set(PROJECT_NAME, self.project_name)
            .set(SECRET_KEY, self.secret_key)
            .set(DEBUG, python_bool(self.debug))
            .set(ALLOWED_HOSTS, self.allowed_hosts.join(","))
            .set(DB_ENGINE, self.db_engine.as_str())
            .set(DB_NAME, db_name)
            .set(DB_USER, self.db_user)
            .set(DB_PASSWORD, self.db_password)
            .set(DB_HOST, self.db_host)
            .set(DB_PORT, db_port)
            .set(EMAIL_HOST, self.email_host)
            .set(EMAIL_PORT, self.email_port.to_string())
            .set(EMAIL_HOST_USER, self.email_host_user)
            .set(EMAIL_HOST_PASSWORD, self.email_host_password)
            .set(EMAIL_USE_TLS, python_bool(self.email_use_tls))
            .set(REDIS_URL, self.redis_url)
            .set(LOG_LEVEL, self.log_level)
            .set(TIME_ZONE, self.time_zone)
            .set(VENV_DIR, self.venv_dir)
            .set(DJANGO_REQUIREMENT, self.django_requirement)
            .build()
    }
}

fn python_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_with_engine_defaults() {
        let params = ProjectParameters::new("demo", "s3cret")
            .with_db_engine(DatabaseEngine::Postgresql)
            .into_parameters();

        assert_eq!(params.get(DB_ENGINE), Some("postgresql"));
        assert_eq!(params.get(DB_NAME), Some("demo"));
        assert_eq!(params.get(DB_PORT), Some("5432"));
        assert_eq!(params.get(DEBUG), Some("True"));
        assert_eq!(params.get(ALLOWED_HOSTS), Some("localhost,127.0.0.1"));
    }

    #[test]
    fn sqlite_defaults_to_local_file() {
        let params = ProjectParameters::new("demo", "x").into_parameters();
        assert_eq!(params.get(DB_NAME), Some("db.sqlite3"));
        assert_eq!(params.get(DB_PORT), Some(""));
    }

    #[test]
    fn builder_remove_drops_binding() {
        let params = ProjectParameters::new("demo", "x").into_parameters();
        let without = params.to_builder().remove(SECRET_KEY).build();

        assert!(params.contains(SECRET_KEY));
        assert!(!without.contains(SECRET_KEY));
        assert_eq!(without.len(), params.len() - 1);
    }
}
