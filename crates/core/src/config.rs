//! TOML-based configuration system for tnsync.
//!
//! The LDAP bind password is never stored in the file. `bind_password_env`
//! names an environment variable that is read at runtime via
//! [`AppConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Local tnsnames.ora settings.
    pub tns: TnsConfig,

    /// Directory server connection settings.
    pub ldap: LdapConfig,

    /// Oracle Net directory schema names.
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// tnsnames
// ---------------------------------------------------------------------------

/// Where the local registry comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TnsConfig {
    /// Path to the top-level `tnsnames.ora`.
    pub file: PathBuf,

    /// Follow `IFILE=` directives (default true).
    #[serde(default = "default_true")]
    pub follow_ifile: bool,

    /// Domain appended to unqualified aliases. When unset, the
    /// `NAMES.DEFAULT_DOMAIN` of the neighbouring `sqlnet.ora` is used.
    #[serde(default)]
    pub default_domain: Option<String>,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// LDAP
// ---------------------------------------------------------------------------

/// Directory server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// Server URL, `ldap://` or `ldaps://`.
    pub url: String,

    /// DN to bind as. Empty means anonymous bind.
    #[serde(default)]
    pub bind_dn: String,

    /// Environment variable holding the bind password.
    #[serde(default)]
    pub bind_password_env: Option<String>,

    /// Naming context, e.g. `dc=example,dc=com`.
    pub base_dn: String,

    /// RDN of the Oracle context below `base_dn`.
    #[serde(default = "default_context")]
    pub context: String,

    /// Connect and per-operation timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Upgrade plain `ldap://` connections with StartTLS.
    #[serde(default)]
    pub starttls: bool,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub no_tls_verify: bool,

    /// Resolved bind password (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub bind_password: Option<String>,
}

fn default_context() -> String {
    "cn=OracleContext".into()
}
fn default_timeout() -> u64 {
    20
}

impl LdapConfig {
    /// DN of the container holding the service entries.
    pub fn container_dn(&self) -> String {
        if self.context.is_empty() {
            self.base_dn.clone()
        } else if self.base_dn.is_empty() {
            self.context.clone()
        } else {
            format!("{},{}", self.context, self.base_dn)
        }
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Object class and attribute names of the directory mirror.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaConfig {
    #[serde(default = "default_object_class")]
    pub object_class: String,

    #[serde(default = "default_name_attribute")]
    pub name_attribute: String,

    #[serde(default = "default_descriptor_attribute")]
    pub descriptor_attribute: String,

    #[serde(default = "default_alias_attribute")]
    pub alias_attribute: String,
}

fn default_object_class() -> String {
    "orclNetService".into()
}
fn default_name_attribute() -> String {
    "cn".into()
}
fn default_descriptor_attribute() -> String {
    "orclNetDescString".into()
}
fn default_alias_attribute() -> String {
    "aliasedObjectName".into()
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            object_class: default_object_class(),
            name_attribute: default_name_attribute(),
            descriptor_attribute: default_descriptor_attribute(),
            alias_attribute: default_alias_attribute(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve `*_env` fields from environment variables.
    ///
    /// A missing variable only logs a warning; an anonymous bind is still
    /// possible without a password.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref env_name) = self.ldap.bind_password_env {
            self.ldap.bind_password = resolve_optional_env(env_name, "ldap.bind_password_env");
        }
        Ok(())
    }

    /// Fail when a bind DN is configured but its password did not resolve.
    pub fn require_bind_password(&self) -> Result<(), ConfigError> {
        if self.ldap.bind_dn.is_empty() || self.ldap.bind_password.is_some() {
            return Ok(());
        }
        Err(ConfigError::EnvVarMissing {
            var: self
                .ldap
                .bind_password_env
                .clone()
                .unwrap_or_else(|| "<unset>".into()),
            field: "ldap.bind_password_env".into(),
        })
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tns.file.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tns.file".into(),
                detail: "tnsnames path must not be empty".into(),
            });
        }
        if !(self.ldap.url.starts_with("ldap://") || self.ldap.url.starts_with("ldaps://")) {
            return Err(ConfigError::InvalidValue {
                field: "ldap.url".into(),
                detail: "URL must start with ldap:// or ldaps://".into(),
            });
        }
        if self.ldap.base_dn.is_empty() && self.ldap.context.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ldap.base_dn".into(),
                detail: "base DN and context must not both be empty".into(),
            });
        }
        if self.ldap.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ldap.timeout_secs".into(),
                detail: "timeout must be > 0".into(),
            });
        }
        for (field, value) in [
            ("schema.object_class", &self.schema.object_class),
            ("schema.name_attribute", &self.schema.name_attribute),
            ("schema.descriptor_attribute", &self.schema.descriptor_attribute),
            ("schema.alias_attribute", &self.schema.alias_attribute),
        ] {
            if value.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: "must not be empty".into(),
                });
            }
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[tns]
file = "/opt/oracle/network/admin/tnsnames.ora"
follow_ifile = false
default_domain = "example.com"

[ldap]
url = "ldap://oid.example.com:389"
bind_dn = "cn=orcladmin"
bind_password_env = "TNSYNC_LDAP_PASSWORD"
base_dn = "dc=example,dc=com"
context = "cn=OracleContext"
timeout_secs = 5
starttls = true

[schema]
descriptor_attribute = "orclNetDescString"

[logging]
log_level = "debug"
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert!(!config.tns.follow_ifile);
        assert_eq!(config.tns.default_domain.as_deref(), Some("example.com"));
        assert_eq!(config.ldap.timeout_secs, 5);
        assert!(config.ldap.starttls);
        assert_eq!(config.logging.log_level, "debug");
        assert_eq!(config.ldap.container_dn(), "cn=OracleContext,dc=example,dc=com");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.ldap.bind_dn, "cn=orcladmin");
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.ldap.url = "oid.example.com".into();
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "ldap.url"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_schema_name() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.schema.object_class.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "schema.object_class"
        ));
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var("TEST_TNSYNC_BIND_PW", "s3cret");

        let toml_str = r#"
[tns]
file = "tnsnames.ora"
[ldap]
url = "ldaps://oid"
bind_dn = "cn=admin"
bind_password_env = "TEST_TNSYNC_BIND_PW"
base_dn = "dc=test"
"#;
        let mut config: AppConfig = toml::from_str(toml_str).unwrap();
        config.resolve_env_vars().unwrap();
        assert_eq!(config.ldap.bind_password.as_deref(), Some("s3cret"));
        assert!(config.require_bind_password().is_ok());

        std::env::remove_var("TEST_TNSYNC_BIND_PW");
    }

    #[test]
    fn test_missing_bind_password_is_reported() {
        let toml_str = r#"
[tns]
file = "tnsnames.ora"
[ldap]
url = "ldap://oid"
bind_dn = "cn=admin"
bind_password_env = "TEST_TNSYNC_UNSET_PW"
base_dn = "dc=test"
"#;
        let mut config: AppConfig = toml::from_str(toml_str).unwrap();
        config.resolve_env_vars().unwrap();
        assert!(matches!(
            config.require_bind_password(),
            Err(ConfigError::EnvVarMissing { ref var, .. }) if var == "TEST_TNSYNC_UNSET_PW"
        ));
    }

    #[test]
    fn test_defaults() {
        let minimal = r#"
[tns]
file = "tnsnames.ora"
[ldap]
url = "ldap://localhost"
base_dn = "dc=example,dc=com"
"#;
        let config: AppConfig = toml::from_str(minimal).unwrap();
        assert!(config.tns.follow_ifile);
        assert!(config.tns.default_domain.is_none());
        assert_eq!(config.ldap.context, "cn=OracleContext");
        assert_eq!(config.ldap.timeout_secs, 20);
        assert!(config.ldap.bind_dn.is_empty());
        assert_eq!(config.schema, SchemaConfig::default());
        assert_eq!(config.schema.descriptor_attribute, "orclNetDescString");
        assert_eq!(config.logging.log_level, "warn");
        assert!(config.validate().is_ok());
        assert!(config.require_bind_password().is_ok());
    }
}
