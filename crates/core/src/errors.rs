//! Error types for the tnsync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Tns(#[from] TnsError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// tnsnames.ora errors
// ---------------------------------------------------------------------------

/// Errors from reading descriptor files.
#[derive(Debug, Error)]
pub enum TnsError {
    /// The file could not be opened or read.
    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is already being parsed further up the include chain.
    #[error("IFILE cycle detected at '{}'", path.display())]
    IncludeCycle { path: PathBuf },

    /// An alias filter is not a valid regular expression.
    #[error("invalid alias filter '{pattern}': {detail}")]
    InvalidPattern { pattern: String, detail: String },

    /// Writing a rendered tnsnames file failed.
    #[error("cannot write tnsnames output: {0}")]
    Write(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Directory errors
// ---------------------------------------------------------------------------

/// Errors from the LDAP directory collaborator.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The TCP/TLS connection could not be established.
    #[error("cannot connect to directory at '{url}': {detail}")]
    ConnectFailed { url: String, detail: String },

    /// The simple bind was rejected.
    #[error("directory bind failed for '{bind_dn}': {detail}")]
    BindFailed { bind_dn: String, detail: String },

    /// A search could not be executed or returned a non-success code.
    #[error("directory search under '{base}' failed: {detail}")]
    SearchFailed { base: String, detail: String },

    /// An add / modify / delete was rejected.
    #[error("directory {operation} on '{dn}' failed: {detail}")]
    OperationFailed {
        operation: &'static str,
        dn: String,
        detail: String,
    },

    /// The entry targeted by an operation does not exist.
    #[error("no such directory entry: {0}")]
    NoSuchEntry(String),

    /// The entry to add already exists.
    #[error("directory entry already exists: {0}")]
    AlreadyExists(String),

    /// Low-level protocol error from `ldap3`.
    #[error("LDAP protocol error: {0}")]
    Ldap(#[from] ldap3::LdapError),
}

// ---------------------------------------------------------------------------
// Sync errors
// ---------------------------------------------------------------------------

/// Errors from reconciliation and the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Reading the local descriptor files failed.
    #[error("sync tnsnames error: {0}")]
    Tns(#[from] TnsError),

    /// Reading the directory mirror failed.
    #[error("sync directory error: {0}")]
    Directory(#[from] DirectoryError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (referenced by config field '{field}')")]
    EnvVarMissing { var: String, field: String },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = TnsError::IncludeCycle {
            path: PathBuf::from("/etc/tns/a.ora"),
        };
        assert_eq!(err.to_string(), "IFILE cycle detected at '/etc/tns/a.ora'");

        let err = DirectoryError::OperationFailed {
            operation: "delete",
            dn: "cn=XE,cn=OracleContext".into(),
            detail: "insufficient access".into(),
        };
        assert_eq!(
            err.to_string(),
            "directory delete on 'cn=XE,cn=OracleContext' failed: insufficient access"
        );

        let err = ConfigError::EnvVarMissing {
            var: "TNSYNC_LDAP_PASSWORD".into(),
            field: "ldap.bind_password_env".into(),
        };
        assert!(err.to_string().contains("TNSYNC_LDAP_PASSWORD"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let dir_err = DirectoryError::NoSuchEntry("cn=X".into());
        let core_err: CoreError = dir_err.into();
        assert!(matches!(core_err, CoreError::Directory(_)));

        let sync_err: SyncError = DirectoryError::NoSuchEntry("cn=X".into()).into();
        assert!(matches!(sync_err, SyncError::Directory(_)));
        let core_err: CoreError = sync_err.into();
        assert!(matches!(core_err, CoreError::Sync(_)));
    }
}
