//! [`Directory`] over a live LDAP server, using the async `ldap3` client.

use std::collections::HashSet;
use std::time::Duration;

use ldap3::{
    DerefAliases, Ldap, LdapConnAsync, LdapConnSettings, LdapResult, Mod, Scope, SearchEntry,
    SearchOptions,
};
use tracing::{debug, info, warn};

use super::{Attributes, DerefPolicy, Directory, DirectoryEntry, SearchRequest, SearchScope};
use crate::config::LdapConfig;
use crate::errors::DirectoryError;

const RC_SUCCESS: u32 = 0;
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_ALREADY_EXISTS: u32 = 68;

/// A bound LDAP session.
pub struct LdapDirectory {
    ldap: Ldap,
    url: String,
    timeout: Duration,
}

impl LdapDirectory {
    /// Connect to `config.url` and bind.
    ///
    /// An empty `bind_dn` skips the bind and leaves the session anonymous.
    pub async fn connect(config: &LdapConfig) -> Result<Self, DirectoryError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let mut settings = LdapConnSettings::new()
            .set_conn_timeout(timeout)
            .set_starttls(config.starttls);
        if config.no_tls_verify {
            settings = settings.set_no_tls_verify(true);
        }

        debug!(url = %config.url, "connecting to directory");
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &config.url)
            .await
            .map_err(|e| DirectoryError::ConnectFailed {
                url: config.url.clone(),
                detail: e.to_string(),
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        if !config.bind_dn.is_empty() {
            let password = config.bind_password.as_deref().unwrap_or("");
            debug!(bind_dn = %config.bind_dn, "performing simple bind");
            ldap.with_timeout(timeout)
                .simple_bind(&config.bind_dn, password)
                .await
                .and_then(LdapResult::success)
                .map_err(|e| DirectoryError::BindFailed {
                    bind_dn: config.bind_dn.clone(),
                    detail: e.to_string(),
                })?;
        }

        info!(url = %config.url, "directory connection established");
        Ok(Self {
            ldap,
            url: config.url.clone(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Close the session. Errors are logged, not returned.
    pub async fn unbind(mut self) {
        if let Err(e) = self.ldap.unbind().await {
            warn!(url = %self.url, error = %e, "unbind failed");
        }
    }
}

/// Map a non-success result code onto [`DirectoryError`].
fn check(result: LdapResult, operation: &'static str, dn: &str) -> Result<(), DirectoryError> {
    match result.rc {
        RC_SUCCESS => Ok(()),
        RC_NO_SUCH_OBJECT => Err(DirectoryError::NoSuchEntry(dn.to_string())),
        RC_ALREADY_EXISTS => Err(DirectoryError::AlreadyExists(dn.to_string())),
        rc => Err(DirectoryError::OperationFailed {
            operation,
            dn: dn.to_string(),
            detail: format!("result code {rc}: {}", result.text),
        }),
    }
}

fn scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

fn deref(policy: DerefPolicy) -> DerefAliases {
    match policy {
        DerefPolicy::Never => DerefAliases::Never,
        DerefPolicy::Searching => DerefAliases::Searching,
        DerefPolicy::Finding => DerefAliases::Finding,
        DerefPolicy::Always => DerefAliases::Always,
    }
}

impl Directory for LdapDirectory {
    async fn search(
        &mut self,
        request: &SearchRequest,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        debug!(base = %request.base, filter = %request.filter, "directory search");
        let search_failed = |detail: String| DirectoryError::SearchFailed {
            base: request.base.clone(),
            detail,
        };

        let (entries, _res) = self
            .ldap
            .with_timeout(self.timeout)
            .with_search_options(SearchOptions::new().deref(deref(request.deref)))
            .search(
                &request.base,
                scope(request.scope),
                &request.filter,
                request.attributes.clone(),
            )
            .await
            .map_err(|e| search_failed(e.to_string()))?
            .success()
            .map_err(|e| search_failed(e.to_string()))?;

        let entries: Vec<DirectoryEntry> = entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|e| DirectoryEntry {
                dn: e.dn,
                attributes: e.attrs.into_iter().collect(),
            })
            .collect();
        debug!(base = %request.base, count = entries.len(), "directory search complete");
        Ok(entries)
    }

    async fn add(&mut self, dn: &str, attributes: Attributes) -> Result<(), DirectoryError> {
        let attrs: Vec<(&str, HashSet<&str>)> = attributes
            .iter()
            .map(|(name, values)| (name.as_str(), values.iter().map(String::as_str).collect()))
            .collect();
        let result = self.ldap.with_timeout(self.timeout).add(dn, attrs).await?;
        check(result, "add", dn)?;
        info!(dn, "directory entry added");
        Ok(())
    }

    async fn modify_replace(
        &mut self,
        dn: &str,
        attribute: &str,
        values: Vec<String>,
    ) -> Result<(), DirectoryError> {
        let values: HashSet<&str> = values.iter().map(String::as_str).collect();
        let result = self
            .ldap
            .with_timeout(self.timeout)
            .modify(dn, vec![Mod::Replace(attribute, values)])
            .await?;
        check(result, "modify", dn)?;
        info!(dn, attribute, "directory entry modified");
        Ok(())
    }

    async fn delete(&mut self, dn: &str) -> Result<(), DirectoryError> {
        let result = self.ldap.with_timeout(self.timeout).delete(dn).await?;
        check(result, "delete", dn)?;
        info!(dn, "directory entry deleted");
        Ok(())
    }
}
