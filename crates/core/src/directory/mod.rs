//! Directory (LDAP) side of the sync.
//!
//! The sync logic talks to the directory only through the [`Directory`]
//! trait. [`ldap::LdapDirectory`] implements it over `ldap3`;
//! [`memory::MemoryDirectory`] keeps entries in process for dry runs and
//! tests.

pub mod ldap;
pub mod memory;
pub mod mirror;

use std::collections::HashMap;

use crate::config::{AppConfig, SchemaConfig};
use crate::errors::DirectoryError;

pub use ldap::LdapDirectory;
pub use memory::MemoryDirectory;
pub use mirror::read_directory_mirror;

/// Attribute name -> values, in the order they are sent.
pub type Attributes = Vec<(String, Vec<String>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Base,
    OneLevel,
    Subtree,
}

/// When the server should dereference alias entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerefPolicy {
    Never,
    Searching,
    Finding,
    Always,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base: String,
    pub filter: String,
    pub attributes: Vec<String>,
    pub scope: SearchScope,
    pub deref: DerefPolicy,
}

/// One search result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.attributes.insert(name.into(), values);
        self
    }

    /// Values of an attribute. Attribute names compare case-insensitively.
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.values(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }
}

/// The primitives the mirror reader and sync executor need.
///
/// Calls are awaited one at a time; implementations do not need to be
/// shareable across tasks.
#[allow(async_fn_in_trait)]
pub trait Directory {
    async fn search(&mut self, request: &SearchRequest)
        -> Result<Vec<DirectoryEntry>, DirectoryError>;

    async fn add(&mut self, dn: &str, attributes: Attributes) -> Result<(), DirectoryError>;

    /// Replace all values of one attribute.
    async fn modify_replace(
        &mut self,
        dn: &str,
        attribute: &str,
        values: Vec<String>,
    ) -> Result<(), DirectoryError>;

    async fn delete(&mut self, dn: &str) -> Result<(), DirectoryError>;
}

/// Where service entries live and what they look like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLayout {
    pub container_dn: String,
    pub schema: SchemaConfig,
}

impl DirectoryLayout {
    pub fn new(container_dn: impl Into<String>, schema: SchemaConfig) -> Self {
        Self {
            container_dn: container_dn.into(),
            schema,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.ldap.container_dn(), config.schema.clone())
    }

    /// DN a new service entry named `name` is created under.
    pub fn entry_dn(&self, name: &str) -> String {
        format!(
            "{}={},{}",
            self.schema.name_attribute,
            ::ldap3::dn_escape(name),
            self.container_dn
        )
    }

    /// Search for every service entry directly below the container.
    pub fn mirror_search(&self) -> SearchRequest {
        SearchRequest {
            base: self.container_dn.clone(),
            filter: format!("(objectClass={})", ::ldap3::ldap_escape(&self.schema.object_class)),
            attributes: vec![
                self.schema.name_attribute.clone(),
                self.schema.descriptor_attribute.clone(),
                self.schema.alias_attribute.clone(),
            ],
            scope: SearchScope::OneLevel,
            deref: DerefPolicy::Never,
        }
    }

    /// Attributes of a freshly added service entry.
    pub fn new_entry_attributes(&self, name: &str, description: &str) -> Attributes {
        vec![
            (
                "objectClass".to_string(),
                vec!["top".to_string(), self.schema.object_class.clone()],
            ),
            (self.schema.name_attribute.clone(), vec![name.to_string()]),
            (
                self.schema.descriptor_attribute.clone(),
                vec![description.to_string()],
            ),
        ]
    }
}

/// Split a DN at its first unescaped comma: `(rdn, parent)`.
pub fn split_dn(dn: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in dn.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => return (dn[..i].trim(), dn[i + 1..].trim()),
            _ => escaped = false,
        }
    }
    (dn.trim(), "")
}

/// Unescaped value of the first RDN, e.g. `XE` for `cn=XE,cn=OracleContext`.
///
/// Handles both `\,` and hex-pair (`\2c`) escapes.
pub fn first_rdn_value(dn: &str) -> Option<String> {
    let (rdn, _) = split_dn(dn);
    let (_, value) = rdn.split_once('=')?;
    let value = value.trim().as_bytes();
    let mut out = Vec::with_capacity(value.len());
    let mut i = 0;
    while i < value.len() {
        if value[i] == b'\\' && i + 1 < value.len() {
            let hex = value
                .get(i + 1..i + 3)
                .and_then(|pair| std::str::from_utf8(pair).ok())
                .and_then(|pair| u8::from_str_radix(pair, 16).ok());
            match hex {
                Some(byte) => {
                    out.push(byte);
                    i += 3;
                }
                None => {
                    out.push(value[i + 1]);
                    i += 2;
                }
            }
        } else {
            out.push(value[i]);
            i += 1;
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&out).into_owned())
    }
}
