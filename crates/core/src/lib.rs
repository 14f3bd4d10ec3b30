//! tnsync core library.
//!
//! Parses Oracle Net `tnsnames.ora` files into an alias registry, reads the
//! copy of that registry held in an LDAP directory, classifies the
//! differences, and applies them to the directory.

pub mod config;
pub mod directory;
pub mod errors;
pub mod models;
pub mod reconcile;
pub mod sync_engine;
pub mod tns;

// Re-exports for convenience.
pub use config::AppConfig;
pub use directory::{read_directory_mirror, Directory, DirectoryLayout, LdapDirectory, MemoryDirectory};
pub use models::{Classification, Registry, SyncReport, SyncStatus, TnsEntry, WorkTally};
pub use reconcile::reconcile;
pub use sync_engine::{apply, clear_directory, SyncEngine, SyncPlan};
pub use tns::{parse_tnsnames, resolve_alias};
