//! Read the directory-resident copy of the alias registry.

use tracing::{debug, info, warn};

use super::{first_rdn_value, Directory, DirectoryLayout};
use crate::errors::DirectoryError;
use crate::models::{Registry, TnsEntry};

/// Fetch every service entry below the container into a [`Registry`].
///
/// Each entry's `source` is its DN. An entry carrying an aliased-object
/// pointer is also registered under the pointed-to entry's RDN value, with
/// the same descriptor and DN. Entries without a name are skipped.
pub async fn read_directory_mirror<D: Directory>(
    directory: &mut D,
    layout: &DirectoryLayout,
) -> Result<Registry, DirectoryError> {
    let request = layout.mirror_search();
    let entries = directory.search(&request).await?;
    let schema = &layout.schema;

    let mut mirror = Registry::new();
    for entry in entries {
        let Some(name) = entry.first_value(&schema.name_attribute) else {
            warn!(dn = %entry.dn, attribute = %schema.name_attribute, "directory entry has no name, skipping");
            continue;
        };
        let description = entry
            .first_value(&schema.descriptor_attribute)
            .unwrap_or_default()
            .to_string();

        if let Some(target) = entry.first_value(&schema.alias_attribute) {
            match first_rdn_value(target) {
                Some(alias) => {
                    debug!(dn = %entry.dn, alias = %alias, "registering aliased object");
                    mirror.insert(TnsEntry::new(&alias, description.clone(), entry.dn.clone()));
                }
                None => warn!(dn = %entry.dn, pointer = %target, "unparseable aliased object DN"),
            }
        }
        mirror.insert(TnsEntry::new(name, description, entry.dn.clone()));
    }

    info!(container = %layout.container_dn, entries = mirror.len(), "read directory mirror");
    Ok(mirror)
}
