//! Diff a local registry against the directory mirror.
//!
//! Every mirror alias starts out `absent-locally`. Each local alias is then
//! resolved against the mirror: a hit clears the mirror alias's seed and
//! records the local alias as `unchanged` or `modified`, a miss records it
//! as `new`. States are keyed by the local alias, so a local short name that
//! resolves to a qualified mirror name appears once, under the short name.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::errors::SyncError;
use crate::models::{Classification, Registry, SyncStatus};
use crate::tns::resolver::resolve_alias;

/// Classify every alias in `local ∪ mirror`.
///
/// Several local aliases may resolve to the same mirror alias (`XE` and
/// `XE.LOCAL` under domain `local`). Each of them is classified against that
/// entry on its own.
pub fn reconcile(
    local: &Registry,
    mirror: &Registry,
    domain: &str,
) -> Result<Classification, SyncError> {
    let mut classification = Classification::new();
    for name in mirror.names() {
        classification.insert(name, SyncStatus::AbsentLocally);
    }

    // mirror alias -> local alias that claimed it
    let mut claimed: HashMap<&str, &str> = HashMap::new();

    for entry in local.iter() {
        let status = match resolve_alias(&entry.name, mirror, domain) {
            Some(remote) => {
                if let Some(first) = claimed.insert(remote.name.as_str(), entry.name.as_str()) {
                    let first_desc = local.get(first).map(|e| e.description.as_str());
                    if first_desc == Some(entry.description.as_str()) {
                        debug!(first, second = %entry.name, mirror = %remote.name, "directory alias claimed twice");
                    } else {
                        warn!(
                            first,
                            second = %entry.name,
                            mirror = %remote.name,
                            "local aliases with different descriptors share a directory alias"
                        );
                    }
                }
                // A seed that is itself a local key belongs to that alias.
                if !local.contains(&remote.name) {
                    classification.remove(&remote.name);
                }
                if remote.description == entry.description {
                    SyncStatus::Unchanged
                } else {
                    SyncStatus::Modified
                }
            }
            None => SyncStatus::New,
        };
        debug!(alias = %entry.name, status = %status, "classified");
        classification.insert(entry.name.clone(), status);
    }

    info!(
        local = local.len(),
        mirror = mirror.len(),
        unchanged = classification.count(SyncStatus::Unchanged),
        new = classification.count(SyncStatus::New),
        modified = classification.count(SyncStatus::Modified),
        absent_locally = classification.count(SyncStatus::AbsentLocally),
        "reconciled registries"
    );
    Ok(classification)
}
