//! Push the local alias registry into the directory.
//!
//! A sync pass runs in four steps:
//!
//! 1. Parse the local tnsnames file (following IFILE includes if enabled).
//! 2. Read the directory mirror.
//! 3. Classify every alias with [`crate::reconcile::reconcile`].
//! 4. Apply the classification with [`apply`], one directory call at a time.
//!
//! Step 4 never aborts: a failed directory call is counted as `skip`,
//! logged, and the pass carries on. Nothing is rolled back.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::directory::{read_directory_mirror, Directory, DirectoryLayout};
use crate::errors::SyncError;
use crate::models::{Classification, Registry, SyncReport, SyncStatus, TnsEntry, WorkTally};
use crate::reconcile::reconcile;
use crate::tns::parser::parse_tnsnames;
use crate::tns::resolver::{qualified_name, resolve_alias};
use crate::tns::sqlnet::{read_default_domain, sqlnet_path_for};

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Local entry for `alias`: exact key first, then domain resolution.
fn local_entry<'a>(alias: &str, local: &'a Registry, domain: &str) -> Option<&'a TnsEntry> {
    local.get(alias).or_else(|| resolve_alias(alias, local, domain))
}

fn dn_key(dn: &str) -> String {
    dn.trim().to_ascii_lowercase()
}

/// Issue the directory calls that move `mirror` towards `local`.
///
/// Aliases are handled in classification order:
///
/// - `unchanged`: nothing to do.
/// - `new`: add `<name attr>=<qualified alias>,<container>`, once per DN.
/// - `modified`: replace the descriptor attribute on the mirror entry's DN.
/// - `absent-locally`: delete the mirror entry's DN. Aliases that share a DN
///   through an aliased-object pointer cause a single delete. A DN that is
///   still backing an alias kept by this pass is not deleted, and the alias
///   is counted as `unchanged`.
/// - `skip`: counted as is.
pub async fn apply<D: Directory>(
    classification: &Classification,
    local: &Registry,
    mirror: &Registry,
    domain: &str,
    directory: &mut D,
    layout: &DirectoryLayout,
) -> WorkTally {
    let mut tally = WorkTally::new();

    // DNs of mirror aliases this pass keeps.
    let retained: HashSet<String> = mirror
        .iter()
        .filter(|e| classification.get(&e.name) != Some(SyncStatus::AbsentLocally))
        .map(|e| dn_key(&e.source))
        .collect();
    // DN -> whether its delete went through.
    let mut deleted: HashMap<String, bool> = HashMap::new();
    let mut added: HashSet<String> = HashSet::new();

    for (alias, status) in classification.iter() {
        match status {
            SyncStatus::Unchanged | SyncStatus::Skip => tally.record(status),

            SyncStatus::New => {
                let Some(entry) = local_entry(alias, local, domain) else {
                    warn!(alias, "no local entry for new alias, skipping");
                    tally.record_failure(alias, status, "no local entry");
                    continue;
                };
                let name = qualified_name(alias, domain);
                let dn = layout.entry_dn(&name);
                if added.contains(&dn_key(&dn)) {
                    debug!(alias, dn = %dn, "entry already added by this pass");
                    tally.record(status);
                    continue;
                }
                let attributes = layout.new_entry_attributes(&name, &entry.description);
                match directory.add(&dn, attributes).await {
                    Ok(()) => {
                        added.insert(dn_key(&dn));
                        tally.record(status);
                    }
                    Err(e) => {
                        warn!(alias, dn = %dn, error = %e, "add failed");
                        tally.record_failure(alias, status, e.to_string());
                    }
                }
            }

            SyncStatus::Modified => {
                let remote = resolve_alias(alias, mirror, domain).or_else(|| mirror.get(alias));
                let (Some(remote), Some(entry)) = (remote, local_entry(alias, local, domain))
                else {
                    warn!(alias, "modified alias missing on one side, skipping");
                    tally.record_failure(alias, status, "entry missing locally or in directory");
                    continue;
                };
                match directory
                    .modify_replace(
                        &remote.source,
                        &layout.schema.descriptor_attribute,
                        vec![entry.description.clone()],
                    )
                    .await
                {
                    Ok(()) => tally.record(status),
                    Err(e) => {
                        warn!(alias, dn = %remote.source, error = %e, "modify failed");
                        tally.record_failure(alias, status, e.to_string());
                    }
                }
            }

            SyncStatus::AbsentLocally => {
                let Some(remote) = mirror.get(alias).or_else(|| resolve_alias(alias, mirror, domain))
                else {
                    warn!(alias, "absent alias not in directory mirror, skipping");
                    tally.record_failure(alias, status, "no directory entry");
                    continue;
                };
                let key = dn_key(&remote.source);
                if retained.contains(&key) {
                    debug!(alias, dn = %remote.source, "entry still backs a kept alias, not deleting");
                    tally.record(SyncStatus::Unchanged);
                    continue;
                }
                match deleted.get(&key) {
                    Some(true) => {
                        debug!(alias, dn = %remote.source, "entry already deleted");
                        tally.record(status);
                        continue;
                    }
                    Some(false) => {
                        tally.record_failure(alias, status, "delete of shared entry failed");
                        continue;
                    }
                    None => {}
                }
                match directory.delete(&remote.source).await {
                    Ok(()) => {
                        deleted.insert(key, true);
                        tally.record(status);
                    }
                    Err(e) => {
                        warn!(alias, dn = %remote.source, error = %e, "delete failed");
                        deleted.insert(key, false);
                        tally.record_failure(alias, status, e.to_string());
                    }
                }
            }
        }
    }

    info!(tally = %tally, "applied classification");
    tally
}

/// Delete every entry in `mirror`, each DN once.
///
/// Every mirror alias is counted as `absent-locally` when its entry is gone,
/// or as `skip` when the delete failed.
pub async fn clear_directory<D: Directory>(mirror: &Registry, directory: &mut D) -> WorkTally {
    let mut tally = WorkTally::new();
    let mut deleted: HashMap<String, bool> = HashMap::new();

    for entry in mirror.iter() {
        let key = dn_key(&entry.source);
        let ok = match deleted.get(&key) {
            Some(ok) => *ok,
            None => {
                let result = directory.delete(&entry.source).await;
                if let Err(e) = &result {
                    warn!(alias = %entry.name, dn = %entry.source, error = %e, "delete failed");
                }
                deleted.insert(key, result.is_ok());
                result.is_ok()
            }
        };
        if ok {
            tally.record(SyncStatus::AbsentLocally);
        } else {
            tally.record_failure(&entry.name, SyncStatus::AbsentLocally, "delete failed");
        }
    }

    info!(tally = %tally, "cleared directory");
    tally
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Everything a dry run computes.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub local: Registry,
    pub mirror: Registry,
    pub domain: String,
    pub classification: Classification,
}

impl SyncPlan {
    /// Aliases that need a directory call.
    pub fn changes(&self) -> impl Iterator<Item = (&str, SyncStatus)> {
        self.classification
            .iter()
            .filter(|(_, status)| *status != SyncStatus::Unchanged)
    }
}

/// Ties configuration to the parse, diff, and apply steps.
pub struct SyncEngine {
    config: AppConfig,
    layout: DirectoryLayout,
}

impl SyncEngine {
    pub fn new(config: AppConfig) -> Self {
        let layout = DirectoryLayout::from_config(&config);
        info!(container = %layout.container_dn, "initializing sync engine");
        Self { config, layout }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn layout(&self) -> &DirectoryLayout {
        &self.layout
    }

    /// Default domain: `tns.default_domain`, else `NAMES.DEFAULT_DOMAIN`
    /// from the neighbouring `sqlnet.ora`, else empty.
    pub fn domain(&self) -> Result<String, SyncError> {
        if let Some(domain) = &self.config.tns.default_domain {
            return Ok(domain.trim().to_string());
        }
        let sqlnet = sqlnet_path_for(&self.config.tns.file);
        Ok(read_default_domain(&sqlnet)?.unwrap_or_default())
    }

    pub fn load_local(&self) -> Result<Registry, SyncError> {
        let local = parse_tnsnames(&self.config.tns.file, self.config.tns.follow_ifile)?;
        Ok(local)
    }

    pub async fn read_mirror<D: Directory>(&self, directory: &mut D) -> Result<Registry, SyncError> {
        Ok(read_directory_mirror(directory, &self.layout).await?)
    }

    /// Parse, read, and classify without touching the directory.
    pub async fn plan<D: Directory>(&self, directory: &mut D) -> Result<SyncPlan, SyncError> {
        let domain = self.domain()?;
        let local = self.load_local()?;
        let mirror = self.read_mirror(directory).await?;
        let classification = reconcile(&local, &mirror, &domain)?;
        Ok(SyncPlan {
            local,
            mirror,
            domain,
            classification,
        })
    }

    /// Execute one full sync pass.
    pub async fn run<D: Directory>(&self, directory: &mut D) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now().to_rfc3339();
        let plan = self.plan(directory).await?;

        let tally = apply(
            &plan.classification,
            &plan.local,
            &plan.mirror,
            &plan.domain,
            directory,
            &self.layout,
        )
        .await;

        info!(
            local = plan.local.len(),
            mirror = plan.mirror.len(),
            skipped = tally.count(SyncStatus::Skip),
            "sync pass completed"
        );
        Ok(SyncReport {
            tally,
            local_count: plan.local.len(),
            mirror_count: plan.mirror.len(),
            started_at,
            completed_at: Some(Utc::now().to_rfc3339()),
        })
    }

    /// Delete every service entry in the container.
    pub async fn clear<D: Directory>(&self, directory: &mut D) -> Result<WorkTally, SyncError> {
        let mirror = self.read_mirror(directory).await?;
        Ok(clear_directory(&mirror, directory).await)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::config::SchemaConfig;
    use crate::directory::memory::{MemoryDirectory, Operation};
    use crate::directory::DirectoryEntry;

    const CONTAINER: &str = "cn=OracleContext,dc=example,dc=com";

    fn layout() -> DirectoryLayout {
        DirectoryLayout::new(CONTAINER, SchemaConfig::default())
    }

    fn registry(entries: &[(&str, &str)]) -> Registry {
        entries
            .iter()
            .map(|(name, desc)| TnsEntry::new(name, *desc, "tnsnames.ora"))
            .collect()
    }

    fn service(name: &str, desc: &str) -> DirectoryEntry {
        DirectoryEntry::new(format!("cn={name},{CONTAINER}"))
            .with_attribute("objectClass", vec!["top".into(), "orclNetService".into()])
            .with_attribute("cn", vec![name.into()])
            .with_attribute("orclNetDescString", vec![desc.into()])
    }

    fn directory(entries: &[(&str, &str)]) -> MemoryDirectory {
        let mut dir = MemoryDirectory::new();
        dir.insert(DirectoryEntry::new(CONTAINER));
        for (name, desc) in entries {
            dir.insert(service(name, desc));
        }
        dir
    }

    async fn diff_and_apply(
        local: &Registry,
        dir: &mut MemoryDirectory,
        domain: &str,
    ) -> WorkTally {
        let mirror = read_directory_mirror(dir, &layout()).await.unwrap();
        let classification = reconcile(local, &mirror, domain).unwrap();
        apply(&classification, local, &mirror, domain, dir, &layout()).await
    }

    #[tokio::test]
    async fn test_apply_basic_scenario() {
        let local = registry(&[("A.D", "desc1"), ("B.D", "desc2")]);
        let mut dir = directory(&[("A.D", "desc1"), ("C.D", "desc3")]);

        let tally = diff_and_apply(&local, &mut dir, "D").await;
        assert_eq!(tally.count(SyncStatus::Unchanged), 1);
        assert_eq!(tally.count(SyncStatus::New), 1);
        assert_eq!(tally.count(SyncStatus::AbsentLocally), 1);
        assert_eq!(tally.count(SyncStatus::Modified), 0);
        assert_eq!(tally.count(SyncStatus::Skip), 0);

        let added = dir.get(&format!("cn=B.D,{CONTAINER}")).unwrap();
        assert_eq!(added.first_value("orclNetDescString"), Some("desc2"));
        assert_eq!(
            added.values("objectClass").unwrap(),
            &["top".to_string(), "orclNetService".to_string()]
        );
        assert!(!dir.contains(&format!("cn=C.D,{CONTAINER}")));
    }

    #[tokio::test]
    async fn test_apply_modified_replaces_descriptor() {
        let local = registry(&[("XE", "(DESCRIPTION=(NEW))")]);
        let mut dir = directory(&[("XE.LOCAL", "(DESCRIPTION=(OLD))")]);

        let tally = diff_and_apply(&local, &mut dir, "local").await;
        assert_eq!(tally.count(SyncStatus::Modified), 1);
        assert_eq!(
            dir.get(&format!("cn=XE.LOCAL,{CONTAINER}"))
                .unwrap()
                .first_value("orclNetDescString"),
            Some("(DESCRIPTION=(NEW))")
        );
    }

    #[tokio::test]
    async fn test_new_short_alias_is_added_qualified() {
        let local = registry(&[("XE", "d")]);
        let mut dir = directory(&[]);

        let tally = diff_and_apply(&local, &mut dir, "example.com").await;
        assert_eq!(tally.count(SyncStatus::New), 1);
        let added = dir.get(&format!("cn=XE.EXAMPLE.COM,{CONTAINER}")).unwrap();
        assert_eq!(added.first_value("cn"), Some("XE.EXAMPLE.COM"));
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_block_others() {
        let local = registry(&[("A.D", "desc1"), ("B.D", "desc2")]);
        let mut dir = directory(&[("A.D", "desc1"), ("C.D", "desc3")]);
        dir.fail_on(Operation::Add, &format!("cn=B.D,{CONTAINER}"));

        let tally = diff_and_apply(&local, &mut dir, "D").await;
        assert_eq!(tally.count(SyncStatus::Unchanged), 1);
        assert_eq!(tally.count(SyncStatus::New), 0);
        assert_eq!(tally.count(SyncStatus::AbsentLocally), 1);
        assert_eq!(tally.count(SyncStatus::Skip), 1);
        assert_eq!(tally.failures.len(), 1);
        assert_eq!(tally.failures[0].alias, "B.D");
        assert_eq!(tally.failures[0].intended, SyncStatus::New);
        assert!(!dir.contains(&format!("cn=C.D,{CONTAINER}")));
    }

    #[tokio::test]
    async fn test_second_run_is_all_unchanged() {
        let local = registry(&[("A", "1"), ("B", "2"), ("C", "3")]);
        let mut dir = directory(&[("B", "old"), ("Z", "9")]);

        let first = diff_and_apply(&local, &mut dir, "").await;
        assert!(first.is_converged());

        let second = diff_and_apply(&local, &mut dir, "").await;
        assert_eq!(second.count(SyncStatus::Unchanged), 3);
        assert_eq!(second.total(), 3);
    }

    #[tokio::test]
    async fn test_shared_entry_deleted_once() {
        let local = Registry::new();
        let mut dir = directory(&[]);
        dir.insert(
            service("PRIMARY", "d")
                .with_attribute("aliasedObjectName", vec![format!("cn=LEGACY,{CONTAINER}")]),
        );

        let tally = diff_and_apply(&local, &mut dir, "").await;
        assert_eq!(tally.count(SyncStatus::AbsentLocally), 2);
        let deletes = dir
            .operations()
            .iter()
            .filter(|(op, _)| *op == Operation::Delete)
            .count();
        assert_eq!(deletes, 1);
        assert!(!dir.contains(&format!("cn=PRIMARY,{CONTAINER}")));
    }

    #[tokio::test]
    async fn test_shared_entry_kept_when_one_alias_retained() {
        let local = registry(&[("PRIMARY", "d")]);
        let mut dir = directory(&[]);
        dir.insert(
            service("PRIMARY", "d")
                .with_attribute("aliasedObjectName", vec![format!("cn=LEGACY,{CONTAINER}")]),
        );

        let tally = diff_and_apply(&local, &mut dir, "").await;
        assert_eq!(tally.count(SyncStatus::Unchanged), 2);
        assert!(tally.is_converged());
        assert!(dir.operations().is_empty());
        assert!(dir.contains(&format!("cn=PRIMARY,{CONTAINER}")));

        let second = diff_and_apply(&local, &mut dir, "").await;
        assert_eq!(second.count(SyncStatus::Unchanged), 2);
        assert_eq!(second.count(SyncStatus::Skip), 0);
        assert!(dir.operations().is_empty());
    }

    #[tokio::test]
    async fn test_shared_entry_failed_delete_skips_both_aliases() {
        let local = Registry::new();
        let mut dir = directory(&[]);
        dir.insert(
            service("PRIMARY", "d")
                .with_attribute("aliasedObjectName", vec![format!("cn=LEGACY,{CONTAINER}")]),
        );
        dir.fail_on(Operation::Delete, &format!("cn=PRIMARY,{CONTAINER}"));

        let tally = diff_and_apply(&local, &mut dir, "").await;
        assert_eq!(tally.count(SyncStatus::AbsentLocally), 0);
        assert_eq!(tally.count(SyncStatus::Skip), 2);
        let skipped: Vec<&str> = tally.failures.iter().map(|f| f.alias.as_str()).collect();
        assert_eq!(skipped, vec!["LEGACY", "PRIMARY"]);
        assert_eq!(dir.operations().len(), 1);
        assert!(dir.contains(&format!("cn=PRIMARY,{CONTAINER}")));
    }

    #[tokio::test]
    async fn test_failed_modify_does_not_block_others() {
        let local = registry(&[("A", "new-a"), ("B", "new-b"), ("C", "c")]);
        let mut dir = directory(&[("A", "old-a"), ("B", "old-b")]);
        dir.fail_on(Operation::Modify, &format!("cn=A,{CONTAINER}"));

        let tally = diff_and_apply(&local, &mut dir, "").await;
        assert_eq!(tally.count(SyncStatus::Modified), 1);
        assert_eq!(tally.count(SyncStatus::New), 1);
        assert_eq!(tally.count(SyncStatus::Skip), 1);
        assert_eq!(tally.failures[0].alias, "A");
        assert_eq!(tally.failures[0].intended, SyncStatus::Modified);
        assert_eq!(
            dir.get(&format!("cn=A,{CONTAINER}"))
                .unwrap()
                .first_value("orclNetDescString"),
            Some("old-a")
        );
        assert_eq!(
            dir.get(&format!("cn=B,{CONTAINER}"))
                .unwrap()
                .first_value("orclNetDescString"),
            Some("new-b")
        );
        assert!(dir.contains(&format!("cn=C,{CONTAINER}")));
    }

    #[tokio::test]
    async fn test_failed_delete_does_not_block_others() {
        let local = registry(&[("A", "a")]);
        let mut dir = directory(&[("X", "x"), ("Y", "y")]);
        dir.fail_on(Operation::Delete, &format!("cn=X,{CONTAINER}"));

        let tally = diff_and_apply(&local, &mut dir, "").await;
        assert_eq!(tally.count(SyncStatus::New), 1);
        assert_eq!(tally.count(SyncStatus::AbsentLocally), 1);
        assert_eq!(tally.count(SyncStatus::Skip), 1);
        assert_eq!(tally.failures[0].alias, "X");
        assert_eq!(tally.failures[0].intended, SyncStatus::AbsentLocally);
        assert!(dir.contains(&format!("cn=X,{CONTAINER}")));
        assert!(!dir.contains(&format!("cn=Y,{CONTAINER}")));
    }

    #[tokio::test]
    async fn test_aliases_sharing_a_mirror_entry_do_not_block_others() {
        let local = registry(&[("OTHER", "o"), ("XE", "d"), ("XE.LOCAL", "d")]);
        let mut dir = directory(&[("XE.LOCAL", "d")]);

        let tally = diff_and_apply(&local, &mut dir, "local").await;
        assert_eq!(tally.count(SyncStatus::Unchanged), 2);
        assert_eq!(tally.count(SyncStatus::New), 1);
        assert!(tally.is_converged());
        assert!(dir.contains(&format!("cn=OTHER.LOCAL,{CONTAINER}")));
    }

    #[tokio::test]
    async fn test_new_aliases_sharing_a_dn_add_once() {
        let local = registry(&[("XE", "d"), ("XE.LOCAL", "d")]);
        let mut dir = directory(&[]);

        let tally = diff_and_apply(&local, &mut dir, "local").await;
        assert_eq!(tally.count(SyncStatus::New), 2);
        assert!(tally.is_converged());
        assert_eq!(dir.operations().len(), 1);

        let second = diff_and_apply(&local, &mut dir, "local").await;
        assert_eq!(second.count(SyncStatus::Unchanged), 2);
        assert_eq!(second.total(), 2);
    }

    #[tokio::test]
    async fn test_unresolvable_and_input_skip() {
        let mut classification = Classification::new();
        classification.insert("GHOST", SyncStatus::New);
        classification.insert("ODD", SyncStatus::Skip);
        classification.insert("VANISHED", SyncStatus::AbsentLocally);
        let mut dir = directory(&[]);

        let tally = apply(
            &classification,
            &Registry::new(),
            &Registry::new(),
            "",
            &mut dir,
            &layout(),
        )
        .await;
        assert_eq!(tally.count(SyncStatus::Skip), 3);
        assert_eq!(tally.failures.len(), 2);
        assert!(dir.operations().is_empty());
    }

    #[tokio::test]
    async fn test_clear_directory() {
        let mut dir = directory(&[("A", "1"), ("B", "2")]);
        dir.fail_on(Operation::Delete, &format!("cn=B,{CONTAINER}"));
        let mirror = read_directory_mirror(&mut dir, &layout()).await.unwrap();

        let tally = clear_directory(&mirror, &mut dir).await;
        assert_eq!(tally.count(SyncStatus::AbsentLocally), 1);
        assert_eq!(tally.count(SyncStatus::Skip), 1);
        assert!(!dir.contains(&format!("cn=A,{CONTAINER}")));
        assert!(dir.contains(&format!("cn=B,{CONTAINER}")));
    }

    // -----------------------------------------------------------------------
    // Engine
    // -----------------------------------------------------------------------

    fn engine(dir: &std::path::Path, default_domain: Option<&str>) -> SyncEngine {
        let domain_line = default_domain
            .map(|d| format!("default_domain = \"{d}\"\n"))
            .unwrap_or_default();
        let toml = format!(
            "[tns]\nfile = {:?}\n{domain_line}\n[ldap]\nurl = \"ldap://localhost\"\nbase_dn = \"dc=example,dc=com\"\n",
            dir.join("tnsnames.ora").display().to_string()
        );
        let config: AppConfig = toml::from_str(&toml).unwrap();
        SyncEngine::new(config)
    }

    #[test]
    fn test_domain_sources() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(engine(tmp.path(), None).domain().unwrap(), "");

        fs::write(tmp.path().join("sqlnet.ora"), "NAMES.DEFAULT_DOMAIN = corp.net\n").unwrap();
        assert_eq!(engine(tmp.path(), None).domain().unwrap(), "corp.net");
        assert_eq!(engine(tmp.path(), Some("lab")).domain().unwrap(), "lab");
    }

    #[tokio::test]
    async fn test_engine_plan_and_run() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("tnsnames.ora"),
            "A.D = (DESCRIPTION=(ADDRESS=(HOST=h1)(PORT=1521)))\nB.D = (DESCRIPTION=(X))\n",
        )
        .unwrap();
        let engine = engine(tmp.path(), Some("D"));
        assert_eq!(engine.layout().container_dn, CONTAINER);

        let mut dir = directory(&[
            ("A.D", "(DESCRIPTION=(ADDRESS=(HOST=h1)(PORT=1521)))"),
            ("C.D", "(DESCRIPTION=(Y))"),
        ]);

        let plan = engine.plan(&mut dir).await.unwrap();
        assert_eq!(plan.domain, "D");
        let changes: Vec<(&str, SyncStatus)> = plan.changes().collect();
        assert_eq!(
            changes,
            vec![("B.D", SyncStatus::New), ("C.D", SyncStatus::AbsentLocally)]
        );
        assert!(dir.operations().is_empty());

        let report = engine.run(&mut dir).await.unwrap();
        assert_eq!(report.local_count, 2);
        assert_eq!(report.mirror_count, 2);
        assert!(report.tally.is_converged());
        assert!(report.completed_at.is_some());

        let tally = engine.clear(&mut dir).await.unwrap();
        assert_eq!(tally.count(SyncStatus::AbsentLocally), 2);
        assert_eq!(dir.len(), 1);
    }

    #[tokio::test]
    async fn test_engine_missing_tnsnames_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let mut dir = directory(&[]);
        let err = engine(tmp.path(), Some("D")).run(&mut dir).await.unwrap_err();
        assert!(matches!(err, SyncError::Tns(_)));
    }
}
