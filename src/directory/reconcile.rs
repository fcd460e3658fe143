//! Directory reconciliation
//!
//! Makes the directory mirror match the file entries. Keys on both sides are
//! short aliases; descriptors are compared as exact strings. Aliases are
//! applied in sorted order and a failing alias is skipped, not fatal.

use super::{DirectoryClient, DirectoryEntries};
use crate::error::{TnsError, TnsResult};
use crate::tns::{short_alias, TnsEntries, TnsEntry};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileStatus {
    /// In the directory, not (yet) matched by a file alias
    Unclassified,
    Unchanged,
    New,
    Modified,
    Deleted,
    Skipped,
}

/// Count of aliases per final status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkTally {
    counts: BTreeMap<ReconcileStatus, usize>,
}

impl WorkTally {
    pub fn add(&mut self, status: ReconcileStatus) {
        *self.counts.entry(status).or_insert(0) += 1;
    }

    pub fn get(&self, status: ReconcileStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn skipped(&self) -> usize {
        self.get(ReconcileStatus::Skipped)
    }

    /// True when no alias was skipped
    pub fn is_clean(&self) -> bool {
        self.skipped() == 0
    }

    /// `<u> unchanged, <n> new, <m> modified, <d> deleted, <s> skipped`
    pub fn summary(&self) -> String {
        format!(
            "{} unchanged, {} new, {} modified, {} deleted, {} skipped",
            self.get(ReconcileStatus::Unchanged),
            self.get(ReconcileStatus::New),
            self.get(ReconcileStatus::Modified),
            self.get(ReconcileStatus::Deleted),
            self.skipped()
        )
    }
}

/// Result of clearing a context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    pub deleted: usize,
    /// Alias and reason, in alias order
    pub failed: Vec<(String, String)>,
}

impl ClearReport {
    /// `<ok> entries deleted, <failed> failed`
    pub fn summary(&self) -> String {
        format!("{} entries deleted, {} failed", self.deleted, self.failed.len())
    }
}

/// Status per short alias over both sides, sorted by alias.
///
/// Directory aliases no file alias matched come out as `Deleted`.
pub fn plan(
    entries: &TnsEntries,
    directory: &DirectoryEntries,
) -> BTreeMap<String, ReconcileStatus> {
    plan_indexed(&file_index(entries), directory)
}

fn plan_indexed(
    files: &BTreeMap<String, &TnsEntry>,
    directory: &DirectoryEntries,
) -> BTreeMap<String, ReconcileStatus> {
    let mut status: BTreeMap<String, ReconcileStatus> = directory
        .keys()
        .map(|k| (k.clone(), ReconcileStatus::Unclassified))
        .collect();

    for (key, entry) in files {
        let s = match directory.get(key) {
            None => ReconcileStatus::New,
            Some(existing) if existing.desc == entry.desc => ReconcileStatus::Unchanged,
            Some(_) => ReconcileStatus::Modified,
        };
        status.insert(key.clone(), s);
    }

    for s in status.values_mut() {
        if *s == ReconcileStatus::Unclassified {
            *s = ReconcileStatus::Deleted;
        }
    }
    status
}

/// File entries keyed by short alias
fn file_index(entries: &TnsEntries) -> BTreeMap<String, &TnsEntry> {
    let mut index = BTreeMap::new();
    for entry in entries.iter() {
        if let Some(prev) = index.insert(short_alias(&entry.name), entry) {
            log::warn!(
                "{} and {} share the short alias {}, using {}",
                prev.name,
                entry.name,
                short_alias(&entry.name),
                entry.name
            );
        }
    }
    index
}

/// Applies file entries to a directory context
pub struct Reconciler<'c> {
    client: &'c mut dyn DirectoryClient,
    context: String,
}

impl<'c> Reconciler<'c> {
    pub fn new(client: &'c mut dyn DirectoryClient, context: impl Into<String>) -> Self {
        Self {
            client,
            context: context.into(),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Writes adds, modifies and deletes so the directory matches `entries`.
    ///
    /// # Returns
    /// The tally; an error only when the directory cannot be read at all
    pub fn sync(&mut self, entries: &TnsEntries) -> TnsResult<WorkTally> {
        let directory = self.client.read(&self.context)?;
        let files = file_index(entries);
        let mut tally = WorkTally::default();

        for (alias, status) in plan_indexed(&files, &directory) {
            let applied = match status {
                ReconcileStatus::Unchanged => Ok(()),
                ReconcileStatus::New => match files.get(&alias) {
                    Some(entry) => {
                        log::info!("adding {}", alias);
                        self.client.add(&self.context, &alias, &entry.desc)
                    }
                    None => Err(missing(&alias, "file")),
                },
                ReconcileStatus::Modified => match (directory.get(&alias), files.get(&alias)) {
                    (Some(existing), Some(entry)) => {
                        log::info!("modifying {}", alias);
                        self.client.modify(&existing.location, &alias, &entry.desc)
                    }
                    _ => Err(missing(&alias, "file or directory")),
                },
                ReconcileStatus::Deleted => match directory.get(&alias) {
                    Some(existing) => {
                        log::info!("deleting {}", alias);
                        self.client.delete(&existing.location, &alias)
                    }
                    None => Err(missing(&alias, "directory")),
                },
                ReconcileStatus::Unclassified | ReconcileStatus::Skipped => {
                    Err(missing(&alias, "plan"))
                }
            };

            match applied {
                Ok(()) => tally.add(status),
                Err(e) => {
                    log::warn!("{} skipped: {}", alias, e);
                    tally.add(ReconcileStatus::Skipped);
                }
            }
        }

        log::info!(
            "{} TNS entries unchanged, {} new written, {} modified, {} deleted and {} skipped because of errors",
            tally.get(ReconcileStatus::Unchanged),
            tally.get(ReconcileStatus::New),
            tally.get(ReconcileStatus::Modified),
            tally.get(ReconcileStatus::Deleted),
            tally.skipped()
        );
        Ok(tally)
    }

    /// Deletes every entry of the context.
    ///
    /// Only entries whose location is a DN (`cn=...`) are deleted; others
    /// are reported as failed.
    pub fn clear(&mut self) -> TnsResult<ClearReport> {
        let directory = self.client.read(&self.context)?;
        let mut report = ClearReport::default();

        for (alias, entry) in &directory {
            let dn = entry.location.trim();
            if !dn.to_lowercase().starts_with("cn=") {
                log::warn!("{} has no usable DN '{}'", alias, dn);
                report.failed.push((alias.clone(), format!("invalid dn '{}'", dn)));
                continue;
            }
            match self.client.delete(dn, alias) {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    log::warn!("delete {} failed: {}", dn, e);
                    report.failed.push((alias.clone(), e.to_string()));
                }
            }
        }

        log::info!("{}", report.summary());
        Ok(report)
    }
}

fn missing(alias: &str, side: &str) -> TnsError {
    TnsError::NotFound(format!("alias {} not found in {} entries", alias, side))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_entry(name: &str, desc: &str) -> TnsEntry {
        TnsEntry::new(name, desc, "tnsnames.ora:1")
    }

    fn dir_entry(name: &str, desc: &str) -> (String, TnsEntry) {
        (
            short_alias(name),
            TnsEntry::new(name, desc, format!("cn={},cn=OracleContext,dc=local", name)),
        )
    }

    #[test]
    fn test_plan_three_way() {
        let files: TnsEntries = vec![file_entry("A.local", "dA"), file_entry("b", "dB2"), file_entry("D", "dD")]
            .into_iter()
            .collect();
        let directory: DirectoryEntries =
            vec![dir_entry("a", "dA"), dir_entry("b", "dB1"), dir_entry("c", "dC")]
                .into_iter()
                .collect();

        let plan = plan(&files, &directory);
        let statuses: Vec<(&str, ReconcileStatus)> =
            plan.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(
            statuses,
            vec![
                ("a", ReconcileStatus::Unchanged),
                ("b", ReconcileStatus::Modified),
                ("c", ReconcileStatus::Deleted),
                ("d", ReconcileStatus::New),
            ]
        );
    }

    #[test]
    fn test_tally_summary() {
        let mut tally = WorkTally::default();
        tally.add(ReconcileStatus::Unchanged);
        tally.add(ReconcileStatus::Unchanged);
        tally.add(ReconcileStatus::Skipped);
        assert_eq!(tally.total(), 3);
        assert!(!tally.is_clean());
        assert_eq!(tally.summary(), "2 unchanged, 0 new, 0 modified, 0 deleted, 1 skipped");
    }
}
