//! Ownership of the files changed by a pull request.
//!
//! Every changed file is owned by the nearest directory declaring approvers
//! in its OWNERS file. [`Owners`] reduces those directories to the smallest
//! set whose approval covers the whole change, and suggests approvers for
//! it.

use crate::approvers::Approvers;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, BTreeSet};

pub mod repo;

/// Read-only view of the OWNERS declarations of a repository.
///
/// Directories are slash separated and relative to the repository root,
/// which is written as the empty string. Logins may use any case; they are
/// compared ignoring case. All lookups are total: an unknown directory has
/// no approvers.
pub trait OwnersTree: Sync {
    /// Approvers of `path` together with those inherited from its ancestors.
    fn approvers(&self, path: &str) -> BTreeSet<String>;

    /// Approvers declared by the OWNERS file of `path` itself.
    fn leaf_approvers(&self, path: &str) -> BTreeSet<String>;

    /// The nearest directory containing `file` that declares approvers,
    /// falling back to the root.
    fn find_approver_owners_for_file(&self, file: &str) -> String;

    /// Whether `path` stops inheriting approvers from its ancestors.
    fn is_no_parent_owners(&self, path: &str) -> bool;

    /// Whether new subdirectories of `dir` without their own OWNERS file
    /// need no approval.
    fn is_auto_approve_unowned_subfolders(&self, dir: &str) -> bool;

    /// Name of the files holding the declarations, used to build links.
    fn owners_filename(&self) -> &str;
}

/// Returns the directory containing `path`, with the root written as `""`.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Permutes `items` deterministically for a given `seed`.
pub fn shuffle<T>(seed: u64, items: &mut [T]) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
}

/// The changed files of a pull request, resolved against an [`OwnersTree`].
#[derive(Clone)]
pub struct Owners<'a> {
    /// Files still requiring approval.
    filenames: Vec<String>,
    unfiltered_count: usize,
    repo: &'a dyn OwnersTree,
    seed: u64,
    owners_set: BTreeSet<String>,
}

fn lowercase(logins: BTreeSet<String>) -> BTreeSet<String> {
    logins.iter().map(|login| login.to_lowercase()).collect()
}

impl std::fmt::Debug for Owners<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Owners")
            .field("filenames", &self.filenames)
            .field("unfiltered_count", &self.unfiltered_count)
            .field("seed", &self.seed)
            .field("owners_set", &self.owners_set)
            .finish()
    }
}

impl<'a> Owners<'a> {
    pub fn new(filenames: Vec<String>, repo: &'a dyn OwnersTree, seed: u64) -> Owners<'a> {
        let unfiltered_count = filenames.len();
        let (filenames, owners_set) = owners_set(repo, filenames);
        Owners {
            filenames,
            unfiltered_count,
            repo,
            seed,
            owners_set,
        }
    }

    /// Changed files left after dropping those in auto-approved subfolders.
    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    /// True if the pull request did not change any file at all.
    pub fn is_empty_change(&self) -> bool {
        self.unfiltered_count == 0
    }

    pub fn repo(&self) -> &'a dyn OwnersTree {
        self.repo
    }

    /// The directories whose approval covers every changed file.
    pub fn owners_set(&self) -> &BTreeSet<String> {
        &self.owners_set
    }

    /// Every directory of the owners set with its inherited approvers, as
    /// lowercase logins.
    pub fn approvers(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.owners_set
            .iter()
            .map(|dir| (dir.clone(), lowercase(self.repo.approvers(dir))))
            .collect()
    }

    /// Every directory of the owners set with the approvers its own OWNERS
    /// file declares, as lowercase logins.
    pub fn leaf_approvers(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.owners_set
            .iter()
            .map(|dir| (dir.clone(), lowercase(self.repo.leaf_approvers(dir))))
            .collect()
    }

    /// Inverts a directory to approvers map into lowercase approver to
    /// directories.
    pub fn reverse_map(
        owners_map: &BTreeMap<String, BTreeSet<String>>,
    ) -> BTreeMap<String, BTreeSet<String>> {
        let mut reverse: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (dir, approvers) in owners_map {
            for approver in approvers {
                reverse
                    .entry(approver.to_lowercase())
                    .or_default()
                    .insert(dir.clone());
            }
        }
        reverse
    }

    /// Sorted leaf approvers of all directories of the owners set.
    pub fn all_potential_approvers(&self) -> Vec<String> {
        let approvers: BTreeSet<String> = self.leaf_approvers().into_values().flatten().collect();
        if approvers.is_empty() {
            tracing::debug!("no potential approvers exist, does this repo have OWNERS files?");
        }
        approvers.into_iter().collect()
    }

    /// [`Owners::all_potential_approvers`] in an order fixed by the seed.
    pub fn shuffled_approvers(&self) -> Vec<String> {
        let mut approvers = self.all_potential_approvers();
        shuffle(self.seed, &mut approvers);
        approvers
    }

    /// Greedily picks approvers from `candidates` until every directory of
    /// the owners set is approved.
    ///
    /// Each round takes the candidate covering the most unapproved
    /// directories, the earliest candidate winning ties. When no candidate
    /// approves anything new the partial selection is returned.
    pub fn suggested_approvers(
        &self,
        reverse_map: &BTreeMap<String, BTreeSet<String>>,
        candidates: &[String],
    ) -> BTreeSet<String> {
        let mut ap = Approvers::new(self.clone());
        while !ap.requirements_met() {
            let unapproved = ap.unapproved_files();
            let Some(approver) = most_covering_approver(candidates, reverse_map, &unapproved)
            else {
                tracing::info!(
                    "couldn't find approvers for every directory, unapproved: {:?}",
                    unapproved
                );
                break;
            };
            if ap.approval(approver).is_some() {
                tracing::warn!("approver {approver} was already picked, unapproved: {unapproved:?}");
                break;
            }
            ap.add_approver(approver, "", false);
            if ap.unapproved_files().len() >= unapproved.len() {
                tracing::warn!("approver {approver} does not approve any of {unapproved:?}");
                ap.remove_approver(approver);
                break;
            }
        }
        ap.current_approvers()
    }

    /// The suggestions of [`Owners::suggested_approvers`] that still cover a
    /// directory left unapproved by `known_approvers`.
    pub fn keep_covering_approvers(
        &self,
        reverse_map: &BTreeMap<String, BTreeSet<String>>,
        known_approvers: &BTreeSet<String>,
        candidates: &[String],
    ) -> BTreeSet<String> {
        if candidates.is_empty() {
            tracing::debug!("no potential approvers to filter for relevance");
        }
        let unapproved = self.temporary_unapproved_files(known_approvers);
        self.suggested_approvers(reverse_map, candidates)
            .into_iter()
            .filter(|approver| {
                reverse_map
                    .get(approver)
                    .is_some_and(|dirs| !dirs.is_disjoint(&unapproved))
            })
            .collect()
    }

    fn temporary_unapproved_files(&self, approvers: &BTreeSet<String>) -> BTreeSet<String> {
        let mut ap = Approvers::new(self.clone());
        for approver in approvers {
            ap.add_approver(approver, "", false);
        }
        ap.unapproved_files()
    }
}

fn most_covering_approver<'c>(
    candidates: &'c [String],
    reverse_map: &BTreeMap<String, BTreeSet<String>>,
    unapproved: &BTreeSet<String>,
) -> Option<&'c str> {
    let mut best = None;
    let mut max_covered = 0;
    for candidate in candidates {
        let covered = reverse_map
            .get(&candidate.to_lowercase())
            .map_or(0, |dirs| dirs.intersection(unapproved).count());
        if covered > max_covered {
            max_covered = covered;
            best = Some(candidate.as_str());
        }
    }
    best
}

/// Maps `filenames` to their owning directories.
///
/// Returns the files that still need approval along with the reduced set of
/// directories.
fn owners_set(repo: &dyn OwnersTree, filenames: Vec<String>) -> (Vec<String>, BTreeSet<String>) {
    let mut kept = Vec::with_capacity(filenames.len());
    let mut dirs = BTreeSet::new();
    for file in filenames {
        let owners_dir = repo.find_approver_owners_for_file(&file);
        let file_dir = parent_dir(&file);
        if file_dir != owners_dir
            && parent_dir(file_dir) == owners_dir
            && repo.is_auto_approve_unowned_subfolders(&owners_dir)
        {
            tracing::debug!("{file} is in an auto-approved subfolder of `{owners_dir}`");
            continue;
        }
        dirs.insert(owners_dir);
        kept.push(file);
    }
    remove_subdirs(repo, &mut dirs);
    (kept, dirs)
}

/// Drops every directory that inherits from another member of `dirs`.
fn remove_subdirs(repo: &dyn OwnersTree, dirs: &mut BTreeSet<String>) {
    let all: Vec<String> = dirs.iter().cloned().collect();
    for dir in all {
        let mut path = dir.as_str();
        while !path.is_empty() && !repo.is_no_parent_owners(path) {
            path = parent_dir(path);
            if dirs.contains(path) {
                dirs.remove(&dir);
                break;
            }
        }
    }
}
