//! Ordering applied to a stage's results once its queue drains.

use core_journal::{ExpansionJournal, InstanceJournal};
use std::collections::HashSet;

pub fn sort_expansions(expansions: &mut [ExpansionJournal]) {
    expansions.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.name.cmp(&b.name)));
}

/// Stable sort by `(id, name)`.
pub fn sort_instances(instances: &mut [InstanceJournal]) {
    instances.sort_by(InstanceJournal::cmp_by_id_and_name);
}

/// Drop exact duplicates, keeping the first occurrence, then sort.
///
/// Dungeons shared by several expansions are listed once per expansion
/// journal. Running this twice yields the same list.
pub fn dedup_and_sort_instances(instances: Vec<InstanceJournal>) -> Vec<InstanceJournal> {
    let mut seen = HashSet::with_capacity(instances.len());
    let mut unique: Vec<InstanceJournal> = instances
        .into_iter()
        .filter(|instance| seen.insert(instance.clone()))
        .collect();
    sort_instances(&mut unique);
    unique
}
