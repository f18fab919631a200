use crate::config::FpingConfig;
use latprobe_model::HostEntry;
use std::collections::{BTreeMap, BTreeSet};

/// Every entry the config lists: the top-level `hosts` first, then each
/// group's `hosts` in group-name order. Groups are flattened one level only.
pub fn host_entries(config: &FpingConfig) -> impl Iterator<Item = &HostEntry> {
    config
        .hosts
        .iter()
        .chain(config.groups.values().flat_map(|group| group.hosts.iter()))
}

/// Deduplicated addresses to probe this cycle.
///
/// The result is sorted lexicographically; callers must not read anything
/// into that order, it only keeps the argument vector reproducible.
pub fn resolve_hosts(config: &FpingConfig) -> Vec<String> {
    host_entries(config)
        .map(|entry| entry.host().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Per group, the hosts it holds keyed by address, with their metadata.
/// Dashboards use this to label series by group.
pub fn group_targets(config: &FpingConfig) -> BTreeMap<String, BTreeMap<String, HostEntry>> {
    config
        .groups
        .iter()
        .map(|(name, group)| {
            let targets = group
                .hosts
                .iter()
                .map(|entry| (entry.host().to_string(), entry.annotated()))
                .collect();
            (name.clone(), targets)
        })
        .collect()
}
