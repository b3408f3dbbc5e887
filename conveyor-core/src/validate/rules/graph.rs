use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::types::PipelineDefinition;
use crate::validate::validator::Validator;

/// Graph checks over the normal-flow (`next`) edges: acyclicity, and
/// reachability of every stage from `startAt`. Retry loops are internal to a
/// single stage and catch redirects are failure edges; neither counts as
/// normal flow for the cycle check, but catch targets do count as reachable.
pub(crate) fn validate_flow_graph(
    v: &mut Validator,
    def: &PipelineDefinition,
    stage_names: &HashSet<&str>,
) {
    let mut next_edges: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for stage in &def.stages {
        let targets = next_edges.entry(stage.name.as_str()).or_default();
        if let Some(next) = &stage.next {
            if stage_names.contains(next.as_str()) {
                targets.push(next.as_str());
            }
        }
    }

    if has_cycle(&next_edges) {
        v.push("$.stages", "normal-flow graph must be acyclic (cycle in next edges)");
    }

    // Reachability walks next and catch edges together.
    let mut reachable: HashSet<&str> = HashSet::new();
    let mut queue = VecDeque::new();
    if stage_names.contains(def.start_at.as_str()) {
        queue.push_back(def.start_at.as_str());
        reachable.insert(def.start_at.as_str());
    }
    while let Some(name) = queue.pop_front() {
        let Some(stage) = def.stage(name) else { continue };
        let targets = stage
            .next
            .iter()
            .chain(stage.catch.iter().map(|c| &c.next));
        for target in targets {
            if stage_names.contains(target.as_str()) && reachable.insert(target.as_str()) {
                queue.push_back(target.as_str());
            }
        }
    }

    for (idx, stage) in def.stages.iter().enumerate() {
        if !reachable.contains(stage.name.as_str()) {
            v.push(
                format!("$.stages[{idx}]"),
                format!("stage is not reachable from startAt: {}", stage.name),
            );
        }
    }
}

fn has_cycle(edges: &BTreeMap<&str, Vec<&str>>) -> bool {
    let mut indeg: BTreeMap<&str, usize> = edges.keys().map(|n| (*n, 0)).collect();
    for targets in edges.values() {
        for t in targets {
            if let Some(d) = indeg.get_mut(t) {
                *d += 1;
            }
        }
    }

    let mut queue: VecDeque<&str> = indeg
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| *n)
        .collect();

    let mut visited = 0usize;
    while let Some(n) = queue.pop_front() {
        visited += 1;
        if let Some(targets) = edges.get(n) {
            for t in targets {
                let d = indeg.get_mut(t).expect("target present in indegree map");
                *d -= 1;
                if *d == 0 {
                    queue.push_back(t);
                }
            }
        }
    }

    visited != edges.len()
}
