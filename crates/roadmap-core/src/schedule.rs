//! Dependency ordering for issue creation.
//!
//! Tasks are emitted dependencies-first using Kahn's algorithm. Among tasks
//! that are ready at the same time the lexicographically smallest key goes
//! first, so the order is reproducible across runs. Tasks that never become
//! ready (cycle members and anything downstream of a cycle) are appended in
//! their original order. Ordering never fails.

use crate::task::{Task, TaskSet};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Result of ordering a task set.
#[derive(Debug, Clone, PartialEq)]
pub struct TopoOrder {
    /// Tasks in dependency order.
    pub ordered: Vec<Task>,
    /// Tasks left over because of a cycle, in input order.
    pub unresolved: Vec<Task>,
}

impl TopoOrder {
    pub fn has_cycles(&self) -> bool {
        !self.unresolved.is_empty()
    }

    /// The full sequence: resolved tasks followed by unresolved ones.
    pub fn into_task_set(self) -> TaskSet {
        self.ordered.into_iter().chain(self.unresolved).collect()
    }
}

/// Order `tasks` so that dependencies precede dependents.
///
/// The result is always a permutation of the input.
pub fn sort_tasks(tasks: &TaskSet) -> TaskSet {
    topological_order(tasks).into_task_set()
}

/// Same as [`sort_tasks`], keeping the unresolved tail separate.
pub fn topological_order(tasks: &TaskSet) -> TopoOrder {
    // Only edges pointing at tasks inside the set count. Repeated entries in a
    // dependency list count once.
    let mut in_degree: HashMap<&str, usize> = HashMap::with_capacity(tasks.len());
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for task in tasks {
        let deps: HashSet<&str> = task
            .dependencies
            .iter()
            .map(String::as_str)
            .filter(|d| tasks.contains(d))
            .collect();
        in_degree.insert(task.key.as_str(), deps.len());
        for dep in deps {
            dependents.entry(dep).or_default().push(task.key.as_str());
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&key, _)| key)
        .collect();

    let mut emitted: HashSet<&str> = HashSet::with_capacity(tasks.len());
    let mut ordered = Vec::with_capacity(tasks.len());

    while let Some(key) = ready.pop_first() {
        emitted.insert(key);
        if let Some(task) = tasks.get(key) {
            ordered.push(task.clone());
        }
        for &dependent in dependents.get(key).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(deg) = in_degree.get_mut(dependent) {
                *deg -= 1;
                if *deg == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    let unresolved: Vec<Task> = tasks
        .iter()
        .filter(|t| !emitted.contains(t.key.as_str()))
        .cloned()
        .collect();

    TopoOrder {
        ordered,
        unresolved,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(specs: &[(&str, &[&str])]) -> TaskSet {
        specs
            .iter()
            .map(|(key, deps)| Task::new(*key, *key).depends_on(deps))
            .collect()
    }

    fn keys(tasks: &TaskSet) -> Vec<String> {
        tasks.keys().map(str::to_string).collect()
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let sorted = sort_tasks(&TaskSet::new());
        assert!(sorted.is_empty());
    }

    #[test]
    fn single_task_is_returned() {
        let sorted = sort_tasks(&set(&[("T1", &[])]));
        assert_eq!(keys(&sorted), vec!["T1"]);
    }

    #[test]
    fn diamond_uses_lexicographic_tie_break() {
        // Input order deliberately scrambled.
        let tasks = set(&[
            ("D", &["B", "C"]),
            ("C", &["A"]),
            ("B", &["A"]),
            ("A", &[]),
        ]);
        let sorted = sort_tasks(&tasks);
        assert_eq!(keys(&sorted), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn two_cycle_is_appended_in_input_order() {
        let tasks = set(&[("Y", &["X"]), ("X", &["Y"]), ("Z", &[])]);
        let order = topological_order(&tasks);
        assert!(order.has_cycles());
        let ordered: Vec<&str> = order.ordered.iter().map(|t| t.key.as_str()).collect();
        let unresolved: Vec<&str> = order.unresolved.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(ordered, vec!["Z"]);
        assert_eq!(unresolved, vec!["Y", "X"]);

        assert_eq!(keys(&sort_tasks(&tasks)), vec!["Z", "Y", "X"]);
    }

    #[test]
    fn self_loop_is_unresolved() {
        let tasks = set(&[("A", &["A"]), ("B", &[])]);
        assert_eq!(keys(&sort_tasks(&tasks)), vec!["B", "A"]);
    }

    #[test]
    fn downstream_of_cycle_is_unresolved_in_input_order() {
        let tasks = set(&[("C", &["A"]), ("A", &["B"]), ("B", &["A"]), ("D", &[])]);
        assert_eq!(keys(&sort_tasks(&tasks)), vec!["D", "C", "A", "B"]);
    }

    #[test]
    fn dangling_dependency_does_not_block() {
        let tasks = set(&[("B", &["A"]), ("C", &["missing"])]);
        let order = topological_order(&tasks);
        assert!(!order.has_cycles());
        assert_eq!(keys(&order.into_task_set()), vec!["B", "C"]);
    }

    #[test]
    fn repeated_dependency_counts_once() {
        let tasks = set(&[("B", &["A", "A"]), ("A", &[])]);
        assert_eq!(keys(&sort_tasks(&tasks)), vec!["A", "B"]);
    }

    #[test]
    fn ready_queue_prefers_smallest_key_over_input_order() {
        // T10 becomes ready after T1; T2 is ready from the start but sorts after T10.
        let tasks = set(&[("T2", &[]), ("T1", &[]), ("T10", &["T1"])]);
        assert_eq!(keys(&sort_tasks(&tasks)), vec!["T1", "T10", "T2"]);
    }

    #[test]
    fn sorting_is_deterministic() {
        let tasks = set(&[
            ("E", &["D"]),
            ("D", &[]),
            ("C", &["A", "D"]),
            ("B", &[]),
            ("A", &["B"]),
        ]);
        let first = sort_tasks(&tasks);
        for _ in 0..10 {
            assert_eq!(sort_tasks(&tasks), first);
        }
    }

    #[test]
    fn input_is_not_mutated() {
        let tasks = set(&[("B", &["A"]), ("A", &[])]);
        let before = tasks.clone();
        let _ = sort_tasks(&tasks);
        assert_eq!(tasks, before);
    }

    // Random graphs over keys K0..Kn, with arbitrary (possibly cyclic or
    // dangling) dependency lists.
    fn graph_strategy() -> impl Strategy<Value = TaskSet> {
        (1usize..12).prop_flat_map(|n| {
            proptest::collection::vec(proptest::collection::vec(0usize..n + 2, 0..4), n).prop_map(
                |raw| {
                    raw.into_iter()
                        .enumerate()
                        .map(|(i, deps)| {
                            let deps: Vec<String> =
                                deps.into_iter().map(|d| format!("K{d}")).collect();
                            let mut t = Task::new(format!("K{i}"), "");
                            t.dependencies = deps;
                            t
                        })
                        .collect::<TaskSet>()
                },
            )
        })
    }

    proptest! {
        #[test]
        fn output_is_a_permutation(tasks in graph_strategy()) {
            let sorted = sort_tasks(&tasks);
            prop_assert_eq!(sorted.len(), tasks.len());
            let mut a: Vec<&str> = tasks.keys().collect();
            let mut b: Vec<&str> = sorted.keys().collect();
            a.sort();
            b.sort();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn resolved_tasks_follow_their_dependencies(tasks in graph_strategy()) {
            let order = topological_order(&tasks);
            let resolved: HashMap<&str, usize> = order
                .ordered
                .iter()
                .enumerate()
                .map(|(i, t)| (t.key.as_str(), i))
                .collect();
            for task in &order.ordered {
                for dep in &task.dependencies {
                    if tasks.contains(dep) {
                        let dep_pos = resolved.get(dep.as_str());
                        prop_assert!(dep_pos.is_some());
                        prop_assert!(dep_pos.copied() < resolved.get(task.key.as_str()).copied());
                    }
                }
            }
        }
    }
}
