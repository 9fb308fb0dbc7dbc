//! Conversation-tree depth over `uuid` / `parentUuid` references.
//!
//! Depth is measured per message node across every scanned stream: a node
//! without a parent has depth 1, any other node one more than its parent.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::format::round_to;
use crate::models::{EventRecord, SessionDepth};
use crate::parser::EventFold;

/// Ordered maps: with a cycle, the depths depend on which node is walked
/// first, so the walk order must not vary between runs.
#[derive(Debug, Default)]
pub struct ThreadGraph {
    parents: BTreeMap<String, String>,
    roots: BTreeSet<String>,
}

impl ThreadGraph {
    /// Depth of `start`, filling `memo` for every node on its parent chain.
    ///
    /// Walks up with an explicit chain instead of recursing. A parent already
    /// on the current chain closes a cycle; the node pointing at it is
    /// treated as a root.
    fn depth_of<'a>(&'a self, start: &'a str, memo: &mut HashMap<&'a str, u64>) -> u64 {
        let mut chain: Vec<&str> = Vec::new();
        let mut on_chain: HashSet<&str> = HashSet::new();
        let mut current = start;

        let base = loop {
            if let Some(depth) = memo.get(current) {
                break *depth;
            }
            chain.push(current);
            on_chain.insert(current);
            match self.parents.get(current) {
                Some(parent) if !on_chain.contains(parent.as_str()) => current = parent.as_str(),
                _ => break 0,
            }
        };

        let mut depth = base;
        for node in chain.into_iter().rev() {
            depth += 1;
            memo.insert(node, depth);
        }
        depth
    }
}

impl EventFold for ThreadGraph {
    /// `None` when no node was observed.
    type Output = Option<SessionDepth>;

    fn observe(&mut self, record: &EventRecord) {
        let Some(uuid) = &record.uuid else {
            return;
        };
        match &record.parent_uuid {
            Some(parent) => {
                self.parents.insert(uuid.clone(), parent.clone());
            }
            None => {
                self.roots.insert(uuid.clone());
            }
        }
    }

    fn merge(&mut self, later: Self) {
        self.parents.extend(later.parents);
        self.roots.extend(later.roots);
    }

    fn finish(self) -> Option<SessionDepth> {
        let mut memo = HashMap::new();
        let depths: Vec<u64> = self
            .parents
            .keys()
            .chain(self.roots.iter())
            .map(|node| self.depth_of(node, &mut memo))
            .collect();

        let max_depth = *depths.iter().max()?;
        let avg = depths.iter().sum::<u64>() as f64 / depths.len() as f64;

        Some(SessionDepth {
            max_depth,
            avg_depth: round_to(avg, 2),
            sessions_with_children: depths.iter().filter(|d| **d > 1).count() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(uuid: &str, parent: Option<&str>) -> EventRecord {
        EventRecord::from_value(&json!({"type": "user", "uuid": uuid, "parentUuid": parent}))
    }

    fn graph(nodes: &[(&str, Option<&str>)]) -> ThreadGraph {
        let mut graph = ThreadGraph::default();
        for (uuid, parent) in nodes {
            graph.observe(&node(uuid, *parent));
        }
        graph
    }

    #[test]
    fn test_linear_chain() {
        let depth = graph(&[("C", Some("B")), ("A", None), ("B", Some("A"))])
            .finish()
            .unwrap();
        assert_eq!(
            depth,
            SessionDepth {
                max_depth: 3,
                avg_depth: 2.0,
                sessions_with_children: 2,
            }
        );
    }

    #[test]
    fn test_chain_spanning_streams() {
        let mut first = graph(&[("A", None), ("B", Some("A"))]);
        first.merge(graph(&[("C", Some("B")), ("D", Some("C"))]));
        let depth = first.finish().unwrap();
        assert_eq!(depth.max_depth, 4);
        assert_eq!(depth.avg_depth, 2.5);
    }

    #[test]
    fn test_unseen_parent_counts_as_root() {
        let depth = graph(&[("B", Some("ghost"))]).finish().unwrap();
        assert_eq!(depth.max_depth, 2);
        assert_eq!(depth.avg_depth, 2.0);
        assert_eq!(depth.sessions_with_children, 1);
    }

    #[test]
    fn test_cycle_terminates() {
        let depth = graph(&[("A", Some("B")), ("B", Some("A"))]).finish().unwrap();
        assert_eq!(depth.max_depth, 2);
        assert_eq!(depth.sessions_with_children, 1);
    }

    #[test]
    fn test_cycle_with_tail_is_stable() {
        // D -> A -> B -> C -> A, observed in two different orders.
        let nodes = [("D", Some("A")), ("A", Some("B")), ("B", Some("C")), ("C", Some("A"))];
        let expected = SessionDepth {
            max_depth: 4,
            avg_depth: 2.5,
            sessions_with_children: 3,
        };

        assert_eq!(graph(&nodes).finish().unwrap(), expected);

        let mut reversed = nodes;
        reversed.reverse();
        for _ in 0..5 {
            assert_eq!(graph(&reversed).finish().unwrap(), expected);
        }
    }

    #[test]
    fn test_long_chain_without_recursion() {
        let mut g = ThreadGraph::default();
        g.observe(&node("n0", None));
        for i in 1..100_000 {
            g.observe(&node(&format!("n{i}"), Some(&format!("n{}", i - 1))));
        }
        assert_eq!(g.finish().unwrap().max_depth, 100_000);
    }

    #[test]
    fn test_records_without_uuid_are_ignored() {
        let mut g = ThreadGraph::default();
        g.observe(&EventRecord::from_value(&json!({"parentUuid": "x"})));
        assert!(g.finish().is_none());
    }
}
