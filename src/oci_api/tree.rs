//! Breadth-first traversal of the compartment hierarchy.
//!
//! The walk keeps an explicit frontier instead of recursing, so deep
//! hierarchies cannot exhaust the stack. Only `ACTIVE` compartments are
//! descended into; a failure listing one compartment's children is logged
//! and the walk continues with its siblings.

use crate::error::Result;
use crate::oci_api::models::Compartment;
use serde::Serialize;

/// Compartment lookups the walker needs.
#[allow(async_fn_in_trait)]
pub trait CompartmentSource {
    async fn get_compartment(&self, compartment_id: &str) -> Result<Compartment>;

    /// Direct children of `parent_id`.
    async fn list_child_compartments(&self, parent_id: &str) -> Result<Vec<Compartment>>;
}

/// A visited compartment and where it sits in the tree.
#[derive(Debug, Clone, Serialize)]
pub struct CompartmentNode {
    pub compartment: Compartment,
    pub parent_name: Option<String>,
    /// 0 for the root
    pub depth: usize,
}

/// Outcome of a walk.
#[derive(Debug, Default)]
pub struct WalkResult {
    /// Visit order: root first, then level by level
    pub nodes: Vec<CompartmentNode>,
    /// `(compartment id, error)` for every child listing that failed
    pub errors: Vec<(String, String)>,
    /// True when `max_visits` left an active compartment unvisited
    pub truncated: bool,
}

pub struct CompartmentWalker<'a, S: CompartmentSource> {
    source: &'a S,
    max_visits: usize,
}

impl<'a, S: CompartmentSource> CompartmentWalker<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            max_visits: 0,
        }
    }

    /// Stop after `max` compartments; 0 means unlimited.
    pub fn with_max_visits(mut self, max: usize) -> Self {
        self.max_visits = max;
        self
    }

    /// Walk the tree below `root_id`, root included.
    ///
    /// Fails only when the root itself cannot be read.
    pub async fn walk(&self, root_id: &str) -> Result<WalkResult> {
        let root = self.source.get_compartment(root_id).await?;
        let mut result = WalkResult::default();
        result.nodes.push(CompartmentNode {
            compartment: root,
            parent_name: None,
            depth: 0,
        });

        let mut cursor = 0;
        // Once full, frontier nodes are still listed until one turns out to
        // have an active child that no longer fits.
        while cursor < result.nodes.len() && !result.truncated {
            let (parent_id, parent_name, depth) = {
                let node = &result.nodes[cursor];
                (
                    node.compartment.id.clone(),
                    node.compartment.name.clone(),
                    node.depth,
                )
            };
            cursor += 1;

            let children = match self.source.list_child_compartments(&parent_id).await {
                Ok(children) => children,
                Err(e) => {
                    eprintln!(
                        "Warning: cannot list compartments under {} ({}): {}",
                        parent_name, parent_id, e
                    );
                    result.errors.push((parent_id, e.to_string()));
                    continue;
                }
            };

            for child in children.into_iter().filter(Compartment::is_active) {
                if self.limit_reached(result.nodes.len()) {
                    result.truncated = true;
                    break;
                }
                result.nodes.push(CompartmentNode {
                    compartment: child,
                    parent_name: Some(parent_name.clone()),
                    depth: depth + 1,
                });
            }
        }

        Ok(result)
    }

    fn limit_reached(&self, visited: usize) -> bool {
        self.max_visits != 0 && visited >= self.max_visits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::oci_api::models::LifecycleState;
    use std::collections::HashMap;

    fn compartment(id: &str, parent: Option<&str>, state: LifecycleState) -> Compartment {
        Compartment {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: String::new(),
            compartment_id: parent.map(str::to_string),
            lifecycle_state: state,
        }
    }

    struct Tree {
        nodes: HashMap<String, Compartment>,
        failing: Option<String>,
    }

    impl Tree {
        fn new(entries: Vec<Compartment>) -> Self {
            Self {
                nodes: entries.into_iter().map(|c| (c.id.clone(), c)).collect(),
                failing: None,
            }
        }
    }

    impl CompartmentSource for Tree {
        async fn get_compartment(&self, compartment_id: &str) -> Result<Compartment> {
            self.nodes
                .get(compartment_id)
                .cloned()
                .ok_or_else(|| Error::provider("NotAuthorizedOrNotFound"))
        }

        async fn list_child_compartments(&self, parent_id: &str) -> Result<Vec<Compartment>> {
            if self.failing.as_deref() == Some(parent_id) {
                return Err(Error::provider("throttled"));
            }
            let mut children: Vec<Compartment> = self
                .nodes
                .values()
                .filter(|c| c.compartment_id.as_deref() == Some(parent_id))
                .cloned()
                .collect();
            children.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(children)
        }
    }

    fn sample() -> Tree {
        use LifecycleState::*;
        Tree::new(vec![
            compartment("root", None, Active),
            compartment("a", Some("root"), Active),
            compartment("b", Some("root"), Active),
            compartment("gone", Some("root"), Deleted),
            compartment("a1", Some("a"), Active),
            compartment("b1", Some("b"), Active),
            compartment("hidden", Some("gone"), Active),
        ])
    }

    fn ids(result: &WalkResult) -> Vec<&str> {
        result
            .nodes
            .iter()
            .map(|n| n.compartment.id.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_breadth_first_order() {
        let tree = sample();
        let result = CompartmentWalker::new(&tree).walk("root").await.unwrap();

        assert_eq!(ids(&result), vec!["root", "a", "b", "a1", "b1"]);
        assert_eq!(result.nodes[3].depth, 2);
        assert_eq!(result.nodes[3].parent_name.as_deref(), Some("A"));
        assert!(!result.truncated);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_inactive_subtree_is_skipped() {
        let tree = sample();
        let result = CompartmentWalker::new(&tree).walk("root").await.unwrap();
        assert!(!ids(&result).contains(&"gone"));
        assert!(!ids(&result).contains(&"hidden"));
    }

    #[tokio::test]
    async fn test_child_listing_failure_continues() {
        let mut tree = sample();
        tree.failing = Some("a".to_string());
        let result = CompartmentWalker::new(&tree).walk("root").await.unwrap();

        assert_eq!(ids(&result), vec!["root", "a", "b", "b1"]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].0, "a");
    }

    #[tokio::test]
    async fn test_max_visits() {
        let tree = sample();
        let result = CompartmentWalker::new(&tree)
            .with_max_visits(3)
            .walk("root")
            .await
            .unwrap();
        assert_eq!(ids(&result), vec!["root", "a", "b"]);
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn test_tree_that_exactly_fills_limit_is_complete() {
        use LifecycleState::*;
        let tree = Tree::new(vec![
            compartment("root", None, Active),
            compartment("a", Some("root"), Active),
            compartment("b", Some("root"), Active),
            compartment("old", Some("b"), Deleted),
        ]);
        let result = CompartmentWalker::new(&tree)
            .with_max_visits(3)
            .walk("root")
            .await
            .unwrap();
        assert_eq!(ids(&result), vec!["root", "a", "b"]);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_missing_root_fails() {
        let tree = sample();
        assert!(CompartmentWalker::new(&tree).walk("nope").await.is_err());
    }
}
