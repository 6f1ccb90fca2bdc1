//! Sidebar tree view-model.
//!
//! A pure view over a registry snapshot: it decides which rows are visible
//! at which depth, tracks per-header collapse state and transient drag
//! state, and classifies drop zones. It never mutates the tree: a drop
//! gesture resolves to a `(dragged, target, position)` triple that the
//! caller hands to `ModuleRegistry::move_module`.

use crate::model::ModuleDef;
use crate::registry::DropPosition;
use std::collections::{HashMap, HashSet};

/// One visible line of the sidebar.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub module: ModuleDef,
    pub depth: usize,
    /// `Some(collapsed)` for headers, `None` for leaves.
    pub collapsed: Option<bool>,
}

/// Transient drag state: source node and the currently indicated zone.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub dragged_id: String,
    pub over: Option<(String, DropPosition)>,
}

#[derive(Default)]
pub struct SidebarTree {
    // Headers absent from the map are collapsed: collapsed is the default.
    expanded: HashMap<String, bool>,
    drag: Option<DragState>,
}

impl SidebarTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collapsed(&self, id: &str) -> bool {
        !self.expanded.get(id).copied().unwrap_or(false)
    }

    /// Flip a header's collapse state. View-layer state only; the registry
    /// never sees it.
    pub fn toggle(&mut self, id: &str) {
        let open = self.expanded.entry(id.to_string()).or_insert(false);
        *open = !*open;
    }

    pub fn expand_all(&mut self, tree: &[ModuleDef]) {
        for m in tree.iter().filter(|m| m.is_header()) {
            self.expanded.insert(m.id.clone(), true);
        }
    }

    /// Depth-first render respecting collapse state: top-level nodes in
    /// order, children under their non-collapsed parents, indent +1 per
    /// level.
    pub fn rows(&self, tree: &[ModuleDef]) -> Vec<Row> {
        let mut rows = Vec::new();
        for m in tree.iter().filter(|m| m.parent_id.is_none()) {
            self.push_subtree(tree, m, 0, None, &mut rows);
        }
        rows
    }

    /// Render with a search filter: a node is visible if it matches, or if
    /// any descendant matches (so a deep match keeps its header chain
    /// visible). Matching subtrees render expanded regardless of collapse
    /// state. An empty query falls back to the normal render.
    pub fn filter(&self, tree: &[ModuleDef], query: &str) -> Vec<Row> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.rows(tree);
        }
        let visible = visible_set(tree, &query);
        let mut rows = Vec::new();
        for m in tree.iter().filter(|m| m.parent_id.is_none()) {
            self.push_subtree(tree, m, 0, Some(&visible), &mut rows);
        }
        rows
    }

    fn push_subtree(
        &self,
        tree: &[ModuleDef],
        node: &ModuleDef,
        depth: usize,
        visible: Option<&HashSet<String>>,
        rows: &mut Vec<Row>,
    ) {
        if let Some(visible) = visible {
            if !visible.contains(&node.id) {
                return;
            }
        }
        let collapsed = node.is_header().then(|| self.is_collapsed(&node.id));
        rows.push(Row {
            module: node.clone(),
            depth,
            collapsed,
        });
        // Filtered renders ignore collapse so matches are never hidden.
        if visible.is_none() && collapsed == Some(true) {
            return;
        }
        for child in tree
            .iter()
            .filter(|m| m.parent_id.as_deref() == Some(node.id.as_str()))
        {
            self.push_subtree(tree, child, depth + 1, visible, rows);
        }
    }

    // --- drag and drop ---

    pub fn begin_drag(&mut self, id: &str) {
        self.drag = Some(DragState {
            dragged_id: id.to_string(),
            over: None,
        });
    }

    pub fn drag_state(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    /// Record the indicated zone while hovering `target` with the pointer
    /// at `fraction` (0.0 = top edge, 1.0 = bottom edge). Returns the zone
    /// so the caller can draw the indicator.
    pub fn drag_over(
        &mut self,
        target: &ModuleDef,
        dragged: &ModuleDef,
        fraction: f64,
    ) -> DropPosition {
        let zone = classify_drop(fraction, target.is_header(), dragged.is_header());
        if let Some(drag) = self.drag.as_mut() {
            drag.over = Some((target.id.clone(), zone));
        }
        zone
    }

    /// Complete the gesture: yields what the registry move needs, clearing
    /// all transient state.
    pub fn complete_drop(&mut self) -> Option<(String, String, DropPosition)> {
        let drag = self.drag.take()?;
        let (target_id, zone) = drag.over?;
        if drag.dragged_id == target_id {
            return None;
        }
        Some((drag.dragged_id, target_id, zone))
    }

    /// Cancel the gesture (drag-end without a drop), clearing indicators.
    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }
}

/// Matching nodes plus all of their transitive ancestors.
fn visible_set(tree: &[ModuleDef], query: &str) -> HashSet<String> {
    let mut visible = HashSet::new();
    for m in tree {
        if m.name.to_lowercase().contains(query) || m.id.contains(query) {
            visible.insert(m.id.clone());
            let mut cursor = m.parent_id.clone();
            let mut hops = 0;
            while let Some(parent) = cursor {
                if !visible.insert(parent.clone()) || hops > tree.len() {
                    break;
                }
                hops += 1;
                cursor = tree
                    .iter()
                    .find(|p| p.id == parent)
                    .and_then(|p| p.parent_id.clone());
            }
        }
    }
    visible
}

/// Map the pointer's vertical position within the target row to a drop
/// zone: top 30%, middle 40%, bottom 30%. The middle zone only exists when
/// the target is a header and the dragged node is not; otherwise it splits
/// into the nearer of top and bottom.
pub fn classify_drop(fraction: f64, target_is_header: bool, dragged_is_header: bool) -> DropPosition {
    let middle_legal = target_is_header && !dragged_is_header;
    if fraction < 0.3 {
        DropPosition::Top
    } else if fraction <= 0.7 {
        if middle_legal {
            DropPosition::Middle
        } else if fraction < 0.5 {
            DropPosition::Top
        } else {
            DropPosition::Bottom
        }
    } else {
        DropPosition::Bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModuleDef;

    fn sample_tree() -> Vec<ModuleDef> {
        vec![
            ModuleDef {
                order: 0,
                requires_client: false,
                ..ModuleDef::regular("notes", "Notes", None)
            },
            ModuleDef {
                order: 1,
                ..ModuleDef::header("foundations", "Foundations")
            },
            ModuleDef {
                order: 0,
                ..ModuleDef::regular("earthworks", "Earthworks", Some("foundations"))
            },
            ModuleDef {
                order: 1,
                ..ModuleDef::regular("concrete", "Concrete", Some("foundations"))
            },
            ModuleDef {
                order: 2,
                ..ModuleDef::regular("demolish", "Demolish", None)
            },
        ]
    }

    #[test]
    fn headers_default_collapsed() {
        let view = SidebarTree::new();
        let rows = view.rows(&sample_tree());
        let ids: Vec<&str> = rows.iter().map(|r| r.module.id.as_str()).collect();
        assert_eq!(ids, ["notes", "foundations", "demolish"]);
        assert_eq!(rows[1].collapsed, Some(true));
    }

    #[test]
    fn toggling_a_header_reveals_children_with_depth() {
        let mut view = SidebarTree::new();
        view.toggle("foundations");
        let rows = view.rows(&sample_tree());
        let ids: Vec<&str> = rows.iter().map(|r| r.module.id.as_str()).collect();
        assert_eq!(ids, ["notes", "foundations", "earthworks", "concrete", "demolish"]);
        assert_eq!(rows[2].depth, 1);
        assert_eq!(rows[0].depth, 0);

        view.toggle("foundations");
        assert_eq!(view.rows(&sample_tree()).len(), 3);
    }

    #[test]
    fn filter_keeps_the_ancestor_chain_of_a_deep_match() {
        let view = SidebarTree::new();
        // "concrete" is under a collapsed header; the filter must still show
        // it, along with the header.
        let rows = view.filter(&sample_tree(), "conc");
        let ids: Vec<&str> = rows.iter().map(|r| r.module.id.as_str()).collect();
        assert_eq!(ids, ["foundations", "concrete"]);
    }

    #[test]
    fn empty_filter_reverts_to_collapse_respecting_render() {
        let view = SidebarTree::new();
        assert_eq!(view.filter(&sample_tree(), "  "), view.rows(&sample_tree()));
    }

    #[test]
    fn filter_matches_are_case_insensitive() {
        let view = SidebarTree::new();
        let rows = view.filter(&sample_tree(), "DEMO");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].module.id, "demolish");
    }

    #[test]
    fn classify_drop_zones() {
        // Regular target: no middle zone, splits at the midline.
        assert_eq!(classify_drop(0.1, false, false), DropPosition::Top);
        assert_eq!(classify_drop(0.45, false, false), DropPosition::Top);
        assert_eq!(classify_drop(0.55, false, false), DropPosition::Bottom);
        assert_eq!(classify_drop(0.9, false, false), DropPosition::Bottom);

        // Header target: middle 40% nests.
        assert_eq!(classify_drop(0.5, true, false), DropPosition::Middle);
        assert_eq!(classify_drop(0.29, true, false), DropPosition::Top);
        assert_eq!(classify_drop(0.71, true, false), DropPosition::Bottom);

        // A dragged header never nests, even over another header.
        assert_eq!(classify_drop(0.5, true, true), DropPosition::Bottom);
    }

    #[test]
    fn drop_yields_the_move_triple_and_clears_state() {
        let tree = sample_tree();
        let mut view = SidebarTree::new();
        view.begin_drag("demolish");
        let zone = view.drag_over(&tree[1], &tree[4], 0.5);
        assert_eq!(zone, DropPosition::Middle);

        let (dragged, target, position) = view.complete_drop().unwrap();
        assert_eq!(dragged, "demolish");
        assert_eq!(target, "foundations");
        assert_eq!(position, DropPosition::Middle);
        assert!(view.drag_state().is_none());
    }

    #[test]
    fn cancel_clears_transient_state() {
        let tree = sample_tree();
        let mut view = SidebarTree::new();
        view.begin_drag("demolish");
        view.drag_over(&tree[1], &tree[4], 0.5);
        view.cancel_drag();
        assert!(view.drag_state().is_none());
        assert!(view.complete_drop().is_none());
    }

    #[test]
    fn drop_on_self_is_ignored() {
        let tree = sample_tree();
        let mut view = SidebarTree::new();
        view.begin_drag("demolish");
        view.drag_over(&tree[4], &tree[4], 0.1);
        assert!(view.complete_drop().is_none());
    }
}
