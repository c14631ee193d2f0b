//! Advisory DOT rendering of a search tree.
//!
//! Intended for eyeballing small trees; agents emit one rendering per
//! episode through the logging layer at trace level.

use crate::node::StateId;
use crate::tree::SearchTree;
use std::fmt;
use std::fmt::Write as _;
use std::hash::Hash;

/// Render the tree below the root as a DOT digraph, down to `max_depth`
/// levels of state nodes.
pub fn to_graphviz<S, A, V, Q>(tree: &SearchTree<S, A, V, Q>, max_depth: u32) -> String
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Copy + Eq + fmt::Debug,
    V: Clone + Default + fmt::Debug,
    Q: Clone + Default + fmt::Debug,
{
    let mut out = String::from("digraph search_tree {\n");
    out.push_str("  node [shape=box, fontsize=10];\n");

    let mut stack: Vec<StateId> = vec![tree.root()];
    while let Some(sid) = stack.pop() {
        let node = tree.state(sid);
        let _ = writeln!(
            out,
            "  s{} [label=\"{}\\nN={} v={}\"];",
            sid.0,
            escape(&format!("{:?}", node.state)),
            node.num_visits,
            escape(&format!("{:?}", node.v)),
        );
        if node.depth >= max_depth {
            continue;
        }
        for aid in &node.children {
            let action = tree.action(*aid);
            let _ = writeln!(
                out,
                "  a{} [shape=ellipse, label=\"{}\\nN={} r={:.2} p={:.2}\"];",
                aid.0,
                escape(&format!("{:?}", action.action)),
                action.num_visits,
                action.outcome.reward,
                action.outcome.penalty,
            );
            let _ = writeln!(out, "  s{} -> a{};", sid.0, aid.0);
            for (_, child) in &action.children {
                let _ = writeln!(out, "  a{} -> s{};", aid.0, child.0);
                stack.push(*child);
            }
        }
    }

    out.push_str("}\n");
    out
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
