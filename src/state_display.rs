//! Tree-style display of a parameter store
//!
//! ```text
//! ├── lead
//! │   ├── n_steps: 16
//! │   └── fx
//! │       └── hpf: 400
//! └── bass
//!     └── sound: "super808"
//! ```

use crate::params::Value;
use crate::state::State;
use std::fmt;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Rendering of an empty root node
pub const EMPTY_TREE: &str = "└── (empty)";

impl State {
    /// Render the node and its descendants as an ASCII tree.
    ///
    /// With `depth = Some(d)`, nodes at level `d` and deeper are shown as
    /// leaves holding their full form instead of being expanded.
    pub fn tree(&self, depth: Option<usize>) -> String {
        if self.is_empty() {
            return EMPTY_TREE.to_string();
        }
        let mut lines = Vec::new();
        render(self, depth, "", 0, &mut lines);
        lines.join("\n")
    }

    /// Print [`State::tree`] after a blank line
    pub fn show(&self, depth: Option<usize>) {
        println!("\n{}", self.tree(depth));
    }
}

fn render(
    state: &State,
    depth: Option<usize>,
    prefix: &str,
    level: usize,
    lines: &mut Vec<String>,
) {
    let count = state.len();
    for (i, (key, value)) in state.iter().enumerate() {
        let is_last = i + 1 == count;
        let branch = if is_last { LAST_BRANCH } else { BRANCH };

        match value {
            Value::Node(child) if depth.map_or(true, |d| level < d) => {
                lines.push(format!("{prefix}{branch}{key}"));
                let next_prefix = format!("{prefix}{}", if is_last { SPACE } else { PIPE });
                render(child, depth, &next_prefix, level + 1, lines);
            }
            leaf => lines.push(format!("{prefix}{branch}{key}: {}", leaf_text(leaf))),
        }
    }
}

fn leaf_text(value: &Value) -> String {
    match value {
        Value::Text(s) => format!("\"{}\"", s),
        other => other.to_string(),
    }
}

/// Summary form: the direct keys only
impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "State({:?})", self.keys().collect::<Vec<_>>())
    }
}

/// Full form: the complete nested content
impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("State(")?;
        f.debug_map().entries(self.iter()).finish()?;
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    fn performance() -> State {
        let mut state = State::new();
        state.child("lead").set(params! { "n_steps" => 16, "sound" => "supersaw" });
        state.dotted("lead.fx").insert("hpf", 400);
        state.child("bass").insert("amp", 0.3);
        state
    }

    #[test]
    fn test_empty_tree() {
        assert_eq!(State::new().tree(None), "└── (empty)");
    }

    #[test]
    fn test_nested_tree() {
        let mut state = State::new();
        state.child("a").insert("b", 1);
        assert_eq!(state.tree(None), "└── a\n    └── b: 1");
    }

    #[test]
    fn test_full_tree_glyphs() {
        let expected = [
            "├── lead",
            "│   ├── n_steps: 16",
            "│   ├── sound: \"supersaw\"",
            "│   └── fx",
            "│       └── hpf: 400",
            "└── bass",
            "    └── amp: 0.3",
        ]
        .join("\n");
        assert_eq!(performance().tree(None), expected);
    }

    #[test]
    fn test_depth_limit_shows_full_form() {
        let tree = performance().tree(Some(1));
        assert!(tree.contains("├── lead\n"));
        assert!(tree.contains("│   └── fx: State({\"hpf\": 400})"));
        assert!(!tree.contains("hpf: 400"));
    }

    #[test]
    fn test_depth_zero_collapses_top_level() {
        let tree = performance().tree(Some(0));
        assert_eq!(tree.lines().count(), 2);
        assert!(tree.starts_with("├── lead: State({"));
    }

    #[test]
    fn test_empty_nested_node_renders_key_only() {
        let mut state = State::new();
        state.child("empty");
        state.insert("amp", 0.5);
        assert_eq!(state.tree(None), "├── empty\n└── amp: 0.5");
    }

    #[test]
    fn test_tree_is_read_only() {
        let state = performance();
        let before = state.clone();
        let _ = state.tree(Some(1));
        assert_eq!(state, before);
    }

    #[test]
    fn test_summary_and_full_forms() {
        let mut state = State::new();
        state.child("drums").insert("kick", 0.8);
        state.insert("bpm", 120);
        assert_eq!(state.to_string(), r#"State(["drums", "bpm"])"#);
        assert_eq!(
            format!("{:?}", state),
            r#"State({"drums": State({"kick": 0.8}), "bpm": 120})"#
        );
    }
}
