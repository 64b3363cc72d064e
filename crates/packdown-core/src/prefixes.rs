//! Checked path-prefix sets.
//!
//! The selection surface tracks which subtrees the user ticked as a set of
//! path prefixes. Expansion replaces a prefix by its children; consolidation
//! bubbles complete sibling sets back up to their parent. For an already
//! consolidated set, `consolidate(expand(p)) == p`.

use crate::grouping;

/// Replace every prefix that has children by those children; childless
/// prefixes are kept as-is. Output is deduplicated in first-seen order.
pub fn expand<F>(prefixes: &[String], children_of: F) -> Vec<String>
where
    F: Fn(&str) -> Vec<String>,
{
    let mut out: Vec<String> = Vec::new();
    for prefix in prefixes {
        let children = children_of(prefix);
        if children.is_empty() {
            push_unique(&mut out, prefix.clone());
        } else {
            for child in children {
                push_unique(&mut out, child);
            }
        }
    }
    out
}

/// Whenever every listed child of a parent is present, replace the children
/// by the parent; repeat until stable. Partial sibling sets stay as they are.
pub fn consolidate<F>(paths: &[String], children_of: F) -> Vec<String>
where
    F: Fn(&str) -> Vec<String>,
{
    let mut current: Vec<String> = Vec::new();
    for p in paths {
        push_unique(&mut current, p.clone());
    }

    loop {
        let mut next: Vec<String> = Vec::new();
        let mut changed = false;

        for path in &current {
            if next.contains(path) {
                continue;
            }
            let parent = grouping::immediate_parent(path);
            if parent.is_empty() {
                push_unique(&mut next, path.clone());
                continue;
            }
            let siblings = children_of(parent);
            let complete = !siblings.is_empty()
                && siblings.iter().all(|s| current.contains(s));
            if complete {
                // The whole sibling set collapses into the parent; each
                // member hits this branch and dedup keeps one copy.
                push_unique(&mut next, parent.to_string());
                changed = true;
            } else {
                push_unique(&mut next, path.clone());
            }
        }

        current = next;
        if !changed {
            return current;
        }
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}
