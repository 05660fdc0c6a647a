//! Child list diffing.
//!
//! Children are matched by slot name (explicit key, else position). A reused
//! child only moves when its previous index is below the highest previous
//! index already placed; everything else keeps its relative order, so shifts
//! caused by insertions or removals need no physical move.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStep {
    /// Update the child previously at `prev` in place, moving it if `moved`.
    Reuse { prev: usize, moved: bool },
    /// Mount a fresh child.
    Insert,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChildDiff {
    /// Previous indices to unmount, ascending.
    pub removals: Vec<usize>,
    /// One step per next child, in next order.
    pub steps: Vec<ChildStep>,
}

impl ChildDiff {
    /// Whether no previous child survives.
    pub fn all_fresh(&self) -> bool {
        self.steps.iter().all(|step| matches!(step, ChildStep::Insert))
    }

    pub fn moves(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, ChildStep::Reuse { moved: true, .. }))
            .count()
    }
}

/// Plan the transition from `prev` to `next` slot names. `reusable(prev, next)`
/// decides whether a name match may be updated in place; when it may not, the
/// old child is removed and a new one inserted.
pub fn diff_children<PrevName, NextName>(
    prev: &[PrevName],
    next: &[NextName],
    reusable: impl Fn(usize, usize) -> bool,
) -> ChildDiff
where
    PrevName: AsRef<str>,
    NextName: AsRef<str>,
{
    let by_name: HashMap<&str, usize> = prev
        .iter()
        .enumerate()
        .map(|(index, name)| (name.as_ref(), index))
        .collect();
    let mut used = vec![false; prev.len()];
    let mut last_index = 0;
    let mut steps = Vec::with_capacity(next.len());
    for (next_index, name) in next.iter().enumerate() {
        match by_name.get(name.as_ref()) {
            Some(&prev_index) if reusable(prev_index, next_index) => {
                let moved = prev_index < last_index;
                last_index = last_index.max(prev_index);
                used[prev_index] = true;
                steps.push(ChildStep::Reuse {
                    prev: prev_index,
                    moved,
                });
            }
            _ => steps.push(ChildStep::Insert),
        }
    }
    let removals = used
        .iter()
        .enumerate()
        .filter(|(_, kept)| !**kept)
        .map(|(index, _)| index)
        .collect();
    ChildDiff { removals, steps }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always(_: usize, _: usize) -> bool {
        true
    }

    #[test]
    fn identical_lists_update_in_place() {
        let diff = diff_children(&["0", "1", "2"], &["0", "1", "2"], always);
        assert!(diff.removals.is_empty());
        assert_eq!(diff.moves(), 0);
        assert_eq!(diff.steps[2], ChildStep::Reuse { prev: 2, moved: false });
    }

    #[test]
    fn moving_last_to_front_moves_only_the_displaced_children() {
        // a b c d -> d a b c: d stays, a b c move after it
        let diff = diff_children(&["$a", "$b", "$c", "$d"], &["$d", "$a", "$b", "$c"], always);
        assert_eq!(
            diff.steps,
            [
                ChildStep::Reuse { prev: 3, moved: false },
                ChildStep::Reuse { prev: 0, moved: true },
                ChildStep::Reuse { prev: 1, moved: true },
                ChildStep::Reuse { prev: 2, moved: true },
            ]
        );
    }

    #[test]
    fn shifts_from_insertions_and_removals_are_not_moves() {
        // a b c -> x b c y: a removed, x/y inserted, b and c keep their order
        let diff = diff_children(&["$a", "$b", "$c"], &["$x", "$b", "$c", "$y"], always);
        assert_eq!(diff.removals, [0]);
        assert_eq!(diff.moves(), 0);
        assert_eq!(diff.steps[0], ChildStep::Insert);
        assert_eq!(diff.steps[3], ChildStep::Insert);
    }

    #[test]
    fn swapped_keys_move_one_child() {
        let diff = diff_children(&["$a", "$b"], &["$b", "$a"], always);
        assert_eq!(diff.moves(), 1);
        assert_eq!(diff.steps[1], ChildStep::Reuse { prev: 0, moved: true });
    }

    #[test]
    fn unreusable_name_match_is_replaced() {
        let diff = diff_children(&["0"], &["0"], |_, _| false);
        assert_eq!(diff.removals, [0]);
        assert_eq!(diff.steps, [ChildStep::Insert]);
        assert!(diff.all_fresh());
    }

    #[test]
    fn changed_key_replaces_child() {
        let diff = diff_children(&["$A"], &["$B"], always);
        assert_eq!(diff.removals, [0]);
        assert!(diff.all_fresh());
    }
}
