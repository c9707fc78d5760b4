//! Pure ordering computation for drag-drop gestures.
//!
//! The caller applies the gesture to local copies of the container lists
//! first (`move_item_in_list` / `transfer_list_item`); `compute_order` then
//! projects those post-mutation lists into the id sequences to persist. No
//! validation happens here: final placement is whatever the lists say.

use shared::domain::{Task, TaskId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderOutcome {
    pub source_order: Vec<TaskId>,
    pub target_order: Vec<TaskId>,
}

/// Ordered id projection of both containers after the move was applied
/// locally. For a same-container reorder, pass the same list twice. Empty
/// containers yield empty arrays, never an error.
pub fn compute_order(source_items: &[Task], target_items: &[Task]) -> ReorderOutcome {
    ReorderOutcome {
        source_order: project_ids(source_items),
        target_order: project_ids(target_items),
    }
}

pub fn project_ids(items: &[Task]) -> Vec<TaskId> {
    items.iter().map(|task| task.id.clone()).collect()
}

/// Moves one element inside a list. Out-of-range indices clamp to the last
/// element; an empty list is left untouched.
pub fn move_item_in_list<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if items.is_empty() {
        return;
    }
    let from = from.min(items.len() - 1);
    let to = to.min(items.len() - 1);
    if from == to {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

/// Moves one element from `source` into `target` at `to`. `from` clamps to
/// the last source element, `to` clamps to the target length; an empty
/// source is left untouched.
pub fn transfer_list_item<T>(source: &mut Vec<T>, target: &mut Vec<T>, from: usize, to: usize) {
    if source.is_empty() {
        return;
    }
    let from = from.min(source.len() - 1);
    let to = to.min(target.len());
    let item = source.remove(from);
    target.insert(to, item);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str) -> Task {
        Task {
            id: TaskId::from(id),
            title: id.to_string(),
            description: String::new(),
            created_at: None,
        }
    }

    fn tasks(ids: &[&str]) -> Vec<Task> {
        ids.iter().map(|id| task(id)).collect()
    }

    fn raw(order: &[TaskId]) -> Vec<&str> {
        order.iter().map(|id| id.as_str()).collect()
    }

    #[test]
    fn unchanged_container_projects_identically() {
        let items = tasks(&["a", "b", "c"]);
        let outcome = compute_order(&items, &items);
        assert_eq!(raw(&outcome.source_order), vec!["a", "b", "c"]);
        assert_eq!(outcome.source_order, outcome.target_order);
    }

    #[test]
    fn empty_containers_yield_empty_orders() {
        let outcome = compute_order(&[], &[]);
        assert!(outcome.source_order.is_empty());
        assert!(outcome.target_order.is_empty());
    }

    #[test]
    fn same_container_move_preserves_length_and_id_set() {
        let mut items = tasks(&["a", "b", "c", "d"]);
        move_item_in_list(&mut items, 3, 1);
        let outcome = compute_order(&items, &items);

        assert_eq!(outcome.target_order.len(), 4);
        let mut sorted = raw(&outcome.target_order);
        sorted.sort_unstable();
        assert_eq!(sorted, vec!["a", "b", "c", "d"]);
        assert_eq!(outcome.target_order[1].as_str(), "d");
    }

    #[test]
    fn cross_container_move_conserves_items() {
        let mut source = tasks(&["a", "b", "c"]);
        let mut target = tasks(&["x", "y"]);
        transfer_list_item(&mut source, &mut target, 0, 2);
        let outcome = compute_order(&source, &target);

        assert_eq!(outcome.source_order.len() + outcome.target_order.len(), 5);
        assert_eq!(
            outcome
                .target_order
                .iter()
                .filter(|id| id.as_str() == "a")
                .count(),
            1
        );
        assert!(!outcome.source_order.iter().any(|id| id.as_str() == "a"));
        assert_eq!(raw(&outcome.target_order), vec!["x", "y", "a"]);
    }

    #[test]
    fn move_clamps_out_of_range_indices() {
        let mut items = tasks(&["a", "b"]);
        move_item_in_list(&mut items, 9, 0);
        assert_eq!(items[0].id.as_str(), "b");

        let mut empty: Vec<Task> = Vec::new();
        move_item_in_list(&mut empty, 0, 3);
        assert!(empty.is_empty());
    }

    #[test]
    fn transfer_clamps_out_of_range_indices() {
        let mut source = tasks(&["a"]);
        let mut target = tasks(&["x"]);
        transfer_list_item(&mut source, &mut target, 5, 9);
        assert!(source.is_empty());
        assert_eq!(target.len(), 2);
        assert_eq!(target[1].id.as_str(), "a");

        let mut empty: Vec<Task> = Vec::new();
        transfer_list_item(&mut empty, &mut target, 0, 0);
        assert_eq!(target.len(), 2);
    }
}
