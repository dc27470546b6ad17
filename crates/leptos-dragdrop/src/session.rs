//! Drag Session
//!
//! Framework-free drag state: which entity is being dragged and which entity
//! is currently under the pointer, both tracked by identifier.
//! Identifiers survive the list being mutated mid-drag; an id that vanishes
//! simply turns the drop into a no-op.

/// Result of releasing a drag
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropOutcome<Id> {
    /// Nothing to persist (same target, missing ids, single element, ...)
    Noop,
    /// Full new order of the sequence
    Reorder(Vec<Id>),
}

impl<Id> DropOutcome<Id> {
    pub fn into_order(self) -> Option<Vec<Id>> {
        match self {
            DropOutcome::Noop => None,
            DropOutcome::Reorder(order) => Some(order),
        }
    }
}

/// Move `dragged` to the position currently held by `target`.
///
/// The dragged id is removed and reinserted at the target's index in the same
/// pass, so dragging the last element onto the first yields it in front:
/// `[A, B, C]` dragging `C` onto `A` gives `[C, A, B]`.
///
/// Returns `None` when the move would not change anything or when either id is
/// not part of `order`.
pub fn reorder<Id: Clone + PartialEq>(order: &[Id], dragged: &Id, target: &Id) -> Option<Vec<Id>> {
    if order.len() < 2 || dragged == target {
        return None;
    }
    let from = order.iter().position(|id| id == dragged)?;
    let to = order.iter().position(|id| id == target)?;

    let mut next = order.to_vec();
    let moved = next.remove(from);
    next.insert(to, moved);
    Some(next)
}

/// Transient state of one drag gesture
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragSession<Id> {
    dragging: Option<Id>,
    over: Option<Id>,
}

impl<Id> Default for DragSession<Id> {
    fn default() -> Self {
        Self {
            dragging: None,
            over: None,
        }
    }
}

impl<Id: Clone + PartialEq> DragSession<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start dragging an entity; any previous gesture is discarded
    pub fn begin(&mut self, id: Id) {
        self.dragging = Some(id);
        self.over = None;
    }

    /// Pointer entered an entity while dragging
    pub fn hover(&mut self, id: Id) {
        if self.dragging.is_some() {
            self.over = Some(id);
        }
    }

    /// Pointer left the current drop target
    pub fn leave(&mut self) {
        self.over = None;
    }

    pub fn dragging(&self) -> Option<&Id> {
        self.dragging.as_ref()
    }

    pub fn drop_target(&self) -> Option<&Id> {
        self.over.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.dragging.is_some()
    }

    /// Whether `id` is the entity being dragged (used to collapse sections mid-drag)
    pub fn is_dragging(&self, id: &Id) -> bool {
        self.dragging.as_ref() == Some(id)
    }

    /// Abort the gesture without producing an order
    pub fn cancel(&mut self) {
        self.dragging = None;
        self.over = None;
    }

    /// Release the drag against the current order of the sequence.
    ///
    /// Always clears the session, whether or not a reorder results.
    pub fn finish(&mut self, current_order: &[Id]) -> DropOutcome<Id> {
        let dragging = self.dragging.take();
        let over = self.over.take();

        match (dragging, over) {
            (Some(dragged), Some(target)) => reorder(current_order, &dragged, &target)
                .map(DropOutcome::Reorder)
                .unwrap_or(DropOutcome::Noop),
            _ => DropOutcome::Noop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_drag_last_onto_first() {
        let order = vec!['A', 'B', 'C'];
        assert_eq!(reorder(&order, &'C', &'A'), Some(vec!['C', 'A', 'B']));
    }

    #[test]
    fn test_drag_first_onto_last() {
        let order = vec!['A', 'B', 'C'];
        assert_eq!(reorder(&order, &'A', &'C'), Some(vec!['B', 'C', 'A']));
    }

    #[test]
    fn test_drag_onto_self_is_noop() {
        let order = vec!['A', 'B', 'C'];
        assert_eq!(reorder(&order, &'A', &'A'), None);
    }

    #[test]
    fn test_single_element_is_noop() {
        assert_eq!(reorder(&['A'], &'A', &'B'), None);
    }

    #[test]
    fn test_unknown_target_is_noop() {
        let order = vec!['A', 'B', 'C'];
        assert_eq!(reorder(&order, &'A', &'Z'), None);
        assert_eq!(reorder(&order, &'Z', &'A'), None);
    }

    #[test]
    fn test_session_finish_clears_state() {
        let mut session = DragSession::new();
        session.begin(3u32);
        session.hover(1);
        assert!(session.is_dragging(&3));

        let outcome = session.finish(&[1, 2, 3]);
        assert_eq!(outcome, DropOutcome::Reorder(vec![3, 1, 2]));
        assert!(!session.is_active());
        assert!(session.drop_target().is_none());
    }

    #[test]
    fn test_session_without_target_is_noop() {
        let mut session = DragSession::new();
        session.begin(1u32);
        session.hover(2);
        session.leave();

        assert_eq!(session.finish(&[1, 2]), DropOutcome::Noop);
        assert!(!session.is_active());
    }

    #[test]
    fn test_hover_ignored_when_not_dragging() {
        let mut session: DragSession<u32> = DragSession::new();
        session.hover(2);
        assert!(session.drop_target().is_none());
    }

    #[test]
    fn test_finish_uses_current_order() {
        let mut session = DragSession::new();
        session.begin('B');
        session.hover('A');
        // Sequence changed during the drag: 'D' appeared, 'C' went away
        let outcome = session.finish(&['D', 'A', 'B']);
        assert_eq!(outcome.into_order(), Some(vec!['D', 'B', 'A']));
    }

    proptest! {
        #[test]
        fn prop_reorder_is_permutation(len in 2usize..12, from in 0usize..12, to in 0usize..12) {
            let order: Vec<usize> = (0..len).collect();
            let dragged = from % len;
            let target = to % len;
            match reorder(&order, &dragged, &target) {
                None => prop_assert_eq!(dragged, target),
                Some(next) => {
                    let mut sorted = next.clone();
                    sorted.sort_unstable();
                    prop_assert_eq!(sorted, order.clone());
                    prop_assert_eq!(next[target], dragged);
                }
            }
        }
    }
}
