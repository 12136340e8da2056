//! Selection set
//!
//! Held independently of the loaded page: an id stays selected after the
//! page that showed it is replaced. Stale ids are tolerated, never pruned.

use crate::core::entity::PaymentId;
use indexmap::IndexSet;

/// Ordered set of selected payment ids (selection order is preserved)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: IndexSet<PaymentId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `id`; returns whether it is now selected
    pub fn toggle(&mut self, id: PaymentId) -> bool {
        if self.ids.shift_remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn insert(&mut self, id: PaymentId) -> bool {
        self.ids.insert(id)
    }

    pub fn remove(&mut self, id: &PaymentId) -> bool {
        self.ids.shift_remove(id)
    }

    /// Replace the whole selection
    pub fn replace<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = PaymentId>,
    {
        self.ids = ids.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &PaymentId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PaymentId> {
        self.ids.iter()
    }

    pub fn to_vec(&self) -> Vec<PaymentId> {
        self.ids.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let mut selection = Selection::new();
        assert!(selection.toggle(PaymentId::from("a")));
        assert!(selection.contains(&PaymentId::from("a")));
        assert!(!selection.toggle(PaymentId::from("a")));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_order_is_selection_order() {
        let mut selection = Selection::new();
        for id in ["c", "a", "b"] {
            selection.insert(PaymentId::from(id));
        }
        selection.remove(&PaymentId::from("a"));
        let ids: Vec<&str> = selection.iter().map(PaymentId::as_str).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn test_replace_deduplicates() {
        let mut selection = Selection::new();
        selection.replace(["x", "y", "x"].into_iter().map(PaymentId::from));
        assert_eq!(selection.len(), 2);
    }
}
