use std::collections::HashSet;

use crate::models::Document;

/// Ids selected in the current filtered view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: HashSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, id: &str) {
        if !self.ids.remove(id) {
            self.ids.insert(id.to_string());
        }
    }

    /// Select exactly the view, or clear if the whole view is already selected.
    pub fn toggle_all(&mut self, view: &[&Document]) {
        if !view.is_empty() && self.ids.len() == view.len() {
            self.ids.clear();
        } else {
            self.ids = view.iter().map(|d| d.id.clone()).collect();
        }
    }

    /// Drop ids that are no longer visible (after a filter change or refresh).
    pub fn retain_visible(&mut self, view: &[&Document]) {
        let visible: HashSet<&str> = view.iter().map(|d| d.id.as_str()).collect();
        self.ids.retain(|id| visible.contains(id.as_str()));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &HashSet<String> {
        &self.ids
    }

    /// Selected documents, in view order.
    pub fn selected_in<'a>(&self, view: &[&'a Document]) -> Vec<&'a Document> {
        view.iter()
            .copied()
            .filter(|d| self.ids.contains(&d.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Facet, FilterState};
    use crate::index::test_support::doc;

    #[test]
    fn select_all_is_relative_to_filtered_view() {
        let docs: Vec<Document> = (0..10)
            .map(|i| {
                let mut d = doc(&format!("d{i}"), &format!("{i}.pdf"));
                if i < 3 {
                    d.entity = "Acme".into();
                }
                d
            })
            .collect();
        let mut filter = FilterState::default();
        filter.toggle(Facet::Entity, "Acme");
        let view = filter.apply(&docs);
        assert_eq!(view.len(), 3);

        let mut selection = Selection::new();
        selection.toggle_all(&view);
        assert_eq!(selection.len(), 3);
        assert!(selection.contains("d0") && selection.contains("d2"));

        selection.toggle_all(&view);
        assert!(selection.is_empty());
    }

    #[test]
    fn partial_selection_becomes_full_view() {
        let docs = vec![doc("a", "a"), doc("b", "b")];
        let view: Vec<&Document> = docs.iter().collect();
        let mut selection = Selection::new();
        selection.toggle("a");
        selection.toggle_all(&view);
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn toggle_and_retain_visible() {
        let docs = vec![doc("a", "a"), doc("b", "b")];
        let mut selection = Selection::new();
        selection.toggle("a");
        selection.toggle("b");
        selection.toggle("b");
        assert_eq!(selection.len(), 1);

        selection.toggle("b");
        let visible: Vec<&Document> = docs.iter().filter(|d| d.id == "b").collect();
        selection.retain_visible(&visible);
        assert!(!selection.contains("a"));
        assert_eq!(selection.selected_in(&visible).len(), 1);
    }
}
