//! In-process Document index built from remote listings.
//!
//! The collection is held as an `Arc<[Document]>` and replaced by single
//! assignment, so a filter/sort pass that cloned the snapshot keeps reading
//! a consistent collection while a refresh or batch mutation lands.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::models::{Category, Document};

/// Generation stamp handed out when a refresh starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

#[derive(Debug)]
pub struct DocumentIndex {
    documents: Arc<[Document]>,
    issued: u64,
    applied: u64,
}

impl Default for DocumentIndex {
    fn default() -> Self {
        Self {
            documents: Arc::from(Vec::new()),
            issued: 0,
            applied: 0,
        }
    }
}

/// Tab badge counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabCounts {
    pub all: usize,
    pub active: usize,
    pub archived: usize,
    pub by_category: BTreeMap<Category, usize>,
}

/// Distinct values per facet, sorted, for populating filter choices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetOptions {
    pub file_types: Vec<String>,
    pub jurisdictions: Vec<String>,
    pub service_lines: Vec<String>,
    pub record_types: Vec<String>,
    pub entities: Vec<String>,
}

impl DocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Refresh ──────────────────────────────────────────

    /// Stamp a refresh about to be issued.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.issued += 1;
        RefreshTicket(self.issued)
    }

    /// Replace the collection with a refresh result.
    ///
    /// Returns `false` and leaves the index untouched when a newer refresh
    /// has already been applied (last-response-wins).
    pub fn apply_refresh(&mut self, ticket: RefreshTicket, documents: Vec<Document>) -> bool {
        if ticket.0 <= self.applied {
            tracing::debug!(
                generation = ticket.0,
                applied = self.applied,
                "Discarding stale refresh"
            );
            return false;
        }
        self.applied = ticket.0;
        self.documents = documents.into();
        true
    }

    // ─── Reads ────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<[Document]> {
        Arc::clone(&self.documents)
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn tab_counts(&self) -> TabCounts {
        let mut counts = TabCounts {
            all: self.documents.len(),
            by_category: Category::ALL.iter().map(|c| (*c, 0)).collect(),
            ..TabCounts::default()
        };
        for doc in self.documents.iter() {
            if doc.is_archived {
                counts.archived += 1;
            } else {
                counts.active += 1;
            }
            *counts.by_category.entry(doc.category).or_default() += 1;
        }
        counts
    }

    pub fn facet_options(&self) -> FacetOptions {
        fn distinct<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
            values
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        }
        let docs = &self.documents;
        FacetOptions {
            file_types: distinct(docs.iter().map(|d| &d.file_type)),
            jurisdictions: distinct(docs.iter().map(|d| &d.jurisdiction)),
            service_lines: distinct(docs.iter().map(|d| &d.service_line)),
            record_types: distinct(docs.iter().map(|d| &d.record_type)),
            entities: distinct(docs.iter().map(|d| &d.entity)),
        }
    }

    // ─── Local mutations (never persisted remotely) ───────

    /// Mark documents archived. Returns how many were found.
    pub fn archive(&mut self, ids: &HashSet<String>) -> usize {
        let mut changed = 0;
        let next: Vec<Document> = self
            .documents
            .iter()
            .map(|d| {
                let mut d = d.clone();
                if ids.contains(&d.id) {
                    d.is_archived = true;
                    changed += 1;
                }
                d
            })
            .collect();
        self.documents = next.into();
        changed
    }

    /// Drop documents from the index. Returns how many were removed.
    pub fn remove(&mut self, ids: &HashSet<String>) -> usize {
        let before = self.documents.len();
        let next: Vec<Document> = self
            .documents
            .iter()
            .filter(|d| !ids.contains(&d.id))
            .cloned()
            .collect();
        self.documents = next.into();
        before - self.documents.len()
    }

    /// Swap the document `old_id` for `document` in place (used after a move).
    pub fn replace(&mut self, old_id: &str, document: Document) -> bool {
        let Some(pos) = self.documents.iter().position(|d| d.id == old_id) else {
            return false;
        };
        let mut next = self.documents.to_vec();
        next[pos] = document;
        self.documents = next.into();
        true
    }

    /// Add a document at the front (newest first ordering).
    pub fn insert(&mut self, document: Document) {
        let mut next = Vec::with_capacity(self.documents.len() + 1);
        next.push(document);
        next.extend(self.documents.iter().cloned());
        self.documents = next.into();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{TimeZone, Utc};

    use crate::models::{Category, Document};

    /// Document with sensible defaults for index/filter/sort tests.
    pub fn doc(id: &str, name: &str) -> Document {
        Document {
            id: id.to_string(),
            name: name.to_string(),
            file_type: "PDF".into(),
            size: "1.0 KB".into(),
            uploaded_by: "owner".into(),
            upload_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            category: Category::Tax,
            jurisdiction: "United States".into(),
            service_line: "Tax".into(),
            record_type: "Tax Return".into(),
            entity: String::new(),
            client: String::new(),
            client_number: String::new(),
            client_contact: String::new(),
            client_approved: false,
            is_archived: false,
            url: format!("https://example/blob/{id}"),
            download_url: Some(format!("https://example/raw/{id}")),
            path: format!("uploads/2024-01-01_tax_{name}"),
            sidecar_sha: None,
            metadata: serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::doc;
    use super::*;

    fn ids(set: &[&str]) -> HashSet<String> {
        set.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn later_ticket_wins_over_earlier_response() {
        let mut index = DocumentIndex::new();
        let first = index.begin_refresh();
        let second = index.begin_refresh();

        assert!(index.apply_refresh(second, vec![doc("b", "b.pdf")]));
        assert!(!index.apply_refresh(first, vec![doc("a", "a.pdf")]));
        assert_eq!(index.len(), 1);
        assert!(index.get("b").is_some());
    }

    #[test]
    fn in_order_refreshes_both_apply() {
        let mut index = DocumentIndex::new();
        let first = index.begin_refresh();
        assert!(index.apply_refresh(first, vec![doc("a", "a.pdf")]));
        let second = index.begin_refresh();
        assert!(index.apply_refresh(second, vec![]));
        assert!(index.is_empty());
    }

    #[test]
    fn snapshot_is_unaffected_by_later_mutation() {
        let mut index = DocumentIndex::new();
        let t = index.begin_refresh();
        index.apply_refresh(t, vec![doc("a", "a.pdf"), doc("b", "b.pdf")]);

        let snapshot = index.snapshot();
        index.remove(&ids(&["a"]));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn archive_and_remove_report_counts() {
        let mut index = DocumentIndex::new();
        let t = index.begin_refresh();
        index.apply_refresh(t, vec![doc("a", "a.pdf"), doc("b", "b.pdf")]);

        assert_eq!(index.archive(&ids(&["a", "zzz"])), 1);
        assert!(index.get("a").unwrap().is_archived);
        assert_eq!(index.remove(&ids(&["b"])), 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn tab_counts_cover_every_category() {
        let mut index = DocumentIndex::new();
        let mut archived = doc("b", "b.pdf");
        archived.is_archived = true;
        archived.category = Category::Financial;
        let t = index.begin_refresh();
        index.apply_refresh(t, vec![doc("a", "a.pdf"), archived]);

        let counts = index.tab_counts();
        assert_eq!(counts.all, 2);
        assert_eq!(counts.active, 1);
        assert_eq!(counts.archived, 1);
        assert_eq!(counts.by_category[&Category::Tax], 1);
        assert_eq!(counts.by_category[&Category::Financial], 1);
        assert_eq!(counts.by_category[&Category::Form990], 0);
    }

    #[test]
    fn facet_options_are_distinct_sorted_and_skip_blanks() {
        let mut a = doc("a", "a.pdf");
        a.entity = "Zeta Corp".into();
        let mut b = doc("b", "b.xlsx");
        b.file_type = "Excel".into();
        b.entity = "Acme LLC".into();
        let c = doc("c", "c.pdf");

        let mut index = DocumentIndex::new();
        let t = index.begin_refresh();
        index.apply_refresh(t, vec![a, b, c]);

        let options = index.facet_options();
        assert_eq!(options.file_types, vec!["Excel", "PDF"]);
        assert_eq!(options.entities, vec!["Acme LLC", "Zeta Corp"]);
        assert_eq!(options.jurisdictions, vec!["United States"]);
    }

    #[test]
    fn replace_and_insert() {
        let mut index = DocumentIndex::new();
        let t = index.begin_refresh();
        index.apply_refresh(t, vec![doc("a", "a.pdf")]);

        assert!(index.replace("a", doc("a2", "a.pdf")));
        assert!(!index.replace("missing", doc("x", "x.pdf")));
        index.insert(doc("n", "n.pdf"));
        let order: Vec<String> = index.snapshot().iter().map(|d| d.id.clone()).collect();
        assert_eq!(order, vec!["n", "a2"]);
    }
}
