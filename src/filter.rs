//! Multi-facet filter over the document index.
//!
//! Facets AND together; values within one facet OR together. An empty
//! facet set, an unset tri-state and a blank query constrain nothing.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{Category, Document, ParseEnumError};

/// Which tab of the listing is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActiveTab {
    #[default]
    All,
    Active,
    Archived,
    Category(Category),
}

impl ActiveTab {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Active => !doc.is_archived,
            Self::Archived => doc.is_archived,
            Self::Category(c) => doc.category == *c,
        }
    }
}

impl FromStr for ActiveTab {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => other.parse::<Category>().map(Self::Category).map_err(|_| {
                ParseEnumError {
                    field: "ActiveTab".into(),
                    value: other.into(),
                }
            }),
        }
    }
}

/// Multi-value facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    FileType,
    Jurisdiction,
    ServiceLine,
    RecordType,
    Entity,
}

impl Facet {
    fn value<'a>(&self, doc: &'a Document) -> &'a str {
        match self {
            Self::FileType => &doc.file_type,
            Self::Jurisdiction => &doc.jurisdiction,
            Self::ServiceLine => &doc.service_line,
            Self::RecordType => &doc.record_type,
            Self::Entity => &doc.entity,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterState {
    pub file_types: BTreeSet<String>,
    pub jurisdictions: BTreeSet<String>,
    pub service_lines: BTreeSet<String>,
    pub record_types: BTreeSet<String>,
    pub entities: BTreeSet<String>,
    pub client_approved: Option<bool>,
    pub active_tab: ActiveTab,
    pub query: String,
}

impl FilterState {
    fn set(&self, facet: Facet) -> &BTreeSet<String> {
        match facet {
            Facet::FileType => &self.file_types,
            Facet::Jurisdiction => &self.jurisdictions,
            Facet::ServiceLine => &self.service_lines,
            Facet::RecordType => &self.record_types,
            Facet::Entity => &self.entities,
        }
    }

    fn set_mut(&mut self, facet: Facet) -> &mut BTreeSet<String> {
        match facet {
            Facet::FileType => &mut self.file_types,
            Facet::Jurisdiction => &mut self.jurisdictions,
            Facet::ServiceLine => &mut self.service_lines,
            Facet::RecordType => &mut self.record_types,
            Facet::Entity => &mut self.entities,
        }
    }

    /// Add `value` to the facet, or remove it if already present.
    pub fn toggle(&mut self, facet: Facet, value: &str) {
        let set = self.set_mut(facet);
        if !set.remove(value) {
            set.insert(value.to_string());
        }
    }

    /// Unset → approved → not approved → unset.
    pub fn cycle_client_approved(&mut self) {
        self.client_approved = match self.client_approved {
            None => Some(true),
            Some(true) => Some(false),
            Some(false) => None,
        };
    }

    /// Clear facets and query. The active tab is kept.
    pub fn reset(&mut self) {
        *self = Self {
            active_tab: self.active_tab,
            ..Self::default()
        };
    }

    /// Whether any facet or the query constrains the view.
    pub fn is_active(&self) -> bool {
        [
            Facet::FileType,
            Facet::Jurisdiction,
            Facet::ServiceLine,
            Facet::RecordType,
            Facet::Entity,
        ]
        .iter()
        .any(|f| !self.set(*f).is_empty())
            || self.client_approved.is_some()
            || !self.query.trim().is_empty()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        if !self.active_tab.matches(doc) {
            return false;
        }
        let facets_ok = [
            Facet::FileType,
            Facet::Jurisdiction,
            Facet::ServiceLine,
            Facet::RecordType,
            Facet::Entity,
        ]
        .iter()
        .all(|f| {
            let set = self.set(*f);
            set.is_empty() || set.contains(f.value(doc))
        });
        if !facets_ok {
            return false;
        }
        if let Some(approved) = self.client_approved {
            if doc.client_approved != approved {
                return false;
            }
        }
        self.matches_query(doc)
    }

    fn matches_query(&self, doc: &Document) -> bool {
        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [
            &doc.name,
            &doc.file_type,
            &doc.uploaded_by,
            &doc.client,
            &doc.entity,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&query))
    }

    /// Documents passing the filter, in input order.
    pub fn apply<'a>(&self, documents: &'a [Document]) -> Vec<&'a Document> {
        documents.iter().filter(|d| self.matches(d)).collect()
    }
}
