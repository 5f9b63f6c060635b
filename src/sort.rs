//! Ordering of the filtered view.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::{parse_size_kb, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Name,
    Type,
    Size,
    UploadDate,
    Jurisdiction,
    ServiceLine,
    RecordType,
    Entity,
    Client,
    UploadedBy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortState {
    /// Newest first, matching the order listings arrive in.
    fn default() -> Self {
        Self {
            field: SortField::UploadDate,
            direction: SortDirection::Desc,
        }
    }
}

impl SortState {
    /// Same field flips direction; a new field starts ascending.
    pub fn select(&mut self, field: SortField) {
        if self.field == field {
            self.direction = self.direction.flipped();
        } else {
            self.field = field;
            self.direction = SortDirection::Asc;
        }
    }

    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ord = compare_field(self.field, a, b);
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }

    /// Stable in-place sort of an already filtered view.
    pub fn apply(&self, view: &mut [&Document]) {
        view.sort_by(|a, b| self.compare(a, b));
    }
}

fn compare_field(field: SortField, a: &Document, b: &Document) -> Ordering {
    match field {
        SortField::UploadDate => a.upload_date.cmp(&b.upload_date),
        SortField::Size => parse_size_kb(&a.size).total_cmp(&parse_size_kb(&b.size)),
        SortField::Name => caseless(&a.name, &b.name),
        SortField::Type => caseless(&a.file_type, &b.file_type),
        SortField::Jurisdiction => caseless(&a.jurisdiction, &b.jurisdiction),
        SortField::ServiceLine => caseless(&a.service_line, &b.service_line),
        SortField::RecordType => caseless(&a.record_type, &b.record_type),
        SortField::Entity => caseless(&a.entity, &b.entity),
        SortField::Client => caseless(&a.client, &b.client),
        SortField::UploadedBy => caseless(&a.uploaded_by, &b.uploaded_by),
    }
}

fn caseless(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}
