use serde::{Deserialize, Serialize};

use super::UploadError;
use crate::models::{ApprovalAnswer, Category, UploadMetadata};

/// Raw metadata form as entered by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadForm {
    pub category: String,
    pub jurisdiction: String,
    pub service_line: String,
    pub entity: String,
    pub client: String,
    pub client_number: String,
    /// `"yes"` or `"no"`.
    pub client_approved: String,
}

fn required(field: &'static str, value: &str) -> Result<String, UploadError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(UploadError::Validation {
            field,
            reason: "is required".into(),
        });
    }
    Ok(value.to_string())
}

impl UploadForm {
    /// Check required fields and parse the enumerated ones.
    pub fn validate(&self) -> Result<UploadMetadata, UploadError> {
        let category: Category = required("category", &self.category)?
            .parse()
            .map_err(|_| UploadError::Validation {
                field: "category",
                reason: format!("unknown category '{}'", self.category.trim()),
            })?;
        let jurisdiction = required("jurisdiction", &self.jurisdiction)?;
        let service_line = required("serviceLine", &self.service_line)?;
        let approval: ApprovalAnswer = required("clientApproved", &self.client_approved)?
            .to_lowercase()
            .parse()
            .map_err(|_| UploadError::Validation {
                field: "clientApproved",
                reason: "must be yes or no".into(),
            })?;

        Ok(UploadMetadata {
            category,
            jurisdiction,
            service_line,
            entity: self.entity.trim().to_string(),
            client: self.client.trim().to_string(),
            client_number: self.client_number.trim().to_string(),
            client_approved: approval.as_bool(),
        })
    }
}
