//! Remote path conventions.
//!
//! Content lives at `uploads/{YYYY-MM-DD}_{category}_{sanitizedName}` and its
//! sidecar at the same path plus `.metadata.json`. Everything here is pure.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};

use super::StoreError;
use crate::config::{SIDECAR_SUFFIX, UPLOAD_DIR};
use crate::models::{Category, PartialMetadata};

/// Strip directory components and replace anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let clean: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(200)
        .collect();

    if clean.trim_matches('.').is_empty() {
        "document".to_string()
    } else {
        clean
    }
}

/// `uploads/{date}_{category}_{sanitizedName}` for a new upload.
pub fn content_path(upload_date: DateTime<Utc>, category: Category, file_name: &str) -> String {
    format!(
        "{}/{}_{}_{}",
        UPLOAD_DIR,
        upload_date.format("%Y-%m-%d"),
        category.as_str(),
        sanitize_file_name(file_name)
    )
}

pub fn sidecar_path(content_path: &str) -> String {
    format!("{content_path}{SIDECAR_SUFFIX}")
}

pub fn is_sidecar(name: &str) -> bool {
    name.ends_with(SIDECAR_SUFFIX)
}

/// Last path component.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Recover date, category and display name from `{date}_{category}_{name}`.
///
/// Returns `None` when the name does not follow the convention.
pub fn parse_content_name(name: &str) -> Option<PartialMetadata> {
    let mut parts = name.splitn(3, '_');
    let date = parts.next()?;
    let category = parts.next()?;
    let rest = parts.next().filter(|r| !r.is_empty())?;

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let category = Category::from_str(category).ok()?;
    let upload_date = date.and_hms_opt(0, 0, 0)?.and_utc();

    Some(PartialMetadata {
        upload_date,
        category,
        name: rest.to_string(),
    })
}

/// Normalise a caller-supplied destination folder.
///
/// Rejects empty input, traversal segments and characters the path
/// convention does not allow.
pub fn normalize_folder(folder: &str) -> Result<String, StoreError> {
    let trimmed = folder.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(StoreError::InvalidPath(folder.to_string()));
    }
    let valid = trimmed.split('/').all(|segment| {
        !segment.is_empty()
            && segment != "."
            && segment != ".."
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    });
    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(StoreError::InvalidPath(folder.to_string()))
    }
}

/// Path of `path` once placed in `folder`.
pub fn relocated_path(path: &str, folder: &str) -> String {
    format!("{}/{}", folder, base_name(path))
}

/// Sibling path for a copy placed in the object's own folder:
/// `a/x_tax_return.pdf` becomes `a/x_tax_return_copy.pdf`.
pub fn copy_path(path: &str) -> String {
    numbered_copy_path(path, 1)
}

/// Copy name for the `n`th duplicate: `_copy`, then `_copy_2`, `_copy_3`...
pub fn numbered_copy_path(path: &str, n: u32) -> String {
    let (dir, name) = match path.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, path),
    };
    let suffix = if n <= 1 {
        "_copy".to_string()
    } else {
        format!("_copy_{n}")
    };
    let renamed = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}{suffix}.{ext}"),
        _ => format!("{name}{suffix}"),
    };
    match dir {
        Some(dir) => format!("{dir}/{renamed}"),
        None => renamed,
    }
}

/// Folder part of a path (empty for top-level objects).
pub fn parent_folder(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}
