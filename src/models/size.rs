//! Human-readable sizes as shown to users, and the inverse used for sorting.

use std::sync::LazyLock;

use regex::Regex;

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

static SIZE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(\.\d+)?)\s*(KB|MB)").unwrap());

/// Format a byte count as `"{n} KB"` below 1 MB and `"{n} MB"` at or above,
/// rounded to one decimal.
pub fn format_size(bytes: u64) -> String {
    let bytes = bytes as f64;
    if bytes < MIB {
        format!("{:.1} KB", bytes / KIB)
    } else {
        format!("{:.1} MB", bytes / MIB)
    }
}

/// Parse a formatted size back into kilobytes. MB counts as KB × 1024.
///
/// Strings that do not match the pattern sort as zero.
pub fn parse_size_kb(size: &str) -> f64 {
    let Some(caps) = SIZE_PATTERN.captures(size) else {
        return 0.0;
    };
    let value: f64 = caps[1].parse().unwrap_or(0.0);
    match &caps[3] {
        "MB" => value * 1024.0,
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_kilobytes_below_one_megabyte() {
        assert_eq!(format_size(0), "0.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1024 * 1024 - 1), "1024.0 KB");
    }

    #[test]
    fn formats_megabytes_at_threshold() {
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1_572_864), "1.5 MB");
    }

    #[test]
    fn parses_binary_megabytes() {
        assert_eq!(parse_size_kb("2.0 MB"), 2048.0);
        assert_eq!(parse_size_kb("950 KB"), 950.0);
        assert_eq!(parse_size_kb("0.5 MB"), 512.0);
        assert_eq!(parse_size_kb("12KB"), 12.0);
    }

    #[test]
    fn unparseable_size_is_zero() {
        assert_eq!(parse_size_kb("unknown"), 0.0);
        assert_eq!(parse_size_kb("3 GB"), 0.0);
    }
}
