use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "DocVault";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Remote directory that holds every uploaded document.
pub const UPLOAD_DIR: &str = "uploads";

/// Suffix that marks a metadata sidecar object.
pub const SIDECAR_SUFFIX: &str = ".metadata.json";

/// Largest file accepted by the upload pipeline (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Settings key holding the object store access token.
pub const TOKEN_SETTING_KEY: &str = "github_token";

/// Facet defaults applied when a content object has no sidecar.
pub const DEFAULT_JURISDICTION: &str = "United States";
pub const DEFAULT_SERVICE_LINE: &str = "Tax";

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "docvault=info"
}

/// Get the application data directory (~/DocVault/)
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Path of the local settings database
pub fn settings_db_path() -> PathBuf {
    app_data_dir().join("settings.db")
}

/// Coordinates of the repository acting as the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Applied to every remote call.
    pub timeout_secs: u64,
}

impl StoreConfig {
    pub fn new(owner: &str, repo: &str) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = branch.to_string();
        self
    }

    /// Build from `DOCVAULT_*` environment variables, falling back to defaults.
    ///
    /// Returns `None` when owner or repository is not configured.
    pub fn from_env() -> Option<Self> {
        let owner = non_empty_env("DOCVAULT_GITHUB_OWNER")?;
        let repo = non_empty_env("DOCVAULT_GITHUB_REPO")?;
        let mut config = Self::new(&owner, &repo);
        if let Some(api) = non_empty_env("DOCVAULT_GITHUB_API") {
            config = config.with_api_base(&api);
        }
        if let Some(branch) = non_empty_env("DOCVAULT_GITHUB_BRANCH") {
            config = config.with_branch(&branch);
        }
        if let Some(secs) = non_empty_env("DOCVAULT_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            config.timeout_secs = secs;
        }
        Some(config)
    }

    /// `{api_base}/repos/{owner}/{repo}/contents/{path}`
    pub fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base,
            self.owner,
            self.repo,
            path.trim_start_matches('/')
        )
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_db_under_app_data() {
        let db = settings_db_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("settings.db"));
    }

    #[test]
    fn app_name_is_docvault() {
        assert_eq!(APP_NAME, "DocVault");
    }

    #[test]
    fn upload_limit_is_ten_mebibytes() {
        assert_eq!(MAX_UPLOAD_BYTES, 10_485_760);
    }

    #[test]
    fn contents_url_shape() {
        let config = StoreConfig::new("acme", "records");
        assert_eq!(
            config.contents_url("uploads/2024-01-15_tax_return.pdf"),
            "https://api.github.com/repos/acme/records/contents/uploads/2024-01-15_tax_return.pdf"
        );
        assert_eq!(
            config.contents_url("/uploads"),
            "https://api.github.com/repos/acme/records/contents/uploads"
        );
    }

    #[test]
    fn api_base_trims_trailing_slash() {
        let config = StoreConfig::new("o", "r").with_api_base("http://127.0.0.1:9000/");
        assert_eq!(config.api_base, "http://127.0.0.1:9000");
        assert_eq!(config.branch, "main");
        assert_eq!(config.timeout_secs, 30);
    }
}
