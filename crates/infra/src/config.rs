//! Service configuration.

/// Boundary policy knobs for the company service.
///
/// Mandatory-field enforcement lives here, at the service boundary, so the
/// aggregate itself never rejects historical events written under an older
/// policy.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Reject creates without a tax id.
    pub require_tax_id: bool,
    /// Reject creates without an MC number.
    pub require_mc: bool,
    /// Listing page size when the caller does not pass one.
    pub default_page_size: u32,
    /// Snapshot the aggregate every N events. `None` disables snapshots.
    pub snapshot_every: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            require_tax_id: true,
            require_mc: true,
            default_page_size: 20,
            snapshot_every: Some(100),
        }
    }
}

impl ServiceConfig {
    /// Read overrides from the environment, falling back to defaults.
    ///
    /// Recognized variables: `FREIGHTBOOK_REQUIRE_TAX_ID`,
    /// `FREIGHTBOOK_REQUIRE_MC`, `FREIGHTBOOK_PAGE_SIZE`,
    /// `FREIGHTBOOK_SNAPSHOT_EVERY` (0 disables snapshots).
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            require_tax_id: env_bool("FREIGHTBOOK_REQUIRE_TAX_ID")
                .unwrap_or(defaults.require_tax_id),
            require_mc: env_bool("FREIGHTBOOK_REQUIRE_MC").unwrap_or(defaults.require_mc),
            default_page_size: env_parse("FREIGHTBOOK_PAGE_SIZE")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.default_page_size),
            snapshot_every: match env_parse::<u64>("FREIGHTBOOK_SNAPSHOT_EVERY") {
                Some(0) => None,
                Some(n) => Some(n),
                None => defaults.snapshot_every,
            },
        }
    }
}

fn env_bool(key: &str) -> Option<bool> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_require_both_identifiers() {
        let config = ServiceConfig::default();
        assert!(config.require_tax_id);
        assert!(config.require_mc);
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.snapshot_every, Some(100));
    }

    // All env-var scenarios in one test: the process environment is shared
    // across the parallel test harness.
    #[test]
    fn from_env_overrides_defaults() {
        unsafe {
            std::env::set_var("FREIGHTBOOK_REQUIRE_TAX_ID", "false");
            std::env::set_var("FREIGHTBOOK_REQUIRE_MC", "off");
            std::env::set_var("FREIGHTBOOK_PAGE_SIZE", "50");
            std::env::set_var("FREIGHTBOOK_SNAPSHOT_EVERY", "0");
        }
        let config = ServiceConfig::from_env();
        assert!(!config.require_tax_id);
        assert!(!config.require_mc);
        assert_eq!(config.default_page_size, 50);
        assert_eq!(config.snapshot_every, None, "zero disables snapshots");

        unsafe {
            std::env::set_var("FREIGHTBOOK_REQUIRE_MC", "definitely");
            std::env::set_var("FREIGHTBOOK_PAGE_SIZE", "not-a-number");
            std::env::set_var("FREIGHTBOOK_SNAPSHOT_EVERY", "25");
        }
        let config = ServiceConfig::from_env();
        assert!(config.require_mc, "unrecognized booleans fall back");
        assert_eq!(config.default_page_size, 20, "unparseable sizes fall back");
        assert_eq!(config.snapshot_every, Some(25));

        unsafe {
            std::env::remove_var("FREIGHTBOOK_REQUIRE_TAX_ID");
            std::env::remove_var("FREIGHTBOOK_REQUIRE_MC");
            std::env::remove_var("FREIGHTBOOK_PAGE_SIZE");
            std::env::remove_var("FREIGHTBOOK_SNAPSHOT_EVERY");
        }
        let config = ServiceConfig::from_env();
        assert!(config.require_tax_id);
        assert_eq!(config.snapshot_every, Some(100));
    }
}
