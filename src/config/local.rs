use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_SEARCH_PAGE_SIZE;
use crate::Error;
use crate::Result;

/// Identity of the local application and the mirror's operating mode
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LocalConfig {
    /// Name reported to the remote store
    /// Default: "" (must be set)
    #[serde(default)]
    pub app_name: String,

    /// Remote namespace; empty selects the public namespace
    /// Default: ""
    #[serde(default)]
    pub namespace_id: String,

    /// Serve a one-shot snapshot instead of live watches
    /// Default: false
    #[serde(default)]
    pub offline_mode: bool,

    /// Number of results requested per pattern search page
    /// Default: 1000
    #[serde(default = "default_search_page_size")]
    pub search_page_size: usize,

    /// Request timeout handed to store adapters (milliseconds)
    /// Default: 3000
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            app_name: String::new(),
            namespace_id: String::new(),
            offline_mode: false,
            search_page_size: default_search_page_size(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl LocalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(Error::InvalidConfig("local config AppName is empty".into()));
        }
        if self.search_page_size == 0 {
            return Err(Error::InvalidConfig(
                "local config search_page_size must be greater than 0".into(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig("local config Timeout invalid".into()));
        }
        Ok(())
    }
}

fn default_search_page_size() -> usize {
    DEFAULT_SEARCH_PAGE_SIZE
}
fn default_request_timeout_ms() -> u64 {
    3000
}
