// -
// Subscription addressing

/// Marker that turns a subscription group or id into a pattern
pub const WILDCARD: char = '*';

/// Separator used when rendering a `(group, id)` pair as a single string
pub(crate) const KEY_SEPARATOR: &str = "::";

// -
// Remote search

/// Page size used by pattern resolution unless configured otherwise
pub const DEFAULT_SEARCH_PAGE_SIZE: usize = 1000;

/// First page number accepted by the remote store's paged search
pub(crate) const FIRST_SEARCH_PAGE: usize = 1;

// -
// Configuration sources

/// Prefix of environment variables that override configuration values
pub(crate) const ENV_PREFIX: &str = "MIRROR";

/// Environment variable naming an additional configuration file
pub(crate) const CONFIG_PATH_ENV: &str = "CONFIG_PATH";
