pub const DEFAULT_FEEDS_PATH: &str = "rss.txt";
pub const DEFAULT_STORE_PATH: &str = "rss_database.csv.gz";

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_BOOKMARK_TIMEOUT_SECS: u64 = 30;

pub const POCKET_ADD_URL: &str = "https://getpocket.com/v3/add";

/// Tag attached to every bookmark created by this job.
pub const DEFAULT_TAG: &str = "feed";

pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
