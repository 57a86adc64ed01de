//! Service status.

use serde::{Deserialize, Serialize};

pub const GIT_URL: &str = "https://github.com/kbaseapps/kb_fasttree.git";
pub const GIT_COMMIT_HASH: &str = "fb832abc45e39b54c266bed9165ace9ff4346a9d";

/// Status of the service, as reported to the platform.
///
/// ```rust
/// let status = kb_fasttree::status::Status::new();
/// assert_eq!(status.state, "OK");
/// assert_eq!(status.version, env!("CARGO_PKG_VERSION"));
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Status {
    pub state: String,
    pub message: String,
    pub version: String,
    pub git_url: String,
    pub git_commit_hash: String,
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}

impl Status {
    pub fn new() -> Self {
        Status {
            state: "OK".to_string(),
            message: String::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            git_url: GIT_URL.to_string(),
            git_commit_hash: GIT_COMMIT_HASH.to_string(),
        }
    }
}
