use std::fmt;

use serde::{Deserialize, Serialize};

/// What was built, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub version: String,
    pub build_profile: String,
    pub build_timestamp: String,
}

impl BuildInfo {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            build_profile: env!("BUILD_PROFILE").to_string(),
            build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        }
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "relay {} ({}, built {})",
            self.version, self.build_profile, self.build_timestamp
        )
    }
}
