use crate::ContourError;
use serde::{Deserialize, Serialize};

/// Resource limits to keep resolution bounded and predictable
///
/// These limits protect against runaway inputs while being generous enough
/// for all legitimate use cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Maximum size of a single raw definition in bytes
    /// Real usage: ~200 bytes, Limit: 64KB
    pub max_source_bytes: usize,

    /// Maximum expression nesting depth accepted by the reference compiler
    /// Real usage: ~5 levels, Limit: 100
    pub max_expression_depth: usize,

    /// Maximum number of nested variable resolutions
    /// Deep recursion through equations reports an error instead of
    /// overflowing the stack; sized for a 2 MiB thread stack in debug builds
    /// Real usage: ~10 levels, Limit: 48
    pub max_resolution_depth: usize,

    /// Generation count below which time lookup scans backward linearly
    /// instead of binary searching
    pub linear_scan_threshold: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_source_bytes: 64 * 1024, // 64 KB
            max_expression_depth: 100,
            max_resolution_depth: 48,
            linear_scan_threshold: 7,
        }
    }
}

impl ResourceLimits {
    /// Create a new ResourceLimits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load limits from a JSON document; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ContourError> {
        serde_json::from_str(json)
            .map_err(|e| ContourError::Engine(format!("Invalid resource limits: {}", e)))
    }
}
