//! C1 scoring service configuration (spec §4.8, §6).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Two independent toggles, both off by default — the "Plain System"
/// default under which `apply_weight` is the identity function.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScoringConfig {
    #[serde(default)]
    pub collection_weight_enabled: bool,
    #[serde(default)]
    pub file_type_weight_enabled: bool,
    #[serde(default)]
    pub collection_weights: HashMap<String, f32>,
    #[serde(default)]
    pub file_type_weights: HashMap<String, f32>,
}
