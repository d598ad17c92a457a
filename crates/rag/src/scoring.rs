//! Scoring service (spec §4.8, C1).
//!
//! Blank-System default: with both toggles off, `apply_weight` is the
//! identity function — shipping without weights must score identically to
//! not calling this service at all.

use rag_config::ScoringConfig;

pub struct ScoringService {
    config: ScoringConfig,
}

impl ScoringService {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Multiplies `score` by the configured collection and/or file-type
    /// weight. Unknown keys default to 1.0; file types are upper-cased
    /// before lookup. A disabled toggle leaves its factor untouched.
    pub fn apply_weight(&self, score: f32, collection: Option<&str>, file_type: Option<&str>) -> f32 {
        let mut result = score;

        if self.config.collection_weight_enabled {
            if let Some(collection) = collection.filter(|c| !c.is_empty()) {
                let multiplier = self
                    .config
                    .collection_weights
                    .get(collection)
                    .copied()
                    .unwrap_or(1.0);
                result *= multiplier;
            }
        }

        if self.config.file_type_weight_enabled {
            if let Some(file_type) = file_type.filter(|f| !f.is_empty()) {
                let key = file_type.to_uppercase();
                let multiplier = self
                    .config
                    .file_type_weights
                    .get(&key)
                    .copied()
                    .unwrap_or(1.0);
                result *= multiplier;
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn plain_system_default_is_identity() {
        let service = ScoringService::new(ScoringConfig::default());
        assert_eq!(service.apply_weight(0.5, Some("Notion"), Some("pdf")), 0.5);
    }

    #[test]
    fn applies_collection_weight_when_enabled() {
        let mut weights = HashMap::new();
        weights.insert("Notion".to_string(), 1.5);
        let config = ScoringConfig {
            collection_weight_enabled: true,
            collection_weights: weights,
            ..ScoringConfig::default()
        };
        let service = ScoringService::new(config);
        assert_eq!(service.apply_weight(0.5, Some("Notion"), None), 0.75);
        assert_eq!(service.apply_weight(0.5, Some("Unknown"), None), 0.5);
    }

    #[test]
    fn normalizes_file_type_case() {
        let mut weights = HashMap::new();
        weights.insert("PDF".to_string(), 1.2);
        let config = ScoringConfig {
            file_type_weight_enabled: true,
            file_type_weights: weights,
            ..ScoringConfig::default()
        };
        let service = ScoringService::new(config);
        assert_eq!(service.apply_weight(0.5, None, Some("pdf")), 0.6);
    }
}
