use shared::{
    domain::ImageRef,
    protocol::{ConfidenceResult, PredictResponse, TreeStats},
};
use tracing::debug;

use crate::error::StoreError;

/// Threshold preferred when the service offers it; otherwise the closest
/// threshold below it wins, and the last (strictest) variant is the final
/// fallback.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// The result variants of one completed analysis, sorted ascending by
/// confidence, plus the currently selected threshold. Immutable after
/// construction except for the selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultStore {
    results: Vec<ConfidenceResult>,
    selected: usize,
    processing_time: Option<f64>,
}

impl ResultStore {
    /// Validates and canonicalizes one inference response. The returned error
    /// string is shown to the user as the request failure message.
    pub fn from_response(response: PredictResponse) -> Result<Self, String> {
        let PredictResponse {
            mut results,
            processing_time,
        } = response;

        if results.is_empty() {
            return Err("inference service returned no results".to_owned());
        }
        for result in &results {
            if !result.confidence.is_finite()
                || result.confidence <= 0.0
                || result.confidence > 1.0
            {
                return Err(format!(
                    "inference service returned confidence {} outside (0, 1]",
                    result.confidence
                ));
            }
            let stats = &result.stats;
            for value in [stats.density_per_area, stats.green_coverage_area] {
                if !value.is_finite() || value < 0.0 {
                    return Err(format!(
                        "inference service returned invalid statistics at confidence {}",
                        result.confidence
                    ));
                }
            }
        }

        results.sort_by(|a, b| a.confidence.total_cmp(&b.confidence));
        if results
            .windows(2)
            .any(|pair| pair[0].confidence == pair[1].confidence)
        {
            return Err("inference service returned duplicate confidence thresholds".to_owned());
        }

        let selected = default_selection(&results);
        debug!(
            variants = results.len(),
            selected_confidence = results[selected].confidence,
            "result store built"
        );
        Ok(Self {
            results,
            selected,
            processing_time,
        })
    }

    /// Moves the selection to an exact threshold from the result set.
    pub fn select(&mut self, confidence: f64) -> Result<(), StoreError> {
        match self
            .results
            .iter()
            .position(|result| result.confidence == confidence)
        {
            Some(index) => {
                self.selected = index;
                Ok(())
            }
            None => Err(StoreError::UnknownConfidence(confidence)),
        }
    }

    /// The variant at the selected threshold. Infallible: the selection index
    /// is always in bounds by construction.
    pub fn current(&self) -> &ConfidenceResult {
        &self.results[self.selected]
    }

    pub fn selected_confidence(&self) -> f64 {
        self.results[self.selected].confidence
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn results(&self) -> &[ConfidenceResult] {
        &self.results
    }

    pub fn variant_count(&self) -> usize {
        self.results.len()
    }

    /// Server-reported elapsed seconds, when the service includes it.
    pub fn processing_time(&self) -> Option<f64> {
        self.processing_time
    }
}

fn default_selection(results: &[ConfidenceResult]) -> usize {
    let at_or_below = results.partition_point(|result| result.confidence <= DEFAULT_CONFIDENCE);
    if at_or_below > 0 {
        at_or_below - 1
    } else {
        results.len() - 1
    }
}

/// Flat view of the selected variant, ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub image: ImageRef,
    pub stats: Vec<NamedStat>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedStat {
    pub label: &'static str,
    pub value: f64,
    pub unit: &'static str,
    pub description: &'static str,
    pub decimals: Option<u8>,
}

impl NamedStat {
    /// Integral counts print bare; the density rows keep the precision the
    /// service reports them with.
    pub fn display_value(&self) -> String {
        match self.decimals {
            Some(places) => format!("{:.*}", places as usize, self.value),
            None => format!("{}", self.value),
        }
    }
}

/// Pure function of (store, selection); no side effects, recomputed on every
/// selection change.
pub fn project(store: &ResultStore) -> Projection {
    let current = store.current();
    let stats = &current.stats;
    Projection {
        image: current.image.clone(),
        stats: vec![
            NamedStat {
                label: "Total Trees",
                value: f64::from(stats.total_trees),
                unit: "trees",
                description: "Individual + Estimated",
                decimals: None,
            },
            NamedStat {
                label: "Individual Trees",
                value: f64::from(stats.individual_trees),
                unit: "detected",
                description: "Clearly visible trees",
                decimals: None,
            },
            NamedStat {
                label: "Tree Clusters",
                value: f64::from(stats.cluster_count),
                unit: "clusters",
                description: "Dense tree groups",
                decimals: None,
            },
            NamedStat {
                label: "Estimated in Clusters",
                value: f64::from(stats.trees_in_clusters),
                unit: "trees",
                description: "Approximate count",
                decimals: None,
            },
            NamedStat {
                label: "Tree Density",
                value: stats.density_per_area,
                unit: "trees/m²",
                description: "Trees per square meter",
                decimals: Some(2),
            },
            NamedStat {
                label: "Green Coverage",
                value: stats.green_coverage_area,
                unit: "%",
                description: "Area covered by trees",
                decimals: Some(1),
            },
        ],
    }
}

/// Bullet lines for the summary panel, clipboard export, and the CLI report.
pub fn summary_lines(stats: &TreeStats) -> Vec<String> {
    vec![
        format!(
            "• Detected {} individual trees that are clearly separable",
            stats.individual_trees
        ),
        format!(
            "• Identified {} dense clusters containing approximately {} trees",
            stats.cluster_count, stats.trees_in_clusters
        ),
        format!(
            "• Total estimated tree count: {} trees",
            stats.total_trees
        ),
        format!(
            "• Green coverage represents {:.1}% of the analyzed area",
            stats.green_coverage_area
        ),
    ]
}

#[cfg(test)]
#[path = "tests/results_tests.rs"]
mod tests;
