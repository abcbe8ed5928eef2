use serde::{de, Deserialize, Deserializer, Serialize};

use crate::domain::ImageRef;

/// Detection statistics for one confidence threshold. Field aliases cover the
/// payload shapes the service has been observed to emit (camelCase and
/// snake_case names); the two densities sometimes arrive pre-formatted as
/// strings, hence the lenient float decoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeStats {
    #[serde(alias = "treeCount", alias = "tree_count", alias = "totalTrees")]
    pub total_trees: u32,
    #[serde(alias = "individualTrees")]
    pub individual_trees: u32,
    #[serde(alias = "clusters", alias = "clusterCount")]
    pub cluster_count: u32,
    #[serde(alias = "estimatedInClusters", alias = "treesInClusters")]
    pub trees_in_clusters: u32,
    #[serde(
        alias = "density",
        alias = "densityPerArea",
        deserialize_with = "lenient_f64"
    )]
    pub density_per_area: f64,
    #[serde(
        alias = "coverage",
        alias = "greenCoverageArea",
        deserialize_with = "lenient_f64"
    )]
    pub green_coverage_area: f64,
}

/// One annotated result variant: the detection threshold it was produced at,
/// the annotated visualization, and the statistics record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireResult")]
pub struct ConfidenceResult {
    pub confidence: f64,
    pub image: ImageRef,
    pub stats: TreeStats,
}

/// Raw result shapes on the wire: statistics either nested under `stats` or
/// flattened into the result object. Canonicalized into [`ConfidenceResult`].
#[derive(Deserialize)]
#[serde(untagged)]
enum WireResult {
    Nested {
        #[serde(alias = "threshold", deserialize_with = "lenient_f64")]
        confidence: f64,
        #[serde(alias = "annotatedImage", alias = "annotated_image", alias = "image_url")]
        image: ImageRef,
        stats: TreeStats,
    },
    Flat {
        #[serde(alias = "threshold", deserialize_with = "lenient_f64")]
        confidence: f64,
        #[serde(alias = "annotatedImage", alias = "annotated_image", alias = "image_url")]
        image: ImageRef,
        #[serde(flatten)]
        stats: TreeStats,
    },
}

impl From<WireResult> for ConfidenceResult {
    fn from(wire: WireResult) -> Self {
        match wire {
            WireResult::Nested {
                confidence,
                image,
                stats,
            }
            | WireResult::Flat {
                confidence,
                image,
                stats,
            } => Self {
                confidence,
                image,
                stats,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub results: Vec<ConfidenceResult>,
    #[serde(
        default,
        alias = "processingTime",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_opt_f64"
    )]
    pub processing_time: Option<f64>,
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct LenientF64;

    impl de::Visitor<'_> for LenientF64 {
        type Value = f64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a number or a numeric string")
        }

        fn visit_f64<E>(self, value: f64) -> Result<f64, E> {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_i64<E>(self, value: i64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_str<E>(self, value: &str) -> Result<f64, E>
        where
            E: de::Error,
        {
            value
                .trim()
                .parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(value), &self))
        }
    }

    deserializer.deserialize_any(LenientF64)
}

fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Lenient(#[serde(deserialize_with = "lenient_f64")] f64);

    Option::<Lenient>::deserialize(deserializer).map(|value| value.map(|Lenient(inner)| inner))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_nested_shape() {
        let body = r#"{
            "results": [{
                "confidence": 0.8,
                "image": "data:image/jpeg;base64,QUJD",
                "stats": {
                    "total_trees": 120,
                    "individual_trees": 80,
                    "cluster_count": 6,
                    "trees_in_clusters": 40,
                    "density_per_area": 0.42,
                    "green_coverage_area": 57.3
                }
            }],
            "processing_time": 2.31
        }"#;

        let parsed: PredictResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results.len(), 1);
        let result = &parsed.results[0];
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.stats.total_trees, 120);
        assert_eq!(result.stats.density_per_area, 0.42);
        assert_eq!(parsed.processing_time, Some(2.31));
    }

    #[test]
    fn parses_flat_camel_case_shape_with_string_floats() {
        // The legacy service flattens the stats into the result object and
        // pre-formats the densities with toFixed, so they arrive as strings.
        let body = r#"{
            "results": [{
                "confidence": "0.5",
                "annotatedImage": "data:image/jpeg;base64,QUJD",
                "treeCount": 97,
                "individualTrees": 61,
                "clusters": 7,
                "estimatedInClusters": 36,
                "density": "0.42",
                "coverage": "57.3"
            }],
            "processingTime": "1.87"
        }"#;

        let parsed: PredictResponse = serde_json::from_str(body).unwrap();
        let result = &parsed.results[0];
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.image.as_str(), "data:image/jpeg;base64,QUJD");
        assert_eq!(result.stats.total_trees, 97);
        assert_eq!(result.stats.individual_trees, 61);
        assert_eq!(result.stats.cluster_count, 7);
        assert_eq!(result.stats.trees_in_clusters, 36);
        assert_eq!(result.stats.density_per_area, 0.42);
        assert_eq!(result.stats.green_coverage_area, 57.3);
        assert_eq!(parsed.processing_time, Some(1.87));
    }

    #[test]
    fn rejects_result_without_statistics() {
        let body = r#"{
            "results": [{
                "confidence": 0.8,
                "image": "data:image/jpeg;base64,QUJD"
            }]
        }"#;

        assert!(serde_json::from_str::<PredictResponse>(body).is_err());
    }

    #[test]
    fn rejects_non_numeric_density_string() {
        let body = r#"{
            "results": [{
                "confidence": 0.8,
                "image": "x",
                "stats": {
                    "total_trees": 1,
                    "individual_trees": 1,
                    "cluster_count": 0,
                    "trees_in_clusters": 0,
                    "density_per_area": "n/a",
                    "green_coverage_area": 1.0
                }
            }]
        }"#;

        assert!(serde_json::from_str::<PredictResponse>(body).is_err());
    }

    #[test]
    fn processing_time_is_optional() {
        let body = r#"{
            "results": [{
                "confidence": 0.8,
                "image": "x",
                "stats": {
                    "total_trees": 1,
                    "individual_trees": 1,
                    "cluster_count": 0,
                    "trees_in_clusters": 0,
                    "density_per_area": 0.1,
                    "green_coverage_area": 1.0
                }
            }]
        }"#;

        let parsed: PredictResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.processing_time, None);
    }

    #[test]
    fn serializes_canonical_shape() {
        let response = PredictResponse {
            results: vec![ConfidenceResult {
                confidence: 0.8,
                image: ImageRef::from("data:image/png;base64,QQ=="),
                stats: TreeStats {
                    total_trees: 10,
                    individual_trees: 6,
                    cluster_count: 2,
                    trees_in_clusters: 4,
                    density_per_area: 0.5,
                    green_coverage_area: 42.0,
                },
            }],
            processing_time: None,
        };

        let value = serde_json::to_value(&response).unwrap();
        assert!(value["results"][0]["stats"].is_object());
        assert_eq!(value["results"][0]["stats"]["total_trees"], 10);
        assert!(value.get("processing_time").is_none());
    }
}
