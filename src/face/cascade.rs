//! Haar cascade classifier in OpenCV's XML format.
//!
//! Only the current `opencv-cascade-classifier` layout with BOOST stages and
//! upright HAAR features is supported (this covers the stock
//! `haarcascade_frontalface_*.xml` files).

use super::detect::IntegralImage;
use crate::model::ArtifactError;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// OpenCV subtracts this from every stage threshold when loading
const THRESHOLD_EPS: f32 = 1e-5;

/// Windows whose normalized pixel deviation falls below this are skipped
const MIN_VARIANCE_RATIO: f64 = 0.1;

/// Errors raised while reading a cascade definition
#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("Malformed cascade XML: {0}")]
    Xml(String),

    #[error("Unsupported cascade: {0}")]
    Unsupported(String),

    #[error("Invalid cascade: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct StorageXml {
    cascade: CascadeXml,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CascadeXml {
    stage_type: String,
    feature_type: String,
    height: u32,
    width: u32,
    stages: Items<StageXml>,
    features: Items<FeatureXml>,
}

/// OpenCV serializes sequences as repeated `<_>` elements
#[derive(Debug, Deserialize)]
struct Items<T> {
    #[serde(rename = "_", default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StageXml {
    stage_threshold: f32,
    weak_classifiers: Items<WeakXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeakXml {
    internal_nodes: String,
    leaf_values: String,
}

#[derive(Debug, Deserialize)]
struct FeatureXml {
    rects: Items<String>,
    #[serde(default)]
    tilted: Option<u8>,
}

#[derive(Debug, Clone, Copy)]
struct WeightedRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    weight: f32,
}

#[derive(Debug, Clone)]
struct HaarFeature {
    rects: Vec<WeightedRect>,
}

impl HaarFeature {
    fn value(&self, ii: &IntegralImage, x: u32, y: u32) -> f32 {
        self.rects
            .iter()
            .map(|r| r.weight * ii.rect_sum(x + r.x, y + r.y, r.width, r.height) as f32)
            .sum()
    }
}

/// Decision tree node; non-positive children point into the leaf table
#[derive(Debug, Clone, Copy)]
struct Node {
    left: i32,
    right: i32,
    feature: usize,
    threshold: f32,
}

#[derive(Debug, Clone)]
struct WeakClassifier {
    nodes: Vec<Node>,
    leaves: Vec<f32>,
}

impl WeakClassifier {
    fn evaluate(&self, mut feature_value: impl FnMut(usize) -> f32) -> f32 {
        let mut idx = 0i32;
        loop {
            let node = &self.nodes[idx as usize];
            idx = if feature_value(node.feature) < node.threshold {
                node.left
            } else {
                node.right
            };
            if idx <= 0 {
                return self.leaves[(-idx) as usize];
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Stage {
    threshold: f32,
    classifiers: Vec<WeakClassifier>,
}

/// Boosted cascade of Haar-feature decision trees
#[derive(Debug, Clone)]
pub struct HaarCascade {
    width: u32,
    height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
}

fn parse_numbers<T: std::str::FromStr>(text: &str, what: &str) -> Result<Vec<T>, CascadeError> {
    text.split_whitespace()
        .map(|token| {
            token
                .parse::<T>()
                .map_err(|_| CascadeError::Invalid(format!("number {:?} in {}", token, what)))
        })
        .collect()
}

impl HaarCascade {
    /// Parse a cascade from OpenCV XML
    pub fn from_xml(xml: &str) -> Result<Self, CascadeError> {
        let storage: StorageXml =
            quick_xml::de::from_str(xml).map_err(|e| CascadeError::Xml(e.to_string()))?;
        let cascade = storage.cascade;

        if cascade.stage_type != "BOOST" {
            return Err(CascadeError::Unsupported(format!(
                "stage type {}",
                cascade.stage_type
            )));
        }
        if cascade.feature_type != "HAAR" {
            return Err(CascadeError::Unsupported(format!(
                "feature type {}",
                cascade.feature_type
            )));
        }
        if cascade.width <= 2 || cascade.height <= 2 {
            return Err(CascadeError::Invalid(format!(
                "window {}x{} is too small",
                cascade.width, cascade.height
            )));
        }

        let features = cascade
            .features
            .items
            .iter()
            .map(|f| Self::parse_feature(f, cascade.width, cascade.height))
            .collect::<Result<Vec<_>, _>>()?;

        let stages = cascade
            .stages
            .items
            .iter()
            .map(|s| Self::parse_stage(s, features.len()))
            .collect::<Result<Vec<_>, _>>()?;

        if stages.is_empty() {
            return Err(CascadeError::Invalid("no stages".to_string()));
        }

        Ok(Self {
            width: cascade.width,
            height: cascade.height,
            stages,
            features,
        })
    }

    /// Load a cascade definition file
    pub fn from_file(path: &Path) -> Result<Self, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::NotFound(path.to_path_buf()));
        }

        let xml = std::fs::read_to_string(path).map_err(|source| ArtifactError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let cascade = Self::from_xml(&xml).map_err(|e| ArtifactError::Invalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        tracing::info!(
            "Loaded Haar cascade from {:?} ({} stages, {} features, {}x{} window)",
            path,
            cascade.stages.len(),
            cascade.features.len(),
            cascade.width,
            cascade.height
        );

        Ok(cascade)
    }

    fn parse_feature(
        feature: &FeatureXml,
        width: u32,
        height: u32,
    ) -> Result<HaarFeature, CascadeError> {
        if feature.tilted.unwrap_or(0) != 0 {
            return Err(CascadeError::Unsupported("tilted Haar features".to_string()));
        }

        let mut rects = Vec::with_capacity(feature.rects.items.len());
        for text in &feature.rects.items {
            let values: Vec<f32> = parse_numbers(text, "rect")?;
            if values.len() != 5 {
                return Err(CascadeError::Invalid(format!(
                    "rect needs 5 values, got {}",
                    values.len()
                )));
            }
            let rect = WeightedRect {
                x: values[0] as u32,
                y: values[1] as u32,
                width: values[2] as u32,
                height: values[3] as u32,
                weight: values[4],
            };
            if rect.x + rect.width > width || rect.y + rect.height > height {
                return Err(CascadeError::Invalid(format!(
                    "rect {:?} exceeds the {}x{} window",
                    rect, width, height
                )));
            }
            rects.push(rect);
        }

        if rects.is_empty() {
            return Err(CascadeError::Invalid("feature has no rects".to_string()));
        }
        Ok(HaarFeature { rects })
    }

    fn parse_stage(stage: &StageXml, n_features: usize) -> Result<Stage, CascadeError> {
        let classifiers = stage
            .weak_classifiers
            .items
            .iter()
            .map(|weak| Self::parse_weak(weak, n_features))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Stage {
            threshold: stage.stage_threshold - THRESHOLD_EPS,
            classifiers,
        })
    }

    fn parse_weak(weak: &WeakXml, n_features: usize) -> Result<WeakClassifier, CascadeError> {
        let raw: Vec<f64> = parse_numbers(&weak.internal_nodes, "internalNodes")?;
        if raw.is_empty() || raw.len() % 4 != 0 {
            return Err(CascadeError::Invalid(format!(
                "internalNodes needs groups of 4 values, got {}",
                raw.len()
            )));
        }
        let leaves: Vec<f32> = parse_numbers(&weak.leaf_values, "leafValues")?;

        let nodes: Vec<Node> = raw
            .chunks(4)
            .map(|c| Node {
                left: c[0] as i32,
                right: c[1] as i32,
                feature: c[2] as usize,
                threshold: c[3] as f32,
            })
            .collect();

        // Children must point forward so evaluation always terminates
        for (i, node) in nodes.iter().enumerate() {
            if node.feature >= n_features {
                return Err(CascadeError::Invalid(format!(
                    "feature index {} out of range",
                    node.feature
                )));
            }
            for child in [node.left, node.right] {
                let valid = if child > 0 {
                    (child as usize) > i && (child as usize) < nodes.len()
                } else {
                    ((-child) as usize) < leaves.len()
                };
                if !valid {
                    return Err(CascadeError::Invalid(format!(
                        "node {} has invalid child {}",
                        i, child
                    )));
                }
            }
        }

        Ok(WeakClassifier { nodes, leaves })
    }

    /// Detection window size as (width, height)
    pub fn window_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Reciprocal of the window's pixel deviation, or `None` when the
    /// window is too flat to evaluate
    fn variance_norm(&self, ii: &IntegralImage, x: u32, y: u32) -> Option<f32> {
        let (w, h) = (self.width - 2, self.height - 2);
        let area = (w * h) as f64;
        let sum = ii.rect_sum(x + 1, y + 1, w, h) as f64;
        let sq_sum = ii.rect_sq_sum(x + 1, y + 1, w, h) as f64;

        let nf = area * sq_sum - sum * sum;
        if nf <= 0.0 {
            return None;
        }
        let norm = 1.0 / nf.sqrt();
        (area * norm < MIN_VARIANCE_RATIO).then_some(norm as f32)
    }

    /// Run the cascade on the window at `(x, y)`.
    ///
    /// Returns 1 when every stage passes, `-stage` for the stage that
    /// rejected the window (0 means the first stage), and -1 for windows
    /// skipped by the variance check.
    pub fn evaluate(&self, ii: &IntegralImage, x: u32, y: u32) -> i32 {
        let norm = match self.variance_norm(ii, x, y) {
            Some(norm) => norm,
            None => return -1,
        };

        for (si, stage) in self.stages.iter().enumerate() {
            let sum: f32 = stage
                .classifiers
                .iter()
                .map(|weak| weak.evaluate(|f| self.features[f].value(ii, x, y) * norm))
                .sum();
            if sum < stage.threshold {
                return -(si as i32);
            }
        }
        1
    }
}
