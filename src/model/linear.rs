//! Linear classifier loaded from a JSON export.
//!
//! Covers every scikit-learn model whose decision function is
//! `X · coefᵀ + intercept`: logistic regression, linear SVMs, and
//! multinomial naive Bayes (exported with `coef = feature_log_prob_` and
//! `intercept = class_log_prior_`).
//!
//! Binary models carry a single coefficient row; a positive score selects
//! `classes[1]`.

use super::{argmax, load_json, ArtifactError, ClassValue, Classifier, ClassifierError, SparseVector};
use serde::Deserialize;
use std::path::Path;

/// How (and whether) decision scores turn into probabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbabilityKind {
    /// Softmax over scores (sigmoid for binary models)
    #[default]
    Softmax,
    /// Model has no probability output (e.g. LinearSVC)
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
    classes: Vec<ClassValue>,
    #[serde(default)]
    probability: ProbabilityKind,
}

impl LinearModel {
    pub fn new(
        coef: Vec<Vec<f32>>,
        intercept: Vec<f32>,
        classes: Vec<ClassValue>,
        probability: ProbabilityKind,
    ) -> Result<Self, String> {
        let model = Self {
            coef,
            intercept,
            classes,
            probability,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn from_file(path: &Path) -> Result<Self, ArtifactError> {
        let model: Self = load_json(path)?;
        model.validate().map_err(|message| ArtifactError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;

        tracing::info!(
            "Loaded linear model from {:?} ({} classes, {} features)",
            path,
            model.classes.len(),
            model.n_features()
        );

        Ok(model)
    }

    fn validate(&self) -> Result<(), String> {
        let rows = self.coef.len();
        if rows == 0 {
            return Err("coef has no rows".to_string());
        }
        let binary = rows == 1 && self.classes.len() == 2;
        if !binary && rows != self.classes.len() {
            return Err(format!(
                "coef has {} rows but there are {} classes",
                rows,
                self.classes.len()
            ));
        }
        if self.intercept.len() != rows {
            return Err(format!(
                "intercept has {} entries, expected {}",
                self.intercept.len(),
                rows
            ));
        }
        let width = self.coef[0].len();
        if self.coef.iter().any(|row| row.len() != width) {
            return Err("coef rows have different lengths".to_string());
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.coef.first().map(Vec::len).unwrap_or(0)
    }

    fn is_binary(&self) -> bool {
        self.coef.len() == 1 && self.classes.len() == 2
    }

    fn check_dim(&self, got: usize) -> Result<(), ClassifierError> {
        let expected = self.n_features();
        if got != expected {
            return Err(ClassifierError::Dimension { expected, got });
        }
        Ok(())
    }

    fn decision_sparse(&self, x: &SparseVector) -> Result<Vec<f32>, ClassifierError> {
        self.check_dim(x.dim())?;
        Ok(self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| x.dot(row) + b)
            .collect())
    }

    fn decision_dense(&self, x: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        self.check_dim(x.len())?;
        Ok(self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f32>() + b)
            .collect())
    }

    fn pick(&self, scores: &[f32]) -> Result<ClassValue, ClassifierError> {
        let index = if self.is_binary() {
            usize::from(scores[0] > 0.0)
        } else {
            argmax(scores).ok_or_else(|| {
                ClassifierError::InferenceError("decision scores are all NaN".to_string())
            })?
        };
        Ok(self.classes[index].clone())
    }

    fn probabilities(&self, scores: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        if self.probability == ProbabilityKind::None {
            return Err(ClassifierError::Unsupported("predict_proba"));
        }
        if self.is_binary() {
            let p = 1.0 / (1.0 + (-scores[0]).exp());
            return Ok(vec![1.0 - p, p]);
        }
        Ok(softmax(scores))
    }
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

impl Classifier<SparseVector> for LinearModel {
    fn predict(&self, features: &SparseVector) -> Result<ClassValue, ClassifierError> {
        let scores = self.decision_sparse(features)?;
        self.pick(&scores)
    }

    fn predict_proba(&self, features: &SparseVector) -> Result<Vec<f32>, ClassifierError> {
        let scores = self.decision_sparse(features)?;
        self.probabilities(&scores)
    }

    fn classes(&self) -> &[ClassValue] {
        &self.classes
    }
}

impl Classifier<[f32]> for LinearModel {
    fn predict(&self, features: &[f32]) -> Result<ClassValue, ClassifierError> {
        let scores = self.decision_dense(features)?;
        self.pick(&scores)
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        let scores = self.decision_dense(features)?;
        self.probabilities(&scores)
    }

    fn classes(&self) -> &[ClassValue] {
        &self.classes
    }
}
