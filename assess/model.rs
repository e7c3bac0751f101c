use crate::features::{FEATURE_NAMES, FeatureFrame};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

// --- Public Data Structures ---
// These structs define the public, human-readable format of the classifier
// artifact when serialized to a TOML file.

/// The artifact the tool looks for when no path is given.
pub const DEFAULT_MODEL_PATH: &str = "final_model.toml";

/// The decision threshold used by logistic models that do not set one.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// Defines how the linear predictor is turned into a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Logistic regression. The sigmoid of the linear predictor is the
    /// probability of the high-risk class, so class probabilities are available.
    Logistic,
    /// A bare separating hyperplane: label 1 when the linear predictor is
    /// non-negative. There are no class probabilities.
    LinearThreshold,
}

/// The capability surface the rest of the tool relies on. Anything that can
/// label rows of a `FeatureFrame` is usable as the classifier.
pub trait Classifier: Send + Sync {
    /// One label per row of `frame`.
    fn predict(&self, frame: &FeatureFrame) -> Result<Array1<i64>, PredictionError>;

    /// Class probabilities, shape `[n_rows, n_classes]`. Optional; the default
    /// reports that the classifier has none.
    fn predict_proba(&self, _: &FeatureFrame) -> Result<Array2<f64>, PredictionError> {
        Err(PredictionError::Unsupported)
    }
}

/// The top-level, self-contained classifier artifact.
/// This is the structure that gets saved to and loaded from a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub family: ModelFamily,
    /// The column order used during training. Inference refuses any frame
    /// whose columns do not match this list name for name.
    pub feature_names: Vec<String>,
    pub intercept: f64,
    /// One coefficient per entry of `feature_names`, in the same order.
    pub coefficients: Vec<f64>,
    /// Probability at or above which a logistic model reports label 1.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

/// Errors raised while reading or writing the classifier artifact.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error(
        "Model file '{}' not found. Please ensure the model file is in the expected location.",
        .0.display()
    )]
    NotFound(PathBuf),
    #[error("Failed to read or write model file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML model file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize model to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Model file is inconsistent: {0}")]
    Invalid(String),
}

/// Errors raised by a classifier while labelling a frame.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Prediction data has {found} feature columns, but the model was trained on {expected}.")]
    MismatchedFeatureCount { found: usize, expected: usize },
    #[error(
        "Feature column {position} is '{found}', but the model was trained with '{expected}' in that position."
    )]
    SchemaMismatch {
        position: usize,
        found: String,
        expected: String,
    },
    #[error("Non-finite value found in feature column '{0}'.")]
    NonFinite(String),
    #[error("The classifier returned no prediction.")]
    Empty,
    #[error("The classifier returned label {0}; only 0 (low risk) and 1 (high risk) are defined.")]
    InvalidLabel(i64),
    #[error("This model does not provide class probabilities.")]
    Unsupported,
}

impl TrainedModel {
    /// Saves the model to a file in a human-readable TOML format.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Loads a model from a TOML file and checks that it is internally
    /// consistent. A missing file is reported separately from other I/O errors.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let toml_string = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ModelError::NotFound(path.to_path_buf()),
            _ => ModelError::IoError(e),
        })?;
        let model: TrainedModel = toml::from_str(&toml_string)?;
        model.validate()?;
        Ok(model)
    }

    /// Whether the trained column order equals the order the form produces.
    pub fn matches_canonical_order(&self) -> bool {
        self.feature_names.iter().map(String::as_str).eq(FEATURE_NAMES)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.feature_names.is_empty() {
            return Err(ModelError::Invalid("no feature names".to_string()));
        }
        if self.coefficients.len() != self.feature_names.len() {
            return Err(ModelError::Invalid(format!(
                "{} coefficients for {} features",
                self.coefficients.len(),
                self.feature_names.len()
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.feature_names.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(ModelError::Invalid(format!("feature '{dup}' appears twice")));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::Invalid(
                "intercept and coefficients must be finite".to_string(),
            ));
        }
        if self.family == ModelFamily::Logistic && !(self.threshold > 0.0 && self.threshold < 1.0)
        {
            return Err(ModelError::Invalid(format!(
                "threshold {} is outside (0, 1)",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Computes the linear predictor for every row after checking the frame
    /// against the trained schema.
    fn linear_predictor(&self, frame: &FeatureFrame) -> Result<Array1<f64>, PredictionError> {
        internal::check_schema(frame, &self.feature_names)?;
        let coefficients = ArrayView1::from(self.coefficients.as_slice());
        Ok(frame.rows().dot(&coefficients) + self.intercept)
    }

    /// Probability of the high-risk class for every row. Only meaningful for
    /// logistic models.
    fn positive_probabilities(&self, frame: &FeatureFrame) -> Result<Array1<f64>, PredictionError> {
        let eta = self.linear_predictor(frame)?;
        // Clamp eta to prevent overflow in exp().
        let mut probs = eta.mapv(|e| 1.0 / (1.0 + f64::exp(-e.clamp(-700.0, 700.0))));
        probs.mapv_inplace(|p| p.clamp(1e-8, 1.0 - 1e-8));
        Ok(probs)
    }
}

impl Classifier for TrainedModel {
    fn predict(&self, frame: &FeatureFrame) -> Result<Array1<i64>, PredictionError> {
        let labels = match self.family {
            ModelFamily::Logistic => self
                .positive_probabilities(frame)?
                .mapv(|p| i64::from(p >= self.threshold)),
            ModelFamily::LinearThreshold => self
                .linear_predictor(frame)?
                .mapv(|eta| i64::from(eta >= 0.0)),
        };
        Ok(labels)
    }

    fn predict_proba(&self, frame: &FeatureFrame) -> Result<Array2<f64>, PredictionError> {
        match self.family {
            ModelFamily::Logistic => {
                let positive = self.positive_probabilities(frame)?;
                let negative = positive.mapv(|p| 1.0 - p);
                ndarray::stack(Axis(1), &[negative.view(), positive.view()])
                    .map_err(|_| PredictionError::Empty)
            }
            ModelFamily::LinearThreshold => Err(PredictionError::Unsupported),
        }
    }
}

/// Internal module for prediction-specific implementation details.
mod internal {
    use super::*;

    /// The frame must carry exactly the trained columns, in the trained order,
    /// and only finite values.
    pub(super) fn check_schema(
        frame: &FeatureFrame,
        feature_names: &[String],
    ) -> Result<(), PredictionError> {
        if frame.columns().len() != feature_names.len()
            || frame.rows().ncols() != feature_names.len()
        {
            return Err(PredictionError::MismatchedFeatureCount {
                found: frame.rows().ncols().max(frame.columns().len()),
                expected: feature_names.len(),
            });
        }
        if frame.nrows() == 0 {
            return Err(PredictionError::Empty);
        }
        for (position, (found, expected)) in frame.columns().iter().zip(feature_names).enumerate() {
            if found != expected {
                return Err(PredictionError::SchemaMismatch {
                    position,
                    found: found.clone(),
                    expected: expected.clone(),
                });
            }
        }
        for (column, name) in frame.rows().axis_iter(Axis(1)).zip(feature_names) {
            if column.iter().any(|v| !v.is_finite()) {
                return Err(PredictionError::NonFinite(name.clone()));
            }
        }
        Ok(())
    }
}
