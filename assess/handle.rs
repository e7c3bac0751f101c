//! The process-wide classifier handle.
//!
//! The artifact is read once. Whatever happened during that read, a usable
//! classifier or the reason there is none, is kept for the lifetime of the
//! process and never mutated, so every assessment sees the same answer.

use crate::model::{Classifier, ModelError, TrainedModel};
use log::{info, warn};
use std::path::Path;
use std::sync::OnceLock;

static GLOBAL_HANDLE: OnceLock<ModelHandle> = OnceLock::new();

/// Outcome of loading the classifier artifact.
pub enum ModelHandle {
    Loaded(Box<dyn Classifier>),
    Failed(ModelError),
}

impl ModelHandle {
    /// Reads the artifact at `path`. Failure is captured, not returned: a
    /// handle that failed to load simply disables predictions.
    pub fn load(path: &Path) -> Self {
        match TrainedModel::load(path) {
            Ok(model) => {
                info!(
                    "Loaded {:?} model with {} features from {}",
                    model.family,
                    model.feature_names.len(),
                    path.display()
                );
                if !model.matches_canonical_order() {
                    warn!(
                        "Model at {} was trained on a different feature order; predictions will be refused",
                        path.display()
                    );
                }
                ModelHandle::Loaded(Box::new(model))
            }
            Err(e) => {
                warn!("Could not load model from {}: {e}", path.display());
                ModelHandle::Failed(e)
            }
        }
    }

    pub fn from_classifier(classifier: impl Classifier + 'static) -> Self {
        ModelHandle::Loaded(Box::new(classifier))
    }

    pub fn classifier(&self) -> Result<&dyn Classifier, &ModelError> {
        match self {
            ModelHandle::Loaded(classifier) => Ok(classifier.as_ref()),
            ModelHandle::Failed(e) => Err(e),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelHandle::Loaded(_))
    }

    pub fn load_error(&self) -> Option<&ModelError> {
        match self {
            ModelHandle::Loaded(_) => None,
            ModelHandle::Failed(e) => Some(e),
        }
    }
}

/// Returns the process-wide handle, loading it from `path` on first use.
/// Later calls return the same handle whatever path they pass.
pub fn global(path: &Path) -> &'static ModelHandle {
    GLOBAL_HANDLE.get_or_init(|| ModelHandle::load(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_NAMES;
    use crate::model::{ModelFamily, TrainedModel};
    use tempfile::tempdir;

    #[test]
    fn missing_artifact_yields_failed_handle() {
        let dir = tempdir().unwrap();
        let handle = ModelHandle::load(&dir.path().join("final_model.toml"));
        assert!(!handle.is_loaded());
        assert!(matches!(handle.load_error(), Some(ModelError::NotFound(_))));
        assert!(handle.classifier().is_err());
    }

    #[test]
    fn global_handle_is_loaded_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("final_model.toml");
        TrainedModel {
            description: None,
            family: ModelFamily::LinearThreshold,
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            intercept: -1.0,
            coefficients: vec![0.0; FEATURE_NAMES.len()],
            threshold: 0.5,
        }
        .save(&path)
        .unwrap();

        let first = global(&path);
        let second = global(&dir.path().join("elsewhere.toml"));
        assert!(std::ptr::eq(first, second));
        assert!(second.is_loaded());
    }
}
