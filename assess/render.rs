//! # Decision Rendering
//!
//! Drives the classifier for one assessment and turns its output into the
//! verdict shown to the user.
//!
//! The renderer has two states. It starts out awaiting input and moves to
//! showing a result only when an assessment succeeds. A failed assessment
//! (no model, or a classifier error) leaves it awaiting input so the user can
//! simply try again.
//!
//! Only the label is mandatory. Class probabilities are requested separately
//! and, if the classifier cannot provide them, the confidence line is left
//! out without surfacing an error.

use crate::features::FeatureRecord;
use crate::handle::ModelHandle;
use crate::model::{Classifier, PredictionError};
use log::debug;
use std::fmt;
use thiserror::Error;

pub const HIGH_RISK_HEADLINE: &str = "⚠️ High Risk Assessment";
pub const LOW_RISK_HEADLINE: &str = "✅ Low Risk Assessment";

pub const HIGH_RISK_ADVICE: &str = "\
Based on the symptoms and conditions provided, there is an elevated risk of COVID-19.

Recommended Actions:
  1. Isolate immediately to prevent potential spread
  2. Get tested for COVID-19 as soon as possible
  3. Contact your healthcare provider for medical advice
  4. Monitor symptoms and seek emergency care if they worsen

Emergency symptoms requiring immediate medical attention:
  - Trouble breathing
  - Persistent chest pain or pressure
  - Confusion or inability to stay awake
  - Bluish lips or face";

pub const LOW_RISK_ADVICE: &str = "\
Based on the symptoms and conditions provided, the risk of COVID-19 appears to be low.

Still recommended:
  1. Continue monitoring your symptoms
  2. Practice good hygiene (wash hands, wear mask in crowded places)
  3. Stay home if feeling unwell
  4. Consider testing if symptoms worsen or you've had exposure";

pub const PREDICTION_HINT: &str =
    "Please check that your model is compatible with the input features.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskLevel {
    Low,
    High,
}

impl RiskLevel {
    pub fn label(self) -> i64 {
        match self {
            RiskLevel::Low => 0,
            RiskLevel::High => 1,
        }
    }

    pub fn headline(self) -> &'static str {
        match self {
            RiskLevel::High => HIGH_RISK_HEADLINE,
            RiskLevel::Low => LOW_RISK_HEADLINE,
        }
    }

    pub fn advice(self) -> &'static str {
        match self {
            RiskLevel::High => HIGH_RISK_ADVICE,
            RiskLevel::Low => LOW_RISK_ADVICE,
        }
    }
}

impl TryFrom<i64> for RiskLevel {
    type Error = PredictionError;

    fn try_from(label: i64) -> Result<Self, Self::Error> {
        match label {
            0 => Ok(RiskLevel::Low),
            1 => Ok(RiskLevel::High),
            other => Err(PredictionError::InvalidLabel(other)),
        }
    }
}

/// The largest class probability as a percentage. Shown to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Confidence(f64);

impl Confidence {
    /// `None` when there is nothing usable: no probabilities, or any value
    /// that is not a probability.
    pub fn from_probabilities(probabilities: &[f64]) -> Option<Self> {
        if probabilities.is_empty()
            || probabilities
                .iter()
                .any(|p| !p.is_finite() || !(0.0..=1.0).contains(p))
        {
            return None;
        }
        let max = probabilities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Confidence(max * 100.0))
    }

    /// The percentage as displayed, rounded to one decimal.
    pub fn percent(self) -> f64 {
        format!("{:.1}", self.0).parse().unwrap_or(self.0)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

/// The result of one successful assessment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub risk: RiskLevel,
    pub confidence: Option<Confidence>,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.risk.headline())?;
        writeln!(f)?;
        writeln!(f, "{}", self.risk.advice())?;
        if let Some(confidence) = self.confidence {
            writeln!(f)?;
            writeln!(f, "📊 Model confidence: {confidence}")?;
        }
        Ok(())
    }
}

/// Why an assessment produced no verdict.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssessError {
    #[error("Model not loaded. Cannot make predictions.")]
    ModelNotLoaded { reason: String },
    #[error("Error making prediction: {0}")]
    Prediction(#[from] PredictionError),
}

impl AssessError {
    /// Extra guidance printed under the notice, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AssessError::ModelNotLoaded { .. } => None,
            AssessError::Prediction(_) => Some(PREDICTION_HINT),
        }
    }
}

/// The notice shown in place of a verdict.
pub fn render_notice(error: &AssessError) -> String {
    match error.hint() {
        Some(hint) => format!("❌ {error}\nℹ️ {hint}\n"),
        None => format!("❌ {error}\n"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssessmentState {
    AwaitingInput,
    ResultShown(Verdict),
}

/// Runs the classifier on one record. The label decides the verdict; the
/// probability request is independent and any failure there only drops the
/// confidence.
pub fn classify(
    classifier: &dyn Classifier,
    record: &FeatureRecord,
) -> Result<Verdict, PredictionError> {
    let frame = record.to_frame();

    let labels = classifier.predict(&frame)?;
    let label = *labels.get(0).ok_or(PredictionError::Empty)?;
    let risk = RiskLevel::try_from(label)?;

    let confidence = match classifier.predict_proba(&frame) {
        Ok(proba) if proba.nrows() > 0 => {
            let first_row: Vec<f64> = proba.row(0).to_vec();
            Confidence::from_probabilities(&first_row)
        }
        Ok(_) => None,
        Err(e) => {
            debug!("Omitting confidence: {e}");
            None
        }
    };

    Ok(Verdict { risk, confidence })
}

/// The assessment state machine for one session.
pub struct Assessor<'h> {
    handle: &'h ModelHandle,
    state: AssessmentState,
}

impl<'h> Assessor<'h> {
    pub fn new(handle: &'h ModelHandle) -> Self {
        Self {
            handle,
            state: AssessmentState::AwaitingInput,
        }
    }

    pub fn state(&self) -> &AssessmentState {
        &self.state
    }

    pub fn handle(&self) -> &'h ModelHandle {
        self.handle
    }

    /// Handles one "assess" trigger.
    pub fn assess(&mut self, record: &FeatureRecord) -> Result<Verdict, AssessError> {
        self.state = AssessmentState::AwaitingInput;

        let classifier = self
            .handle
            .classifier()
            .map_err(|e| AssessError::ModelNotLoaded {
                reason: e.to_string(),
            })?;
        let verdict = classify(classifier, record)?;

        self.state = AssessmentState::ResultShown(verdict);
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureFrame, Selections};
    use crate::model::ModelError;
    use ndarray::{Array1, Array2, array};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A classifier with canned answers that counts how often it is called.
    #[derive(Clone)]
    struct Scripted {
        label: Result<i64, PredictionError>,
        proba: Result<Array2<f64>, PredictionError>,
        predict_calls: Arc<AtomicUsize>,
        proba_calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(label: Result<i64, PredictionError>, proba: Result<Array2<f64>, PredictionError>) -> Self {
            Self {
                label,
                proba,
                predict_calls: Arc::new(AtomicUsize::new(0)),
                proba_calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Classifier for Scripted {
        fn predict(&self, frame: &FeatureFrame) -> Result<Array1<i64>, PredictionError> {
            self.predict_calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(frame.nrows(), 1);
            self.label.clone().map(|l| array![l])
        }

        fn predict_proba(&self, frame: &FeatureFrame) -> Result<Array2<f64>, PredictionError> {
            self.proba_calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(frame.nrows(), 1);
            self.proba.clone()
        }
    }

    fn record() -> FeatureRecord {
        Selections::default().normalize()
    }

    #[test]
    fn label_one_renders_high_risk_block() {
        let handle = ModelHandle::from_classifier(Scripted::new(Ok(1), Ok(array![[0.127, 0.873]])));
        let mut assessor = Assessor::new(&handle);

        let verdict = assessor.assess(&record()).unwrap();
        assert_eq!(verdict.risk, RiskLevel::High);
        assert_eq!(verdict.confidence.map(Confidence::percent), Some(87.3));
        assert_eq!(assessor.state(), &AssessmentState::ResultShown(verdict));

        let text = verdict.to_string();
        assert!(text.contains("High Risk Assessment"));
        assert!(text.contains("Isolate immediately"));
        assert!(text.contains("Bluish lips or face"));
        assert!(!text.contains("Low Risk Assessment"));
        assert!(text.contains("Model confidence: 87.3%"));
    }

    #[test]
    fn label_zero_renders_low_risk_block() {
        let handle = ModelHandle::from_classifier(Scripted::new(Ok(0), Ok(array![[0.9, 0.1]])));
        let verdict = Assessor::new(&handle).assess(&record()).unwrap();

        assert_eq!(verdict.risk, RiskLevel::Low);
        let text = verdict.to_string();
        assert!(text.contains("Low Risk Assessment"));
        assert!(text.contains("Practice good hygiene"));
        assert!(!text.contains("High Risk Assessment"));
        assert!(text.contains("Model confidence: 90.0%"));
    }

    #[test]
    fn unsupported_probabilities_drop_confidence_silently() {
        let handle = ModelHandle::from_classifier(Scripted::new(Ok(1), Err(PredictionError::Unsupported)));
        let verdict = Assessor::new(&handle).assess(&record()).unwrap();

        assert_eq!(verdict.risk, RiskLevel::High);
        assert_eq!(verdict.confidence, None);
        assert!(!verdict.to_string().contains("confidence"));
    }

    #[test]
    fn failed_load_never_calls_the_classifier() {
        let handle = ModelHandle::Failed(ModelError::NotFound(PathBuf::from("final_model.toml")));
        let mut assessor = Assessor::new(&handle);

        for _ in 0..3 {
            let err = assessor.assess(&record()).unwrap_err();
            assert!(matches!(err, AssessError::ModelNotLoaded { .. }));
            assert_eq!(render_notice(&err), "❌ Model not loaded. Cannot make predictions.\n");
            assert_eq!(assessor.state(), &AssessmentState::AwaitingInput);
        }
    }

    #[test]
    fn prediction_failure_shows_notice_and_no_block() {
        let scripted = Scripted::new(
            Err(PredictionError::MismatchedFeatureCount { found: 13, expected: 12 }),
            Ok(array![[0.5, 0.5]]),
        );
        let proba_calls = Arc::clone(&scripted.proba_calls);
        let handle = ModelHandle::from_classifier(scripted);
        let mut assessor = Assessor::new(&handle);

        let err = assessor.assess(&record()).unwrap_err();
        assert!(matches!(err, AssessError::Prediction(_)));
        assert_eq!(proba_calls.load(Ordering::SeqCst), 0);
        assert_eq!(assessor.state(), &AssessmentState::AwaitingInput);

        let notice = render_notice(&err);
        assert!(notice.contains("Error making prediction"));
        assert!(notice.contains(PREDICTION_HINT));
        assert!(!notice.contains("Risk Assessment"));
    }

    #[test]
    fn retry_after_success_returns_to_result_shown() {
        let scripted = Scripted::new(Ok(0), Err(PredictionError::Unsupported));
        let predict_calls = Arc::clone(&scripted.predict_calls);
        let handle = ModelHandle::from_classifier(scripted);
        let mut assessor = Assessor::new(&handle);

        assert_eq!(assessor.state(), &AssessmentState::AwaitingInput);
        assessor.assess(&record()).unwrap();
        assessor.assess(&record()).unwrap();
        assert_eq!(predict_calls.load(Ordering::SeqCst), 2);
        assert!(matches!(assessor.state(), AssessmentState::ResultShown(_)));
    }

    #[test]
    fn labels_outside_zero_and_one_are_failures() {
        let handle = ModelHandle::from_classifier(Scripted::new(Ok(2), Ok(array![[0.5, 0.5]])));
        let err = Assessor::new(&handle).assess(&record()).unwrap_err();
        assert_eq!(err, AssessError::Prediction(PredictionError::InvalidLabel(2)));
    }

    #[test]
    fn confidence_is_max_probability_to_one_decimal() {
        assert_eq!(Confidence::from_probabilities(&[0.25, 0.75]).map(Confidence::percent), Some(75.0));
        assert_eq!(Confidence::from_probabilities(&[0.1234, 0.8766]).map(Confidence::percent), Some(87.7));
        assert_eq!(Confidence::from_probabilities(&[1.0, 0.0]).map(Confidence::percent), Some(100.0));
        assert_eq!(Confidence::from_probabilities(&[]), None);
        assert_eq!(Confidence::from_probabilities(&[0.5, f64::NAN]), None);
        assert_eq!(Confidence::from_probabilities(&[1.5, -0.5]), None);
        assert_eq!(Confidence::from_probabilities(&[0.333, 0.667]).unwrap().to_string(), "66.7%");
    }

    #[test]
    fn confidence_is_rounded_once_when_displayed() {
        for probabilities in [[0.4875, 0.5125], [0.4865, 0.5135]] {
            let confidence = Confidence::from_probabilities(&probabilities).unwrap();
            let expected = format!("{:.1}%", probabilities[1] * 100.0);
            assert_eq!(confidence.to_string(), expected);
            assert_eq!(format!("{:.1}%", confidence.percent()), expected);
        }
        assert_eq!(Confidence::from_probabilities(&[0.4875, 0.5125]).unwrap().to_string(), "51.2%");
    }

    #[test]
    fn malformed_probabilities_do_not_block_the_verdict() {
        let handle = ModelHandle::from_classifier(Scripted::new(Ok(1), Ok(Array2::zeros((0, 2)))));
        let verdict = Assessor::new(&handle).assess(&record()).unwrap();
        assert_eq!(verdict.confidence, None);
    }
}
