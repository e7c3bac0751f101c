//! # Input Normalization
//!
//! Converts the answers collected by the assessment form into the fixed-order
//! numeric record consumed by the classifier.
//!
//! - Strict Schema: the thirteen feature names and their order are not
//!   configurable. They are the columns the classifier was trained on, and
//!   `FEATURE_NAMES` is the single source of truth for that order.
//! - Typed Answers: every categorical answer is an enum, so once a selection
//!   exists it always normalizes. Parsing the literal strings happens at the
//!   boundary, through `FromStr`, and is the only place a `SelectionError`
//!   can arise.

use ndarray::Array2;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lowest age accepted by the form.
pub const AGE_MIN: u8 = 0;
/// Highest age accepted by the form.
pub const AGE_MAX: u8 = 120;
/// Age pre-filled in the form.
pub const DEFAULT_AGE: u8 = 30;

/// Width of the feature record.
pub const FEATURE_COUNT: usize = 13;

/// Number of symptom questions, used by the review panel (`n/9`).
pub const SYMPTOM_COUNT: usize = 9;
/// Number of pre-existing condition questions (`n/2`).
pub const CONDITION_COUNT: usize = 2;

/// The canonical column order of the feature record. This order is the
/// contract with the trained classifier and is checked by name at inference.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "gender",
    "fever",
    "cough",
    "short_breath",
    "loss_of_taste_smell",
    "fatigue",
    "headache",
    "sore_throat",
    "nausea",
    "chest_pain",
    "diabetes",
    "hypertension",
];

/// Errors raised while parsing raw form answers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("'{value}' is not a valid answer for {field}. Expected one of: {expected}.")]
    InvalidChoice {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("'{0}' is not a whole number of years.")]
    InvalidAge(String),
}

/// A yes/no answer to a symptom or condition question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Answer {
    #[default]
    No,
    Yes,
}

impl Answer {
    /// "Yes" encodes to 1, "No" to 0.
    pub fn encode(self) -> u8 {
        match self {
            Answer::Yes => 1,
            Answer::No => 0,
        }
    }

    pub fn is_yes(self) -> bool {
        self == Answer::Yes
    }
}

impl FromStr for Answer {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => Ok(Answer::Yes),
            "no" | "n" => Ok(Answer::No),
            _ => Err(SelectionError::InvalidChoice {
                field: "a yes/no question",
                value: s.to_string(),
                expected: "Yes, No",
            }),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Answer::Yes => "Yes",
            Answer::No => "No",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    /// "Male" encodes to 1, "Female" to 0.
    pub fn encode(self) -> u8 {
        match self {
            Gender::Male => 1,
            Gender::Female => 0,
        }
    }
}

impl FromStr for Gender {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            _ => Err(SelectionError::InvalidChoice {
                field: "gender",
                value: s.to_string(),
                expected: "Male, Female",
            }),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        })
    }
}

/// Clamps an arbitrary integer into the accepted age range, the way the
/// bounded number input does.
pub fn clamp_age(years: i64) -> u8 {
    years.clamp(i64::from(AGE_MIN), i64::from(AGE_MAX)) as u8
}

/// Parses an age typed by the user. Out-of-range values are clamped, not
/// rejected.
pub fn parse_age(raw: &str) -> Result<u8, SelectionError> {
    raw.trim()
        .parse::<i64>()
        .map(clamp_age)
        .map_err(|_| SelectionError::InvalidAge(raw.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Symptoms {
    pub fever: Answer,
    pub cough: Answer,
    pub short_breath: Answer,
    pub loss_of_taste_smell: Answer,
    pub fatigue: Answer,
    pub headache: Answer,
    pub sore_throat: Answer,
    pub nausea: Answer,
    pub chest_pain: Answer,
}

impl Symptoms {
    /// Answers in feature-record order.
    pub fn answers(&self) -> [Answer; SYMPTOM_COUNT] {
        [
            self.fever,
            self.cough,
            self.short_breath,
            self.loss_of_taste_smell,
            self.fatigue,
            self.headache,
            self.sore_throat,
            self.nausea,
            self.chest_pain,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Conditions {
    pub diabetes: Answer,
    pub hypertension: Answer,
}

impl Conditions {
    pub fn answers(&self) -> [Answer; CONDITION_COUNT] {
        [self.diabetes, self.hypertension]
    }
}

/// Everything the user has selected on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selections {
    pub age: u8,
    pub gender: Gender,
    pub symptoms: Symptoms,
    pub conditions: Conditions,
}

impl Default for Selections {
    fn default() -> Self {
        Self {
            age: DEFAULT_AGE,
            gender: Gender::default(),
            symptoms: Symptoms::default(),
            conditions: Conditions::default(),
        }
    }
}

impl Selections {
    /// The age as the model sees it, clamped into the form's range.
    pub fn clamped_age(&self) -> u8 {
        self.age.clamp(AGE_MIN, AGE_MAX)
    }

    pub fn symptom_count(&self) -> usize {
        self.symptoms.answers().iter().filter(|a| a.is_yes()).count()
    }

    pub fn condition_count(&self) -> usize {
        self.conditions.answers().iter().filter(|a| a.is_yes()).count()
    }

    /// Produces the feature record for these selections.
    pub fn normalize(&self) -> FeatureRecord {
        normalize(self)
    }

    /// The yes/no answer stored under a feature name. `None` for `age`,
    /// `gender` and unknown names.
    pub fn answer_mut(&mut self, name: &str) -> Option<&mut Answer> {
        let s = &mut self.symptoms;
        let c = &mut self.conditions;
        match name {
            "fever" => Some(&mut s.fever),
            "cough" => Some(&mut s.cough),
            "short_breath" => Some(&mut s.short_breath),
            "loss_of_taste_smell" => Some(&mut s.loss_of_taste_smell),
            "fatigue" => Some(&mut s.fatigue),
            "headache" => Some(&mut s.headache),
            "sore_throat" => Some(&mut s.sore_throat),
            "nausea" => Some(&mut s.nausea),
            "chest_pain" => Some(&mut s.chest_pain),
            "diabetes" => Some(&mut c.diabetes),
            "hypertension" => Some(&mut c.hypertension),
            _ => None,
        }
    }
}

/// The numeric encoding of one set of form answers. Field declaration order
/// matches `FEATURE_NAMES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureRecord {
    pub age: u8,
    pub gender: u8,
    pub fever: u8,
    pub cough: u8,
    pub short_breath: u8,
    pub loss_of_taste_smell: u8,
    pub fatigue: u8,
    pub headache: u8,
    pub sore_throat: u8,
    pub nausea: u8,
    pub chest_pain: u8,
    pub diabetes: u8,
    pub hypertension: u8,
}

impl FeatureRecord {
    /// The thirteen values in canonical order.
    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        [
            self.age,
            self.gender,
            self.fever,
            self.cough,
            self.short_breath,
            self.loss_of_taste_smell,
            self.fatigue,
            self.headache,
            self.sore_throat,
            self.nausea,
            self.chest_pain,
            self.diabetes,
            self.hypertension,
        ]
        .map(f64::from)
    }

    /// Looks up a single field by its feature name.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|idx| self.values()[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        FEATURE_NAMES.into_iter().zip(self.values())
    }

    /// A single-row matrix of shape `[1, FEATURE_COUNT]`.
    pub fn to_row(&self) -> Array2<f64> {
        let values = self.values();
        Array2::from_shape_fn((1, FEATURE_COUNT), |(_, j)| values[j])
    }

    /// The record as a one-row frame labelled with the canonical names.
    pub fn to_frame(&self) -> FeatureFrame {
        FeatureFrame::new(
            FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            self.to_row(),
        )
    }
}

/// Named columns plus a row-major matrix of values. This is what classifiers
/// receive, so they can verify the column names they were trained on.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    columns: Vec<String>,
    rows: Array2<f64>,
}

impl FeatureFrame {
    pub fn new(columns: Vec<String>, rows: Array2<f64>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &Array2<f64> {
        &self.rows
    }

    pub fn nrows(&self) -> usize {
        self.rows.nrows()
    }
}

/// Maps raw selections to the feature record. Pure and infallible.
pub fn normalize(selections: &Selections) -> FeatureRecord {
    let s = &selections.symptoms;
    let c = &selections.conditions;
    FeatureRecord {
        age: selections.clamped_age(),
        gender: selections.gender.encode(),
        fever: s.fever.encode(),
        cough: s.cough.encode(),
        short_breath: s.short_breath.encode(),
        loss_of_taste_smell: s.loss_of_taste_smell.encode(),
        fatigue: s.fatigue.encode(),
        headache: s.headache.encode(),
        sore_throat: s.sore_throat.encode(),
        nausea: s.nausea.encode(),
        chest_pain: s.chest_pain.encode(),
        diabetes: c.diabetes.encode(),
        hypertension: c.hypertension.encode(),
    }
}
