//! The interactive assessment form.
//!
//! Prompts for every field in turn, shows the review panel and the verdict,
//! then offers to run again with the previous answers pre-filled. Reading is
//! line based; end of input ends the session cleanly.

use crate::features::{Answer, Gender, SelectionError, Selections, parse_age};
use crate::handle::ModelHandle;
use crate::panels;
use crate::render::{Assessor, render_notice};
use std::io::{self, BufRead, Write};
use std::str::FromStr;

/// A yes/no question, keyed by the feature it fills.
struct Question {
    feature: &'static str,
    label: &'static str,
    help: &'static str,
}

const SYMPTOM_QUESTIONS: [Question; 9] = [
    Question { feature: "fever", label: "Fever", help: "Body temperature above 38°C (100.4°F)" },
    Question { feature: "cough", label: "Cough", help: "Persistent dry or wet cough" },
    Question { feature: "short_breath", label: "Shortness of Breath", help: "Difficulty breathing or feeling winded" },
    Question { feature: "loss_of_taste_smell", label: "Loss of Taste or Smell", help: "Sudden loss of taste or smell" },
    Question { feature: "fatigue", label: "Fatigue", help: "Unusual tiredness or exhaustion" },
    Question { feature: "headache", label: "Headache", help: "Persistent or severe headache" },
    Question { feature: "sore_throat", label: "Sore Throat", help: "Pain or irritation in throat" },
    Question { feature: "nausea", label: "Nausea", help: "Feeling sick or vomiting" },
    Question { feature: "chest_pain", label: "Chest Pain", help: "Pain or pressure in chest" },
];

const CONDITION_QUESTIONS: [Question; 2] = [
    Question { feature: "diabetes", label: "Diabetes", help: "Type 1 or Type 2 diabetes" },
    Question { feature: "hypertension", label: "Hypertension", help: "High blood pressure" },
];

pub struct Form<'h, R, W> {
    input: R,
    output: W,
    assessor: Assessor<'h>,
    model_file: String,
}

impl<'h, R: BufRead, W: Write> Form<'h, R, W> {
    pub fn new(input: R, output: W, handle: &'h ModelHandle, model_file: impl Into<String>) -> Self {
        Self {
            input,
            output,
            assessor: Assessor::new(handle),
            model_file: model_file.into(),
        }
    }

    /// Runs until the user declines another assessment or input ends.
    /// Returns how many assessments were triggered.
    pub fn run(mut self) -> io::Result<usize> {
        writeln!(self.output, "{}\n\n{}\n", panels::TITLE, panels::INTRODUCTION)?;
        writeln!(self.output, "{}", panels::sidebar(&self.model_file))?;
        if let Some(e) = self.assessor.handle().load_error() {
            writeln!(self.output, "❌ {e}\n")?;
        }

        let mut selections = Selections::default();
        let mut assessments = 0;
        loop {
            match self.fill(selections)? {
                Some(filled) => selections = filled,
                None => break,
            }

            writeln!(self.output, "\n{}", panels::review(&selections))?;
            assessments += 1;
            match self.assessor.assess(&selections.normalize()) {
                Ok(verdict) => write!(self.output, "{verdict}")?,
                Err(e) => write!(self.output, "{}", render_notice(&e))?,
            }
            writeln!(self.output, "\n{}\n", panels::DISCLAIMER)?;

            match self.ask("Assess again?", "yes or no", Answer::No)? {
                Some(Answer::Yes) => continue,
                _ => break,
            }
        }
        self.output.flush()?;
        Ok(assessments)
    }

    /// Walks through every field, starting from `current`. `None` when input
    /// ran out before the form was complete.
    fn fill(&mut self, current: Selections) -> io::Result<Option<Selections>> {
        let mut selections = current;

        writeln!(self.output, "Demographics")?;
        let Some(age) = self.ask_with("Age", "years, 0-120", current.age, parse_age)? else {
            return Ok(None);
        };
        selections.age = age;
        let Some(gender) = self.ask::<Gender>("Gender", "Male or Female", current.gender)? else {
            return Ok(None);
        };
        selections.gender = gender;

        for (heading, questions) in [
            ("Symptoms", &SYMPTOM_QUESTIONS[..]),
            ("Pre-existing Conditions", &CONDITION_QUESTIONS[..]),
        ] {
            writeln!(self.output, "{heading}")?;
            for question in questions {
                let Some(slot) = selections.answer_mut(question.feature) else {
                    continue;
                };
                let default = *slot;
                let Some(answer) = self.ask(question.label, question.help, default)? else {
                    return Ok(None);
                };
                if let Some(slot) = selections.answer_mut(question.feature) {
                    *slot = answer;
                }
            }
        }
        Ok(Some(selections))
    }

    fn ask<T>(&mut self, label: &str, help: &str, default: T) -> io::Result<Option<T>>
    where
        T: FromStr<Err = SelectionError> + std::fmt::Display + Copy,
    {
        self.ask_with(label, help, default, T::from_str)
    }

    /// Prompts until the line parses. An empty line keeps `default`.
    fn ask_with<T, F>(
        &mut self,
        label: &str,
        help: &str,
        default: T,
        parse: F,
    ) -> io::Result<Option<T>>
    where
        T: std::fmt::Display + Copy,
        F: Fn(&str) -> Result<T, SelectionError>,
    {
        loop {
            write!(self.output, "  {label} ({help}) [{default}]: ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let line = line.trim();
            if line.is_empty() {
                return Ok(Some(default));
            }
            match parse(line) {
                Ok(value) => return Ok(Some(value)),
                Err(e) => writeln!(self.output, "  {e}")?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_NAMES;
    use crate::model::{ModelError, ModelFamily, TrainedModel};
    use std::io::Cursor;
    use std::path::PathBuf;

    fn fever_model() -> ModelHandle {
        let mut coefficients = vec![0.0; FEATURE_NAMES.len()];
        coefficients[2] = 4.0;
        ModelHandle::from_classifier(TrainedModel {
            description: None,
            family: ModelFamily::Logistic,
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            intercept: -2.0,
            coefficients,
            threshold: 0.5,
        })
    }

    fn run_form(handle: &ModelHandle, script: &str) -> (usize, String) {
        let mut output = Vec::new();
        let count = Form::new(Cursor::new(script.to_string()), &mut output, handle, "final_model.toml")
            .run()
            .unwrap();
        (count, String::from_utf8(output).unwrap())
    }

    #[test]
    fn defaults_and_answers_flow_into_the_verdict() {
        let handle = fever_model();
        // age, gender, fever, cough, then defaults for everything else, then "no".
        let script = "30\nmale\nyes\nyes\n\n\n\n\n\n\n\n\n\nno\n";
        let (count, text) = run_form(&handle, script);

        assert_eq!(count, 1);
        assert!(text.contains("Number of symptoms: 2/9"));
        assert!(text.contains("Pre-existing conditions: 0/2"));
        assert!(text.contains("High Risk Assessment"));
        assert!(text.contains("Model confidence: 88.1%"));
        assert!(text.contains("Disclaimer"));
    }

    #[test]
    fn invalid_answers_are_asked_again() {
        let handle = fever_model();
        let script = "abc\n200\nperson\nfemale\nmaybe\nno\n\n\n\n\n\n\n\n\n\n\n";
        let (count, text) = run_form(&handle, script);

        assert_eq!(count, 1);
        assert!(text.contains("'abc' is not a whole number of years."));
        assert!(text.contains("'person' is not a valid answer for gender."));
        assert!(text.contains("Age: 120 years"));
        assert!(text.contains("Gender: Female"));
        assert!(text.contains("Low Risk Assessment"));
    }

    #[test]
    fn previous_answers_are_kept_for_the_next_round() {
        let handle = fever_model();
        let mut script = String::from("45\n\nyes\n");
        script.push_str(&"\n".repeat(10));
        script.push_str("yes\n");
        script.push_str(&"\n".repeat(13));
        script.push_str("no\n");
        let (count, text) = run_form(&handle, &script);

        assert_eq!(count, 2);
        assert_eq!(text.matches("Age: 45 years").count(), 2);
        assert_eq!(text.matches("High Risk Assessment").count(), 2);
    }

    #[test]
    fn missing_model_is_reported_on_every_trigger() {
        let handle = ModelHandle::Failed(ModelError::NotFound(PathBuf::from("final_model.toml")));
        let mut script = "\n".repeat(13);
        script.push_str("y\n");
        script.push_str(&"\n".repeat(13));
        let (count, text) = run_form(&handle, &script);

        assert_eq!(count, 2);
        assert!(text.contains("Model file 'final_model.toml' not found."));
        assert_eq!(text.matches("Model not loaded. Cannot make predictions.").count(), 2);
        assert!(!text.contains("High Risk Assessment"));
        assert!(!text.contains("Low Risk Assessment"));
    }

    #[test]
    fn end_of_input_mid_form_ends_quietly() {
        let handle = fever_model();
        let (count, text) = run_form(&handle, "30\n");
        assert_eq!(count, 0);
        assert!(!text.contains("Review Your Input"));
    }
}
