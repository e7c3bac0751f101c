//! Static informational text and the input review panel.

use crate::features::{CONDITION_COUNT, FEATURE_COUNT, SYMPTOM_COUNT, Selections};

pub const TITLE: &str = "🏥 COVID-19 Risk Assessment Tool";

pub const INTRODUCTION: &str = "\
This tool helps assess COVID-19 risk based on symptoms and health conditions.
Note: This is not a medical diagnosis. Please consult a healthcare professional for proper testing and advice.";

pub const DISCLAIMER: &str = "\
Disclaimer: This tool is for educational and informational purposes only. It is not a substitute for professional medical advice, diagnosis, or treatment.
Always seek the advice of your physician or other qualified health provider with any questions you may have regarding a medical condition.";

pub const EMERGENCY_CONTACTS: &str = "\
📞 Emergency Contacts
  Nigeria CDC Hotline: 07030942066
  SMS: 08021283200
  WhatsApp: 07030942066";

pub const RESOURCES: &str = "\
🔗 Resources
  - Nigeria CDC COVID-19: https://covid19.ncdc.gov.ng/
  - WHO COVID-19 Information: https://www.who.int/emergencies/diseases/novel-coronavirus-2019";

/// The "about" panel, naming the artifact the tool was started with.
pub fn about(model_file: &str) -> String {
    format!(
        "\
ℹ️ About This Tool
This COVID-19 risk assessment tool uses machine learning to evaluate the likelihood of COVID-19 based on:
  - Symptoms
  - Age and gender
  - Pre-existing conditions

Model Information:
  - File: {model_file}
  - Features: {FEATURE_COUNT} input variables
  - Output: Binary classification (High/Low risk)"
    )
}

/// All side panels, in display order.
pub fn sidebar(model_file: &str) -> String {
    format!("{}\n\n{EMERGENCY_CONTACTS}\n\n{RESOURCES}\n", about(model_file))
}

/// Summary of what the user entered, shown before the verdict.
pub fn review(selections: &Selections) -> String {
    format!(
        "Review Your Input\n  Age: {} years\n  Gender: {}\n  Number of symptoms: {}/{SYMPTOM_COUNT}\n  Pre-existing conditions: {}/{CONDITION_COUNT}\n",
        selections.clamped_age(),
        selections.gender,
        selections.symptom_count(),
        selections.condition_count()
    )
}
