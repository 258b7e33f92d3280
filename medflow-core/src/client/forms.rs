//! Form pre-validation, before any record is created

use thiserror::Error;

use super::notification::Notification;
use crate::flows::{SymptomAnalysisRequest, TermExplanationRequest};

/// Form input rejected locally
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// Field-level message, shown under the input
    #[error("{0}")]
    Field(String),

    /// Whole-form rejection, shown as a notification
    #[error("{0}")]
    Rejected(Notification),
}

impl FormError {
    /// Notification to surface, if the rejection is form-wide
    pub fn notification(&self) -> Option<&Notification> {
        match self {
            FormError::Rejected(notification) => Some(notification),
            FormError::Field(_) => None,
        }
    }
}

/// Medical term chatbot input
pub struct TermForm;

impl TermForm {
    pub const MIN_CHARS: usize = 2;

    /// Chatbot greeting shown before the first question
    pub const GREETING: &'static str = "Hello! I'm your AI Health Helper. Ask me about any medical term, and I'll explain it in simple language.";

    pub fn validate(term: &str) -> Result<TermExplanationRequest, FormError> {
        if term.chars().count() < Self::MIN_CHARS {
            return Err(FormError::Field(
                "Term must be at least 2 characters.".to_string(),
            ));
        }
        Ok(TermExplanationRequest::new(term))
    }
}

/// A symptom the log form offers as a checkbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSymptom {
    pub id: &'static str,
    pub label: &'static str,
}

/// Checkbox symptoms, in display order
pub const COMMON_SYMPTOMS: [CatalogSymptom; 5] = [
    CatalogSymptom { id: "shortness-of-breath", label: "Shortness of breath" },
    CatalogSymptom { id: "chest-pain", label: "Chest pain" },
    CatalogSymptom { id: "dizziness", label: "Dizziness" },
    CatalogSymptom { id: "fatigue", label: "Fatigue" },
    CatalogSymptom { id: "swelling", label: "Swelling in legs" },
];

/// Symptom logger input
pub struct SymptomLogForm;

impl SymptomLogForm {
    /// Build a request from checked symptom ids and notes.
    ///
    /// Labels come out in catalogue order whatever order the ids were
    /// checked in; an unknown id is a field error.
    pub fn validate<S: AsRef<str>>(
        selected: &[S],
        notes: &str,
    ) -> Result<SymptomAnalysisRequest, FormError> {
        if let Some(unknown) = selected
            .iter()
            .map(AsRef::as_ref)
            .find(|id| !COMMON_SYMPTOMS.iter().any(|s| s.id == *id))
        {
            return Err(FormError::Field(format!("Unknown symptom '{}'.", unknown)));
        }

        let symptoms: Vec<String> = COMMON_SYMPTOMS
            .iter()
            .filter(|s| selected.iter().any(|id| id.as_ref() == s.id))
            .map(|s| s.label.to_string())
            .collect();

        let request = SymptomAnalysisRequest::new(symptoms, notes);
        if request.is_empty() {
            return Err(FormError::Rejected(Notification::destructive(
                "Empty Log",
                "Please select at least one symptom or add a note.",
            )));
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_too_short() {
        let err = TermForm::validate("a").unwrap_err();
        assert_eq!(err.to_string(), "Term must be at least 2 characters.");
        assert!(err.notification().is_none());
        assert_eq!(TermForm::validate("BP").unwrap().term, "BP");
    }

    #[test]
    fn test_symptoms_in_catalogue_order() {
        let request = SymptomLogForm::validate(&["fatigue", "dizziness"], "").unwrap();
        assert_eq!(request.symptoms, vec!["Dizziness", "Fatigue"]);
    }

    #[test]
    fn test_empty_log_rejected() {
        let err = SymptomLogForm::validate::<&str>(&[], "   ").unwrap_err();
        let notification = err.notification().unwrap();
        assert_eq!(notification.title, "Empty Log");
        assert_eq!(
            notification.description,
            "Please select at least one symptom or add a note."
        );
    }

    #[test]
    fn test_notes_only_accepted() {
        let request = SymptomLogForm::validate::<&str>(&[], "after my morning walk").unwrap();
        assert!(request.symptoms.is_empty());
        assert_eq!(request.notes, "after my morning walk");
    }

    #[test]
    fn test_unknown_symptom() {
        let err = SymptomLogForm::validate(&["nausea"], "").unwrap_err();
        assert_eq!(err.to_string(), "Unknown symptom 'nausea'.");
    }
}
