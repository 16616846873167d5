//! Commands for the URAI survey
//!
//! Definitions are supplied by the caller; only responses are stored.

use crate::domain::survey::{self, Answers, SurveySession, ValidationIssue};
use crate::domain::{SurveyDefinition, SurveyResponse, SurveySummary};
use crate::AppState;

fn describe(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.question_id, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate every step and store the response
pub async fn submit_survey(
    state: &AppState,
    definition: &SurveyDefinition,
    answers: Answers,
) -> Result<SurveyResponse, String> {
    let mut session = SurveySession::new(definition.clone());
    for (question_id, answer) in answers {
        session.answer(&question_id, answer);
    }
    let response = session.submit().map_err(|issues| describe(&issues))?;

    let saved = state
        .surveys
        .save_response(&response)
        .await
        .map_err(|e| e.to_string())?;
    state.notifier.success("Thanks for your feedback");
    Ok(saved)
}

/// Admin dashboard aggregation
pub async fn survey_summary(
    state: &AppState,
    definition: &SurveyDefinition,
) -> Result<SurveySummary, String> {
    let responses = state
        .surveys
        .list_for_survey(&definition.id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(survey::aggregate(definition, &responses))
}

/// Parse a definition stored as JSON
pub fn load_definition(json: &str) -> Result<SurveyDefinition, String> {
    survey::parse_definition(json).map_err(|e| e.to_string())
}
