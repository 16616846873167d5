//! Survey Entities
//!
//! Multi-step URAI survey: definition, answers, step validation,
//! a navigation session and the admin aggregation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use super::entity::{DomainError, DomainResult, Entity};

/// Free-text samples kept per question in a summary
pub const TEXT_SAMPLE_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice { options: Vec<String> },
    MultiChoice { options: Vec<String> },
    Scale { min: u8, max: u8 },
    FreeText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub required: bool,
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyStep {
    pub title: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyDefinition {
    pub id: String,
    pub title: String,
    pub steps: Vec<SurveyStep>,
}

impl SurveyDefinition {
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.steps.iter().flat_map(|s| s.questions.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Choice(String),
    Choices(Vec<String>),
    Scale(u8),
    Text(String),
}

/// question id -> answer
pub type Answers = BTreeMap<String, Answer>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: u32,
    pub survey_id: String,
    pub answers: Answers,
    /// ms since epoch
    pub submitted_at: i64,
}

impl Entity for SurveyResponse {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub question_id: String,
    pub message: String,
}

fn issue(q: &Question, message: &str) -> ValidationIssue {
    ValidationIssue {
        question_id: q.id.clone(),
        message: message.to_string(),
    }
}

fn check_answer(q: &Question, answer: Option<&Answer>) -> Option<ValidationIssue> {
    let Some(answer) = answer else {
        return q.required.then(|| issue(q, "Answer required"));
    };

    match (&q.kind, answer) {
        (QuestionKind::SingleChoice { options }, Answer::Choice(c)) => {
            (!options.contains(c)).then(|| issue(q, "Unknown option"))
        }
        (QuestionKind::MultiChoice { options }, Answer::Choices(cs)) => {
            if cs.iter().any(|c| !options.contains(c)) {
                Some(issue(q, "Unknown option"))
            } else if q.required && cs.is_empty() {
                Some(issue(q, "Answer required"))
            } else {
                None
            }
        }
        (QuestionKind::Scale { min, max }, Answer::Scale(v)) => {
            (v < min || v > max).then(|| issue(q, "Value out of range"))
        }
        (QuestionKind::FreeText, Answer::Text(t)) => {
            (q.required && t.trim().is_empty()).then(|| issue(q, "Answer required"))
        }
        _ => Some(issue(q, "Answer does not match question type")),
    }
}

/// Validate the answers belonging to one step
pub fn validate_step(step: &SurveyStep, answers: &Answers) -> Vec<ValidationIssue> {
    step.questions
        .iter()
        .filter_map(|q| check_answer(q, answers.get(&q.id)))
        .collect()
}

/// Multi-step form navigation
#[derive(Debug, Clone)]
pub struct SurveySession {
    definition: SurveyDefinition,
    current_step: usize,
    answers: Answers,
}

impl SurveySession {
    pub fn new(definition: SurveyDefinition) -> Self {
        Self {
            definition,
            current_step: 0,
            answers: Answers::new(),
        }
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn step_count(&self) -> usize {
        self.definition.steps.len()
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step + 1 >= self.step_count()
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn answer(&mut self, question_id: &str, answer: Answer) {
        self.answers.insert(question_id.to_string(), answer);
    }

    pub fn clear_answer(&mut self, question_id: &str) {
        self.answers.remove(question_id);
    }

    /// Advance when the current step validates
    pub fn next(&mut self) -> Result<usize, Vec<ValidationIssue>> {
        if let Some(step) = self.definition.steps.get(self.current_step) {
            let issues = validate_step(step, &self.answers);
            if !issues.is_empty() {
                return Err(issues);
            }
        }
        if !self.is_last_step() {
            self.current_step += 1;
        }
        Ok(self.current_step)
    }

    pub fn back(&mut self) -> usize {
        self.current_step = self.current_step.saturating_sub(1);
        self.current_step
    }

    /// Validate every step and build the response.
    /// On failure the session jumps to the first invalid step.
    pub fn submit(&mut self) -> Result<SurveyResponse, Vec<ValidationIssue>> {
        for (index, step) in self.definition.steps.iter().enumerate() {
            let issues = validate_step(step, &self.answers);
            if !issues.is_empty() {
                self.current_step = index;
                return Err(issues);
            }
        }

        // Drop answers to questions the definition doesn't know
        let known: Vec<&str> = self.definition.questions().map(|q| q.id.as_str()).collect();
        let answers = self
            .answers
            .iter()
            .filter(|(id, _)| known.contains(&id.as_str()))
            .map(|(id, a)| (id.clone(), a.clone()))
            .collect();

        Ok(SurveyResponse {
            id: 0,
            survey_id: self.definition.id.clone(),
            answers,
            submitted_at: chrono::Utc::now().timestamp_millis(),
        })
    }
}

// ========================
// Aggregation
// ========================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionSummary {
    /// Option label -> count, in definition order
    Choices { counts: Vec<(String, u32)> },
    Scale {
        count: u32,
        mean: Option<f64>,
        /// count per value from min to max
        histogram: Vec<(u8, u32)>,
    },
    Text { count: u32, latest: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub question_id: String,
    pub prompt: String,
    pub answered: u32,
    pub summary: QuestionSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveySummary {
    pub survey_id: String,
    pub responses: u32,
    pub questions: Vec<SummaryRow>,
}

/// Tally responses per question for the admin dashboard.
/// Responses to other surveys and answers of the wrong shape are skipped.
pub fn aggregate(definition: &SurveyDefinition, responses: &[SurveyResponse]) -> SurveySummary {
    let mut relevant: Vec<&SurveyResponse> = responses
        .iter()
        .filter(|r| r.survey_id == definition.id)
        .collect();
    relevant.sort_by_key(|r| std::cmp::Reverse(r.submitted_at));

    let questions = definition
        .questions()
        .map(|q| summarize(q, &relevant))
        .collect();

    SurveySummary {
        survey_id: definition.id.clone(),
        responses: relevant.len() as u32,
        questions,
    }
}

fn summarize(q: &Question, responses: &[&SurveyResponse]) -> SummaryRow {
    let answers: Vec<&Answer> = responses.iter().filter_map(|r| r.answers.get(&q.id)).collect();
    let mut answered = 0u32;

    let summary = match &q.kind {
        QuestionKind::SingleChoice { options } | QuestionKind::MultiChoice { options } => {
            let mut counts: Vec<(String, u32)> = options.iter().map(|o| (o.clone(), 0)).collect();
            let mut bump = |choice: &str| {
                if let Some(slot) = counts.iter_mut().find(|(o, _)| o == choice) {
                    slot.1 += 1;
                }
            };
            for answer in &answers {
                match answer {
                    Answer::Choice(c) => {
                        answered += 1;
                        bump(c.as_str());
                    }
                    Answer::Choices(cs) => {
                        answered += 1;
                        cs.iter().for_each(|c| bump(c.as_str()));
                    }
                    _ => {}
                }
            }
            QuestionSummary::Choices { counts }
        }
        QuestionKind::Scale { min, max } => {
            let mut histogram: Vec<(u8, u32)> = (*min..=*max).map(|v| (v, 0)).collect();
            let mut total = 0u64;
            for answer in &answers {
                if let Answer::Scale(v) = answer {
                    if let Some(slot) = histogram.iter_mut().find(|(value, _)| value == v) {
                        slot.1 += 1;
                        answered += 1;
                        total += *v as u64;
                    }
                }
            }
            let mean = (answered > 0).then(|| total as f64 / answered as f64);
            QuestionSummary::Scale {
                count: answered,
                mean,
                histogram,
            }
        }
        QuestionKind::FreeText => {
            let mut latest = Vec::new();
            for answer in &answers {
                if let Answer::Text(t) = answer {
                    if t.trim().is_empty() {
                        continue;
                    }
                    answered += 1;
                    if latest.len() < TEXT_SAMPLE_LIMIT {
                        latest.push(t.clone());
                    }
                }
            }
            QuestionSummary::Text {
                count: answered,
                latest,
            }
        }
    };

    SummaryRow {
        question_id: q.id.clone(),
        prompt: q.prompt.clone(),
        answered,
        summary,
    }
}

/// Parse a survey definition from JSON (as stored by the admin tool)
pub fn parse_definition(json: &str) -> DomainResult<SurveyDefinition> {
    let def: SurveyDefinition =
        serde_json::from_str(json).map_err(|e| DomainError::InvalidInput(e.to_string()))?;
    if def.steps.is_empty() {
        return Err(DomainError::InvalidInput("Survey has no steps".to_string()));
    }
    Ok(def)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition() -> SurveyDefinition {
        SurveyDefinition {
            id: "urai-1".to_string(),
            title: "Onboarding".to_string(),
            steps: vec![
                SurveyStep {
                    title: "About you".to_string(),
                    questions: vec![Question {
                        id: "role".to_string(),
                        prompt: "Your role".to_string(),
                        required: true,
                        kind: QuestionKind::SingleChoice {
                            options: vec!["design".to_string(), "eng".to_string()],
                        },
                    }],
                },
                SurveyStep {
                    title: "Feedback".to_string(),
                    questions: vec![
                        Question {
                            id: "score".to_string(),
                            prompt: "Score".to_string(),
                            required: true,
                            kind: QuestionKind::Scale { min: 1, max: 5 },
                        },
                        Question {
                            id: "notes".to_string(),
                            prompt: "Notes".to_string(),
                            required: false,
                            kind: QuestionKind::FreeText,
                        },
                    ],
                },
            ],
        }
    }

    fn response(role: &str, score: u8, at: i64) -> SurveyResponse {
        let mut answers = Answers::new();
        answers.insert("role".to_string(), Answer::Choice(role.to_string()));
        answers.insert("score".to_string(), Answer::Scale(score));
        SurveyResponse {
            id: 0,
            survey_id: "urai-1".to_string(),
            answers,
            submitted_at: at,
        }
    }

    #[test]
    fn test_required_step_blocks_next() {
        let mut session = SurveySession::new(definition());
        let issues = session.next().unwrap_err();
        assert_eq!(issues[0].question_id, "role");
        assert_eq!(session.current_step(), 0);

        session.answer("role", Answer::Choice("eng".to_string()));
        assert_eq!(session.next(), Ok(1));
        assert!(session.is_last_step());
        assert_eq!(session.back(), 0);
    }

    #[test]
    fn test_wrong_shape_and_range() {
        let def = definition();
        let mut answers = Answers::new();
        answers.insert("score".to_string(), Answer::Scale(9));
        answers.insert("notes".to_string(), Answer::Choice("x".to_string()));
        let issues = validate_step(&def.steps[1], &answers);
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_submit_jumps_to_invalid_step() {
        let mut session = SurveySession::new(definition());
        session.answer("role", Answer::Choice("design".to_string()));
        session.next().unwrap();
        session.back();
        assert!(session.submit().is_err());
        assert_eq!(session.current_step(), 1);

        session.answer("score", Answer::Scale(4));
        session.answer("stray", Answer::Text("ignored".to_string()));
        let response = session.submit().unwrap();
        assert_eq!(response.answers.len(), 2);
        assert_eq!(response.survey_id, "urai-1");
    }

    #[test]
    fn test_aggregate() {
        let def = definition();
        let mut with_note = response("eng", 2, 30);
        with_note
            .answers
            .insert("notes".to_string(), Answer::Text("more dark mode".to_string()));
        let mut other = response("eng", 5, 40);
        other.survey_id = "other".to_string();
        let responses = vec![response("design", 4, 10), with_note, other];

        let summary = aggregate(&def, &responses);
        assert_eq!(summary.responses, 2);

        assert_eq!(
            summary.questions[0].summary,
            QuestionSummary::Choices {
                counts: vec![("design".to_string(), 1), ("eng".to_string(), 1)]
            }
        );
        match &summary.questions[1].summary {
            QuestionSummary::Scale { count, mean, histogram } => {
                assert_eq!(*count, 2);
                assert_eq!(*mean, Some(3.0));
                assert_eq!(histogram[1], (2, 1));
                assert_eq!(histogram[3], (4, 1));
            }
            other => panic!("unexpected summary {:?}", other),
        }
        assert_eq!(
            summary.questions[2].summary,
            QuestionSummary::Text {
                count: 1,
                latest: vec!["more dark mode".to_string()]
            }
        );
    }

    #[test]
    fn test_parse_definition() {
        let json = r#"{"id":"s","title":"t","steps":[{"title":"a","questions":[
            {"id":"q","prompt":"p","kind":{"type":"scale","min":1,"max":3}}]}]}"#;
        let def = parse_definition(json).unwrap();
        assert_eq!(def.questions().count(), 1);
        assert!(!def.steps[0].questions[0].required);
        assert!(parse_definition(r#"{"id":"s","title":"t","steps":[]}"#).is_err());
    }
}
