//! Survey Response Repository
//!
//! Answers are stored as a JSON document per response.

use rusqlite::params;

use crate::domain::survey::Answers;
use crate::domain::{DomainError, DomainResult, SurveyResponse};
use super::db::{require, SharedConnection};

#[derive(Clone)]
pub struct SurveyRepository {
    conn: SharedConnection,
}

impl SurveyRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    pub async fn save_response(&self, response: &SurveyResponse) -> DomainResult<SurveyResponse> {
        let answers = serde_json::to_string(&response.answers)
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        conn.execute(
            "INSERT INTO survey_responses (survey_id, answers, submitted_at) VALUES (?, ?, ?)",
            params![response.survey_id, answers, response.submitted_at],
        )
        .map_err(|e| DomainError::Storage(e.to_string()))?;

        let mut saved = response.clone();
        saved.id = conn.last_insert_rowid() as u32;
        Ok(saved)
    }

    pub async fn list_for_survey(&self, survey_id: &str) -> DomainResult<Vec<SurveyResponse>> {
        let guard = self.conn.lock().await;
        let conn = require(&guard)?;

        let mut stmt = conn
            .prepare(
                "SELECT id, survey_id, answers, submitted_at FROM survey_responses
                 WHERE survey_id = ? ORDER BY submitted_at ASC, id ASC",
            )
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let mut rows = stmt
            .query(params![survey_id])
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        let map = |e: rusqlite::Error| DomainError::Storage(e.to_string());
        let mut responses = Vec::new();
        while let Some(row) = rows.next().map_err(map)? {
            let raw: String = row.get(2).map_err(map)?;
            let answers: Answers = match serde_json::from_str(&raw) {
                Ok(answers) => answers,
                Err(e) => {
                    let id: u32 = row.get(0).map_err(map)?;
                    log::warn!("Skipping unreadable survey response {}: {}", id, e);
                    continue;
                }
            };
            responses.push(SurveyResponse {
                id: row.get(0).map_err(map)?,
                survey_id: row.get(1).map_err(map)?,
                answers,
                submitted_at: row.get(3).map_err(map)?,
            });
        }
        Ok(responses)
    }
}
