//! Replay of a recorded practice session through the engine.

use std::collections::HashMap;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::adaptive::catalog::SkillCatalog;
use crate::adaptive::engine::AdaptiveEngine;
use crate::adaptive::progress::{self, TreeSummary, UnlockCandidate};
use crate::adaptive::review::DueReview;
use crate::adaptive::types::{AnswerEvent, Question, QuestionSelection, Skill, StudentAbility};
use crate::constants::DEFAULT_PREVIEW_SIZE;
use crate::error::EngineError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub user_id: String,
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub answers: Vec<AnswerEvent>,
    #[serde(default)]
    pub target_skill: Option<String>,
    /// Reference date for review scheduling; defaults to the last answer's date.
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub user_id: String,
    pub answers_processed: usize,
    pub ability: StudentAbility,
    pub summary: TreeSummary,
    pub unlocked: Vec<String>,
    pub mastered: Vec<String>,
    pub next_question: Option<QuestionSelection>,
    pub preview: Vec<QuestionSelection>,
    pub due_reviews: Vec<DueReview>,
    pub unlockable_next: Vec<UnlockCandidate>,
}

impl Scenario {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn catalog(&self) -> Result<SkillCatalog, EngineError> {
        Ok(SkillCatalog::new(self.skills.clone())?)
    }

    fn reference_date(&self) -> NaiveDate {
        self.today
            .or_else(|| self.answers.last().map(|a| a.answered_at.date_naive()))
            .unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// Feeds every answer through `engine` in order and reports the final state.
/// Answers referring to a question missing from the scenario are rejected
/// before anything is written.
pub async fn run(engine: &AdaptiveEngine, scenario: &Scenario) -> Result<ScenarioReport, EngineError> {
    let questions: HashMap<&str, &Question> = scenario
        .questions
        .iter()
        .map(|q| (q.id.as_str(), q))
        .collect();

    let resolved = scenario
        .answers
        .iter()
        .map(|event| {
            questions
                .get(event.question_id.as_str())
                .map(|question| (*question, event))
                .ok_or_else(|| EngineError::UnknownQuestion(event.question_id.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let user_id = scenario.user_id.as_str();
    let mut unlocked = Vec::new();
    let mut mastered = Vec::new();

    for (question, event) in resolved {
        let outcome = engine.process_answer(user_id, question, event).await?;
        unlocked.extend(outcome.newly_unlocked);
        mastered.extend(outcome.newly_mastered);
    }

    let today = scenario.reference_date();
    let target = scenario.target_skill.as_deref();
    let (ability, tree) = engine.load_student(user_id, Utc::now())?;

    let report = ScenarioReport {
        user_id: scenario.user_id.clone(),
        answers_processed: scenario.answers.len(),
        summary: progress::summarize(&tree),
        unlockable_next: progress::unlockable_next(&tree, engine.catalog()),
        next_question: engine
            .next_question(user_id, &scenario.questions, target)
            .await?,
        preview: engine
            .preview(user_id, &scenario.questions, target, DEFAULT_PREVIEW_SIZE)
            .await?,
        due_reviews: engine.due_reviews(user_id, today).await?,
        ability,
        unlocked,
        mastered,
    };

    tracing::info!(
        user_id,
        answers = report.answers_processed,
        overall_ability = report.ability.overall_ability,
        completion = report.summary.completion_percent,
        "Scenario replayed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::tempdir;

    use super::*;
    use crate::adaptive::config::EngineConfig;
    use crate::store::Store;

    const SCENARIO: &str = r#"{
        "userId": "learner-1",
        "skills": [
            {"id": "math-arithmetic", "name": "Arithmetic", "category": "math",
             "unlockCriteria": {"minQuestions": 2, "minAccuracy": 50}},
            {"id": "math-algebra", "name": "Algebra", "category": "math",
             "requiredPredecessors": ["math-arithmetic"]}
        ],
        "questions": [
            {"id": "q1", "subject": "math", "difficulty": "easy", "skillTags": ["math-arithmetic"]},
            {"id": "q2", "subject": "math", "difficulty": "hard", "skillTags": ["math-algebra"]}
        ],
        "answers": [
            {"questionId": "q1", "isCorrect": true, "timeSpentSecs": 20, "expectedTimeSecs": 60,
             "answeredAt": "2024-06-01T10:00:00Z"},
            {"questionId": "q1", "isCorrect": true, "timeSpentSecs": 30,
             "answeredAt": "2024-06-01T10:05:00Z"}
        ]
    }"#;

    fn engine_for(scenario: &Scenario, dir: &Path) -> AdaptiveEngine {
        let store = Arc::new(Store::open(dir.join("db").to_str().unwrap()).unwrap());
        AdaptiveEngine::new(EngineConfig::default(), scenario.catalog().unwrap(), store).unwrap()
    }

    #[tokio::test]
    async fn replay_unlocks_successor() {
        let dir = tempdir().unwrap();
        let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        let engine = engine_for(&scenario, dir.path());

        let report = run(&engine, &scenario).await.unwrap();
        assert_eq!(report.answers_processed, 2);
        assert_eq!(report.ability.total_questions_answered, 2);
        assert_eq!(report.ability.total_correct_answers, 2);
        assert_eq!(report.mastered, vec!["math-arithmetic".to_string()]);
        assert_eq!(report.unlocked, vec!["math-algebra".to_string()]);
        assert!(report.next_question.is_some());
        assert_eq!(report.preview.len(), 2);
    }

    #[tokio::test]
    async fn unknown_question_is_rejected_before_writes() {
        let dir = tempdir().unwrap();
        let mut scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        scenario.answers[1].question_id = "missing".to_string();
        let engine = engine_for(&scenario, dir.path());

        let err = run(&engine, &scenario).await.unwrap_err();
        assert!(matches!(err, EngineError::UnknownQuestion(id) if id == "missing"));
        let (ability, _) = engine.load_student("learner-1", Utc::now()).unwrap();
        assert_eq!(ability.total_questions_answered, 0);
    }

    #[tokio::test]
    async fn load_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        tokio::fs::write(&path, SCENARIO).await.unwrap();

        let scenario = Scenario::load(&path).await.unwrap();
        assert_eq!(scenario.user_id, "learner-1");
        assert_eq!(scenario.answers[1].expected_time_secs, 60.0);
        assert_eq!(
            scenario.reference_date(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
    }
}
