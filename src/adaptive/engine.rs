use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::adaptive::catalog::SkillCatalog;
use crate::adaptive::config::EngineConfig;
use crate::adaptive::progress::{self, TreeSummary};
use crate::adaptive::review::{self, DueReview};
use crate::adaptive::types::*;
use crate::adaptive::{ability, selector};
use crate::constants::MAX_IDLE_USER_LOCKS;
use crate::error::EngineError;
use crate::store::Store;

/// Facade that loads a student's snapshots, applies the pure update rules and
/// persists the result. Answers for one student are serialized through a
/// per-student lock; different students proceed in parallel.
pub struct AdaptiveEngine {
    config: Arc<RwLock<EngineConfig>>,
    catalog: Arc<SkillCatalog>,
    store: Arc<Store>,
    user_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub ability: StudentAbility,
    pub skill_tree: SkillTreeState,
    pub summary: TreeSummary,
    pub newly_unlocked: Vec<String>,
    pub newly_mastered: Vec<String>,
}

impl AdaptiveEngine {
    pub fn new(
        config: EngineConfig,
        catalog: SkillCatalog,
        store: Arc<Store>,
    ) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::Config)?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            catalog: Arc::new(catalog),
            store,
            user_locks: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub async fn reload_config(&self, new_config: EngineConfig) -> Result<(), EngineError> {
        new_config.validate().map_err(EngineError::Config)?;
        let mut cfg = self.config.write().await;
        *cfg = new_config;
        tracing::info!("Engine config reloaded");
        Ok(())
    }

    pub async fn get_config(&self) -> EngineConfig {
        self.config.read().await.clone()
    }

    pub fn catalog(&self) -> &SkillCatalog {
        &self.catalog
    }

    async fn acquire_user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;

        // A strong count of 1 means only the map holds the lock.
        if locks.len() > MAX_IDLE_USER_LOCKS {
            locks.retain(|_, v| Arc::strong_count(v) > 1);
        }

        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Current snapshots for a student, seeding fresh ones on first contact.
    pub fn load_student(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(StudentAbility, SkillTreeState), EngineError> {
        let ability = self
            .store
            .get_student_ability(user_id)?
            .unwrap_or_else(|| StudentAbility::new(now));
        let tree = match self.store.get_skill_tree(user_id)? {
            Some(tree) => tree,
            None => {
                tracing::info!(user_id, skills = self.catalog.len(), "Seeding skill tree");
                progress::initialize(user_id, &self.catalog, now)
            }
        };
        Ok((ability, tree))
    }

    pub async fn process_answer(
        &self,
        user_id: &str,
        question: &Question,
        event: &AnswerEvent,
    ) -> Result<AnswerOutcome, EngineError> {
        if event.question_id != question.id {
            tracing::warn!(
                user_id,
                event_question = %event.question_id,
                question = %question.id,
                "Answer event refers to a different question id"
            );
            return Err(EngineError::UnknownQuestion(event.question_id.clone()));
        }

        let user_lock = self.acquire_user_lock(user_id).await;
        let _guard = user_lock.lock().await;

        let config = self.config.read().await.clone();
        let now = event.answered_at;

        let (current_ability, current_tree) = self.load_student(user_id, now)?;

        let next_ability = ability::update_with(
            &current_ability,
            question,
            event.is_correct,
            event.time_spent_secs,
            event.expected_time_secs,
            now,
            &config.ability,
        );
        let next_tree = progress::record_question(
            &current_tree,
            &self.catalog,
            question,
            event.is_correct,
            event.time_spent_secs,
            event.expected_time_secs,
            now,
            &config.progress,
        );

        let (newly_unlocked, newly_mastered) = level_changes(&current_tree, &next_tree);

        self.store
            .save_student_snapshot(user_id, &next_ability, &next_tree)?;

        tracing::info!(
            user_id,
            question_id = %question.id,
            is_correct = event.is_correct,
            overall_ability = next_ability.overall_ability,
            unlocked = newly_unlocked.len(),
            mastered = newly_mastered.len(),
            "Answer processed"
        );

        Ok(AnswerOutcome {
            summary: progress::summarize(&next_tree),
            ability: next_ability,
            skill_tree: next_tree,
            newly_unlocked,
            newly_mastered,
        })
    }

    pub async fn next_question(
        &self,
        user_id: &str,
        candidates: &[Question],
        target_skill: Option<&str>,
    ) -> Result<Option<QuestionSelection>, EngineError> {
        let config = self.config.read().await.clone();
        let (ability, _) = self.load_student(user_id, Utc::now())?;
        Ok(selector::select_with(candidates, &ability, target_skill, &config))
    }

    /// Top `count` candidates in rank order, each with its explanation.
    pub async fn preview(
        &self,
        user_id: &str,
        candidates: &[Question],
        target_skill: Option<&str>,
        count: usize,
    ) -> Result<Vec<QuestionSelection>, EngineError> {
        let config = self.config.read().await.clone();
        let (ability, _) = self.load_student(user_id, Utc::now())?;
        Ok(selector::select_batch(
            candidates,
            &ability,
            target_skill,
            count,
            &config,
        ))
    }

    pub async fn review_date(
        &self,
        user_id: &str,
        skill_id: &str,
        today: NaiveDate,
    ) -> Result<NaiveDate, EngineError> {
        let config = self.config.read().await.clone();
        let (ability, _) = self.load_student(user_id, Utc::now())?;
        let last_review = ability
            .last_practice_date
            .get(skill_id)
            .map(|at| at.date_naive());
        Ok(review::schedule_review_with(
            ability.mastery_of(skill_id),
            last_review,
            today,
            &config.review,
        ))
    }

    pub async fn due_reviews(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<DueReview>, EngineError> {
        let config = self.config.read().await.clone();
        let (ability, _) = self.load_student(user_id, Utc::now())?;
        Ok(review::due_skills(&ability, today, &config.review))
    }

    pub async fn reset_student(&self, user_id: &str) -> Result<(), EngineError> {
        let user_lock = self.acquire_user_lock(user_id).await;
        let _guard = user_lock.lock().await;
        self.store.delete_student(user_id)?;
        tracing::info!(user_id, "Student state reset");
        Ok(())
    }
}

/// Skills that left `locked`, and skills that reached mastery, between two
/// snapshots of the same tree.
fn level_changes(before: &SkillTreeState, after: &SkillTreeState) -> (Vec<String>, Vec<String>) {
    let mut unlocked = Vec::new();
    let mut mastered = Vec::new();
    for (skill_id, progress) in &after.skills {
        let previous = before.level_of(skill_id).unwrap_or(SkillLevel::Locked);
        if !previous.is_unlocked() && progress.level.is_unlocked() {
            unlocked.push(skill_id.clone());
        }
        if !previous.is_mastered() && progress.level.is_mastered() {
            mastered.push(skill_id.clone());
        }
    }
    (unlocked, mastered)
}
