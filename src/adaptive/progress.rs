//! 技能树状态机：locked -> learning -> mastered -> legendary
//!
//! 等级只升不降。所有前置技能达到 mastered 后才解锁；每次作答只执行一次解锁扫描，
//! 且以扫描开始时的技能树为准，新解锁的技能不会在同一事件内继续解锁下游技能。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::adaptive::ability::relevant_skills;
use crate::adaptive::catalog::SkillCatalog;
use crate::adaptive::config::ProgressConfig;
use crate::adaptive::types::{
    Question, SkillLevel, SkillProgress, SkillTreeState, UnlockCriteria,
};

pub fn initialize(user_id: &str, catalog: &SkillCatalog, now: DateTime<Utc>) -> SkillTreeState {
    let skills = catalog
        .skills()
        .iter()
        .map(|skill| {
            let unlocked = skill.required_predecessors.is_empty();
            let progress = SkillProgress {
                skill_id: skill.id.clone(),
                level: if unlocked {
                    SkillLevel::Learning
                } else {
                    SkillLevel::Locked
                },
                mastery: 0.0,
                questions_completed: 0,
                questions_required: skill.unlock_criteria.min_questions,
                accuracy: 0.0,
                unlocked_at: unlocked.then_some(now),
                mastered_at: None,
                last_practice_date: None,
                total_time_spent_secs: 0.0,
            };
            (skill.id.clone(), progress)
        })
        .collect();

    SkillTreeState {
        user_id: user_id.to_string(),
        skills,
        updated_at: now,
    }
}

/// Level implied by the counters alone, before the ratchet is applied.
pub fn compute_level(
    progress: &SkillProgress,
    criteria: &UnlockCriteria,
    config: &ProgressConfig,
) -> SkillLevel {
    if progress.accuracy >= config.legendary_accuracy
        && progress.questions_completed >= config.legendary_min_questions
    {
        SkillLevel::Legendary
    } else if progress.accuracy >= criteria.min_accuracy
        && progress.questions_completed >= criteria.min_questions
    {
        SkillLevel::Mastered
    } else if progress.level.is_unlocked() {
        SkillLevel::Learning
    } else {
        SkillLevel::Locked
    }
}

pub fn record_answer(
    tree: &SkillTreeState,
    catalog: &SkillCatalog,
    skill_id: &str,
    is_correct: bool,
    time_spent: f64,
    expected_time: f64,
    now: DateTime<Utc>,
) -> SkillTreeState {
    record_answer_with(
        tree,
        catalog,
        skill_id,
        is_correct,
        time_spent,
        expected_time,
        now,
        &ProgressConfig::default(),
    )
}

#[allow(clippy::too_many_arguments)]
pub fn record_answer_with(
    tree: &SkillTreeState,
    catalog: &SkillCatalog,
    skill_id: &str,
    is_correct: bool,
    time_spent: f64,
    _expected_time: f64,
    now: DateTime<Utc>,
    config: &ProgressConfig,
) -> SkillTreeState {
    match tree.level_of(skill_id) {
        Some(level) if level.is_unlocked() => {}
        _ => return tree.clone(),
    }

    let mut next = tree.clone();
    apply_answer(&mut next, catalog, skill_id, is_correct, time_spent, now, config);
    unlock_ready(&mut next, catalog, now);
    next.updated_at = now;
    next
}

/// 单个技能的计数、准确率、掌握度与等级更新，不触发解锁扫描。
fn apply_answer(
    tree: &mut SkillTreeState,
    catalog: &SkillCatalog,
    skill_id: &str,
    is_correct: bool,
    time_spent: f64,
    now: DateTime<Utc>,
    config: &ProgressConfig,
) {
    let user_id = tree.user_id.clone();
    let Some(progress) = tree.skills.get_mut(skill_id) else {
        return;
    };

    progress.questions_completed += 1;
    let score = if is_correct { 100.0 } else { 0.0 };
    let n = progress.questions_completed as f64;
    progress.accuracy = ((progress.accuracy * (n - 1.0) + score) / n).clamp(0.0, 100.0);
    progress.mastery = if is_correct {
        progress.mastery + config.correct_mastery_step
    } else {
        progress.mastery - config.incorrect_mastery_step
    }
    .clamp(0.0, 1.0);
    progress.last_practice_date = Some(now);
    progress.total_time_spent_secs += time_spent.max(0.0);

    let criteria = catalog
        .get(skill_id)
        .map(|s| s.unlock_criteria.clone())
        .unwrap_or(UnlockCriteria {
            min_questions: progress.questions_required,
            ..UnlockCriteria::default()
        });
    let previous = progress.level;
    progress.level = previous.max(compute_level(progress, &criteria, config));
    if progress.level.is_mastered() && progress.mastered_at.is_none() {
        progress.mastered_at = Some(now);
    }
    if progress.level != previous {
        tracing::info!(
            user_id = %user_id,
            skill_id,
            from = previous.as_str(),
            to = progress.level.as_str(),
            "Skill level advanced"
        );
    }
}

/// Applies one answer to every skill the question counts towards.
///
/// 只有作答前已解锁的标签计入本次作答；所有标签更新完成后统一执行一次解锁扫描。
#[allow(clippy::too_many_arguments)]
pub fn record_question(
    tree: &SkillTreeState,
    catalog: &SkillCatalog,
    question: &Question,
    is_correct: bool,
    time_spent: f64,
    _expected_time: f64,
    now: DateTime<Utc>,
    config: &ProgressConfig,
) -> SkillTreeState {
    let credited: Vec<String> = relevant_skills(question)
        .into_iter()
        .filter(|id| tree.level_of(id).is_some_and(|level| level.is_unlocked()))
        .collect();
    if credited.is_empty() {
        return tree.clone();
    }

    let mut next = tree.clone();
    for skill_id in &credited {
        apply_answer(&mut next, catalog, skill_id, is_correct, time_spent, now, config);
    }
    unlock_ready(&mut next, catalog, now);
    next.updated_at = now;
    next
}

fn predecessors_mastered(tree: &SkillTreeState, predecessors: &[String]) -> bool {
    predecessors
        .iter()
        .all(|id| tree.level_of(id).is_some_and(|level| level.is_mastered()))
}

/// Single unlock pass. Returns the ids that moved to `learning`.
pub fn unlock_ready(
    tree: &mut SkillTreeState,
    catalog: &SkillCatalog,
    now: DateTime<Utc>,
) -> Vec<String> {
    let view: &SkillTreeState = tree;
    let ready: Vec<String> = view
        .skills
        .values()
        .filter(|p| p.level == SkillLevel::Locked)
        .filter_map(|p| catalog.get(&p.skill_id))
        .filter(|skill| predecessors_mastered(view, &skill.required_predecessors))
        .map(|skill| skill.id.clone())
        .collect();

    for skill_id in &ready {
        if let Some(progress) = tree.skills.get_mut(skill_id) {
            progress.level = SkillLevel::Learning;
            progress.unlocked_at.get_or_insert(now);
            tracing::info!(user_id = %tree.user_id, skill_id = %skill_id, "Skill unlocked");
        }
    }
    ready
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSummary {
    pub total: usize,
    pub locked: usize,
    pub learning: usize,
    pub mastered: usize,
    pub legendary: usize,
    /// Share of skills at mastered or above, in [0,100].
    pub completion_percent: f64,
    pub average_mastery: f64,
}

pub fn summarize(tree: &SkillTreeState) -> TreeSummary {
    let mut counts: BTreeMap<SkillLevel, usize> = BTreeMap::new();
    let mut mastery_sum = 0.0;
    for progress in tree.skills.values() {
        *counts.entry(progress.level).or_default() += 1;
        mastery_sum += progress.mastery;
    }
    let count = |level: SkillLevel| counts.get(&level).copied().unwrap_or(0);
    let total = tree.skills.len();
    let mastered = count(SkillLevel::Mastered);
    let legendary = count(SkillLevel::Legendary);

    TreeSummary {
        total,
        locked: count(SkillLevel::Locked),
        learning: count(SkillLevel::Learning),
        mastered,
        legendary,
        completion_percent: if total == 0 {
            0.0
        } else {
            (mastered + legendary) as f64 / total as f64 * 100.0
        },
        average_mastery: if total == 0 {
            0.0
        } else {
            mastery_sum / total as f64
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockCandidate {
    pub skill_id: String,
    /// Predecessors still short of mastery.
    pub remaining: Vec<String>,
}

/// Locked skills whose predecessors are all at least unlocked, fewest
/// outstanding predecessors first.
pub fn unlockable_next(tree: &SkillTreeState, catalog: &SkillCatalog) -> Vec<UnlockCandidate> {
    let mut out: Vec<UnlockCandidate> = tree
        .skills
        .values()
        .filter(|p| p.level == SkillLevel::Locked)
        .filter_map(|p| catalog.get(&p.skill_id))
        .filter(|skill| {
            skill
                .required_predecessors
                .iter()
                .all(|id| tree.level_of(id).is_some_and(|l| l.is_unlocked()))
        })
        .map(|skill| UnlockCandidate {
            skill_id: skill.id.clone(),
            remaining: skill
                .required_predecessors
                .iter()
                .filter(|id| !tree.level_of(id).is_some_and(|l| l.is_mastered()))
                .cloned()
                .collect(),
        })
        .collect();
    out.sort_by(|a, b| {
        a.remaining
            .len()
            .cmp(&b.remaining.len())
            .then_with(|| a.skill_id.cmp(&b.skill_id))
    });
    out
}
