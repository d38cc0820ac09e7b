//! 知识追踪式掌握度更新，叠加指数遗忘曲线

use chrono::{DateTime, Utc};

use crate::adaptive::config::AbilityConfig;
use crate::adaptive::types::{Question, StudentAbility, DEFAULT_MASTERY};

pub const READING_FALLBACK_SKILL: &str = "reading-main-ideas";
pub const WRITING_FALLBACK_SKILL: &str = "writing-grammar";
pub const MATH_FALLBACK_SKILL: &str = "math-algebra-basics";
pub const GENERAL_FALLBACK_SKILL: &str = "strategy-time-management";

/// Skills an answer to `question` counts towards: its tags, or one skill
/// inferred from the subject when the question is untagged.
pub fn relevant_skills(question: &Question) -> Vec<String> {
    if !question.skill_tags.is_empty() {
        let mut skills: Vec<String> = Vec::with_capacity(question.skill_tags.len());
        for tag in &question.skill_tags {
            if !skills.contains(tag) {
                skills.push(tag.clone());
            }
        }
        return skills;
    }
    vec![infer_skill(question.subject.as_deref()).to_string()]
}

pub fn infer_skill(subject: Option<&str>) -> &'static str {
    let subject = subject.unwrap_or_default().to_ascii_lowercase();
    if subject.contains("reading") {
        READING_FALLBACK_SKILL
    } else if subject.contains("writing") {
        WRITING_FALLBACK_SKILL
    } else if subject.contains("math") {
        MATH_FALLBACK_SKILL
    } else {
        GENERAL_FALLBACK_SKILL
    }
}

pub fn forgetting_factor(days_since: i64, config: &AbilityConfig) -> f64 {
    if days_since <= 0 {
        return 1.0;
    }
    (-config.forgetting_rate * days_since as f64).exp()
}

/// Whole days elapsed, never negative.
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_days().max(0)
}

/// Mastery after a single correct or incorrect observation, before forgetting.
pub fn learn_step(
    current: f64,
    is_correct: bool,
    time_spent: f64,
    expected_time: f64,
    config: &AbilityConfig,
) -> f64 {
    let rate = config.learning_rate;
    if is_correct {
        let time_bonus = if time_spent < config.fast_answer_ratio * expected_time {
            config.fast_answer_bonus
        } else {
            1.0
        };
        (current + rate * (1.0 - current) * time_bonus).min(1.0)
    } else {
        (current - rate * current * config.incorrect_penalty_scale).max(0.0)
    }
}

pub fn update(
    ability: &StudentAbility,
    question: &Question,
    is_correct: bool,
    time_spent: f64,
    expected_time: f64,
    now: DateTime<Utc>,
) -> StudentAbility {
    update_with(
        ability,
        question,
        is_correct,
        time_spent,
        expected_time,
        now,
        &AbilityConfig::default(),
    )
}

pub fn update_with(
    ability: &StudentAbility,
    question: &Question,
    is_correct: bool,
    time_spent: f64,
    expected_time: f64,
    now: DateTime<Utc>,
    config: &AbilityConfig,
) -> StudentAbility {
    let mut next = ability.clone();

    for skill_id in relevant_skills(question) {
        let current = next.mastery_of(&skill_id);
        let mut mastery = learn_step(current, is_correct, time_spent, expected_time, config);

        if let Some(last) = next.last_practice_date.get(&skill_id) {
            mastery *= forgetting_factor(days_between(*last, now), config);
        }
        let mastery = mastery.clamp(0.0, 1.0);

        let old_velocity = next
            .learning_velocity
            .get(&skill_id)
            .copied()
            .unwrap_or(0.0);
        let velocity = config.velocity_momentum * old_velocity
            + (1.0 - config.velocity_momentum) * (mastery - current);

        tracing::debug!(
            skill_id = %skill_id,
            before = current,
            after = mastery,
            velocity,
            is_correct,
            "Skill mastery updated"
        );

        next.skill_mastery.insert(skill_id.clone(), mastery);
        next.learning_velocity.insert(skill_id.clone(), velocity);
        next.last_practice_date.insert(skill_id, now);
    }

    next.overall_ability = overall_ability(&next);
    next.total_questions_answered += 1;
    if is_correct {
        next.total_correct_answers += 1;
    }
    next.updated_at = now;
    next
}

/// Arithmetic mean over every skill present; a student without any
/// recorded skill sits at the default mastery.
pub fn overall_ability(ability: &StudentAbility) -> f64 {
    if ability.skill_mastery.is_empty() {
        return DEFAULT_MASTERY;
    }
    let sum: f64 = ability.skill_mastery.values().sum();
    (sum / ability.skill_mastery.len() as f64).clamp(0.0, 1.0)
}

/// Current mastery of a skill with forgetting applied up to `now`, without
/// recording a practice event.
pub fn decayed_mastery(
    ability: &StudentAbility,
    skill_id: &str,
    now: DateTime<Utc>,
    config: &AbilityConfig,
) -> f64 {
    let mastery = ability.mastery_of(skill_id);
    match ability.last_practice_date.get(skill_id) {
        Some(last) => mastery * forgetting_factor(days_between(*last, now), config),
        None => mastery,
    }
}
