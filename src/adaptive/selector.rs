//! 选题评分模块：按学生能力为候选题打分，选出下一题并给出选择理由

use std::cmp::Ordering;

use crate::adaptive::config::{EngineConfig, SelectorConfig};
use crate::adaptive::irt::ItemParams;
use crate::adaptive::types::{
    Question, QuestionSelection, ScoreBreakdown, ScoredQuestion, StudentAbility,
};

fn score_desc(a: &ScoredQuestion, b: &ScoredQuestion) -> Ordering {
    b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
}

pub fn optimal_difficulty(ability: &StudentAbility, config: &SelectorConfig) -> f64 {
    (ability.overall_ability + config.zpd_offset).min(1.0)
}

/// Mean mastery over the question's tagged skills; untagged questions use
/// the overall ability as a proxy.
fn tagged_mastery(question: &Question, ability: &StudentAbility) -> f64 {
    if question.skill_tags.is_empty() {
        return ability.overall_ability;
    }
    let sum: f64 = question
        .skill_tags
        .iter()
        .map(|tag| ability.mastery_of(tag))
        .sum();
    sum / question.skill_tags.len() as f64
}

pub fn score_question(
    question: &Question,
    ability: &StudentAbility,
    config: &EngineConfig,
) -> ScoredQuestion {
    let sc = &config.selector;
    let params = ItemParams::from_question(question, &config.irt);
    let success_probability = params.probability(ability.overall_ability);
    let optimal = optimal_difficulty(ability, sc);

    let breakdown = ScoreBreakdown {
        probability_score: (1.0 - (success_probability - sc.target_success).abs()).clamp(0.0, 1.0),
        difficulty_score: (1.0 - (params.difficulty - optimal).abs()).clamp(0.0, 1.0),
        skill_priority_score: (1.0 - tagged_mastery(question, ability)).clamp(0.0, 1.0),
        frequency_score: 1.0 / (1.0 + question.times_asked() as f64 * sc.frequency_decay),
    };

    let score = sc.probability_weight * breakdown.probability_score
        + sc.difficulty_weight * breakdown.difficulty_score
        + sc.skill_priority_weight * breakdown.skill_priority_score
        + sc.frequency_weight * breakdown.frequency_score;

    ScoredQuestion {
        question: question.clone(),
        score,
        breakdown,
        difficulty: params.difficulty,
        success_probability,
    }
}

/// Restricts the pool to questions tagged with `target_skill`, keeping the
/// full pool when nothing matches.
fn filter_by_target<'a>(candidates: &'a [Question], target_skill: Option<&str>) -> Vec<&'a Question> {
    let Some(target) = target_skill else {
        return candidates.iter().collect();
    };
    let filtered: Vec<&Question> = candidates.iter().filter(|q| q.is_tagged(target)).collect();
    if filtered.is_empty() {
        tracing::warn!(
            target_skill = target,
            candidates = candidates.len(),
            "No candidate tagged with target skill, using full pool"
        );
        return candidates.iter().collect();
    }
    filtered
}

/// Every candidate with its score, best first. Equal scores keep input order.
pub fn rank(
    candidates: &[Question],
    ability: &StudentAbility,
    target_skill: Option<&str>,
    config: &EngineConfig,
) -> Vec<ScoredQuestion> {
    let mut scored: Vec<ScoredQuestion> = filter_by_target(candidates, target_skill)
        .into_iter()
        .map(|q| score_question(q, ability, config))
        .collect();
    scored.sort_by(score_desc);
    scored
}

pub fn select(
    candidates: &[Question],
    ability: &StudentAbility,
    target_skill: Option<&str>,
) -> Option<QuestionSelection> {
    select_with(candidates, ability, target_skill, &EngineConfig::default())
}

pub fn select_with(
    candidates: &[Question],
    ability: &StudentAbility,
    target_skill: Option<&str>,
    config: &EngineConfig,
) -> Option<QuestionSelection> {
    let mut best: Option<ScoredQuestion> = None;
    for question in filter_by_target(candidates, target_skill) {
        let scored = score_question(question, ability, config);
        let is_better = match &best {
            Some(current) => scored.score > current.score,
            None => true,
        };
        if is_better {
            best = Some(scored);
        }
    }

    let best = best?;
    let reason = explain(&best, &config.selector);
    tracing::debug!(
        question_id = %best.question.id,
        score = best.score,
        success_probability = best.success_probability,
        "Question selected"
    );

    Some(QuestionSelection {
        question: best.question,
        reason,
        expected_difficulty: best.difficulty,
        expected_success_probability: best.success_probability,
    })
}

/// Top `count` questions in rank order.
pub fn select_batch(
    candidates: &[Question],
    ability: &StudentAbility,
    target_skill: Option<&str>,
    count: usize,
    config: &EngineConfig,
) -> Vec<QuestionSelection> {
    let mut ranked = rank(candidates, ability, target_skill, config);
    ranked.truncate(count);
    ranked
        .into_iter()
        .map(|scored| {
            let reason = explain(&scored, &config.selector);
            QuestionSelection {
                expected_difficulty: scored.difficulty,
                expected_success_probability: scored.success_probability,
                question: scored.question,
                reason,
            }
        })
        .collect()
}

pub fn explain(scored: &ScoredQuestion, config: &SelectorConfig) -> String {
    let percent = (scored.success_probability * 100.0).round();
    if scored.breakdown.skill_priority_score > config.needs_practice_threshold {
        let skills = if scored.question.skill_tags.is_empty() {
            "core skills".to_string()
        } else {
            scored.question.skill_tags.join(", ")
        };
        format!("Focuses on {skills}, which needs practice")
    } else if scored.success_probability > config.confidence_threshold {
        format!("Confidence building: {percent}% expected success")
    } else if scored.success_probability < config.challenge_threshold {
        format!("Challenge question to stretch your ability ({percent}% expected success)")
    } else {
        format!("Optimal match for your current ability ({percent}% expected success)")
    }
}
