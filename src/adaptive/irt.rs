//! 三参数 Logistic（3PL）项目反应模型。

use crate::adaptive::config::IrtConfig;
use crate::adaptive::types::{DifficultyLabel, Question};

/// Resolved item parameters for one question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemParams {
    pub difficulty: f64,
    pub discrimination: f64,
    pub guessing: f64,
}

impl ItemParams {
    pub fn from_question(question: &Question, config: &IrtConfig) -> Self {
        let data = question.adaptive_data.as_ref();
        Self {
            difficulty: data
                .and_then(|d| d.irt_difficulty)
                .unwrap_or_else(|| label_difficulty(question.difficulty, config)),
            discrimination: data
                .and_then(|d| d.irt_discrimination)
                .unwrap_or(config.default_discrimination),
            guessing: data
                .and_then(|d| d.irt_guessing)
                .unwrap_or(config.default_guessing),
        }
    }

    pub fn probability(&self, ability: f64) -> f64 {
        probability(ability, self.difficulty, self.discrimination, self.guessing)
    }
}

pub fn label_difficulty(label: DifficultyLabel, config: &IrtConfig) -> f64 {
    match label {
        DifficultyLabel::Easy => config.easy_difficulty,
        DifficultyLabel::Medium => config.medium_difficulty,
        DifficultyLabel::Hard => config.hard_difficulty,
    }
}

/// `P = c + (1 - c) / (1 + e^(-a(θ - b)))`, clamped to [0,1].
pub fn probability(ability: f64, difficulty: f64, discrimination: f64, guessing: f64) -> f64 {
    let logistic = 1.0 / (1.0 + (-discrimination * (ability - difficulty)).exp());
    (guessing + (1.0 - guessing) * logistic).clamp(0.0, 1.0)
}
