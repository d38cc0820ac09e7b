use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrtConfig {
    pub default_discrimination: f64,
    pub default_guessing: f64,
    pub easy_difficulty: f64,
    pub medium_difficulty: f64,
    pub hard_difficulty: f64,
}

impl Default for IrtConfig {
    fn default() -> Self {
        Self {
            default_discrimination: 1.0,
            default_guessing: 0.25,
            easy_difficulty: 0.3,
            medium_difficulty: 0.5,
            hard_difficulty: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityConfig {
    pub learning_rate: f64,
    /// Multiplier applied to the learning increment for fast correct answers.
    pub fast_answer_bonus: f64,
    /// Answers faster than `expected_time * fast_answer_ratio` earn the bonus.
    pub fast_answer_ratio: f64,
    pub incorrect_penalty_scale: f64,
    /// Per-day exponent of the forgetting curve `exp(-rate * days)`.
    pub forgetting_rate: f64,
    /// Weight of the previous velocity in the EMA.
    pub velocity_momentum: f64,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.15,
            fast_answer_bonus: 1.2,
            fast_answer_ratio: 0.8,
            incorrect_penalty_scale: 0.5,
            forgetting_rate: 0.05,
            velocity_momentum: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorConfig {
    pub probability_weight: f64,
    pub difficulty_weight: f64,
    pub skill_priority_weight: f64,
    pub frequency_weight: f64,
    /// Success probability the selector steers towards.
    pub target_success: f64,
    /// Offset above overall ability that defines the optimal difficulty.
    pub zpd_offset: f64,
    pub frequency_decay: f64,
    pub needs_practice_threshold: f64,
    pub confidence_threshold: f64,
    pub challenge_threshold: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            probability_weight: 0.4,
            difficulty_weight: 0.2,
            skill_priority_weight: 0.3,
            frequency_weight: 0.1,
            target_success: 0.7,
            zpd_offset: 0.1,
            frequency_decay: 0.1,
            needs_practice_threshold: 0.7,
            confidence_threshold: 0.8,
            challenge_threshold: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressConfig {
    pub correct_mastery_step: f64,
    pub incorrect_mastery_step: f64,
    pub legendary_accuracy: f64,
    pub legendary_min_questions: u32,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            correct_mastery_step: 0.02,
            incorrect_mastery_step: 0.01,
            legendary_accuracy: 95.0,
            legendary_min_questions: 50,
        }
    }
}

/// One row of the spaced-repetition table: mastery below `upper_bound`
/// (and at or above the previous row's bound) reviews after `days`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInterval {
    pub upper_bound: f64,
    pub days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewConfig {
    pub intervals: Vec<ReviewInterval>,
    /// Interval for mastery at or above the last bound.
    pub max_interval_days: i64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            intervals: vec![
                ReviewInterval { upper_bound: 0.3, days: 1 },
                ReviewInterval { upper_bound: 0.5, days: 3 },
                ReviewInterval { upper_bound: 0.7, days: 7 },
                ReviewInterval { upper_bound: 0.85, days: 14 },
            ],
            max_interval_days: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default)]
    pub irt: IrtConfig,
    #[serde(default)]
    pub ability: AbilityConfig,
    #[serde(default)]
    pub selector: SelectorConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub review: ReviewConfig,
}

impl EngineConfig {
    pub fn from_env(env_config: &crate::config::EngineEnvConfig) -> Self {
        Self::default().with_env_overrides(env_config)
    }

    /// Parses a JSON config file body; env overrides win over file values.
    pub fn from_json(
        raw: &str,
        env_config: &crate::config::EngineEnvConfig,
    ) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(raw)?;
        Ok(config.with_env_overrides(env_config))
    }

    fn with_env_overrides(mut self, env_config: &crate::config::EngineEnvConfig) -> Self {
        if let Some(target) = env_config.selector_target_success {
            self.selector.target_success = target;
        }
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        // IrtConfig
        if self.irt.default_discrimination <= 0.0 {
            return Err("irt.default_discrimination must be > 0".to_string());
        }
        if !(0.0..1.0).contains(&self.irt.default_guessing) {
            return Err("irt.default_guessing must be in [0,1)".to_string());
        }
        for (name, value) in [
            ("irt.easy_difficulty", self.irt.easy_difficulty),
            ("irt.medium_difficulty", self.irt.medium_difficulty),
            ("irt.hard_difficulty", self.irt.hard_difficulty),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} must be in [0,1]"));
            }
        }
        if !(self.irt.easy_difficulty <= self.irt.medium_difficulty
            && self.irt.medium_difficulty <= self.irt.hard_difficulty)
        {
            return Err("irt difficulties must be ordered easy <= medium <= hard".to_string());
        }

        // AbilityConfig
        if !(0.0..=1.0).contains(&self.ability.learning_rate) {
            return Err("ability.learning_rate must be in [0,1]".to_string());
        }
        if self.ability.fast_answer_bonus < 1.0 {
            return Err("ability.fast_answer_bonus must be >= 1".to_string());
        }
        if self.ability.fast_answer_ratio <= 0.0 {
            return Err("ability.fast_answer_ratio must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.ability.incorrect_penalty_scale) {
            return Err("ability.incorrect_penalty_scale must be in [0,1]".to_string());
        }
        if self.ability.forgetting_rate < 0.0 {
            return Err("ability.forgetting_rate must be >= 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.ability.velocity_momentum) {
            return Err("ability.velocity_momentum must be in [0,1]".to_string());
        }

        // SelectorConfig
        let s = &self.selector;
        if s.probability_weight < 0.0
            || s.difficulty_weight < 0.0
            || s.skill_priority_weight < 0.0
            || s.frequency_weight < 0.0
        {
            return Err("selector weights must be >= 0".to_string());
        }
        let weight_sum =
            s.probability_weight + s.difficulty_weight + s.skill_priority_weight + s.frequency_weight;
        if (weight_sum - 1.0).abs() > 0.01 {
            return Err(format!(
                "selector weights should sum to ~1.0 (got {weight_sum:.3})"
            ));
        }
        if !(0.0..=1.0).contains(&s.target_success) {
            return Err("selector.target_success must be in [0,1]".to_string());
        }
        if !(0.0..=1.0).contains(&s.zpd_offset) {
            return Err("selector.zpd_offset must be in [0,1]".to_string());
        }
        if s.frequency_decay < 0.0 {
            return Err("selector.frequency_decay must be >= 0".to_string());
        }
        if !(0.0..=1.0).contains(&s.needs_practice_threshold)
            || !(0.0..=1.0).contains(&s.confidence_threshold)
            || !(0.0..=1.0).contains(&s.challenge_threshold)
        {
            return Err("invalid selector reason thresholds".to_string());
        }
        if s.challenge_threshold > s.confidence_threshold {
            return Err(
                "selector.challenge_threshold must be <= selector.confidence_threshold".to_string(),
            );
        }

        // ProgressConfig
        if !(0.0..=1.0).contains(&self.progress.correct_mastery_step) {
            return Err("progress.correct_mastery_step must be in [0,1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.progress.incorrect_mastery_step) {
            return Err("progress.incorrect_mastery_step must be in [0,1]".to_string());
        }
        if !(0.0..=100.0).contains(&self.progress.legendary_accuracy) {
            return Err("progress.legendary_accuracy must be in [0,100]".to_string());
        }

        // ReviewConfig
        if self.review.intervals.is_empty() {
            return Err("review.intervals must not be empty".to_string());
        }
        let mut prev_bound = 0.0;
        let mut prev_days = 0;
        for row in &self.review.intervals {
            if row.upper_bound <= prev_bound || row.upper_bound > 1.0 {
                return Err("review.intervals bounds must be ascending within (0,1]".to_string());
            }
            if row.days < 1 || row.days < prev_days {
                return Err("review.intervals days must be >= 1 and non-decreasing".to_string());
            }
            prev_bound = row.upper_bound;
            prev_days = row.days;
        }
        if self.review.max_interval_days < prev_days {
            return Err("review.max_interval_days must be >= the last interval".to_string());
        }

        Ok(())
    }
}
