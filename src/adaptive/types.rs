use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Skill mastery assumed for a skill the student has never practiced.
pub const DEFAULT_MASTERY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAbility {
    pub overall_ability: f64,
    #[serde(default)]
    pub skill_mastery: BTreeMap<String, f64>,
    #[serde(default)]
    pub learning_velocity: BTreeMap<String, f64>,
    #[serde(default)]
    pub last_practice_date: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub total_questions_answered: u64,
    #[serde(default)]
    pub total_correct_answers: u64,
    pub updated_at: DateTime<Utc>,
}

impl StudentAbility {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            overall_ability: DEFAULT_MASTERY,
            skill_mastery: BTreeMap::new(),
            learning_velocity: BTreeMap::new(),
            last_practice_date: BTreeMap::new(),
            total_questions_answered: 0,
            total_correct_answers: 0,
            updated_at: now,
        }
    }

    pub fn mastery_of(&self, skill_id: &str) -> f64 {
        self.skill_mastery
            .get(skill_id)
            .copied()
            .unwrap_or(DEFAULT_MASTERY)
    }
}

impl Default for StudentAbility {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLabel {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// IRT calibration collected for a question. Every field is optional; the
/// IRT model substitutes its defaults for whatever is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveData {
    #[serde(default)]
    pub irt_difficulty: Option<f64>,
    #[serde(default)]
    pub irt_discrimination: Option<f64>,
    #[serde(default)]
    pub irt_guessing: Option<f64>,
    #[serde(default)]
    pub times_asked: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub difficulty: DifficultyLabel,
    #[serde(default)]
    pub skill_tags: Vec<String>,
    #[serde(default)]
    pub adaptive_data: Option<AdaptiveData>,
}

impl Question {
    pub fn times_asked(&self) -> u32 {
        self.adaptive_data
            .as_ref()
            .and_then(|d| d.times_asked)
            .unwrap_or(0)
    }

    pub fn is_tagged(&self, skill_id: &str) -> bool {
        self.skill_tags.iter().any(|tag| tag == skill_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockCriteria {
    pub min_questions: u32,
    /// Percentage in [0,100].
    pub min_accuracy: f64,
}

impl Default for UnlockCriteria {
    fn default() -> Self {
        Self {
            min_questions: 10,
            min_accuracy: 80.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub required_predecessors: Vec<String>,
    #[serde(default)]
    pub unlock_criteria: UnlockCriteria,
}

/// Ordered so that `max` implements the level ratchet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Locked,
    Learning,
    Mastered,
    Legendary,
}

impl SkillLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Learning => "learning",
            Self::Mastered => "mastered",
            Self::Legendary => "legendary",
        }
    }

    pub fn is_unlocked(&self) -> bool {
        *self != Self::Locked
    }

    pub fn is_mastered(&self) -> bool {
        matches!(self, Self::Mastered | Self::Legendary)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillProgress {
    pub skill_id: String,
    pub level: SkillLevel,
    pub mastery: f64,
    pub questions_completed: u32,
    pub questions_required: u32,
    pub accuracy: f64,
    #[serde(default)]
    pub unlocked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub mastered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_practice_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_time_spent_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillTreeState {
    pub user_id: String,
    pub skills: BTreeMap<String, SkillProgress>,
    pub updated_at: DateTime<Utc>,
}

impl SkillTreeState {
    pub fn level_of(&self, skill_id: &str) -> Option<SkillLevel> {
        self.skills.get(skill_id).map(|p| p.level)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvent {
    pub question_id: String,
    pub is_correct: bool,
    pub time_spent_secs: f64,
    #[serde(default = "default_expected_time")]
    pub expected_time_secs: f64,
    #[serde(default = "Utc::now")]
    pub answered_at: DateTime<Utc>,
}

fn default_expected_time() -> f64 {
    crate::constants::DEFAULT_EXPECTED_TIME_SECS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSelection {
    pub question: Question,
    pub reason: String,
    pub expected_difficulty: f64,
    pub expected_success_probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub probability_score: f64,
    pub difficulty_score: f64,
    pub skill_priority_score: f64,
    pub frequency_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredQuestion {
    pub question: Question,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub difficulty: f64,
    pub success_probability: f64,
}
