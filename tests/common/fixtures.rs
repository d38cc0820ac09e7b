use std::sync::Arc;

use tempfile::TempDir;

use adaptive_engine::adaptive::catalog::SkillCatalog;
use adaptive_engine::adaptive::config::EngineConfig;
use adaptive_engine::adaptive::engine::AdaptiveEngine;
use adaptive_engine::adaptive::types::{
    AdaptiveData, DifficultyLabel, Question, Skill, UnlockCriteria,
};
use adaptive_engine::store::Store;

pub fn skill(id: &str, predecessors: &[&str], min_questions: u32, min_accuracy: f64) -> Skill {
    Skill {
        id: id.to_string(),
        name: id.replace('-', " "),
        category: id.split('-').next().unwrap_or("general").to_string(),
        required_predecessors: predecessors.iter().map(|p| p.to_string()).collect(),
        unlock_criteria: UnlockCriteria {
            min_questions,
            min_accuracy,
        },
    }
}

/// arithmetic -> algebra -> geometry, plus an independent reading root.
pub fn math_catalog() -> SkillCatalog {
    SkillCatalog::new(vec![
        skill("math-arithmetic", &[], 2, 50.0),
        skill("math-algebra", &["math-arithmetic"], 2, 50.0),
        skill("math-geometry", &["math-algebra"], 10, 80.0),
        skill("reading-main-ideas", &[], 10, 80.0),
    ])
    .expect("valid catalog")
}

pub fn question(id: &str, label: DifficultyLabel, tags: &[&str]) -> Question {
    Question {
        id: id.to_string(),
        subject: Some("math".to_string()),
        difficulty: label,
        skill_tags: tags.iter().map(|t| t.to_string()).collect(),
        adaptive_data: None,
    }
}

pub fn calibrated(id: &str, difficulty: f64, discrimination: f64, guessing: f64, tags: &[&str]) -> Question {
    Question {
        adaptive_data: Some(AdaptiveData {
            irt_difficulty: Some(difficulty),
            irt_discrimination: Some(discrimination),
            irt_guessing: Some(guessing),
            times_asked: Some(0),
        }),
        ..question(id, DifficultyLabel::Medium, tags)
    }
}

pub fn open_engine(catalog: SkillCatalog) -> (TempDir, Arc<Store>, AdaptiveEngine) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("engine.sled");
    let store = Arc::new(Store::open(path.to_str().expect("utf8 path")).expect("open store"));
    let engine = AdaptiveEngine::new(EngineConfig::default(), catalog, store.clone())
        .expect("engine");
    (dir, store, engine)
}
