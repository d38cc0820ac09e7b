mod common;

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use adaptive_engine::adaptive::catalog::SkillCatalog;
use adaptive_engine::adaptive::config::EngineConfig;
use adaptive_engine::adaptive::types::{AnswerEvent, DifficultyLabel, SkillLevel};
use adaptive_engine::error::EngineError;

use common::fixtures::{math_catalog, open_engine, question, skill};

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, 9, 0, 0).unwrap()
}

fn answer(question_id: &str, is_correct: bool, time_spent: f64, answered_at: DateTime<Utc>) -> AnswerEvent {
    AnswerEvent {
        question_id: question_id.to_string(),
        is_correct,
        time_spent_secs: time_spent,
        expected_time_secs: 60.0,
        answered_at,
    }
}

#[tokio::test]
async fn fast_correct_answer_updates_and_persists() {
    let (_dir, store, engine) = open_engine(math_catalog());
    let q = question("q1", DifficultyLabel::Easy, &["math-arithmetic"]);

    let outcome = engine
        .process_answer("student-1", &q, &answer("q1", true, 30.0, at(1)))
        .await
        .unwrap();

    assert!((outcome.ability.skill_mastery["math-arithmetic"] - 0.59).abs() < 1e-9);
    assert_eq!(outcome.ability.total_questions_answered, 1);
    assert_eq!(outcome.ability.total_correct_answers, 1);
    assert_eq!(outcome.ability.last_practice_date["math-arithmetic"], at(1));

    let progress = &outcome.skill_tree.skills["math-arithmetic"];
    assert_eq!(progress.questions_completed, 1);
    assert_eq!(progress.accuracy, 100.0);
    assert!((progress.mastery - 0.02).abs() < 1e-12);

    assert_eq!(store.get_student_ability("student-1").unwrap(), Some(outcome.ability));
    assert_eq!(store.get_skill_tree("student-1").unwrap(), Some(outcome.skill_tree));
}

#[tokio::test]
async fn mastering_a_skill_unlocks_its_successor_only() {
    let (_dir, _store, engine) = open_engine(math_catalog());
    let q = question("q1", DifficultyLabel::Easy, &["math-arithmetic"]);

    let first = engine
        .process_answer("student-1", &q, &answer("q1", true, 40.0, at(1)))
        .await
        .unwrap();
    assert!(first.newly_unlocked.is_empty());
    assert!(first.newly_mastered.is_empty());

    let second = engine
        .process_answer("student-1", &q, &answer("q1", true, 40.0, at(1)))
        .await
        .unwrap();
    assert_eq!(second.newly_mastered, vec!["math-arithmetic".to_string()]);
    assert_eq!(second.newly_unlocked, vec!["math-algebra".to_string()]);

    let tree = &second.skill_tree;
    assert_eq!(tree.level_of("math-arithmetic"), Some(SkillLevel::Mastered));
    assert_eq!(tree.level_of("math-algebra"), Some(SkillLevel::Learning));
    assert_eq!(tree.level_of("math-geometry"), Some(SkillLevel::Locked));
    assert_eq!(tree.skills["math-arithmetic"].mastered_at, Some(at(1)));
    assert_eq!(second.summary.mastered, 1);
}

#[tokio::test]
async fn answers_on_locked_skills_leave_the_tree_untouched() {
    let (_dir, _store, engine) = open_engine(math_catalog());
    let q = question("q-geo", DifficultyLabel::Hard, &["math-geometry"]);

    let outcome = engine
        .process_answer("student-1", &q, &answer("q-geo", true, 10.0, at(1)))
        .await
        .unwrap();

    let geometry = &outcome.skill_tree.skills["math-geometry"];
    assert_eq!(geometry.level, SkillLevel::Locked);
    assert_eq!(geometry.questions_completed, 0);
    // Ability tracking is independent of the tree.
    assert_eq!(outcome.ability.total_questions_answered, 1);
    assert!(outcome.ability.skill_mastery.contains_key("math-geometry"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_answers_for_one_student_are_serialized() {
    let (_dir, store, engine) = open_engine(math_catalog());
    let engine = Arc::new(engine);
    let q = question("q1", DifficultyLabel::Medium, &["math-arithmetic"]);

    let mut handles = Vec::new();
    for i in 0..16 {
        let engine = engine.clone();
        let q = q.clone();
        handles.push(tokio::spawn(async move {
            engine
                .process_answer("student-1", &q, &answer("q1", i % 2 == 0, 50.0, at(1)))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let ability = store.get_student_ability("student-1").unwrap().unwrap();
    assert_eq!(ability.total_questions_answered, 16);
    assert_eq!(ability.total_correct_answers, 8);
    let tree = store.get_skill_tree("student-1").unwrap().unwrap();
    assert_eq!(tree.skills["math-arithmetic"].questions_completed, 16);
}

#[tokio::test]
async fn next_question_falls_back_when_target_matches_nothing() {
    let (_dir, _store, engine) = open_engine(math_catalog());
    let candidates = vec![
        question("easy", DifficultyLabel::Easy, &["math-arithmetic"]),
        question("hard", DifficultyLabel::Hard, &["math-algebra"]),
    ];

    let targeted = engine
        .next_question("student-1", &candidates, Some("math-algebra"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(targeted.question.id, "hard");

    let fallback = engine
        .next_question("student-1", &candidates, Some("no-such-skill"))
        .await
        .unwrap();
    assert!(fallback.is_some());

    let none = engine.next_question("student-1", &[], None).await.unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn review_dates_follow_mastery() {
    let (_dir, _store, engine) = open_engine(math_catalog());
    let q = question("q1", DifficultyLabel::Easy, &["math-arithmetic"]);
    engine
        .process_answer("student-1", &q, &answer("q1", true, 30.0, at(1)))
        .await
        .unwrap();

    // Mastery 0.59 maps to a 7-day interval, capped by a review two days ago.
    let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    let date = engine
        .review_date("student-1", "math-arithmetic", today)
        .await
        .unwrap();
    assert_eq!(date, today + Duration::days(3));

    // Never-practiced skill sits at the default 0.5 with no history.
    let date = engine
        .review_date("student-1", "reading-main-ideas", today)
        .await
        .unwrap();
    assert_eq!(date, today + Duration::days(7));

    let due = engine
        .due_reviews("student-1", NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
        .await
        .unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].skill_id, "math-arithmetic");
    assert_eq!(due[0].days_overdue, 2);
}

#[tokio::test]
async fn invalid_config_reload_is_rejected() {
    let (_dir, _store, engine) = open_engine(math_catalog());

    let mut bad = EngineConfig::default();
    bad.selector.difficulty_weight = 2.0;
    let err = engine.reload_config(bad).await.unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
    assert_eq!(engine.get_config().await.selector.difficulty_weight, 0.2);

    let mut good = EngineConfig::default();
    good.selector.target_success = 0.65;
    engine.reload_config(good).await.unwrap();
    assert_eq!(engine.get_config().await.selector.target_success, 0.65);
}

#[tokio::test]
async fn reset_student_clears_state() {
    let (_dir, store, engine) = open_engine(math_catalog());
    let q = question("q1", DifficultyLabel::Easy, &["math-arithmetic"]);
    engine
        .process_answer("student-1", &q, &answer("q1", true, 30.0, at(1)))
        .await
        .unwrap();

    engine.reset_student("student-1").await.unwrap();
    assert!(store.get_student_ability("student-1").unwrap().is_none());

    let (ability, tree) = engine.load_student("student-1", at(2)).unwrap();
    assert_eq!(ability.total_questions_answered, 0);
    assert_eq!(tree.level_of("math-arithmetic"), Some(SkillLevel::Learning));
}

#[tokio::test]
async fn invalid_user_id_surfaces_store_error() {
    let (_dir, _store, engine) = open_engine(math_catalog());
    let q = question("q1", DifficultyLabel::Easy, &["math-arithmetic"]);
    let err = engine
        .process_answer("", &q, &answer("q1", true, 30.0, at(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
}

#[tokio::test]
async fn multi_tag_answer_unlocks_one_hop_only() {
    let catalog = SkillCatalog::new(vec![
        skill("math-a", &[], 1, 50.0),
        skill("math-b", &["math-a"], 1, 50.0),
        skill("math-c", &["math-b"], 1, 50.0),
    ])
    .unwrap();
    let (_dir, store, engine) = open_engine(catalog);
    let q = question("q-ab", DifficultyLabel::Medium, &["math-a", "math-b"]);

    let outcome = engine
        .process_answer("student-1", &q, &answer("q-ab", true, 20.0, at(1)))
        .await
        .unwrap();

    assert_eq!(outcome.newly_mastered, vec!["math-a".to_string()]);
    assert_eq!(outcome.newly_unlocked, vec!["math-b".to_string()]);

    let tree = store.get_skill_tree("student-1").unwrap().unwrap();
    assert_eq!(tree.level_of("math-b"), Some(SkillLevel::Learning));
    assert_eq!(tree.skills["math-b"].questions_completed, 0);
    assert_eq!(tree.level_of("math-c"), Some(SkillLevel::Locked));
}

#[tokio::test]
async fn mismatched_question_id_is_rejected_without_writes() {
    let (_dir, store, engine) = open_engine(math_catalog());
    let q = question("q1", DifficultyLabel::Easy, &["math-arithmetic"]);

    let err = engine
        .process_answer("student-1", &q, &answer("q2", true, 30.0, at(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownQuestion(id) if id == "q2"));
    assert!(store.get_student_ability("student-1").unwrap().is_none());
    assert!(store.get_skill_tree("student-1").unwrap().is_none());
}
