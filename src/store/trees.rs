pub const STUDENT_ABILITIES: &str = "student_abilities";
pub const SKILL_TREES: &str = "skill_trees";
