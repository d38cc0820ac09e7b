//! Validated, read-only skill graph.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adaptive::types::Skill;

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("duplicate skill id: {0}")]
    DuplicateSkill(String),
    #[error("skill {skill} requires unknown predecessor {predecessor}")]
    UnknownPredecessor { skill: String, predecessor: String },
    #[error("prerequisite cycle through skill {0}")]
    Cycle(String),
    #[error("invalid unlock criteria for skill {skill}: {message}")]
    InvalidCriteria { skill: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Skill>", into = "Vec<Skill>")]
pub struct SkillCatalog {
    skills: Vec<Skill>,
    index: HashMap<String, usize>,
}

impl SkillCatalog {
    pub fn new(skills: Vec<Skill>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(skills.len());
        for (i, skill) in skills.iter().enumerate() {
            if index.insert(skill.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateSkill(skill.id.clone()));
            }
        }
        let catalog = Self { skills, index };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        for skill in &self.skills {
            if !(0.0..=100.0).contains(&skill.unlock_criteria.min_accuracy) {
                return Err(CatalogError::InvalidCriteria {
                    skill: skill.id.clone(),
                    message: "minAccuracy must be in [0,100]".to_string(),
                });
            }
            for predecessor in &skill.required_predecessors {
                if !self.index.contains_key(predecessor) {
                    return Err(CatalogError::UnknownPredecessor {
                        skill: skill.id.clone(),
                        predecessor: predecessor.clone(),
                    });
                }
            }
        }
        self.check_acyclic()
    }

    /// Iterative three-color DFS over the predecessor edges.
    fn check_acyclic(&self) -> Result<(), CatalogError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.skills.len()];
        for start in 0..self.skills.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            marks[start] = Mark::InProgress;
            while let Some(top) = stack.last_mut() {
                let node = top.0;
                let preds = &self.skills[node].required_predecessors;
                if top.1 < preds.len() {
                    let next = self.index[&preds[top.1]];
                    top.1 += 1;
                    match marks[next] {
                        Mark::InProgress => {
                            return Err(CatalogError::Cycle(self.skills[next].id.clone()))
                        }
                        Mark::Unvisited => {
                            marks[next] = Mark::InProgress;
                            stack.push((next, 0));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, skill_id: &str) -> Option<&Skill> {
        self.index.get(skill_id).map(|&i| &self.skills[i])
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl TryFrom<Vec<Skill>> for SkillCatalog {
    type Error = CatalogError;

    fn try_from(skills: Vec<Skill>) -> Result<Self, Self::Error> {
        Self::new(skills)
    }
}

impl From<SkillCatalog> for Vec<Skill> {
    fn from(catalog: SkillCatalog) -> Self {
        catalog.skills
    }
}
