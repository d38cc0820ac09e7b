use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;

use crate::adaptive::types::{SkillTreeState, StudentAbility};
use crate::constants::MAX_CAS_RETRIES;
use crate::store::keys;
use crate::store::{Store, StoreError};

impl Store {
    pub fn get_student_ability(&self, user_id: &str) -> Result<Option<StudentAbility>, StoreError> {
        let key = keys::student_ability_key(user_id)?;
        match self.student_abilities.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_student_ability(
        &self,
        user_id: &str,
        ability: &StudentAbility,
    ) -> Result<(), StoreError> {
        let key = keys::student_ability_key(user_id)?;
        self.student_abilities
            .insert(key.as_bytes(), Self::serialize(ability)?)?;
        Ok(())
    }

    pub fn get_skill_tree(&self, user_id: &str) -> Result<Option<SkillTreeState>, StoreError> {
        let key = keys::skill_tree_key(user_id)?;
        match self.skill_trees.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_skill_tree(&self, user_id: &str, tree: &SkillTreeState) -> Result<(), StoreError> {
        let key = keys::skill_tree_key(user_id)?;
        self.skill_trees
            .insert(key.as_bytes(), Self::serialize(tree)?)?;
        Ok(())
    }

    /// Read-modify-write of one ability snapshot. `f` receives the stored
    /// value (or `None`) and may run more than once if another writer races.
    pub fn update_student_ability<F>(
        &self,
        user_id: &str,
        mut f: F,
    ) -> Result<StudentAbility, StoreError>
    where
        F: FnMut(Option<StudentAbility>) -> StudentAbility,
    {
        let key = keys::student_ability_key(user_id)?;
        for attempt in 0..MAX_CAS_RETRIES {
            let current_raw = self.student_abilities.get(key.as_bytes())?;
            let current = match &current_raw {
                Some(raw) => Some(Self::deserialize::<StudentAbility>(raw)?),
                None => None,
            };
            let next = f(current);
            let next_bytes = Self::serialize(&next)?;

            match self.student_abilities.compare_and_swap(
                key.as_bytes(),
                current_raw.as_ref(),
                Some(next_bytes),
            )? {
                Ok(()) => return Ok(next),
                Err(_) => {
                    tracing::warn!(user_id, attempt, "Stale ability snapshot, retrying CAS");
                }
            }
        }
        Err(StoreError::Aborted {
            entity: "student_ability".to_string(),
            key: user_id.to_string(),
        })
    }

    /// Writes both snapshots of one answer event in a single transaction so
    /// a reader never sees an ability without its matching skill tree.
    pub fn save_student_snapshot(
        &self,
        user_id: &str,
        ability: &StudentAbility,
        tree: &SkillTreeState,
    ) -> Result<(), StoreError> {
        let ability_key = keys::student_ability_key(user_id)?;
        let tree_key = keys::skill_tree_key(user_id)?;
        let ability_bytes = Self::serialize(ability)?;
        let tree_bytes = Self::serialize(tree)?;

        (&self.student_abilities, &self.skill_trees)
            .transaction(|(abilities, trees)| {
                abilities.insert(ability_key.as_bytes(), ability_bytes.clone())?;
                trees.insert(tree_key.as_bytes(), tree_bytes.clone())?;
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(()) => StoreError::Aborted {
                    entity: "student_snapshot".to_string(),
                    key: user_id.to_string(),
                },
                TransactionError::Storage(e) => StoreError::Sled(e),
            })
    }

    pub fn delete_student(&self, user_id: &str) -> Result<(), StoreError> {
        let ability_key = keys::student_ability_key(user_id)?;
        let tree_key = keys::skill_tree_key(user_id)?;
        self.student_abilities.remove(ability_key.as_bytes())?;
        self.skill_trees.remove(tree_key.as_bytes())?;
        Ok(())
    }

    pub fn list_student_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        for item in self.student_abilities.iter() {
            let (key, _) = item?;
            match String::from_utf8(key.to_vec()) {
                Ok(id) => ids.push(id),
                Err(e) => tracing::warn!(error = %e, "Invalid UTF-8 in student ability key"),
            }
        }
        Ok(ids)
    }
}
