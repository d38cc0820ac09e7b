use crate::store::StoreError;

fn validate_id(entity: &str, id: &str) -> Result<(), StoreError> {
    if id.is_empty() || id.contains(':') {
        return Err(StoreError::Validation(format!(
            "invalid {entity} id '{id}': must be non-empty and contain no ':'"
        )));
    }
    Ok(())
}

pub fn student_ability_key(user_id: &str) -> Result<String, StoreError> {
    validate_id("user", user_id)?;
    Ok(user_id.to_string())
}

pub fn skill_tree_key(user_id: &str) -> Result<String, StoreError> {
    validate_id("user", user_id)?;
    Ok(user_id.to_string())
}
