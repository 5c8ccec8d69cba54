//! Entity identity and shared guards

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{Error, Result};

/// Anything with a stable identity inside the Group aggregate
pub trait Entity {
    /// Name used in not-found and duplicate-id errors
    const KIND: &'static str;

    fn id(&self) -> Uuid;
}

/// Reject the nil UUID, which callers use as "no id"
pub(crate) fn require_id(id: Uuid, field: &str) -> Result<()> {
    if id.is_nil() {
        return Err(Error::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Trim text and reject it when nothing visible remains
pub(crate) fn require_text(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn lookup<E: Entity>(map: &HashMap<Uuid, E>, id: Uuid) -> Result<&E> {
    map.get(&id).ok_or_else(|| Error::not_found(E::KIND, id))
}

pub(crate) fn lookup_mut<E: Entity>(map: &mut HashMap<Uuid, E>, id: Uuid) -> Result<&mut E> {
    map.get_mut(&id).ok_or_else(|| Error::not_found(E::KIND, id))
}

/// Fail when an id is already taken in `map`
pub(crate) fn ensure_vacant<E: Entity>(map: &HashMap<Uuid, E>, id: Uuid) -> Result<()> {
    require_id(id, E::KIND)?;
    if map.contains_key(&id) {
        return Err(Error::invalid(format!("{} {id} already exists", E::KIND)));
    }
    Ok(())
}
