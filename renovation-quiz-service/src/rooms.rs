//! Room-instance enumeration shared by every per-room step.
//!
//! A selection of renovation types fans out into one room instance per
//! bedroom, one per bathroom, and one per other selected type. Full
//! renovation collapses the whole fan-out into a single instance.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use step_flow::{Context, FlowError, Result};

use crate::steps::types::{BATHROOM, BEDROOM, FULL_RENOVATION, session_keys};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomInstance {
    /// 1-based bedroom number
    Bedroom(u32),
    /// 1-based bathroom number
    Bathroom(u32),
    Other(String),
}

impl fmt::Display for RoomInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomInstance::Bedroom(n) => write!(f, "{BEDROOM} {n}"),
            RoomInstance::Bathroom(n) => write!(f, "{BATHROOM} {n}"),
            RoomInstance::Other(label) => f.write_str(label),
        }
    }
}

/// Enumerate room instances: bedrooms, then bathrooms, then the other
/// selected types in selection order.
///
/// Counts only apply to categories present in `selection`, so a count left
/// behind by an earlier pass through a different branch is ignored.
pub fn room_instances(selection: &[String], bedrooms: u32, bathrooms: u32) -> Vec<RoomInstance> {
    if selection.iter().any(|label| label == FULL_RENOVATION) {
        return vec![RoomInstance::Other(FULL_RENOVATION.to_string())];
    }

    let has = |category: &str| selection.iter().any(|label| label == category);
    let mut rooms = Vec::new();
    if has(BEDROOM) {
        rooms.extend((1..=bedrooms).map(RoomInstance::Bedroom));
    }
    if has(BATHROOM) {
        rooms.extend((1..=bathrooms).map(RoomInstance::Bathroom));
    }
    for label in selection {
        if label == BEDROOM || label == BATHROOM {
            continue;
        }
        let room = RoomInstance::Other(label.clone());
        if !rooms.contains(&room) {
            rooms.push(room);
        }
    }
    rooms
}

/// Room instances for the answers collected so far.
///
/// Missing answers here mean a per-room step was reached without the steps
/// before it, which is a contract violation rather than a user error.
pub async fn rooms_from_context(context: &Context) -> Result<Vec<RoomInstance>> {
    let selection: Vec<String> = context
        .get(session_keys::RENOVATION_TYPE)
        .await
        .ok_or_else(|| FlowError::ContextError("renovation_type not found".to_string()))?;

    if selection.iter().any(|label| label == FULL_RENOVATION) {
        return Ok(room_instances(&selection, 0, 0));
    }

    let count = |key: &str, category: &str| -> Result<u32> {
        if !selection.iter().any(|label| label == category) {
            return Ok(0);
        }
        context
            .get_sync(key)
            .ok_or_else(|| FlowError::ContextError(format!("{key} not found")))
    };
    let bedrooms = count(session_keys::BEDROOMS_TO_RENO, BEDROOM)?;
    let bathrooms = count(session_keys::BATHROOMS_TO_RENO, BATHROOM)?;

    Ok(room_instances(&selection, bedrooms, bathrooms))
}

/// One value per room instance, partitioned the way the estimator expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerRoomValue<T> {
    #[serde(default)]
    pub bedrooms: Vec<T>,
    #[serde(default)]
    pub bathrooms: Vec<T>,
    #[serde(default)]
    pub other: BTreeMap<String, T>,
}

impl<T> Default for PerRoomValue<T> {
    fn default() -> Self {
        Self {
            bedrooms: Vec::new(),
            bathrooms: Vec::new(),
            other: BTreeMap::new(),
        }
    }
}

impl<T> PerRoomValue<T> {
    pub fn get(&self, room: &RoomInstance) -> Option<&T> {
        match room {
            RoomInstance::Bedroom(n) => index(*n).and_then(|i| self.bedrooms.get(i)),
            RoomInstance::Bathroom(n) => index(*n).and_then(|i| self.bathrooms.get(i)),
            RoomInstance::Other(label) => self.other.get(label),
        }
    }

    /// Build a value for exactly the given rooms, or `None` as soon as `f`
    /// has nothing for one of them.
    pub fn collect<F>(rooms: &[RoomInstance], mut f: F) -> Option<Self>
    where
        F: FnMut(&RoomInstance) -> Option<T>,
    {
        let mut value = Self::default();
        for room in rooms {
            let item = f(room)?;
            match room {
                RoomInstance::Bedroom(_) => value.bedrooms.push(item),
                RoomInstance::Bathroom(_) => value.bathrooms.push(item),
                RoomInstance::Other(label) => {
                    value.other.insert(label.clone(), item);
                }
            }
        }
        Some(value)
    }
}

fn index(n: u32) -> Option<usize> {
    usize::try_from(n).ok()?.checked_sub(1)
}
