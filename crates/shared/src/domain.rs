use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(EventId);
id_newtype!(TakeEventId);

/// Rank of a user within the group. `Bandana` is the lowest tier and the
/// fallback when the server reports nothing usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Vest,
    Hat,
    #[default]
    Bandana,
}

/// Lifecycle stage of a punishment event. A pending event is confirmed
/// exactly once and never goes back to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    Confirmed,
}

/// Permission string gating the fikapinne give/take operations.
pub const PERM_MANAGE_FIKAPINNAR: &str = "punishments.manage_fikapinnar";
