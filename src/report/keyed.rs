//! Serializes identity-keyed maps as plain sequences of their values.
//!
//! Report nodes carry their own key (file name, error type and number, ...),
//! so the persisted document stores each map as a list and the key is rebuilt
//! from the node on the way back in.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A value that knows the key it is stored under
pub trait Keyed {
    type Key: Ord;

    fn key(&self) -> Self::Key;
}

pub fn serialize<S, K, V>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    serializer.collect_seq(map.values())
}

pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<V::Key, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de> + Keyed,
{
    let values = Vec::<V>::deserialize(deserializer)?;
    Ok(values.into_iter().map(|value| (value.key(), value)).collect())
}
