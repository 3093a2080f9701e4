//! Canonical output serialization (spec §6.3): a map from node id to
//! probability, in ascending node-id order.

use std::collections::BTreeMap;

use pbelief_core::NodeId;
use serde::Serialize;

/// Serialize a belief table to JSON. `BTreeMap` already iterates in
/// ascending key order, and `serde_json`'s default (non-`preserve_order`)
/// object representation preserves that order, so this is exactly the
/// canonical form the spec asks for.
pub fn to_json<P: Serialize>(beliefs: &BTreeMap<NodeId, P>) -> eyre::Result<serde_json::Value> {
    Ok(serde_json::to_value(beliefs)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbelief_core::Point;

    #[test]
    fn ascending_node_id_order() {
        let mut beliefs = BTreeMap::new();
        beliefs.insert(3u32, Point(0.5));
        beliefs.insert(1u32, Point(0.9));
        let value = to_json(&beliefs).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["1", "3"]);
    }
}
