// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON side channel for document state that is neither vector nor raster
/// content. Both known members are owned by external controllers and kept
/// opaque; members this version doesn't know about survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeamMiscData {
    /// Curve engraving mode data
    #[serde(rename = "ce", default, skip_serializing_if = "Option::is_none")]
    pub curve_engraving: Option<Value>,
    /// Variable text settings
    #[serde(rename = "vt", default, skip_serializing_if = "Option::is_none")]
    pub variable_text: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Members of a parsed JSON value, read the way `JSON.parse` consumers do:
/// anything but an object has no members, and null members are absent.
impl From<Value> for BeamMiscData {
    fn from(value: Value) -> Self {
        let Value::Object(members) = value else {
            return Self::default();
        };

        let mut misc = Self::default();

        for (key, value) in members {
            match key.as_str() {
                "ce" => misc.curve_engraving = Some(value).filter(|value| !value.is_null()),
                "vt" => misc.variable_text = Some(value).filter(|value| !value.is_null()),
                _ => {
                    misc.extra.insert(key, value);
                }
            }
        }

        misc
    }
}

impl BeamMiscData {
    pub fn is_empty(&self) -> bool {
        self.curve_engraving.is_none() && self.variable_text.is_none() && self.extra.is_empty()
    }

    /// Names of all members present, in document order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.curve_engraving
            .as_ref()
            .map(|_| "ce")
            .into_iter()
            .chain(self.variable_text.as_ref().map(|_| "vt"))
            .chain(self.extra.keys().map(String::as_str))
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_serializes_to_empty_object() {
        assert_eq!(serde_json::to_string(&BeamMiscData::default()).unwrap(), "{}");
    }

    #[test]
    fn known_and_unknown_members() {
        let misc: BeamMiscData =
            serde_json::from_str(r#"{"ce":{"bbox":{"x":1}},"future":[1,2],"vt":{"current":3}}"#).unwrap();

        assert_eq!(misc.curve_engraving, Some(json!({"bbox": {"x": 1}})));
        assert_eq!(misc.variable_text, Some(json!({"current": 3})));
        assert_eq!(misc.extra.get("future"), Some(&json!([1, 2])));
        assert_eq!(misc.keys().collect::<Vec<_>>(), ["ce", "vt", "future"]);

        let reencoded: BeamMiscData = serde_json::from_slice(&serde_json::to_vec(&misc).unwrap()).unwrap();
        assert_eq!(reencoded, misc);
    }

    #[test]
    fn from_value() {
        let misc = BeamMiscData::from(json!({"vt": {"current": 1}, "ce": null, "extra": true}));
        assert_eq!(misc.curve_engraving, None);
        assert_eq!(misc.variable_text, Some(json!({"current": 1})));
        assert_eq!(misc.keys().collect::<Vec<_>>(), ["vt", "extra"]);

        assert!(BeamMiscData::from(json!(["ce"])).is_empty());
        assert!(BeamMiscData::from(Value::Null).is_empty());
    }

    #[test]
    fn null_member_is_absent() {
        let misc: BeamMiscData = serde_json::from_str(r#"{"ce":null}"#).unwrap();
        assert!(misc.is_empty());
    }
}
