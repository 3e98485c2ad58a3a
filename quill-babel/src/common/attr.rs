//! Pandoc attribute triples.
//!
//! Pandoc attaches `[id, [classes], [[key, value], ...]]` to headings, code, spans, divs,
//! links and images. On the tree side the same information lives in three attrs keys:
//! `id` (string or null), `classes` (list of strings) and `keyvalue` (list of pairs).
//! Decoding is tolerant: missing or ill-typed parts become empty values.

use crate::error::ShapeError;
use crate::ir::nodes::Attrs;
use crate::ir::tokens::{Payload, Token};
use serde_json::Value;

pub const ID: &str = "id";
pub const CLASSES: &str = "classes";
pub const KEYVALUE: &str = "keyvalue";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PandocAttr {
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub keyvalue: Vec<(String, String)>,
}

impl PandocAttr {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.classes.is_empty() && self.keyvalue.is_empty()
    }

    /// Reads the triple back out of a tree attribute bag.
    pub fn from_attrs(attrs: &Attrs) -> Self {
        let id = attrs
            .get(ID)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        let classes = attrs
            .get(CLASSES)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let keyvalue = attrs
            .get(KEYVALUE)
            .and_then(Value::as_array)
            .map(|pairs| pairs.iter().filter_map(json_pair).collect())
            .unwrap_or_default();
        PandocAttr {
            id,
            classes,
            keyvalue,
        }
    }

    /// Writes the triple into a tree attribute bag, always setting all three keys.
    pub fn into_attrs(self, attrs: &mut Attrs) {
        attrs.insert(
            ID.to_string(),
            self.id.map_or(Value::Null, Value::String),
        );
        attrs.insert(
            CLASSES.to_string(),
            Value::Array(self.classes.into_iter().map(Value::String).collect()),
        );
        attrs.insert(
            KEYVALUE.to_string(),
            Value::Array(
                self.keyvalue
                    .into_iter()
                    .map(|(k, v)| Value::Array(vec![Value::String(k), Value::String(v)]))
                    .collect(),
            ),
        );
    }
}

fn json_pair(pair: &Value) -> Option<(String, String)> {
    let items = pair.as_array()?;
    Some((
        items.first()?.as_str()?.to_string(),
        items.get(1)?.as_str()?.to_string(),
    ))
}

/// Token payload form: `["id", ["class"], [["key", "value"]]]`.
pub fn encode(attr: &PandocAttr) -> Payload {
    Payload::List(vec![
        Payload::text(attr.id.clone().unwrap_or_default()),
        Payload::List(attr.classes.iter().cloned().map(Payload::Text).collect()),
        Payload::List(
            attr.keyvalue
                .iter()
                .map(|(k, v)| {
                    Payload::List(vec![Payload::text(k.clone()), Payload::text(v.clone())])
                })
                .collect(),
        ),
    ])
}

pub fn decode(payload: &Payload) -> PandocAttr {
    let parts = payload.as_list().unwrap_or_default();
    let id = parts
        .first()
        .and_then(Payload::as_text)
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    let classes = parts
        .get(1)
        .and_then(Payload::as_list)
        .map(|items| {
            items
                .iter()
                .filter_map(Payload::as_text)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let keyvalue = parts
        .get(2)
        .and_then(Payload::as_list)
        .map(|pairs| pairs.iter().filter_map(payload_pair).collect())
        .unwrap_or_default();
    PandocAttr {
        id,
        classes,
        keyvalue,
    }
}

/// Decodes the triple found at argument `index` of a token straight into tree attrs.
pub fn attrs_at(token: &Token, index: usize) -> Result<Attrs, ShapeError> {
    let mut attrs = Attrs::new();
    decode(token.arg(index)?).into_attrs(&mut attrs);
    Ok(attrs)
}

fn payload_pair(pair: &Payload) -> Option<(String, String)> {
    let items = pair.as_list()?;
    Some((
        items.first()?.as_text()?.to_string(),
        items.get(1)?.as_text()?.to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PandocAttr {
        PandocAttr {
            id: Some("intro".into()),
            classes: vec!["lead".into(), "wide".into()],
            keyvalue: vec![("data-x".into(), "1".into())],
        }
    }

    #[test]
    fn encodes_pandoc_triple() {
        let json = serde_json::to_value(encode(&sample())).unwrap();
        assert_eq!(
            json,
            serde_json::json!(["intro", ["lead", "wide"], [["data-x", "1"]]])
        );
    }

    #[test]
    fn empty_id_decodes_to_none() {
        let payload = encode(&PandocAttr::default());
        assert_eq!(decode(&payload), PandocAttr::default());
    }

    #[test]
    fn decode_tolerates_short_and_ill_typed_payloads() {
        assert_eq!(decode(&Payload::Null), PandocAttr::default());
        assert_eq!(decode(&Payload::List(vec![])), PandocAttr::default());

        let partial = Payload::List(vec![
            Payload::text("x"),
            Payload::Integer(3),
            Payload::List(vec![Payload::List(vec![Payload::text("lonely")])]),
        ]);
        let attr = decode(&partial);
        assert_eq!(attr.id.as_deref(), Some("x"));
        assert!(attr.classes.is_empty());
        assert!(attr.keyvalue.is_empty());
    }

    #[test]
    fn attrs_bridge_preserves_triple() {
        let mut attrs = Attrs::new();
        sample().into_attrs(&mut attrs);
        assert_eq!(attrs[ID], Value::String("intro".into()));
        assert_eq!(PandocAttr::from_attrs(&attrs), sample());
    }

    #[test]
    fn missing_attrs_keys_read_as_empty() {
        assert!(PandocAttr::from_attrs(&Attrs::new()).is_empty());
    }
}
