use serde_json::Value;
use std::collections::BTreeMap;

/// Failures while reading a received object tree.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("object is missing an id")]
    MissingId,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A single object in a received model tree.
///
/// Objects carry a dotted type tag which determines how (and whether) they
/// convert, a server-assigned id, and an open set of properties. Nested
/// typed objects are structural children; everything else stays in `props`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SourceObject {
    pub speckle_type: String,
    pub id: String,
    pub name: Option<String>,
    pub units: Option<String>,
    pub props: BTreeMap<String, Value>,
    pub children: Vec<SourceObject>,
}

impl SourceObject {
    pub fn new(speckle_type: impl Into<String>, id: impl Into<String>) -> Self {
        SourceObject {
            speckle_type: speckle_type.into(),
            id: id.into(),
            ..Default::default()
        }
    }

    /// Last segment of the dotted (or colon-qualified) type tag.
    pub fn ty_short(&self) -> &str {
        self.speckle_type
            .rsplit(['.', ':'])
            .next()
            .unwrap_or(&self.speckle_type)
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }

    /// Name to give the converted object when it declares none of its own.
    /// Deterministic for a given type tag and id.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(n) if !n.trim().is_empty() => n.clone(),
            _ => {
                let id = self.id.get(..8).unwrap_or(&self.id);
                format!("{}_{id}", self.ty_short())
            }
        }
    }

    /// Reads an object tree out of parsed server JSON.
    ///
    /// Properties holding a typed object (or a list of them) are hoisted
    /// into `children`. Payload properties (`displayValue`,
    /// `renderMaterial`, `transform`) stay properties even when typed:
    /// they belong to their owning element's conversion and are not
    /// traversed on their own.
    pub fn from_value(v: &Value) -> Result<Self, ParseError> {
        let map = v.as_object().ok_or(ParseError::NotAnObject)?;
        let id = map
            .get("id")
            .and_then(Value::as_str)
            .ok_or(ParseError::MissingId)?;

        let mut out = SourceObject::new(
            map.get("speckle_type")
                .and_then(Value::as_str)
                .unwrap_or("Base"),
            id,
        );
        out.name = map.get("name").and_then(Value::as_str).map(String::from);
        out.units = map.get("units").and_then(Value::as_str).map(String::from);

        for (k, val) in map {
            if matches!(k.as_str(), "id" | "speckle_type" | "name" | "units") {
                continue;
            }
            let structural = !matches!(
                k.trim_start_matches('@'),
                "displayValue" | "renderMaterial" | "transform"
            );
            if structural && is_typed_object(val) {
                out.children.push(Self::from_value(val)?);
                continue;
            }
            if structural
                && let Some(items) = val.as_array()
                && items.first().is_some_and(is_typed_object)
            {
                for item in items {
                    if is_typed_object(item) {
                        out.children.push(Self::from_value(item)?);
                    } else {
                        log::warn!("skipping untyped entry in child list `{k}` of {id}");
                    }
                }
                continue;
            }
            out.props.insert(k.clone(), val.clone());
        }
        Ok(out)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ParseError> {
        let v: Value = serde_json::from_slice(bytes)?;
        Self::from_value(&v)
    }

    /// Number of objects in this tree, this one included.
    pub fn tree_len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(obj) = stack.pop() {
            count += 1;
            stack.extend(&obj.children);
        }
        count
    }
}

fn is_typed_object(v: &Value) -> bool {
    v.as_object().is_some_and(|m| m.contains_key("speckle_type"))
}
