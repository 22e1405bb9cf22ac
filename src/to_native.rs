use crate::convert::{ConvertError, Converter};
use crate::face::decode_face_list;
use crate::material::{MaterialCache, RenderMaterial};
use crate::native::{NativeMesh, NativeNode, NativeScene};
use crate::object::SourceObject;
use crate::units::scale_to_meters;
use crate::{F, Mat4, identity};
use serde_json::Value;

/// The stock converter: meshes convert directly, and any other object
/// carrying display geometry converts through it, grouped under one node.
/// Built from a host-injected [`MaterialCache`] whose lifetime follows the
/// batch bracket.
pub struct StandardConverter {
    materials: MaterialCache,
}

impl StandardConverter {
    pub fn new(materials: MaterialCache) -> Self {
        StandardConverter { materials }
    }
}

impl Converter for StandardConverter {
    fn can_convert(&self, obj: &SourceObject) -> bool {
        is_mesh(obj) || display_value(obj).is_some()
    }

    fn convert_single(
        &mut self,
        obj: &SourceObject,
        scene: &mut NativeScene,
    ) -> Result<Option<usize>, ConvertError> {
        if is_mesh(obj) {
            let mesh = decode_mesh(obj)?;
            let material = self.materials.get_or_insert(render_material(obj).as_ref(), scene);
            let mesh = scene.add_mesh(mesh);
            let node = NativeNode {
                name: obj.name.clone().unwrap_or_default(),
                transform: transform_prop(obj),
                mesh: Some(mesh),
                material: Some(material),
                ..Default::default()
            };
            return Ok(Some(scene.add_node(node)));
        }

        // display fallback: decode everything first so a bad mesh fails the
        // element before any node lands in the scene
        let display = display_objects(obj);
        let mut decoded = vec![];
        for d in &display {
            if is_mesh(d) {
                decoded.push((d, decode_mesh(d)?));
            }
        }
        if decoded.is_empty() {
            return Ok(None);
        }

        let group = scene.add_node(NativeNode {
            name: obj.name.clone().unwrap_or_default(),
            transform: transform_prop(obj),
            ..Default::default()
        });
        for (d, mesh) in decoded {
            let material = self.materials.get_or_insert(render_material(d).as_ref(), scene);
            let mesh = scene.add_mesh(mesh);
            let child = scene.add_node(NativeNode {
                name: d.display_name(),
                mesh: Some(mesh),
                material: Some(material),
                ..Default::default()
            });
            scene.attach(child, Some(group));
        }
        Ok(Some(group))
    }

    fn begin_batch(&mut self) {
        self.materials.begin_write();
    }

    fn finish_batch(&mut self) {
        self.materials.finish_write();
    }
}

fn is_mesh(obj: &SourceObject) -> bool {
    obj.ty_short() == "Mesh"
}

fn geometry(obj: &SourceObject, msg: &str) -> ConvertError {
    ConvertError::Geometry(format!("{}: {msg}", obj.id))
}

/// Decodes the flat vertex and packed face lists of a mesh object,
/// scaling its declared units to meters.
fn decode_mesh(obj: &SourceObject) -> Result<NativeMesh, ConvertError> {
    let vs = obj
        .prop("vertices")
        .and_then(float_array)
        .ok_or_else(|| geometry(obj, "missing or non-numeric `vertices`"))?;
    if vs.len() % 3 != 0 {
        return Err(geometry(obj, "vertex list length is not a multiple of 3"));
    }
    let scale = match obj.units.as_deref() {
        None => 1.,
        Some(u) => scale_to_meters(u).unwrap_or_else(|| {
            log::warn!("unknown units {u:?} on {}, assuming meters", obj.id);
            1.
        }),
    };
    let v = vs
        .chunks_exact(3)
        .map(|c| [c[0] * scale, c[1] * scale, c[2] * scale])
        .collect::<Vec<_>>();

    let fs = obj
        .prop("faces")
        .and_then(int_array)
        .ok_or_else(|| geometry(obj, "missing or non-integer `faces`"))?;
    let f = decode_face_list(&fs, v.len()).map_err(|e| geometry(obj, &e))?;
    Ok(NativeMesh { v, f })
}

/// The objects under `displayValue`, parsed; malformed entries are skipped.
fn display_objects(obj: &SourceObject) -> Vec<SourceObject> {
    let Some(v) = display_value(obj) else {
        return vec![];
    };
    let items = match v {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    let mut out = vec![];
    for item in items {
        match SourceObject::from_value(item) {
            Ok(o) => out.push(o),
            Err(e) => log::warn!("skipping display entry on {}: {e}", obj.id),
        }
    }
    out
}

fn display_value(obj: &SourceObject) -> Option<&Value> {
    obj.prop("displayValue").or_else(|| obj.prop("@displayValue"))
}

fn render_material(obj: &SourceObject) -> Option<RenderMaterial> {
    let v = obj
        .prop("renderMaterial")
        .or_else(|| obj.prop("@renderMaterial"))?;
    match serde_json::from_value(v.clone()) {
        Ok(m) => Some(m),
        Err(e) => {
            log::warn!("ignoring malformed render material on {}: {e}", obj.id);
            None
        }
    }
}

/// Optional node transform, serialized row major (possibly wrapped in a
/// transform object), read into the col major convention.
fn transform_prop(obj: &SourceObject) -> Mat4 {
    let Some(v) = obj.prop("transform") else {
        return identity::<4>();
    };
    let flat = float_array(v).or_else(|| v.get("matrix").and_then(float_array));
    match flat {
        Some(m) if m.len() == 16 => {
            let mut out = identity::<4>();
            for r in 0..4 {
                for c in 0..4 {
                    out[c][r] = m[r * 4 + c];
                }
            }
            out
        }
        _ => {
            log::warn!("ignoring malformed `transform` on {}", obj.id);
            identity::<4>()
        }
    }
}

fn float_array(v: &Value) -> Option<Vec<F>> {
    v.as_array()?.iter().map(Value::as_f64).collect()
}

fn int_array(v: &Value) -> Option<Vec<i64>> {
    v.as_array()?.iter().map(Value::as_i64).collect()
}
