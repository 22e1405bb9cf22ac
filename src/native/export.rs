use super::NativeScene;
use crate::tform_point;
use std::io::{self, Write};
use std::path::Path;

/// Writes `scene` as an OBJ file, with an MTL file alongside when the scene
/// carries materials. Vertices are written in world space; this is a debug
/// dump, not a round-trippable export.
pub fn save_obj(scene: &NativeScene, path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    let mtl_path = path.with_extension("mtl");

    if !scene.materials.is_empty() {
        let f = std::fs::File::create(&mtl_path)?;
        let mut out = io::BufWriter::new(f);
        for mat in &scene.materials {
            let [r, g, b, a] = mat.rgba;
            writeln!(out, "newmtl {}", sanitize(&mat.name))?;
            writeln!(out, "Kd {r} {g} {b}")?;
            writeln!(out, "d {a}")?;
        }
    }

    let f = std::fs::File::create(path)?;
    let mut out = io::BufWriter::new(f);
    if !scene.materials.is_empty()
        && let Some(mtl_file) = mtl_path.file_name()
    {
        writeln!(out, "mtllib {}", mtl_file.to_string_lossy())?;
    }

    let mut offset = 1;
    for (ni, node) in scene.nodes.iter().enumerate() {
        let Some(mi) = node.mesh else {
            continue;
        };
        let mesh = &scene.meshes[mi];
        writeln!(out, "o {}", sanitize(&node.name))?;
        if let Some(mat) = node.material {
            writeln!(out, "usemtl {}", sanitize(&scene.materials[mat].name))?;
        }
        let world = scene.world_transform(ni);
        for &v in &mesh.v {
            let [x, y, z] = tform_point(world, v);
            writeln!(out, "v {x} {y} {z}")?;
        }
        for face in &mesh.f {
            write!(out, "f")?;
            for &vi in face.as_slice() {
                write!(out, " {}", offset + vi)?;
            }
            writeln!(out)?;
        }
        offset += mesh.v.len();
    }
    Ok(())
}

fn sanitize(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return "unnamed".to_string();
    }
    name.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}
