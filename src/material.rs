use crate::F;
use crate::native::{NativeMaterial, NativeScene};
use serde::Deserialize;
use std::collections::HashMap;

/// Color used when an object carries no render material (dark slate gray).
pub const DEFAULT_RGBA: [F; 4] = [47. / 255., 79. / 255., 79. / 255., 1.];

/// The subset of a render material carried on source objects that survives
/// conversion: a packed diffuse color and an opacity.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderMaterial {
    pub name: Option<String>,
    /// Packed ARGB diffuse color; servers serialize it as a signed int.
    pub diffuse: i64,
    pub opacity: f64,
}

impl Default for RenderMaterial {
    fn default() -> Self {
        RenderMaterial {
            name: None,
            diffuse: 0x2F4F4F,
            opacity: 1.,
        }
    }
}

impl RenderMaterial {
    /// Diffuse color and opacity as rgba in 0..=1.
    /// The packed alpha bits are ignored, opacity wins.
    pub fn rgba(&self) -> [F; 4] {
        let d = self.diffuse as u32;
        let r = ((d >> 16) & 0xff) as F / 255.;
        let g = ((d >> 8) & 0xff) as F / 255.;
        let b = (d & 0xff) as F / 255.;
        [r, g, b, self.opacity.clamp(0., 1.) as F]
    }
}

/// Per-batch material dedup, injected into the standard converter by the
/// host. One batch spans one conversion run: `begin_write` opens it and
/// `finish_write` closes it, dropping the lookup state.
#[derive(Debug, Default)]
pub struct MaterialCache {
    by_key: HashMap<u32, usize>,
    open: bool,
}

impl MaterialCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_write(&mut self) {
        if self.open {
            log::warn!("material cache batch opened twice");
        }
        self.by_key.clear();
        self.open = true;
    }

    pub fn finish_write(&mut self) {
        self.by_key.clear();
        self.open = false;
    }

    /// Handle of the scene material for `mat`, allocating on first sight
    /// within the current batch. `None` maps to the default material.
    pub fn get_or_insert(&mut self, mat: Option<&RenderMaterial>, scene: &mut NativeScene) -> usize {
        if !self.open {
            log::warn!("material cache written outside an open batch");
        }
        let rgba = mat.map_or(DEFAULT_RGBA, RenderMaterial::rgba);
        let key = pack(rgba);
        if let Some(&ix) = self.by_key.get(&key) {
            return ix;
        }
        let name = mat
            .and_then(|m| m.name.clone())
            .unwrap_or_else(|| format!("mat_{key:08x}"));
        scene.materials.push(NativeMaterial { name, rgba });
        let ix = scene.materials.len() - 1;
        self.by_key.insert(key, ix);
        ix
    }
}

fn pack(rgba: [F; 4]) -> u32 {
    let [r, g, b, a] = rgba.map(|c| (c.clamp(0., 1.) * 255.).round() as u32);
    (a << 24) | (r << 16) | (g << 8) | b
}
