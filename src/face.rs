/// Face representation for native meshes.
/// Tris and quads are stack allocated,
/// general polygons go on the heap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FaceKind {
    Tri([usize; 3]),
    Quad([usize; 4]),
    Poly(Vec<usize>),
}

impl FaceKind {
    pub fn as_slice(&self) -> &[usize] {
        use FaceKind::*;
        match self {
            Tri(t) => t.as_slice(),
            Quad(q) => q.as_slice(),
            Poly(v) => v.as_slice(),
        }
    }

    /// Number of vertices in this face.
    pub fn len(&self) -> usize {
        use FaceKind::*;
        match self {
            Tri(_) => 3,
            Quad(_) => 4,
            Poly(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FaceKind::Poly(v) if v.is_empty())
    }

    pub fn num_tris(&self) -> usize {
        self.len().saturating_sub(2)
    }

    /// Iterate over triangles in this face rooted at the 0th index.
    pub fn as_triangle_fan(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let s = self.as_slice();
        let v0 = s.first().copied().unwrap_or(0);
        (1..s.len().saturating_sub(1)).map(move |i| [v0, s[i], s[i + 1]])
    }
}

/// Decodes a packed face list into faces.
///
/// The wire layout is a run of `[count, i0, i1, ..]` groups where the legacy
/// counts `0` and `1` mean triangle and quad, and any `count >= 3` is the
/// literal vertex count of an n-gon. Indices must fall below `num_verts`.
pub fn decode_face_list(data: &[i64], num_verts: usize) -> Result<Vec<FaceKind>, String> {
    let mut out = vec![];
    let mut i = 0;
    while i < data.len() {
        let n = data[i];
        let k = match n {
            0 => 3,
            1 => 4,
            _ if n >= 3 => n as usize,
            _ => return Err(format!("bad face count {n} at offset {i}")),
        };
        if i + 1 + k > data.len() {
            return Err(format!("face at offset {i} runs past the end of the list"));
        }
        let vis = data[i + 1..i + 1 + k]
            .iter()
            .map(|&vi| {
                usize::try_from(vi)
                    .ok()
                    .filter(|&vi| vi < num_verts)
                    .ok_or_else(|| format!("vertex index {vi} out of range (of {num_verts})"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        out.push(match k {
            3 => FaceKind::Tri([vis[0], vis[1], vis[2]]),
            4 => FaceKind::Quad([vis[0], vis[1], vis[2], vis[3]]),
            _ => FaceKind::Poly(vis),
        });
        i += 1 + k;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_legacy_counts() {
        let fs = decode_face_list(&[0, 0, 1, 2, 1, 0, 1, 2, 3], 4).unwrap();
        assert_eq!(fs, [FaceKind::Tri([0, 1, 2]), FaceKind::Quad([0, 1, 2, 3])]);
    }

    #[test]
    fn test_decode_ngon() {
        let fs = decode_face_list(&[5, 0, 1, 2, 3, 4], 5).unwrap();
        assert_eq!(fs, [FaceKind::Poly(vec![0, 1, 2, 3, 4])]);
        assert_eq!(fs[0].num_tris(), 3);
        assert_eq!(
            fs[0].as_triangle_fan().collect::<Vec<_>>(),
            [[0, 1, 2], [0, 2, 3], [0, 3, 4]]
        );
    }

    #[test]
    fn test_decode_explicit_tri_count() {
        let fs = decode_face_list(&[3, 2, 1, 0], 3).unwrap();
        assert_eq!(fs, [FaceKind::Tri([2, 1, 0])]);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(decode_face_list(&[2, 0, 1], 3).is_err());
        assert!(decode_face_list(&[0, 0, 1], 3).is_err());
        assert!(decode_face_list(&[0, 0, 1, 9], 3).is_err());
        assert!(decode_face_list(&[0, 0, 1, -1], 3).is_err());
    }
}
