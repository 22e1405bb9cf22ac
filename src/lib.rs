pub type F = f64;

/// Alias for array of floats.
pub type Vector<const N: usize, T = F> = [T; N];

pub type Vec3 = Vector<3>;

/// Column major 4x4 transform.
pub type Mat4 = [[F; 4]; 4];

/// Source objects received from a model server.
pub mod object;

/// Flattening object trees into traversal order.
pub mod traversal;

/// Face representations and packed face-list decoding.
pub mod face;

/// Model unit handling.
pub mod units;

/// Render material mapping and the per-batch material cache.
pub mod material;

/// Native scene representation.
pub mod native;

/// Tree-to-native conversion driver.
pub mod convert;

/// Conversions from source objects into native scene data.
pub mod to_native;

pub use convert::{
    ConversionOutcome, ConvertError, ConvertOpts, Converter, RootPolicy, convert_sync,
    convert_tree,
};
pub use face::FaceKind;
pub use native::{NativeNode, NativeScene};
pub use object::SourceObject;
pub use to_native::StandardConverter;

/// Converts a whole received tree with the standard converter, logging and
/// skipping objects that fail.
pub fn to_native(root: &SourceObject) -> Result<NativeScene, ConvertError> {
    let mut scene = NativeScene::new();
    let mut converter = StandardConverter::new(material::MaterialCache::new());
    let outcomes = convert_sync(root, &mut scene, &mut converter, ConvertOpts::default())?;
    for outcome in &outcomes {
        if let ConversionOutcome::Failed(ctx, e) = outcome {
            log::warn!("skipping {}: {e}", ctx.current.id);
        }
    }
    Ok(scene)
}

pub(crate) fn kmul<const N: usize>(k: F, v: [F; N]) -> [F; N] {
    v.map(|v| v * k)
}

pub(crate) fn add<const N: usize>(a: [F; N], b: [F; N]) -> [F; N] {
    std::array::from_fn(|i| a[i] + b[i])
}

pub(crate) fn cross([x, y, z]: [F; 3], [a, b, c]: [F; 3]) -> [F; 3] {
    [y * c - z * b, z * a - x * c, x * b - y * a]
}

pub(crate) fn dot([a, b, c]: [F; 3], [x, y, z]: [F; 3]) -> F {
    a * x + b * y + c * z
}

/// Apply a transformation (col major 4x4) to a point
pub fn tform_point(tform: Mat4, p: [F; 3]) -> [F; 3] {
    let out = (0..4)
        .map(|i| {
            if i == 3 {
                tform[i]
            } else {
                kmul(p[i], tform[i])
            }
        })
        .fold([0.; 4], add);
    assert_ne!(out[3], 0., "{tform:?}*{p:?} = {out:?}");
    std::array::from_fn(|i| out[i] / out[3])
}

/// Identity Matrix
pub fn identity<const N: usize>() -> [[F; N]; N] {
    let mut out = [[0.; N]; N];
    for i in 0..N {
        out[i][i] = 1.;
    }
    out
}

/// Matrix multiplication.
/// For composing transforms together.
pub fn matmul<const N: usize>(ta: [[F; N]; N], tb: [[F; N]; N]) -> [[F; N]; N] {
    let mut out = [[0.; N]; N];
    for i in 0..N {
        for j in 0..N {
            for k in 0..N {
                out[i][j] += ta[i][k] * tb[k][j];
            }
        }
    }
    out
}

/// Inverse of an affine transform (col major, no perspective terms).
pub fn invert_affine(m: Mat4) -> Mat4 {
    let c0 = [m[0][0], m[0][1], m[0][2]];
    let c1 = [m[1][0], m[1][1], m[1][2]];
    let c2 = [m[2][0], m[2][1], m[2][2]];
    let t = [m[3][0], m[3][1], m[3][2]];

    let det = dot(c0, cross(c1, c2));
    assert!(det.abs() > 1e-14, "degenerate transform {m:?}");
    let r0 = kmul(det.recip(), cross(c1, c2));
    let r1 = kmul(det.recip(), cross(c2, c0));
    let r2 = kmul(det.recip(), cross(c0, c1));

    [
        [r0[0], r1[0], r2[0], 0.],
        [r0[1], r1[1], r2[1], 0.],
        [r0[2], r1[2], r2[2], 0.],
        [-dot(r0, t), -dot(r1, t), -dot(r2, t), 1.],
    ]
}

#[test]
fn test_invert_affine() {
    let mut m = identity::<4>();
    m[3] = [3., -2., 7., 1.];
    m[0][0] = 2.;
    m[1][1] = 0.5;

    let inv = invert_affine(m);
    let p = [1., 2., 3.];
    let back = tform_point(inv, tform_point(m, p));
    for i in 0..3 {
        assert!((back[i] - p[i]).abs() < 1e-10, "{back:?} != {p:?}");
    }

    let rt = matmul(m, inv);
    let id = identity::<4>();
    for i in 0..4 {
        for j in 0..4 {
            assert!((rt[i][j] - id[i][j]).abs() < 1e-10, "{rt:?}");
        }
    }
}
