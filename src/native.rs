use crate::face::FaceKind;
use crate::{F, Mat4, Vec3, identity, invert_affine, matmul};

pub mod export;

/// Converted scene: a flat node arena with `usize` handles.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NativeScene {
    pub nodes: Vec<NativeNode>,
    pub meshes: Vec<NativeMesh>,
    pub materials: Vec<NativeMaterial>,
    pub root_nodes: Vec<usize>,
    /// Host-registered category names that objects may map onto.
    pub layers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeNode {
    pub name: String,
    /// Local transform (col major), relative to `parent`.
    pub transform: Mat4,
    pub mesh: Option<usize>,
    pub material: Option<usize>,
    pub layer: Option<usize>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl Default for NativeNode {
    fn default() -> Self {
        NativeNode {
            name: String::new(),
            transform: identity::<4>(),
            mesh: None,
            material: None,
            layer: None,
            parent: None,
            children: vec![],
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct NativeMesh {
    pub v: Vec<Vec3>,
    pub f: Vec<FaceKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeMaterial {
    pub name: String,
    pub rgba: [F; 4],
}

impl NativeScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the arena, returning its handle.
    /// The node starts out as a scene root; reparent it with [`Self::attach`].
    pub fn add_node(&mut self, mut node: NativeNode) -> usize {
        node.parent = None;
        let ix = self.nodes.len();
        self.nodes.push(node);
        self.root_nodes.push(ix);
        ix
    }

    pub fn add_mesh(&mut self, mesh: NativeMesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn add_layer(&mut self, name: impl Into<String>) -> usize {
        self.layers.push(name.into());
        self.layers.len() - 1
    }

    pub fn layer_named(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l == name)
    }

    /// World transform of `node`, composed over its parent chain.
    pub fn world_transform(&self, node: usize) -> Mat4 {
        let mut tform = self.nodes[node].transform;
        let mut curr = self.nodes[node].parent;
        while let Some(p) = curr {
            tform = matmul(tform, self.nodes[p].transform);
            curr = self.nodes[p].parent;
        }
        tform
    }

    /// Reparents `child` under `parent` (or out to the scene roots) without
    /// moving it in world space: its local transform is recomputed against
    /// the new parent's world transform.
    pub fn attach(&mut self, child: usize, parent: Option<usize>) {
        if let Some(p) = parent {
            let mut curr = Some(p);
            while let Some(c) = curr {
                assert_ne!(c, child, "attaching {child} under {p} would form a cycle");
                curr = self.nodes[c].parent;
            }
        }

        let world = self.world_transform(child);
        match self.nodes[child].parent {
            Some(old) => self.nodes[old].children.retain(|&c| c != child),
            None => self.root_nodes.retain(|&c| c != child),
        }
        match parent {
            Some(p) => {
                self.nodes[child].transform = matmul(world, invert_affine(self.world_transform(p)));
                self.nodes[p].children.push(child);
            }
            None => {
                self.nodes[child].transform = world;
                self.root_nodes.push(child);
            }
        }
        self.nodes[child].parent = parent;
    }
}
