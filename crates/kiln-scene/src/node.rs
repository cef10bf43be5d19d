//! Arena-based scene graph
//!
//! A `Prefab` owns a flat arena of nodes addressed by `NodeId`; child lists
//! are index sequences. A node's global matrix is resolved from the local
//! hierarchy as if rooted at identity - the placement matrix of the entity
//! that instantiates the prefab is applied last, by the renderer.

use kiln_core::{mat4_identity, mat4_mul, Mat4, MaterialId, MeshId, NodeId};

/// One node of a prefab's tree: local transform, optional drawables, children
#[derive(Debug, Clone)]
pub struct Node {
    pub local: Mat4,
    pub mesh: Option<MeshId>,
    pub material: Option<MaterialId>,
    /// Gates only this node's own draw; children are walked regardless
    pub visible: bool,
    pub children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            local: mat4_identity(),
            mesh: None,
            material: None,
            visible: true,
            children: Vec::new(),
            parent: None,
        }
    }
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mesh(mut self, mesh: MeshId, material: MaterialId) -> Self {
        self.mesh = Some(mesh);
        self.material = Some(material);
        self
    }

    pub fn with_local(mut self, local: Mat4) -> Self {
        self.local = local;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// A reusable node tree. Several entities may instantiate the same prefab
/// with different placement matrices.
#[derive(Debug, Clone)]
pub struct Prefab {
    pub name: String,
    nodes: Vec<Node>,
    root: NodeId,
}

impl Prefab {
    /// Create a prefab with an empty root node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: vec![Node::new()],
            root: NodeId::from_raw(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Append a child node under `parent`, returning its id
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u32);
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Resolve a node's global matrix within the prefab (local hierarchy
    /// only, rooted at identity - no placement applied).
    pub fn local_global_matrix(&self, id: NodeId) -> Mat4 {
        let node = self.node(id);
        match node.parent {
            Some(parent) => mat4_mul(&self.local_global_matrix(parent), &node.local),
            None => node.local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::{Transform, Vec3};

    #[test]
    fn test_add_child_links_parent() {
        let mut prefab = Prefab::new("test");
        let root = prefab.root();
        let child = prefab.add_child(root, Node::new());
        let grandchild = prefab.add_child(child, Node::new());

        assert_eq!(prefab.node(child).parent(), Some(root));
        assert_eq!(prefab.node(grandchild).parent(), Some(child));
        assert_eq!(prefab.node(root).children, vec![child]);
        assert_eq!(prefab.node_count(), 3);
    }

    #[test]
    fn test_local_global_matrix_chains() {
        let mut prefab = Prefab::new("test");
        let root = prefab.root();
        prefab.node_mut(root).local =
            Transform::from_position(Vec3::new(0.0, 5.0, 0.0)).to_matrix();

        let child = prefab.add_child(
            root,
            Node::new().with_local(Transform::from_position(Vec3::new(2.0, 0.0, 0.0)).to_matrix()),
        );

        let global = prefab.local_global_matrix(child);
        assert!((global[3][0] - 2.0).abs() < 1e-6);
        assert!((global[3][1] - 5.0).abs() < 1e-6);
    }
}
