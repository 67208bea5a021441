//! Scene hierarchy
//!
//! Nodes live in an arena ([`NodeTree`]) and refer to each other through
//! [`NodeHandle`]s. The tree owns the id generator: every time a node is
//! attached to a parent it receives the next id, so ids are unique across the
//! tree and follow attach order.

use crate::geometry::Transformation;

/// Stable reference to a node inside a [`NodeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(usize);

impl NodeHandle {
    /// Arena slot of the node
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node of the scene hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Id assigned when the node was last attached (the root has id 0)
    pub id: usize,
    /// Node name
    pub name: String,
    /// Local transformation relative to the parent
    pub transformation: Transformation,
    /// Mesh indices instanced by this node; the same index may appear twice
    pub mesh_indices: Vec<usize>,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
}

impl Node {
    fn new(id: usize) -> Self {
        Self {
            id,
            name: String::new(),
            transformation: Transformation::new(),
            mesh_indices: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// The parent node, if attached
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// Child nodes in insertion order
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Returns true if the node has neither children nor meshes
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.mesh_indices.is_empty()
    }

    /// Returns true for a leaf with exactly one mesh
    pub fn is_mesh_node(&self) -> bool {
        self.children.is_empty() && self.mesh_indices.len() == 1
    }

    /// Add a mesh instance and return its position in `mesh_indices`
    pub fn add_mesh_index(&mut self, mesh_index: usize) -> usize {
        self.mesh_indices.push(mesh_index);
        self.mesh_indices.len() - 1
    }
}

/// Arena holding every node of a model
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTree {
    nodes: Vec<Node>,
    next_id: usize,
}

impl NodeTree {
    /// Create a tree containing only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(0)],
            next_id: 1,
        }
    }

    /// The root node handle
    pub fn root(&self) -> NodeHandle {
        NodeHandle(0)
    }

    /// Allocate a detached node
    ///
    /// The node gets its id when it is attached with [`add_child_node`](Self::add_child_node).
    pub fn create_node(&mut self) -> NodeHandle {
        self.nodes.push(Node::new(0));
        NodeHandle(self.nodes.len() - 1)
    }

    /// Allocate a node and attach it under `parent` in one step
    pub fn add_new_child(&mut self, parent: NodeHandle) -> NodeHandle {
        let child = self.create_node();
        self.add_child_node(parent, child);
        child
    }

    /// Attach `child` as the last child of `parent` and assign it a fresh id
    ///
    /// A child that already has a parent is detached from it first. Returns
    /// the child's position among the parent's children. Attaching the root
    /// or attaching a node under its own descendant is ignored.
    pub fn add_child_node(&mut self, parent: NodeHandle, child: NodeHandle) -> usize {
        if child == self.root() || self.is_ancestor(child, parent) {
            return self.nodes[parent.0].children.len();
        }
        if let Some(old_parent) = self.nodes[child.0].parent {
            self.remove_child_node(old_parent, child);
        }
        let id = self.next_id;
        self.next_id += 1;
        let node = &mut self.nodes[child.0];
        node.parent = Some(parent);
        node.id = id;
        let children = &mut self.nodes[parent.0].children;
        children.push(child);
        children.len() - 1
    }

    /// Detach `child` from `parent`; the node stays in the arena unreachable
    pub fn remove_child_node(&mut self, parent: NodeHandle, child: NodeHandle) {
        let children = &mut self.nodes[parent.0].children;
        if let Some(position) = children.iter().position(|c| *c == child) {
            children.remove(position);
            self.nodes[child.0].parent = None;
        }
    }

    /// Borrow a node
    pub fn get(&self, handle: NodeHandle) -> &Node {
        &self.nodes[handle.0]
    }

    /// Mutably borrow a node
    pub fn get_mut(&mut self, handle: NodeHandle) -> &mut Node {
        &mut self.nodes[handle.0]
    }

    /// Find a reachable node by its id
    pub fn find_by_id(&self, id: usize) -> Option<NodeHandle> {
        self.enumerate(self.root())
            .into_iter()
            .find(|handle| self.get(*handle).id == id)
    }

    /// The node transformation accumulated with every ancestor's
    pub fn world_transformation(&self, handle: NodeHandle) -> Transformation {
        let mut transformation = self.get(handle).transformation;
        let mut parent = self.get(handle).parent;
        while let Some(current) = parent {
            let node = self.get(current);
            transformation.append(&node.transformation);
            parent = node.parent;
        }
        transformation
    }

    /// `start` and all its descendants in pre-order
    pub fn enumerate(&self, start: NodeHandle) -> Vec<NodeHandle> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(handle) = stack.pop() {
            result.push(handle);
            stack.extend(self.get(handle).children.iter().rev());
        }
        result
    }

    /// All descendants of `start` in pre-order, excluding `start`
    pub fn enumerate_children(&self, start: NodeHandle) -> Vec<NodeHandle> {
        let mut all = self.enumerate(start);
        all.remove(0);
        all
    }

    /// Mesh indices of `start` and its descendants, in pre-order
    pub fn enumerate_mesh_indices(&self, start: NodeHandle) -> Vec<usize> {
        self.enumerate(start)
            .into_iter()
            .flat_map(|handle| self.get(handle).mesh_indices.iter().copied())
            .collect()
    }

    fn is_ancestor(&self, candidate: NodeHandle, node: NodeHandle) -> bool {
        let mut current = Some(node);
        while let Some(handle) = current {
            if handle == candidate {
                return true;
            }
            current = self.get(handle).parent;
        }
        false
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Coord3D, Matrix};

    #[test]
    fn test_ids_follow_attach_order() {
        let mut tree = NodeTree::new();
        let a = tree.create_node();
        let b = tree.create_node();
        tree.add_child_node(tree.root(), b);
        tree.add_child_node(tree.root(), a);
        assert_eq!(tree.get(tree.root()).id, 0);
        assert_eq!(tree.get(b).id, 1);
        assert_eq!(tree.get(a).id, 2);
        assert_eq!(tree.find_by_id(2), Some(a));
    }

    #[test]
    fn test_reparenting() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let a = tree.add_new_child(root);
        let b = tree.add_new_child(root);
        tree.add_child_node(a, b);
        assert_eq!(tree.get(root).children(), &[a]);
        assert_eq!(tree.get(a).children(), &[b]);
        assert_eq!(tree.get(b).parent(), Some(a));
        assert_eq!(tree.get(b).id, 3);

        tree.remove_child_node(a, b);
        assert!(tree.get(b).parent().is_none());
        assert!(tree.get(a).is_empty());
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut tree = NodeTree::new();
        let a = tree.add_new_child(tree.root());
        let b = tree.add_new_child(a);
        tree.add_child_node(b, a);
        assert_eq!(tree.get(a).parent(), Some(tree.root()));
        assert!(tree.get(b).children().is_empty());
    }

    #[test]
    fn test_world_transformation() {
        let mut tree = NodeTree::new();
        let parent = tree.add_new_child(tree.root());
        let child = tree.add_new_child(parent);
        tree.get_mut(parent).transformation =
            Transformation::from_matrix(Matrix::translation(0.0, 0.0, 10.0));
        tree.get_mut(child).transformation =
            Transformation::from_matrix(Matrix::scale(2.0, 2.0, 2.0));
        let world = tree.world_transformation(child);
        assert_eq!(
            world.transform_coord_3d(Coord3D::new(1.0, 0.0, 0.0)),
            Coord3D::new(2.0, 0.0, 10.0)
        );
    }

    #[test]
    fn test_enumeration_order() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let a = tree.add_new_child(root);
        let a1 = tree.add_new_child(a);
        let b = tree.add_new_child(root);
        tree.get_mut(a1).add_mesh_index(0);
        tree.get_mut(b).add_mesh_index(1);
        tree.get_mut(b).add_mesh_index(1);
        assert_eq!(tree.enumerate(root), vec![root, a, a1, b]);
        assert_eq!(tree.enumerate_children(root), vec![a, a1, b]);
        assert_eq!(tree.enumerate_mesh_indices(root), vec![0, 1, 1]);
        assert!(tree.get(a1).is_mesh_node());
        assert!(!tree.get(b).is_mesh_node());
    }
}
