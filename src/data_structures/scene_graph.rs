//! Scene graph and hierarchical scene organization.
//!
//! The scene is an arena of [`Node`]s addressed by [`NodeId`]. A node is a
//! group, an invisible pivot, or a drawable mesh pairing a geometry with a
//! material. Parents are always inserted before their children, so world
//! transforms resolve in a single forward pass over the arena.
//!
//! The scene does not own GPU memory: meshes only hold the ids handed out by
//! the graphics backend, and the [`crate::resources::ResourceLedger`] is
//! responsible for releasing them.

use log::warn;

use crate::{
    config::{Color, LightKind},
    data_structures::instance::Instance,
    resources::{GeometryId, MaterialId},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    /// Invisible anchor other nodes rotate or orbit around.
    Pivot,
    Mesh {
        geometry: GeometryId,
        material: MaterialId,
    },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub local: Instance,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f32,
    pub position: [f32; 3],
}

/// One mesh ready to draw, with its world transform resolved.
#[derive(Debug, Clone)]
pub struct Drawable {
    pub node: NodeId,
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub world: Instance,
}

#[derive(Debug, Clone)]
pub struct Scene {
    background: Color,
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    lights: Vec<Light>,
}

impl Scene {
    pub fn new(background: Color) -> Self {
        Self {
            background,
            nodes: Vec::new(),
            roots: Vec::new(),
            lights: Vec::new(),
        }
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn add_group(&mut self, name: &str, parent: Option<NodeId>, local: Instance) -> NodeId {
        self.add_node(name, NodeKind::Group, parent, local)
    }

    pub fn add_pivot(&mut self, name: &str, parent: Option<NodeId>, local: Instance) -> NodeId {
        self.add_node(name, NodeKind::Pivot, parent, local)
    }

    pub fn add_mesh(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        local: Instance,
        geometry: GeometryId,
        material: MaterialId,
    ) -> NodeId {
        self.add_node(name, NodeKind::Mesh { geometry, material }, parent, local)
    }

    fn add_node(
        &mut self,
        name: &str,
        kind: NodeKind,
        parent: Option<NodeId>,
        local: Instance,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = match parent {
            Some(p) if p.0 < self.nodes.len() => Some(p),
            Some(p) => {
                warn!(
                    "Node `{}` was given parent {:?}, which is not part of this scene. \
                     Attaching it to the root.",
                    name, p
                );
                None
            }
            None => None,
        };
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }
        self.nodes.push(Node {
            name: name.to_string(),
            kind,
            local,
            parent,
            children: Vec::new(),
        });
        id
    }

    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    /// Mutate a node's local transform. Unknown ids are ignored.
    pub fn transform_mut(&mut self, id: NodeId, mutation: impl FnOnce(&mut Instance)) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            mutation(&mut node.local);
        }
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut [Light] {
        &mut self.lights
    }

    /// World transform of every node, indexed by [`NodeId::index`].
    pub fn world_transforms(&self) -> Vec<Instance> {
        let mut world: Vec<Instance> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let transform = match node.parent {
                Some(parent) => &world[parent.0] * &node.local,
                None => node.local.clone(),
            };
            world.push(transform);
        }
        world
    }

    pub fn drawables(&self) -> Vec<Drawable> {
        self.world_transforms()
            .into_iter()
            .zip(self.nodes.iter().enumerate())
            .filter_map(|(world, (idx, node))| match node.kind {
                NodeKind::Mesh { geometry, material } => Some(Drawable {
                    node: NodeId(idx),
                    geometry,
                    material,
                    world,
                }),
                NodeKind::Group | NodeKind::Pivot => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Vector3};

    use super::*;

    #[test]
    fn children_follow_their_parent() {
        let mut scene = Scene::new(Color::WHITE);
        let group = scene.add_group("computer", None, Instance::from(Vector3::new(0.0, 1.0, 0.0)));
        let mesh = scene.add_mesh(
            "screen",
            Some(group),
            Instance::from(Vector3::new(0.0, 0.0, 0.5)),
            GeometryId(0),
            MaterialId(0),
        );
        scene.transform_mut(group, |g| g.position.x = 2.0);

        let world = scene.world_transforms();
        assert!((world[mesh.index()].position - Vector3::new(2.0, 1.0, 0.5)).magnitude() < 1e-6);
        assert_eq!(scene.roots(), &[group]);
        assert_eq!(scene.node(group).unwrap().children(), &[mesh]);
        assert_eq!(scene.node(mesh).unwrap().parent(), Some(group));
    }

    #[test]
    fn only_meshes_are_drawable() {
        let mut scene = Scene::new(Color::WHITE);
        let pivot = scene.add_pivot("pivot", None, Instance::default());
        scene.add_mesh("moon", Some(pivot), Instance::default(), GeometryId(1), MaterialId(2));
        scene.add_mesh("sun", None, Instance::default(), GeometryId(1), MaterialId(3));

        let drawables = scene.drawables();
        assert_eq!(drawables.len(), 2);
        assert_eq!(drawables[0].geometry, GeometryId(1));
        assert_eq!(drawables[1].material, MaterialId(3));
        assert_eq!(scene.find("moon"), Some(drawables[0].node));
    }

    #[test]
    fn foreign_parent_becomes_root() {
        let mut scene = Scene::new(Color::WHITE);
        let id = scene.add_group("lost", Some(NodeId(42)), Instance::default());
        assert_eq!(scene.roots(), &[id]);
        assert_eq!(scene.node(id).unwrap().parent(), None);
    }
}
