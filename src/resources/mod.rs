//! Graphics resources allocated for a mounted scene.
//!
//! Geometry and material memory lives in the graphics backend; the rest of the
//! crate only sees the ids the backend hands out. [`ResourceLedger`] records
//! every id allocated during mount and guarantees each one is released exactly
//! once during teardown, including ids shared by several meshes.

pub mod geometry;
pub mod material;

use std::fmt;

use log::{debug, warn};

use crate::{
    error::SceneError,
    render::Graphics,
    resources::{geometry::GeometryDesc, material::MaterialDesc},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Geometry(GeometryId),
    Material(MaterialId),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Geometry(id) => write!(f, "geometry #{}", id.0),
            ResourceId::Material(id) => write!(f, "material #{}", id.0),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    id: ResourceId,
    released: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceLedger {
    entries: Vec<Entry>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_geometry<G: Graphics>(
        &mut self,
        graphics: &mut G,
        desc: &GeometryDesc,
    ) -> Result<GeometryId, SceneError> {
        let id = graphics.create_geometry(desc)?;
        self.record(ResourceId::Geometry(id));
        Ok(id)
    }

    pub fn create_material<G: Graphics>(
        &mut self,
        graphics: &mut G,
        desc: &MaterialDesc,
    ) -> Result<MaterialId, SceneError> {
        let id = graphics.create_material(desc)?;
        self.record(ResourceId::Material(id));
        Ok(id)
    }

    /// Track an id. Recording the same id twice keeps a single entry.
    pub fn record(&mut self, id: ResourceId) {
        if self.entries.iter().any(|e| e.id == id) {
            warn!("{} was recorded twice; it will still be released once", id);
            return;
        }
        self.entries.push(Entry {
            id,
            released: false,
        });
    }

    /// Release everything not yet released, in allocation order. Returns how
    /// many releases were issued.
    pub fn release_all<G: Graphics>(&mut self, graphics: &mut G) -> usize {
        let mut released = 0;
        for entry in self.entries.iter_mut().filter(|e| !e.released) {
            // Mark first so a panicking backend can never see the id twice.
            entry.released = true;
            match entry.id {
                ResourceId::Geometry(id) => graphics.release_geometry(id),
                ResourceId::Material(id) => graphics.release_material(id),
            }
            released += 1;
        }
        debug!("released {} graphics resources", released);
        released
    }

    pub fn allocated(&self) -> usize {
        self.entries.len()
    }

    pub fn outstanding(&self) -> usize {
        self.entries.iter().filter(|e| !e.released).count()
    }

    pub fn is_released(&self, id: ResourceId) -> Option<bool> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.released)
    }

    pub fn ids(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.entries.iter().map(|e| e.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{camera::Camera, data_structures::scene_graph::Scene, host::Size};

    #[derive(Default)]
    struct Counting {
        next: u32,
        released: Vec<ResourceId>,
    }

    impl Graphics for Counting {
        fn create_geometry(&mut self, _: &GeometryDesc) -> Result<GeometryId, SceneError> {
            self.next += 1;
            Ok(GeometryId(self.next))
        }

        fn create_material(&mut self, _: &MaterialDesc) -> Result<MaterialId, SceneError> {
            self.next += 1;
            Ok(MaterialId(self.next))
        }

        fn release_geometry(&mut self, id: GeometryId) {
            self.released.push(ResourceId::Geometry(id));
        }

        fn release_material(&mut self, id: MaterialId) {
            self.released.push(ResourceId::Material(id));
        }

        fn resize(&mut self, _: Size) {}

        fn render(&mut self, _: &Scene, _: &Camera) -> Result<(), SceneError> {
            Ok(())
        }

        fn release_context(&mut self) {}
    }

    #[test]
    fn releases_each_resource_once() {
        let mut graphics = Counting::default();
        let mut ledger = ResourceLedger::new();
        let g = ledger
            .create_geometry(&mut graphics, &GeometryDesc::cube(1.0))
            .unwrap();
        let m = ledger
            .create_material(&mut graphics, &MaterialDesc::default())
            .unwrap();
        ledger.record(ResourceId::Geometry(g));

        assert_eq!(ledger.allocated(), 2);
        assert_eq!(ledger.release_all(&mut graphics), 2);
        assert_eq!(ledger.release_all(&mut graphics), 0);
        assert_eq!(
            graphics.released,
            vec![ResourceId::Geometry(g), ResourceId::Material(m)]
        );
        assert_eq!(ledger.outstanding(), 0);
        assert_eq!(ledger.is_released(ResourceId::Material(m)), Some(true));
        assert_eq!(ledger.is_released(ResourceId::Material(MaterialId(99))), None);
    }
}
