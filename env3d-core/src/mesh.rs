/// Meshes: immutable triangle geometry loaded from files or generated
use std::f32::consts::TAU;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Result, SceneError};
use crate::geometry::{Triangle, Vector3D};
use crate::handle::{HandleId, ResourceHandle};
use crate::rasterizer::MeshSnapshot;
use crate::stl;

/// Where a mesh's geometry came from
#[derive(Debug, Clone, PartialEq)]
pub enum MeshSource {
    File(PathBuf),
    Bytes,
    Box { width: f32, height: f32, depth: f32 },
    Cylinder { radius1: f32, radius2: f32, length: f32, slices: u32, stacks: u32 },
}

struct MeshInner {
    handle: ResourceHandle,
    source: MeshSource,
    triangles: Arc<[Triangle]>,
}

/// Handle to a mesh; clones refer to the same mesh
#[derive(Clone)]
pub struct Mesh {
    inner: Arc<MeshInner>,
}

impl Mesh {
    fn from_triangles(source: MeshSource, triangles: Vec<Triangle>) -> Self {
        let handle = ResourceHandle::acquire("Mesh");
        log::debug!("Mesh {} created with {} triangles", handle.id(), triangles.len());
        Self {
            inner: Arc::new(MeshInner {
                handle,
                source,
                triangles: triangles.into(),
            }),
        }
    }

    /// Loads an STL file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SceneError::NotFound(path.to_path_buf()),
            _ => SceneError::MeshParse(format!("{}: {e}", path.display())),
        })?;
        let triangles = stl::parse_stl(&data)?;
        Ok(Self::from_triangles(MeshSource::File(path.to_path_buf()), triangles))
    }

    pub fn from_stl_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self::from_triangles(MeshSource::Bytes, stl::parse_stl(data)?))
    }

    /// An axis-aligned box centered around the origin
    pub fn create_box(width: f32, height: f32, depth: f32) -> Result<Self> {
        if !(width > 0.0 && height > 0.0 && depth > 0.0) {
            return Err(SceneError::InvalidArgument(format!(
                "box dimensions must be positive, got {width} x {height} x {depth}"
            )));
        }
        let (x, y, z) = (width / 2.0, height / 2.0, depth / 2.0);
        let corner = |sx: f32, sy: f32, sz: f32| Vector3D::new(sx * x, sy * y, sz * z);

        // Each face as a quad wound so the normal points outwards
        let quads = [
            // Front (-Z)
            [corner(-1.0, -1.0, -1.0), corner(-1.0, 1.0, -1.0), corner(1.0, 1.0, -1.0), corner(1.0, -1.0, -1.0)],
            // Back (+Z)
            [corner(1.0, -1.0, 1.0), corner(1.0, 1.0, 1.0), corner(-1.0, 1.0, 1.0), corner(-1.0, -1.0, 1.0)],
            // Top (+Y)
            [corner(-1.0, 1.0, -1.0), corner(-1.0, 1.0, 1.0), corner(1.0, 1.0, 1.0), corner(1.0, 1.0, -1.0)],
            // Bottom (-Y)
            [corner(-1.0, -1.0, 1.0), corner(-1.0, -1.0, -1.0), corner(1.0, -1.0, -1.0), corner(1.0, -1.0, 1.0)],
            // Right (+X)
            [corner(1.0, -1.0, -1.0), corner(1.0, 1.0, -1.0), corner(1.0, 1.0, 1.0), corner(1.0, -1.0, 1.0)],
            // Left (-X)
            [corner(-1.0, -1.0, 1.0), corner(-1.0, 1.0, 1.0), corner(-1.0, 1.0, -1.0), corner(-1.0, -1.0, -1.0)],
        ];

        let mut triangles = Vec::with_capacity(12);
        for [a, b, c, d] in quads {
            triangles.push(Triangle::new(a, c, b));
            triangles.push(Triangle::new(a, d, c));
        }
        Ok(Self::from_triangles(MeshSource::Box { width, height, depth }, triangles))
    }

    /// A cylinder along the Z-axis, centered around the origin
    ///
    /// `radius1` is the radius at -Z, `radius2` at +Z; either may be zero for a cone.
    pub fn create_cylinder(radius1: f32, radius2: f32, length: f32, slices: u32, stacks: u32) -> Result<Self> {
        if radius1 < 0.0 || radius2 < 0.0 || length <= 0.0 || slices < 3 || stacks < 1 {
            return Err(SceneError::InvalidArgument(format!(
                "invalid cylinder: radii ({radius1}, {radius2}), length {length}, {slices} slices, {stacks} stacks"
            )));
        }
        let ring = |stack: u32, slice: u32| {
            let t = stack as f32 / stacks as f32;
            let radius = radius1 + (radius2 - radius1) * t;
            let angle = TAU * (slice % slices) as f32 / slices as f32;
            Vector3D::new(radius * angle.cos(), radius * angle.sin(), -length / 2.0 + length * t)
        };

        let mut triangles = Vec::new();
        for stack in 0..stacks {
            for slice in 0..slices {
                let a = ring(stack, slice);
                let b = ring(stack, slice + 1);
                let c = ring(stack + 1, slice + 1);
                let d = ring(stack + 1, slice);
                triangles.push(Triangle::new(a, b, c));
                triangles.push(Triangle::new(a, c, d));
            }
        }

        // End caps
        let bottom = Vector3D::new(0.0, 0.0, -length / 2.0);
        let top = Vector3D::new(0.0, 0.0, length / 2.0);
        for slice in 0..slices {
            if radius1 > 0.0 {
                triangles.push(Triangle::new(bottom, ring(0, slice + 1), ring(0, slice)));
            }
            if radius2 > 0.0 {
                triangles.push(Triangle::new(top, ring(stacks, slice), ring(stacks, slice + 1)));
            }
        }

        Ok(Self::from_triangles(
            MeshSource::Cylinder { radius1, radius2, length, slices, stacks },
            triangles,
        ))
    }

    pub fn id(&self) -> HandleId {
        self.inner.handle.id()
    }

    pub fn source(&self) -> &MeshSource {
        &self.inner.source
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.inner.triangles
    }

    pub(crate) fn ensure_live(&self) -> Result<HandleId> {
        self.inner.handle.ensure_live()
    }

    pub(crate) fn snapshot(&self) -> Result<MeshSnapshot> {
        Ok(MeshSnapshot {
            id: self.ensure_live()?,
            triangles: Arc::clone(&self.inner.triangles),
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.handle.is_disposed()
    }

    pub fn dispose(&self) -> Result<()> {
        self.inner.handle.release().map(|_| ())
    }
}

impl PartialEq for Mesh {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Mesh {}

impl fmt::Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("id", &self.id())
            .field("source", &self.inner.source)
            .field("triangles", &self.inner.triangles.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_normals_point_outwards() {
        let mesh = Mesh::create_box(2.0, 2.0, 2.0).unwrap();
        assert_eq!(mesh.triangles().len(), 12);
        for triangle in mesh.triangles() {
            let [a, b, c] = triangle.positions;
            let center = (a + b + c) * (1.0 / 3.0);
            assert!(center.dot(triangle.normal) > 0.0, "inward normal on {triangle:?}");
        }
    }

    #[test]
    fn test_box_rejects_bad_dimensions() {
        assert!(matches!(
            Mesh::create_box(0.0, 1.0, 1.0),
            Err(SceneError::InvalidArgument(_))
        ));
        assert!(Mesh::create_box(f32::NAN, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_cylinder_triangle_count() {
        let mesh = Mesh::create_cylinder(1.0, 1.0, 2.0, 8, 2).unwrap();
        // Sides: slices * stacks * 2, caps: slices each
        assert_eq!(mesh.triangles().len(), 8 * 2 * 2 + 8 * 2);

        let cone = Mesh::create_cylinder(1.0, 0.0, 2.0, 8, 1).unwrap();
        assert_eq!(cone.triangles().len(), 8 * 2 + 8);

        assert!(Mesh::create_cylinder(1.0, 1.0, 2.0, 2, 1).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Mesh::from_file("/no/such/mesh.stl"),
            Err(SceneError::NotFound(_))
        ));
    }

    #[test]
    fn test_from_file_roundtrip_through_disk() {
        let path = std::env::temp_dir().join(format!("env3d-mesh-{}.stl", std::process::id()));
        std::fs::write(
            &path,
            "solid t\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\nendloop\nendfacet\nendsolid t\n",
        )
        .unwrap();

        let mesh = Mesh::from_file(&path).unwrap();
        assert_eq!(mesh.triangles().len(), 1);
        assert_eq!(mesh.source(), &MeshSource::File(path.clone()));
        mesh.dispose().unwrap();
        assert!(mesh.dispose().is_err());

        std::fs::remove_file(&path).unwrap();
    }
}
