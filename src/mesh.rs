use std::rc::Rc;

use embedded_graphics_core::pixelcolor::{Rgb565, RgbColor};
use log::error;
use nalgebra::{Matrix4, Point3, Similarity3, UnitQuaternion, Vector3};

use crate::error::{Error, Result};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum RenderMode {
    Points,
    /// Explicit line list, or the edges of every face when the geometry has no lines.
    Lines,
    /// Flat-shaded faces lit by the scene lights.
    Solid,
}

/// Vertex data shared by any number of meshes.
///
/// `normals` holds one normal per face. `colors`, when present, holds one
/// color per vertex and overrides the material color for points and lines.
#[derive(Debug, Default, Clone)]
pub struct Geometry {
    pub vertices: Vec<[f32; 3]>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub lines: Vec<[usize; 2]>,
    pub colors: Vec<Rgb565>,
}

impl Geometry {
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| {
            error!("{}", msg);
            Err(Error::InvalidGeometry(msg.to_string()))
        };

        if self.vertices.is_empty() {
            return fail("vertices are empty");
        }

        let n = self.vertices.len();
        if self.faces.iter().flatten().any(|&i| i >= n) {
            return fail("face vertices are out of bounds");
        }
        if self.lines.iter().flatten().any(|&i| i >= n) {
            return fail("line vertices are out of bounds");
        }
        if !self.normals.is_empty() && self.normals.len() != self.faces.len() {
            return fail("normals are not the same length as faces");
        }
        if !self.colors.is_empty() && self.colors.len() != n {
            return fail("colors are not the same length as vertices");
        }

        Ok(())
    }

    /// Axis-aligned bounds in model space as `(min, max)`.
    pub fn bounds(&self) -> (Vector3<f32>, Vector3<f32>) {
        let mut min = Vector3::repeat(f32::INFINITY);
        let mut max = Vector3::repeat(f32::NEG_INFINITY);
        for v in &self.vertices {
            let v = Vector3::from(*v);
            min = min.inf(&v);
            max = max.sup(&v);
        }
        (min, max)
    }

    /// Fill `normals` from the winding of each face (counter-clockwise is front).
    pub fn compute_face_normals(&mut self) {
        self.normals = self
            .faces
            .iter()
            .map(|f| {
                let a = Vector3::from(self.vertices[f[0]]);
                let b = Vector3::from(self.vertices[f[1]]);
                let c = Vector3::from(self.vertices[f[2]]);
                let n = (b - a).cross(&(c - a));
                let n = n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::y);
                [n.x, n.y, n.z]
            })
            .collect();
    }
}

/// Surface appearance, modeled on a metal/roughness material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: Rgb565,
    /// 0.0 = dielectric, 1.0 = metal. Metals tint their highlight with `color`.
    pub metalness: f32,
    /// 0.0 = mirror-sharp highlight, 1.0 = no highlight.
    pub roughness: f32,
    /// Render back faces instead of culling them.
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Rgb565::WHITE,
            metalness: 0.0,
            roughness: 1.0,
            double_sided: false,
        }
    }
}

impl Material {
    pub fn standard(color: Rgb565) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    pub fn with_metalness(mut self, metalness: f32) -> Self {
        self.metalness = metalness.clamp(0.0, 1.0);
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn with_double_sided(mut self, double_sided: bool) -> Self {
        self.double_sided = double_sided;
        self
    }
}

/// A drawable object: shared geometry placed in the world by a similarity transform.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub similarity: Similarity3<f32>,
    pub model_matrix: Matrix4<f32>,

    pub material: Material,
    pub render_mode: RenderMode,
    pub geometry: Rc<Geometry>,

    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Mesh {
    pub fn new(geometry: Rc<Geometry>) -> Result<Mesh> {
        geometry.validate()?;
        let sim = Similarity3::identity();
        let render_mode = if geometry.faces.is_empty() {
            if geometry.lines.is_empty() {
                RenderMode::Points
            } else {
                RenderMode::Lines
            }
        } else {
            RenderMode::Solid
        };
        Ok(Mesh {
            model_matrix: sim.to_homogeneous(),
            similarity: sim,
            material: Material::default(),
            render_mode,
            geometry,
            cast_shadow: false,
            receive_shadow: false,
        })
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn set_position(&mut self, x: f32, y: f32, z: f32) {
        self.similarity.isometry.translation.vector = Vector3::new(x, y, z);
        self.update_model_matrix();
    }

    pub fn position(&self) -> Point3<f32> {
        self.similarity.isometry.translation.vector.into()
    }

    pub fn set_rotation(&mut self, rotation: UnitQuaternion<f32>) {
        self.similarity.isometry.rotation = rotation;
        self.update_model_matrix();
    }

    pub fn rotation(&self) -> UnitQuaternion<f32> {
        self.similarity.isometry.rotation
    }

    fn update_model_matrix(&mut self) {
        self.model_matrix = self.similarity.to_homogeneous();
    }

    /// Face normal `i` rotated into world space.
    #[inline]
    pub fn world_normal(&self, i: usize) -> Option<Vector3<f32>> {
        let n = self.geometry.normals.get(i)?;
        Some(self.similarity.isometry.rotation * Vector3::from(*n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics_core::pixelcolor::WebColors;

    fn triangle() -> Geometry {
        Geometry {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            faces: vec![[0, 1, 2]],
            ..Geometry::default()
        }
    }

    #[test]
    fn test_geometry_validation_valid() {
        assert!(triangle().validate().is_ok());
    }

    #[test]
    fn test_geometry_validation_rejects_bad_indices() {
        let mut geometry = triangle();
        geometry.faces.push([0, 1, 3]);
        assert!(matches!(geometry.validate(), Err(Error::InvalidGeometry(_))));

        let mut geometry = triangle();
        geometry.lines.push([0, 9]);
        assert!(geometry.validate().is_err());

        assert!(Geometry::default().validate().is_err());
    }

    #[test]
    fn test_geometry_validation_rejects_mismatched_colors() {
        let mut geometry = triangle();
        geometry.colors = vec![Rgb565::CSS_RED];
        assert!(geometry.validate().is_err());
    }

    #[test]
    fn test_compute_face_normals_ccw() {
        let mut geometry = triangle();
        geometry.compute_face_normals();
        assert_eq!(geometry.normals, vec![[0.0, 0.0, 1.0]]);
    }

    #[test]
    fn test_bounds() {
        let (min, max) = triangle().bounds();
        assert_eq!(min, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Vector3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_mesh_default_render_mode_follows_geometry() {
        let mesh = Mesh::new(Rc::new(triangle())).unwrap();
        assert_eq!(mesh.render_mode, RenderMode::Solid);

        let lines = Geometry {
            vertices: vec![[0.0; 3], [1.0, 0.0, 0.0]],
            lines: vec![[0, 1]],
            ..Geometry::default()
        };
        let mesh = Mesh::new(Rc::new(lines)).unwrap();
        assert_eq!(mesh.render_mode, RenderMode::Lines);
    }

    #[test]
    fn test_mesh_transform_setters() {
        let mut mesh = Mesh::new(Rc::new(triangle())).unwrap();
        mesh.set_position(1.0, 2.0, 3.0);
        assert_eq!(mesh.position(), Point3::new(1.0, 2.0, 3.0));

        let q = UnitQuaternion::from_euler_angles(0.3, 0.0, 0.0);
        mesh.set_rotation(q);
        assert_eq!(mesh.rotation(), q);
        assert_eq!(mesh.model_matrix, mesh.similarity.to_homogeneous());
    }

    #[test]
    fn test_material_builders_clamp() {
        let m = Material::standard(Rgb565::CSS_RED)
            .with_metalness(2.0)
            .with_roughness(-1.0)
            .with_double_sided(true);
        assert_eq!(m.metalness, 1.0);
        assert_eq!(m.roughness, 0.0);
        assert!(m.double_sided);
    }
}
