//! Scene graph: a flat, append-only list of meshes plus the lights that shade them.

use embedded_graphics_core::pixelcolor::{Rgb565, RgbColor};
use nalgebra::{Point3, Vector3};

use crate::mesh::Mesh;

/// Index of a mesh within a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(usize);

impl MeshId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Uniform light reaching every face regardless of orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Rgb565,
    pub intensity: f32,
}

/// Parallel light shining from `position` toward `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Rgb565,
    pub intensity: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub cast_shadow: bool,
}

impl DirectionalLight {
    pub fn new(color: Rgb565, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            position: Point3::new(0.0, 1.0, 0.0),
            target: Point3::origin(),
            cast_shadow: false,
        }
    }

    /// Unit vector pointing from the lit surface toward the light.
    pub fn to_light(&self) -> Vector3<f32> {
        (self.position - self.target)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient(AmbientLight),
    Directional(DirectionalLight),
}

#[derive(Debug, Clone)]
pub struct Scene {
    meshes: Vec<Mesh>,
    lights: Vec<Light>,
    pub background: Rgb565,
    /// Scene origin; the pointer projection plane passes through it.
    pub position: Point3<f32>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            lights: Vec::new(),
            background: Rgb565::BLACK,
            position: Point3::origin(),
        }
    }

    pub fn add(&mut self, mesh: Mesh) -> MeshId {
        let id = MeshId(self.meshes.len());
        self.meshes.push(mesh);
        id
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0)
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.get_mut(id.0)
    }

    pub fn meshes(&self) -> impl Iterator<Item = (MeshId, &Mesh)> {
        self.meshes.iter().enumerate().map(|(i, m)| (MeshId(i), m))
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn directional_lights(&self) -> impl Iterator<Item = &DirectionalLight> {
        self.lights.iter().filter_map(|l| match l {
            Light::Directional(d) => Some(d),
            Light::Ambient(_) => None,
        })
    }

    /// Sum of ambient light, per color channel, in `0.0..`.
    pub fn ambient(&self) -> Vector3<f32> {
        self.lights
            .iter()
            .filter_map(|l| match l {
                Light::Ambient(a) => Some(color_to_vec(a.color) * a.intensity),
                Light::Directional(_) => None,
            })
            .sum()
    }
}

/// Rgb565 to linear-ish `0.0..=1.0` channels.
#[inline]
pub fn color_to_vec(color: Rgb565) -> Vector3<f32> {
    Vector3::new(
        color.r() as f32 / Rgb565::MAX_R as f32,
        color.g() as f32 / Rgb565::MAX_G as f32,
        color.b() as f32 / Rgb565::MAX_B as f32,
    )
}

/// `0.0..=1.0` channels back to Rgb565, clamping out-of-range values.
#[inline]
pub fn vec_to_color(v: Vector3<f32>) -> Rgb565 {
    Rgb565::new(
        (v.x.clamp(0.0, 1.0) * Rgb565::MAX_R as f32).round() as u8,
        (v.y.clamp(0.0, 1.0) * Rgb565::MAX_G as f32).round() as u8,
        (v.z.clamp(0.0, 1.0) * Rgb565::MAX_B as f32).round() as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives;
    use embedded_graphics_core::pixelcolor::WebColors;
    use std::rc::Rc;

    #[test]
    fn test_add_and_lookup_meshes() {
        let mut scene = Scene::new();
        let geometry = Rc::new(primitives::axes(1.0));
        let a = scene.add(Mesh::new(geometry.clone()).unwrap());
        let b = scene.add(Mesh::new(geometry).unwrap());

        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(scene.mesh_count(), 2);
        assert!(scene.mesh(b).is_some());
        assert_eq!(scene.meshes().count(), 2);
    }

    #[test]
    fn test_ambient_sums_lights() {
        let mut scene = Scene::new();
        assert_eq!(scene.ambient(), Vector3::zeros());

        scene.add_light(Light::Ambient(AmbientLight {
            color: Rgb565::WHITE,
            intensity: 0.5,
        }));
        scene.add_light(Light::Ambient(AmbientLight {
            color: Rgb565::WHITE,
            intensity: 0.25,
        }));
        scene.add_light(Light::Directional(DirectionalLight::new(Rgb565::WHITE, 1.0)));

        let ambient = scene.ambient();
        assert!((ambient.x - 0.75).abs() < 1e-6);
        assert_eq!(scene.directional_lights().count(), 1);
    }

    #[test]
    fn test_directional_light_direction() {
        let mut light = DirectionalLight::new(Rgb565::WHITE, 0.8);
        light.position = Point3::new(0.0, 50.0, 0.0);
        assert!((light.to_light() - Vector3::y()).norm() < 1e-6);
    }

    #[test]
    fn test_color_roundtrip() {
        for color in [Rgb565::CSS_RED, Rgb565::WHITE, Rgb565::CSS_SKY_BLUE, Rgb565::BLACK] {
            assert_eq!(vec_to_color(color_to_vec(color)), color);
        }
    }
}
