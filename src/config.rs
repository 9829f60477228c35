//! Scene configuration.
//!
//! All constants of the demo live here so the library and the demo program
//! agree on them. [`SceneConfig::default`] reproduces the stock scene.

use core::f32::consts::FRAC_PI_2;

use embedded_graphics_core::pixelcolor::{Rgb565, RgbColor, WebColors};
use nalgebra::{Point3, Vector3};

#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Viewport size in pixels.
    pub width: u32,
    pub height: u32,

    /// Camera vertical field of view, in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub camera_position: Point3<f32>,

    pub gravity: Vector3<f32>,
    /// Simulated time advanced by one frame.
    pub time_step: f32,
    /// Equal substeps the per-frame increment is split into.
    pub substeps: u32,
    /// Contact passes per substep.
    pub solver_iterations: usize,

    pub sphere_radius: f32,
    pub sphere_mass: f32,
    /// Restitution of the contact rule registered between each sphere and the ground.
    pub sphere_restitution: f32,
    pub sphere_width_segments: usize,
    pub sphere_height_segments: usize,

    /// Edge length of the square ground plane.
    pub ground_size: f32,
    /// Half thickness of the ground collision box.
    pub ground_half_thickness: f32,
    /// Rotation of the ground about the X axis (the plane is built in XY).
    pub ground_tilt: f32,
    pub ground_color: Rgb565,

    pub ambient_intensity: f32,
    pub directional_intensity: f32,
    pub directional_position: Point3<f32>,

    pub axes_size: f32,
    pub grid_size: f32,
    pub grid_divisions: usize,
    pub grid_color: Rgb565,

    pub background: Rgb565,

    /// Seed for sphere colors. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            camera_position: Point3::new(0.0, 2.0, 14.0),
            gravity: Vector3::new(0.0, -9.18, 0.0),
            time_step: 1.0 / 60.0,
            substeps: 4,
            solver_iterations: 10,
            sphere_radius: 0.125,
            sphere_mass: 0.3,
            sphere_restitution: 0.3,
            sphere_width_segments: 30,
            sphere_height_segments: 30,
            ground_size: 10.0,
            ground_half_thickness: 0.001,
            ground_tilt: -FRAC_PI_2,
            ground_color: Rgb565::WHITE,
            ambient_intensity: 1.0,
            directional_intensity: 0.8,
            directional_position: Point3::new(0.0, 50.0, 0.0),
            axes_size: 4.0,
            grid_size: 40.0,
            grid_divisions: 40,
            grid_color: Rgb565::CSS_SKY_BLUE,
            background: Rgb565::BLACK,
            seed: None,
        }
    }
}

impl SceneConfig {
    /// Builder: fixed seed for reproducible sphere colors.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder: viewport size.
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Resting height of a sphere center on the ground.
    pub fn resting_height(&self) -> f32 {
        self.sphere_radius + self.ground_half_thickness
    }
}
