//! Orbit camera controls: rotate around a target, pan it, dolly toward it.

use core::f32::consts::PI;

use nalgebra::{Point3, Vector3};

use crate::camera::Camera;
use crate::input::PointerButton;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drag {
    None,
    Rotate,
    Pan,
}

/// Spherical offset of the camera from the orbit target.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    /// Angle from +Y.
    phi: f32,
    /// Angle around +Y, measured from +Z.
    theta: f32,
}

impl Spherical {
    fn from_offset(v: &Vector3<f32>) -> Self {
        let radius = v.norm();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
            theta: v.x.atan2(v.z),
        }
    }

    fn to_offset(self) -> Vector3<f32> {
        let s = self.phi.sin() * self.radius;
        Vector3::new(s * self.theta.sin(), self.phi.cos() * self.radius, s * self.theta.cos())
    }
}

/// Mouse-driven orbit controls for a [`Camera`].
///
/// Primary drag rotates, secondary drag pans, the wheel dollies.
/// Accumulated input is applied to the camera by [`OrbitControls::update`].
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub enabled: bool,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,

    viewport_height: f32,
    drag: Drag,
    last_pointer: (f32, f32),
    theta_delta: f32,
    phi_delta: f32,
    scale: f32,
    pan_offset: Vector3<f32>,
}

impl OrbitControls {
    pub fn new(target: Point3<f32>, viewport_height: u32) -> Self {
        Self {
            target,
            enabled: true,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            viewport_height: viewport_height.max(1) as f32,
            drag: Drag::None,
            last_pointer: (0.0, 0.0),
            theta_delta: 0.0,
            phi_delta: 0.0,
            scale: 1.0,
            pan_offset: Vector3::zeros(),
        }
    }

    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// True while a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.drag != Drag::None
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, button: PointerButton) {
        if !self.enabled {
            return;
        }
        self.drag = match button {
            PointerButton::Primary => Drag::Rotate,
            PointerButton::Secondary => Drag::Pan,
        };
        self.last_pointer = (x, y);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32, camera: &Camera) {
        if !self.enabled || self.drag == Drag::None {
            return;
        }
        let dx = x - self.last_pointer.0;
        let dy = y - self.last_pointer.1;
        self.last_pointer = (x, y);

        match self.drag {
            Drag::Rotate => {
                // A full viewport height of drag turns a full circle.
                self.theta_delta -= 2.0 * PI * dx / self.viewport_height * self.rotate_speed;
                self.phi_delta -= 2.0 * PI * dy / self.viewport_height * self.rotate_speed;
            }
            Drag::Pan => self.pan(dx, dy, camera),
            Drag::None => {}
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag = Drag::None;
    }

    /// Scrolling down (positive `delta`, wheel toward the user) dollies the
    /// camera away from the target; scrolling up dollies it in.
    pub fn wheel(&mut self, delta: f32) {
        if !self.enabled || delta == 0.0 {
            return;
        }
        let step = 0.95f32.powf(self.zoom_speed);
        if delta > 0.0 {
            self.scale /= step;
        } else {
            self.scale *= step;
        }
    }

    fn pan(&mut self, dx: f32, dy: f32, camera: &Camera) {
        let offset = camera.position - self.target;
        // Scale so the point under the cursor at the target depth tracks the pointer.
        let target_distance = offset.norm() * (camera.fovy() * 0.5).tan();
        let units_per_pixel = 2.0 * target_distance / self.viewport_height * self.pan_speed;

        let forward = -offset.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::z);
        let right = forward
            .cross(&Vector3::y())
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::x);
        let up = right.cross(&forward);

        self.pan_offset += -right * dx * units_per_pixel + up * dy * units_per_pixel;
    }

    /// Apply accumulated rotation, pan and dolly to `camera`. Returns true if
    /// the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let offset = camera.position - self.target;
        let mut spherical = Spherical::from_offset(&offset);

        spherical.theta += self.theta_delta;
        spherical.phi = (spherical.phi + self.phi_delta)
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(1e-6, PI - 1e-6);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        self.target += self.pan_offset;
        let position = self.target + spherical.to_offset();

        self.theta_delta = 0.0;
        self.phi_delta = 0.0;
        self.scale = 1.0;
        self.pan_offset = Vector3::zeros();

        let moved = (position - camera.position).norm_squared() > 1e-8 || camera.target() != self.target;
        if moved {
            camera.look_at(position, self.target);
        }
        moved
    }
}
