//! Click to drop spheres onto a shadowed ground plane.
//!
//! A small interactive physics scene rendered in software: a pointer click
//! is projected into the world, a sphere with a fresh physics material is
//! spawned there, and every frame the rigid-body world is stepped and the
//! meshes are synced to their bodies and drawn into any
//! [`embedded_graphics_core::draw_target::DrawTarget`].
//!
//! [`app::SphereDrop`] owns everything and is the entry point.

use embedded_graphics_core::pixelcolor::Rgb565;
use nalgebra::Point2;

pub mod app;
pub mod camera;
pub mod config;
pub mod controls;
pub mod draw;
pub mod error;
pub mod input;
pub mod mesh;
pub mod perf;
pub mod physics;
pub mod picking;
pub mod primitives;
pub mod render;
pub mod scene;
pub mod store;

pub use error::{Error, Result};

/// Screen-space output of the renderer, consumed by [`draw::draw`].
///
/// Depths are fixed-point, `0` at the near plane and [`draw::DEPTH_MAX`] at the far plane.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawPrimitive {
    ColoredPoint(Point2<i32>, Rgb565),
    Line {
        points: [Point2<i32>; 2],
        depths: [u32; 2],
        color: Rgb565,
    },
    Triangle {
        points: [Point2<i32>; 3],
        depths: [u32; 3],
        color: Rgb565,
    },
}
