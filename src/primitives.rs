//! Procedural geometry for the demo scene: spheres, planes, and the grid
//! and axes helpers.

use core::f32::consts::PI;

use embedded_graphics_core::pixelcolor::{Rgb565, WebColors};
use nalgebra::Vector3;

use crate::error::{Error, Result};
use crate::mesh::Geometry;

/// UV sphere centered on the origin.
///
/// `width_segments` slices around the Y axis, `height_segments` stacks from
/// pole to pole. Faces are wound so their normals point outward.
pub fn sphere(radius: f32, width_segments: usize, height_segments: usize) -> Result<Geometry> {
    if !(radius > 0.0 && radius.is_finite()) {
        return Err(Error::InvalidGeometry(format!("sphere radius {radius}")));
    }
    let w = width_segments.max(3);
    let h = height_segments.max(2);

    let mut vertices = Vec::with_capacity((w + 1) * (h + 1));
    for iy in 0..=h {
        let theta = iy as f32 / h as f32 * PI;
        for ix in 0..=w {
            let phi = ix as f32 / w as f32 * 2.0 * PI;
            vertices.push([
                -radius * phi.cos() * theta.sin(),
                radius * theta.cos(),
                radius * phi.sin() * theta.sin(),
            ]);
        }
    }

    let index = |ix: usize, iy: usize| iy * (w + 1) + ix;
    let mut faces = Vec::with_capacity(w * h * 2);
    for iy in 0..h {
        for ix in 0..w {
            let a = index(ix + 1, iy);
            let b = index(ix, iy);
            let c = index(ix, iy + 1);
            let d = index(ix + 1, iy + 1);
            // The pole rows collapse to a point, so only one triangle per quad survives there.
            if iy != 0 {
                faces.push([a, b, d]);
            }
            if iy != h - 1 {
                faces.push([b, c, d]);
            }
        }
    }

    for face in faces.iter_mut() {
        let [a, b, c] = face.map(|i| Vector3::from(vertices[i]));
        let outward = (a + b + c) / 3.0;
        if (b - a).cross(&(c - a)).dot(&outward) < 0.0 {
            face.swap(1, 2);
        }
    }

    let mut geometry = Geometry {
        vertices,
        faces,
        ..Geometry::default()
    };
    geometry.compute_face_normals();
    Ok(geometry)
}

/// Rectangle in the XY plane facing +Z, centered on the origin.
pub fn plane(width: f32, height: f32, width_segments: usize, height_segments: usize) -> Result<Geometry> {
    if !(width > 0.0 && height > 0.0) {
        return Err(Error::InvalidGeometry(format!("plane {width}x{height}")));
    }
    let sx = width_segments.max(1);
    let sy = height_segments.max(1);

    let mut vertices = Vec::with_capacity((sx + 1) * (sy + 1));
    for iy in 0..=sy {
        let y = iy as f32 / sy as f32 * height - height * 0.5;
        for ix in 0..=sx {
            let x = ix as f32 / sx as f32 * width - width * 0.5;
            vertices.push([x, y, 0.0]);
        }
    }

    let index = |ix: usize, iy: usize| iy * (sx + 1) + ix;
    let mut faces = Vec::with_capacity(sx * sy * 2);
    for iy in 0..sy {
        for ix in 0..sx {
            let a = index(ix, iy);
            let b = index(ix + 1, iy);
            let c = index(ix + 1, iy + 1);
            let d = index(ix, iy + 1);
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }

    let normals = vec![[0.0, 0.0, 1.0]; faces.len()];
    Ok(Geometry {
        vertices,
        faces,
        normals,
        ..Geometry::default()
    })
}

/// Square line grid in the XZ plane with `divisions` cells per side.
pub fn grid(size: f32, divisions: usize, color: Rgb565) -> Geometry {
    let divisions = divisions.max(1);
    let half = size * 0.5;
    let step = size / divisions as f32;

    let mut vertices = Vec::with_capacity((divisions + 1) * 4);
    let mut lines = Vec::with_capacity((divisions + 1) * 2);
    for i in 0..=divisions {
        let k = -half + i as f32 * step;
        let base = vertices.len();
        vertices.push([-half, 0.0, k]);
        vertices.push([half, 0.0, k]);
        vertices.push([k, 0.0, -half]);
        vertices.push([k, 0.0, half]);
        lines.push([base, base + 1]);
        lines.push([base + 2, base + 3]);
    }

    let colors = vec![color; vertices.len()];
    Geometry {
        vertices,
        lines,
        colors,
        ..Geometry::default()
    }
}

/// Three axis lines from the origin: X red, Y green, Z blue.
pub fn axes(size: f32) -> Geometry {
    Geometry {
        vertices: vec![
            [0.0, 0.0, 0.0],
            [size, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [0.0, size, 0.0],
            [0.0, 0.0, 0.0],
            [0.0, 0.0, size],
        ],
        lines: vec![[0, 1], [2, 3], [4, 5]],
        colors: vec![
            Rgb565::CSS_RED,
            Rgb565::CSS_RED,
            Rgb565::CSS_LIME,
            Rgb565::CSS_LIME,
            Rgb565::CSS_BLUE,
            Rgb565::CSS_BLUE,
        ],
        ..Geometry::default()
    }
}
