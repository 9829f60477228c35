//! Projection and shading: turns a [`Scene`] into [`DrawPrimitive`]s and
//! rasterizes them with a z-buffer.

use core::f32::consts::FRAC_1_PI;

use embedded_graphics_core::draw_target::DrawTarget;
use embedded_graphics_core::pixelcolor::Rgb565;
use embedded_graphics_core::prelude::{Point, Size};
use embedded_graphics_core::primitives::Rectangle;
use nalgebra::{Matrix4, Point2, Point3, Vector3, Vector4};

use crate::camera::Camera;
use crate::draw::{draw, ZBuffer, DEPTH_MAX};
use crate::error::{Error, Result};
use crate::mesh::{Material, Mesh, RenderMode};
use crate::scene::{color_to_vec, vec_to_color, DirectionalLight, Scene};
use crate::DrawPrimitive;

/// Vertices further than this many viewport sizes off-screen drop their primitive.
const GUARD_BAND: f32 = 16.0;
/// Lets lines win against faces they lie on.
const LINE_DEPTH_BIAS: u32 = 64;
/// Lets shadows win against the surface they are projected onto.
const SHADOW_DEPTH_BIAS: u32 = 128;
/// Height of the shadow plane above its receiver, in world units.
const SHADOW_OFFSET: f32 = 0.002;
const GAMMA: f32 = 2.2;

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScreenPoint {
    xy: Point2<i32>,
    depth: u32,
}

pub(crate) fn check_viewport(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidViewport { width, height });
    }
    Ok(())
}

/// Software renderer for a `width` x `height` viewport in the top-left
/// corner of a draw target.
#[derive(Debug, Clone)]
pub struct Renderer {
    pub camera: Camera,
    width: u32,
    height: u32,
    zbuffer: ZBuffer,
    frames_rendered: u64,
}

impl Renderer {
    pub fn new(width: u32, height: u32, camera: Camera) -> Result<Renderer> {
        check_viewport(width, height)?;
        Ok(Renderer {
            camera,
            width,
            height,
            zbuffer: ZBuffer::new(width, height),
            frames_rendered: 0,
        })
    }

    /// Resize the viewport and z-buffer. The camera is left alone.
    pub fn set_size(&mut self, width: u32, height: u32) -> Result<()> {
        check_viewport(width, height)?;
        self.width = width;
        self.height = height;
        self.zbuffer.resize(width, height);
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn zbuffer(&self) -> &ZBuffer {
        &self.zbuffer
    }

    fn transform_point(&self, point: &[f32; 3], matrix: &Matrix4<f32>) -> Option<ScreenPoint> {
        let clip = matrix * Vector4::new(point[0], point[1], point[2], 1.0);

        // w is the distance in front of the camera
        if clip.w < self.camera.near || clip.w > self.camera.far {
            return None;
        }
        let ndc = clip.xyz() / clip.w;

        let x = (1.0 + ndc.x) * 0.5 * self.width as f32;
        let y = (1.0 - ndc.y) * 0.5 * self.height as f32;
        let limit = GUARD_BAND * self.width.max(self.height) as f32;
        if x.abs() > limit || y.abs() > limit {
            return None;
        }

        let depth = ((ndc.z + 1.0) * 0.5).clamp(0.0, 1.0) * DEPTH_MAX as f32;
        Some(ScreenPoint {
            xy: Point2::new(x.floor() as i32, y.floor() as i32),
            depth: depth as u32,
        })
    }

    fn transform_points<const N: usize>(
        &self,
        points: [[f32; 3]; N],
        matrix: &Matrix4<f32>,
    ) -> Option<[ScreenPoint; N]> {
        let mut ret = [ScreenPoint {
            xy: Point2::origin(),
            depth: 0,
        }; N];
        for (out, p) in ret.iter_mut().zip(points.iter()) {
            *out = self.transform_point(p, matrix)?;
        }
        Some(ret)
    }

    /// Emit the primitives for `scene`: faces, then shadows, then lines and points.
    pub fn project_scene<F>(&self, scene: &Scene, mut callback: F)
    where
        F: FnMut(DrawPrimitive),
    {
        let ambient = scene.ambient();
        let lights: Vec<&DirectionalLight> = scene.directional_lights().collect();

        for (_, mesh) in scene.meshes() {
            if mesh.render_mode == RenderMode::Solid {
                self.project_solid(mesh, ambient, &lights, &mut callback);
            }
        }

        self.project_shadows(scene, ambient, &mut callback);

        for (_, mesh) in scene.meshes() {
            let mvp = self.camera.vp_matrix * mesh.model_matrix;
            match mesh.render_mode {
                RenderMode::Points => {
                    for (i, v) in mesh.geometry.vertices.iter().enumerate() {
                        if let Some(p) = self.transform_point(v, &mvp) {
                            let color = mesh.geometry.colors.get(i).copied().unwrap_or(mesh.material.color);
                            callback(DrawPrimitive::ColoredPoint(p.xy, color));
                        }
                    }
                }
                RenderMode::Lines => self.project_lines(mesh, &mvp, &mut callback),
                RenderMode::Solid => {}
            }
        }
    }

    fn project_lines<F>(&self, mesh: &Mesh, mvp: &Matrix4<f32>, callback: &mut F)
    where
        F: FnMut(DrawPrimitive),
    {
        let geometry = &mesh.geometry;
        let color_of = |i: usize| geometry.colors.get(i).copied().unwrap_or(mesh.material.color);
        let mut emit = |a: usize, b: usize| {
            let ends = [geometry.vertices[a], geometry.vertices[b]];
            if let Some([p1, p2]) = self.transform_points(ends, mvp) {
                callback(DrawPrimitive::Line {
                    points: [p1.xy, p2.xy],
                    depths: [
                        p1.depth.saturating_sub(LINE_DEPTH_BIAS),
                        p2.depth.saturating_sub(LINE_DEPTH_BIAS),
                    ],
                    color: color_of(a),
                });
            }
        };

        if !geometry.lines.is_empty() {
            for &[a, b] in &geometry.lines {
                emit(a, b);
            }
        } else {
            for &[a, b, c] in &geometry.faces {
                emit(a, b);
                emit(b, c);
                emit(c, a);
            }
        }
    }

    fn project_solid<F>(
        &self,
        mesh: &Mesh,
        ambient: Vector3<f32>,
        lights: &[&DirectionalLight],
        callback: &mut F,
    ) where
        F: FnMut(DrawPrimitive),
    {
        let geometry = &mesh.geometry;
        let mvp = self.camera.vp_matrix * mesh.model_matrix;

        for (i, face) in geometry.faces.iter().enumerate() {
            let local = face.map(|idx| geometry.vertices[idx]);
            let world = local.map(|v| mesh.similarity.transform_point(&Point3::from(v)));

            let Some(mut normal) = mesh.world_normal(i).or_else(|| {
                (world[1] - world[0])
                    .cross(&(world[2] - world[0]))
                    .try_normalize(f32::EPSILON)
            }) else {
                continue;
            };

            let centroid = Point3::from((world[0].coords + world[1].coords + world[2].coords) / 3.0);
            let view = (self.camera.position - centroid)
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(|| -self.camera.get_direction());

            if normal.dot(&view) < 0.0 {
                if mesh.material.double_sided {
                    normal = -normal;
                } else {
                    continue;
                }
            }

            if let Some([p1, p2, p3]) = self.transform_points(local, &mvp) {
                callback(DrawPrimitive::Triangle {
                    points: [p1.xy, p2.xy, p3.xy],
                    depths: [p1.depth, p2.depth, p3.depth],
                    color: shade(&mesh.material, &normal, &view, ambient, lights),
                });
            }
        }
    }

    /// Planar shadows: every shadow caster is flattened along each
    /// shadow-casting light onto the plane of every receiver. A caster's
    /// shadow is kept whole when its flattened center lands on the receiver.
    fn project_shadows<F>(&self, scene: &Scene, ambient: Vector3<f32>, callback: &mut F)
    where
        F: FnMut(DrawPrimitive),
    {
        let vp = self.camera.vp_matrix;

        for light in scene.directional_lights().filter(|l| l.cast_shadow) {
            let to_light = light.to_light();

            let receivers = scene
                .meshes()
                .filter(|(_, m)| m.receive_shadow && m.render_mode == RenderMode::Solid);
            for (receiver_id, receiver) in receivers {
                let Some(mut normal) = receiver.world_normal(0) else {
                    continue;
                };
                if normal.dot(&to_light) < 0.0 {
                    normal = -normal;
                }
                let n_dot_l = normal.dot(&to_light);
                if n_dot_l < 1e-3 {
                    continue;
                }

                let plane_point = receiver.position() + normal * SHADOW_OFFSET;
                let flatten = |p: Point3<f32>| p - to_light * ((p - plane_point).dot(&normal) / n_dot_l);

                let (min, max) = receiver.geometry.bounds();
                let to_receiver = receiver.similarity.inverse();
                let tolerance = SHADOW_OFFSET * 2.0 / receiver.similarity.scaling();
                let color = encode(linearize(receiver.material.color).component_mul(&ambient) * FRAC_1_PI);

                let casters = scene.meshes().filter(|(id, m)| {
                    *id != receiver_id && m.cast_shadow && m.render_mode == RenderMode::Solid
                });
                for (_, caster) in casters {
                    if (caster.position() - plane_point).dot(&normal) < 0.0 {
                        continue;
                    }
                    let center = to_receiver.transform_point(&flatten(caster.position()));
                    let on_receiver = (0..3).all(|k| center[k] >= min[k] - tolerance && center[k] <= max[k] + tolerance);
                    if !on_receiver {
                        continue;
                    }

                    for (i, face) in caster.geometry.faces.iter().enumerate() {
                        if caster.world_normal(i).is_some_and(|n| n.dot(&to_light) <= 0.0) {
                            continue;
                        }
                        let flat = face.map(|idx| {
                            let p = flatten(caster.similarity.transform_point(&Point3::from(caster.geometry.vertices[idx])));
                            [p.x, p.y, p.z]
                        });
                        if let Some([p1, p2, p3]) = self.transform_points(flat, &vp) {
                            callback(DrawPrimitive::Triangle {
                                points: [p1.xy, p2.xy, p3.xy],
                                depths: [p1.depth, p2.depth, p3.depth].map(|d| d.saturating_sub(SHADOW_DEPTH_BIAS)),
                                color,
                            });
                        }
                    }
                }
            }
        }
    }

    /// Clear the viewport to the scene background and draw `scene` into `target`.
    pub fn render<D>(&mut self, scene: &Scene, target: &mut D) -> core::result::Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.frames_rendered += 1;

        let mut primitives = Vec::new();
        self.project_scene(scene, |p| primitives.push(p));

        self.zbuffer.clear();
        let viewport = Rectangle::new(Point::zero(), Size::new(self.width, self.height));
        target.fill_solid(&viewport, scene.background)?;

        for primitive in primitives {
            draw(primitive, target, &mut self.zbuffer)?;
        }
        Ok(())
    }
}

fn linearize(color: Rgb565) -> Vector3<f32> {
    color_to_vec(color).map(|c| c.powf(GAMMA))
}

fn encode(linear: Vector3<f32>) -> Rgb565 {
    vec_to_color(linear.map(|c| c.max(0.0).powf(1.0 / GAMMA)))
}

/// Flat shading: Lambert diffuse plus a Blinn-Phong highlight whose
/// sharpness follows roughness and whose tint follows metalness.
fn shade(
    material: &Material,
    normal: &Vector3<f32>,
    view: &Vector3<f32>,
    ambient: Vector3<f32>,
    lights: &[&DirectionalLight],
) -> Rgb565 {
    let base = linearize(material.color);
    let diffuse = base * (1.0 - material.metalness);
    let specular = Vector3::repeat(0.04).lerp(&base, material.metalness);

    let r = material.roughness.max(0.1);
    let shininess = (2.0 / (r * r * r * r) - 2.0).clamp(1.0, 2048.0);

    let mut out = ambient.component_mul(&diffuse) * FRAC_1_PI;
    for light in lights {
        let l = light.to_light();
        let n_dot_l = normal.dot(&l);
        if n_dot_l <= 0.0 {
            continue;
        }
        let irradiance = color_to_vec(light.color) * (light.intensity * n_dot_l);
        let half = (l + view).try_normalize(f32::EPSILON).unwrap_or(*normal);
        let highlight = normal.dot(&half).max(0.0).powf(shininess) * (shininess * 0.5 + 1.0) * FRAC_1_PI;
        let brdf = diffuse * FRAC_1_PI + specular * highlight;
        out += irradiance.component_mul(&brdf);
    }
    encode(out)
}
