//! The application context tying scene, physics, camera and input together.

use std::rc::Rc;

use embedded_graphics_core::draw_target::DrawTarget;
use embedded_graphics_core::pixelcolor::{Rgb565, Rgb888, RgbColor};
use log::{debug, info, warn};
use nalgebra::{Point3, UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::camera::Camera;
use crate::config::SceneConfig;
use crate::controls::OrbitControls;
use crate::error::{Error, Result};
use crate::input::InputEvent;
use crate::mesh::{Geometry, Material, Mesh};
use crate::perf::{FrameStats, Phase};
use crate::physics::{sync_body_to_mesh, BodyId, Collider, ContactMaterial, MaterialId, PhysicsWorld, RigidBody};
use crate::picking::PointerProjector;
use crate::primitives;
use crate::render::{check_viewport, Renderer};
use crate::scene::{AmbientLight, DirectionalLight, Light, MeshId, Scene};
use crate::store::WorldState;

/// The static ground: one mesh, one body and the material every sphere's
/// contact rule is paired with. Not part of the [`WorldState`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ground {
    pub mesh: MeshId,
    pub body: BodyId,
    pub material: MaterialId,
}

/// Everything the click-to-drop scene needs, owned in one place.
pub struct SphereDrop {
    config: SceneConfig,
    scene: Scene,
    physics: PhysicsWorld,
    renderer: Renderer,
    controls: OrbitControls,
    projector: PointerProjector,
    store: WorldState,
    ground: Ground,
    sphere_geometry: Rc<Geometry>,
    rng: StdRng,
    stats: FrameStats,
    draw_failed: bool,
}

impl SphereDrop {
    /// Build the stock scene: lights, helpers, ground and camera.
    pub fn new(config: SceneConfig) -> Result<SphereDrop> {
        check_viewport(config.width, config.height)?;

        let mut camera = Camera::perspective(config.fov_degrees, config.aspect_ratio(), config.near, config.far);
        camera.look_at(config.camera_position, Point3::origin());
        let mut renderer = Renderer::new(config.width, config.height, camera)?;

        let mut controls = OrbitControls::new(Point3::origin(), config.height);
        controls.update(&mut renderer.camera);

        let mut scene = Scene::new();
        scene.background = config.background;
        scene.add_light(Light::Ambient(AmbientLight {
            color: Rgb565::WHITE,
            intensity: config.ambient_intensity,
        }));
        let mut sun = DirectionalLight::new(Rgb565::WHITE, config.directional_intensity);
        sun.position = config.directional_position;
        sun.cast_shadow = true;
        scene.add_light(Light::Directional(sun));

        scene.add(Mesh::new(Rc::new(primitives::axes(config.axes_size)))?);
        scene.add(Mesh::new(Rc::new(primitives::grid(
            config.grid_size,
            config.grid_divisions,
            config.grid_color,
        )))?);

        let tilt = UnitQuaternion::from_euler_angles(config.ground_tilt, 0.0, 0.0);
        let ground_geometry = primitives::plane(config.ground_size, config.ground_size, 10, 10)?;
        let mut ground_mesh = Mesh::new(Rc::new(ground_geometry))?
            .with_material(Material::standard(config.ground_color).with_double_sided(true));
        ground_mesh.receive_shadow = true;
        ground_mesh.set_rotation(tilt);
        let ground_mesh = scene.add(ground_mesh);

        let mut physics = PhysicsWorld::new();
        physics.set_gravity(config.gravity);
        physics.solver_iterations = config.solver_iterations;
        let ground_material = physics.add_material();
        let half = config.ground_size * 0.5;
        let ground_body = physics.add_body(
            RigidBody::new_static()
                .with_collider(Collider::Cuboid {
                    half_extents: Vector3::new(half, half, config.ground_half_thickness),
                })
                .with_orientation(tilt)
                .with_material(ground_material),
        );

        let sphere_geometry = Rc::new(primitives::sphere(
            config.sphere_radius,
            config.sphere_width_segments,
            config.sphere_height_segments,
        )?);

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            "scene ready: {}x{} viewport, {} meshes, gravity {:?}",
            config.width,
            config.height,
            scene.mesh_count(),
            config.gravity.as_slice()
        );

        Ok(SphereDrop {
            config,
            scene,
            physics,
            renderer,
            controls,
            projector: PointerProjector::new(),
            store: WorldState::new(),
            ground: Ground {
                mesh: ground_mesh,
                body: ground_body,
                material: ground_material,
            },
            sphere_geometry,
            rng,
            stats: FrameStats::new(),
            draw_failed: false,
        })
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn camera(&self) -> &Camera {
        &self.renderer.camera
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn projector(&self) -> &PointerProjector {
        &self.projector
    }

    pub fn store(&self) -> &WorldState {
        &self.store
    }

    pub fn ground(&self) -> Ground {
        self.ground
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    fn random_color(&mut self) -> Rgb565 {
        let rgb: u32 = self.rng.gen_range(0..=0xFF_FFFF);
        Rgb888::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8).into()
    }

    /// Project a pointer position the way a pointer-down does and remember it.
    pub fn project_pointer(&mut self, x: f32, y: f32) -> Point3<f32> {
        self.projector.project(
            x,
            y,
            self.renderer.width(),
            self.renderer.height(),
            &self.renderer.camera,
            &self.scene.position,
        )
    }

    /// Create a sphere mesh and body at `position`, pair them with a fresh
    /// ground contact rule and record them in the store.
    pub fn spawn_sphere(&mut self, position: Point3<f32>) -> Result<(MeshId, BodyId)> {
        let radius = self.config.sphere_radius;
        let color = self.random_color();

        let mut mesh = Mesh::new(self.sphere_geometry.clone())?.with_material(
            Material::standard(color)
                .with_metalness(0.0)
                .with_roughness(0.0),
        );
        mesh.cast_shadow = true;
        mesh.set_position(position.x, position.y, position.z);

        let body = RigidBody::new(self.config.sphere_mass)?
            .with_position(position.coords)
            .with_collider(Collider::Sphere { radius })
            .with_inertia_sphere(radius);

        let material = self.physics.add_material();
        let body = self.physics.add_body(body.with_material(material));
        self.physics.add_contact_material(
            ContactMaterial::new(self.ground.material, material).with_restitution(self.config.sphere_restitution),
        );
        let mesh = self.scene.add(mesh);
        self.store.push_pair(mesh, body);

        debug!(
            "spawned sphere #{} at ({:.3}, {:.3}, {:.3})",
            self.store.len() - 1,
            position.x,
            position.y,
            position.z
        );
        Ok((mesh, body))
    }

    /// Advance the simulation by one frame's time step.
    pub fn step(&mut self) {
        self.physics.step_fixed(self.config.time_step, self.config.substeps);
    }

    /// Copy every body's position and orientation onto its mesh, ground included.
    pub fn sync(&mut self) -> Result<()> {
        let ground = self.ground;
        let pairs = std::iter::once((ground.mesh, ground.body)).chain(self.store.pairs());
        for (mesh_id, body_id) in pairs {
            let body = self.physics.body(body_id).ok_or(Error::UnknownBody(body_id))?;
            let mesh = self.scene.mesh_mut(mesh_id).ok_or(Error::UnknownMesh(mesh_id))?;
            sync_body_to_mesh(body, mesh);
        }
        Ok(())
    }

    /// Render the scene from the current camera.
    ///
    /// Draw target errors are logged once and otherwise ignored.
    pub fn present<D>(&mut self, target: &mut D)
    where
        D: DrawTarget<Color = Rgb565>,
        D::Error: core::fmt::Debug,
    {
        if let Err(e) = self.renderer.render(&self.scene, target) {
            if !self.draw_failed {
                warn!("drawing failed: {:?}", e);
                self.draw_failed = true;
            }
        }
    }

    /// One animation frame: controls, step, sync, present.
    pub fn frame<D>(&mut self, target: &mut D) -> Result<()>
    where
        D: DrawTarget<Color = Rgb565>,
        D::Error: core::fmt::Debug,
    {
        self.stats.start_of_frame();
        self.controls.update(&mut self.renderer.camera);
        self.stats.discard();

        self.step();
        self.stats.measure(Phase::Step);
        self.sync()?;
        self.stats.measure(Phase::Sync);
        self.present(target);
        self.stats.measure(Phase::Render);

        self.stats.finish_frame(self.store.len());
        Ok(())
    }

    /// Adopt a new viewport size and render once at that size.
    pub fn resize<D>(&mut self, width: u32, height: u32, target: &mut D) -> Result<()>
    where
        D: DrawTarget<Color = Rgb565>,
        D::Error: core::fmt::Debug,
    {
        if let Err(e) = check_viewport(width, height) {
            warn!("ignoring resize: {}", e);
            return Err(e);
        }

        let camera = &mut self.renderer.camera;
        camera.set_aspect_ratio(width as f32 / height as f32);
        camera.update_projection();
        self.renderer.set_size(width, height)?;
        self.controls.set_viewport_height(height);
        info!("resized to {}x{}", width, height);

        self.present(target);
        Ok(())
    }

    /// Dispatch one input event.
    pub fn handle_event<D>(&mut self, event: InputEvent, target: &mut D) -> Result<()>
    where
        D: DrawTarget<Color = Rgb565>,
        D::Error: core::fmt::Debug,
    {
        match event {
            InputEvent::PointerDown { x, y, button } => {
                self.project_pointer(x, y);
                self.controls.pointer_down(x, y, button);
            }
            InputEvent::PointerMove { x, y } => self.controls.pointer_move(x, y, &self.renderer.camera),
            InputEvent::PointerUp { .. } => self.controls.pointer_up(),
            InputEvent::Click { .. } => {
                self.spawn_sphere(self.projector.last_point())?;
            }
            InputEvent::Wheel { delta } => self.controls.wheel(delta),
            InputEvent::Resize { width, height } => self.resize(width, height, target)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::RenderMode;
    use crate::physics::BodyType;

    fn app() -> SphereDrop {
        SphereDrop::new(SceneConfig::default().with_seed(1)).unwrap()
    }

    #[test]
    fn test_stock_scene_contents() {
        let app = app();
        let scene = app.scene();
        assert_eq!(scene.mesh_count(), 3);
        assert_eq!(scene.lights().len(), 2);
        assert!(scene.directional_lights().all(|l| l.cast_shadow));

        let ground = scene.mesh(app.ground().mesh).unwrap();
        assert!(ground.receive_shadow);
        assert!(ground.material.double_sided);
        assert_eq!(ground.render_mode, RenderMode::Solid);
        // Plane normal rotated from +Z to +Y
        assert!((ground.world_normal(0).unwrap() - Vector3::y()).norm() < 1e-5);

        let body = app.physics().body(app.ground().body).unwrap();
        assert_eq!(body.body_type, BodyType::Static);
        assert_eq!(app.physics().body_count(), 1);
        assert_eq!(app.physics().solver_iterations, 10);
        assert!(app.store().is_empty());
    }

    #[test]
    fn test_camera_aims_at_origin() {
        let app = app();
        assert!((app.camera().position - Point3::new(0.0, 2.0, 14.0)).norm() < 1e-4);
        assert_eq!(app.camera().target(), Point3::origin());
    }

    #[test]
    fn test_zero_viewport_config_rejected() {
        let result = SphereDrop::new(SceneConfig::default().with_viewport(0, 480));
        assert!(matches!(result, Err(Error::InvalidViewport { .. })));
    }

    #[test]
    fn test_spawn_registers_body_mesh_and_rule() {
        let mut app = app();
        let (mesh, body) = app.spawn_sphere(Point3::new(1.0, 3.0, 0.0)).unwrap();

        assert_eq!(app.store().pairs().collect::<Vec<_>>(), vec![(mesh, body)]);
        assert_eq!(app.physics().contact_material_count(), 1);

        let sphere = app.scene().mesh(mesh).unwrap();
        assert!(sphere.cast_shadow);
        assert_eq!(sphere.material.metalness, 0.0);
        assert_eq!(sphere.material.roughness, 0.0);
        assert_eq!(sphere.position(), Point3::new(1.0, 3.0, 0.0));

        let rb = app.physics().body(body).unwrap();
        assert_eq!(rb.mass, 0.3);
        assert_eq!(rb.collider, Some(Collider::Sphere { radius: 0.125 }));
        let rule = app.physics().contact_material(rb.material, app.ground().material);
        assert_eq!(rule.restitution, 0.3);
        assert_ne!(rb.material, app.ground().material);
    }

    #[test]
    fn test_seeded_colors_are_reproducible() {
        let mut a = app();
        let mut b = app();
        for _ in 0..3 {
            assert_eq!(a.random_color(), b.random_color());
        }
    }

    #[test]
    fn test_bad_sphere_config_leaves_world_untouched() {
        let mut config = SceneConfig::default();
        config.sphere_mass = 0.0;
        let mut app = SphereDrop::new(config).unwrap();

        assert!(matches!(app.spawn_sphere(Point3::origin()), Err(Error::InvalidBody(_))));
        assert_eq!(app.physics().body_count(), 1);
        assert_eq!(app.physics().contact_material_count(), 0);
        assert_eq!(app.scene().mesh_count(), 3);
        assert!(app.store().is_empty());
    }
}
