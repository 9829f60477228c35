//! Rigid-body physics for the sphere-drop scene.
//!
//! Provides rigid body dynamics with linear and angular motion, gravity,
//! sphere and oriented-box colliders, and impulse-based contact response.
//! Contact response is parameterized per pair of [`MaterialId`]s through
//! [`ContactMaterial`] rules; pairs without a rule use the world's default
//! contact material.
//!
//! # Example
//! ```
//! use sphere_drop::physics::{Collider, ContactMaterial, PhysicsWorld, RigidBody};
//! use nalgebra::Vector3;
//!
//! let mut world = PhysicsWorld::new();
//! world.set_gravity(Vector3::new(0.0, -9.81, 0.0));
//!
//! let floor_mat = world.add_material();
//! let ball_mat = world.add_material();
//! world.add_contact_material(ContactMaterial::new(floor_mat, ball_mat).with_restitution(0.3));
//!
//! let floor = RigidBody::new_static()
//!     .with_collider(Collider::Cuboid { half_extents: Vector3::new(10.0, 0.1, 10.0) })
//!     .with_material(floor_mat);
//! world.add_body(floor);
//!
//! let ball = RigidBody::new(1.0)
//!     .unwrap()
//!     .with_position(Vector3::new(0.0, 10.0, 0.0))
//!     .with_collider(Collider::Sphere { radius: 0.5 })
//!     .with_material(ball_mat);
//! let id = world.add_body(ball);
//!
//! world.step(1.0 / 60.0);
//! assert!(world.body(id).unwrap().position.y < 10.0);
//! ```

use std::collections::HashMap;

use log::trace;
use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};

use crate::error::{Error, Result};
use crate::mesh::Mesh;

/// Unique identifier for a rigid body within a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(usize);

impl BodyId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Identifier of a surface material. Materials carry no data of their own;
/// they key the [`ContactMaterial`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(usize);

impl MaterialId {
    /// Material of bodies that never had one assigned.
    pub const DEFAULT: MaterialId = MaterialId(0);
}

/// Determines how a body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyType {
    /// Fully simulated: affected by forces, gravity, and velocity.
    Dynamic,
    /// Not affected by forces or gravity. Useful for floors, walls, and platforms.
    Static,
}

/// A collision shape attached to a [`RigidBody`], centered on its position
/// and rotated with its orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collider {
    Sphere { radius: f32 },
    /// A box defined by half-extents along its local axes.
    Cuboid { half_extents: Vector3<f32> },
}

/// Contact response rule between two materials.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactMaterial {
    pub materials: (MaterialId, MaterialId),
    /// Bounciness, 0.0 (inelastic) to 1.0 (elastic).
    pub restitution: f32,
    /// Coulomb friction coefficient.
    pub friction: f32,
}

impl ContactMaterial {
    pub fn new(a: MaterialId, b: MaterialId) -> Self {
        Self {
            materials: (a, b),
            restitution: 0.3,
            friction: 0.3,
        }
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution.clamp(0.0, 1.0);
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction.max(0.0);
        self
    }

    fn key(&self) -> (MaterialId, MaterialId) {
        pair_key(self.materials.0, self.materials.1)
    }
}

#[inline]
fn pair_key(a: MaterialId, b: MaterialId) -> (MaterialId, MaterialId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// A detected contact between two bodies.
#[derive(Debug, Clone)]
pub struct Contact {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Contact normal pointing from body A toward body B.
    pub normal: Vector3<f32>,
    /// Penetration depth (positive when overlapping).
    pub penetration: f32,
    /// World-space point midway through the overlap.
    pub point: Vector3<f32>,
}

/// A rigid body with linear and angular dynamics.
#[derive(Debug, Clone)]
pub struct RigidBody {
    // -- Linear state --
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub mass: f32,
    pub inv_mass: f32,
    pub body_type: BodyType,
    pub collider: Option<Collider>,
    pub material: MaterialId,

    /// Fraction of velocity lost per second, applied as `v *= (1 - damping)^dt`.
    pub damping: f32,

    // -- Angular state --
    pub orientation: UnitQuaternion<f32>,

    /// Angular velocity in world-space (radians per second).
    pub angular_velocity: Vector3<f32>,

    /// Inverse of the inertia tensor in body-local space.
    /// For static bodies this is the zero matrix.
    pub inv_inertia_local: Matrix3<f32>,

    /// Fraction of angular velocity lost per second.
    pub angular_damping: f32,
}

impl RigidBody {
    /// Create a new dynamic rigid body with the given mass.
    ///
    /// The body starts with a unit-sphere inertia tensor. Use
    /// [`RigidBody::with_inertia_sphere`] once the collider is known.
    pub fn new(mass: f32) -> Result<Self> {
        if !(mass > 0.0 && mass.is_finite()) {
            return Err(Error::InvalidBody(format!(
                "mass must be positive and finite, got {mass}"
            )));
        }
        let i = 0.4 * mass;
        let inv_i = 1.0 / i;
        Ok(Self {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            mass,
            inv_mass: 1.0 / mass,
            body_type: BodyType::Dynamic,
            collider: None,
            material: MaterialId::DEFAULT,
            damping: 0.01,
            orientation: UnitQuaternion::identity(),
            angular_velocity: Vector3::zeros(),
            inv_inertia_local: Matrix3::from_diagonal_element(inv_i),
            angular_damping: 0.01,
        })
    }

    /// Create a new static rigid body (infinite mass, unaffected by forces).
    pub fn new_static() -> Self {
        Self {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            mass: f32::INFINITY,
            inv_mass: 0.0,
            body_type: BodyType::Static,
            collider: None,
            material: MaterialId::DEFAULT,
            damping: 0.0,
            orientation: UnitQuaternion::identity(),
            angular_velocity: Vector3::zeros(),
            inv_inertia_local: Matrix3::zeros(),
            angular_damping: 0.0,
        }
    }

    pub fn with_position(mut self, position: Vector3<f32>) -> Self {
        self.position = position;
        self
    }

    pub fn with_orientation(mut self, orientation: UnitQuaternion<f32>) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.collider = Some(collider);
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = material;
        self
    }

    /// Inertia of a solid sphere: `I = (2/5) * m * r²`.
    pub fn with_inertia_sphere(mut self, radius: f32) -> Self {
        if self.body_type == BodyType::Dynamic {
            let i = 0.4 * self.mass * radius * radius;
            self.inv_inertia_local = Matrix3::from_diagonal_element(1.0 / i);
        }
        self
    }

    /// `I⁻¹_world = R * I⁻¹_local * Rᵀ`
    #[inline]
    pub fn inv_inertia_world(&self) -> Matrix3<f32> {
        let r = self.orientation.to_rotation_matrix();
        r.matrix() * self.inv_inertia_local * r.matrix().transpose()
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.norm()
    }

    /// Semi-implicit Euler: velocity first, then position and orientation.
    fn integrate(&mut self, dt: f32, gravity: Vector3<f32>) {
        if self.body_type != BodyType::Dynamic {
            return;
        }

        self.velocity += gravity * dt;
        self.velocity *= (1.0 - self.damping).powf(dt);
        self.position += self.velocity * dt;
        self.angular_velocity *= (1.0 - self.angular_damping).powf(dt);

        // q' = q + 0.5 * dt * ω * q, renormalized
        let w = self.angular_velocity * (0.5 * dt);
        let dq = Quaternion::new(0.0, w.x, w.y, w.z);
        let q = self.orientation.into_inner();
        self.orientation = UnitQuaternion::new_normalize(q + dq * q);
    }
}

// ---------------------------------------------------------------------------
// Collision detection
// ---------------------------------------------------------------------------

/// Offsets below this along an axis count as centered when a sphere center
/// sits inside a box.
const INSIDE_TIE_EPSILON: f32 = 1e-4;

/// Normal (A toward B), penetration, contact point.
type Manifold = (Vector3<f32>, f32, Vector3<f32>);

fn collide(a: &RigidBody, col_a: &Collider, b: &RigidBody, col_b: &Collider) -> Option<Manifold> {
    match (col_a, col_b) {
        (Collider::Sphere { radius: ra }, Collider::Sphere { radius: rb }) => {
            let (normal, pen) = collide_sphere_sphere(&a.position, *ra, &b.position, *rb)?;
            Some((normal, pen, a.position + normal * (ra - pen * 0.5)))
        }
        (Collider::Sphere { radius }, Collider::Cuboid { half_extents }) => {
            collide_sphere_cuboid(a, *radius, b, half_extents)
        }
        (Collider::Cuboid { half_extents }, Collider::Sphere { radius }) => {
            let (normal, pen, point) = collide_sphere_cuboid(b, *radius, a, half_extents)?;
            Some((-normal, pen, point))
        }
        // Boxes only ever serve as static ground
        (Collider::Cuboid { .. }, Collider::Cuboid { .. }) => None,
    }
}

fn collide_sphere_sphere(
    pos_a: &Vector3<f32>,
    radius_a: f32,
    pos_b: &Vector3<f32>,
    radius_b: f32,
) -> Option<(Vector3<f32>, f32)> {
    let diff = pos_b - pos_a;
    let dist_sq = diff.norm_squared();
    let sum_r = radius_a + radius_b;

    if dist_sq >= sum_r * sum_r {
        return None;
    }

    let dist = dist_sq.sqrt();
    let penetration = sum_r - dist;

    let normal = if dist > 1e-6 {
        diff / dist
    } else {
        // Coincident centers: pick an arbitrary separation axis
        Vector3::y()
    };

    Some((normal, penetration))
}

/// Sphere vs oriented box. The normal points from the sphere toward the box.
///
/// The test runs in the box's local frame. When the sphere center is inside
/// the box it is pushed out through the face on the axis of least depth,
/// on the side it is moving away from; a resting center goes to the nearer
/// face, positive on ties, so a thin slab is never exited through the wrong side.
fn collide_sphere_cuboid(
    sphere: &RigidBody,
    radius: f32,
    cuboid: &RigidBody,
    half: &Vector3<f32>,
) -> Option<Manifold> {
    let to_local = cuboid.orientation.inverse();
    let center = to_local * (sphere.position - cuboid.position);

    let closest = center.zip_zip_map(half, &-half, |c, hi, lo| c.clamp(lo, hi));
    let diff = center - closest;
    let dist_sq = diff.norm_squared();

    if dist_sq >= radius * radius {
        return None;
    }

    let dist = dist_sq.sqrt();
    let (local_normal, penetration) = if dist > 1e-6 {
        (-diff / dist, radius - dist)
    } else {
        let rel_vel = to_local * (sphere.velocity - cuboid.velocity);
        let mut best: Option<(usize, f32, f32)> = None;
        for k in 0..3 {
            let d_pos = half[k] - center[k];
            let d_neg = center[k] + half[k];
            let sign = if rel_vel[k] < -INSIDE_TIE_EPSILON {
                1.0
            } else if rel_vel[k] > INSIDE_TIE_EPSILON {
                -1.0
            } else if d_pos <= d_neg + INSIDE_TIE_EPSILON {
                1.0
            } else {
                -1.0
            };
            let depth = d_pos.min(d_neg);
            let exit = if sign > 0.0 { d_pos } else { d_neg };
            if best.map_or(true, |(_, best_depth, _)| depth < best_depth) {
                best = Some((k, depth, sign * exit.max(0.0)));
            }
        }
        let (axis, _, signed_exit) = best?;
        let mut face = Vector3::zeros();
        face[axis] = if signed_exit >= 0.0 { 1.0 } else { -1.0 };
        (-face, radius + signed_exit.abs())
    };

    let normal = cuboid.orientation * local_normal;
    let point = sphere.position + normal * (radius - penetration * 0.5);
    Some((normal, penetration, point))
}

/// Contact passes per step when nothing else is configured.
pub const DEFAULT_SOLVER_ITERATIONS: usize = 10;

/// The physics simulation world: bodies, materials, and contact rules.
pub struct PhysicsWorld {
    bodies: Vec<RigidBody>,
    material_count: usize,
    contact_materials: Vec<ContactMaterial>,
    contact_index: HashMap<(MaterialId, MaterialId), usize>,
    /// Used for material pairs without a registered rule.
    pub default_contact_material: ContactMaterial,
    /// Detect-and-resolve passes per step. Each pass sees the positions
    /// left by the previous one.
    pub solver_iterations: usize,
    gravity: Vector3<f32>,
    elapsed: f32,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Create a new physics world with no gravity.
    pub fn new() -> Self {
        Self {
            bodies: Vec::new(),
            material_count: 1,
            contact_materials: Vec::new(),
            contact_index: HashMap::new(),
            default_contact_material: ContactMaterial::new(MaterialId::DEFAULT, MaterialId::DEFAULT)
                .with_restitution(0.0)
                .with_friction(0.3),
            solver_iterations: DEFAULT_SOLVER_ITERATIONS,
            gravity: Vector3::zeros(),
            elapsed: 0.0,
        }
    }

    pub fn set_gravity(&mut self, gravity: Vector3<f32>) {
        self.gravity = gravity;
    }

    pub fn gravity(&self) -> Vector3<f32> {
        self.gravity
    }

    /// Simulated seconds advanced so far.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Allocate a fresh material id.
    pub fn add_material(&mut self) -> MaterialId {
        let id = MaterialId(self.material_count);
        self.material_count += 1;
        id
    }

    pub fn add_body(&mut self, body: RigidBody) -> BodyId {
        let id = BodyId(self.bodies.len());
        self.bodies.push(body);
        id
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id.0)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Register a contact rule. Rules are never deduplicated; for a pair with
    /// several rules the latest one applies.
    pub fn add_contact_material(&mut self, rule: ContactMaterial) {
        self.contact_index.insert(rule.key(), self.contact_materials.len());
        self.contact_materials.push(rule);
    }

    pub fn contact_material_count(&self) -> usize {
        self.contact_materials.len()
    }

    /// Rule governing contacts between `a` and `b`, in either order.
    pub fn contact_material(&self, a: MaterialId, b: MaterialId) -> &ContactMaterial {
        self.contact_index
            .get(&pair_key(a, b))
            .and_then(|&i| self.contact_materials.get(i))
            .unwrap_or(&self.default_contact_material)
    }

    /// Detect all collisions between bodies with colliders.
    ///
    /// Pairs where either body lacks a collider, and static-static pairs, are skipped.
    pub fn detect_collisions(&self) -> Vec<Contact> {
        let mut contacts = Vec::new();
        let len = self.bodies.len();

        for i in 0..len {
            let body_a = &self.bodies[i];
            let Some(col_a) = &body_a.collider else {
                continue;
            };

            for j in (i + 1)..len {
                let body_b = &self.bodies[j];
                let Some(col_b) = &body_b.collider else {
                    continue;
                };

                if body_a.body_type == BodyType::Static && body_b.body_type == BodyType::Static {
                    continue;
                }

                if let Some((normal, penetration, point)) = collide(body_a, col_a, body_b, col_b) {
                    contacts.push(Contact {
                        body_a: BodyId(i),
                        body_b: BodyId(j),
                        normal,
                        penetration,
                        point,
                    });
                }
            }
        }

        contacts
    }

    /// Resolve contacts with positional correction, a restitution impulse
    /// (linear + angular) and a Coulomb friction impulse, using the
    /// contact material of each pair.
    ///
    /// Each pair is re-tested against the current positions before it is
    /// resolved, so corrections made earlier in the same pass are seen by
    /// later contacts. Pairs that no longer touch are skipped.
    pub fn resolve_contacts(&mut self, contacts: &[Contact]) {
        for contact in contacts {
            let a = contact.body_a.0;
            let b = contact.body_b.0;
            let (Some(col_a), Some(col_b)) = (self.bodies[a].collider, self.bodies[b].collider) else {
                continue;
            };
            let Some((n, penetration, point)) = collide(&self.bodies[a], &col_a, &self.bodies[b], &col_b) else {
                continue;
            };

            let rule = *self.contact_material(self.bodies[a].material, self.bodies[b].material);

            let inv_mass_a = self.bodies[a].inv_mass;
            let inv_mass_b = self.bodies[b].inv_mass;
            let inv_mass_sum = inv_mass_a + inv_mass_b;
            if inv_mass_sum == 0.0 {
                continue;
            }

            // --- Positional correction (push bodies apart) ---
            let correction = n * (penetration / inv_mass_sum);
            self.bodies[a].position -= correction * inv_mass_a;
            self.bodies[b].position += correction * inv_mass_b;

            let ra = point - self.bodies[a].position;
            let rb = point - self.bodies[b].position;
            let inv_inertia_a = self.bodies[a].inv_inertia_world();
            let inv_inertia_b = self.bodies[b].inv_inertia_world();

            let point_velocity = |world: &Self| {
                let va = world.bodies[a].velocity + world.bodies[a].angular_velocity.cross(&ra);
                let vb = world.bodies[b].velocity + world.bodies[b].angular_velocity.cross(&rb);
                vb - va
            };

            let vel_along_normal = point_velocity(self).dot(&n);
            if vel_along_normal >= 0.0 {
                continue;
            }

            // 1/m_eff = 1/m_a + 1/m_b + (I_a⁻¹(ra×n))×ra·n + (I_b⁻¹(rb×n))×rb·n
            let effective_inv_mass = |dir: &Vector3<f32>| {
                inv_mass_sum
                    + (inv_inertia_a * ra.cross(dir)).cross(&ra).dot(dir)
                    + (inv_inertia_b * rb.cross(dir)).cross(&rb).dot(dir)
            };

            let eff_mass_inv = effective_inv_mass(&n);
            if eff_mass_inv <= 0.0 {
                continue;
            }

            let j = -(1.0 + rule.restitution) * vel_along_normal / eff_mass_inv;
            self.apply_pair_impulse(a, b, n * j, &ra, &rb, &inv_inertia_a, &inv_inertia_b);

            if rule.friction <= 1e-6 {
                continue;
            }

            let relative_vel = point_velocity(self);
            let tangent_vel = relative_vel - n * relative_vel.dot(&n);
            let tangent_speed = tangent_vel.norm();
            if tangent_speed <= 1e-6 {
                continue;
            }

            let tangent = tangent_vel / tangent_speed;
            let eff_mass_t_inv = effective_inv_mass(&tangent);
            if eff_mass_t_inv > 0.0 {
                // Clamp by the Coulomb cone: |jt| <= mu * |jn|
                let jt = (-tangent_speed / eff_mass_t_inv).max(-rule.friction * j);
                self.apply_pair_impulse(a, b, tangent * jt, &ra, &rb, &inv_inertia_a, &inv_inertia_b);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_pair_impulse(
        &mut self,
        a: usize,
        b: usize,
        impulse: Vector3<f32>,
        ra: &Vector3<f32>,
        rb: &Vector3<f32>,
        inv_inertia_a: &Matrix3<f32>,
        inv_inertia_b: &Matrix3<f32>,
    ) {
        let inv_mass_a = self.bodies[a].inv_mass;
        let inv_mass_b = self.bodies[b].inv_mass;
        self.bodies[a].velocity -= impulse * inv_mass_a;
        self.bodies[b].velocity += impulse * inv_mass_b;
        self.bodies[a].angular_velocity -= inv_inertia_a * ra.cross(&impulse);
        self.bodies[b].angular_velocity += inv_inertia_b * rb.cross(&impulse);
    }

    fn touches_static(&self, contact: &Contact) -> bool {
        self.bodies[contact.body_a.0].body_type == BodyType::Static
            || self.bodies[contact.body_b.0].body_type == BodyType::Static
    }

    /// Advance the simulation by `dt` seconds: integrate, then run up to
    /// [`PhysicsWorld::solver_iterations`] detect-and-resolve passes.
    ///
    /// Within a pass, contacts against static bodies are resolved last so a
    /// body pushed by its neighbours ends the pass outside static geometry.
    pub fn step(&mut self, dt: f32) {
        let gravity = self.gravity;
        for body in self.bodies.iter_mut() {
            body.integrate(dt, gravity);
        }

        let mut passes = 0;
        let mut first_contacts = 0;
        for _ in 0..self.solver_iterations.max(1) {
            let mut contacts = self.detect_collisions();
            if contacts.is_empty() {
                break;
            }
            if passes == 0 {
                first_contacts = contacts.len();
            }
            // Stable: pair order is kept within each group
            contacts.sort_by_key(|c| self.touches_static(c));
            self.resolve_contacts(&contacts);
            passes += 1;
        }
        self.elapsed += dt;

        trace!(
            "step dt={:.5} bodies={} contacts={} passes={}",
            dt,
            self.bodies.len(),
            first_contacts,
            passes
        );
    }

    /// Advance by `dt` in `substeps` equal steps.
    pub fn step_fixed(&mut self, dt: f32, substeps: u32) {
        let substeps = substeps.max(1);
        let sub_dt = dt / substeps as f32;
        for _ in 0..substeps {
            self.step(sub_dt);
        }
    }
}

/// Copy a body's position and orientation onto a mesh.
pub fn sync_body_to_mesh(body: &RigidBody, mesh: &mut Mesh) {
    mesh.set_position(body.position.x, body.position.y, body.position.z);
    mesh.set_rotation(body.orientation);
}
