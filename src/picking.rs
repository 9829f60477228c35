//! Turning a pointer position into a point in the world.
//!
//! The pointer is cast as a ray from the camera and intersected with a plane
//! that faces the camera's position and passes through the scene origin.

use log::{debug, warn};
use nalgebra::{Point2, Point3, Vector3};

use crate::camera::Camera;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    /// Unit length.
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Ray from the camera through a point given in normalized device coordinates.
    pub fn from_camera(ndc: Point2<f32>, camera: &Camera) -> Ray {
        let origin = camera.position;
        let through = camera.unproject(Point3::new(ndc.x, ndc.y, 0.5));
        let direction = (through - origin)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| camera.get_direction());
        Ray { origin, direction }
    }

    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Where the ray meets `plane`, if it does so at or ahead of the origin.
    ///
    /// A ray lying inside the plane meets it at its own origin.
    pub fn intersect_plane(&self, plane: &Plane) -> Option<Point3<f32>> {
        let denominator = plane.normal.dot(&self.direction);
        if denominator == 0.0 {
            if plane.distance_to_point(&self.origin) == 0.0 {
                return Some(self.origin);
            }
            return None;
        }

        let t = -(self.origin.coords.dot(&plane.normal) + plane.constant) / denominator;
        if t >= 0.0 {
            Some(self.at(t))
        } else {
            None
        }
    }
}

/// Plane `normal · p + constant = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f32>,
    pub constant: f32,
}

impl Plane {
    pub fn from_normal_and_coplanar_point(normal: Vector3<f32>, point: &Point3<f32>) -> Plane {
        Plane {
            normal,
            constant: -point.coords.dot(&normal),
        }
    }

    pub fn distance_to_point(&self, point: &Point3<f32>) -> f32 {
        self.normal.dot(&point.coords) + self.constant
    }
}

/// Pointer-to-world projector. Remembers the last successful projection.
#[derive(Debug, Clone)]
pub struct PointerProjector {
    last_point: Point3<f32>,
}

impl Default for PointerProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerProjector {
    pub fn new() -> Self {
        Self {
            last_point: Point3::origin(),
        }
    }

    /// Pixel position within a `width` x `height` viewport to NDC.
    ///
    /// Left edge maps to -1, top edge to +1.
    pub fn pointer_to_ndc(x: f32, y: f32, width: u32, height: u32) -> Point2<f32> {
        Point2::new(
            (x / width.max(1) as f32) * 2.0 - 1.0,
            -(y / height.max(1) as f32) * 2.0 + 1.0,
        )
    }

    /// Project a pointer position onto the camera-facing plane through `origin`.
    ///
    /// When the ray misses the plane the previous point is kept and returned.
    pub fn project(
        &mut self,
        x: f32,
        y: f32,
        width: u32,
        height: u32,
        camera: &Camera,
        origin: &Point3<f32>,
    ) -> Point3<f32> {
        let ndc = Self::pointer_to_ndc(x, y, width, height);
        let ray = Ray::from_camera(ndc, camera);

        let normal = camera
            .position
            .coords
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| -camera.get_direction());
        let plane = Plane::from_normal_and_coplanar_point(normal, origin);

        match ray.intersect_plane(&plane) {
            Some(point) => {
                debug!("pointer ({x}, {y}) -> {:?}", point.coords.as_slice());
                self.last_point = point;
            }
            None => warn!("pointer ray misses the projection plane, keeping {:?}", self.last_point.coords.as_slice()),
        }
        self.last_point
    }

    pub fn last_point(&self) -> Point3<f32> {
        self.last_point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_camera(width: u32, height: u32) -> Camera {
        let mut camera = Camera::new(width as f32 / height as f32);
        camera.look_at(Point3::new(0.0, 2.0, 14.0), Point3::origin());
        camera
    }

    #[test]
    fn test_pointer_to_ndc_corners() {
        assert_eq!(PointerProjector::pointer_to_ndc(0.0, 0.0, 640, 480), Point2::new(-1.0, 1.0));
        assert_eq!(PointerProjector::pointer_to_ndc(640.0, 480.0, 640, 480), Point2::new(1.0, -1.0));
        assert_eq!(PointerProjector::pointer_to_ndc(320.0, 240.0, 640, 480), Point2::new(0.0, 0.0));
    }

    #[test]
    fn test_ray_through_center_points_at_target() {
        let camera = scene_camera(640, 480);
        let ray = Ray::from_camera(Point2::origin(), &camera);
        assert!((ray.direction - camera.get_direction()).norm() < 1e-4);
        assert!((ray.direction.norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_intersect_plane() {
        let plane = Plane::from_normal_and_coplanar_point(Vector3::z(), &Point3::origin());
        let ray = Ray {
            origin: Point3::new(1.0, 2.0, 5.0),
            direction: -Vector3::z(),
        };
        assert_eq!(ray.intersect_plane(&plane), Some(Point3::new(1.0, 2.0, 0.0)));

        let behind = Ray {
            origin: Point3::new(0.0, 0.0, 5.0),
            direction: Vector3::z(),
        };
        assert_eq!(behind.intersect_plane(&plane), None);

        let parallel = Ray {
            origin: Point3::new(0.0, 0.0, 5.0),
            direction: Vector3::x(),
        };
        assert_eq!(parallel.intersect_plane(&plane), None);

        let inside = Ray {
            origin: Point3::new(3.0, 0.0, 0.0),
            direction: Vector3::x(),
        };
        assert_eq!(inside.intersect_plane(&plane), Some(Point3::new(3.0, 0.0, 0.0)));
    }

    #[test]
    fn test_center_pointer_projects_to_origin() {
        let camera = scene_camera(640, 480);
        let mut projector = PointerProjector::new();
        let p = projector.project(320.0, 240.0, 640, 480, &camera, &Point3::origin());
        assert!(p.coords.norm() < 1e-3, "{p:?}");
    }

    #[test]
    fn test_projected_point_lies_on_camera_facing_plane() {
        let camera = scene_camera(640, 480);
        let mut projector = PointerProjector::new();
        let p = projector.project(100.0, 50.0, 640, 480, &camera, &Point3::origin());

        let normal = camera.position.coords.normalize();
        assert!(p.coords.dot(&normal).abs() < 1e-3);
        assert!(p.x < 0.0 && p.y > 0.0);
        assert_eq!(projector.last_point(), p);
    }

    #[test]
    fn test_pointer_grid_lies_on_plane_from_any_viewpoint() {
        let mut projector = PointerProjector::new();
        let viewpoints = [
            Point3::new(0.0, 2.0, 14.0),
            Point3::new(9.0, 7.5, -6.0),
            Point3::new(-3.0, 12.0, 1.5),
        ];
        for eye in viewpoints {
            let mut camera = Camera::new(640.0 / 480.0);
            camera.look_at(eye, Point3::origin());
            let normal = eye.coords.normalize();

            for i in 0..=16 {
                for j in 0..=12 {
                    let p = projector.project(i as f32 * 40.0, j as f32 * 30.0, 640, 480, &camera, &Point3::origin());
                    assert!(normal.dot(&p.coords).abs() < 1e-4, "eye {eye:?}: {p:?}");
                }
            }
        }
    }

    #[test]
    fn test_missed_projection_keeps_last_point() {
        let mut projector = PointerProjector::new();
        assert_eq!(projector.last_point(), Point3::origin());

        let camera = scene_camera(640, 480);
        let first = projector.project(200.0, 200.0, 640, 480, &camera, &Point3::origin());

        // Looking straight away from the origin: every pointer ray faces away from the plane.
        let mut away = Camera::new(640.0 / 480.0);
        away.look_at(Point3::new(0.0, 0.0, 10.0), Point3::new(0.0, 0.0, 20.0));
        let kept = projector.project(320.0, 240.0, 640, 480, &away, &Point3::origin());
        assert_eq!(kept, first);
    }
}
