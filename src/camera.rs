use nalgebra::{Isometry3, Matrix4, Perspective3, Point3, Vector3};

/// Perspective camera looking from `position` at `target` with +Y up.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    fov: f32,
    pub near: f32,
    pub far: f32,
    view_matrix: Matrix4<f32>,
    projection_matrix: Matrix4<f32>,
    pub vp_matrix: Matrix4<f32>,
    inverse_vp: Matrix4<f32>,
    target: Point3<f32>,
    aspect_ratio: f32,
}

impl Camera {
    /// Camera at the origin with a 75 degree vertical field of view.
    pub fn new(aspect_ratio: f32) -> Camera {
        Self::perspective(75.0, aspect_ratio, 0.1, 1000.0)
    }

    /// Camera with a vertical field of view given in degrees.
    pub fn perspective(fov_degrees: f32, aspect_ratio: f32, near: f32, far: f32) -> Camera {
        let mut ret = Camera {
            position: Point3::origin(),
            fov: fov_degrees.to_radians(),
            view_matrix: Matrix4::identity(),
            projection_matrix: Matrix4::identity(),
            vp_matrix: Matrix4::identity(),
            inverse_vp: Matrix4::identity(),
            target: Point3::new(0.0, 0.0, -1.0),
            aspect_ratio,
            near,
            far,
        };

        ret.update_view();
        ret.update_projection();

        ret
    }

    /// Move the camera and aim it in one view update.
    pub fn look_at(&mut self, position: Point3<f32>, target: Point3<f32>) {
        self.position = position;
        self.target = target;
        self.update_view();
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn fovy(&self) -> f32 {
        self.fov
    }

    /// Set the aspect ratio without rebuilding the projection.
    ///
    /// Callers follow up with [`Camera::update_projection`], mirroring how a
    /// resize handler updates the camera and then its projection.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    pub fn get_aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// Unit vector from the camera toward its target.
    pub fn get_direction(&self) -> Vector3<f32> {
        let dir = self.target - self.position;
        dir.try_normalize(f32::EPSILON).unwrap_or_else(|| -Vector3::z())
    }

    /// Map a point in normalized device coordinates back to world space.
    ///
    /// `z = -1` lands on the near plane, `z = 1` on the far plane.
    pub fn unproject(&self, ndc: Point3<f32>) -> Point3<f32> {
        self.inverse_vp.transform_point(&ndc)
    }

    /// Map a world-space point to normalized device coordinates.
    pub fn project(&self, point: &Point3<f32>) -> Point3<f32> {
        self.vp_matrix.transform_point(point)
    }

    fn update_view(&mut self) {
        let view = Isometry3::look_at_rh(&self.position, &self.target, &Vector3::y());

        self.view_matrix = view.to_homogeneous();
        self.update_vp();
    }

    pub fn update_projection(&mut self) {
        let projection = Perspective3::new(self.aspect_ratio, self.fov, self.near, self.far);
        self.projection_matrix = projection.to_homogeneous();
        self.update_vp();
    }

    fn update_vp(&mut self) {
        self.vp_matrix = self.projection_matrix * self.view_matrix;
        // A perspective * rigid view matrix is always invertible for valid near/far.
        self.inverse_vp = self.vp_matrix.try_inverse().unwrap_or_else(Matrix4::identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(16.0 / 9.0);
        assert!((camera.get_aspect_ratio() - 16.0 / 9.0).abs() < 0.001);
        assert_eq!(camera.near, 0.1);
        assert_eq!(camera.far, 1000.0);
        assert!((camera.fovy() - 75.0f32.to_radians()).abs() < 1e-6);
        assert_eq!(camera.position, Point3::origin());
    }

    #[test]
    fn test_camera_set_position_and_target() {
        let mut camera = Camera::new(1.0);
        camera.look_at(Point3::new(0.0, 2.0, 14.0), Point3::origin());
        assert_eq!(camera.position, Point3::new(0.0, 2.0, 14.0));
        assert_eq!(camera.target(), Point3::origin());

        let dir = camera.get_direction();
        assert!((dir.norm() - 1.0).abs() < 1e-5);
        assert!(dir.z < 0.0 && dir.y < 0.0);
    }

    #[test]
    fn test_aspect_requires_projection_update() {
        let mut camera = Camera::new(1.0);
        let before = camera.vp_matrix;

        camera.set_aspect_ratio(2.0);
        assert_eq!(camera.vp_matrix, before);

        camera.update_projection();
        assert_ne!(camera.vp_matrix, before);
        assert_eq!(camera.get_aspect_ratio(), 2.0);
    }

    #[test]
    fn test_project_unproject_roundtrip() {
        let mut camera = Camera::new(4.0 / 3.0);
        camera.look_at(Point3::new(0.0, 2.0, 14.0), Point3::origin());

        let world = Point3::new(1.0, 0.5, -2.0);
        let ndc = camera.project(&world);
        let back = camera.unproject(ndc);
        assert!((back - world).norm() < 1e-3);
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let mut camera = Camera::new(4.0 / 3.0);
        camera.look_at(Point3::new(0.0, 2.0, 14.0), Point3::origin());

        let ndc = camera.project(&Point3::origin());
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!(ndc.z > -1.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_camera_vp_matrix_updates() {
        let mut camera = Camera::new(1.0);
        let initial_vp = camera.vp_matrix;

        camera.look_at(Point3::new(5.0, 5.0, 5.0), Point3::origin());
        assert_ne!(camera.vp_matrix, initial_vp);

        // The inverse follows every change
        let ndc = camera.project(&Point3::new(0.5, -1.0, 2.0));
        assert!((camera.unproject(ndc) - Point3::new(0.5, -1.0, 2.0)).norm() < 1e-3);
    }
}
