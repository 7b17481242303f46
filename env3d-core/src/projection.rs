/// Camera and projection utilities
use std::f32::consts::PI;

use crate::error::{Result, SceneError};
use crate::geometry::Vector3D;
use crate::transform::Matrix;

impl Matrix {
    /// View transform looking from `eye` towards `look_at`, with +Y as up
    pub fn view_transform(eye: Vector3D, look_at: Vector3D) -> Result<Matrix> {
        Self::view_transform_with_up(eye, look_at, Vector3D::up())
    }

    /// View transform for an arbitrary up vector
    ///
    /// The camera axes occupy the first three columns so that `p * V`
    /// yields camera-space coordinates.
    pub fn view_transform_with_up(eye: Vector3D, look_at: Vector3D, up: Vector3D) -> Result<Matrix> {
        if !(eye.is_finite() && look_at.is_finite() && up.is_finite()) {
            return Err(SceneError::InvalidArgument(
                "view vectors must be finite".to_string(),
            ));
        }
        let forward = (look_at - eye).normalize().map_err(|_| {
            SceneError::DegenerateView(format!(
                "eye point and look-at point coincide at ({}, {}, {})",
                eye.x, eye.y, eye.z
            ))
        })?;
        let right = up.cross(forward).normalize().map_err(|_| {
            SceneError::DegenerateView("up vector is parallel to the view direction".to_string())
        })?;
        let true_up = forward.cross(right);

        Ok(Matrix::from_rows([
            [right.x, true_up.x, forward.x, 0.0],
            [right.y, true_up.y, forward.y, 0.0],
            [right.z, true_up.z, forward.z, 0.0],
            [-right.dot(eye), -true_up.dot(eye), -forward.dot(eye), 1.0],
        ]))
    }

    /// Perspective projection transform
    ///
    /// `fov_y` must lie strictly between 0 and PI, `aspect` must be positive
    /// and the clip planes must differ.
    pub fn projection_transform(fov_y: f32, aspect: f32, z_near: f32, z_far: f32) -> Result<Matrix> {
        if !(fov_y.is_finite() && aspect.is_finite() && z_near.is_finite() && z_far.is_finite()) {
            return Err(SceneError::DegenerateProjection(
                "projection parameters must be finite".to_string(),
            ));
        }
        if fov_y <= 0.0 || fov_y >= PI {
            return Err(SceneError::DegenerateProjection(format!(
                "field of view {fov_y} outside (0, PI)"
            )));
        }
        if aspect <= 0.0 {
            return Err(SceneError::DegenerateProjection(format!(
                "aspect ratio {aspect} must be positive"
            )));
        }
        if z_near == z_far {
            return Err(SceneError::DegenerateProjection(format!(
                "near and far clip planes coincide at {z_near}"
            )));
        }

        let y_scale = 1.0 / (fov_y / 2.0).tan();
        let x_scale = aspect * y_scale;
        let depth = z_far / (z_far - z_near);

        Ok(Matrix::from_rows([
            [x_scale, 0.0, 0.0, 0.0],
            [0.0, y_scale, 0.0, 0.0],
            [0.0, 0.0, depth, 1.0],
            [0.0, 0.0, -z_near * depth, 0.0],
        ]))
    }
}

/// Camera configuration: view and projection parameters with their matrices
///
/// Every setter builds the new matrix before committing, so the stored
/// parameters always match the cached transforms.
#[derive(Debug, Clone)]
pub struct Camera {
    eye: Vector3D,
    look_at: Vector3D,
    up: Vector3D,
    fov: f32,
    aspect: f32,
    near: f32,
    far: f32,
    view: Matrix,
    projection: Matrix,
}

impl Camera {
    pub fn new(
        eye: Vector3D,
        look_at: Vector3D,
        fov: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Result<Self> {
        let up = Vector3D::up();
        Ok(Self {
            eye,
            look_at,
            up,
            fov,
            aspect,
            near,
            far,
            view: Matrix::view_transform_with_up(eye, look_at, up)?,
            projection: Matrix::projection_transform(fov, aspect, near, far)?,
        })
    }

    pub fn eye(&self) -> Vector3D {
        self.eye
    }

    pub fn look_at(&self) -> Vector3D {
        self.look_at
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    /// The view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix {
        self.view
    }

    /// The projection matrix
    pub fn projection_matrix(&self) -> Matrix {
        self.projection
    }

    pub fn set_view(&mut self, eye: Vector3D, look_at: Vector3D) -> Result<Matrix> {
        let view = Matrix::view_transform_with_up(eye, look_at, self.up)?;
        self.eye = eye;
        self.look_at = look_at;
        self.view = view;
        Ok(view)
    }

    pub fn set_eye(&mut self, eye: Vector3D) -> Result<Matrix> {
        self.set_view(eye, self.look_at)
    }

    pub fn set_look_at(&mut self, look_at: Vector3D) -> Result<Matrix> {
        self.set_view(self.eye, look_at)
    }

    pub fn set_fov(&mut self, fov: f32) -> Result<Matrix> {
        self.set_projection(fov, self.aspect, self.near, self.far)
    }

    pub fn set_aspect(&mut self, aspect: f32) -> Result<Matrix> {
        self.set_projection(self.fov, aspect, self.near, self.far)
    }

    pub fn set_near(&mut self, near: f32) -> Result<Matrix> {
        self.set_projection(self.fov, self.aspect, near, self.far)
    }

    pub fn set_far(&mut self, far: f32) -> Result<Matrix> {
        self.set_projection(self.fov, self.aspect, self.near, far)
    }

    fn set_projection(&mut self, fov: f32, aspect: f32, near: f32, far: f32) -> Result<Matrix> {
        let projection = Matrix::projection_transform(fov, aspect, near, far)?;
        self.fov = fov;
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self.projection = projection;
        Ok(projection)
    }

    /// Project a 3D point to 2D screen space through `model`, view and projection
    ///
    /// Returns `None` for points behind the eye or outside the view volume.
    pub fn project_to_screen(
        &self,
        point: Vector3D,
        model: &Matrix,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let mvp = model * &self.view * self.projection;
        project_with(&mvp, point, width, height)
    }
}

/// Projects `point` through a combined model-view-projection matrix
pub fn project_with(mvp: &Matrix, point: Vector3D, width: u32, height: u32) -> Option<(f32, f32, f32)> {
    let [x, y, z, w] = mvp.transform_homogeneous(point);

    // Prevent division by near-zero depth values
    if w.abs() < 1e-6 || w < 0.0 {
        return None;
    }

    let ndc_x = x / w;
    let ndc_y = y / w;
    let depth = z / w;

    if !(-1.0..=1.0).contains(&ndc_x) || !(-1.0..=1.0).contains(&ndc_y) {
        return None;
    }

    // Convert to screen space
    let screen_x = (ndc_x + 1.0) * 0.5 * width as f32;
    let screen_y = (1.0 - ndc_y) * 0.5 * height as f32;

    Some((screen_x, screen_y, depth))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_projection_reference_values() {
        let m = Matrix::projection_transform(FRAC_PI_2, 1.0, 1.0, 100.0).unwrap();
        assert_relative_eq!(m.value_at(0, 0).unwrap(), 1.0, epsilon = EPSILON);
        assert_relative_eq!(m.value_at(1, 1).unwrap(), 1.0, epsilon = EPSILON);
        assert_relative_eq!(m.value_at(2, 2).unwrap(), 100.0 / 99.0, epsilon = EPSILON);
        assert_relative_eq!(m.value_at(3, 2).unwrap(), -100.0 / 99.0, epsilon = EPSILON);
        assert_eq!(m.value_at(2, 3).unwrap(), 1.0);
        assert_eq!(m.value_at(3, 3).unwrap(), 0.0);
        assert_eq!(m.value_at(0, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_projection_aspect_scales_x() {
        let m = Matrix::projection_transform(FRAC_PI_2, 2.0, 1.0, 10.0).unwrap();
        assert_relative_eq!(m.value_at(0, 0).unwrap(), 2.0, epsilon = EPSILON);
    }

    #[test]
    fn test_projection_rejects_degenerate_inputs() {
        assert!(matches!(
            Matrix::projection_transform(0.0, 1.0, 1.0, 100.0),
            Err(SceneError::DegenerateProjection(_))
        ));
        assert!(Matrix::projection_transform(PI, 1.0, 1.0, 100.0).is_err());
        assert!(Matrix::projection_transform(f32::NAN, 1.0, 1.0, 100.0).is_err());
        assert!(Matrix::projection_transform(FRAC_PI_4, 0.0, 1.0, 100.0).is_err());
        assert!(Matrix::projection_transform(FRAC_PI_4, 1.0, 5.0, 5.0).is_err());
    }

    #[test]
    fn test_view_transform_axes() {
        let eye = Vector3D::new(0.0, 0.0, -3.0);
        let view = Matrix::view_transform(eye, Vector3D::zero()).unwrap();

        // The eye maps to the camera origin
        let p = view.transform_point(eye);
        assert_relative_eq!(p.length(), 0.0, epsilon = EPSILON);

        // The look-at point lies straight ahead on +Z
        let p = view.transform_point(Vector3D::zero());
        assert_relative_eq!(p.x, 0.0, epsilon = EPSILON);
        assert_relative_eq!(p.y, 0.0, epsilon = EPSILON);
        assert_relative_eq!(p.z, 3.0, epsilon = EPSILON);

        // Up stays up, right stays right
        let p = view.transform_point(Vector3D::new(1.0, 1.0, 0.0));
        assert_relative_eq!(p.x, 1.0, epsilon = EPSILON);
        assert_relative_eq!(p.y, 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_view_transform_translation_row() {
        let eye = Vector3D::new(2.0, 3.0, -4.0);
        let look_at = Vector3D::new(2.0, 3.0, 0.0);
        let view = Matrix::view_transform(eye, look_at).unwrap();
        let row = view.rows()[3];
        assert_relative_eq!(row[0], -2.0, epsilon = EPSILON);
        assert_relative_eq!(row[1], -3.0, epsilon = EPSILON);
        assert_relative_eq!(row[2], 4.0, epsilon = EPSILON);
        assert_eq!(row[3], 1.0);
    }

    #[test]
    fn test_view_transform_degenerate() {
        let eye = Vector3D::new(1.0, 2.0, 3.0);
        assert!(matches!(
            Matrix::view_transform(eye, eye),
            Err(SceneError::DegenerateView(_))
        ));
        assert!(matches!(
            Matrix::view_transform(Vector3D::zero(), Vector3D::new(0.0, 5.0, 0.0)),
            Err(SceneError::DegenerateView(_))
        ));
    }

    #[test]
    fn test_camera_setters_keep_state_on_error() {
        let mut camera = Camera::new(
            Vector3D::new(0.0, 0.0, -5.0),
            Vector3D::zero(),
            FRAC_PI_4,
            1.0,
            1.0,
            100.0,
        )
        .unwrap();
        let view_before = camera.view_matrix();

        assert!(camera.set_eye(Vector3D::zero()).is_err());
        assert_eq!(camera.eye(), Vector3D::new(0.0, 0.0, -5.0));
        assert_eq!(camera.view_matrix(), view_before);

        assert!(camera.set_fov(0.0).is_err());
        assert_eq!(camera.fov(), FRAC_PI_4);
    }

    #[test]
    fn test_camera_independent_setters() {
        let mut camera = Camera::new(
            Vector3D::new(0.0, 0.0, -5.0),
            Vector3D::zero(),
            FRAC_PI_4,
            1.0,
            1.0,
            100.0,
        )
        .unwrap();
        let look_at = Vector3D::new(1.0, 1.0, 1.0);
        camera.set_look_at(look_at).unwrap();
        camera.set_eye(Vector3D::new(0.0, 2.0, -8.0)).unwrap();
        assert_eq!(camera.look_at(), look_at);
        assert_eq!(
            camera.view_matrix(),
            Matrix::view_transform(Vector3D::new(0.0, 2.0, -8.0), look_at).unwrap()
        );
    }

    #[test]
    fn test_project_center_of_screen() {
        let camera = Camera::new(
            Vector3D::new(0.0, 0.0, -5.0),
            Vector3D::zero(),
            FRAC_PI_4,
            1.0,
            1.0,
            100.0,
        )
        .unwrap();
        let (x, y, depth) = camera
            .project_to_screen(Vector3D::zero(), &Matrix::identity(), 80, 40)
            .unwrap();
        assert_relative_eq!(x, 40.0, epsilon = 1e-3);
        assert_relative_eq!(y, 20.0, epsilon = 1e-3);
        assert!(depth > 0.0 && depth < 1.0);

        // Behind the eye
        assert!(camera
            .project_to_screen(Vector3D::new(0.0, 0.0, -10.0), &Matrix::identity(), 80, 40)
            .is_none());
    }
}
