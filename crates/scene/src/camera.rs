use foundation::math::{Vec2, Vec3};

use crate::picking::Ray;

/// Screen rectangle of the rendering surface in client pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl SurfaceRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn aspect(&self) -> f64 {
        if self.height <= 0.0 {
            1.0
        } else {
            (self.width / self.height).max(1e-6)
        }
    }

    /// Client coordinates to normalized device coordinates (`-1..1`, y up).
    ///
    /// Returns `None` for a collapsed surface.
    pub fn to_ndc(&self, client_x: f64, client_y: f64) -> Option<Vec2> {
        if self.width <= 1.0 || self.height <= 1.0 {
            return None;
        }
        let x = ((client_x - self.left) / self.width) * 2.0 - 1.0;
        let y = -(((client_y - self.top) / self.height) * 2.0 - 1.0);
        Some(Vec2::new(x, y))
    }
}

/// Perspective camera state read from the renderer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraView {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y_deg: f64,
    pub aspect: f64,
}

impl CameraView {
    pub fn new(eye: Vec3, target: Vec3, fov_y_deg: f64, aspect: f64) -> Self {
        Self {
            eye,
            target,
            up: Vec3::Y,
            fov_y_deg,
            aspect,
        }
    }

    /// World-space ray from the eye through an NDC point.
    pub fn ray_through_ndc(&self, ndc: Vec2) -> Option<Ray> {
        let forward = (self.target - self.eye).normalized()?;
        let right = forward.cross(self.up).normalized()?;
        let up = right.cross(forward);

        let tan = (0.5 * self.fov_y_deg.to_radians()).tan();
        let px = ndc.x * tan * self.aspect;
        let py = ndc.y * tan;

        let dir = (forward + right.scale(px) + up.scale(py)).normalized()?;
        Some(Ray::new(self.eye, dir))
    }
}
