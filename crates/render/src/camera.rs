use glam::{Mat4, Vec3};
use procgfx_common::Extent2d;

/// Camera circling the heightfield, looking at its centre.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Radians per second added to `yaw` by [`OrbitCamera::advance`].
    pub orbit_speed: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 3.0,
            yaw: 45.0_f32.to_radians(),
            pitch: 35.0_f32.to_radians(),
            fov: 50.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.05,
            far: 50.0,
            orbit_speed: 0.2,
        }
    }
}

impl OrbitCamera {
    pub fn eye(&self) -> Vec3 {
        let dir = Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        );
        self.target + dir * self.distance
    }

    pub fn advance(&mut self, dt: f32) {
        self.yaw = (self.yaw + self.orbit_speed * dt) % std::f32::consts::TAU;
    }

    /// Match the aspect ratio of the render target. Empty extents are ignored.
    pub fn fit(&mut self, extent: Extent2d) {
        if !extent.is_empty() {
            self.aspect = extent.aspect();
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}
