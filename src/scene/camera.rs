//! Camera math

use glam::{Mat4, Vec3};

use crate::backend::GraphicsBackend;
use crate::context::RenderContext;
use crate::shader::LinkedProgram;

/// Largest pitch magnitude, just short of straight up or down
const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Camera projection type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective {
            fov_y: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect: 800.0 / 600.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Projection::Perspective {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    pub fn orthographic(width: f32, height: f32, near: f32, far: f32) -> Self {
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        Projection::Orthographic {
            left: -half_w,
            right: half_w,
            bottom: -half_h,
            top: half_h,
            near,
            far,
        }
    }

    /// OpenGL clip space (depth in -1..1)
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh_gl(fov_y, aspect, near, far),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::orthographic_rh_gl(left, right, bottom, top, near, far),
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if let Projection::Perspective { aspect: a, .. } = self {
            *a = aspect;
        }
    }
}

/// Direction of a keyboard-driven camera step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// First-person camera driven by yaw and pitch (radians).
///
/// Yaw 0 looks down +X; the default yaw of -90 degrees looks down -Z.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub world_up: Vec3,
    pub projection: Projection,
    /// Units per second
    pub move_speed: f32,
    /// Radians per pixel of mouse motion
    pub mouse_sensitivity: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            yaw: -std::f32::consts::FRAC_PI_2,
            pitch: 0.0,
            world_up: Vec3::Y,
            projection: Projection::default(),
            move_speed: 2.5,
            mouse_sensitivity: 0.002,
        }
    }
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Camera at `position` turned towards `target`
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let mut camera = Self::new(position);
        camera.look_at(target);
        camera
    }

    /// Turn towards `target`; ignored when it coincides with the position
    pub fn look_at(&mut self, target: Vec3) {
        let Some(forward) = (target - self.position).try_normalize() else {
            return;
        };
        self.yaw = forward.z.atan2(forward.x);
        self.pitch = forward.y.asin().clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.world_up).normalize()
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward()).normalize()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.up())
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Apply mouse motion in pixels; pitch stays short of the poles
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw = (self.yaw + dx * self.mouse_sensitivity) % std::f32::consts::TAU;
        self.pitch = (self.pitch - dy * self.mouse_sensitivity).clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Move for `dt` seconds at `move_speed`
    pub fn travel(&mut self, movement: CameraMovement, dt: f32) {
        let direction = match movement {
            CameraMovement::Forward => self.forward(),
            CameraMovement::Backward => -self.forward(),
            CameraMovement::Right => self.right(),
            CameraMovement::Left => -self.right(),
            CameraMovement::Up => self.world_up,
            CameraMovement::Down => -self.world_up,
        };
        self.position += direction * self.move_speed * dt;
    }

    /// Update aspect ratio for perspective projection
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.projection.set_aspect(width / height);
        }
    }

    /// Write the `view` and `projection` uniforms of `program`
    pub fn apply<B: GraphicsBackend>(&self, ctx: &mut RenderContext<B>, program: &LinkedProgram) {
        ctx.use_program(program);
        ctx.set_uniform(program, "view", self.view_matrix());
        ctx.set_uniform(program, "projection", self.projection_matrix());
    }
}
