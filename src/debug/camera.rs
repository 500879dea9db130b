use bevy::{input::mouse::AccumulatedMouseMotion, prelude::*};

/// A simple fly camera, toggled with `T`.
///
/// Arrow keys move horizontally, page up and down vertically, and the mouse rotates the view.
/// Home and end change the speed.
#[derive(Component)]
#[require(Transform)]
pub struct DebugCamera {
    pub active: bool,
    pub translation_speed: f32,
    pub rotation_speed: f32,
    pub acceleration: f32,
    yaw: f32,
    pitch: f32,
}

impl Default for DebugCamera {
    fn default() -> Self {
        Self {
            active: false,
            translation_speed: 600.0,
            rotation_speed: 0.2,
            acceleration: 1.03,
            yaw: -135.0_f32.to_radians(),
            pitch: 0.0,
        }
    }
}

impl DebugCamera {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self {
            yaw,
            pitch,
            ..default()
        }
    }

    fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }
}

pub(crate) fn debug_camera_control(
    time: Res<Time>,
    motion: Res<AccumulatedMouseMotion>,
    keys: Res<ButtonInput<KeyCode>>,
    mut cameras: Query<(&mut Transform, &mut DebugCamera)>,
) {
    let delta_time = time.delta_secs();

    for (mut transform, mut camera) in &mut cameras {
        if keys.just_pressed(KeyCode::KeyT) {
            camera.active = !camera.active;
        }

        if !camera.active {
            continue;
        }

        let mut speed_factor = 1.0;
        let mut translation_delta = Vec3::ZERO;

        if keys.pressed(KeyCode::ArrowLeft) {
            translation_delta.x -= 1.0;
        }
        if keys.pressed(KeyCode::ArrowRight) {
            translation_delta.x += 1.0;
        }
        if keys.pressed(KeyCode::PageUp) {
            translation_delta.y += 1.0;
        }
        if keys.pressed(KeyCode::PageDown) {
            translation_delta.y -= 1.0;
        }
        if keys.pressed(KeyCode::ArrowUp) {
            translation_delta.z -= 1.0;
        }
        if keys.pressed(KeyCode::ArrowDown) {
            translation_delta.z += 1.0;
        }
        if keys.pressed(KeyCode::Home) {
            speed_factor = 1.0 / camera.acceleration;
        }
        if keys.pressed(KeyCode::End) {
            speed_factor = camera.acceleration;
        }

        camera.translation_speed *= speed_factor;

        let rotation_delta = -motion.delta * camera.rotation_speed * delta_time;
        camera.yaw += rotation_delta.x;
        camera.pitch = (camera.pitch + rotation_delta.y).clamp(-1.54, 1.54);

        // move relative to the heading, ignoring the pitch
        let heading = Quat::from_rotation_y(camera.yaw);
        transform.translation +=
            heading * translation_delta.normalize_or_zero() * camera.translation_speed * delta_time;
        transform.rotation = camera.rotation();
    }
}
