//! Input routing: window events and key polling into camera intents.

use glfw::{Action, Key, WindowEvent};

use crate::camera::{CameraMovement, FlyCamera};
use crate::render::window::Window;

/// Drain pending window events and apply held movement keys.
///
/// Escape (or the window manager's close request) flags the window for
/// shutdown; cursor motion turns the camera; WASD is polled per frame so
/// held keys produce continuous movement.
pub fn process(window: &mut Window, camera: &mut FlyCamera, delta_time: f32) {
    window.poll_events();

    let events: Vec<WindowEvent> = window
        .flush_events()
        .map(|(_, event)| event)
        .collect();

    for event in events {
        match event {
            WindowEvent::Key(Key::Escape, _, Action::Press, _) | WindowEvent::Close => {
                window.set_should_close(true);
            }
            WindowEvent::CursorPos(x, y) => {
                camera.process_cursor(x as f32, y as f32);
            }
            _ => {}
        }
    }

    for (key, movement) in [
        (Key::W, CameraMovement::Forward),
        (Key::S, CameraMovement::Backward),
        (Key::A, CameraMovement::Left),
        (Key::D, CameraMovement::Right),
    ] {
        if window.key_pressed(key) {
            camera.process_movement(movement, delta_time);
        }
    }
}
