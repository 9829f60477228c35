/// Pointer button as seen by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Left mouse button or primary touch.
    Primary,
    /// Right mouse button.
    Secondary,
}

/// Host events delivered to the app. Coordinates are pixels relative to the
/// top-left corner of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { x: f32, y: f32, button: PointerButton },
    PointerMove { x: f32, y: f32 },
    PointerUp { x: f32, y: f32, button: PointerButton },
    /// A completed primary press-and-release. Spawns a sphere.
    Click { x: f32, y: f32 },
    /// Scroll amount with the sign of a browser `deltaY`: positive when the
    /// wheel turns toward the user (scrolling down), negative away from them.
    Wheel { delta: f32 },
    Resize { width: u32, height: u32 },
}
