use crate::graphics::GraphicsDevice;
use crate::input::InputState;
use crate::time::FrameTime;

/// Context handed to the per-tick [`Game`](super::Game) hooks.
pub struct GameCtx<'a> {
    pub graphics: &'a mut GraphicsDevice,
    pub input: &'a InputState,
    /// Drawable size in physical pixels.
    pub window_size: (u32, u32),
    pub time: FrameTime,
    exit: &'a mut bool,
}

impl<'a> GameCtx<'a> {
    pub(crate) fn new(
        graphics: &'a mut GraphicsDevice,
        input: &'a InputState,
        window_size: (u32, u32),
        time: FrameTime,
        exit: &'a mut bool,
    ) -> Self {
        Self { graphics, input, window_size, time, exit }
    }

    /// Width over height, `1.0` for a degenerate size.
    pub fn aspect_ratio(&self) -> f32 {
        match self.window_size {
            (w, h) if w > 0 && h > 0 => w as f32 / h as f32,
            _ => 1.0,
        }
    }

    /// Stops the run loop after the current hook returns.
    pub fn exit(&mut self) {
        *self.exit = true;
    }
}
