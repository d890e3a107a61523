use super::ctx::GameCtx;
use crate::graphics::GraphicsDevice;
use crate::input::{KeyEvent, TextEvent};

/// Game contract driven by [`Runtime::run`](crate::window::Runtime::run).
///
/// Call order:
/// - `initialize` before the window and graphics device exist
/// - `load_content` once the device exists
/// - `update` and `draw` at their target rates, interleaved with input hooks
/// - `closing` when the user asks to close the window
/// - `unload_content`, then `closed`, on shutdown
///
/// Any hook error stops the loop and is returned from `Runtime::run`.
pub trait Game {
    fn initialize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn load_content(&mut self, graphics: &mut GraphicsDevice) -> anyhow::Result<()> {
        let _ = graphics;
        Ok(())
    }

    /// Releases GPU resources owned by the game. The device is still alive.
    fn unload_content(&mut self, graphics: &mut GraphicsDevice) {
        let _ = graphics;
    }

    /// Advances the simulation; `ctx.time.dt` is the time since the previous update.
    fn update(&mut self, ctx: &mut GameCtx<'_>) -> anyhow::Result<()>;

    /// Renders a frame; buffers are swapped after it returns.
    fn draw(&mut self, ctx: &mut GameCtx<'_>) -> anyhow::Result<()>;

    fn on_key(&mut self, ctx: &mut GameCtx<'_>, event: KeyEvent) -> anyhow::Result<()> {
        let _ = (ctx, event);
        Ok(())
    }

    fn on_text(&mut self, ctx: &mut GameCtx<'_>, event: &TextEvent) -> anyhow::Result<()> {
        let _ = (ctx, event);
        Ok(())
    }

    /// Called after the window and viewport were resized.
    fn resized(&mut self, ctx: &mut GameCtx<'_>) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Return `false` to keep the window open.
    fn closing(&mut self) -> bool {
        true
    }

    fn closed(&mut self) {}
}
