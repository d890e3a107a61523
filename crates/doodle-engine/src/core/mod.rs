//! Contract between the runtime loop and the game.

mod ctx;
mod game;

pub use ctx::GameCtx;
pub use game::Game;
