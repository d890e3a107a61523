//! Time subsystem.
//!
//! Frame timing utilities that do not depend on the runtime:
//! - [`FrameClock`] measures elapsed time between ticks
//! - [`FixedRate`] decides when the next update or frame is due

mod fixed_rate;
mod frame_clock;

pub use fixed_rate::FixedRate;
pub use frame_clock::{FrameClock, FrameTime};
