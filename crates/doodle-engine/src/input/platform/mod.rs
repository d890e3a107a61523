//! Translation from platform events.

mod winit;

pub use self::winit::{committed_text, map_key, translate_window_event};
