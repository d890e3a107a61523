mod game;
mod scene;

use anyhow::Result;
use doodle_engine::logging::{init_logging, LoggingConfig};
use doodle_engine::window::{Runtime, RuntimeConfig};

use game::DoodleGame;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "Doodle Empires".to_string(),
        gl_log_file: Some("gl.log".into()),
        ..RuntimeConfig::default()
    };

    log::info!("starting {}", config.title);
    let result = Runtime::run(config, DoodleGame::new());
    if let Err(e) = &result {
        log::error!("game stopped: {e:#}");
    }
    result
}
