use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glutin::config::{ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentGlContext, PossiblyCurrentContext,
    Version,
};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::surface::{GlSurface, Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasWindowHandle;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{Game, GameCtx};
use crate::device::GlContext;
use crate::graphics::GraphicsDevice;
use crate::input::platform::{committed_text, translate_window_event};
use crate::input::{InputEvent, InputState};
use crate::logging::LogSink;
use crate::time::{FixedRate, FrameClock, FrameTime};

/// Requested OpenGL context parameters.
#[derive(Debug, Clone)]
pub struct GlInit {
    /// Core profile version, `(major, minor)`.
    pub version: (u8, u8),
    /// Multisample count; `0` disables multisampling.
    pub samples: u8,
    /// Request an sRGB-capable default framebuffer.
    pub srgb: bool,
}

impl Default for GlInit {
    fn default() -> Self {
        Self {
            version: (3, 3),
            samples: 0,
            srgb: false,
        }
    }
}

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub resizable: bool,
    /// Target update rate in Hz; `0` runs updates as fast as possible.
    pub updates_per_second: f64,
    /// Target frame rate in Hz; `0` draws as fast as possible.
    pub frames_per_second: f64,
    pub vsync: bool,
    pub gl: GlInit,
    /// File receiving driver diagnostics in addition to the `log` facade.
    pub gl_log_file: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "Doodle Empires".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
            resizable: false,
            updates_per_second: 60.0,
            frames_per_second: 60.0,
            vsync: true,
            gl: GlInit::default(),
            gl_log_file: None,
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Runs `game` until the window closes, a hook calls
    /// [`GameCtx::exit`], or a hook fails.
    ///
    /// The first hook error is returned after the shutdown hooks ran.
    pub fn run<G>(config: RuntimeConfig, mut game: G) -> Result<()>
    where
        G: Game + 'static,
    {
        game.initialize().context("game initialization failed")?;

        let log = match &config.gl_log_file {
            Some(path) => LogSink::with_file(path)
                .with_context(|| format!("failed to open GL log {}", path.display()))?,
            None => LogSink::new(),
        };

        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, game, log);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        state.finish()
    }
}

/// Window, GL objects and the device, dropped in declaration order.
struct WindowEntry {
    device: GraphicsDevice,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: Window,
}

impl WindowEntry {
    fn create(event_loop: &ActiveEventLoop, config: &RuntimeConfig, log: LogSink) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(config.initial_size)
            .with_resizable(config.resizable);

        let mut template = ConfigTemplateBuilder::new().with_alpha_size(8);
        if config.gl.samples > 0 {
            template = template.with_multisampling(config.gl.samples);
        }

        let (window, gl_config) = DisplayBuilder::new()
            .with_window_attributes(Some(attrs))
            .build(event_loop, template, |configs| {
                // Prefer the config with the most samples; ties keep the first.
                configs
                    .reduce(|best, c| if c.num_samples() > best.num_samples() { c } else { best })
                    .expect("glutin offers at least one config")
            })
            .map_err(|e| anyhow!("failed to create GL display: {e}"))?;
        let window = window.context("display builder returned no window")?;

        let raw_handle = window
            .window_handle()
            .context("window has no native handle")?
            .as_raw();
        let (major, minor) = config.gl.version;
        let context_attrs = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(major, minor))))
            .build(Some(raw_handle));

        let display = gl_config.display();
        let not_current = unsafe { display.create_context(&gl_config, &context_attrs) }
            .with_context(|| format!("failed to create OpenGL {major}.{minor} core context"))?;

        let surface_attrs = window
            .build_surface_attributes(
                SurfaceAttributesBuilder::<WindowSurface>::new().with_srgb(Some(config.gl.srgb)),
            )
            .context("failed to describe window surface")?;
        let surface = unsafe { display.create_window_surface(&gl_config, &surface_attrs) }
            .context("failed to create window surface")?;
        let context = not_current
            .make_current(&surface)
            .context("failed to make GL context current")?;

        let interval = if config.vsync {
            SwapInterval::Wait(NonZeroU32::MIN)
        } else {
            SwapInterval::DontWait
        };
        if let Err(e) = surface.set_swap_interval(&context, interval) {
            log::warn!("cannot set swap interval: {e}");
        }

        // SAFETY: the context was made current above and stays current on
        // this thread for the lifetime of the entry.
        let gl = unsafe { GlContext::from_loader(|name| display.get_proc_address(name)) };
        let device = GraphicsDevice::new(gl, log).context("failed to create graphics device")?;

        let size = window.inner_size();
        device.set_viewport(0, 0, size.width, size.height);

        log::info!("window created: {}x{}", size.width, size.height);

        Ok(Self { device, surface, context, window })
    }

    fn size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }
}

/// Writes `err` and its context chain to the diagnostics sink.
fn report_failure(log: &LogSink, err: &anyhow::Error) {
    log.error(&**err);
}

struct AppState<G: Game> {
    config: RuntimeConfig,
    game: G,
    log: LogSink,

    entry: Option<WindowEntry>,
    input_state: InputState,

    update_rate: FixedRate,
    draw_rate: FixedRate,
    update_clock: FrameClock,
    draw_clock: FrameClock,
    last_update: FrameTime,

    exit_requested: bool,
    error: Option<anyhow::Error>,
}

impl<G: Game> AppState<G> {
    fn new(config: RuntimeConfig, game: G, log: LogSink) -> Self {
        let now = Instant::now();
        let update_rate = FixedRate::new(config.updates_per_second, now);
        let draw_rate = FixedRate::new(config.frames_per_second, now);
        Self {
            config,
            game,
            log,
            entry: None,
            input_state: InputState::default(),
            update_rate,
            draw_rate,
            update_clock: FrameClock::starting_at(now),
            draw_clock: FrameClock::starting_at(now),
            last_update: FrameTime { dt: 0.0, now, frame_index: 0 },
            exit_requested: false,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        report_failure(&self.log, &err);
        if self.error.is_none() {
            self.error = Some(err);
        }
        self.exit_requested = true;
        event_loop.exit();
    }

    /// Runs `hook` with a [`GameCtx`] built from the current window.
    fn with_ctx<F>(&mut self, event_loop: &ActiveEventLoop, time: FrameTime, hook: F)
    where
        F: FnOnce(&mut G, &mut GameCtx<'_>) -> Result<()>,
    {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };
        let window_size = entry.size();

        let mut exit = false;
        let result = {
            let mut ctx = GameCtx::new(
                &mut entry.device,
                &self.input_state,
                window_size,
                time,
                &mut exit,
            );
            hook(&mut self.game, &mut ctx)
        };

        if let Err(e) = result {
            self.fail(event_loop, e);
        } else if exit {
            self.exit_requested = true;
            event_loop.exit();
        }
    }

    fn handle_input(&mut self, event_loop: &ActiveEventLoop, event: &WindowEvent) {
        let mut events = Vec::with_capacity(2);
        if let Some(ev) = translate_window_event(event, self.input_state.modifiers) {
            events.push(ev);
        }
        if let Some(text) = committed_text(event) {
            events.push(InputEvent::Text(text));
        }

        let time = self.last_update;
        for ev in events {
            self.input_state.apply_event(&ev);
            match ev {
                InputEvent::Key(key) => {
                    self.with_ctx(event_loop, time, |game, ctx| game.on_key(ctx, key));
                }
                InputEvent::Text(text) => {
                    self.with_ctx(event_loop, time, |game, ctx| game.on_text(ctx, &text));
                }
                _ => {}
            }
        }
    }

    fn update(&mut self, event_loop: &ActiveEventLoop) {
        let time = self.update_clock.tick();
        self.last_update = time;
        self.with_ctx(event_loop, time, |game, ctx| game.update(ctx));
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let time = self.draw_clock.tick();
        self.with_ctx(event_loop, time, |game, ctx| game.draw(ctx));

        if self.exit_requested {
            return;
        }
        let swapped = match self.entry.as_ref() {
            Some(entry) => entry.surface.swap_buffers(&entry.context),
            None => return,
        };
        if let Err(e) = swapped {
            self.fail(event_loop, anyhow!(e).context("failed to swap buffers"));
        }
    }

    fn resize(&mut self, event_loop: &ActiveEventLoop) {
        let Some(entry) = self.entry.as_ref() else {
            return;
        };
        entry.window.resize_surface(&entry.surface, &entry.context);
        let (width, height) = entry.size();
        entry.device.set_viewport(0, 0, width, height);

        let time = self.last_update;
        self.with_ctx(event_loop, time, |game, ctx| game.resized(ctx));
    }

    /// Releases the game content and the window; the GL log is closed last.
    fn shutdown(&mut self) {
        if let Some(mut entry) = self.entry.take() {
            self.game.unload_content(&mut entry.device);
            let WindowEntry { device, surface, context, window } = entry;
            drop(device.dispose());
            drop(surface);
            drop(context);
            drop(window);
            self.game.closed();
            log::info!("window closed");
        }
        if let Err(e) = self.log.close() {
            log::warn!("failed to close GL log: {e}");
        }
    }

    fn finish(mut self) -> Result<()> {
        self.shutdown();
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<G: Game> ApplicationHandler for AppState<G> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.exit_requested {
            return;
        }

        let entry = match WindowEntry::create(event_loop, &self.config, self.log.clone()) {
            Ok(entry) => entry,
            Err(e) => {
                self.fail(event_loop, e.context("failed to create game window"));
                return;
            }
        };
        let entry = self.entry.insert(entry);

        if let Err(e) = self.game.load_content(&mut entry.device) {
            self.fail(event_loop, e.context("failed to load content"));
            return;
        }

        let now = Instant::now();
        self.update_rate = FixedRate::new(self.config.updates_per_second, now);
        self.draw_rate = FixedRate::new(self.config.frames_per_second, now);
        self.update_clock = FrameClock::starting_at(now);
        self.draw_clock = FrameClock::starting_at(now);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        if self.entry.is_none() {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        }

        let now = Instant::now();
        if self.update_rate.poll(now) {
            self.update(event_loop);
        }
        if self.draw_rate.poll(now) {
            if let Some(entry) = self.entry.as_ref() {
                entry.window.request_redraw();
            }
        }

        let flow = match (self.update_rate.deadline(), self.draw_rate.deadline()) {
            (Some(a), Some(b)) => ControlFlow::WaitUntil(a.min(b)),
            _ => ControlFlow::Poll,
        };
        event_loop.set_control_flow(flow);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        if self.entry.as_ref().map(|e| e.window.id()) != Some(window_id) {
            return;
        }

        self.handle_input(event_loop, &event);

        match event {
            WindowEvent::CloseRequested => {
                if self.game.closing() {
                    self.exit_requested = true;
                    event_loop.exit();
                } else {
                    log::debug!("close request declined by the game");
                }
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                self.resize(event_loop);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── failures ──

    #[test]
    fn failures_reach_the_sink_with_their_context() {
        let log = LogSink::memory();
        let err = Err::<(), _>(std::io::Error::new(std::io::ErrorKind::NotFound, "Basic.vert"))
            .context("LoadContent failed")
            .unwrap_err();

        report_failure(&log, &err);

        assert_eq!(
            log.messages(),
            vec!["error: LoadContent failed\n  caused by: Basic.vert".to_string()]
        );
    }
}
