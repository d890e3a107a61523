use doodle_engine::device::PolygonMode;
use doodle_engine::graphics::curve::MIN_SAMPLES;
use doodle_engine::input::Key;
use glam::Vec2;
use rand::Rng;

/// Distance a control point moves per key press.
pub const MOVE_SPEED: f32 = 0.01;

/// Which of the two curve programs draws the scene.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SceneShader {
    Basic,
    Sample,
}

/// Editable state of the curve demo, independent of the GPU.
#[derive(Debug, Clone)]
pub struct CurveScene {
    pub samples: usize,
    pub start: Vec2,
    pub end: Vec2,
    pub control_a: Vec2,
    pub control_b: Vec2,
    pub curve: Vec<Vec2>,
    pub shader: SceneShader,
    pub polygon_mode: PolygonMode,
}

impl Default for CurveScene {
    fn default() -> Self {
        Self {
            samples: 15,
            start: Vec2::NEG_ONE,
            end: Vec2::ONE,
            control_a: Vec2::new(-0.3, -1.0),
            control_b: Vec2::new(0.3, 1.0),
            curve: vec![Vec2::new(-2.0, 0.0), Vec2::new(2.0, 0.0)],
            shader: SceneShader::Basic,
            polygon_mode: PolygonMode::Fill,
        }
    }
}

impl CurveScene {
    /// Applies a key press (repeats included).
    ///
    /// Returns `true` when the polygon mode changed and must be pushed to
    /// the device.
    pub fn handle_key(&mut self, key: Key) -> bool {
        let mut mode_changed = false;
        match key {
            Key::F1 => {
                self.shader = match self.shader {
                    SceneShader::Basic => SceneShader::Sample,
                    SceneShader::Sample => SceneShader::Basic,
                }
            }

            Key::Space => self.samples += 1,
            Key::ControlLeft => self.samples = self.samples.saturating_sub(1),

            Key::A => self.control_a.x -= MOVE_SPEED,
            Key::D => self.control_a.x += MOVE_SPEED,
            Key::W => self.control_a.y += MOVE_SPEED,
            Key::S => self.control_a.y -= MOVE_SPEED,

            Key::ArrowLeft => self.control_b.x -= MOVE_SPEED,
            Key::ArrowRight => self.control_b.x += MOVE_SPEED,
            Key::ArrowUp => self.control_b.y += MOVE_SPEED,
            Key::ArrowDown => self.control_b.y -= MOVE_SPEED,

            Key::Z => mode_changed = self.set_polygon_mode(PolygonMode::Line),
            Key::X => mode_changed = self.set_polygon_mode(PolygonMode::Fill),

            _ => {}
        }
        self.samples = self.samples.max(MIN_SAMPLES);
        mode_changed
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) -> bool {
        let changed = self.polygon_mode != mode;
        self.polygon_mode = mode;
        changed
    }

    /// Replaces the free-form curve with 2 to 11 points running from
    /// (-2, 0) to (2, 0); inner points lie in [-2, 2] x [-1, 1].
    pub fn randomize_curve(&mut self, rng: &mut impl Rng) {
        let count = 2 + rng.random_range(0..10);
        let mut curve = Vec::with_capacity(count);
        curve.push(Vec2::new(-2.0, 0.0));
        for _ in 1..count - 1 {
            let x = (rng.random::<f32>() - 0.5) * 4.0;
            let y = (rng.random::<f32>() - 0.5) * 2.0;
            curve.push(Vec2::new(x, y));
        }
        curve.push(Vec2::new(2.0, 0.0));
        self.curve = curve;
    }

    /// Start, end and both control points of the cubic.
    pub fn handles(&self) -> [Vec2; 4] {
        [self.start, self.end, self.control_a, self.control_b]
    }
}
