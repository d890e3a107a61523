use std::fmt;
use std::path::Path;

use crate::device::{GraphicsContext, GraphicsError, GraphicsResult, ShaderHandle};
use crate::logging::LogSink;

/// Pipeline stage a shader belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderKind {
    Vertex,
    Fragment,
    Geometry,
    TessControl,
    TessEvaluation,
    Compute,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 6] = [
        ShaderKind::Vertex,
        ShaderKind::Fragment,
        ShaderKind::Geometry,
        ShaderKind::TessControl,
        ShaderKind::TessEvaluation,
        ShaderKind::Compute,
    ];

    /// Slot index inside a program's stage table.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            ShaderKind::Vertex => 0,
            ShaderKind::Fragment => 1,
            ShaderKind::Geometry => 2,
            ShaderKind::TessControl => 3,
            ShaderKind::TessEvaluation => 4,
            ShaderKind::Compute => 5,
        }
    }

    /// Conventional file extension for sources of this kind.
    pub const fn extension(self) -> &'static str {
        match self {
            ShaderKind::Vertex => "vert",
            ShaderKind::Fragment => "frag",
            ShaderKind::Geometry => "geom",
            ShaderKind::TessControl => "tesc",
            ShaderKind::TessEvaluation => "tese",
            ShaderKind::Compute => "comp",
        }
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderKind::Vertex => "vertex",
            ShaderKind::Fragment => "fragment",
            ShaderKind::Geometry => "geometry",
            ShaderKind::TessControl => "tessellation control",
            ShaderKind::TessEvaluation => "tessellation evaluation",
            ShaderKind::Compute => "compute",
        })
    }
}

/// A compiled shader, tagged with the stage it was compiled for.
///
/// The stage owns its native handle. It is released either by the program it
/// is attached to or by [`ShaderStage::dispose`].
#[derive(Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex(ShaderHandle),
    Fragment(ShaderHandle),
    Geometry(ShaderHandle),
    TessControl(ShaderHandle),
    TessEvaluation(ShaderHandle),
    Compute(ShaderHandle),
}

impl ShaderStage {
    /// Compiles `source` as a `kind` shader.
    ///
    /// The driver's info log is written to `log` when it is not blank. On
    /// failure the native shader is released and the log is returned in
    /// [`GraphicsError::CompileFailed`].
    pub fn compile(
        gl: &dyn GraphicsContext,
        kind: ShaderKind,
        source: &str,
        log: &LogSink,
    ) -> GraphicsResult<Self> {
        let handle = gl.create_shader(kind)?;
        gl.shader_source(handle, source);
        gl.compile_shader(handle);

        let info = gl.shader_info_log(handle);
        log.message(&info);

        if !gl.shader_compile_status(handle) {
            gl.delete_shader(handle);
            return Err(GraphicsError::CompileFailed {
                kind,
                log: info.trim().to_string(),
            });
        }

        log::debug!("compiled {kind} shader {handle}");
        Ok(Self::from_handle(kind, handle))
    }

    /// Reads and compiles a shader source file.
    pub fn from_file(
        gl: &dyn GraphicsContext,
        kind: ShaderKind,
        path: impl AsRef<Path>,
        log: &LogSink,
    ) -> GraphicsResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GraphicsError::FileNotFound(path.to_path_buf()),
            _ => GraphicsError::Io(e),
        })?;
        Self::compile(gl, kind, &source, log)
    }

    pub const fn from_handle(kind: ShaderKind, handle: ShaderHandle) -> Self {
        match kind {
            ShaderKind::Vertex => Self::Vertex(handle),
            ShaderKind::Fragment => Self::Fragment(handle),
            ShaderKind::Geometry => Self::Geometry(handle),
            ShaderKind::TessControl => Self::TessControl(handle),
            ShaderKind::TessEvaluation => Self::TessEvaluation(handle),
            ShaderKind::Compute => Self::Compute(handle),
        }
    }

    pub const fn kind(&self) -> ShaderKind {
        match self {
            Self::Vertex(_) => ShaderKind::Vertex,
            Self::Fragment(_) => ShaderKind::Fragment,
            Self::Geometry(_) => ShaderKind::Geometry,
            Self::TessControl(_) => ShaderKind::TessControl,
            Self::TessEvaluation(_) => ShaderKind::TessEvaluation,
            Self::Compute(_) => ShaderKind::Compute,
        }
    }

    pub const fn handle(&self) -> ShaderHandle {
        match *self {
            Self::Vertex(h)
            | Self::Fragment(h)
            | Self::Geometry(h)
            | Self::TessControl(h)
            | Self::TessEvaluation(h)
            | Self::Compute(h) => h,
        }
    }

    /// Releases a stage that was never attached to a program.
    pub fn dispose(self, gl: &dyn GraphicsContext) {
        gl.delete_shader(self.handle());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::ObjectKind;
    use crate::device::MockContext;

    #[test]
    fn compile_tags_stage_with_kind() {
        let gl = MockContext::new();
        let log = LogSink::memory();
        let stage = ShaderStage::compile(&gl, ShaderKind::Geometry, "void main() {}", &log).unwrap();

        assert_eq!(stage.kind(), ShaderKind::Geometry);
        assert!(matches!(stage, ShaderStage::Geometry(_)));
        assert_eq!(gl.shader_source_of(stage.handle()).as_deref(), Some("void main() {}"));
        assert!(log.messages().is_empty());
    }

    #[test]
    fn compile_failure_releases_handle_and_reports_log() {
        let gl = MockContext::new();
        let log = LogSink::memory();
        gl.fail_compile("0:3: 'vec5' : undeclared identifier\n");

        let err = ShaderStage::compile(&gl, ShaderKind::Fragment, "bad", &log).unwrap_err();
        match err {
            GraphicsError::CompileFailed { kind, log: text } => {
                assert_eq!(kind, ShaderKind::Fragment);
                assert_eq!(text, "0:3: 'vec5' : undeclared identifier");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(gl.live(ObjectKind::Shader).is_empty());
        assert_eq!(log.messages().len(), 1);
    }

    #[test]
    fn warnings_are_logged_on_success() {
        let gl = MockContext::new();
        let log = LogSink::memory();
        gl.set_info_log("0:1: warning: precision qualifier ignored");
        ShaderStage::compile(&gl, ShaderKind::Vertex, "", &log).unwrap();
        assert_eq!(log.messages(), vec!["0:1: warning: precision qualifier ignored".to_string()]);
    }

    #[test]
    fn missing_source_file_is_file_not_found() {
        let gl = MockContext::new();
        let path = std::env::temp_dir().join("doodle-definitely-missing.vert");
        let err = ShaderStage::from_file(&gl, ShaderKind::Vertex, &path, &LogSink::memory()).unwrap_err();
        assert!(matches!(err, GraphicsError::FileNotFound(p) if p == path));
    }

    #[test]
    fn kind_index_covers_every_slot() {
        let mut seen = [false; 6];
        for kind in ShaderKind::ALL {
            seen[kind.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
