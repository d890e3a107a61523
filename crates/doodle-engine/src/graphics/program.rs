use std::path::{Path, PathBuf};

use glam::{Mat4, Vec2, Vec4};

use super::shader::{ShaderKind, ShaderStage};
use crate::device::{
    check_error, GraphicsContext, GraphicsError, GraphicsResult, ProgramHandle, UniformLocation,
    UniformValue,
};
use crate::logging::LogSink;

/// An active uniform discovered after linking.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ShaderResource {
    pub name: String,
    pub location: UniformLocation,
    pub size: i32,
    pub utype: u32,
}

/// A native program object and the stages attached to it.
///
/// Lifecycle:
/// - stages are attached while unlinked
/// - [`link`](Self::link) moves the program to the linked state exactly once
/// - [`unattach`](Self::unattach) releases every stage and returns to unlinked
/// - [`dispose`](Self::dispose) releases stages and the program itself
///
/// Only a linked program can be [`apply`](Self::apply)-ed.
#[derive(Debug)]
pub struct ShaderProgram {
    handle: ProgramHandle,
    stages: [Option<ShaderStage>; 6],
    linked: bool,
    resources: Vec<ShaderResource>,
}

impl ShaderProgram {
    /// Creates an empty, unlinked program.
    pub fn new(gl: &dyn GraphicsContext) -> GraphicsResult<Self> {
        let handle = gl.create_program()?;
        Ok(Self {
            handle,
            stages: Default::default(),
            linked: false,
            resources: Vec::new(),
        })
    }

    /// Builds and links a program from `<name>.vert` and the first
    /// `<name>*.frag` (by file name) inside `dir`.
    ///
    /// With `name == None` any stem matches. A missing vertex or fragment
    /// source yields [`GraphicsError::FileNotFound`].
    pub fn load_from_path(
        gl: &dyn GraphicsContext,
        log: &LogSink,
        dir: impl AsRef<Path>,
        name: Option<&str>,
    ) -> GraphicsResult<Self> {
        let dir = dir.as_ref();
        let (vert, frag) = find_sources(dir, name)?;
        log::debug!("loading program from {} and {}", vert.display(), frag.display());

        Self::build(gl, |program| program.build_from_files(gl, log, &vert, &frag))
    }

    /// Compiles and links a program from in-memory vertex and fragment sources.
    pub fn from_sources(
        gl: &dyn GraphicsContext,
        log: &LogSink,
        vertex: &str,
        fragment: &str,
    ) -> GraphicsResult<Self> {
        Self::build(gl, |program| {
            program.attach(gl, ShaderStage::compile(gl, ShaderKind::Vertex, vertex, log)?)?;
            program.attach(gl, ShaderStage::compile(gl, ShaderKind::Fragment, fragment, log)?)?;
            program.link(gl, log)
        })
    }

    /// Runs `steps` on a fresh program, releasing it if any step fails.
    fn build(
        gl: &dyn GraphicsContext,
        steps: impl FnOnce(&mut Self) -> GraphicsResult<()>,
    ) -> GraphicsResult<Self> {
        let mut program = Self::new(gl)?;
        match steps(&mut program) {
            Ok(()) => Ok(program),
            Err(e) => {
                program.dispose(gl);
                Err(e)
            }
        }
    }

    fn build_from_files(
        &mut self,
        gl: &dyn GraphicsContext,
        log: &LogSink,
        vert: &Path,
        frag: &Path,
    ) -> GraphicsResult<()> {
        self.attach(gl, ShaderStage::from_file(gl, ShaderKind::Vertex, vert, log)?)?;
        self.attach(gl, ShaderStage::from_file(gl, ShaderKind::Fragment, frag, log)?)?;
        self.link(gl, log)
    }

    // ── state machine ─────────────────────────────────────────────────────

    /// Attaches `stage`, replacing and releasing any stage of the same kind.
    ///
    /// Fails with [`GraphicsError::InvalidStage`] once the program is linked;
    /// the rejected stage is released.
    pub fn attach(&mut self, gl: &dyn GraphicsContext, stage: ShaderStage) -> GraphicsResult<()> {
        let kind = stage.kind();
        if self.linked {
            stage.dispose(gl);
            return Err(GraphicsError::InvalidStage(kind));
        }

        gl.attach_shader(self.handle, stage.handle());
        if let Some(previous) = self.stages[kind.index()].replace(stage) {
            gl.detach_shader(self.handle, previous.handle());
            gl.delete_shader(previous.handle());
        }
        Ok(())
    }

    /// Links the attached stages.
    ///
    /// The vertex and fragment stages are required. The driver's info log is
    /// written to `log` when it is not blank. A failed native link leaves the
    /// program unlinked and returns the driver log in
    /// [`GraphicsError::LinkFailed`].
    pub fn link(&mut self, gl: &dyn GraphicsContext, log: &LogSink) -> GraphicsResult<()> {
        for required in [ShaderKind::Vertex, ShaderKind::Fragment] {
            if self.stages[required.index()].is_none() {
                return Err(GraphicsError::MissingStage(required));
            }
        }
        if self.linked {
            return Err(GraphicsError::AlreadyLinked);
        }

        gl.link_program(self.handle);

        let info = gl.program_info_log(self.handle);
        log.message(&info);

        if !gl.program_link_status(self.handle) {
            return Err(GraphicsError::LinkFailed(info.trim().to_string()));
        }
        if !gl.is_program(self.handle) {
            return Err(GraphicsError::ProgramLost);
        }
        check_error(gl)?;

        self.linked = true;
        self.build_resources(gl);
        log::debug!(
            "linked program {} with {} active uniform(s)",
            self.handle,
            self.resources.len()
        );
        Ok(())
    }

    /// Detaches and releases every stage, returning to the unlinked state.
    pub fn unattach(&mut self, gl: &dyn GraphicsContext) -> GraphicsResult<()> {
        if !self.linked {
            return Err(GraphicsError::NotLinked);
        }
        self.release_stages(gl);
        self.linked = false;
        self.resources.clear();
        Ok(())
    }

    /// Makes this program current for subsequent draws.
    pub fn apply(&self, gl: &dyn GraphicsContext) -> GraphicsResult<()> {
        if !self.linked {
            return Err(GraphicsError::NotLinked);
        }
        if !gl.is_program(self.handle) {
            return Err(GraphicsError::ProgramLost);
        }
        gl.use_program(Some(self.handle));
        Ok(())
    }

    /// Releases every stage and the program object.
    pub fn dispose(mut self, gl: &dyn GraphicsContext) {
        if self.linked {
            self.release_stages(gl);
            self.linked = false;
        } else {
            for stage in self.stages.iter_mut().filter_map(Option::take) {
                gl.delete_shader(stage.handle());
            }
        }
        if gl.current_program() == Some(self.handle) {
            gl.use_program(None);
        }
        gl.delete_program(self.handle);
    }

    fn release_stages(&mut self, gl: &dyn GraphicsContext) {
        for stage in self.stages.iter_mut().filter_map(Option::take) {
            gl.detach_shader(self.handle, stage.handle());
            gl.delete_shader(stage.handle());
        }
    }

    // ── reflection ────────────────────────────────────────────────────────

    /// Re-reads the active uniforms of a linked program.
    pub fn build_resources(&mut self, gl: &dyn GraphicsContext) {
        self.resources = gl
            .active_uniforms(self.handle)
            .into_iter()
            .filter_map(|u| {
                let location = gl.uniform_location(self.handle, &u.name)?;
                Some(ShaderResource {
                    name: u.name,
                    location,
                    size: u.size,
                    utype: u.utype,
                })
            })
            .collect();
    }

    pub fn uniforms(&self) -> &[ShaderResource] {
        &self.resources
    }

    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.resources
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.location)
    }

    // ── uniforms ──────────────────────────────────────────────────────────
    //
    // Setters write to the program currently in use, so call `apply` first.
    // They return `false` when the uniform is not active.

    pub fn set_uniform(&self, gl: &dyn GraphicsContext, name: &str, value: UniformValue) -> bool {
        match self.uniform_location(name) {
            Some(location) => {
                gl.set_uniform(location, value);
                true
            }
            None => false,
        }
    }

    pub fn set_i32(&self, gl: &dyn GraphicsContext, name: &str, v: i32) -> bool {
        self.set_uniform(gl, name, UniformValue::I32(v))
    }

    pub fn set_f32(&self, gl: &dyn GraphicsContext, name: &str, v: f32) -> bool {
        self.set_uniform(gl, name, UniformValue::F32(v))
    }

    pub fn set_vec2(&self, gl: &dyn GraphicsContext, name: &str, v: Vec2) -> bool {
        self.set_uniform(gl, name, UniformValue::Vec2(v.to_array()))
    }

    pub fn set_vec4(&self, gl: &dyn GraphicsContext, name: &str, v: Vec4) -> bool {
        self.set_uniform(gl, name, UniformValue::Vec4(v.to_array()))
    }

    pub fn set_mat4(&self, gl: &dyn GraphicsContext, name: &str, m: &Mat4) -> bool {
        self.set_uniform(gl, name, UniformValue::Mat4(m.to_cols_array()))
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    pub fn stage(&self, kind: ShaderKind) -> Option<&ShaderStage> {
        self.stages[kind.index()].as_ref()
    }
}

/// Finds `<name>.vert` and the first `<name>*.frag` in `dir`.
fn find_sources(dir: &Path, name: Option<&str>) -> GraphicsResult<(PathBuf, PathBuf)> {
    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => GraphicsError::FileNotFound(dir.to_path_buf()),
        _ => GraphicsError::Io(e),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let stem_of = |p: &Path| p.file_stem().and_then(|s| s.to_str()).map(str::to_owned);
    let has_ext = |p: &Path, ext: &str| p.extension().is_some_and(|e| e == ext);

    let vert = files
        .iter()
        .find(|p| {
            has_ext(p, ShaderKind::Vertex.extension())
                && name.is_none_or(|n| stem_of(p).as_deref() == Some(n))
        })
        .cloned()
        .ok_or_else(|| GraphicsError::FileNotFound(dir.join(format!("{}.vert", name.unwrap_or("*")))))?;

    let frag = files
        .iter()
        .find(|p| {
            has_ext(p, ShaderKind::Fragment.extension())
                && name.is_none_or(|n| stem_of(p).is_some_and(|s| s.starts_with(n)))
        })
        .cloned()
        .ok_or_else(|| GraphicsError::FileNotFound(dir.join(format!("{}*.frag", name.unwrap_or("")))))?;

    Ok((vert, frag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::{Call, ObjectKind};
    use crate::device::{GlErrorCode, MockContext};

    fn stage(gl: &MockContext, kind: ShaderKind) -> ShaderStage {
        ShaderStage::compile(gl, kind, "void main() {}", &LogSink::memory()).unwrap()
    }

    fn linked(gl: &MockContext) -> ShaderProgram {
        let mut program = ShaderProgram::new(gl).unwrap();
        program.attach(gl, stage(gl, ShaderKind::Vertex)).unwrap();
        program.attach(gl, stage(gl, ShaderKind::Fragment)).unwrap();
        program.link(gl, &LogSink::memory()).unwrap();
        program
    }

    // ── link ──────────────────────────────────────────────────────────────

    #[test]
    fn link_without_vertex_stage_fails() {
        let gl = MockContext::new();
        let mut program = ShaderProgram::new(&gl).unwrap();
        program.attach(&gl, stage(&gl, ShaderKind::Fragment)).unwrap();

        let err = program.link(&gl, &LogSink::memory()).unwrap_err();
        assert!(matches!(err, GraphicsError::MissingStage(ShaderKind::Vertex)));
        assert!(!program.is_linked());
    }

    #[test]
    fn link_without_fragment_stage_fails() {
        let gl = MockContext::new();
        let mut program = ShaderProgram::new(&gl).unwrap();
        program.attach(&gl, stage(&gl, ShaderKind::Vertex)).unwrap();
        program.attach(&gl, stage(&gl, ShaderKind::Geometry)).unwrap();

        let err = program.link(&gl, &LogSink::memory()).unwrap_err();
        assert!(matches!(err, GraphicsError::MissingStage(ShaderKind::Fragment)));
    }

    #[test]
    fn link_succeeds_exactly_once() {
        let gl = MockContext::new();
        let mut program = linked(&gl);
        assert!(program.is_linked());

        let err = program.link(&gl, &LogSink::memory()).unwrap_err();
        assert!(matches!(err, GraphicsError::AlreadyLinked));
        assert!(program.is_linked());
    }

    #[test]
    fn native_link_failure_stays_unlinked() {
        let gl = MockContext::new();
        let log = LogSink::memory();
        let mut program = ShaderProgram::new(&gl).unwrap();
        program.attach(&gl, stage(&gl, ShaderKind::Vertex)).unwrap();
        program.attach(&gl, stage(&gl, ShaderKind::Fragment)).unwrap();
        gl.fail_link("error: varying v_color not written\n");

        let err = program.link(&gl, &log).unwrap_err();
        match err {
            GraphicsError::LinkFailed(text) => assert_eq!(text, "error: varying v_color not written"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!program.is_linked());
        assert_eq!(log.messages().len(), 1);
        assert!(matches!(program.apply(&gl), Err(GraphicsError::NotLinked)));
    }

    #[test]
    fn pending_native_error_fails_link() {
        let gl = MockContext::new();
        let mut program = ShaderProgram::new(&gl).unwrap();
        program.attach(&gl, stage(&gl, ShaderKind::Vertex)).unwrap();
        program.attach(&gl, stage(&gl, ShaderKind::Fragment)).unwrap();
        gl.inject_error(GlErrorCode::INVALID_OPERATION);

        let err = program.link(&gl, &LogSink::memory()).unwrap_err();
        assert!(matches!(err, GraphicsError::Context(GlErrorCode::INVALID_OPERATION)));
        assert!(!program.is_linked());
    }

    #[test]
    fn link_enumerates_active_uniforms() {
        let gl = MockContext::new();
        gl.set_active_uniforms(["u_transform", "u_texture"]);
        let program = linked(&gl);

        let names: Vec<_> = program.uniforms().iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["u_transform", "u_texture"]);
        assert_eq!(program.uniform_location("u_texture"), Some(UniformLocation(1)));
        assert_eq!(program.uniform_location("u_missing"), None);
    }

    // ── attach ────────────────────────────────────────────────────────────

    #[test]
    fn attach_after_link_is_rejected() {
        let gl = MockContext::new();
        let mut program = linked(&gl);
        let geometry = stage(&gl, ShaderKind::Geometry);
        let geometry_handle = geometry.handle().raw();

        let err = program.attach(&gl, geometry).unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidStage(ShaderKind::Geometry)));
        assert!(!gl.is_live(ObjectKind::Shader, geometry_handle));
        assert!(program.stage(ShaderKind::Geometry).is_none());
    }

    #[test]
    fn attach_replaces_and_releases_previous_stage() {
        let gl = MockContext::new();
        let mut program = ShaderProgram::new(&gl).unwrap();
        let first = stage(&gl, ShaderKind::Vertex);
        let first_handle = first.handle().raw();
        let second = stage(&gl, ShaderKind::Vertex);
        let second_handle = second.handle();

        program.attach(&gl, first).unwrap();
        program.attach(&gl, second).unwrap();

        assert_eq!(program.stage(ShaderKind::Vertex).map(ShaderStage::handle), Some(second_handle));
        assert!(!gl.is_live(ObjectKind::Shader, first_handle));
        assert_eq!(gl.attached_shaders(program.handle()), vec![second_handle.raw()]);
    }

    // ── unattach / apply ──────────────────────────────────────────────────

    #[test]
    fn apply_before_link_fails() {
        let gl = MockContext::new();
        let program = ShaderProgram::new(&gl).unwrap();
        assert!(matches!(program.apply(&gl), Err(GraphicsError::NotLinked)));
        assert_eq!(gl.current_program(), None);
    }

    #[test]
    fn unattach_before_link_fails() {
        let gl = MockContext::new();
        let mut program = ShaderProgram::new(&gl).unwrap();
        program.attach(&gl, stage(&gl, ShaderKind::Vertex)).unwrap();
        assert!(matches!(program.unattach(&gl), Err(GraphicsError::NotLinked)));
        assert!(program.stage(ShaderKind::Vertex).is_some());
    }

    #[test]
    fn unattach_after_link_releases_stages() {
        let gl = MockContext::new();
        let mut program = linked(&gl);

        program.unattach(&gl).unwrap();
        assert!(!program.is_linked());
        assert!(gl.live(ObjectKind::Shader).is_empty());
        assert!(gl.attached_shaders(program.handle()).is_empty());
        assert!(program.uniforms().is_empty());
        assert!(matches!(program.apply(&gl), Err(GraphicsError::NotLinked)));
    }

    #[test]
    fn relink_after_unattach_with_new_stages() {
        let gl = MockContext::new();
        let log = LogSink::memory();
        let mut program = linked(&gl);
        program.unattach(&gl).unwrap();

        program.attach(&gl, stage(&gl, ShaderKind::Vertex)).unwrap();
        program.attach(&gl, stage(&gl, ShaderKind::Fragment)).unwrap();
        program.link(&gl, &log).unwrap();
        assert!(program.is_linked());
    }

    #[test]
    fn attach_link_apply_round_trip() {
        let gl = MockContext::new();
        let program = linked(&gl);
        program.apply(&gl).unwrap();
        assert_eq!(gl.current_program(), Some(program.handle()));
        assert!(gl.error().is_none());
    }

    #[test]
    fn apply_on_lost_program_fails() {
        let gl = MockContext::new();
        let program = linked(&gl);
        gl.lose_program(program.handle());
        assert!(matches!(program.apply(&gl), Err(GraphicsError::ProgramLost)));
    }

    // ── dispose ───────────────────────────────────────────────────────────

    #[test]
    fn dispose_unlinked_releases_exactly_attached_stages_and_program() {
        let gl = MockContext::new();
        let unrelated = stage(&gl, ShaderKind::Compute);

        let mut program = ShaderProgram::new(&gl).unwrap();
        let vertex = stage(&gl, ShaderKind::Vertex);
        let geometry = stage(&gl, ShaderKind::Geometry);
        let mut expected = vec![
            (ObjectKind::Shader, vertex.handle().raw()),
            (ObjectKind::Shader, geometry.handle().raw()),
            (ObjectKind::Program, program.handle().raw()),
        ];
        program.attach(&gl, vertex).unwrap();
        program.attach(&gl, geometry).unwrap();

        program.dispose(&gl);

        let mut released = gl.released();
        released.sort();
        expected.sort();
        assert_eq!(released, expected);
        assert!(gl.is_live(ObjectKind::Shader, unrelated.handle().raw()));
        assert!(gl.error().is_none());
    }

    #[test]
    fn dispose_linked_detaches_before_release() {
        let gl = MockContext::new();
        let program = linked(&gl);
        let handle = program.handle();
        program.apply(&gl).unwrap();
        gl.clear_calls();

        program.dispose(&gl);

        let detaches = gl
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::DetachShader { .. }))
            .count();
        assert_eq!(detaches, 2);
        assert!(gl.live(ObjectKind::Shader).is_empty());
        assert!(!gl.is_live(ObjectKind::Program, handle.raw()));
        assert_eq!(gl.current_program(), None);
    }

    // ── load_from_path ────────────────────────────────────────────────────

    struct ContentDir(PathBuf);

    impl ContentDir {
        fn new(tag: &str, files: &[&str]) -> Self {
            let dir = std::env::temp_dir().join(format!("doodle-{tag}-{}", std::process::id()));
            let _ = std::fs::remove_dir_all(&dir);
            std::fs::create_dir_all(&dir).unwrap();
            for file in files {
                std::fs::write(dir.join(file), format!("// {file}")).unwrap();
            }
            Self(dir)
        }
    }

    impl Drop for ContentDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn load_from_path_picks_named_pair() {
        let dir = ContentDir::new(
            "named",
            &["Basic.vert", "Basic.frag", "Sample.vert", "Sample_b.frag", "Sample_a.frag"],
        );
        let gl = MockContext::new();

        let program = ShaderProgram::load_from_path(&gl, &LogSink::memory(), &dir.0, Some("Sample")).unwrap();
        assert!(program.is_linked());

        let vertex = program.stage(ShaderKind::Vertex).unwrap().handle();
        let fragment = program.stage(ShaderKind::Fragment).unwrap().handle();
        assert_eq!(gl.shader_source_of(vertex).as_deref(), Some("// Sample.vert"));
        assert_eq!(gl.shader_source_of(fragment).as_deref(), Some("// Sample_a.frag"));
    }

    #[test]
    fn load_from_path_without_fragment_is_file_not_found() {
        let dir = ContentDir::new("nofrag", &["Basic.vert", "Other.frag"]);
        let gl = MockContext::new();

        let err = ShaderProgram::load_from_path(&gl, &LogSink::memory(), &dir.0, Some("Basic")).unwrap_err();
        assert!(matches!(err, GraphicsError::FileNotFound(_)));
        assert!(gl.live(ObjectKind::Shader).is_empty());
        assert!(gl.live(ObjectKind::Program).is_empty());
    }

    #[test]
    fn load_from_path_without_vertex_is_file_not_found() {
        let dir = ContentDir::new("novert", &["Basic.frag"]);
        let gl = MockContext::new();
        let err = ShaderProgram::load_from_path(&gl, &LogSink::memory(), &dir.0, Some("Basic")).unwrap_err();
        assert!(matches!(err, GraphicsError::FileNotFound(_)));
    }

    #[test]
    fn load_from_path_releases_everything_on_link_failure() {
        let dir = ContentDir::new("linkfail", &["Basic.vert", "Basic.frag"]);
        let gl = MockContext::new();
        gl.fail_link("boom");

        let err = ShaderProgram::load_from_path(&gl, &LogSink::memory(), &dir.0, Some("Basic")).unwrap_err();
        assert!(matches!(err, GraphicsError::LinkFailed(_)));
        assert!(gl.live(ObjectKind::Shader).is_empty());
        assert!(gl.live(ObjectKind::Program).is_empty());
    }

    // ── from_sources ──────────────────────────────────────────────────────

    #[test]
    fn from_sources_links_both_stages() {
        let gl = MockContext::new();
        let program = ShaderProgram::from_sources(&gl, &LogSink::memory(), "vs", "fs").unwrap();

        assert!(program.is_linked());
        let vertex = program.stage(ShaderKind::Vertex).unwrap().handle();
        assert_eq!(gl.shader_source_of(vertex).as_deref(), Some("vs"));
    }

    #[test]
    fn from_sources_compile_failure_releases_program() {
        let gl = MockContext::new();
        gl.fail_compile("0:1: syntax error");

        let err = ShaderProgram::from_sources(&gl, &LogSink::memory(), "vs", "fs").unwrap_err();
        assert!(matches!(err, GraphicsError::CompileFailed { kind: ShaderKind::Vertex, .. }));
        assert!(gl.live(ObjectKind::Program).is_empty());
        assert!(gl.live(ObjectKind::Shader).is_empty());
    }
}
