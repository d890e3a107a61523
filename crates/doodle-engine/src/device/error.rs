use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::graphics::ShaderKind;

/// Native error code reported by the graphics context (`glGetError`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct GlErrorCode(pub u32);

impl GlErrorCode {
    pub const INVALID_ENUM: Self = Self(0x0500);
    pub const INVALID_VALUE: Self = Self(0x0501);
    pub const INVALID_OPERATION: Self = Self(0x0502);
    pub const STACK_OVERFLOW: Self = Self(0x0503);
    pub const STACK_UNDERFLOW: Self = Self(0x0504);
    pub const OUT_OF_MEMORY: Self = Self(0x0505);
    pub const INVALID_FRAMEBUFFER_OPERATION: Self = Self(0x0506);

    fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::INVALID_ENUM => "InvalidEnum",
            Self::INVALID_VALUE => "InvalidValue",
            Self::INVALID_OPERATION => "InvalidOperation",
            Self::STACK_OVERFLOW => "StackOverflow",
            Self::STACK_UNDERFLOW => "StackUnderflow",
            Self::OUT_OF_MEMORY => "OutOfMemory",
            Self::INVALID_FRAMEBUFFER_OPERATION => "InvalidFramebufferOperation",
            _ => return None,
        })
    }
}

impl fmt::Display for GlErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} (0x{:04X})", self.0),
            None => write!(f, "0x{:04X}", self.0),
        }
    }
}

/// Errors raised by the graphics wrappers.
#[derive(Debug, Error)]
pub enum GraphicsError {
    #[error("shader program is missing a required {0} stage")]
    MissingStage(ShaderKind),

    #[error("shader program is already linked")]
    AlreadyLinked,

    #[error("shader program is not linked")]
    NotLinked,

    #[error("cannot attach a {0} stage to a linked program")]
    InvalidStage(ShaderKind),

    #[error("shader program failed to link: {0}")]
    LinkFailed(String),

    #[error("{kind} shader failed to compile: {log}")]
    CompileFailed { kind: ShaderKind, log: String },

    #[error("handle no longer refers to a shader program")]
    ProgramLost,

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("graphics context reported error {0}")]
    Context(GlErrorCode),

    #[error("framebuffer is incomplete (status 0x{0:04X})")]
    FramebufferIncomplete(u32),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    #[error("failed to create {0}")]
    ResourceCreation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("font error: {0}")]
    Font(String),
}

pub type GraphicsResult<T> = Result<T, GraphicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_error_codes_have_names() {
        assert_eq!(GlErrorCode::INVALID_OPERATION.to_string(), "InvalidOperation (0x0502)");
        assert_eq!(GlErrorCode(0x1234).to_string(), "0x1234");
    }

    #[test]
    fn stage_errors_name_the_stage() {
        let err = GraphicsError::MissingStage(ShaderKind::Vertex);
        assert_eq!(err.to_string(), "shader program is missing a required vertex stage");

        let err = GraphicsError::CompileFailed {
            kind: ShaderKind::Fragment,
            log: "0:1: syntax error".into(),
        };
        assert!(err.to_string().starts_with("fragment shader failed to compile"));
    }
}
