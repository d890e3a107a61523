use bitflags::bitflags;

use super::texture::Texture2D;
use crate::device::{
    Attachment, FramebufferHandle, GraphicsContext, GraphicsError, GraphicsResult, PixelFormat,
    RenderbufferHandle, FRAMEBUFFER_COMPLETE,
};

bitflags! {
    /// Attachments created for a [`RenderTarget`].
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct RenderTargetFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Off-screen framebuffer with an optional color texture and a packed
/// depth/stencil renderbuffer.
#[derive(Debug)]
pub struct RenderTarget {
    framebuffer: FramebufferHandle,
    color: Option<Texture2D>,
    depth_stencil: Option<RenderbufferHandle>,
    width: u32,
    height: u32,
    flags: RenderTargetFlags,
}

impl RenderTarget {
    /// Creates a complete framebuffer.
    ///
    /// Texture and framebuffer bindings are restored before returning. On
    /// failure every object created so far is released.
    pub fn new(
        gl: &dyn GraphicsContext,
        width: u32,
        height: u32,
        flags: RenderTargetFlags,
    ) -> GraphicsResult<Self> {
        if width == 0 || height == 0 {
            return Err(GraphicsError::InvalidArgument(format!(
                "render target size must be non-zero, got {width}x{height}"
            )));
        }
        if flags.is_empty() {
            return Err(GraphicsError::InvalidArgument(
                "render target needs at least one attachment".into(),
            ));
        }

        let previous_texture = gl.bound_texture();
        let previous_framebuffer = gl.bound_framebuffer();

        let mut target = Self {
            framebuffer: gl.create_framebuffer()?,
            color: None,
            depth_stencil: None,
            width,
            height,
            flags,
        };

        let built = target.attach_all(gl);

        gl.bind_texture(previous_texture);
        gl.bind_framebuffer(previous_framebuffer);

        match built {
            Ok(()) => {
                log::debug!("render target {width}x{height} {flags:?} ready");
                Ok(target)
            }
            Err(e) => {
                target.dispose(gl);
                Err(e)
            }
        }
    }

    fn attach_all(&mut self, gl: &dyn GraphicsContext) -> GraphicsResult<()> {
        gl.bind_framebuffer(Some(self.framebuffer));

        if self.flags.contains(RenderTargetFlags::COLOR) {
            let color = Texture2D::new(gl, self.width, self.height, PixelFormat::Rgba8)?;
            gl.framebuffer_texture(Attachment::Color0, Some(color.handle()));
            self.color = Some(color);
        }

        if self
            .flags
            .intersects(RenderTargetFlags::DEPTH | RenderTargetFlags::STENCIL)
        {
            let rb = gl.create_renderbuffer()?;
            self.depth_stencil = Some(rb);
            gl.bind_renderbuffer(Some(rb));
            gl.renderbuffer_storage(PixelFormat::Depth24Stencil8, self.width, self.height);
            gl.bind_renderbuffer(None);

            let attachment = if self.flags.contains(RenderTargetFlags::STENCIL) {
                Attachment::DepthStencil
            } else {
                Attachment::Depth
            };
            gl.framebuffer_renderbuffer(attachment, Some(rb));
        }

        let status = gl.framebuffer_status();
        if status != FRAMEBUFFER_COMPLETE {
            return Err(GraphicsError::FramebufferIncomplete(status));
        }
        Ok(())
    }

    /// Redirects drawing into this target and sets the viewport to its size.
    pub fn bind(&self, gl: &dyn GraphicsContext) {
        gl.bind_framebuffer(Some(self.framebuffer));
        gl.viewport(0, 0, self.width as i32, self.height as i32);
    }

    /// Restores drawing to the default framebuffer.
    pub fn unbind(gl: &dyn GraphicsContext) {
        gl.bind_framebuffer(None);
    }

    /// Color attachment, present when created with [`RenderTargetFlags::COLOR`].
    pub fn color(&self) -> Option<&Texture2D> {
        self.color.as_ref()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn flags(&self) -> RenderTargetFlags {
        self.flags
    }

    pub fn handle(&self) -> FramebufferHandle {
        self.framebuffer
    }

    /// Releases the framebuffer and its attachments.
    pub fn dispose(self, gl: &dyn GraphicsContext) {
        if gl.bound_framebuffer() == Some(self.framebuffer) {
            gl.bind_framebuffer(None);
        }
        gl.delete_framebuffer(self.framebuffer);
        if let Some(color) = self.color {
            color.dispose(gl);
        }
        if let Some(rb) = self.depth_stencil {
            gl.delete_renderbuffer(rb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::{Call, ObjectKind};
    use crate::device::MockContext;

    fn attachments(gl: &MockContext) -> Vec<Call> {
        gl.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::FramebufferTexture(..) | Call::FramebufferRenderbuffer(..)))
            .collect()
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        let gl = MockContext::new();
        assert!(matches!(
            RenderTarget::new(&gl, 0, 200, RenderTargetFlags::COLOR),
            Err(GraphicsError::InvalidArgument(_))
        ));
        assert!(matches!(
            RenderTarget::new(&gl, 200, 200, RenderTargetFlags::empty()),
            Err(GraphicsError::InvalidArgument(_))
        ));
        assert!(gl.live(ObjectKind::Framebuffer).is_empty());
    }

    #[test]
    fn color_only_target_has_no_renderbuffer() {
        let gl = MockContext::new();
        let target = RenderTarget::new(&gl, 200, 200, RenderTargetFlags::COLOR).unwrap();
        let color = target.color().unwrap().handle().raw();

        assert_eq!(attachments(&gl), vec![Call::FramebufferTexture(Attachment::Color0, Some(color))]);
        assert!(gl.live(ObjectKind::Renderbuffer).is_empty());
    }

    #[test]
    fn stencil_attaches_only_when_requested() {
        let gl = MockContext::new();
        let _depth = RenderTarget::new(&gl, 64, 64, RenderTargetFlags::COLOR | RenderTargetFlags::DEPTH).unwrap();
        assert!(attachments(&gl)
            .iter()
            .any(|c| matches!(c, Call::FramebufferRenderbuffer(Attachment::Depth, Some(_)))));

        gl.clear_calls();
        let _both = RenderTarget::new(
            &gl,
            64,
            64,
            RenderTargetFlags::DEPTH | RenderTargetFlags::STENCIL,
        )
        .unwrap();
        let calls = attachments(&gl);
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], Call::FramebufferRenderbuffer(Attachment::DepthStencil, Some(_))));
    }

    #[test]
    fn bindings_are_restored() {
        let gl = MockContext::new();
        let outer = RenderTarget::new(&gl, 8, 8, RenderTargetFlags::COLOR).unwrap();
        outer.bind(&gl);

        let _inner = RenderTarget::new(&gl, 8, 8, RenderTargetFlags::COLOR).unwrap();
        assert_eq!(gl.bound_framebuffer(), Some(outer.handle()));
        assert_eq!(gl.bound_texture(), None);
    }

    #[test]
    fn incomplete_framebuffer_releases_everything() {
        let gl = MockContext::new();
        gl.set_framebuffer_status(0x8CD6);

        let err = RenderTarget::new(&gl, 8, 8, RenderTargetFlags::all()).unwrap_err();
        assert!(matches!(err, GraphicsError::FramebufferIncomplete(0x8CD6)));
        assert!(gl.live(ObjectKind::Framebuffer).is_empty());
        assert!(gl.live(ObjectKind::Texture).is_empty());
        assert!(gl.live(ObjectKind::Renderbuffer).is_empty());
    }

    #[test]
    fn dispose_releases_all_attachments() {
        let gl = MockContext::new();
        let target = RenderTarget::new(&gl, 8, 8, RenderTargetFlags::all()).unwrap();
        target.bind(&gl);
        target.dispose(&gl);

        assert_eq!(gl.released().len(), 3);
        assert_eq!(gl.bound_framebuffer(), None);
    }
}
