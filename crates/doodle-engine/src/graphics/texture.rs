use std::path::Path;

use crate::device::{
    GraphicsContext, GraphicsError, GraphicsResult, PixelFormat, TextureFilter, TextureHandle,
    TextureWrap,
};

/// A 2D texture.
///
/// Creation and uploads leave the previously bound texture bound.
#[derive(Debug)]
pub struct Texture2D {
    handle: TextureHandle,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl Texture2D {
    /// Allocates uninitialized storage with linear filtering and repeat wrapping.
    pub fn new(gl: &dyn GraphicsContext, width: u32, height: u32, format: PixelFormat) -> GraphicsResult<Self> {
        Self::create(gl, width, height, format, None)
    }

    /// Creates a texture from tightly packed RGBA8 pixels.
    pub fn from_rgba8(gl: &dyn GraphicsContext, width: u32, height: u32, pixels: &[u8]) -> GraphicsResult<Self> {
        check_len(width, height, PixelFormat::Rgba8, pixels)?;
        Self::create(gl, width, height, PixelFormat::Rgba8, Some(pixels))
    }

    /// Decodes an image file into an RGBA8 texture.
    pub fn from_file(gl: &dyn GraphicsContext, path: impl AsRef<Path>) -> GraphicsResult<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| match e {
                image::ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                    GraphicsError::FileNotFound(path.to_path_buf())
                }
                other => GraphicsError::Image(other),
            })?
            .into_rgba8();
        let (width, height) = image.dimensions();
        log::debug!("loaded {} ({width}x{height})", path.display());
        Self::from_rgba8(gl, width, height, image.as_raw())
    }

    fn create(
        gl: &dyn GraphicsContext,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Option<&[u8]>,
    ) -> GraphicsResult<Self> {
        check_size(width, height)?;

        let handle = gl.create_texture()?;
        let previous = gl.bound_texture();
        gl.bind_texture(Some(handle));
        gl.tex_sampling(TextureFilter::Linear, TextureWrap::Repeat);
        gl.tex_image_2d(width, height, format, pixels);
        gl.bind_texture(previous);

        Ok(Self {
            handle,
            width,
            height,
            format,
        })
    }

    /// Replaces the contents with tightly packed pixels of the texture's
    /// format and the same size.
    pub fn set_data(&mut self, gl: &dyn GraphicsContext, pixels: &[u8]) -> GraphicsResult<()> {
        check_len(self.width, self.height, self.format, pixels)?;
        self.upload(gl, self.width, self.height, Some(pixels));
        Ok(())
    }

    /// Reallocates storage at a new size, discarding the contents.
    pub fn resize(&mut self, gl: &dyn GraphicsContext, width: u32, height: u32) -> GraphicsResult<()> {
        check_size(width, height)?;
        if (width, height) != (self.width, self.height) {
            self.upload(gl, width, height, None);
            self.width = width;
            self.height = height;
        }
        Ok(())
    }

    /// Reallocates storage at `width x height` and uploads `pixels` in one step.
    pub fn replace(&mut self, gl: &dyn GraphicsContext, width: u32, height: u32, pixels: &[u8]) -> GraphicsResult<()> {
        check_size(width, height)?;
        check_len(width, height, self.format, pixels)?;
        self.upload(gl, width, height, Some(pixels));
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn upload(&self, gl: &dyn GraphicsContext, width: u32, height: u32, pixels: Option<&[u8]>) {
        let previous = gl.bound_texture();
        gl.bind_texture(Some(self.handle));
        gl.tex_image_2d(width, height, self.format, pixels);
        gl.bind_texture(previous);
    }

    pub fn bind(&self, gl: &dyn GraphicsContext) {
        gl.bind_texture(Some(self.handle));
    }

    pub fn unbind(gl: &dyn GraphicsContext) {
        gl.bind_texture(None);
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dispose(self, gl: &dyn GraphicsContext) {
        gl.delete_texture(self.handle);
    }
}

fn check_size(width: u32, height: u32) -> GraphicsResult<()> {
    if width == 0 || height == 0 {
        return Err(GraphicsError::InvalidArgument(format!(
            "texture size must be non-zero, got {width}x{height}"
        )));
    }
    Ok(())
}

fn check_len(width: u32, height: u32, format: PixelFormat, pixels: &[u8]) -> GraphicsResult<()> {
    let Some(bpp) = format.bytes_per_pixel() else {
        return Err(GraphicsError::InvalidArgument(format!(
            "{format:?} textures cannot be filled from client memory"
        )));
    };
    let expected = width as usize * height as usize * bpp;
    if pixels.len() != expected {
        return Err(GraphicsError::InvalidArgument(format!(
            "expected {expected} bytes of {format:?} data, got {}",
            pixels.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::{Call, ObjectKind};
    use crate::device::MockContext;

    #[test]
    fn creation_restores_previous_binding() {
        let gl = MockContext::new();
        let first = Texture2D::new(&gl, 4, 4, PixelFormat::Rgba8).unwrap();
        first.bind(&gl);

        let second = Texture2D::from_rgba8(&gl, 1, 1, &[255, 0, 0, 255]).unwrap();
        assert_eq!(gl.bound_texture(), Some(first.handle()));
        assert_ne!(second.handle(), first.handle());
    }

    #[test]
    fn zero_size_is_rejected() {
        let gl = MockContext::new();
        assert!(matches!(
            Texture2D::new(&gl, 0, 4, PixelFormat::Rgba8),
            Err(GraphicsError::InvalidArgument(_))
        ));
        assert!(gl.live(ObjectKind::Texture).is_empty());
    }

    #[test]
    fn pixel_length_must_match() {
        let gl = MockContext::new();
        let mut tex = Texture2D::new(&gl, 2, 2, PixelFormat::Rgba8).unwrap();
        assert!(tex.set_data(&gl, &[0; 15]).is_err());
        assert!(tex.set_data(&gl, &[0; 16]).is_ok());
    }

    #[test]
    fn pixel_length_follows_the_texture_format() {
        let gl = MockContext::new();
        let mut rgb = Texture2D::new(&gl, 2, 2, PixelFormat::Rgb8).unwrap();
        assert!(matches!(rgb.set_data(&gl, &[0; 16]), Err(GraphicsError::InvalidArgument(_))));

        gl.clear_calls();
        rgb.set_data(&gl, &[0; 12]).unwrap();
        assert!(gl.calls().contains(&Call::TexImage {
            width: 2,
            height: 2,
            format: PixelFormat::Rgb8,
            uploaded: true
        }));

        rgb.replace(&gl, 3, 1, &[0; 9]).unwrap();
        assert_eq!((rgb.width(), rgb.height()), (3, 1));
    }

    #[test]
    fn depth_textures_reject_client_pixels() {
        let gl = MockContext::new();
        let mut depth = Texture2D::new(&gl, 2, 2, PixelFormat::Depth24Stencil8).unwrap();
        assert!(matches!(depth.set_data(&gl, &[0; 16]), Err(GraphicsError::InvalidArgument(_))));
    }

    #[test]
    fn resize_to_same_size_is_a_no_op() {
        let gl = MockContext::new();
        let mut tex = Texture2D::new(&gl, 8, 8, PixelFormat::Rgba8).unwrap();
        gl.clear_calls();
        tex.resize(&gl, 8, 8).unwrap();
        assert!(gl.calls().is_empty());

        tex.resize(&gl, 16, 4).unwrap();
        assert_eq!((tex.width(), tex.height()), (16, 4));
        assert!(gl.calls().contains(&Call::TexImage {
            width: 16,
            height: 4,
            format: PixelFormat::Rgba8,
            uploaded: false
        }));
    }

    #[test]
    fn missing_image_is_file_not_found() {
        let gl = MockContext::new();
        let err = Texture2D::from_file(&gl, "no/such/image.png").unwrap_err();
        assert!(matches!(err, GraphicsError::FileNotFound(_)));
    }
}
