//! Texture contract and the process-wide texture cache.
//!
//! The engine never decodes image formats. The embedding layer uploads
//! pixels however it likes and hands the engine a [`Texture`]: GPU view +
//! sampler plus the metadata leaf entities need for texcoord generation
//! (size, pixel density, vertical-flip orientation).

mod cache;

pub use cache::{TextureCache, texture_cache};

use std::rc::Rc;

/// Shared handle to a texture. Nodes hold strong references; the cache holds
/// weak ones, so a texture is released when the last referencing node drops.
pub type TextureRef = Rc<Texture>;

/// An already-uploaded texture plus the metadata the scene graph consumes.
#[derive(Debug)]
pub struct Texture {
    key: String,
    width: u32,
    height: u32,
    density: f32,
    flipped: bool,

    // Absent for metadata-only textures (headless tests, config loading
    // before GPU init). The renderer substitutes the placeholder.
    view: Option<wgpu::TextureView>,
    sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Metadata-only texture; draws sample the placeholder until GPU data is
    /// attached.
    pub fn new(key: impl Into<String>, width: u32, height: u32) -> Texture {
        Texture {
            key: key.into(),
            width,
            height,
            density: 1.0,
            flipped: false,
            view: None,
            sampler: None,
        }
    }

    pub fn with_density(mut self, density: f32) -> Texture {
        self.density = density;
        self
    }

    /// Marks the texture as stored bottom-up (some decoders deliver rows in
    /// that order); texcoord generation compensates.
    pub fn with_flipped(mut self, flipped: bool) -> Texture {
        self.flipped = flipped;
        self
    }

    pub fn with_gpu(mut self, view: wgpu::TextureView, sampler: wgpu::Sampler) -> Texture {
        self.view = Some(view);
        self.sampler = Some(sampler);
        self
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel density (texels per logical pixel, e.g. 2.0 for @2x assets).
    #[inline]
    pub fn density(&self) -> f32 {
        self.density
    }

    #[inline]
    pub fn flipped(&self) -> bool {
        self.flipped
    }

    #[inline]
    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.view.as_ref()
    }

    #[inline]
    pub fn sampler(&self) -> Option<&wgpu::Sampler> {
        self.sampler.as_ref()
    }
}
