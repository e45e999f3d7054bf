use crate::foundation::core::{Canvas, LogicalSize};
use crate::foundation::error::{DanceError, DanceResult};

/// A rendered frame as RGBA8 bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Premultiplied RGBA at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }
}

/// The two stacked drawing surfaces.
///
/// Only the primary is drawn. The secondary stays blank and is resized alongside it so hosts that
/// lay out both see matching dimensions.
pub struct SurfacePair {
    logical: LogicalSize,
    dpr: f64,
    canvas: Canvas,
    ctx: vello_cpu::RenderContext,
    primary: vello_cpu::Pixmap,
    secondary: vello_cpu::Pixmap,
}

impl std::fmt::Debug for SurfacePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfacePair")
            .field("logical", &self.logical)
            .field("dpr", &self.dpr)
            .field("canvas", &self.canvas)
            .finish()
    }
}

impl SurfacePair {
    /// Allocate both surfaces for a logical size at a device pixel ratio.
    pub fn new(logical: LogicalSize, dpr: f64) -> DanceResult<Self> {
        let canvas = Canvas::from_logical(logical, dpr)?;
        let (w, h) = dims(canvas)?;
        Ok(Self {
            logical,
            dpr,
            canvas,
            ctx: vello_cpu::RenderContext::new(w, h),
            primary: vello_cpu::Pixmap::new(w, h),
            secondary: vello_cpu::Pixmap::new(w, h),
        })
    }

    /// Resize both surfaces. Returns `false` when nothing changed.
    pub fn resize(&mut self, logical: LogicalSize, dpr: f64) -> DanceResult<bool> {
        let canvas = Canvas::from_logical(logical, dpr)?;
        let changed = canvas != self.canvas || logical != self.logical;
        self.logical = logical;
        self.dpr = dpr;
        if canvas != self.canvas {
            let (w, h) = dims(canvas)?;
            self.ctx = vello_cpu::RenderContext::new(w, h);
            self.primary = vello_cpu::Pixmap::new(w, h);
            self.secondary = vello_cpu::Pixmap::new(w, h);
            self.canvas = canvas;
        }
        Ok(changed)
    }

    /// Logical size.
    pub fn logical(&self) -> LogicalSize {
        self.logical
    }

    /// Device pixel ratio.
    pub fn dpr(&self) -> f64 {
        self.dpr
    }

    /// Pixel dimensions of both surfaces.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Reset the primary's render context for a new frame.
    pub fn begin(&mut self) -> &mut vello_cpu::RenderContext {
        self.ctx.reset();
        &mut self.ctx
    }

    /// Rasterize everything recorded since [`SurfacePair::begin`] into the primary surface.
    pub fn finish(&mut self) {
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut self.primary);
    }

    /// Copy of the primary surface.
    pub fn read_primary(&self) -> FrameRGBA {
        FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: self.primary.data_as_u8_slice().to_vec(),
            premultiplied: true,
        }
    }

    /// Copy of the secondary surface (always blank).
    pub fn read_secondary(&self) -> FrameRGBA {
        FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: self.secondary.data_as_u8_slice().to_vec(),
            premultiplied: true,
        }
    }
}

fn dims(canvas: Canvas) -> DanceResult<(u16, u16)> {
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| DanceError::render("surface width exceeds u16"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| DanceError::render("surface height exceeds u16"))?;
    Ok((w, h))
}
