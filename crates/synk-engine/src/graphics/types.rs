/// Linear RGBA color, each channel in `0.0..=1.0`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Builds a color from 8-bit channels.
    #[inline]
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            f32::from(a) / 255.0,
        )
    }

    #[inline]
    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    #[inline]
    pub const fn white() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }

    /// Clamps every channel into `0.0..=1.0`; NaN becomes 0.
    pub fn clamped(self) -> Self {
        fn unit(v: f32) -> f32 {
            if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
        }
        Self::new(unit(self.r), unit(self.g), unit(self.b), unit(self.a))
    }
}

/// Rectangle of the render target that normalized output maps onto, in physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Viewport covering a whole `width` x `height` target.
    #[inline]
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0
            && self.height > 0.0
            && self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// Intersects the viewport with a `width` x `height` target.
    ///
    /// Returns `None` when nothing of the viewport lies on the target.
    pub fn clamped_to(self, width: u32, height: u32) -> Option<Self> {
        let (tw, th) = (width as f32, height as f32);
        let x0 = self.x.clamp(0.0, tw);
        let y0 = self.y.clamp(0.0, th);
        let x1 = (self.x + self.width).clamp(0.0, tw);
        let y1 = (self.y + self.height).clamp(0.0, th);
        let clamped = Self::new(x0, y0, x1 - x0, y1 - y0);
        clamped.is_valid().then_some(clamped)
    }
}

bitflags::bitflags! {
    /// Buffers reset by `GraphicsModule::clear_buffers`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ClearMask: u8 {
        const COLOR   = 1 << 0;
        const DEPTH   = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// How consecutive indices assemble into primitives.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PrimitiveKind {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

impl PrimitiveKind {
    pub fn is_strip(self) -> bool {
        matches!(self, PrimitiveKind::LineStrip | PrimitiveKind::TriangleStrip)
    }
}

/// Width of the unsigned integers stored in an index buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    /// Bytes per index.
    pub const fn size(self) -> u64 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            IndexType::U16 => "u16",
            IndexType::U32 => "u32",
        }
    }

    /// Decodes the index stored at `slot` in little-endian `bytes`.
    pub(crate) fn read(self, bytes: &[u8], slot: usize) -> Option<u32> {
        match self {
            IndexType::U16 => {
                let b = bytes.get(slot * 2..slot * 2 + 2)?;
                Some(u32::from(u16::from_le_bytes([b[0], b[1]])))
            }
            IndexType::U32 => {
                let b = bytes.get(slot * 4..slot * 4 + 4)?;
                Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            }
        }
    }
}

/// Scalar type shared by every attribute of a vertex layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScalarType {
    F32,
    U32,
    I32,
}

impl ScalarType {
    pub const fn size(self) -> u64 {
        4
    }
}

/// Update-frequency hint supplied at buffer creation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    #[default]
    Static,
    /// Rewritten frequently.
    Dynamic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_color_stays_in_unit_range() {
        let c = ColorRgba::new(1.5, -0.2, f32::NAN, 0.5).clamped();
        assert_eq!(c, ColorRgba::new(1.0, 0.0, 0.0, 0.5));
    }

    #[test]
    fn from_rgba8_normalizes() {
        let c = ColorRgba::from_rgba8(255, 0, 51, 255);
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert!((c.b - 0.2).abs() < 1e-6);
    }

    #[test]
    fn viewport_clamps_to_target() {
        let vp = Viewport::new(-10.0, 20.0, 100.0, 1000.0);
        assert_eq!(vp.clamped_to(50, 100), Some(Viewport::new(0.0, 20.0, 50.0, 80.0)));
    }

    #[test]
    fn viewport_outside_target_is_none() {
        assert_eq!(Viewport::new(200.0, 0.0, 10.0, 10.0).clamped_to(100, 100), None);
        assert!(!Viewport::new(0.0, 0.0, 0.0, 10.0).is_valid());
    }

    #[test]
    fn index_read_is_little_endian() {
        let bytes = [1u8, 0, 2, 0, 0, 1];
        assert_eq!(IndexType::U16.read(&bytes, 0), Some(1));
        assert_eq!(IndexType::U16.read(&bytes, 2), Some(256));
        assert_eq!(IndexType::U16.read(&bytes, 3), None);
        assert_eq!(IndexType::U32.read(&bytes, 0), Some(0x0002_0001));
    }

    #[test]
    fn clear_mask_combines() {
        let mask = ClearMask::COLOR | ClearMask::DEPTH;
        assert!(mask.contains(ClearMask::COLOR));
        assert!(!mask.contains(ClearMask::STENCIL));
    }
}
