//! Texture formats, targets and sampling parameters.

use std::fmt;

use bitflags::bitflags;

use super::DataType;

/// Kind of texture object on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureTarget {
    /// One-dimensional texture.
    T1d,
    /// Two-dimensional texture.
    #[default]
    T2d,
    /// Three-dimensional (volume) texture.
    T3d,
    /// Cube map with six square faces.
    CubeMap,
}

impl TextureTarget {
    /// Number of image layers a texture of this target holds.
    pub fn layer_count(&self) -> usize {
        match self {
            Self::CubeMap => 6,
            _ => 1,
        }
    }

    /// The matching flag in a [`TextureTargets`] set.
    pub fn as_flag(&self) -> TextureTargets {
        match self {
            Self::T1d => TextureTargets::T1D,
            Self::T2d => TextureTargets::T2D,
            Self::T3d => TextureTargets::T3D,
            Self::CubeMap => TextureTargets::CUBE_MAP,
        }
    }
}

impl fmt::Display for TextureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::T1d => "T_1D",
            Self::T2d => "T_2D",
            Self::T3d => "T_3D",
            Self::CubeMap => "T_CUBEMAP",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Set of texture targets supported by a device.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureTargets: u32 {
        const T1D = 1 << 0;
        const T2D = 1 << 1;
        const T3D = 1 << 2;
        const CUBE_MAP = 1 << 3;
    }
}

/// Pixel format of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    // Clamped formats
    Alpha,
    Luminance,
    LuminanceAlpha,
    Rgb,
    Bgr,
    #[default]
    Rgba,
    Bgra,

    // Unclamped floating point formats
    AlphaFloat,
    LuminanceFloat,
    LuminanceAlphaFloat,
    RgbFloat,
    RgbaFloat,

    /// Single depth component.
    Depth,

    // Block compressed formats
    RgbDxt1,
    RgbaDxt1,
    RgbaDxt3,
    RgbaDxt5,
}

impl TextureFormat {
    /// Returns true if this is a block-compressed format.
    pub fn is_compressed(&self) -> bool {
        matches!(
            self,
            Self::RgbDxt1 | Self::RgbaDxt1 | Self::RgbaDxt3 | Self::RgbaDxt5
        )
    }

    /// Returns true if this is a depth format.
    pub fn is_depth(&self) -> bool {
        matches!(self, Self::Depth)
    }

    /// Returns true if this format stores values outside of `[0, 1]`.
    pub fn is_unclamped_float(&self) -> bool {
        self.clamped_equivalent().is_some()
    }

    /// The clamped sibling of an unclamped float format.
    ///
    /// Formats without such a sibling return `None`.
    pub fn clamped_equivalent(&self) -> Option<Self> {
        match self {
            Self::AlphaFloat => Some(Self::Alpha),
            Self::LuminanceFloat => Some(Self::Luminance),
            Self::LuminanceAlphaFloat => Some(Self::LuminanceAlpha),
            Self::RgbFloat => Some(Self::Rgb),
            Self::RgbaFloat => Some(Self::Rgba),
            _ => None,
        }
    }

    /// Number of components per texel. Compressed formats report their decoded count.
    pub fn components(&self) -> u32 {
        match self {
            Self::Alpha | Self::Luminance | Self::AlphaFloat | Self::LuminanceFloat | Self::Depth => {
                1
            }
            Self::LuminanceAlpha | Self::LuminanceAlphaFloat => 2,
            Self::Rgb | Self::Bgr | Self::RgbFloat | Self::RgbDxt1 => 3,
            Self::Rgba
            | Self::Bgra
            | Self::RgbaFloat
            | Self::RgbaDxt1
            | Self::RgbaDxt3
            | Self::RgbaDxt5 => 4,
        }
    }

    /// Size in bytes of a `width`x`height`x`depth` image stored with `data_type`.
    ///
    /// Compressed formats are sized by 4x4 blocks and ignore `data_type`.
    pub fn buffer_size(&self, data_type: DataType, width: u32, height: u32, depth: u32) -> usize {
        let (width, height, depth) = (width as usize, height as usize, depth as usize);
        match self {
            Self::RgbDxt1 | Self::RgbaDxt1 => width.div_ceil(4) * height.div_ceil(4) * depth * 8,
            Self::RgbaDxt3 | Self::RgbaDxt5 => {
                width.div_ceil(4) * height.div_ceil(4) * depth * 16
            }
            _ => width * height * depth * self.components() as usize * data_type.byte_size(),
        }
    }
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Alpha => "ALPHA",
            Self::Luminance => "LUMINANCE",
            Self::LuminanceAlpha => "LUMINANCE_ALPHA",
            Self::Rgb => "RGB",
            Self::Bgr => "BGR",
            Self::Rgba => "RGBA",
            Self::Bgra => "BGRA",
            Self::AlphaFloat => "ALPHA_FLOAT",
            Self::LuminanceFloat => "LUMINANCE_FLOAT",
            Self::LuminanceAlphaFloat => "LUMINANCE_ALPHA_FLOAT",
            Self::RgbFloat => "RGB_FLOAT",
            Self::RgbaFloat => "RGBA_FLOAT",
            Self::Depth => "DEPTH",
            Self::RgbDxt1 => "RGB_DXT1",
            Self::RgbaDxt1 => "RGBA_DXT1",
            Self::RgbaDxt3 => "RGBA_DXT3",
            Self::RgbaDxt5 => "RGBA_DXT5",
        };
        f.write_str(name)
    }
}

/// Texture minification/magnification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Filter {
    Nearest,
    #[default]
    Linear,
    MipmapNearest,
    MipmapLinear,
}

/// Texture coordinate wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Clamp,
    Repeat,
    Mirror,
}

/// Comparison applied when sampling a depth texture with comparison enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthCompare {
    Never,
    Less,
    #[default]
    LessEqual,
    Equal,
    GreaterEqual,
    Greater,
    NotEqual,
    Always,
}

/// The sampling configuration pushed to a texture object as one unit.
///
/// Equality compares `anisotropy` bit for bit, so a value always equals itself.
#[derive(Debug, Clone, Copy)]
pub struct TextureParameters {
    /// Filter used for minification and magnification.
    pub filter: Filter,
    /// Wrap mode along S.
    pub wrap_s: WrapMode,
    /// Wrap mode along T.
    pub wrap_t: WrapMode,
    /// Wrap mode along R.
    pub wrap_r: WrapMode,
    /// Lowest mip level accessible to sampling.
    pub base_mip_level: u32,
    /// Highest mip level accessible to sampling.
    pub max_mip_level: u32,
    /// Depth comparison function.
    pub depth_compare: DepthCompare,
    /// Whether depth comparison is enabled.
    pub depth_compare_enabled: bool,
    /// Anisotropic filtering level in `[0, 1]`.
    pub anisotropy: f32,
}

impl Default for TextureParameters {
    fn default() -> Self {
        Self {
            filter: Filter::default(),
            wrap_s: WrapMode::default(),
            wrap_t: WrapMode::default(),
            wrap_r: WrapMode::default(),
            base_mip_level: 0,
            max_mip_level: 1000,
            depth_compare: DepthCompare::default(),
            depth_compare_enabled: false,
            anisotropy: 0.0,
        }
    }
}

impl PartialEq for TextureParameters {
    fn eq(&self, other: &Self) -> bool {
        self.filter == other.filter
            && self.wrap_s == other.wrap_s
            && self.wrap_t == other.wrap_t
            && self.wrap_r == other.wrap_r
            && self.base_mip_level == other.base_mip_level
            && self.max_mip_level == other.max_mip_level
            && self.depth_compare == other.depth_compare
            && self.depth_compare_enabled == other.depth_compare_enabled
            && self.anisotropy.to_bits() == other.anisotropy.to_bits()
    }
}

impl TextureParameters {
    /// Set the wrap mode for every coordinate.
    pub fn with_wrap(mut self, mode: WrapMode) -> Self {
        self.wrap_s = mode;
        self.wrap_t = mode;
        self.wrap_r = mode;
        self
    }

    /// Set the filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the accessible mip range.
    pub fn with_mip_range(mut self, base: u32, max: u32) -> Self {
        self.base_mip_level = base;
        self.max_mip_level = max;
        self
    }

    /// Enable depth comparison with the given function.
    pub fn with_depth_compare(mut self, compare: DepthCompare) -> Self {
        self.depth_compare = compare;
        self.depth_compare_enabled = true;
        self
    }

    /// Set the anisotropic filtering level, clamped to `[0, 1]`. NaN disables it.
    pub fn with_anisotropy(mut self, level: f32) -> Self {
        self.anisotropy = if level.is_nan() {
            0.0
        } else {
            level.clamp(0.0, 1.0)
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_equivalents() {
        assert_eq!(TextureFormat::RgbaFloat.clamped_equivalent(), Some(TextureFormat::Rgba));
        assert_eq!(TextureFormat::AlphaFloat.clamped_equivalent(), Some(TextureFormat::Alpha));
        assert_eq!(TextureFormat::Rgba.clamped_equivalent(), None);
        assert_eq!(TextureFormat::Depth.clamped_equivalent(), None);
        assert!(TextureFormat::LuminanceAlphaFloat.is_unclamped_float());
    }

    #[test]
    fn test_anisotropy_nan() {
        let parameters = TextureParameters::default().with_anisotropy(f32::NAN);
        assert_eq!(parameters.anisotropy, 0.0);
        assert_eq!(TextureParameters::default().with_anisotropy(4.0).anisotropy, 1.0);

        let raw = TextureParameters {
            anisotropy: f32::NAN,
            ..TextureParameters::default()
        };
        assert_eq!(raw, raw);
        assert_ne!(raw, TextureParameters::default());
    }

    #[test]
    fn test_format_display() {
        assert_eq!(TextureFormat::RgbaFloat.to_string(), "RGBA_FLOAT");
        assert_eq!(TextureFormat::LuminanceAlpha.to_string(), "LUMINANCE_ALPHA");
        assert_eq!(TextureTarget::CubeMap.to_string(), "T_CUBEMAP");
    }

    #[test]
    fn test_buffer_size() {
        assert_eq!(
            TextureFormat::Rgba.buffer_size(DataType::UnsignedByte, 4, 4, 1),
            64
        );
        assert_eq!(
            TextureFormat::RgbFloat.buffer_size(DataType::Float, 2, 2, 1),
            48
        );
        // 5x5 rounds up to 2x2 blocks
        assert_eq!(
            TextureFormat::RgbaDxt5.buffer_size(DataType::UnsignedByte, 5, 5, 1),
            64
        );
        assert_eq!(
            TextureFormat::RgbDxt1.buffer_size(DataType::UnsignedByte, 4, 4, 1),
            8
        );
    }

    #[test]
    fn test_target_layers() {
        assert_eq!(TextureTarget::CubeMap.layer_count(), 6);
        assert_eq!(TextureTarget::T3d.layer_count(), 1);
        assert_eq!(TextureTarget::T2d.as_flag(), TextureTargets::T2D);
    }

    #[test]
    fn test_parameter_builders() {
        let params = TextureParameters::default()
            .with_wrap(WrapMode::Repeat)
            .with_anisotropy(3.0)
            .with_depth_compare(DepthCompare::Greater);
        assert_eq!(params.wrap_r, WrapMode::Repeat);
        assert_eq!(params.anisotropy, 1.0);
        assert!(params.depth_compare_enabled);
    }
}
