//! Resolved pixel formats and their block properties.

/// Host-facing pixel format after TIC component types are resolved.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PixelFormat {
    A8B8G8R8_UNORM,
    A8B8G8R8_SNORM,
    A8B8G8R8_SRGB,
    B5G6R5_UNORM,
    A2B10G10R10_UNORM,
    R8_UNORM,
    R8_SNORM,
    R8_UINT,
    R16_FLOAT,
    R16_UNORM,
    R16G16_FLOAT,
    R16G16_UNORM,
    R16G16B16A16_FLOAT,
    R16G16B16A16_UNORM,
    R32_FLOAT,
    R32_UINT,
    R32G32_FLOAT,
    R32G32_UINT,
    R32G32B32A32_FLOAT,
    R32G32B32A32_UINT,
    D16_UNORM,
    D24_UNORM_S8_UINT,
    D32_FLOAT,
    D32_FLOAT_S8_UINT,
    BC1_RGBA_UNORM,
    BC1_RGBA_SRGB,
    BC2_UNORM,
    BC3_UNORM,
    BC4_UNORM,
    BC4_SNORM,
    BC5_UNORM,
    BC5_SNORM,
    BC6H_UFLOAT,
    BC6H_SFLOAT,
    BC7_UNORM,
    BC7_SRGB,
    ASTC_2D_4X4_UNORM,
    ASTC_2D_5X5_UNORM,
    ASTC_2D_6X6_UNORM,
    ASTC_2D_8X8_UNORM,
    ASTC_2D_10X10_UNORM,
    ASTC_2D_12X12_UNORM,
    ASTC_2D_4X4_SRGB,
    ASTC_2D_8X8_SRGB,
    ASTC_2D_12X12_SRGB,
}

/// Bytes taken by one tile (one pixel for uncompressed formats).
pub const fn bytes_per_block(format: PixelFormat) -> u32 {
    use PixelFormat::*;
    match format {
        R8_UNORM | R8_SNORM | R8_UINT => 1,
        B5G6R5_UNORM | R16_FLOAT | R16_UNORM | D16_UNORM => 2,
        A8B8G8R8_UNORM | A8B8G8R8_SNORM | A8B8G8R8_SRGB | A2B10G10R10_UNORM | R16G16_FLOAT
        | R16G16_UNORM | R32_FLOAT | R32_UINT | D24_UNORM_S8_UINT | D32_FLOAT => 4,
        R16G16B16A16_FLOAT | R16G16B16A16_UNORM | R32G32_FLOAT | R32G32_UINT
        | D32_FLOAT_S8_UINT | BC1_RGBA_UNORM | BC1_RGBA_SRGB | BC4_UNORM | BC4_SNORM => 8,
        R32G32B32A32_FLOAT | R32G32B32A32_UINT | BC2_UNORM | BC3_UNORM | BC5_UNORM | BC5_SNORM
        | BC6H_UFLOAT | BC6H_SFLOAT | BC7_UNORM | BC7_SRGB | ASTC_2D_4X4_UNORM
        | ASTC_2D_5X5_UNORM | ASTC_2D_6X6_UNORM | ASTC_2D_8X8_UNORM | ASTC_2D_10X10_UNORM
        | ASTC_2D_12X12_UNORM | ASTC_2D_4X4_SRGB | ASTC_2D_8X8_SRGB | ASTC_2D_12X12_SRGB => 16,
    }
}

/// Width in texels of one tile.
pub const fn default_block_width(format: PixelFormat) -> u32 {
    use PixelFormat::*;
    match format {
        BC1_RGBA_UNORM | BC1_RGBA_SRGB | BC2_UNORM | BC3_UNORM | BC4_UNORM | BC4_SNORM
        | BC5_UNORM | BC5_SNORM | BC6H_UFLOAT | BC6H_SFLOAT | BC7_UNORM | BC7_SRGB
        | ASTC_2D_4X4_UNORM | ASTC_2D_4X4_SRGB => 4,
        ASTC_2D_5X5_UNORM => 5,
        ASTC_2D_6X6_UNORM => 6,
        ASTC_2D_8X8_UNORM | ASTC_2D_8X8_SRGB => 8,
        ASTC_2D_10X10_UNORM => 10,
        ASTC_2D_12X12_UNORM | ASTC_2D_12X12_SRGB => 12,
        _ => 1,
    }
}

/// Height in texels of one tile.
pub const fn default_block_height(format: PixelFormat) -> u32 {
    use PixelFormat::*;
    match format {
        BC1_RGBA_UNORM | BC1_RGBA_SRGB | BC2_UNORM | BC3_UNORM | BC4_UNORM | BC4_SNORM
        | BC5_UNORM | BC5_SNORM | BC6H_UFLOAT | BC6H_SFLOAT | BC7_UNORM | BC7_SRGB
        | ASTC_2D_4X4_UNORM | ASTC_2D_4X4_SRGB => 4,
        ASTC_2D_5X5_UNORM => 5,
        ASTC_2D_6X6_UNORM => 6,
        ASTC_2D_8X8_UNORM | ASTC_2D_8X8_SRGB => 8,
        ASTC_2D_10X10_UNORM => 10,
        ASTC_2D_12X12_UNORM | ASTC_2D_12X12_SRGB => 12,
        _ => 1,
    }
}

pub const fn is_astc(format: PixelFormat) -> bool {
    use PixelFormat::*;
    matches!(
        format,
        ASTC_2D_4X4_UNORM
            | ASTC_2D_5X5_UNORM
            | ASTC_2D_6X6_UNORM
            | ASTC_2D_8X8_UNORM
            | ASTC_2D_10X10_UNORM
            | ASTC_2D_12X12_UNORM
            | ASTC_2D_4X4_SRGB
            | ASTC_2D_8X8_SRGB
            | ASTC_2D_12X12_SRGB
    )
}
