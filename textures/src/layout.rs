//! Mip level, layer and slice placement inside a block-linear image.

use crate::format::{bytes_per_block, default_block_height, default_block_width, PixelFormat};
use crate::gob::*;
use crate::util::{align_up, align_up_log2, div_ceil, div_ceil_log2};

pub const MAX_MIP_LEVELS: usize = 14;

pub type LevelArray = [u32; MAX_MIP_LEVELS];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Extent3D {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ImageType {
    E1D,
    E2D,
    E3D,
    Linear,
    Buffer,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SubresourceExtent {
    pub levels: u32,
    pub layers: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SubresourceBase {
    pub level: u32,
    pub layer: u32,
}

/// Resolved image description; the input of every layout query.
#[derive(Copy, Clone, Debug)]
pub struct ImageInfo {
    pub format: PixelFormat,
    pub image_type: ImageType,
    pub size: Extent3D,
    /// Block exponents (bw, bh, bd). `width` is always zero on this GPU.
    pub block: Extent3D,
    pub tile_width_spacing: u32,
    pub layer_stride: u32,
    pub pitch: u32,
    pub resources: SubresourceExtent,
}

struct LevelInfo {
    size: Extent3D,
    block: Extent3D,
    tile_size: Extent2D,
    bpp_log2: u32,
    tile_width_spacing: u32,
}

fn adjust_tile_size(shift: u32, unit_factor: u32, dimension: u32) -> u32 {
    if shift == 0 {
        return 0;
    }
    let mut shift = shift;
    let mut x = unit_factor << (shift - 1);
    if x >= dimension {
        loop {
            shift -= 1;
            if shift == 0 {
                break;
            }
            x >>= 1;
            if x < dimension {
                break;
            }
        }
    }
    shift
}

fn adjust_mip_size(size: u32, level: u32) -> u32 {
    (size >> level).max(1)
}

fn adjust_mip_extent(size: Extent3D, level: u32) -> Extent3D {
    Extent3D {
        width: adjust_mip_size(size.width, level),
        height: adjust_mip_size(size.height, level),
        depth: adjust_mip_size(size.depth, level),
    }
}

fn adjust_mip_block_size_dim(gob_extent: u32, num_tiles: u32, block_size: u32, level: u32) -> u32 {
    let mut block_size = block_size;
    let mut level = level as i64;
    loop {
        while block_size > 0 && num_tiles <= (1u32 << (block_size - 1)) * gob_extent {
            block_size -= 1;
        }
        level -= 1;
        if level < 0 {
            break;
        }
    }
    block_size
}

fn adjust_mip_block_size(num_tiles: Extent3D, block_size: Extent3D, level: u32) -> Extent3D {
    Extent3D {
        width: adjust_mip_block_size_dim(GOB_SIZE_X, num_tiles.width, block_size.width, level),
        height: adjust_mip_block_size_dim(GOB_SIZE_Y, num_tiles.height, block_size.height, level),
        depth: adjust_mip_block_size_dim(GOB_SIZE_Z, num_tiles.depth, block_size.depth, level),
    }
}

fn tiles_of(size: Extent3D, tile_size: Extent2D) -> Extent3D {
    Extent3D {
        width: div_ceil(size.width, tile_size.width),
        height: div_ceil(size.height, tile_size.height),
        depth: size.depth,
    }
}

fn bytes_per_block_log2(bytes: u32) -> u32 {
    31 - bytes.leading_zeros()
}

fn num_blocks(size: Extent3D, tile_size: Extent2D) -> u32 {
    let blocks = tiles_of(size, tile_size);
    blocks.width * blocks.height * blocks.depth
}

fn default_block_size(format: PixelFormat) -> Extent2D {
    Extent2D {
        width: default_block_width(format),
        height: default_block_height(format),
    }
}

fn num_level_blocks(info: &LevelInfo, level: u32) -> Extent3D {
    Extent3D {
        width: div_ceil(adjust_mip_size(info.size.width, level), info.tile_size.width)
            << info.bpp_log2,
        height: div_ceil(adjust_mip_size(info.size.height, level), info.tile_size.height),
        depth: adjust_mip_size(info.size.depth, level),
    }
}

fn tile_shift(info: &LevelInfo, level: u32) -> Extent3D {
    let blocks = num_level_blocks(info, level);
    Extent3D {
        width: adjust_tile_size(info.block.width, GOB_SIZE_X, blocks.width),
        height: adjust_tile_size(info.block.height, GOB_SIZE_Y, blocks.height),
        depth: adjust_tile_size(info.block.depth, GOB_SIZE_Z, blocks.depth),
    }
}

fn gob_size(bpp_log2: u32, block_height: u32, tile_width_spacing: u32) -> Extent2D {
    Extent2D {
        width: GOB_SIZE_X_SHIFT - bpp_log2 + tile_width_spacing,
        height: GOB_SIZE_Y_SHIFT + block_height,
    }
}

fn is_smaller_than_gob_size(num_tiles: Extent3D, gob: Extent2D, block_depth: u32) -> bool {
    num_tiles.width <= (1u32 << gob.width)
        || num_tiles.height <= (1u32 << gob.height)
        || num_tiles.depth < (1u32 << block_depth)
}

fn stride_alignment(num_tiles: Extent3D, block: Extent3D, gob: Extent2D, bpp_log2: u32) -> u32 {
    if is_smaller_than_gob_size(num_tiles, gob, block.depth) {
        GOB_SIZE_X_SHIFT - bpp_log2
    } else {
        gob.width
    }
}

fn num_gobs(info: &LevelInfo, level: u32) -> Extent2D {
    let blocks = num_level_blocks(info, level);
    let gobs = Extent2D {
        width: div_ceil_log2(blocks.width, GOB_SIZE_X_SHIFT),
        height: div_ceil_log2(blocks.height, GOB_SIZE_Y_SHIFT),
    };
    let gob = gob_size(info.bpp_log2, info.block.height, info.tile_width_spacing);
    let alignment = if is_smaller_than_gob_size(blocks, gob, info.block.depth) {
        0
    } else {
        info.tile_width_spacing
    };
    Extent2D {
        width: align_up_log2(gobs.width, alignment),
        height: gobs.height,
    }
}

fn level_tiles(info: &LevelInfo, level: u32) -> Extent3D {
    let blocks = num_level_blocks(info, level);
    let shift = tile_shift(info, level);
    let gobs = num_gobs(info, level);
    Extent3D {
        width: div_ceil_log2(gobs.width, shift.width),
        height: div_ceil_log2(gobs.height, shift.height),
        depth: div_ceil_log2(blocks.depth, shift.depth),
    }
}

fn calculate_level_size(info: &LevelInfo, level: u32) -> u32 {
    let shift = tile_shift(info, level);
    let tiles = level_tiles(info, level);
    let num_tiles = tiles.width * tiles.height * tiles.depth;
    num_tiles << (GOB_SIZE_SHIFT + shift.width + shift.height + shift.depth)
}

fn make_level_info(
    format: PixelFormat,
    size: Extent3D,
    block: Extent3D,
    tile_width_spacing: u32,
) -> LevelInfo {
    LevelInfo {
        size,
        block,
        tile_size: default_block_size(format),
        bpp_log2: bytes_per_block_log2(bytes_per_block(format)),
        tile_width_spacing,
    }
}

fn level_info_of(info: &ImageInfo) -> LevelInfo {
    make_level_info(info.format, info.size, info.block, info.tile_width_spacing)
}

/// Byte offset of `level` within one layer.
pub fn calculate_level_offset(
    format: PixelFormat,
    size: Extent3D,
    block: Extent3D,
    tile_width_spacing: u32,
    level: u32,
) -> u32 {
    let info = make_level_info(format, size, block, tile_width_spacing);
    (0..level).map(|current| calculate_level_size(&info, current)).sum()
}

/// Aligns one layer's byte size to the layer stride the hardware uses.
///
/// With tile width spacing the layer is padded to the full block column;
/// otherwise the block exponents shrink toward the layer bounds first.
pub fn align_layer_size(
    size_bytes: u32,
    size: Extent3D,
    block: Extent3D,
    tile_size_y: u32,
    tile_width_spacing: u32,
) -> u32 {
    if tile_width_spacing > 0 {
        let alignment_log2 = GOB_SIZE_SHIFT + tile_width_spacing + block.height + block.depth;
        return align_up_log2(size_bytes, alignment_log2);
    }
    let aligned_height = align_up(size.height, tile_size_y);
    let mut block_height = block.height;
    let mut block_depth = block.depth;
    while block_height != 0 && aligned_height <= (1u32 << (block_height - 1)) * GOB_SIZE_Y {
        block_height -= 1;
    }
    while block_depth != 0 && size.depth <= (1u32 << (block_depth - 1)) {
        block_depth -= 1;
    }
    let block_shift = GOB_SIZE_SHIFT + block_height + block_depth;
    let num_blocks = size_bytes >> block_shift;
    if size_bytes != num_blocks << block_shift {
        (num_blocks + 1) << block_shift
    } else {
        size_bytes
    }
}

/// Unaligned size in bytes of one layer (all mip levels).
pub fn calculate_layer_size(info: &ImageInfo) -> u32 {
    debug_assert!(info.image_type != ImageType::Linear);
    calculate_level_offset(
        info.format,
        info.size,
        info.block,
        info.tile_width_spacing,
        info.resources.levels,
    )
}

/// Distance in bytes between consecutive layers.
pub fn calculate_layer_stride(info: &ImageInfo) -> u32 {
    debug_assert!(info.image_type != ImageType::Linear);
    align_layer_size(
        calculate_layer_size(info),
        info.size,
        info.block,
        default_block_height(info.format),
        info.tile_width_spacing,
    )
}

/// Per-level byte offsets within a layer.
pub fn calculate_mip_level_offsets(info: &ImageInfo) -> LevelArray {
    debug_assert!(info.resources.levels as usize <= MAX_MIP_LEVELS);
    let level_info = level_info_of(info);
    let mut offsets = [0u32; MAX_MIP_LEVELS];
    let mut offset = 0;
    for level in 0..info.resources.levels {
        offsets[level as usize] = offset;
        offset += calculate_level_size(&level_info, level);
    }
    offsets
}

/// Per-level byte sizes.
pub fn calculate_mip_level_sizes(info: &ImageInfo) -> LevelArray {
    debug_assert!(info.resources.levels as usize <= MAX_MIP_LEVELS);
    let level_info = level_info_of(info);
    let mut sizes = [0u32; MAX_MIP_LEVELS];
    for level in 0..info.resources.levels {
        sizes[level as usize] = calculate_level_size(&level_info, level);
    }
    sizes
}

fn num_slices(info: &ImageInfo) -> usize {
    debug_assert!(info.image_type == ImageType::E3D);
    (0..info.resources.levels)
        .map(|level| adjust_mip_size(info.size.depth, level) as usize)
        .sum()
}

/// Byte offset of every (level, slice) pair of a 3D image, level-major.
pub fn calculate_slice_offsets(info: &ImageInfo) -> Vec<u32> {
    debug_assert!(info.image_type == ImageType::E3D);
    let mut offsets = Vec::with_capacity(num_slices(info));
    let level_info = level_info_of(info);
    let mut mip_offset = 0;
    for level in 0..info.resources.levels {
        let shift = tile_shift(&level_info, level);
        let tiles = level_tiles(&level_info, level);
        let gob_size_shift = shift.height + GOB_SIZE_SHIFT;
        let slice_size = (tiles.width * tiles.height) << gob_size_shift;
        let z_mask = (1u32 << shift.depth) - 1;
        let depth = adjust_mip_size(info.size.depth, level);
        for slice in 0..depth {
            let z_low = slice & z_mask;
            let z_high = slice & !z_mask;
            offsets.push(mip_offset + (z_low << gob_size_shift) + z_high * slice_size);
        }
        mip_offset += calculate_level_size(&level_info, level);
    }
    offsets
}

/// The (level, layer) pair each entry of `calculate_slice_offsets` refers to.
pub fn calculate_slice_subresources(info: &ImageInfo) -> Vec<SubresourceBase> {
    debug_assert!(info.image_type == ImageType::E3D);
    let mut subresources = Vec::with_capacity(num_slices(info));
    for level in 0..info.resources.levels {
        let depth = adjust_mip_size(info.size.depth, level);
        for slice in 0..depth {
            subresources.push(SubresourceBase { level, layer: slice });
        }
    }
    subresources
}

/// Stride alignment exponent to use when swizzling `level`.
pub fn calculate_level_stride_alignment(info: &ImageInfo, level: u32) -> u32 {
    let tile_size = default_block_size(info.format);
    let level_size = adjust_mip_extent(info.size, level);
    let num_tiles = tiles_of(level_size, tile_size);
    let block = adjust_mip_block_size(num_tiles, info.block, level);
    let bpp_log2 = bytes_per_block_log2(bytes_per_block(info.format));
    let gob = gob_size(bpp_log2, block.height, info.tile_width_spacing);
    stride_alignment(num_tiles, block, gob, bpp_log2)
}

/// Bytes the image occupies in guest memory.
pub fn calculate_guest_size_bytes(info: &ImageInfo) -> u32 {
    if info.image_type == ImageType::Buffer {
        return info.size.width * bytes_per_block(info.format);
    }
    if info.image_type == ImageType::Linear {
        return info.pitch * div_ceil(info.size.height, default_block_height(info.format));
    }
    if info.resources.layers > 1 {
        debug_assert!(info.layer_stride != 0);
        info.layer_stride * info.resources.layers
    } else {
        calculate_layer_size(info)
    }
}

/// Bytes of the image once unswizzled to pitch-linear host memory.
pub fn calculate_unswizzled_size_bytes(info: &ImageInfo) -> u32 {
    if info.image_type == ImageType::Buffer {
        return info.size.width * bytes_per_block(info.format);
    }
    if info.image_type == ImageType::Linear {
        return info.pitch * div_ceil(info.size.height, default_block_height(info.format));
    }
    let tile_size = default_block_size(info.format);
    let blocks_per_layer: u32 = (0..info.resources.levels)
        .map(|level| num_blocks(adjust_mip_extent(info.size, level), tile_size))
        .sum();
    blocks_per_layer * info.resources.layers * bytes_per_block(info.format)
}

/// Per-level swizzle parameters, fed to the compute-swizzle path.
pub(crate) fn level_swizzle_block(info: &ImageInfo, level: u32) -> (Extent3D, Extent3D) {
    let tile_size = default_block_size(info.format);
    let level_size = adjust_mip_extent(info.size, level);
    let num_tiles = tiles_of(level_size, tile_size);
    let block = adjust_mip_block_size(num_tiles, info.block, level);
    (num_tiles, block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PixelFormat;

    fn image(format: PixelFormat, w: u32, h: u32, bh: u32, spacing: u32, levels: u32) -> ImageInfo {
        ImageInfo {
            format,
            image_type: ImageType::E2D,
            size: Extent3D { width: w, height: h, depth: 1 },
            block: Extent3D { width: 0, height: bh, depth: 0 },
            tile_width_spacing: spacing,
            layer_stride: 0,
            pitch: 0,
            resources: SubresourceExtent { levels, layers: 1 },
        }
    }

    #[test]
    fn astc_layer_size_regression() {
        let info = image(PixelFormat::ASTC_2D_12X12_UNORM, 8192, 4096, 2, 0, 12);
        let stride = calculate_layer_stride(&info);
        assert_eq!(stride, 0x50d800);
    }

    #[test]
    fn bc5_tile_width_spacing_layer_size() {
        let info = image(PixelFormat::BC5_UNORM, 1024, 1024, 3, 4, 11);
        let stride = calculate_layer_stride(&info);
        assert_eq!(stride, 0x160000);
    }

    #[test]
    fn mip_offsets_are_monotonic_and_match_sizes() {
        let info = image(PixelFormat::A8B8G8R8_UNORM, 1024, 512, 4, 0, 10);
        let offsets = calculate_mip_level_offsets(&info);
        let sizes = calculate_mip_level_sizes(&info);
        for level in 0..info.resources.levels as usize - 1 {
            assert!(offsets[level + 1] > offsets[level], "level {}", level);
            assert_eq!(offsets[level + 1] - offsets[level], sizes[level]);
        }
    }

    #[test]
    fn level_offset_matches_prefix_sum() {
        let info = image(PixelFormat::R32G32B32A32_FLOAT, 400, 300, 2, 0, 8);
        let sizes = calculate_mip_level_sizes(&info);
        let mut acc = 0;
        for level in 0..8 {
            assert_eq!(
                calculate_level_offset(info.format, info.size, info.block, 0, level),
                acc
            );
            acc += sizes[level as usize];
        }
    }

    #[test]
    fn slice_offsets_cover_every_slice() {
        let info = ImageInfo {
            image_type: ImageType::E3D,
            size: Extent3D { width: 64, height: 64, depth: 16 },
            resources: SubresourceExtent { levels: 3, layers: 1 },
            ..image(PixelFormat::A8B8G8R8_UNORM, 64, 64, 1, 0, 3)
        };
        let offsets = calculate_slice_offsets(&info);
        let subresources = calculate_slice_subresources(&info);
        assert_eq!(offsets.len(), 16 + 8 + 4);
        assert_eq!(offsets.len(), subresources.len());
        assert_eq!(subresources[0], SubresourceBase { level: 0, layer: 0 });
        assert_eq!(subresources[16], SubresourceBase { level: 1, layer: 0 });
    }
}
