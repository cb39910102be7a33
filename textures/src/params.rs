//! Parameter records for the compute-shader swizzle path.

use crate::format::bytes_per_block;
use crate::gob::*;
use crate::layout::{calculate_level_stride_alignment, level_swizzle_block, Extent3D, ImageInfo};
use crate::util::{align_up_log2, div_ceil_log2};

/// One mip level's swizzle inputs, as produced by the layout queries.
#[derive(Copy, Clone, Debug)]
pub struct SwizzleParameters {
    pub num_tiles: Extent3D,
    pub block: Extent3D,
    pub level: u32,
}

impl SwizzleParameters {
    pub fn of_level(info: &ImageInfo, level: u32) -> SwizzleParameters {
        let (num_tiles, block) = level_swizzle_block(info, level);
        SwizzleParameters { num_tiles, block, level }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlockLinearSwizzle2DParams {
    pub origin: [u32; 3],
    pub destination: [i32; 3],
    pub bytes_per_block_log2: u32,
    pub layer_stride: u32,
    pub block_size: u32,
    pub x_shift: u32,
    pub block_height: u32,
    pub block_height_mask: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlockLinearSwizzle3DParams {
    pub origin: [u32; 3],
    pub destination: [i32; 3],
    pub bytes_per_block_log2: u32,
    pub slice_size: u32,
    pub block_size: u32,
    pub x_shift: u32,
    pub block_height: u32,
    pub block_height_mask: u32,
    pub block_depth: u32,
    pub block_depth_mask: u32,
}

pub fn make_block_linear_swizzle_2d_params(
    swizzle: &SwizzleParameters,
    info: &ImageInfo,
) -> BlockLinearSwizzle2DParams {
    let block = swizzle.block;
    let num_tiles = swizzle.num_tiles;
    let bytes = bytes_per_block(info.format);
    let stride_alignment = calculate_level_stride_alignment(info, swizzle.level);
    let stride = align_up_log2(num_tiles.width, stride_alignment) * bytes;
    let gobs_in_x = div_ceil_log2(stride, GOB_SIZE_X_SHIFT);
    BlockLinearSwizzle2DParams {
        origin: [0, 0, 0],
        destination: [0, 0, 0],
        bytes_per_block_log2: bytes.trailing_zeros(),
        layer_stride: info.layer_stride,
        block_size: gobs_in_x << (GOB_SIZE_SHIFT + block.height + block.depth),
        x_shift: GOB_SIZE_SHIFT + block.height + block.depth,
        block_height: block.height,
        block_height_mask: (1 << block.height) - 1,
    }
}

pub fn make_block_linear_swizzle_3d_params(
    swizzle: &SwizzleParameters,
    info: &ImageInfo,
) -> BlockLinearSwizzle3DParams {
    let block = swizzle.block;
    let num_tiles = swizzle.num_tiles;
    let bytes = bytes_per_block(info.format);
    let stride_alignment = calculate_level_stride_alignment(info, swizzle.level);
    let stride = align_up_log2(num_tiles.width, stride_alignment) * bytes;

    let gobs_in_x = (stride + GOB_SIZE_X - 1) >> GOB_SIZE_X_SHIFT;
    let block_size = gobs_in_x << (GOB_SIZE_SHIFT + block.height + block.depth);
    let slice_size =
        div_ceil_log2(num_tiles.height, block.height + GOB_SIZE_Y_SHIFT) * block_size;
    BlockLinearSwizzle3DParams {
        origin: [0, 0, 0],
        destination: [0, 0, 0],
        bytes_per_block_log2: bytes.trailing_zeros(),
        slice_size,
        block_size,
        x_shift: GOB_SIZE_SHIFT + block.height + block.depth,
        block_height: block.height,
        block_height_mask: (1 << block.height) - 1,
        block_depth: block.depth,
        block_depth_mask: (1 << block.depth) - 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PixelFormat;
    use crate::layout::{ImageType, SubresourceExtent};

    #[test]
    fn params_match_cpu_swizzle_geometry() {
        let info = ImageInfo {
            format: PixelFormat::A8B8G8R8_UNORM,
            image_type: ImageType::E2D,
            size: Extent3D { width: 512, height: 512, depth: 1 },
            block: Extent3D { width: 0, height: 2, depth: 0 },
            tile_width_spacing: 0,
            layer_stride: 0x100000,
            pitch: 0,
            resources: SubresourceExtent { levels: 1, layers: 1 },
        };
        let swizzle = SwizzleParameters::of_level(&info, 0);
        let params = make_block_linear_swizzle_2d_params(&swizzle, &info);
        assert_eq!(params.bytes_per_block_log2, 2);
        assert_eq!(params.x_shift, GOB_SIZE_SHIFT + 2);
        assert_eq!(params.block_height_mask, 3);
        // 512 * 4 bytes per row = 32 gobs in x, blocks span 4 gobs vertically.
        assert_eq!(params.block_size, 32 << (GOB_SIZE_SHIFT + 2));
    }
}
