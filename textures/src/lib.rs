//! Block-linear texture layout engine for the Tegra family of GPUs.
//!
//! Guest textures are tiled in gobs (64x8x1 byte groups) arranged into
//! blocks of `64*2^bw x 8*2^bh x 2^bd` bytes. Everything in this crate is a
//! pure function over descriptor data; no state is kept between calls.

mod format;
mod gob;
mod layout;
mod params;
mod swizzle;
mod tic;
mod util;

pub use self::format::{
    bytes_per_block, default_block_height, default_block_width, is_astc, PixelFormat,
};
pub use self::gob::{
    SwizzleTable, GOB_SIZE, GOB_SIZE_SHIFT, GOB_SIZE_X, GOB_SIZE_X_SHIFT, GOB_SIZE_Y,
    GOB_SIZE_Y_SHIFT, GOB_SIZE_Z, GOB_SIZE_Z_SHIFT, SWIZZLE_TABLE,
};
pub use self::layout::{
    calculate_guest_size_bytes, calculate_layer_size, calculate_layer_stride,
    calculate_level_offset, calculate_level_stride_alignment, calculate_mip_level_offsets,
    calculate_mip_level_sizes, calculate_slice_offsets, calculate_slice_subresources,
    calculate_unswizzled_size_bytes, align_layer_size, Extent2D, Extent3D, ImageInfo, ImageType,
    LevelArray, SubresourceBase, SubresourceExtent, MAX_MIP_LEVELS,
};
pub use self::params::{
    make_block_linear_swizzle_2d_params, make_block_linear_swizzle_3d_params,
    BlockLinearSwizzle2DParams, BlockLinearSwizzle3DParams, SwizzleParameters,
};
pub use self::swizzle::{
    calculate_size, get_gob_offset, swizzle_kepler, swizzle_slice_to_voxel, swizzle_subrect,
    swizzle_texture, unswizzle_subrect, unswizzle_texture,
};
pub use self::tic::TicEntry;
