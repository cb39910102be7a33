//! Copies between block-linear (guest) and pitch-linear (host) memory.

use crate::gob::*;
use crate::util::{align_up_log2, div_ceil_log2};

const SUPPORTED_BPP: [u32; 8] = [1, 2, 3, 4, 6, 8, 12, 16];

fn swizzle_impl(
    to_linear: bool,
    output: &mut [u8],
    input: &[u8],
    bytes_per_pixel: u32,
    width: u32,
    height: u32,
    depth: u32,
    block_height: u32,
    block_depth: u32,
    stride_alignment: u32,
) {
    // The origin of the transformation is not exposed by the callers, so it
    // stays fixed at zero.
    let bpp = bytes_per_pixel as usize;
    let pitch = width * bytes_per_pixel;
    let stride = align_up_log2(width, stride_alignment) * bytes_per_pixel;

    let gobs_in_x = div_ceil_log2(stride, GOB_SIZE_X_SHIFT);
    let block_size = gobs_in_x << (GOB_SIZE_SHIFT + block_height + block_depth);
    let slice_size = div_ceil_log2(height, block_height + GOB_SIZE_Y_SHIFT) * block_size;

    let block_height_mask = (1u32 << block_height) - 1;
    let block_depth_mask = (1u32 << block_depth) - 1;
    let x_shift = GOB_SIZE_SHIFT + block_height + block_depth;

    for slice in 0..depth {
        let offset_z = (slice >> block_depth) * slice_size
            + ((slice & block_depth_mask) << (GOB_SIZE_SHIFT + block_height));
        for line in 0..height {
            let table = &SWIZZLE_TABLE[(line % GOB_SIZE_Y) as usize];

            let block_y = line >> GOB_SIZE_Y_SHIFT;
            let offset_y = (block_y >> block_height) * block_size
                + ((block_y & block_height_mask) << GOB_SIZE_SHIFT);

            for column in 0..width {
                let x = column * bytes_per_pixel;
                let offset_x = (x >> GOB_SIZE_X_SHIFT) << x_shift;

                let base_swizzled_offset = offset_z + offset_y + offset_x;
                let swizzled_offset =
                    (base_swizzled_offset + table[(x % GOB_SIZE_X) as usize]) as usize;

                let unswizzled_offset =
                    (slice * pitch * height + line * pitch + column * bytes_per_pixel) as usize;

                let (dst, src) = if to_linear {
                    (swizzled_offset, unswizzled_offset)
                } else {
                    (unswizzled_offset, swizzled_offset)
                };
                output[dst..dst + bpp].copy_from_slice(&input[src..src + bpp]);
            }
        }
    }
}

fn check_bpp(bytes_per_pixel: u32) {
    if !SUPPORTED_BPP.contains(&bytes_per_pixel) {
        unreachable!("invalid bytes_per_pixel={}", bytes_per_pixel);
    }
}

/// Unswizzles a block-linear texture into linear memory.
pub fn unswizzle_texture(
    output: &mut [u8],
    input: &[u8],
    bytes_per_pixel: u32,
    width: u32,
    height: u32,
    depth: u32,
    block_height: u32,
    block_depth: u32,
    stride_alignment: u32,
) {
    check_bpp(bytes_per_pixel);
    swizzle_impl(
        false,
        output,
        input,
        bytes_per_pixel,
        width,
        height,
        depth,
        block_height,
        block_depth,
        stride_alignment,
    );
}

/// Swizzles linear memory into a block-linear texture.
pub fn swizzle_texture(
    output: &mut [u8],
    input: &[u8],
    bytes_per_pixel: u32,
    width: u32,
    height: u32,
    depth: u32,
    block_height: u32,
    block_depth: u32,
    stride_alignment: u32,
) {
    check_bpp(bytes_per_pixel);
    swizzle_impl(
        true,
        output,
        input,
        bytes_per_pixel,
        width,
        height,
        depth,
        block_height,
        block_depth,
        stride_alignment,
    );
}

/// Size in bytes of one layer, swizzled or linear.
pub fn calculate_size(
    tiled: bool,
    bytes_per_pixel: u32,
    width: u32,
    height: u32,
    depth: u32,
    block_height: u32,
    block_depth: u32,
) -> usize {
    if tiled {
        let aligned_width = align_up_log2(width * bytes_per_pixel, GOB_SIZE_X_SHIFT);
        let aligned_height = align_up_log2(height, GOB_SIZE_Y_SHIFT + block_height);
        let aligned_depth = align_up_log2(depth, GOB_SIZE_Z_SHIFT + block_depth);
        aligned_width as usize * aligned_height as usize * aligned_depth as usize
    } else {
        width as usize * height as usize * depth as usize * bytes_per_pixel as usize
    }
}

/// Copies an untiled subrectangle into a tiled surface.
pub fn swizzle_subrect(
    subrect_width: u32,
    subrect_height: u32,
    source_pitch: u32,
    swizzled_width: u32,
    bytes_per_pixel: u32,
    swizzled_data: &mut [u8],
    unswizzled_data: &[u8],
    block_height_bit: u32,
    offset_x: u32,
    offset_y: u32,
) {
    check_bpp(bytes_per_pixel);
    let bpp = bytes_per_pixel as usize;
    let block_height = 1u32 << block_height_bit;
    let image_width_in_gobs = (swizzled_width * bytes_per_pixel + (GOB_SIZE_X - 1)) / GOB_SIZE_X;
    for line in 0..subrect_height {
        let dst_y = line + offset_y;
        let gob_address_y = (dst_y / (GOB_SIZE_Y * block_height))
            * GOB_SIZE
            * block_height
            * image_width_in_gobs
            + ((dst_y % (GOB_SIZE_Y * block_height)) / GOB_SIZE_Y) * GOB_SIZE;
        let table = &SWIZZLE_TABLE[(dst_y % GOB_SIZE_Y) as usize];
        for x in 0..subrect_width {
            let dst_x = x + offset_x;
            let gob_address =
                gob_address_y + (dst_x * bytes_per_pixel / GOB_SIZE_X) * GOB_SIZE * block_height;
            let swizzled_offset =
                (gob_address + table[((dst_x * bytes_per_pixel) % GOB_SIZE_X) as usize]) as usize;
            let unswizzled_offset = (line * source_pitch + x * bytes_per_pixel) as usize;

            swizzled_data[swizzled_offset..swizzled_offset + bpp]
                .copy_from_slice(&unswizzled_data[unswizzled_offset..unswizzled_offset + bpp]);
        }
    }
}

/// Copies a tiled subrectangle into a linear surface.
pub fn unswizzle_subrect(
    line_length_in: u32,
    line_count: u32,
    pitch: u32,
    width: u32,
    bytes_per_pixel: u32,
    block_height: u32,
    origin_x: u32,
    origin_y: u32,
    output: &mut [u8],
    input: &[u8],
) {
    check_bpp(bytes_per_pixel);
    let bpp = bytes_per_pixel as usize;
    let stride = width * bytes_per_pixel;
    let gobs_in_x = (stride + GOB_SIZE_X - 1) / GOB_SIZE_X;
    let block_size = gobs_in_x << (GOB_SIZE_SHIFT + block_height);

    let block_height_mask = (1u32 << block_height) - 1;
    let x_shift = GOB_SIZE_SHIFT + block_height;

    for line in 0..line_count {
        let src_y = line + origin_y;
        let table = &SWIZZLE_TABLE[(src_y % GOB_SIZE_Y) as usize];

        let block_y = src_y >> GOB_SIZE_Y_SHIFT;
        let src_offset_y = (block_y >> block_height) * block_size
            + ((block_y & block_height_mask) << GOB_SIZE_SHIFT);
        for column in 0..line_length_in {
            let src_x = (column + origin_x) * bytes_per_pixel;
            let src_offset_x = (src_x >> GOB_SIZE_X_SHIFT) << x_shift;

            let swizzled_offset =
                (src_offset_y + src_offset_x + table[(src_x % GOB_SIZE_X) as usize]) as usize;
            let unswizzled_offset = (line * pitch + column * bytes_per_pixel) as usize;

            output[unswizzled_offset..unswizzled_offset + bpp]
                .copy_from_slice(&input[swizzled_offset..swizzled_offset + bpp]);
        }
    }
}

/// Swizzles a 2D array of pixels into one slice of a 3D texture.
///
/// Only a zero origin is supported; the callers replacing 3D slices never
/// pass anything else.
pub fn swizzle_slice_to_voxel(
    line_length_in: u32,
    line_count: u32,
    pitch: u32,
    width: u32,
    _height: u32,
    bytes_per_pixel: u32,
    block_height: u32,
    block_depth: u32,
    origin_x: u32,
    origin_y: u32,
    output: &mut [u8],
    input: &[u8],
) {
    check_bpp(bytes_per_pixel);
    if origin_x > 0 || origin_y > 0 {
        log::error!(
            "unimplemented slice-to-voxel origin ({}, {})",
            origin_x,
            origin_y
        );
    }

    let bpp = bytes_per_pixel as usize;
    let stride = width * bytes_per_pixel;
    let gobs_in_x = (stride + GOB_SIZE_X - 1) / GOB_SIZE_X;
    let block_size = gobs_in_x << (GOB_SIZE_SHIFT + block_height + block_depth);

    let block_height_mask = (1u32 << block_height) - 1;
    let x_shift = GOB_SIZE_SHIFT + block_height + block_depth;

    for line in 0..line_count {
        let table = &SWIZZLE_TABLE[(line % GOB_SIZE_Y) as usize];
        let block_y = line / GOB_SIZE_Y;
        let dst_offset_y =
            (block_y >> block_height) * block_size + (block_y & block_height_mask) * GOB_SIZE;
        for x in 0..line_length_in {
            let dst_offset = (((x / GOB_SIZE_X) << x_shift)
                + dst_offset_y
                + table[(x % GOB_SIZE_X) as usize]) as usize;
            let src_offset = (x * bytes_per_pixel + line * pitch) as usize;
            output[dst_offset..dst_offset + bpp]
                .copy_from_slice(&input[src_offset..src_offset + bpp]);
        }
    }
}

/// Byte-wise swizzle used by the Kepler inline memory engine.
pub fn swizzle_kepler(
    width: u32,
    height: u32,
    dst_x: u32,
    dst_y: u32,
    block_height_bit: u32,
    copy_size: usize,
    source_data: &[u8],
    swizzle_data: &mut [u8],
) {
    let block_height = 1u32 << block_height_bit;
    let image_width_in_gobs = (width + GOB_SIZE_X - 1) / GOB_SIZE_X;
    let mut count = 0usize;
    let mut y = dst_y;
    while y < height && count < copy_size {
        let gob_address_y = (y / (GOB_SIZE_Y * block_height))
            * GOB_SIZE
            * block_height
            * image_width_in_gobs
            + ((y % (GOB_SIZE_Y * block_height)) / GOB_SIZE_Y) * GOB_SIZE;
        let table = &SWIZZLE_TABLE[(y % GOB_SIZE_Y) as usize];
        let mut x = dst_x;
        while x < width && count < copy_size {
            let gob_address = gob_address_y + (x / GOB_SIZE_X) * GOB_SIZE * block_height;
            let swizzled_offset = (gob_address + table[(x % GOB_SIZE_X) as usize]) as usize;
            swizzle_data[swizzled_offset] = source_data[count];
            count += 1;
            x += 1;
        }
        y += 1;
    }
}

/// Offset of the gob holding position (`dst_x`, `dst_y`).
pub fn get_gob_offset(
    width: u32,
    _height: u32,
    dst_x: u32,
    dst_y: u32,
    block_height: u32,
    bytes_per_pixel: u32,
) -> u64 {
    let gobs_in_block = 1u32 << block_height;
    let y_blocks = GOB_SIZE_Y << block_height;
    let x_per_gob = GOB_SIZE_X / bytes_per_pixel;
    let x_blocks = (width + x_per_gob - 1) / x_per_gob;
    let block_size = GOB_SIZE * gobs_in_block;
    let stride = block_size * x_blocks;
    let base = (dst_y / y_blocks) * stride + (dst_x / x_per_gob) * block_size;
    let relative_y = dst_y % y_blocks;
    u64::from(base + (relative_y / GOB_SIZE_Y) * GOB_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn round_trip(bpp: u32, width: u32, height: u32, depth: u32, bh: u32, bd: u32) {
        let linear_size = (width * height * depth * bpp) as usize;
        let tiled_size = calculate_size(true, bpp, width, height, depth, bh, bd);
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x746567_7261);
        let input: Vec<u8> = (0..linear_size).map(|_| rng.gen()).collect();

        let mut tiled = vec![0u8; tiled_size.max(linear_size)];
        swizzle_texture(&mut tiled, &input, bpp, width, height, depth, bh, bd, 1);

        let mut output = vec![0u8; linear_size];
        unswizzle_texture(&mut output, &tiled, bpp, width, height, depth, bh, bd, 1);
        assert_eq!(input, output, "bpp={} {}x{}x{} bh={} bd={}", bpp, width, height, depth, bh, bd);
    }

    #[test]
    fn swizzle_round_trips() {
        for &bpp in SUPPORTED_BPP.iter() {
            round_trip(bpp, 64, 32, 1, 0, 0);
            round_trip(bpp, 37, 19, 1, 2, 0);
            round_trip(bpp, 128, 64, 4, 3, 1);
        }
        round_trip(4, 1, 1, 1, 0, 0);
        round_trip(4, 65, 9, 3, 4, 2);
        round_trip(16, 300, 300, 1, 5, 0);
    }

    #[test]
    fn subrect_round_trips_against_full_surface() {
        let bpp = 4;
        let (width, height) = (96u32, 48u32);
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let input: Vec<u8> = (0..(width * height * bpp) as usize).map(|_| rng.gen()).collect();

        let tiled_size = calculate_size(true, bpp, width, height, 1, 1, 0);
        let mut tiled = vec![0u8; tiled_size];
        swizzle_subrect(width, height, width * bpp, width, bpp, &mut tiled, &input, 1, 0, 0);

        let mut linear = vec![0u8; input.len()];
        unswizzle_subrect(width, height, width * bpp, width, bpp, 1, 0, 0, &mut linear, &tiled);
        assert_eq!(input, linear);
    }

    #[test]
    fn gob_offset_of_origin_is_zero() {
        assert_eq!(get_gob_offset(256, 256, 0, 0, 2, 4), 0);
        // Second gob row of a block lands one gob further in.
        assert_eq!(get_gob_offset(256, 256, 0, 8, 2, 4), u64::from(GOB_SIZE));
    }
}
