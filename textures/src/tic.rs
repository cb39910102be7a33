//! Texture image control (TIC) descriptors and their resolution.

use crate::format::{default_block_height, PixelFormat};
use crate::layout::{
    calculate_layer_stride, Extent3D, ImageInfo, ImageType, SubresourceExtent,
};
use crate::util::div_ceil;

/// Raw texture descriptor as the guest writes it, already unpacked from the
/// 256-bit TIC word by the Environment.
#[derive(Copy, Clone, Debug)]
pub struct TicEntry {
    pub gpu_address: u64,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_count: u32,
    pub layer_count: u32,
    /// Pitch in bytes; only meaningful when `tiled` is false.
    pub pitch: u32,
    pub tile_width_spacing: u32,
    pub block_width: u32,
    pub block_height: u32,
    pub block_depth: u32,
    pub is_3d: bool,
    pub srgb: bool,
    pub tiled: bool,
}

impl TicEntry {
    /// Resolves the raw descriptor into the derived record every layout
    /// query consumes. Layer stride is computed here once.
    pub fn image_info(&self) -> ImageInfo {
        let image_type = if !self.tiled {
            ImageType::Linear
        } else if self.is_3d {
            ImageType::E3D
        } else {
            ImageType::E2D
        };
        let mut info = ImageInfo {
            format: self.format,
            image_type,
            size: Extent3D {
                width: self.width,
                height: self.height,
                depth: if self.is_3d { self.depth } else { 1 },
            },
            block: Extent3D {
                width: self.block_width,
                height: self.block_height,
                depth: self.block_depth,
            },
            tile_width_spacing: self.tile_width_spacing,
            layer_stride: 0,
            pitch: self.pitch,
            resources: SubresourceExtent {
                levels: self.mip_count.max(1),
                layers: if self.is_3d { 1 } else { self.layer_count.max(1) },
            },
        };
        if info.image_type != ImageType::Linear {
            info.layer_stride = calculate_layer_stride(&info);
        }
        info
    }

    /// Bytes of guest memory this descriptor spans.
    pub fn guest_size_bytes(&self) -> u32 {
        let info = self.image_info();
        if info.image_type == ImageType::Linear {
            return self.pitch * div_ceil(self.height, default_block_height(self.format));
        }
        crate::layout::calculate_guest_size_bytes(&info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layered_descriptor_gets_a_layer_stride() {
        let tic = TicEntry {
            gpu_address: 0,
            format: PixelFormat::A8B8G8R8_UNORM,
            width: 256,
            height: 256,
            depth: 1,
            mip_count: 9,
            layer_count: 6,
            pitch: 0,
            tile_width_spacing: 0,
            block_width: 0,
            block_height: 4,
            block_depth: 0,
            is_3d: false,
            srgb: false,
            tiled: true,
        };
        let info = tic.image_info();
        assert!(info.layer_stride != 0);
        assert_eq!(tic.guest_size_bytes(), info.layer_stride * 6);
    }

    #[test]
    fn linear_descriptor_uses_pitch() {
        let tic = TicEntry {
            gpu_address: 0,
            format: PixelFormat::A8B8G8R8_UNORM,
            width: 100,
            height: 40,
            depth: 1,
            mip_count: 1,
            layer_count: 1,
            pitch: 512,
            tile_width_spacing: 0,
            block_width: 0,
            block_height: 0,
            block_depth: 0,
            is_3d: false,
            srgb: false,
            tiled: false,
        };
        assert_eq!(tic.guest_size_bytes(), 512 * 40);
    }
}
