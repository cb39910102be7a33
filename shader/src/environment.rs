//! The host-side collaborator the compiler pulls its inputs from.
//!
//! Service dispatch, presentation and descriptor binding all live behind
//! this boundary; the compiler only ever asks for guest memory and
//! descriptor metadata.

use crate::ir::TextureType;
use crate::stage::Stage;

pub trait Environment {
    /// Uniform guest memory read. Total over valid guest addresses.
    fn read_guest(&self, addr: u64, dest: &mut [u8]);

    /// One 64-bit instruction word at `addr`.
    fn read_instruction(&self, addr: u64) -> u64 {
        let mut bytes = [0u8; 8];
        self.read_guest(addr, &mut bytes);
        u64::from_le_bytes(bytes)
    }

    /// Resolves a texture handle into the descriptor's texture type. Used by
    /// the texture tracking pass to classify sampling operations.
    fn read_texture_type(&self, handle: u32) -> TextureType;

    /// Constant buffer slot holding the bound texture handles.
    fn texture_bound_buffer(&self) -> u32 {
        0
    }

    fn start_address(&self) -> u64;
    fn stage(&self) -> Stage;
    fn local_memory_size(&self) -> u32;
    fn shared_memory_size(&self) -> u32;
    fn workgroup_size(&self) -> [u32; 3] {
        [1, 1, 1]
    }
}
