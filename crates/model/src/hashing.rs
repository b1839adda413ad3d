//! Name hashing for instance ids.
//!
//! Names are hashed with 64-bit FNV-1 over their lower-cased UTF-8 bytes, so
//! the same name always produces the same id with no registry involved.

pub const FNV64_OFFSET: u64 = 0xCBF2_9CE4_8422_2325;
pub const FNV64_PRIME: u64 = 0x0000_0100_0000_01B3;

/// 64-bit FNV-1 hash of the lower-cased text.
#[must_use]
pub fn fnv64(text: &str) -> u64 {
    text.to_lowercase()
        .bytes()
        .fold(FNV64_OFFSET, |hash, byte| {
            hash.wrapping_mul(FNV64_PRIME) ^ u64::from(byte)
        })
}

/// Keep the low `width` bits of `hash`; widths of 64 or more leave it unchanged.
#[must_use]
pub const fn reduce_bits(hash: u64, width: u32) -> u64 {
    if width >= 64 {
        hash
    } else {
        hash & ((1u64 << width) - 1)
    }
}

/// How a name maps into an instance id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSpace {
    /// Instance tuning: hash of the name narrowed to the class id width.
    Narrowed(u32),
    /// Module-style tuning: `.` in the name becomes `-` before hashing, full width.
    Normalized,
}

#[must_use]
pub fn derive_instance_id(name: &str, space: IdSpace) -> u64 {
    match space {
        IdSpace::Narrowed(width) => reduce_bits(fnv64(name), width),
        IdSpace::Normalized => fnv64(&name.replace('.', "-")),
    }
}
