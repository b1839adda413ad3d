//! # TGI Model
//!
//! Identity model for game resources: the Type-Group-Instance key, the
//! classification of type codes into categories, and the hashing rules used to
//! derive instance ids from names.
//!
//! ## Layout
//!
//! ```text
//! ResourceKey { type, group, instance }
//!     │
//!     ├──> classify()            → ResourceCategory
//!     │      └─> tuning / binary / SimData group tables
//!     │
//!     ├──> format_key()          → "6017E896-00000000-0123456789ABCDEF"
//!     │      └─> key_from_filename() (inverse, for loose files)
//!     │
//!     └──> derive_instance_id()  → fnv64(name), narrowed per class
//! ```
//!
//! ## Example
//!
//! ```rust
//! use tgi_model::{classify, derive_instance_id, BitWidths, IdSpace, ResourceCategory, ResourceKey};
//!
//! let widths = BitWidths::default();
//! let instance = derive_instance_id("creator:buff_Example", IdSpace::Narrowed(widths.width_for("Buff")));
//! let key = ResourceKey::new(0x6017_E896, 0, instance);
//!
//! assert_eq!(classify(&key), ResourceCategory::Tuning("Buff"));
//! ```

mod error;
mod hashing;
mod key;
mod locale;
mod taxonomy;

pub use error::{ModelError, Result};
pub use hashing::{derive_instance_id, fnv64, reduce_bits, IdSpace, FNV64_OFFSET, FNV64_PRIME};
pub use key::{format_hex, format_key, key_from_filename, parse_hex, ResourceKey};
pub use locale::StringTableLocale;
pub use taxonomy::{
    bit_width_for_class, classify, is_tuning_type, simdata_group_name, tuning_type_for_class,
    tuning_type_name, BinaryType, BitWidths, ResourceCategory, GENERIC_TUNING_TYPE,
};
