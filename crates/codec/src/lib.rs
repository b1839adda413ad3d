//! # TGI Codec
//!
//! Byte-level side of the workspace: reading packages, decoding each entry as
//! the type its key implies, reading and rewriting tuning identity, and
//! summarizing a package for display.
//!
//! ## Pipeline
//!
//! ```text
//! package bytes
//!     │
//!     ├──> decode_container()      DBPF 2.1 index, zlib inflate
//!     │
//!     ├──> extract(filter)         per entry, by classify(key)
//!     │    ├─> Tuning              TuningDocument { text, metadata }
//!     │    ├─> SimData             XML document or opaque DATA blob
//!     │    ├─> StringTable         STBL v5
//!     │    └─> anything else       Binary
//!     │         (decode failure → Decoded::RawFallback, never an error)
//!     │
//!     └──> summarize()             PackageIndex groups for a viewer
//! ```
//!
//! ## Example
//!
//! ```rust
//! use tgi_codec::{infer_key, infer_metadata, insert_override, KeyOverrides};
//! use tgi_model::{BitWidths, ResourceKey};
//!
//! let text = r#"<I c="Buff" i="buff" n="buff_Example" s="42"></I>"#;
//! let inferred = infer_key(&infer_metadata(text), &BitWidths::default());
//! assert_eq!(inferred, ResourceKey::new(0x6017_E896, 0, 42));
//!
//! let declared = inferred.with_group(0x8000_0000);
//! let annotated = insert_override(text, &KeyOverrides::differing(&declared, &inferred)).unwrap();
//! assert!(annotated.starts_with("<!-- Group: 80000000 -->"));
//! ```

mod dbpf;
mod error;
mod extract;
mod simdata;
mod stbl;
mod summary;
mod tuning;
mod xml;

pub use dbpf::{
    decode_container, encode_container, is_container, ContainerRecord, COMPRESSION_DELETED,
    COMPRESSION_NONE, COMPRESSION_REFPACK, COMPRESSION_ZLIB,
};
pub use error::{CodecError, Result};
pub use extract::{
    decode_entry, decode_typed, extract, extract_loose, Decoded, ResourceEntry, ResourceFilter,
    TypedValue,
};
pub use simdata::{SimData, SimDataXml};
pub use stbl::{locale_label, StringEntry, StringTable, StringTableJson, StringTableJsonEntry};
pub use summary::{summarize, IndexEntry, IndexGroup, PackageIndex};
pub use tgi_model::key_from_filename;
pub use tuning::{
    infer_key, infer_metadata, insert_override, name_instance_id, rename_root, KeyOverrides,
    RenamedTuning, RootKind, TuningDocument, TuningMetadata,
};
