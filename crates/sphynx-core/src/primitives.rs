//! # Primitives
//!
//! Fixed constants for the Sphynx core: on-disk format markers, file names,
//! hashing domain tags and safety limits. These are compiled in and never
//! change at runtime.

// =============================================================================
// ON-DISK FORMAT
// =============================================================================

/// Magic bytes at the start of every manifest and row file.
pub const MAGIC_BYTES: &[u8; 4] = b"SPHX";

/// Current row/manifest format version.
///
/// Increment this when making breaking changes to the on-disk format.
pub const FORMAT_VERSION: u8 = 1;

/// Size of the `MAGIC_BYTES + FORMAT_VERSION` header.
pub const HEADER_LEN: usize = 5;

/// Manifest file inside an entity directory.
pub const MANIFEST_FILE: &str = "manifest";

/// Row file inside an entity directory.
pub const ROWS_FILE: &str = "rows";

/// Marker written last; a directory without it is treated as absent.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Prefix of in-progress write directories under a data root.
pub const STAGING_PREFIX: &str = ".staging-";

/// Default catalog database file name under `data_dir`.
pub const CATALOG_FILE: &str = "catalog.redb";

// =============================================================================
// ADDRESSING
// =============================================================================

/// Domain tag for operation instance guids.
pub const INSTANCE_DOMAIN: &[u8] = b"sphynx.instance.v1";

/// Domain tag for output entity guids.
pub const OUTPUT_DOMAIN: &[u8] = b"sphynx.output.v1";

// =============================================================================
// SAFETY LIMITS
// =============================================================================

/// Maximum size of a single row file (2 GiB).
///
/// Checked before reading, so a corrupt or hostile file cannot force an
/// unbounded allocation.
pub const MAX_ROW_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Maximum size of a manifest file.
pub const MAX_MANIFEST_SIZE: u64 = 64 * 1024;

/// Maximum row count a manifest may declare.
pub const MAX_ROW_COUNT: u64 = 1 << 32;
