/// Magic bytes that should be at the beginning of every compound file
pub const MAGIC: &[u8; 8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Minimal size of an empty compound file with 512-byte sectors (1536 bytes)
pub const MINIMAL_CFB_SIZE: usize = 1536;

/// Size of a directory entry in bytes
pub const DIRENTRY_SIZE: usize = 128;

/// Size of the compound-file header in bytes
pub const HEADER_SIZE: usize = 512;

/// Number of DIFAT entries held directly in the header
pub const HEADER_DIFAT_ENTRIES: usize = 109;

// Sector IDs (from AAF specifications)
/// Maximum regular sector ID
pub const MAXREGSECT: u32 = 0xFFFFFFFA; // -6
/// Denotes a DIFAT sector in a FAT
pub const DIFSECT: u32 = 0xFFFFFFFC; // -4
/// Denotes a FAT sector in a FAT
pub const FATSECT: u32 = 0xFFFFFFFD; // -3
/// End of a virtual stream chain
pub const ENDOFCHAIN: u32 = 0xFFFFFFFE; // -2
/// Unallocated sector
pub const FREESECT: u32 = 0xFFFFFFFF; // -1

// Directory Entry IDs (from AAF specifications)
/// Unallocated directory entry
pub const NOSTREAM: u32 = 0xFFFFFFFF; // -1

// Object types in storage (from AAF specifications)
/// Empty directory entry
pub const STGTY_EMPTY: u8 = 0;
/// Element is a storage object
pub const STGTY_STORAGE: u8 = 1;
/// Element is a stream object
pub const STGTY_STREAM: u8 = 2;
/// Element is a root storage
pub const STGTY_ROOT: u8 = 5;

// Property types used by the summary-information streams
pub const VT_EMPTY: u16 = 0x0000;
pub const VT_NULL: u16 = 0x0001;
pub const VT_I2: u16 = 0x0002;
pub const VT_I4: u16 = 0x0003;
pub const VT_BOOL: u16 = 0x000B;
pub const VT_I8: u16 = 0x0014;
pub const VT_LPSTR: u16 = 0x001E;
pub const VT_LPWSTR: u16 = 0x001F;
pub const VT_FILETIME: u16 = 0x0040;
pub const VT_BLOB: u16 = 0x0041;
pub const VT_CF: u16 = 0x0047;

/// Stream name of the summary-information property set.
/// The leading byte is U+0005, part of the name proper.
pub const SUMMARY_INFORMATION: &str = "\u{0005}SummaryInformation";

/// Stream name of the document-summary-information property set.
pub const DOCUMENT_SUMMARY_INFORMATION: &str = "\u{0005}DocumentSummaryInformation";
