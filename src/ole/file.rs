use super::binary::{parse_utf16le_string, read_u16_le, read_u32_le};
use super::consts::*;
use std::io::{self, Read, Seek, SeekFrom};
use thiserror::Error;
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// Raw compound-file directory entry (128 bytes, on-disk layout).
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawDirectoryEntry {
    /// Entry name in UTF-16LE (64 bytes, null-padded)
    name: [u8; 64],
    /// Length of name in bytes (including null terminator)
    name_len: U16<LE>,
    /// Entry type (1 = storage, 2 = stream, 5 = root)
    entry_type: u8,
    /// Node color (0 = red, 1 = black)
    node_color: u8,
    /// Left sibling SID
    sid_left: U32<LE>,
    /// Right sibling SID
    sid_right: U32<LE>,
    /// Child SID
    sid_child: U32<LE>,
    /// CLSID (16 bytes)
    clsid: [u8; 16],
    /// State bits
    state_bits: U32<LE>,
    /// Creation time (FILETIME)
    creation_time: U64<LE>,
    /// Modified time (FILETIME)
    modified_time: U64<LE>,
    /// Starting sector
    start_sector: U32<LE>,
    /// Stream size
    stream_size: U64<LE>,
}

/// Error types for compound-file parsing.
#[derive(Debug, Error)]
pub enum OleError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("not a compound file")]
    NotCompoundFile,
    #[error("input truncated: {0}")]
    Truncated(String),
    #[error("corrupted compound file: {0}")]
    Corrupted(String),
    #[error("stream not found: {0:?}")]
    StreamNotFound(String),
}

/// A directory entry (stream or storage) of an open compound file.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Storage ID (index in the directory)
    pub sid: u32,
    /// Entry name (UTF-16 decoded)
    pub name: String,
    /// Entry type (stream, storage, root)
    pub entry_type: u8,
    /// Left sibling in the directory tree, or NOSTREAM
    pub sid_left: u32,
    /// Right sibling in the directory tree, or NOSTREAM
    pub sid_right: u32,
    /// First child in the directory tree, or NOSTREAM
    pub sid_child: u32,
    /// First sector of the stream
    pub start_sector: u32,
    /// Size of the stream in bytes
    pub size: u64,
}

/// Compound-file (OLE2/CFB) reader.
///
/// Opens a random-access byte source, reconstructs the DIFAT, FAT, directory
/// and mini-FAT, and exposes named streams as byte vectors. Sector chains are
/// walked with a step bound so that a corrupted, cyclic FAT fails with
/// [`OleError::Corrupted`] instead of looping.
#[derive(Debug)]
pub struct OleFile<R: Read + Seek> {
    reader: R,
    file_size: u64,
    /// Sector size (512 or 4096 bytes)
    sector_size: usize,
    /// Mini sector size (64 bytes)
    mini_sector_size: usize,
    /// Streams below this size live in the mini-stream
    mini_stream_cutoff: u32,
    /// Maps a sector index to the next sector in its chain
    fat: Vec<u32>,
    /// Allocation table for the mini-stream
    minifat: Vec<u32>,
    /// All directory entries, indexed by SID
    dir_entries: Vec<DirectoryEntry>,
    /// Contents of the root entry's stream, loaded on first mini read
    ministream: Option<Vec<u8>>,
}

impl<R: Read + Seek> OleFile<R> {
    /// Open and parse a compound file from a reader.
    pub fn open(mut reader: R) -> Result<Self, OleError> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        if file_size < HEADER_SIZE as u64 {
            // Too short to even hold the header; distinguish an obvious
            // non-CFB prefix from a cut-off file.
            let mut prefix = vec![0u8; file_size as usize];
            reader.read_exact(&mut prefix)?;
            if prefix.len() >= 8 && &prefix[0..8] == MAGIC {
                return Err(OleError::Truncated("header".to_string()));
            }
            return Err(OleError::NotCompoundFile);
        }

        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header)?;

        if &header[0..8] != MAGIC {
            return Err(OleError::NotCompoundFile);
        }

        let sector_shift = read_u16_le(&header, 30)?;
        let mini_sector_shift = read_u16_le(&header, 32)?;
        let num_fat_sectors = read_u32_le(&header, 44)?;
        let first_dir_sector = read_u32_le(&header, 48)?;
        let mini_stream_cutoff = read_u32_le(&header, 56)?;
        let first_minifat_sector = read_u32_le(&header, 60)?;
        let num_minifat_sectors = read_u32_le(&header, 64)?;
        let first_difat_sector = read_u32_le(&header, 68)?;
        let num_difat_sectors = read_u32_le(&header, 72)?;

        if sector_shift != 9 && sector_shift != 12 {
            return Err(OleError::Corrupted(format!(
                "invalid sector shift {}",
                sector_shift
            )));
        }
        if mini_sector_shift != 6 {
            return Err(OleError::Corrupted(format!(
                "invalid mini sector shift {}",
                mini_sector_shift
            )));
        }

        let mut ole = OleFile {
            reader,
            file_size,
            sector_size: 1usize << sector_shift,
            mini_sector_size: 1usize << mini_sector_shift,
            mini_stream_cutoff,
            fat: Vec::new(),
            minifat: Vec::new(),
            dir_entries: Vec::new(),
            ministream: None,
        };

        ole.load_fat(
            &header,
            num_fat_sectors,
            first_difat_sector,
            num_difat_sectors,
        )?;
        ole.load_directory(first_dir_sector)?;
        if num_minifat_sectors > 0 && first_minifat_sector <= MAXREGSECT {
            ole.load_minifat(first_minifat_sector)?;
        }

        Ok(ole)
    }

    /// Total size of the underlying source in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Sector size of this file (512 or 4096 bytes).
    pub fn sector_size(&self) -> usize {
        self.sector_size
    }

    /// Build the FAT by collecting FAT sector indices from the DIFAT.
    ///
    /// The first 109 DIFAT entries sit in the header; any further entries
    /// live in DIFAT sectors chained through their trailing u32.
    fn load_fat(
        &mut self,
        header: &[u8; HEADER_SIZE],
        num_fat_sectors: u32,
        first_difat_sector: u32,
        num_difat_sectors: u32,
    ) -> Result<(), OleError> {
        let mut fat_sectors: Vec<u32> = Vec::with_capacity(num_fat_sectors as usize);

        for i in 0..HEADER_DIFAT_ENTRIES {
            if fat_sectors.len() >= num_fat_sectors as usize {
                break;
            }
            let sector = read_u32_le(header, 76 + i * 4)?;
            if sector > MAXREGSECT {
                continue;
            }
            fat_sectors.push(sector);
        }

        // Walk the DIFAT sector chain for files with more than 109 FAT
        // sectors. Each DIFAT sector holds (sector_size/4 - 1) entries plus
        // the index of the next DIFAT sector.
        let entries_per_difat = self.sector_size / 4 - 1;
        let mut difat_sector = first_difat_sector;
        let mut walked = 0u32;
        while difat_sector <= MAXREGSECT && fat_sectors.len() < num_fat_sectors as usize {
            if walked >= num_difat_sectors.saturating_add(1) {
                return Err(OleError::Corrupted("DIFAT chain too long".to_string()));
            }
            walked += 1;
            let sector_data = self.read_sector(difat_sector)?;
            for i in 0..entries_per_difat {
                if fat_sectors.len() >= num_fat_sectors as usize {
                    break;
                }
                let entry = read_u32_le(&sector_data, i * 4)?;
                if entry > MAXREGSECT {
                    continue;
                }
                fat_sectors.push(entry);
            }
            difat_sector = read_u32_le(&sector_data, entries_per_difat * 4)?;
        }

        let entries_per_sector = self.sector_size / 4;
        self.fat.reserve(fat_sectors.len() * entries_per_sector);
        for &sector_id in &fat_sectors {
            let sector_data = self.read_sector(sector_id)?;
            for i in 0..entries_per_sector {
                self.fat.push(read_u32_le(&sector_data, i * 4)?);
            }
        }

        Ok(())
    }

    /// Load the mini-FAT, itself stored as a regular FAT chain.
    fn load_minifat(&mut self, first_minifat_sector: u32) -> Result<(), OleError> {
        let minifat_data = self.read_fat_chain(first_minifat_sector)?;
        let entries = minifat_data.len() / 4;
        self.minifat.reserve(entries);
        for i in 0..entries {
            self.minifat.push(read_u32_le(&minifat_data, i * 4)?);
        }
        Ok(())
    }

    /// Load and parse all directory entries from the directory chain.
    fn load_directory(&mut self, first_dir_sector: u32) -> Result<(), OleError> {
        let dir_data = self.read_fat_chain(first_dir_sector)?;
        let num_entries = dir_data.len() / DIRENTRY_SIZE;
        if num_entries == 0 {
            return Err(OleError::Corrupted("empty directory".to_string()));
        }

        self.dir_entries.reserve(num_entries);
        for sid in 0..num_entries {
            let offset = sid * DIRENTRY_SIZE;
            let entry = self.parse_directory_entry(
                &dir_data[offset..offset + DIRENTRY_SIZE],
                sid as u32,
            )?;
            self.dir_entries.push(entry);
        }

        if self.dir_entries[0].entry_type != STGTY_ROOT {
            return Err(OleError::Corrupted(
                "first directory entry is not the root".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse a single 128-byte directory entry.
    fn parse_directory_entry(&self, data: &[u8], sid: u32) -> Result<DirectoryEntry, OleError> {
        let raw = RawDirectoryEntry::read_from_bytes(data)
            .map_err(|_| OleError::Corrupted("malformed directory entry".to_string()))?;

        // name_len counts bytes including the UTF-16 null terminator
        let name_len = (raw.name_len.get() as usize).min(64);
        let name = parse_utf16le_string(&raw.name[..name_len]);

        // With 512-byte sectors only the low half of the size field is valid
        let size = if self.sector_size == 512 {
            raw.stream_size.get() & 0xFFFFFFFF
        } else {
            raw.stream_size.get()
        };

        Ok(DirectoryEntry {
            sid,
            name,
            entry_type: raw.entry_type,
            sid_left: raw.sid_left.get(),
            sid_right: raw.sid_right.get(),
            sid_child: raw.sid_child.get(),
            start_sector: raw.start_sector.get(),
            size,
        })
    }

    /// Read one sector. Sector `n` starts at byte `(n + 1) * sector_size`;
    /// the header occupies the position of sector -1.
    fn read_sector(&mut self, sector_id: u32) -> Result<Vec<u8>, OleError> {
        if sector_id > MAXREGSECT {
            return Err(OleError::Corrupted(format!(
                "sentinel sector 0x{:08X} used as a sector index",
                sector_id
            )));
        }
        let position = ((sector_id as u64) + 1) * (self.sector_size as u64);
        if position + self.sector_size as u64 > self.file_size {
            return Err(OleError::Truncated(format!(
                "sector {} extends beyond end of input",
                sector_id
            )));
        }
        self.reader.seek(SeekFrom::Start(position))?;
        let mut buffer = vec![0u8; self.sector_size];
        self.reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Concatenate a FAT chain starting at `start_sector`.
    ///
    /// The walk is bounded by the number of FAT entries, which any valid
    /// chain cannot exceed; hitting the bound means the chain is cyclic.
    fn read_fat_chain(&mut self, start_sector: u32) -> Result<Vec<u8>, OleError> {
        let mut data = Vec::new();
        let mut sector = start_sector;
        let mut steps = 0usize;

        while sector != ENDOFCHAIN {
            if sector as usize >= self.fat.len() {
                return Err(OleError::Corrupted(format!(
                    "sector {} outside the FAT",
                    sector
                )));
            }
            if steps >= self.fat.len() {
                return Err(OleError::Corrupted("cyclic FAT chain".to_string()));
            }
            steps += 1;
            let sector_data = self.read_sector(sector)?;
            data.extend_from_slice(&sector_data);
            sector = self.fat[sector as usize];
        }

        Ok(data)
    }

    /// Concatenate a mini-FAT chain, truncated to `size` bytes.
    fn read_minifat_chain(&mut self, start_sector: u32, size: u64) -> Result<Vec<u8>, OleError> {
        if self.ministream.is_none() {
            let root = &self.dir_entries[0];
            let (root_start, root_size) = (root.start_sector, root.size);
            let mut ministream = self.read_fat_chain(root_start)?;
            ministream.truncate(root_size as usize);
            self.ministream = Some(ministream);
        }
        let ministream = self.ministream.as_ref().unwrap();

        let mut data = Vec::with_capacity(size as usize);
        let mut sector = start_sector;
        let mut steps = 0usize;

        while sector != ENDOFCHAIN {
            if sector as usize >= self.minifat.len() {
                return Err(OleError::Corrupted(format!(
                    "mini sector {} outside the mini-FAT",
                    sector
                )));
            }
            if steps >= self.minifat.len() {
                return Err(OleError::Corrupted("cyclic mini-FAT chain".to_string()));
            }
            steps += 1;
            let position = (sector as usize) * self.mini_sector_size;
            if position + self.mini_sector_size > ministream.len() {
                return Err(OleError::Truncated(format!(
                    "mini sector {} extends beyond the mini-stream",
                    sector
                )));
            }
            data.extend_from_slice(&ministream[position..position + self.mini_sector_size]);
            sector = self.minifat[sector as usize];
        }

        data.truncate(size as usize);
        Ok(data)
    }

    /// Find a stream entry by name, comparing case-insensitively after
    /// stripping the UTF-16 null terminator.
    fn find_stream(&self, name: &str) -> Option<&DirectoryEntry> {
        let wanted = name.to_lowercase();
        self.dir_entries
            .iter()
            .find(|e| e.entry_type == STGTY_STREAM && e.name.to_lowercase() == wanted)
    }

    /// Check whether a stream with the given name exists.
    pub fn exists(&self, name: &str) -> bool {
        self.find_stream(name).is_some()
    }

    /// Names of all streams in the file, in directory order.
    pub fn list_streams(&self) -> Vec<String> {
        self.dir_entries
            .iter()
            .filter(|e| e.entry_type == STGTY_STREAM)
            .map(|e| e.name.clone())
            .collect()
    }

    /// Directory entries of the file, indexed by SID.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.dir_entries
    }

    /// Read a named stream in full.
    ///
    /// Streams smaller than the mini-stream cutoff are read through the
    /// mini-FAT out of the root entry's stream; everything else follows the
    /// regular FAT.
    pub fn open_stream(&mut self, name: &str) -> Result<Vec<u8>, OleError> {
        let entry = self
            .find_stream(name)
            .ok_or_else(|| OleError::StreamNotFound(name.to_string()))?;
        let (start_sector, size) = (entry.start_sector, entry.size);

        if size == 0 {
            return Ok(Vec::new());
        }

        let root_size = self.dir_entries[0].size;
        if size < self.mini_stream_cutoff as u64 && root_size > 0 {
            self.read_minifat_chain(start_sector, size)
        } else {
            let mut data = self.read_fat_chain(start_sector)?;
            if (data.len() as u64) < size {
                return Err(OleError::Truncated(format!(
                    "stream {:?} chain shorter than its recorded size",
                    name
                )));
            }
            data.truncate(size as usize);
            Ok(data)
        }
    }
}

/// Check whether a byte buffer starts like a compound file.
pub fn is_cfb_file(data: &[u8]) -> bool {
    data.len() >= MINIMAL_CFB_SIZE && &data[0..8] == MAGIC
}
