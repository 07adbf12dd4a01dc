//! In-memory compound-file fixtures for the integration tests.
//!
//! `CfbBuilder` lays out a minimal but sector-accurate compound file:
//! large streams on the FAT, small streams in a mini-stream addressed by a
//! mini-FAT, a flat directory, and the FAT reachable through the header
//! DIFAT. `fib_bytes` and `clx_bytes` assemble the Word structures the
//! document tests need.

#![allow(dead_code)]

const SECTOR_FREE: u32 = 0xFFFFFFFF;
const SECTOR_END: u32 = 0xFFFFFFFE;
const SECTOR_FAT: u32 = 0xFFFFFFFD;
const NOSTREAM: u32 = 0xFFFFFFFF;
const MINI_SECTOR: usize = 64;
const MINI_CUTOFF: usize = 4096;
const DIRENTRY: usize = 128;

/// Builds a compound file from named streams.
pub struct CfbBuilder {
    sector_size: usize,
    streams: Vec<(String, Vec<u8>)>,
}

impl CfbBuilder {
    pub fn new() -> CfbBuilder {
        CfbBuilder::with_sector_size(512)
    }

    pub fn with_sector_size(sector_size: usize) -> CfbBuilder {
        assert!(sector_size == 512 || sector_size == 4096);
        CfbBuilder {
            sector_size,
            streams: Vec::new(),
        }
    }

    pub fn stream(mut self, name: &str, data: &[u8]) -> CfbBuilder {
        self.streams.push((name.to_string(), data.to_vec()));
        self
    }

    /// Lay the file out and return its bytes.
    pub fn build(self) -> Vec<u8> {
        let ss = self.sector_size;
        let mut fat: Vec<u32> = Vec::new();

        // Chain `count` fresh sectors, returning the first index.
        fn alloc_chain(fat: &mut Vec<u32>, count: usize) -> u32 {
            if count == 0 {
                return SECTOR_END;
            }
            let start = fat.len() as u32;
            for i in 0..count {
                if i + 1 == count {
                    fat.push(SECTOR_END);
                } else {
                    fat.push(start + i as u32 + 1);
                }
            }
            start
        }

        let sectors_for = |len: usize, unit: usize| len.div_ceil(unit);

        // Mini-stream: pack every small stream as 64-byte mini sectors
        let mut ministream: Vec<u8> = Vec::new();
        let mut minifat: Vec<u32> = Vec::new();
        let mut placements: Vec<(String, u32, u64, bool)> = Vec::new(); // (name, start, size, is_mini)
        let mut large: Vec<(usize, Vec<u8>)> = Vec::new(); // (placement index, data)

        for (name, data) in &self.streams {
            if data.is_empty() {
                placements.push((name.clone(), SECTOR_END, 0, true));
            } else if data.len() < MINI_CUTOFF {
                let count = sectors_for(data.len(), MINI_SECTOR);
                let start = minifat.len() as u32;
                for i in 0..count {
                    if i + 1 == count {
                        minifat.push(SECTOR_END);
                    } else {
                        minifat.push(start + i as u32 + 1);
                    }
                }
                let mut padded = data.clone();
                padded.resize(count * MINI_SECTOR, 0);
                ministream.extend_from_slice(&padded);
                placements.push((name.clone(), start, data.len() as u64, true));
            } else {
                placements.push((name.clone(), 0, data.len() as u64, false));
                large.push((placements.len() - 1, data.clone()));
            }
        }

        // Sector payloads in allocation order: large streams, mini-stream,
        // mini-FAT, directory, FAT
        let mut payloads: Vec<(u32, Vec<u8>)> = Vec::new();

        for (index, data) in &large {
            let start = alloc_chain(&mut fat, sectors_for(data.len(), ss));
            placements[*index].1 = start;
            payloads.push((start, data.clone()));
        }

        let ministream_start = if ministream.is_empty() {
            SECTOR_END
        } else {
            let start = alloc_chain(&mut fat, sectors_for(ministream.len(), ss));
            payloads.push((start, ministream.clone()));
            start
        };

        let (minifat_start, minifat_sectors) = if minifat.is_empty() {
            (SECTOR_END, 0usize)
        } else {
            let mut bytes: Vec<u8> = Vec::with_capacity(minifat.len() * 4);
            for entry in &minifat {
                bytes.extend_from_slice(&entry.to_le_bytes());
            }
            let count = sectors_for(bytes.len(), ss);
            let start = alloc_chain(&mut fat, count);
            payloads.push((start, bytes));
            (start, count)
        };

        let directory = self.directory_bytes(&placements, ministream_start, ministream.len());
        let dir_sectors = sectors_for(directory.len(), ss);
        let dir_start = alloc_chain(&mut fat, dir_sectors);
        payloads.push((dir_start, directory));

        // FAT sectors are FAT entries themselves; fixed point over the count
        let entries_per_fat = ss / 4;
        let used = fat.len();
        let mut fat_sectors = 0usize;
        loop {
            let next = (used + fat_sectors).div_ceil(entries_per_fat);
            if next == fat_sectors {
                break;
            }
            fat_sectors = next;
        }
        assert!(fat_sectors <= 109, "fixture FAT exceeds the header DIFAT");
        let fat_start = fat.len() as u32;
        for _ in 0..fat_sectors {
            fat.push(SECTOR_FAT);
        }
        fat.resize(fat_sectors * entries_per_fat, SECTOR_FREE);

        let mut fat_bytes: Vec<u8> = Vec::with_capacity(fat.len() * 4);
        for entry in &fat {
            fat_bytes.extend_from_slice(&entry.to_le_bytes());
        }
        payloads.push((fat_start, fat_bytes));

        // Header, then every allocated sector at (index + 1) * sector size
        let total_sectors = fat_start as usize + fat_sectors;
        let mut file = vec![0u8; (total_sectors + 1) * ss];

        let header = self.header_bytes(
            fat_start,
            fat_sectors,
            dir_start,
            dir_sectors,
            minifat_start,
            minifat_sectors,
        );
        file[..512].copy_from_slice(&header);

        for (start, data) in payloads {
            let offset = (start as usize + 1) * ss;
            file[offset..offset + data.len()].copy_from_slice(&data);
        }

        file
    }

    fn header_bytes(
        &self,
        fat_start: u32,
        fat_sectors: usize,
        dir_start: u32,
        dir_sectors: usize,
        minifat_start: u32,
        minifat_sectors: usize,
    ) -> [u8; 512] {
        let mut h = [0u8; 512];
        h[0..8].copy_from_slice(b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1");
        let (shift, major) = if self.sector_size == 512 {
            (9u16, 3u16)
        } else {
            (12u16, 4u16)
        };
        h[24..26].copy_from_slice(&0x003Eu16.to_le_bytes()); // minor version
        h[26..28].copy_from_slice(&major.to_le_bytes());
        h[28..30].copy_from_slice(&0xFFFEu16.to_le_bytes()); // byte order
        h[30..32].copy_from_slice(&shift.to_le_bytes());
        h[32..34].copy_from_slice(&6u16.to_le_bytes());
        if self.sector_size == 4096 {
            h[40..44].copy_from_slice(&(dir_sectors as u32).to_le_bytes());
        }
        h[44..48].copy_from_slice(&(fat_sectors as u32).to_le_bytes());
        h[48..52].copy_from_slice(&dir_start.to_le_bytes());
        h[56..60].copy_from_slice(&(MINI_CUTOFF as u32).to_le_bytes());
        h[60..64].copy_from_slice(&minifat_start.to_le_bytes());
        h[64..68].copy_from_slice(&(minifat_sectors as u32).to_le_bytes());
        h[68..72].copy_from_slice(&SECTOR_END.to_le_bytes());
        h[72..76].copy_from_slice(&0u32.to_le_bytes());
        for i in 0..109 {
            let entry = if i < fat_sectors {
                fat_start + i as u32
            } else {
                SECTOR_FREE
            };
            h[76 + i * 4..80 + i * 4].copy_from_slice(&entry.to_le_bytes());
        }
        h
    }

    fn directory_bytes(
        &self,
        placements: &[(String, u32, u64, bool)],
        ministream_start: u32,
        ministream_len: usize,
    ) -> Vec<u8> {
        let entries = placements.len() + 1;
        let per_sector = self.sector_size / DIRENTRY;
        let padded = entries.div_ceil(per_sector) * per_sector;
        let mut dir = vec![0u8; padded * DIRENTRY];

        let first_child = if placements.is_empty() { NOSTREAM } else { 1 };
        write_dir_entry(
            &mut dir[0..DIRENTRY],
            "Root Entry",
            5,
            first_child,
            ministream_start,
            ministream_len as u64,
        );
        for (i, (name, start, size, _)) in placements.iter().enumerate() {
            let offset = (i + 1) * DIRENTRY;
            write_dir_entry(&mut dir[offset..offset + DIRENTRY], name, 2, NOSTREAM, *start, *size);
        }
        dir
    }
}

fn write_dir_entry(entry: &mut [u8], name: &str, kind: u8, child: u32, start: u32, size: u64) {
    let units: Vec<u16> = name.encode_utf16().collect();
    assert!(units.len() <= 31);
    for (i, unit) in units.iter().enumerate() {
        entry[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }
    entry[64..66].copy_from_slice(&((units.len() as u16 + 1) * 2).to_le_bytes());
    entry[66] = kind;
    entry[67] = 1; // black
    entry[68..72].copy_from_slice(&NOSTREAM.to_le_bytes());
    entry[72..76].copy_from_slice(&NOSTREAM.to_le_bytes());
    entry[76..80].copy_from_slice(&child.to_le_bytes());
    entry[116..120].copy_from_slice(&start.to_le_bytes());
    entry[120..128].copy_from_slice(&size.to_le_bytes());
}

/// Options for a synthetic File Information Block.
pub struct FibOptions {
    pub flags1: u16,
    pub l_key: u32,
    /// main, footnote, header, annotation, endnote, textbox, header textbox
    pub ccp: [u32; 7],
    pub fc_clx: u32,
    pub lcb_clx: u32,
}

impl Default for FibOptions {
    fn default() -> FibOptions {
        FibOptions {
            flags1: 0x0200, // 1Table
            l_key: 0,
            ccp: [0; 7],
            fc_clx: 0,
            lcb_clx: 0,
        }
    }
}

/// Assemble a FIB: 32-byte base, empty fibRgW, 22-value fibRgLw, and a
/// 34-pair fibRgFcLcb (the minimum that reaches the piece-table locator).
pub fn fib_bytes(opts: &FibOptions) -> Vec<u8> {
    let mut fib = vec![0u8; 32];
    fib[0..2].copy_from_slice(&0xA5ECu16.to_le_bytes());
    fib[2..4].copy_from_slice(&0x00C1u16.to_le_bytes());
    fib[6..8].copy_from_slice(&0x0409u16.to_le_bytes()); // lid
    fib[10..12].copy_from_slice(&opts.flags1.to_le_bytes());
    fib[14..18].copy_from_slice(&opts.l_key.to_le_bytes());

    fib.extend_from_slice(&0u16.to_le_bytes()); // csw

    fib.extend_from_slice(&22u16.to_le_bytes()); // cslw
    let mut rg_lw = vec![0u8; 88];
    for (i, ccp) in opts.ccp.iter().enumerate() {
        // ccpText at +12, then every count but with a reserved slot at +24
        let offset = if i < 3 { 12 + i * 4 } else { 16 + i * 4 };
        rg_lw[offset..offset + 4].copy_from_slice(&ccp.to_le_bytes());
    }
    fib.extend_from_slice(&rg_lw);

    fib.extend_from_slice(&34u16.to_le_bytes()); // cbRgFcLcb
    let mut blob = vec![0u8; 34 * 8];
    blob[264..268].copy_from_slice(&opts.fc_clx.to_le_bytes());
    blob[268..272].copy_from_slice(&opts.lcb_clx.to_le_bytes());
    fib.extend_from_slice(&blob);

    fib
}

/// Assemble a CLX holding one PlcPcd from CPs and (flags, fc_packed) pairs.
pub fn clx_bytes(cps: &[u32], pcds: &[(u16, u32)]) -> Vec<u8> {
    assert_eq!(cps.len(), pcds.len() + 1);
    let mut payload = Vec::new();
    for &cp in cps {
        payload.extend_from_slice(&cp.to_le_bytes());
    }
    for &(flags, fc) in pcds {
        payload.extend_from_slice(&flags.to_le_bytes());
        payload.extend_from_slice(&fc.to_le_bytes());
        payload.extend_from_slice(&0u16.to_le_bytes());
    }
    let mut clx = vec![0x02];
    clx.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    clx.extend_from_slice(&payload);
    clx
}

/// UTF-16LE bytes of a string.
pub fn utf16le(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// Assemble a single-set property stream from `(id, type, payload)` rows.
pub fn property_stream(props: &[(u32, u16, Vec<u8>)]) -> Vec<u8> {
    let mut stream = Vec::new();
    stream.extend_from_slice(&0xFFFEu16.to_le_bytes());
    stream.extend_from_slice(&0u16.to_le_bytes());
    stream.extend_from_slice(&2u32.to_le_bytes()); // OS version
    stream.extend_from_slice(&[0u8; 16]); // CLSID
    stream.extend_from_slice(&1u32.to_le_bytes());
    stream.extend_from_slice(&[0u8; 16]); // FMTID
    stream.extend_from_slice(&48u32.to_le_bytes());

    let header_len = 8 + props.len() * 8;
    let mut directory = Vec::new();
    let mut body = Vec::new();
    let mut value_offset = header_len;
    for (id, prop_type, payload) in props {
        directory.extend_from_slice(&id.to_le_bytes());
        directory.extend_from_slice(&(value_offset as u32).to_le_bytes());
        body.extend_from_slice(&prop_type.to_le_bytes());
        body.extend_from_slice(&[0u8; 2]);
        body.extend_from_slice(payload);
        value_offset += 4 + payload.len();
    }

    stream.extend_from_slice(&((header_len + body.len()) as u32).to_le_bytes());
    stream.extend_from_slice(&(props.len() as u32).to_le_bytes());
    stream.extend_from_slice(&directory);
    stream.extend_from_slice(&body);
    stream
}

/// LPWSTR payload: character count including the terminator, then UTF-16LE.
pub fn lpwstr(text: &str) -> Vec<u8> {
    let units: Vec<u16> = text.encode_utf16().chain(std::iter::once(0)).collect();
    let mut payload = Vec::new();
    payload.extend_from_slice(&(units.len() as u32).to_le_bytes());
    for unit in units {
        payload.extend_from_slice(&unit.to_le_bytes());
    }
    payload
}

/// LPSTR payload: byte length including the terminator, then the bytes.
pub fn lpstr(text: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(text.len() as u32 + 1).to_le_bytes());
    payload.extend_from_slice(text.as_bytes());
    payload.push(0);
    payload
}
