use super::error::{DocError, Result};
use super::fib::{Fib, Subdocument};
use super::piece_table::PieceTable;
use super::text::{materialize, take_code_units};
use crate::crypto::{EncryptionHeader, Rc4LegacyKey};
use crate::ole::consts::{DOCUMENT_SUMMARY_INFORMATION, SUMMARY_INFORMATION};
use crate::ole::{metadata_from_streams, Metadata, OleError, OleFile};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

/// Decryption state for an encrypted document: the verified key and the
/// size of the unencrypted header prefix of the table stream.
struct Decryption {
    key: Rc4LegacyKey,
    table_prefix: u32,
}

/// An open Word document.
///
/// Construction reads and caches every stream the queries need, so the value
/// is immutable afterwards: [`text`](Self::text) and
/// [`metadata`](Self::metadata) take `&self` and may be called concurrently.
///
/// # Examples
///
/// ```rust,no_run
/// use longan::Document;
///
/// let doc = Document::open("report.doc")?;
/// println!("{}", doc.text()?);
/// let meta = doc.metadata();
/// println!("title: {:?}", meta.title);
/// # Ok::<(), longan::DocError>(())
/// ```
pub struct Document {
    fib: Fib,
    word_document: Vec<u8>,
    table_stream: Option<Vec<u8>>,
    summary: Option<Vec<u8>>,
    doc_summary: Option<Vec<u8>>,
    decryption: Option<Decryption>,
}

impl Document {
    /// Open a document from a file path.
    ///
    /// Fails with [`DocError::EncryptedNoPassword`] if the document is
    /// encrypted; use [`open_with_password`](Self::open_with_password) then.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Document> {
        let file = open_file(path.as_ref())?;
        Document::from_reader(file)
    }

    /// Open an encrypted (or plain) document from a file path with a
    /// password.
    pub fn open_with_password<P: AsRef<Path>>(path: P, password: &str) -> Result<Document> {
        let file = open_file(path.as_ref())?;
        Document::from_reader_with_password(file, password)
    }

    /// Open a document from any `Read + Seek` source, for example a
    /// `Cursor` over an in-memory buffer.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Document> {
        Document::build(reader, None)
    }

    /// Open a document from any `Read + Seek` source with a password.
    pub fn from_reader_with_password<R: Read + Seek>(
        reader: R,
        password: &str,
    ) -> Result<Document> {
        Document::build(reader, Some(password))
    }

    fn build<R: Read + Seek>(reader: R, password: Option<&str>) -> Result<Document> {
        let mut ole = OleFile::open(reader)?;

        let word_document = match ole.open_stream("WordDocument") {
            Ok(data) => data,
            Err(OleError::StreamNotFound(_)) => return Err(DocError::NotWordDocument),
            Err(err) => return Err(err.into()),
        };
        let fib = Fib::parse(&word_document)?;

        let table_stream = read_table_stream(&mut ole, &fib)?;
        let summary = ole.open_stream(SUMMARY_INFORMATION).ok();
        let doc_summary = ole.open_stream(DOCUMENT_SUMMARY_INFORMATION).ok();

        let decryption = if fib.is_encrypted() {
            Some(setup_decryption(&fib, table_stream.as_deref(), password)?)
        } else {
            None
        };

        Ok(Document {
            fib,
            word_document,
            table_stream,
            summary,
            doc_summary,
            decryption,
        })
    }

    /// Whether the document is encrypted. A successfully opened encrypted
    /// document already has its password verified.
    #[inline]
    pub fn is_encrypted(&self) -> bool {
        self.fib.is_encrypted()
    }

    /// File format version (`nFib`).
    #[inline]
    pub fn version(&self) -> u16 {
        self.fib.version()
    }

    /// Human-readable name of the Word version that wrote the file.
    #[inline]
    pub fn version_name(&self) -> &'static str {
        self.fib.version_name()
    }

    /// The parsed File Information Block.
    #[inline]
    pub fn fib(&self) -> &Fib {
        &self.fib
    }

    /// Extract the document text: every subdocument in CP order (main body,
    /// then footnotes, headers, annotations, endnotes, textboxes, header
    /// textboxes). Control characters are preserved.
    ///
    /// Returns an empty string when the document has no piece table or no
    /// characters.
    pub fn text(&self) -> Result<String> {
        let (fc_clx, lcb_clx) = self.fib.clx_location();
        if lcb_clx == 0 || self.fib.text_char_count() == 0 {
            return Ok(String::new());
        }

        let table = self
            .table_stream
            .as_deref()
            .ok_or_else(|| OleError::StreamNotFound(self.fib.table_stream_name().to_string()))?;

        let clx = self.read_clx(table, fc_clx as usize, lcb_clx as usize)?;
        let piece_table = PieceTable::parse_clx(&clx)?;

        if piece_table.total_cps() as u64 != self.fib.text_char_count() {
            log::warn!(
                "piece table covers {} characters, FIB counts {}",
                piece_table.total_cps(),
                self.fib.text_char_count()
            );
        }

        materialize(
            &piece_table,
            &self.word_document,
            self.decryption.as_ref().map(|d| &d.key),
        )
    }

    /// Extract only the main body: the first `ccpText` characters of
    /// [`text`](Self::text).
    pub fn body_text(&self) -> Result<String> {
        let full = self.text()?;
        Ok(take_code_units(
            &full,
            self.fib.char_count(Subdocument::Main),
        ))
    }

    /// Extract document properties from the summary-information streams.
    ///
    /// Never fails: missing streams, malformed property sets and
    /// undecodable properties leave the affected fields unset.
    pub fn metadata(&self) -> Metadata {
        metadata_from_streams(self.summary.as_deref(), self.doc_summary.as_deref())
    }

    /// Close the document, dropping the cached streams.
    pub fn close(self) {}

    /// Slice the CLX out of the table stream, decrypting it when the
    /// document cipher applies. In an encrypted document `fcClx` addresses
    /// the encrypted region that follows the header prefix.
    fn read_clx(&self, table: &[u8], fc_clx: usize, lcb_clx: usize) -> Result<Vec<u8>> {
        match &self.decryption {
            None => {
                let end = fc_clx + lcb_clx;
                if end > table.len() {
                    return Err(DocError::Truncated(format!(
                        "CLX at {}..{} outside the {}-byte table stream",
                        fc_clx,
                        end,
                        table.len()
                    )));
                }
                Ok(table[fc_clx..end].to_vec())
            }
            Some(decryption) => {
                let prefix = decryption.table_prefix as usize;
                let start = prefix + fc_clx;
                let end = start + lcb_clx;
                if end > table.len() {
                    return Err(DocError::Truncated(format!(
                        "encrypted CLX at {}..{} outside the {}-byte table stream",
                        start,
                        end,
                        table.len()
                    )));
                }
                let mut clx = table[start..end].to_vec();
                decryption.key.apply_at(fc_clx as u64, &mut clx);
                Ok(clx)
            }
        }
    }
}

/// Open a path, mapping a missing file onto its own error kind.
fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            DocError::FileNotFound(path.display().to_string())
        } else {
            DocError::Io(err)
        }
    })
}

/// Read the FIB-selected table stream, falling back to the sibling name
/// when it is absent. Some producers set `fWhichTblStm` without writing the
/// matching stream.
fn read_table_stream<R: Read + Seek>(ole: &mut OleFile<R>, fib: &Fib) -> Result<Option<Vec<u8>>> {
    let primary = fib.table_stream_name();
    match ole.open_stream(primary) {
        Ok(data) => Ok(Some(data)),
        Err(OleError::StreamNotFound(_)) => {
            let sibling = if primary == "0Table" { "1Table" } else { "0Table" };
            match ole.open_stream(sibling) {
                Ok(data) => {
                    log::warn!("table stream {:?} missing, using {:?}", primary, sibling);
                    Ok(Some(data))
                }
                Err(OleError::StreamNotFound(_)) => Ok(None),
                Err(err) => Err(err.into()),
            }
        }
        Err(err) => Err(err.into()),
    }
}

/// Parse the encryption header and verify the password, producing the
/// decryption state.
fn setup_decryption(
    fib: &Fib,
    table_stream: Option<&[u8]>,
    password: Option<&str>,
) -> Result<Decryption> {
    if fib.is_xor_obfuscated() {
        return Err(DocError::UnsupportedCipher("XOR obfuscation".to_string()));
    }
    let password = password.ok_or(DocError::EncryptedNoPassword)?;
    let table = table_stream.ok_or_else(|| {
        DocError::MalformedEncryptionHeader("encrypted document has no table stream".to_string())
    })?;

    let header = EncryptionHeader::parse(table)?;
    let key = header.password_key(password)?;

    let table_prefix = fib.l_key();
    if table_prefix as usize > table.len() {
        return Err(DocError::MalformedEncryptionHeader(format!(
            "header prefix of {} bytes exceeds the {}-byte table stream",
            table_prefix,
            table.len()
        )));
    }

    Ok(Decryption { key, table_prefix })
}
