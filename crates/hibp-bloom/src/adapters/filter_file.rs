//! Binary filter file codec
//!
//! Layout (little-endian, header in bincode fixed-int encoding):
//!
//! ```text
//! +---------------------------+
//! | magic          [u8; 8]    |  b"HIBPBLM\0"
//! | format_version u16        |
//! | hash_scheme    u16        |
//! | key_length     u32        |
//! | hash_count     u32        |  k
//! | size_bits      u64        |  m
//! | items          u64        |  n
//! | target_fpr     f64        |
//! | payload_len    u64        |  ceil(m / 8)
//! +---------------------------+  52 bytes
//! | payload        [u8]       |  bit i = byte i/8, bit i%8
//! +---------------------------+
//! | checksum       u32        |  CRC-32 of everything above
//! +---------------------------+
//! ```
//!
//! Writes go to `<output>.partial`, are synced, then renamed into place.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::hash_functions::HASH_SCHEME_MURMUR3_DOUBLE;
use crate::domain::BloomFilter;
use crate::error::CodecError;
use crate::ports::FilterStore;

/// File magic
pub const FILTER_MAGIC: [u8; 8] = *b"HIBPBLM\0";

/// Current file format version
pub const FORMAT_VERSION: u16 = 1;

/// Encoded header size in bytes
pub const HEADER_LEN: u64 = 52;

const CHECKSUM_LEN: u64 = 4;

/// Suffix of the in-progress file next to the destination
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Fixed-size header preceding the bit array
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterHeader {
    pub magic: [u8; 8],
    pub format_version: u16,
    pub hash_scheme: u16,
    pub key_length: u32,
    pub hash_count: u32,
    pub size_bits: u64,
    pub items: u64,
    pub target_fpr: f64,
    pub payload_len: u64,
}

impl FilterHeader {
    fn for_filter(filter: &BloomFilter) -> Result<Self, CodecError> {
        let key_length = u32::try_from(filter.key_length()).map_err(|_| {
            CodecError::SerializationError(format!(
                "key length {} does not fit the header",
                filter.key_length()
            ))
        })?;

        Ok(Self {
            magic: FILTER_MAGIC,
            format_version: FORMAT_VERSION,
            hash_scheme: filter.hash_scheme(),
            key_length,
            hash_count: filter.hash_count(),
            size_bits: filter.size_bits(),
            items: filter.elements_inserted(),
            target_fpr: filter.target_fpr(),
            payload_len: filter.as_bytes().len() as u64,
        })
    }

    /// Check everything the header can say about itself
    fn validate(&self) -> Result<(), String> {
        if self.magic != FILTER_MAGIC {
            return Err("not a filter file (bad magic)".to_string());
        }
        if self.format_version != FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {} (expected {})",
                self.format_version, FORMAT_VERSION
            ));
        }
        if self.hash_scheme != HASH_SCHEME_MURMUR3_DOUBLE {
            return Err(format!("unknown hash scheme {}", self.hash_scheme));
        }
        if self.size_bits == 0 || self.hash_count == 0 || self.key_length == 0 {
            return Err("size_bits, hash_count and key_length must be positive".to_string());
        }
        if self.payload_len != self.size_bits.div_ceil(8) {
            return Err(format!(
                "payload of {} bytes does not match {} bits",
                self.payload_len, self.size_bits
            ));
        }
        Ok(())
    }
}

/// Filter store backed by files on the local disk
#[derive(Clone, Copy, Debug, Default)]
pub struct FilterFileStore;

impl FilterFileStore {
    pub fn new() -> Self {
        Self
    }
}

impl FilterStore for FilterFileStore {
    fn write(&self, path: &Path, filter: &BloomFilter) -> Result<u64, CodecError> {
        let header = FilterHeader::for_filter(filter)?;
        let header_bytes =
            bincode::serialize(&header).map_err(|e| CodecError::SerializationError(e.to_string()))?;
        debug_assert_eq!(header_bytes.len() as u64, HEADER_LEN);

        let io_err = |source: io::Error| CodecError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let temp_path = partial_path(path).map_err(io_err)?;

        // Truncated only once locked; the file belongs to whoever holds the lock
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&temp_path)
            .map_err(io_err)?;
        file.try_lock_exclusive().map_err(io_err)?;
        let mut guard = PartialFile::new(temp_path.clone());
        file.set_len(0).map_err(io_err)?;

        let mut hasher = crc32fast::Hasher::new();
        let mut writer = BufWriter::new(file);

        writer.write_all(&header_bytes).map_err(io_err)?;
        hasher.update(&header_bytes);
        writer.write_all(filter.as_bytes()).map_err(io_err)?;
        hasher.update(filter.as_bytes());
        writer
            .write_all(&hasher.finalize().to_le_bytes())
            .map_err(io_err)?;

        let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
        file.sync_all().map_err(io_err)?;

        // Lock held until the rename lands
        fs::rename(&temp_path, path).map_err(io_err)?;
        guard.disarm();
        drop(file);

        let bytes_written = HEADER_LEN + header.payload_len + CHECKSUM_LEN;
        debug!(path = %path.display(), bytes_written, "filter file written");
        Ok(bytes_written)
    }

    fn read(&self, path: &Path) -> Result<BloomFilter, CodecError> {
        let io_err = |source: io::Error| CodecError::Io {
            path: path.to_path_buf(),
            source,
        };
        let corrupt = |reason: String| CodecError::CorruptFile {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(io_err)?;
        let file_len = file.metadata().map_err(io_err)?.len();
        if file_len < HEADER_LEN + CHECKSUM_LEN {
            return Err(corrupt(format!("file is only {} bytes", file_len)));
        }
        let mut reader = BufReader::new(file);
        let mut hasher = crc32fast::Hasher::new();

        let mut header_bytes = [0u8; HEADER_LEN as usize];
        reader.read_exact(&mut header_bytes).map_err(io_err)?;
        hasher.update(&header_bytes);

        let header: FilterHeader = bincode::deserialize(&header_bytes)
            .map_err(|e| corrupt(format!("unreadable header: {}", e)))?;
        header.validate().map_err(corrupt)?;

        // Checked before allocating the payload
        let expected_len = HEADER_LEN + header.payload_len + CHECKSUM_LEN;
        if file_len != expected_len {
            return Err(corrupt(format!(
                "file is {} bytes, header declares {}",
                file_len, expected_len
            )));
        }

        let payload_len = usize::try_from(header.payload_len)
            .map_err(|_| corrupt("payload too large for this platform".to_string()))?;
        let mut payload = vec![0u8; payload_len];
        reader.read_exact(&mut payload).map_err(io_err)?;
        hasher.update(&payload);

        let mut checksum = [0u8; CHECKSUM_LEN as usize];
        reader.read_exact(&mut checksum).map_err(io_err)?;
        if u32::from_le_bytes(checksum) != hasher.finalize() {
            return Err(corrupt("checksum mismatch".to_string()));
        }

        let used_bits = (header.size_bits % 8) as u32;
        if used_bits != 0 {
            let last = payload.last().copied().unwrap_or(0);
            if last >> used_bits != 0 {
                return Err(corrupt("bits set beyond the end of the filter".to_string()));
            }
        }

        BloomFilter::from_raw_parts(
            payload,
            header.size_bits,
            header.hash_count,
            header.items,
            header.target_fpr,
            header.key_length as usize,
        )
        .map_err(|e| corrupt(e.to_string()))
    }
}

/// Path of the in-progress file for `path`
pub fn partial_path(path: &Path) -> io::Result<PathBuf> {
    let mut name = path
        .file_name()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "output path does not name a file",
            )
        })?
        .to_os_string();
    name.push(PARTIAL_SUFFIX);
    Ok(path.with_file_name(name))
}

/// Removes the in-progress file unless the write completed
struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(&self.path);
        }
    }
}
