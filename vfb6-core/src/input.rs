//! Loading of raw VFB6 word buffers.
//!
//! Files are flat sequences of little-endian 32-bit words, exactly as they
//! leave the readout chain for this module.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading raw words.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input length {0} bytes is not a multiple of 4")]
    TrailingBytes(usize),
}

/// Converts little-endian bytes into 32-bit words.
pub fn words_from_bytes(bytes: &[u8]) -> Result<Vec<u32>, InputError> {
    if bytes.len() % 4 != 0 {
        return Err(InputError::TrailingBytes(bytes.len()));
    }

    let mut words = vec![0u32; bytes.len() / 4];
    LittleEndian::read_u32_into(bytes, &mut words);
    Ok(words)
}

/// Reads all words from a reader.
pub fn read_words_from<R: Read>(mut reader: R) -> Result<Vec<u32>, InputError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    words_from_bytes(&bytes)
}

/// Reads all words from a file.
pub fn read_words<P: AsRef<Path>>(path: P) -> Result<Vec<u32>, InputError> {
    let file = File::open(path.as_ref())?;
    read_words_from(BufReader::new(file))
}

/// Writes words in the same little-endian layout.
pub fn write_words<W: Write>(writer: W, words: &[u32]) -> Result<(), InputError> {
    let mut writer = BufWriter::new(writer);
    for &word in words {
        writer.write_u32::<LittleEndian>(word)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_from_bytes() {
        let bytes = [0x34, 0x12, 0x64, 0x80, 0x01, 0x00, 0x00, 0x00];
        assert_eq!(words_from_bytes(&bytes).unwrap(), vec![0x8064_1234, 1]);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let err = words_from_bytes(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, InputError::TrailingBytes(3)));
    }

    #[test]
    fn test_empty_input() {
        assert!(words_from_bytes(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_file_round_trip() {
        let words = vec![0x0001_0002, 0xDEAD_BEEF, 0];
        let file = tempfile::NamedTempFile::new().unwrap();
        write_words(file.reopen().unwrap(), &words).unwrap();
        assert_eq!(read_words(file.path()).unwrap(), words);
    }
}
