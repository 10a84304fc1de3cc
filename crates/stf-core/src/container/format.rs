// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines the fixed binary layout of STF container files.
//!
//! | Field | Width |
//! |---|---|
//! | magic `STF0` | 4 bytes |
//! | version major | u32 |
//! | version minor | u32 |
//! | buffer count + 1 | u32 |
//! | JSON length | u64 |
//! | buffer lengths | u64 each |
//! | JSON payload | JSON length |
//! | buffer payloads | concatenated |
//!
//! All integers are little-endian. The `+ 1` in the buffer count accounts for
//! the JSON definition, which is conceptually buffer 0.

use std::{fs, path::Path};

/// A unique byte sequence to identify STF container files.
pub const HEADER_MAGIC_BYTES: [u8; 4] = *b"STF0";

/// The major format version written by this crate.
pub const STF_VERSION_MAJOR: u32 = 0;

/// The minor format version written by this crate.
pub const STF_VERSION_MINOR: u32 = 0;

/// Errors raised while reading a container.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// The magic bytes do not match [`HEADER_MAGIC_BYTES`].
    #[error("not a recognized file: invalid magic bytes")]
    NotRecognized,
    /// The header declares zero buffers, not even the JSON definition.
    #[error("invalid container: must declare at least the JSON definition")]
    NoDefinition,
    /// The input ends before a declared field or payload.
    #[error("truncated container: needed {needed} bytes at offset {offset}, only {available} available")]
    Truncated {
        /// Offset of the field being read.
        offset: usize,
        /// Bytes needed from that offset.
        needed: u64,
        /// Bytes actually left.
        available: usize,
    },
    /// A declared length does not fit in memory on this platform.
    #[error("declared length {0} does not fit in memory")]
    LengthOverflow(u64),
    /// The JSON definition is not valid UTF-8.
    #[error("JSON definition is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    /// Reading or writing the file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The parsed fixed-layout header at the beginning of every container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StfHeader {
    /// Format major version.
    pub version_major: u32,
    /// Format minor version.
    pub version_minor: u32,
    /// Byte length of the JSON definition.
    pub json_length: u64,
    /// Byte length of each auxiliary buffer, in declaration order.
    pub buffer_lengths: Vec<u64>,
}

/// A little-endian cursor over the input slice.
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: u64) -> Result<&'a [u8], ContainerError> {
        let available = self.bytes.len() - self.offset;
        let len_usize = usize::try_from(len).map_err(|_| ContainerError::LengthOverflow(len))?;
        if len_usize > available {
            return Err(ContainerError::Truncated {
                offset: self.offset,
                needed: len,
                available,
            });
        }
        let slice = &self.bytes[self.offset..self.offset + len_usize];
        self.offset += len_usize;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ContainerError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N as u64)?);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, ContainerError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, ContainerError> {
        Ok(u64::from_le_bytes(self.array()?))
    }
}

// NOTE: The header is read by hand rather than through serde. It is a
// fixed-layout part of the file format and must match byte for byte.
impl StfHeader {
    /// Size of the fixed part of the header, before the buffer length table.
    pub const FIXED_SIZE: usize = 4 + 4 + 4 + 4 + 8;

    /// Total size of this header in bytes, including the buffer length table.
    pub fn size(&self) -> usize {
        Self::FIXED_SIZE + 8 * self.buffer_lengths.len()
    }

    /// Attempts to parse a header from the beginning of a byte slice.
    ///
    /// Returns the header together with the number of bytes it occupies.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, usize), ContainerError> {
        let mut reader = Reader::new(bytes);
        if reader.array::<4>()? != HEADER_MAGIC_BYTES {
            return Err(ContainerError::NotRecognized);
        }

        let version_major = reader.u32()?;
        let version_minor = reader.u32()?;
        let buffer_count_plus_one = reader.u32()?;
        if buffer_count_plus_one < 1 {
            return Err(ContainerError::NoDefinition);
        }

        let json_length = reader.u64()?;
        let buffer_lengths = (0..buffer_count_plus_one - 1)
            .map(|_| reader.u64())
            .collect::<Result<Vec<_>, _>>()?;

        let header = Self {
            version_major,
            version_minor,
            json_length,
            buffer_lengths,
        };
        Ok((header, reader.offset))
    }

    /// Appends the encoded header to `out`.
    pub fn write_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&HEADER_MAGIC_BYTES);
        out.extend_from_slice(&self.version_major.to_le_bytes());
        out.extend_from_slice(&self.version_minor.to_le_bytes());
        out.extend_from_slice(&(self.buffer_lengths.len() as u32 + 1).to_le_bytes());
        out.extend_from_slice(&self.json_length.to_le_bytes());
        for length in &self.buffer_lengths {
            out.extend_from_slice(&length.to_le_bytes());
        }
    }
}

/// A logical representation of a full container file in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StfFile {
    /// Format major version.
    pub version_major: u32,
    /// Format minor version.
    pub version_minor: u32,
    /// The raw UTF-8 JSON definition.
    pub definition: Vec<u8>,
    /// Auxiliary buffers, addressed by index from `stf.buffer.included` descriptors.
    pub buffers: Vec<Vec<u8>>,
}

impl StfFile {
    /// Creates a container at the current format version.
    pub fn new(definition: Vec<u8>, buffers: Vec<Vec<u8>>) -> Self {
        Self {
            version_major: STF_VERSION_MAJOR,
            version_minor: STF_VERSION_MINOR,
            definition,
            buffers,
        }
    }

    /// Builds the header describing this container.
    pub fn header(&self) -> StfHeader {
        StfHeader {
            version_major: self.version_major,
            version_minor: self.version_minor,
            json_length: self.definition.len() as u64,
            buffer_lengths: self.buffers.iter().map(|b| b.len() as u64).collect(),
        }
    }

    /// Parses a complete container.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContainerError> {
        let (header, header_size) = StfHeader::from_bytes(bytes)?;
        let mut reader = Reader::new(bytes);
        reader.offset = header_size;

        let definition = reader.take(header.json_length)?.to_vec();
        let buffers = header
            .buffer_lengths
            .iter()
            .map(|&length| reader.take(length).map(<[u8]>::to_vec))
            .collect::<Result<Vec<_>, _>>()?;

        if reader.offset < bytes.len() {
            log::warn!(
                "Ignoring {} trailing bytes after the last STF buffer",
                bytes.len() - reader.offset
            );
        }

        Ok(Self {
            version_major: header.version_major,
            version_minor: header.version_minor,
            definition,
            buffers,
        })
    }

    /// Encodes the container into its binary form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let header = self.header();
        let payload: usize =
            self.definition.len() + self.buffers.iter().map(Vec::len).sum::<usize>();
        let mut out = Vec::with_capacity(header.size() + payload);
        header.write_into(&mut out);
        out.extend_from_slice(&self.definition);
        for buffer in &self.buffers {
            out.extend_from_slice(buffer);
        }
        out
    }

    /// Reads and parses a container from disk.
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, ContainerError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Encodes and writes the container to disk.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), ContainerError> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }

    /// Borrows the JSON definition as text.
    pub fn definition_str(&self) -> Result<&str, ContainerError> {
        Ok(std::str::from_utf8(&self.definition)?)
    }
}
