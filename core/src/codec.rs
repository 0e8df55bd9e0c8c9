//! Binary encoding of postings lists.
//!
//! A term record is laid out as
//! `[doc_freq] ([doc_id_gap] [term_freq] [position_gap; term_freq]) * doc_freq`
//! where every integer uses the file's [`Encoding`]. Document ids and
//! positions are stored as gaps from the previous value, starting from 0.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Posting, PostingsList};

/// Failures while encoding or decoding a term record.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("record truncated")]
    Truncated,

    #[error("variable-byte integer does not terminate within 5 bytes")]
    VarintOverflow,

    #[error("record declares {count} entries but only {remaining} bytes remain")]
    ImpliedOverrun { count: u32, remaining: u64 },

    #[error("sequence is not ascending: {current} follows {previous}")]
    GapUnderflow { previous: u32, current: u32 },

    #[error("vocabulary entry holds {0} bytes, expected an 8-byte offset")]
    InvalidOffset(usize),

    #[error("IO error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for CodecError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            CodecError::Truncated
        } else {
            CodecError::Io(err)
        }
    }
}

/// Integer encoding used for an entire postings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Every integer is a little-endian `u32`.
    FixedWidth,
    /// 7 bits per byte, low group first, high bit set on all but the last byte.
    #[default]
    VariableByte,
}

impl Encoding {
    /// Smallest number of bytes a single integer can occupy.
    pub fn min_width(self) -> u64 {
        match self {
            Encoding::FixedWidth => 4,
            Encoding::VariableByte => 1,
        }
    }

    pub fn write_u32<W: Write>(self, writer: &mut W, value: u32) -> io::Result<usize> {
        match self {
            Encoding::FixedWidth => {
                writer.write_u32::<LittleEndian>(value)?;
                Ok(4)
            }
            Encoding::VariableByte => {
                let mut buf = Vec::with_capacity(5);
                encode_vbyte(value, &mut buf);
                writer.write_all(&buf)?;
                Ok(buf.len())
            }
        }
    }

    pub fn read_u32<R: Read>(self, reader: &mut R) -> Result<u32, CodecError> {
        match self {
            Encoding::FixedWidth => Ok(reader.read_u32::<LittleEndian>()?),
            Encoding::VariableByte => decode_vbyte(reader),
        }
    }
}

/// Append the variable-byte form of `value` to `out`.
pub fn encode_vbyte(value: u32, out: &mut Vec<u8>) {
    let mut v = value;
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

/// Read one variable-byte integer.
pub fn decode_vbyte<R: Read>(reader: &mut R) -> Result<u32, CodecError> {
    let mut result: u32 = 0;
    let mut shift = 0u32;
    loop {
        let byte = reader.read_u8()?;
        let group = (byte & 0x7F) as u32;
        // the fifth byte may only carry the top 4 bits of a u32
        if shift == 28 && group > 0x0F {
            return Err(CodecError::VarintOverflow);
        }
        result |= group << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift > 28 {
            return Err(CodecError::VarintOverflow);
        }
    }
}

fn gap(previous: u32, current: u32) -> Result<u32, CodecError> {
    current
        .checked_sub(previous)
        .ok_or(CodecError::GapUnderflow { previous, current })
}

/// Serialize one term's postings. Returns the number of bytes written.
///
/// Document ids must be non-decreasing and positions within a posting must
/// be non-decreasing; anything else fails with [`CodecError::GapUnderflow`].
pub fn write_postings<W: Write>(
    writer: &mut W,
    encoding: Encoding,
    postings: &[Posting],
) -> Result<u64, CodecError> {
    let mut written = encoding.write_u32(writer, postings.len() as u32)? as u64;
    let mut last_doc_id = 0;
    for posting in postings {
        let doc_gap = gap(last_doc_id, posting.doc_id)?;
        written += encoding.write_u32(writer, doc_gap)? as u64;
        last_doc_id = posting.doc_id;

        written += encoding.write_u32(writer, posting.positions.len() as u32)? as u64;
        let mut last_position = 0;
        for &position in &posting.positions {
            written += encoding.write_u32(writer, gap(last_position, position)?)? as u64;
            last_position = position;
        }
    }
    Ok(written)
}

/// Decode one term record, reconstructing absolute ids and positions.
///
/// `remaining` is the number of bytes available from the start of the
/// record to the end of the file; counts that could not fit in it are
/// rejected before anything is allocated.
pub fn read_postings<R: Read>(
    reader: &mut R,
    encoding: Encoding,
    remaining: u64,
) -> Result<PostingsList, CodecError> {
    let min = encoding.min_width();
    let doc_freq = encoding.read_u32(reader)?;
    check_fits(doc_freq, 2 * min, remaining.saturating_sub(min))?;

    let mut postings = Vec::with_capacity(doc_freq as usize);
    let mut doc_id = 0u32;
    for _ in 0..doc_freq {
        let doc_gap = encoding.read_u32(reader)?;
        doc_id = doc_id.checked_add(doc_gap).ok_or(CodecError::VarintOverflow)?;

        let term_freq = encoding.read_u32(reader)?;
        check_fits(term_freq, min, remaining)?;
        let mut positions = Vec::with_capacity(term_freq as usize);
        let mut position = 0u32;
        for _ in 0..term_freq {
            let pos_gap = encoding.read_u32(reader)?;
            position = position.checked_add(pos_gap).ok_or(CodecError::VarintOverflow)?;
            positions.push(position);
        }
        postings.push(Posting { doc_id, positions });
    }
    Ok(postings)
}

fn check_fits(count: u32, width: u64, remaining: u64) -> Result<(), CodecError> {
    if (count as u64).saturating_mul(width) > remaining {
        return Err(CodecError::ImpliedOverrun { count, remaining });
    }
    Ok(())
}
