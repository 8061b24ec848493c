//! WAV container parsing
//!
//! Walks the RIFF chunk structure of the device's audio files and extracts
//! the format metadata plus the location of the compressed data region.
//! Only the header is interpreted here; block decoding lives in
//! [`crate::audio::adpcm`].

use crate::error::{Error, Result};
use std::io::{Read, Seek, SeekFrom};

/// WAVE format tag for IMA ADPCM.
pub const FORMAT_IMA_ADPCM: u16 = 0x0011;

/// Parsed container header.
///
/// Produced only once the `fmt ` chunk has been fully read and the `data`
/// chunk located. `data_offset` points at the first byte of compressed
/// audio, immediately after the data chunk's size field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub format_tag: u16,
    pub channel_count: u16,
    pub sample_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_offset: u64,
    pub data_size: u32,
}

/// Parse a WAV container header from the start of `reader`.
///
/// Iterates sub-chunks (`[4-byte id][u32 LE size][payload][pad]`, where
/// odd-sized payloads carry one pad byte not counted in `size`) until the
/// `data` chunk is found. Chunks other than `fmt ` and `data` are skipped
/// wholesale; anything after `data` is ignored.
///
/// # Errors
/// - `Format` on a bad RIFF/WAVE magic, a `data` chunk preceding `fmt `,
///   or a truncated read anywhere in the header
/// - `File` on an underlying I/O failure
pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<ContainerHeader> {
    let mut id = [0u8; 4];

    read_exact(reader, &mut id)?;
    if &id != b"RIFF" {
        return Err(Error::Format("Missing RIFF magic".to_string()));
    }
    read_u32(reader)?; // riff size, unused
    read_exact(reader, &mut id)?;
    if &id != b"WAVE" {
        return Err(Error::Format("Missing WAVE magic".to_string()));
    }

    let mut format: Option<ContainerHeader> = None;

    loop {
        read_exact(reader, &mut id)?;
        let chunk_size = read_u32(reader)?;
        let padded_size = chunk_size as u64 + (chunk_size as u64 & 1);

        match &id {
            b"fmt " => {
                if chunk_size < 16 {
                    return Err(Error::Format(format!(
                        "fmt chunk too small: {} bytes",
                        chunk_size
                    )));
                }
                let format_tag = read_u16(reader)?;
                let channel_count = read_u16(reader)?;
                let sample_rate = read_u32(reader)?;
                read_u32(reader)?; // byte rate, unused
                let block_align = read_u16(reader)?;
                let bits_per_sample = read_u16(reader)?;

                // Skip any extension bytes plus the pad byte.
                skip(reader, padded_size - 16)?;

                format = Some(ContainerHeader {
                    format_tag,
                    channel_count,
                    sample_rate,
                    block_align,
                    bits_per_sample,
                    data_offset: 0,
                    data_size: 0,
                });
            }
            b"data" => {
                let mut header = format
                    .ok_or_else(|| Error::Format("data chunk before fmt chunk".to_string()))?;
                header.data_offset = stream_position(reader)?;
                header.data_size = chunk_size;
                return Ok(header);
            }
            _ => {
                skip(reader, padded_size)?;
            }
        }
    }
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Format("Truncated container header".to_string())
        } else {
            Error::File(e)
        }
    })
}

fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    let mut b = [0u8; 2];
    read_exact(reader, &mut b)?;
    Ok(u16::from_le_bytes(b))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    read_exact(reader, &mut b)?;
    Ok(u32::from_le_bytes(b))
}

fn skip<R: Seek>(reader: &mut R, bytes: u64) -> Result<()> {
    reader
        .seek(SeekFrom::Current(bytes as i64))
        .map_err(Error::File)?;
    Ok(())
}

fn stream_position<R: Seek>(reader: &mut R) -> Result<u64> {
    reader.stream_position().map_err(Error::File)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn chunk(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(id);
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    fn fmt_payload(tag: u16, channels: u16, rate: u32, align: u16, bits: u16) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&tag.to_le_bytes());
        p.extend_from_slice(&channels.to_le_bytes());
        p.extend_from_slice(&rate.to_le_bytes());
        p.extend_from_slice(&(rate as u32 * align as u32).to_le_bytes());
        p.extend_from_slice(&align.to_le_bytes());
        p.extend_from_slice(&bits.to_le_bytes());
        p
    }

    fn container(chunks: &[Vec<u8>]) -> Vec<u8> {
        let body_len: usize = chunks.iter().map(Vec::len).sum();
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&((body_len + 4) as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        for c in chunks {
            out.extend_from_slice(c);
        }
        out
    }

    #[test]
    fn test_parse_minimal_container() {
        let data = vec![0u8; 512];
        let bytes = container(&[
            chunk(b"fmt ", &fmt_payload(FORMAT_IMA_ADPCM, 1, 16000, 256, 4)),
            chunk(b"data", &data),
        ]);

        let header = parse(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(header.format_tag, FORMAT_IMA_ADPCM);
        assert_eq!(header.channel_count, 1);
        assert_eq!(header.sample_rate, 16000);
        assert_eq!(header.block_align, 256);
        assert_eq!(header.bits_per_sample, 4);
        // 12-byte RIFF header + 8 + 16 fmt + 8 data header
        assert_eq!(header.data_offset, 44);
        assert_eq!(header.data_size, 512);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let err = parse(&mut Cursor::new(b"RIFX\0\0\0\0WAVE")).unwrap_err();
        assert!(matches!(err, Error::Format(_)));

        let err = parse(&mut Cursor::new(b"RIFF\0\0\0\0WAVX")).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_odd_sized_chunk_is_padded() {
        // An unknown chunk with an odd payload must consume a pad byte so
        // the data chunk is still located on the correct boundary.
        let bytes = container(&[
            chunk(b"fmt ", &fmt_payload(FORMAT_IMA_ADPCM, 1, 16000, 256, 4)),
            chunk(b"LIST", &[0xAA, 0xBB, 0xCC]),
            chunk(b"data", &[0u8; 16]),
        ]);

        let header = parse(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(header.data_size, 16);
        // Everything before the data payload: 12 + (8+16) + (8+3+1) + 8
        assert_eq!(header.data_offset, 56);
    }

    #[test]
    fn test_data_before_fmt_rejected() {
        let bytes = container(&[
            chunk(b"data", &[0u8; 8]),
            chunk(b"fmt ", &fmt_payload(FORMAT_IMA_ADPCM, 1, 16000, 256, 4)),
        ]);
        let err = parse(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_truncated_header_rejected() {
        let bytes = container(&[chunk(b"fmt ", &fmt_payload(FORMAT_IMA_ADPCM, 1, 16000, 256, 4))]);
        // No data chunk: the chunk walk runs off the end of the file.
        let err = parse(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_oversized_fmt_chunk_extension_skipped() {
        let mut payload = fmt_payload(FORMAT_IMA_ADPCM, 1, 16000, 256, 4);
        payload.extend_from_slice(&[2, 0, 0xF9, 0x01]); // cbSize + extra
        let bytes = container(&[chunk(b"fmt ", &payload), chunk(b"data", &[0u8; 4])]);

        let header = parse(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(header.block_align, 256);
        assert_eq!(header.data_size, 4);
    }
}
