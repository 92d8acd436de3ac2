//! Segment frame format.
//!
//! Every segment starts with a fixed header followed by a sequence of frames:
//!
//! ```text
//! header: | magic "SBSG" (4) | version (2) |
//! frame:  | body_len (4) | kind (1) | body (N, CBOR) | crc32 (4) |
//! ```
//!
//! The CRC covers everything in the frame before it.

use crate::error::{StorageError, StorageResult};
use crate::types::{SerializedRecord, TopicMetadata};

/// Magic bytes at the start of every segment.
pub const SEGMENT_MAGIC: [u8; 4] = *b"SBSG";

/// Current segment format version.
pub const SEGMENT_VERSION: u16 = 1;

/// Size of the segment header in bytes.
pub const SEGMENT_HEADER_SIZE: u64 = 6;

/// Bytes added to each frame body: length (4) + kind (1) + crc (4).
pub const FRAME_OVERHEAD: usize = 9;

const KIND_TOPIC_CREATED: u8 = 1;
const KIND_TOPIC_REMOVED: u8 = 2;
const KIND_MESSAGE: u8 = 3;

/// One entry of a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A topic was registered in the segment.
    TopicCreated(TopicMetadata),
    /// A topic was removed from the segment.
    TopicRemoved(TopicMetadata),
    /// A message record.
    Message(SerializedRecord),
}

impl Frame {
    fn kind(&self) -> u8 {
        match self {
            Self::TopicCreated(_) => KIND_TOPIC_CREATED,
            Self::TopicRemoved(_) => KIND_TOPIC_REMOVED,
            Self::Message(_) => KIND_MESSAGE,
        }
    }

    /// Encodes the frame, envelope included.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Encoding`] if the body cannot be serialized or
    /// is larger than 4 GiB.
    pub fn encode(&self) -> StorageResult<Vec<u8>> {
        let mut body = Vec::new();
        let encoded = match self {
            Self::TopicCreated(topic) | Self::TopicRemoved(topic) => {
                ciborium::into_writer(topic, &mut body)
            }
            Self::Message(record) => ciborium::into_writer(record, &mut body),
        };
        encoded.map_err(|e| StorageError::Encoding(e.to_string()))?;

        let len = u32::try_from(body.len())
            .map_err(|_| StorageError::Encoding("frame body too large".to_string()))?;

        let mut data = Vec::with_capacity(body.len() + FRAME_OVERHEAD);
        data.extend_from_slice(&len.to_le_bytes());
        data.push(self.kind());
        data.extend_from_slice(&body);

        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());

        Ok(data)
    }

    /// Decodes one frame from the start of `data`.
    ///
    /// Returns the frame and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupted`] on truncation, checksum mismatch,
    /// unknown frame kinds or malformed bodies.
    pub fn decode(data: &[u8]) -> StorageResult<(Self, usize)> {
        if data.len() < FRAME_OVERHEAD {
            return Err(StorageError::Corrupted("truncated frame header".to_string()));
        }

        let len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        let total = len + FRAME_OVERHEAD;
        if data.len() < total {
            return Err(StorageError::Corrupted("truncated frame body".to_string()));
        }

        let crc_offset = total - 4;
        let expected = u32::from_le_bytes([
            data[crc_offset],
            data[crc_offset + 1],
            data[crc_offset + 2],
            data[crc_offset + 3],
        ]);
        let actual = compute_crc32(&data[..crc_offset]);
        if expected != actual {
            return Err(StorageError::Corrupted(format!(
                "frame checksum mismatch: expected {expected:08x}, got {actual:08x}"
            )));
        }

        let body = &data[5..crc_offset];
        let malformed = |e: ciborium::de::Error<std::io::Error>| {
            StorageError::Corrupted(format!("malformed frame body: {e}"))
        };
        let frame = match data[4] {
            KIND_TOPIC_CREATED => Self::TopicCreated(ciborium::from_reader(body).map_err(malformed)?),
            KIND_TOPIC_REMOVED => Self::TopicRemoved(ciborium::from_reader(body).map_err(malformed)?),
            KIND_MESSAGE => Self::Message(ciborium::from_reader(body).map_err(malformed)?),
            other => {
                return Err(StorageError::Corrupted(format!("unknown frame kind {other}")));
            }
        };

        Ok((frame, total))
    }
}

/// Encodes the segment header.
pub(crate) fn encode_header() -> [u8; SEGMENT_HEADER_SIZE as usize] {
    let mut header = [0u8; SEGMENT_HEADER_SIZE as usize];
    header[..4].copy_from_slice(&SEGMENT_MAGIC);
    header[4..].copy_from_slice(&SEGMENT_VERSION.to_le_bytes());
    header
}

/// Decodes every frame of a complete segment image.
pub(crate) fn decode_segment(data: &[u8]) -> StorageResult<Vec<Frame>> {
    if data.len() < SEGMENT_HEADER_SIZE as usize || data[..4] != SEGMENT_MAGIC {
        return Err(StorageError::Corrupted("invalid segment magic".to_string()));
    }
    let version = u16::from_le_bytes([data[4], data[5]]);
    if version > SEGMENT_VERSION {
        return Err(StorageError::Corrupted(format!(
            "unsupported segment version: {version}"
        )));
    }

    let mut frames = Vec::new();
    let mut cursor = SEGMENT_HEADER_SIZE as usize;
    while cursor < data.len() {
        let (frame, consumed) = Frame::decode(&data[cursor..])?;
        frames.push(frame);
        cursor += consumed;
    }
    Ok(frames)
}

/// Computes a CRC32 (IEEE polynomial) over `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn crc32_known_value() {
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn message_frame_decodes() {
        let frame = Frame::Message(SerializedRecord::new("/a", vec![1, 2, 3], -5));
        let encoded = frame.encode().unwrap();

        let (decoded, consumed) = Frame::decode(&encoded).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn corrupted_frame_rejected() {
        let frame = Frame::TopicCreated(TopicMetadata::new("/a", "t", "cdr"));
        let mut encoded = frame.encode().unwrap();
        encoded[6] ^= 0xFF;

        assert!(matches!(
            Frame::decode(&encoded),
            Err(StorageError::Corrupted(_))
        ));
    }

    #[test]
    fn truncated_frame_rejected() {
        let frame = Frame::Message(SerializedRecord::new("/a", vec![0; 32], 1));
        let encoded = frame.encode().unwrap();

        assert!(Frame::decode(&encoded[..encoded.len() - 1]).is_err());
    }

    #[test]
    fn segment_with_bad_magic_rejected() {
        assert!(decode_segment(b"XXXX\x01\x00").is_err());
    }

    proptest! {
        #[test]
        fn encoded_length_matches_overhead(payload in prop::collection::vec(any::<u8>(), 0..256)) {
            let frame = Frame::Message(SerializedRecord::new("/p", payload, 0));
            let encoded = frame.encode().unwrap();
            let body_len = u32::from_le_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]) as usize;
            prop_assert_eq!(encoded.len(), body_len + FRAME_OVERHEAD);
        }
    }
}
