//! Fixed, big-endian datagram headers for the two media kinds the relay
//! understands. No variable-length fields — every offset is a compile-time
//! constant, decoded with explicit `from_be_bytes` rather than relying on
//! host byte order.

use vp_control::ParticipantId;

pub const KIND_VIDEO: u8 = 0x01;
pub const KIND_AUDIO: u8 = 0x02;

/// Bytes of fixed header preceding the payload, including the trailing
/// 4-byte payload-length field.
pub const VIDEO_HEADER_LEN: usize = 1 + 4 + 4 + 8 + 4 + 2 + 2 + 4;
pub const AUDIO_HEADER_LEN: usize = 1 + 4 + 4 + 8 + 2 + 1 + 4;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("datagram shorter than its fixed header")]
    Truncated,
    #[error("unrecognized media kind byte {0:#04x}")]
    UnknownKind(u8),
    #[error("declared payload length does not match datagram size")]
    LengthMismatch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoHeader {
    pub participant_id: ParticipantId,
    pub frame_id: u32,
    pub timestamp_us: u64,
    pub seq: u32,
    pub width: u16,
    pub height: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioHeader {
    pub participant_id: ParticipantId,
    pub audio_id: u32,
    pub timestamp_us: u64,
    pub sample_rate: u16,
    pub channels: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaHeader {
    Video(VideoHeader),
    Audio(AudioHeader),
}

/// Parses `datagram`'s fixed header, validating the declared payload length
/// against the datagram's actual size. Returns the header and the byte
/// offset at which the payload begins.
pub fn parse(datagram: &[u8]) -> Result<(MediaHeader, usize), HeaderError> {
    let kind = *datagram.first().ok_or(HeaderError::Truncated)?;
    match kind {
        KIND_VIDEO => parse_video(datagram),
        KIND_AUDIO => parse_audio(datagram),
        other => Err(HeaderError::UnknownKind(other)),
    }
}

fn parse_video(d: &[u8]) -> Result<(MediaHeader, usize), HeaderError> {
    if d.len() < VIDEO_HEADER_LEN {
        return Err(HeaderError::Truncated);
    }
    let participant_id = ParticipantId(u32::from_be_bytes(d[1..5].try_into().unwrap()));
    let frame_id = u32::from_be_bytes(d[5..9].try_into().unwrap());
    let timestamp_us = u64::from_be_bytes(d[9..17].try_into().unwrap());
    let seq = u32::from_be_bytes(d[17..21].try_into().unwrap());
    let width = u16::from_be_bytes(d[21..23].try_into().unwrap());
    let height = u16::from_be_bytes(d[23..25].try_into().unwrap());
    let payload_len = u32::from_be_bytes(d[25..29].try_into().unwrap()) as usize;

    if d.len() - VIDEO_HEADER_LEN != payload_len {
        return Err(HeaderError::LengthMismatch);
    }

    Ok((
        MediaHeader::Video(VideoHeader {
            participant_id,
            frame_id,
            timestamp_us,
            seq,
            width,
            height,
        }),
        VIDEO_HEADER_LEN,
    ))
}

fn parse_audio(d: &[u8]) -> Result<(MediaHeader, usize), HeaderError> {
    if d.len() < AUDIO_HEADER_LEN {
        return Err(HeaderError::Truncated);
    }
    let participant_id = ParticipantId(u32::from_be_bytes(d[1..5].try_into().unwrap()));
    let audio_id = u32::from_be_bytes(d[5..9].try_into().unwrap());
    let timestamp_us = u64::from_be_bytes(d[9..17].try_into().unwrap());
    let sample_rate = u16::from_be_bytes(d[17..19].try_into().unwrap());
    let channels = d[19];
    let payload_len = u32::from_be_bytes(d[20..24].try_into().unwrap()) as usize;

    if d.len() - AUDIO_HEADER_LEN != payload_len {
        return Err(HeaderError::LengthMismatch);
    }

    Ok((
        MediaHeader::Audio(AudioHeader {
            participant_id,
            audio_id,
            timestamp_us,
            sample_rate,
            channels,
        }),
        AUDIO_HEADER_LEN,
    ))
}

impl MediaHeader {
    pub fn participant_id(&self) -> ParticipantId {
        match self {
            MediaHeader::Video(h) => h.participant_id,
            MediaHeader::Audio(h) => h.participant_id,
        }
    }
}
