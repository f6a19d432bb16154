//! Control-wire framing: a 4-byte big-endian length prefix followed by a
//! UTF-8 JSON body, per the external interface's wire format. Generalized
//! from the teacher's varint-length-prefixed-protobuf framing to a fixed
//! 4-byte length and a JSON body.

use anyhow::{anyhow, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use vp_control::{ClientMessage, ServerMessage, CLIENT_MESSAGE_TYPES};

/// The outcome of decoding one frame body: either a recognized message, or
/// a `type` tag this server doesn't know about. Per the framing layer's
/// handling of forward-compatible messages, an unrecognized `type` is
/// logged and discarded by the caller — it is not a decode error and must
/// not close the connection.
#[derive(Debug)]
pub enum Frame {
    Message(ClientMessage),
    UnknownType(String),
}

/// Reads one length-prefixed JSON frame and decodes it. A zero-byte read at
/// the length prefix, or a clean disconnect partway through a frame (header
/// or body), is reported as `Ok(None)` — an ordinary end condition, not an
/// error.
pub async fn read_client_message<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    max_frame_bytes: usize,
) -> Result<Option<Frame>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_frame_bytes {
        return Err(anyhow!("frame of {len} bytes exceeds the {max_frame_bytes}-byte cap"));
    }
    if len == 0 {
        return Err(anyhow!("zero-length frame"));
    }

    let mut body = vec![0u8; len];
    match reader.read_exact(&mut body).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    Ok(Some(decode_frame(&body)?))
}

/// Decodes a frame body, distinguishing an unrecognized `type` tag (discard,
/// keep the connection open) from a malformed body for a known `type`
/// (a genuine decode error).
fn decode_frame(body: &[u8]) -> Result<Frame> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    let tag = value.get("type").and_then(|v| v.as_str()).map(str::to_string);

    match serde_json::from_value::<ClientMessage>(value) {
        Ok(msg) => Ok(Frame::Message(msg)),
        Err(err) => match tag {
            Some(tag) if !CLIENT_MESSAGE_TYPES.contains(&tag.as_str()) => Ok(Frame::UnknownType(tag)),
            _ => Err(err.into()),
        },
    }
}

/// Encodes `msg` as a length-prefixed JSON frame, ready to write to a
/// connection's write-queue.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(msg)?;
    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vp_control::ParticipantId;

    #[tokio::test]
    async fn round_trips_a_client_message() {
        let msg = ClientMessage::CreateMeeting { name: "Alice".into() };
        let body = serde_json::to_vec(&msg).unwrap();
        let mut framed = Vec::new();
        framed.extend_from_slice(&(body.len() as u32).to_be_bytes());
        framed.extend_from_slice(&body);

        let mut cursor = std::io::Cursor::new(framed);
        let decoded = read_client_message(&mut cursor, 64 * 1024).await.unwrap().unwrap();
        match decoded {
            Frame::Message(ClientMessage::CreateMeeting { name }) => assert_eq!(name, "Alice"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn clean_eof_between_frames_is_not_an_error() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        let result = read_client_message(&mut cursor, 64 * 1024).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn clean_disconnect_mid_body_is_not_an_error() {
        let mut framed = Vec::new();
        framed.extend_from_slice(&100u32.to_be_bytes());
        framed.extend_from_slice(b"{\"type\":\"LEAVE\"");
        let mut cursor = std::io::Cursor::new(framed);
        let result = read_client_message(&mut cursor, 64 * 1024).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let mut framed = Vec::new();
        framed.extend_from_slice(&1_000_000u32.to_be_bytes());
        let mut cursor = std::io::Cursor::new(framed);
        assert!(read_client_message(&mut cursor, 64 * 1024).await.is_err());
    }

    #[tokio::test]
    async fn unrecognized_type_is_discarded_not_errored() {
        let body = br#"{"type":"FUTURE_FEATURE","foo":"bar"}"#;
        let mut framed = Vec::new();
        framed.extend_from_slice(&(body.len() as u32).to_be_bytes());
        framed.extend_from_slice(body);
        let mut cursor = std::io::Cursor::new(framed);
        let decoded = read_client_message(&mut cursor, 64 * 1024).await.unwrap().unwrap();
        match decoded {
            Frame::UnknownType(ty) => assert_eq!(ty, "FUTURE_FEATURE"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_known_type_is_a_decode_error() {
        let body = br#"{"type":"CREATE_MEETING"}"#; // missing required `name`
        let mut framed = Vec::new();
        framed.extend_from_slice(&(body.len() as u32).to_be_bytes());
        framed.extend_from_slice(body);
        let mut cursor = std::io::Cursor::new(framed);
        assert!(read_client_message(&mut cursor, 64 * 1024).await.is_err());
    }

    #[test]
    fn encode_server_message_prefixes_length() {
        let frame = encode_server_message(&ServerMessage::MemberLeft {
            participant_id: ParticipantId(3),
        })
        .unwrap();
        let len = u32::from_be_bytes(frame[..4].try_into().unwrap()) as usize;
        assert_eq!(frame.len(), 4 + len);
    }
}
