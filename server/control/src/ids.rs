use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Opaque participant identifier, minted by [`crate::registry::MeetingRegistry`]
/// when a participant record is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transfer identifier, chosen by the sending client and unique per sender.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(pub u32);

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Six-digit decimal meeting code, uniformly sampled from `[100000, 999999]`.
///
/// Serializes as the zero-padded ASCII string the wire protocol expects,
/// not as a bare integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeetingCode(pub u32);

impl MeetingCode {
    pub const MIN: u32 = 100_000;
    pub const MAX: u32 = 999_999;

    pub fn as_string(&self) -> String {
        format!("{:06}", self.0)
    }
}

impl fmt::Display for MeetingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl Serialize for MeetingCode {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.as_string())
    }
}

impl<'de> Deserialize<'de> for MeetingCode {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(D::Error::custom("meeting code must be six ASCII digits"));
        }
        let v: u32 = s.parse().map_err(D::Error::custom)?;
        Ok(MeetingCode(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meeting_code_round_trips_through_json() {
        let code = MeetingCode(482913);
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"482913\"");
        let back: MeetingCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn meeting_code_zero_pads() {
        assert_eq!(MeetingCode(1234).as_string(), "001234");
    }

    #[test]
    fn meeting_code_rejects_non_digit_strings() {
        let err = serde_json::from_str::<MeetingCode>("\"12a456\"");
        assert!(err.is_err());
    }
}
