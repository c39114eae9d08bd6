/// Store-native record identifiers
///
/// An ObjectId is 12 bytes: a 4-byte big-endian timestamp (seconds since the
/// Unix epoch), 5 bytes of per-process randomness and a 3-byte big-endian
/// counter. Its textual form is 24 lowercase hex digits.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Length of an ObjectId in bytes
pub const OBJECT_ID_LEN: usize = 12;

/// Length of the hex encoding of an ObjectId
pub const OBJECT_ID_HEX_LEN: usize = OBJECT_ID_LEN * 2;

const COUNTER_MASK: u32 = 0x00ff_ffff;

/// Reasons a string is not a valid ObjectId
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectIdError {
    #[error("expected {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid hex character {character:?} at position {index}")]
    InvalidHex { character: char, index: usize },
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

struct ProcessState {
    random: [u8; 5],
    counter: AtomicU32,
}

fn process_state() -> &'static ProcessState {
    static STATE: OnceLock<ProcessState> = OnceLock::new();
    STATE.get_or_init(|| {
        let seed = uuid::Uuid::new_v4();
        let bytes = seed.as_bytes();
        let mut random = [0u8; 5];
        random.copy_from_slice(&bytes[..5]);
        let counter = u32::from_be_bytes([0, bytes[5], bytes[6], bytes[7]]);
        ProcessState {
            random,
            counter: AtomicU32::new(counter),
        }
    })
}

impl ObjectId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        Self::with_timestamp(secs)
    }

    /// Generate an identifier for the given timestamp (seconds since epoch)
    pub fn with_timestamp(secs: u32) -> Self {
        let state = process_state();
        let count = state.counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&state.random);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; OBJECT_ID_LEN] {
        self.0
    }

    /// Seconds since the Unix epoch at which this id was generated
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Canonical lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the 24-digit hex form (either case)
    ///
    /// Lengths and positions in errors count characters, not bytes.
    pub fn parse_str(s: &str) -> Result<Self, ObjectIdError> {
        let len = s.chars().count();
        if len != OBJECT_ID_HEX_LEN {
            return Err(ObjectIdError::InvalidLength {
                expected: OBJECT_ID_HEX_LEN,
                actual: len,
            });
        }

        if let Some((index, character)) = s
            .chars()
            .enumerate()
            .find(|(_, c)| !c.is_ascii_hexdigit())
        {
            return Err(ObjectIdError::InvalidHex { character, index });
        }

        let mut bytes = [0u8; OBJECT_ID_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| match e {
            hex::FromHexError::InvalidHexCharacter { c, index } => ObjectIdError::InvalidHex {
                character: c,
                index,
            },
            // Unreachable once the input is known to be 24 ASCII hex digits
            _ => ObjectIdError::InvalidLength {
                expected: OBJECT_ID_HEX_LEN,
                actual: len,
            },
        })?;
        Ok(Self(bytes))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ObjectId::parse_str(&s).map_err(de::Error::custom)
    }
}
