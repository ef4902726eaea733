//! Deterministic snapshot encoding for emulated I/O devices.
//!
//! The snapshot format is a small tag-length-value (TLV) encoding that provides:
//! - deterministic byte output (fields are emitted in the order the device
//!   writes them, with fixed-width little-endian scalars)
//! - explicit device identity and versioning (4-byte id + major/minor)
//! - strict decoding: duplicate tags, truncated fields and trailing bytes are
//!   errors, so a layout mismatch between the saved blob and the live device
//!   surfaces as a hard load failure instead of silently misrestored state.

#![forbid(unsafe_code)]

pub mod codec;

use thiserror::Error;

pub type SnapshotResult<T> = std::result::Result<T, SnapshotError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot device id mismatch: expected {expected:?}, found {found:?}")]
    DeviceIdMismatch { expected: [u8; 4], found: [u8; 4] },
    #[error("unsupported device snapshot major version: expected {expected}, found {found}")]
    UnsupportedDeviceMajorVersion { expected: u8, found: u8 },
    #[error("missing required snapshot field (tag {tag})")]
    MissingField { tag: u16 },
    #[error("invalid encoding for snapshot field (tag {tag})")]
    InvalidFieldEncoding { tag: u16 },
    #[error("corrupt snapshot: {0}")]
    Corrupt(&'static str),
}

/// Device snapshot version. Bumping `major` breaks compatibility; `minor` is
/// informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotVersion {
    pub major: u8,
    pub minor: u8,
}

impl SnapshotVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

/// Snapshotting contract for emulated devices.
///
/// Implementations must keep `DEVICE_ID` stable forever. `load_state` must
/// either fully restore the device or leave an error; partially-applied
/// restores are not part of the contract.
pub trait IoSnapshot {
    const DEVICE_ID: [u8; 4];
    const DEVICE_VERSION: SnapshotVersion;

    fn save_state(&self) -> Vec<u8>;
    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()>;
}

const HEADER_LEN: usize = 4 + 2;
const FIELD_HEADER_LEN: usize = 2 + 4;

/// Serializes tagged fields for one device blob.
pub struct SnapshotWriter {
    buf: Vec<u8>,
}

impl SnapshotWriter {
    pub fn new(device_id: [u8; 4], version: SnapshotVersion) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&device_id);
        buf.push(version.major);
        buf.push(version.minor);
        Self { buf }
    }

    fn field(&mut self, tag: u16, payload: &[u8]) {
        self.buf.extend_from_slice(&tag.to_le_bytes());
        self.buf
            .extend_from_slice(&(payload.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(payload);
    }

    pub fn field_bool(&mut self, tag: u16, value: bool) {
        self.field(tag, &[value as u8]);
    }

    pub fn field_u8(&mut self, tag: u16, value: u8) {
        self.field(tag, &[value]);
    }

    pub fn field_u16(&mut self, tag: u16, value: u16) {
        self.field(tag, &value.to_le_bytes());
    }

    pub fn field_u32(&mut self, tag: u16, value: u32) {
        self.field(tag, &value.to_le_bytes());
    }

    pub fn field_u64(&mut self, tag: u16, value: u64) {
        self.field(tag, &value.to_le_bytes());
    }

    pub fn field_bytes(&mut self, tag: u16, payload: Vec<u8>) {
        self.field(tag, &payload);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Parses one device blob and resolves fields by tag.
#[derive(Debug)]
pub struct SnapshotReader<'a> {
    version: SnapshotVersion,
    fields: Vec<(u16, &'a [u8])>,
}

impl<'a> SnapshotReader<'a> {
    pub fn parse(bytes: &'a [u8], device_id: [u8; 4]) -> SnapshotResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(SnapshotError::Corrupt("snapshot shorter than header"));
        }
        let found: [u8; 4] = bytes[..4].try_into().unwrap();
        if found != device_id {
            return Err(SnapshotError::DeviceIdMismatch {
                expected: device_id,
                found,
            });
        }
        let version = SnapshotVersion::new(bytes[4], bytes[5]);

        let mut fields: Vec<(u16, &[u8])> = Vec::new();
        let mut rest = &bytes[HEADER_LEN..];
        while !rest.is_empty() {
            if rest.len() < FIELD_HEADER_LEN {
                return Err(SnapshotError::Corrupt("truncated field header"));
            }
            let tag = u16::from_le_bytes(rest[..2].try_into().unwrap());
            let len = u32::from_le_bytes(rest[2..6].try_into().unwrap()) as usize;
            rest = &rest[FIELD_HEADER_LEN..];
            if rest.len() < len {
                return Err(SnapshotError::Corrupt("truncated field payload"));
            }
            if fields.iter().any(|(t, _)| *t == tag) {
                return Err(SnapshotError::Corrupt("duplicate field tag"));
            }
            fields.push((tag, &rest[..len]));
            rest = &rest[len..];
        }

        Ok(Self { version, fields })
    }

    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    pub fn ensure_device_major(&self, expected: u8) -> SnapshotResult<()> {
        if self.version.major != expected {
            return Err(SnapshotError::UnsupportedDeviceMajorVersion {
                expected,
                found: self.version.major,
            });
        }
        Ok(())
    }

    pub fn bytes(&self, tag: u16) -> Option<&'a [u8]> {
        self.fields
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, payload)| *payload)
    }

    fn scalar<const N: usize>(&self, tag: u16) -> SnapshotResult<Option<[u8; N]>> {
        match self.bytes(tag) {
            None => Ok(None),
            Some(payload) => payload
                .try_into()
                .map(Some)
                .map_err(|_| SnapshotError::InvalidFieldEncoding { tag }),
        }
    }

    pub fn bool(&self, tag: u16) -> SnapshotResult<Option<bool>> {
        Ok(self.scalar::<1>(tag)?.map(|b| b[0] != 0))
    }

    pub fn u8(&self, tag: u16) -> SnapshotResult<Option<u8>> {
        Ok(self.scalar::<1>(tag)?.map(|b| b[0]))
    }

    pub fn u16(&self, tag: u16) -> SnapshotResult<Option<u16>> {
        Ok(self.scalar::<2>(tag)?.map(u16::from_le_bytes))
    }

    pub fn u32(&self, tag: u16) -> SnapshotResult<Option<u32>> {
        Ok(self.scalar::<4>(tag)?.map(u32::from_le_bytes))
    }

    pub fn u64(&self, tag: u16) -> SnapshotResult<Option<u64>> {
        Ok(self.scalar::<8>(tag)?.map(u64::from_le_bytes))
    }
}
