// src/error.rs

use alloc::string::String;
use alloc::vec::Vec;

use crate::key::Key;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasError {
    /// Input is shorter than 32 bytes, or shorter than `header.length`.
    ShortBuffer,

    /// Magic bytes did not match `0x01534143`.
    BadMagic,

    /// Flags bits 0-1 decoded to the invalid type `0b00`.
    BadNodeType,

    /// Reserved flag bits or reserved header bytes were non-zero.
    ReservedNonZero,

    /// `header.length` did not equal the actual buffer length.
    LengthMismatch,

    /// A d-node/s-node had a non-zero content-type slot class, or an
    /// f-node's slot was not the minimal class for its content-type length.
    CtSlotInvalid,

    /// Content-type slot bytes were not printable ASCII.
    CtCharInvalid,

    /// Content-type slot tail bytes (beyond the actual string) were not zero.
    CtPaddingNonZero,

    /// s-node alignment padding between children and data was not zero.
    AlignmentNonZero,

    /// A leaf f/s-node's `header.size` did not equal its data length.
    LeafSizeMismatch,

    /// A d-node name did not decode as valid UTF-8.
    InvalidUtf8Name,

    /// d-node names were not strictly ascending in UTF-8 byte order.
    NamesUnsorted,

    /// The dict encoder received a duplicate name.
    DuplicateName,

    /// A Pascal string claimed more bytes than the buffer holds.
    PascalOverflow,

    /// Recomputed digest did not equal the declared/expected key.
    HashMismatch,

    /// One or more child keys referenced by a node are not present in storage.
    MissingChildren(Vec<Key>),

    /// A d-node's `header.size` did not equal the sum of its children's sizes.
    DictSizeMismatch,

    /// The dict encoder received parallel arrays (names, keys, sizes) of
    /// mismatched length.
    CountMismatch,

    /// The configured node limit is below the minimum the planner can
    /// satisfy (header + one child hash + one alignment quantum).
    NodeLimitTooSmall,

    /// A key string did not match `sha256:` + 64 lowercase hex chars.
    InvalidKeyFormat,

    /// The storage backend reported an I/O failure. Carries the backend's
    /// own message; the controller does not retry these.
    Storage(String),
}

impl core::fmt::Display for CasError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ShortBuffer => write!(f, "buffer shorter than header or declared length"),
            Self::BadMagic => write!(f, "magic bytes do not match CAS\\x01"),
            Self::BadNodeType => write!(f, "node type bits decode to the reserved value 0b00"),
            Self::ReservedNonZero => write!(f, "reserved flag bits or reserved header bytes are non-zero"),
            Self::LengthMismatch => write!(f, "header.length does not equal the buffer length"),
            Self::CtSlotInvalid => write!(f, "content-type slot class is not the minimal fit, or non-zero on a node kind without a slot"),
            Self::CtCharInvalid => write!(f, "content-type slot contains a non-printable-ASCII byte"),
            Self::CtPaddingNonZero => write!(f, "content-type slot tail bytes are not zero"),
            Self::AlignmentNonZero => write!(f, "s-node alignment padding is not zero"),
            Self::LeafSizeMismatch => write!(f, "leaf node's header.size does not equal its data length"),
            Self::InvalidUtf8Name => write!(f, "dict entry name is not valid UTF-8"),
            Self::NamesUnsorted => write!(f, "dict entry names are not strictly ascending"),
            Self::DuplicateName => write!(f, "dict encoder received a duplicate name"),
            Self::PascalOverflow => write!(f, "Pascal string claims more bytes than are available"),
            Self::HashMismatch => write!(f, "recomputed digest does not match the expected key"),
            Self::MissingChildren(keys) => write!(f, "{} child key(s) not present in storage", keys.len()),
            Self::DictSizeMismatch => write!(f, "dict header.size does not equal the sum of child sizes"),
            Self::CountMismatch => write!(f, "encoder received parallel arrays of mismatched length"),
            Self::NodeLimitTooSmall => write!(f, "node limit is below the minimum the planner can satisfy"),
            Self::InvalidKeyFormat => write!(f, "key is not sha256: followed by 64 lowercase hex chars"),
            Self::Storage(msg) => write!(f, "storage backend error: {}", msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CasError {}
