//! Strict structural + cryptographic + semantic validator. Runs the 12
//! checks in order, stopping at the first failure.
//!
//! Structural-only mode (`validate_structural`) runs checks 1-9 with no
//! backend. Full mode (`validate_full`) additionally recomputes the hash
//! and, when `exists`/`size_of` callbacks are supplied, checks child
//! presence and (for d-nodes) size-sum consistency. This mirrors the
//! codec's own split between a pure synchronous core and an
//! async/backend-dependent layer — see `node.rs`'s module comment.

use alloc::vec::Vec;

use crate::error::CasError;
use crate::header::{Header, NodeType, CHILD_HASH_SIZE, HEADER_SIZE};
use crate::key::{Digest, Key};

/// The outcome of a successful validation: the node's kind, semantic size,
/// and (if any) its children's keys, in on-wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
    pub kind: NodeType,
    pub size: u64,
    pub child_keys: Vec<Key>,
}

struct Parsed<'a> {
    header: Header,
    kind: NodeType,
    children: Vec<Digest>,
    rest: &'a [u8],
}

/// Checks 1-9: everything that needs no backend.
fn validate_structure(bytes: &[u8]) -> Result<Parsed<'_>, CasError> {
    // 1-2: length and magic are checked by the header codec itself.
    let header = Header::from_bytes(bytes)?;

    // 3: reserved flag bits, and reserved header bytes 24..32.
    if header.has_reserved_flag_bits() {
        return Err(CasError::ReservedNonZero);
    }
    if bytes[24..32] != [0u8; 8] {
        return Err(CasError::ReservedNonZero);
    }

    // 4: declared length matches the actual buffer.
    if header.length as usize != bytes.len() {
        return Err(CasError::LengthMismatch);
    }

    // 5 (node type + slot class rules) is checked per-kind below, after
    // children bounds (check 6) so slices are safe to take.
    let kind = header.node_type()?;

    // 6: children section fits.
    let count = header.count as usize;
    let children_end = HEADER_SIZE + count * CHILD_HASH_SIZE;
    if children_end > bytes.len() {
        return Err(CasError::LengthMismatch);
    }
    let mut children = Vec::with_capacity(count);
    for i in 0..count {
        let start = HEADER_SIZE + i * CHILD_HASH_SIZE;
        let mut d = [0u8; 32];
        d.copy_from_slice(&bytes[start..start + CHILD_HASH_SIZE]);
        children.push(d);
    }

    let ct_slot = header.ct_slot_class();
    match kind {
        NodeType::Dict | NodeType::Successor => {
            if ct_slot.slot_size() != 0 {
                return Err(CasError::CtSlotInvalid);
            }
        }
        NodeType::File => {}
    }

    match kind {
        NodeType::File => {
            let slot_size = ct_slot.slot_size();
            let ct_end = children_end + slot_size;
            if ct_end > bytes.len() {
                return Err(CasError::LengthMismatch);
            }
            let slot = &bytes[children_end..ct_end];
            let content_len = content_type_len(slot);
            if slot[content_len..].iter().any(|&b| b != 0) {
                return Err(CasError::CtPaddingNonZero);
            }
            let used = &slot[..content_len];
            if !used.iter().all(|&b| (0x20..=0x7e).contains(&b)) {
                return Err(CasError::CtCharInvalid);
            }
            if crate::header::CtSlotClass::minimal_for_len(content_len) != ct_slot {
                return Err(CasError::CtSlotInvalid);
            }
            let rest = &bytes[ct_end..];
            finish_file_or_successor(header, kind, children, rest)
        }
        NodeType::Successor => {
            let align_start = children_end;
            let pad = alignment_padding(align_start);
            let data_start = align_start + pad;
            if data_start > bytes.len() {
                return Err(CasError::LengthMismatch);
            }
            if bytes[align_start..data_start].iter().any(|&b| b != 0) {
                return Err(CasError::AlignmentNonZero);
            }
            let rest = &bytes[data_start..];
            finish_file_or_successor(header, kind, children, rest)
        }
        NodeType::Dict => {
            let mut cursor = &bytes[children_end..];
            let mut names = Vec::with_capacity(count);
            for _ in 0..count {
                let (name, next) = crate::bytes::read_pascal_string(cursor)?;
                names.push(name);
                cursor = next;
            }
            for w in names.windows(2) {
                if w[0].as_bytes() >= w[1].as_bytes() {
                    return Err(CasError::NamesUnsorted);
                }
            }
            Ok(Parsed { header, kind, children, rest: cursor })
        }
    }
}

fn finish_file_or_successor<'a>(
    header: Header,
    kind: NodeType,
    children: Vec<Digest>,
    rest: &'a [u8],
) -> Result<Parsed<'a>, CasError> {
    if children.is_empty() && header.size != rest.len() as u64 {
        return Err(CasError::LeafSizeMismatch);
    }
    Ok(Parsed { header, kind, children, rest })
}

fn alignment_padding(children_end: usize) -> usize {
    let rem = children_end % 16;
    if rem == 0 {
        0
    } else {
        16 - rem
    }
}

/// Content-type bytes are always printable ASCII, which excludes `0x00`, so
/// the first zero byte unambiguously marks where the real string ends and
/// the zero-padding begins.
fn content_type_len(slot: &[u8]) -> usize {
    slot.iter().position(|&b| b == 0).unwrap_or(slot.len())
}

/// Runs checks 1-9 only (no hash recomputation, no backend lookups).
pub fn validate_structural(bytes: &[u8]) -> Result<Validated, CasError> {
    let parsed = validate_structure(bytes)?;
    Ok(Validated {
        kind: parsed.kind,
        size: parsed.header.size,
        child_keys: parsed.children.into_iter().map(Key::from_digest).collect(),
    })
}

/// Runs the full check sequence (1-12): structure, then hash, then
/// (optionally) child existence and d-node size-sum consistency.
///
/// `hash` recomputes the digest of `bytes`; `exists` and `size_of` are
/// async lookups against a storage backend and may be omitted (checks 11
/// and 12 are then skipped, matching the spec's "optionally" wording).
pub async fn validate_full<H, E, S>(
    bytes: &[u8],
    expected_key: &Key,
    hash: H,
    exists: Option<E>,
    size_of: Option<S>,
) -> Result<Validated, CasError>
where
    H: core::future::Future<Output = Digest>,
    E: Fn(Key) -> ExistsFuture,
    S: Fn(Key) -> SizeOfFuture,
{
    let parsed = validate_structure(bytes)?;

    let digest = hash.await;
    if Key::from_digest(digest) != *expected_key {
        return Err(CasError::HashMismatch);
    }

    let child_keys: Vec<Key> = parsed.children.iter().copied().map(Key::from_digest).collect();

    if let Some(exists) = exists {
        let mut missing = Vec::new();
        for key in &child_keys {
            if !exists(*key).await {
                missing.push(*key);
            }
        }
        if !missing.is_empty() {
            return Err(CasError::MissingChildren(missing));
        }
    }

    if let (NodeType::Dict, Some(size_of)) = (parsed.kind, size_of) {
        let mut total: u64 = 0;
        for key in &child_keys {
            total += size_of(*key).await;
        }
        if total != parsed.header.size {
            return Err(CasError::DictSizeMismatch);
        }
    }

    Ok(Validated {
        kind: parsed.kind,
        size: parsed.header.size,
        child_keys,
    })
}

/// Boxed future aliases kept so `validate_full`'s signature stays readable;
/// callers build these from ordinary async closures over a `Storage`.
pub type ExistsFuture = core::pin::Pin<alloc::boxed::Box<dyn core::future::Future<Output = bool> + Send>>;
pub type SizeOfFuture = core::pin::Pin<alloc::boxed::Box<dyn core::future::Future<Output = u64> + Send>>;
