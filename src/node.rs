//! Node codec: assembles and parses the three node kinds (file, successor,
//! dict). See the format's header and body-layout rules for the exact byte
//! shape of each kind.
//!
//! Hashing is deliberately kept out of this module. Only the controller
//! treats I/O and hash computation as suspension points; this codec stays a
//! pure, synchronous, `no_std` transform from structured input to canonical
//! bytes (and back). The controller is responsible for handing the
//! assembled image to the injected `Hash` backend and persisting the result.

use alloc::string::String;
use alloc::vec::Vec;

use crate::bytes::{concat, read_pascal_string, write_pascal_string};
use crate::error::CasError;
use crate::header::{
    build_flags, CtSlotClass, Header, NodeType, CHILD_HASH_SIZE, HEADER_SIZE,
    MAX_CONTENT_TYPE_LEN,
};
use crate::key::Digest;

/// One (name, child digest, child size) triple for dict encoding. Sizes are
/// needed because a d-node's `size` is the sum of its children's sizes —
/// the caller must have already looked these up (see `controller::make_dict`).
#[derive(Debug, Clone)]
pub struct DictEntry {
    pub name: String,
    pub key: Digest,
    pub size: u64,
}

/// The result of decoding any node image: a single kind-tagged struct with
/// all kind-specific fields optional. Absent optional sections (no
/// children, no content-type, no names) are `None`, not empty vectors —
/// this lets callers distinguish "no children" from "zero children listed"
/// with a single pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedNode {
    pub kind: NodeType,
    pub size: u64,
    pub content_type: Option<String>,
    pub children: Option<Vec<Digest>>,
    pub child_names: Option<Vec<String>>,
    /// Inline data for f/s-nodes. Always `Some` (possibly empty) for those
    /// kinds; always `None` for d-nodes, which carry no inline data.
    pub data: Option<Vec<u8>>,
}

fn alignment_padding(children_end: usize) -> usize {
    let rem = children_end % 16;
    if rem == 0 {
        0
    } else {
        16 - rem
    }
}

fn assemble(flags: u32, size: u64, children: &[Digest], body: &[u8]) -> Vec<u8> {
    let count = children.len() as u32;
    let child_bytes: Vec<u8> = children.iter().flat_map(|d| d.iter().copied()).collect();
    let length = (HEADER_SIZE + child_bytes.len() + body.len()) as u32;
    let header = Header { flags, size, count, length };
    concat(&[&header.to_bytes(), &child_bytes, body])
}

/// Validates a content-type string against the wire constraints (printable
/// ASCII, length `<= MAX_CONTENT_TYPE_LEN`) before it is ever written.
fn check_content_type(ct: &str) -> Result<(), CasError> {
    if ct.len() > MAX_CONTENT_TYPE_LEN {
        return Err(CasError::CtCharInvalid);
    }
    if !ct.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        return Err(CasError::CtCharInvalid);
    }
    Ok(())
}

/// Encodes an f-node (file root).
///
/// `size` is the logical size of the subtree this node roots: for a leaf
/// (no children) this must equal `data.len()`; for an internal node, the
/// caller (the topology-walking controller) supplies the subtree total.
pub fn encode_file(
    data: &[u8],
    content_type: Option<&str>,
    children: &[Digest],
    size: u64,
) -> Result<Vec<u8>, CasError> {
    let ct_slot = match content_type {
        Some(ct) if !ct.is_empty() => {
            check_content_type(ct)?;
            CtSlotClass::minimal_for_len(ct.len())
        }
        _ => CtSlotClass::None,
    };

    let mut body = Vec::with_capacity(ct_slot.slot_size() + data.len());
    if ct_slot.slot_size() > 0 {
        let ct = content_type.unwrap_or("");
        let mut slot = alloc::vec![0u8; ct_slot.slot_size()];
        slot[..ct.len()].copy_from_slice(ct.as_bytes());
        body.extend_from_slice(&slot);
    }
    body.extend_from_slice(data);

    let flags = build_flags(NodeType::File, ct_slot);
    Ok(assemble(flags, size, children, &body))
}

/// Encodes an s-node (interior or leaf file continuation chunk).
pub fn encode_successor(data: &[u8], children: &[Digest], size: u64) -> Result<Vec<u8>, CasError> {
    let children_end = HEADER_SIZE + children.len() * CHILD_HASH_SIZE;
    let pad = alignment_padding(children_end);
    let mut body = Vec::with_capacity(pad + data.len());
    body.extend(core::iter::repeat(0u8).take(pad));
    body.extend_from_slice(data);

    let flags = build_flags(NodeType::Successor, CtSlotClass::None);
    Ok(assemble(flags, size, children, &body))
}

/// Encodes a d-node (directory). Sorts entries by UTF-8 byte order of their
/// names for canonical, input-order-independent hashing; rejects duplicate
/// names. `size` is the sum of the entries' sizes.
pub fn encode_dict(entries: &[DictEntry]) -> Result<Vec<u8>, CasError> {
    let mut sorted: Vec<&DictEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));

    for w in sorted.windows(2) {
        if w[0].name == w[1].name {
            return Err(CasError::DuplicateName);
        }
    }

    let children: Vec<Digest> = sorted.iter().map(|e| e.key).collect();
    let total_size: u64 = sorted.iter().map(|e| e.size).sum();

    let mut names_body = Vec::new();
    for e in &sorted {
        write_pascal_string(&mut names_body, &e.name)?;
    }

    let flags = build_flags(NodeType::Dict, CtSlotClass::None);
    Ok(assemble(flags, total_size, &children, &names_body))
}

/// Decodes any node image. Performs only the bounds checks needed to slice
/// the buffer correctly; the full set of structural/semantic invariants
/// (reserved bits, length match, padding zero-ness, name ordering, ...) is
/// the validator's job (`validator.rs`), run independently and exhaustively.
pub fn decode_node(bytes: &[u8]) -> Result<DecodedNode, CasError> {
    let header = Header::from_bytes(bytes)?;
    let kind = header.node_type()?;

    let count = header.count as usize;
    let children_end = HEADER_SIZE + count * CHILD_HASH_SIZE;
    if children_end > bytes.len() {
        return Err(CasError::ShortBuffer);
    }
    let children = if count == 0 {
        None
    } else {
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let start = HEADER_SIZE + i * CHILD_HASH_SIZE;
            let mut d = [0u8; 32];
            d.copy_from_slice(&bytes[start..start + CHILD_HASH_SIZE]);
            out.push(d);
        }
        Some(out)
    };

    match kind {
        NodeType::File => {
            let ct_slot = header.ct_slot_class();
            let slot_size = ct_slot.slot_size();
            let ct_end = children_end + slot_size;
            if ct_end > bytes.len() {
                return Err(CasError::ShortBuffer);
            }
            let content_type = if slot_size == 0 {
                None
            } else {
                let slot = &bytes[children_end..ct_end];
                let trimmed = trim_trailing_zeros(slot);
                Some(
                    core::str::from_utf8(trimmed)
                        .map_err(|_| CasError::CtCharInvalid)?
                        .into(),
                )
            };
            let data = bytes[ct_end..].to_vec();
            Ok(DecodedNode {
                kind,
                size: header.size,
                content_type,
                children,
                child_names: None,
                data: Some(data),
            })
        }
        NodeType::Successor => {
            let pad = alignment_padding(children_end);
            let data_start = children_end + pad;
            if data_start > bytes.len() {
                return Err(CasError::ShortBuffer);
            }
            let data = bytes[data_start..].to_vec();
            Ok(DecodedNode {
                kind,
                size: header.size,
                content_type: None,
                children,
                child_names: None,
                data: Some(data),
            })
        }
        NodeType::Dict => {
            let mut cursor = &bytes[children_end..];
            let mut names = Vec::with_capacity(count);
            for _ in 0..count {
                let (name, rest) = read_pascal_string(cursor)?;
                names.push(name);
                cursor = rest;
            }
            let child_names = if count == 0 { None } else { Some(names) };
            Ok(DecodedNode {
                kind,
                size: header.size,
                content_type: None,
                children,
                child_names,
                data: None,
            })
        }
    }
}

fn trim_trailing_zeros(bytes: &[u8]) -> &[u8] {
    let mut end = bytes.len();
    while end > 0 && bytes[end - 1] == 0 {
        end -= 1;
    }
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    fn digest(b: u8) -> Digest {
        [b; 32]
    }

    #[test]
    fn file_leaf_round_trip() {
        let data = [1u8, 2, 3, 4, 5];
        let bytes = encode_file(&data, Some("application/octet-stream"), &[], data.len() as u64).unwrap();
        let decoded = decode_node(&bytes).unwrap();
        assert_eq!(decoded.kind, NodeType::File);
        assert_eq!(decoded.size, 5);
        assert_eq!(decoded.content_type.as_deref(), Some("application/octet-stream"));
        assert!(decoded.children.is_none());
        assert_eq!(decoded.data.unwrap(), data);
    }

    #[test]
    fn file_empty_no_content_type() {
        let bytes = encode_file(&[], None, &[], 0).unwrap();
        let decoded = decode_node(&bytes).unwrap();
        assert_eq!(decoded.size, 0);
        assert!(decoded.content_type.is_none());
        assert_eq!(decoded.data.unwrap().len(), 0);
        assert_eq!(bytes.len(), HEADER_SIZE);
    }

    #[test]
    fn file_content_type_picks_minimal_slot() {
        let short = encode_file(&[], Some("a"), &[], 0).unwrap();
        assert_eq!(short.len(), HEADER_SIZE + 16);
        let medium = encode_file(&[], Some(&"a".repeat(17)), &[], 0).unwrap();
        assert_eq!(medium.len(), HEADER_SIZE + 32);
        let large = encode_file(&[], Some(&"a".repeat(33)), &[], 0).unwrap();
        assert_eq!(large.len(), HEADER_SIZE + 64);
    }

    #[test]
    fn file_with_children_round_trip() {
        let children = [digest(1), digest(2)];
        let bytes = encode_file(&[9, 9], None, &children, 500).unwrap();
        let decoded = decode_node(&bytes).unwrap();
        assert_eq!(decoded.children.unwrap(), children.to_vec());
        assert_eq!(decoded.size, 500);
    }

    #[test]
    fn successor_alignment_padding_is_zero() {
        let children = [digest(1)];
        let bytes = encode_successor(&[1, 2, 3], &children, 3).unwrap();
        let children_end = HEADER_SIZE + CHILD_HASH_SIZE;
        let pad = alignment_padding(children_end);
        assert_eq!(&bytes[children_end..children_end + pad], vec![0u8; pad].as_slice());
        let decoded = decode_node(&bytes).unwrap();
        assert_eq!(decoded.data.unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn successor_no_children_no_padding_needed() {
        // children_end == HEADER_SIZE == 32, already 16-byte aligned.
        let bytes = encode_successor(&[7u8; 10], &[], 10).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 10);
    }

    #[test]
    fn dict_sorts_and_dedups() {
        let entries = vec![
            DictEntry { name: "zebra".to_string(), key: digest(3), size: 10 },
            DictEntry { name: "alpha".to_string(), key: digest(1), size: 20 },
            DictEntry { name: "beta".to_string(), key: digest(2), size: 30 },
        ];
        let bytes = encode_dict(&entries).unwrap();
        let decoded = decode_node(&bytes).unwrap();
        assert_eq!(decoded.kind, NodeType::Dict);
        assert_eq!(decoded.child_names.unwrap(), vec!["alpha", "beta", "zebra"]);
        assert_eq!(decoded.children.unwrap(), vec![digest(1), digest(2), digest(3)]);
        assert_eq!(decoded.size, 60);
    }

    #[test]
    fn dict_is_canonical_regardless_of_input_order() {
        let a = vec![
            DictEntry { name: "a".to_string(), key: digest(1), size: 1 },
            DictEntry { name: "b".to_string(), key: digest(2), size: 2 },
        ];
        let b = vec![
            DictEntry { name: "b".to_string(), key: digest(2), size: 2 },
            DictEntry { name: "a".to_string(), key: digest(1), size: 1 },
        ];
        assert_eq!(encode_dict(&a).unwrap(), encode_dict(&b).unwrap());
    }

    #[test]
    fn dict_rejects_duplicate_names() {
        let entries = vec![
            DictEntry { name: "x".to_string(), key: digest(1), size: 1 },
            DictEntry { name: "x".to_string(), key: digest(2), size: 2 },
        ];
        assert!(matches!(encode_dict(&entries), Err(CasError::DuplicateName)));
    }

    #[test]
    fn empty_dict_is_32_bytes() {
        let bytes = encode_dict(&[]).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE);
        let decoded = decode_node(&bytes).unwrap();
        assert_eq!(decoded.size, 0);
        assert!(decoded.children.is_none());
        assert!(decoded.child_names.is_none());
    }

    proptest::proptest! {
        /// Any leaf f-node round-trips its data exactly, for arbitrary
        /// data and an arbitrary valid (short, printable-ASCII) content type.
        #[test]
        fn file_leaf_round_trips_arbitrary_data(
            data in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..512),
            ct in proptest::option::of("[ -~]{0,64}"),
        ) {
            let bytes = encode_file(&data, ct.as_deref(), &[], data.len() as u64).unwrap();
            let decoded = decode_node(&bytes).unwrap();
            proptest::prop_assert_eq!(decoded.data.unwrap(), data.clone());
            proptest::prop_assert_eq!(decoded.size, data.len() as u64);
            match &ct {
                Some(s) if !s.is_empty() => proptest::prop_assert_eq!(decoded.content_type.as_deref(), Some(s.as_str())),
                _ => proptest::prop_assert!(decoded.content_type.is_none()),
            }
        }

        /// A dict's hash is stable under any permutation of its entries, and
        /// its decoded names always come back sorted.
        #[test]
        fn dict_is_stable_under_permutation(
            mut names in proptest::collection::hash_set("[a-z]{1,8}", 1..8usize),
        ) {
            let mut entries: Vec<DictEntry> = names
                .drain()
                .enumerate()
                .map(|(i, name)| DictEntry { name, key: digest(i as u8), size: i as u64 })
                .collect();
            let baseline = encode_dict(&entries).unwrap();

            entries.reverse();
            let reversed = encode_dict(&entries).unwrap();
            proptest::prop_assert_eq!(baseline.clone(), reversed);

            let decoded = decode_node(&baseline).unwrap();
            let decoded_names = decoded.child_names.unwrap();
            let mut sorted_names = decoded_names.clone();
            sorted_names.sort();
            proptest::prop_assert_eq!(decoded_names, sorted_names);
        }
    }
}
