//! Well-known constants: the empty-directory node image and its key.
//!
//! Every implementation of this format must agree on this one value bit for
//! bit — it's the base case `make_dict` and `get_tree` terminate on, and a
//! natural sentinel for "empty directory" without round-tripping through
//! the encoder.

use crate::header::{build_flags, CtSlotClass, NodeType, HEADER_SIZE};
use crate::key::Key;

/// The 32-byte image of an empty d-node: header only, `flags=0b01`,
/// `size=0`, `count=0`, `length=32`.
pub const EMPTY_DICT_IMAGE: [u8; HEADER_SIZE] = [
    // magic "CAS\x01"
    0x43, 0x41, 0x53, 0x01,
    // flags: NodeType::Dict (0b01), CtSlotClass::None (0b00 << 2)
    0x01, 0x00, 0x00, 0x00,
    // size: 0u64
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // count: 0u32
    0x00, 0x00, 0x00, 0x00,
    // length: 32u32
    0x20, 0x00, 0x00, 0x00,
    // reserved
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// SHA-256 of `EMPTY_DICT_IMAGE`, pinned as a constant so callers needing
/// "the empty directory's key" never pay for a hash computation or a
/// backend round-trip for it.
pub const EMPTY_DICT_DIGEST: [u8; 32] = [
    0x04, 0x82, 0x11, 0x67, 0xd0, 0x26, 0xfa, 0x3b, 0x24, 0xe1, 0x60, 0xb8, 0xf9, 0xf0, 0xff, 0x2a,
    0x34, 0x2c, 0xa1, 0xf9, 0x6c, 0x78, 0xc2, 0x4b, 0x23, 0xe6, 0xa0, 0x86, 0xb7, 0x1e, 0x23, 0x91,
];

/// The canonical key for an empty directory.
pub fn empty_dict_key() -> Key {
    Key::from_digest(EMPTY_DICT_DIGEST)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Header;
    use crate::node::{encode_dict, decode_node};

    #[test]
    fn empty_dict_image_matches_encoder_output() {
        assert_eq!(encode_dict(&[]).unwrap(), EMPTY_DICT_IMAGE.to_vec());
    }

    #[test]
    fn empty_dict_image_decodes_as_expected() {
        let header = Header::from_bytes(&EMPTY_DICT_IMAGE).unwrap();
        assert_eq!(header.node_type().unwrap(), NodeType::Dict);
        assert_eq!(header.ct_slot_class(), CtSlotClass::None);
        assert_eq!(header.size, 0);
        assert_eq!(header.count, 0);
        assert_eq!(header.length, HEADER_SIZE as u32);
        assert_eq!(header.flags, build_flags(NodeType::Dict, CtSlotClass::None));

        let decoded = decode_node(&EMPTY_DICT_IMAGE).unwrap();
        assert!(decoded.children.is_none());
        assert!(decoded.child_names.is_none());
    }

    #[cfg(feature = "std")]
    #[tokio::test]
    async fn empty_dict_digest_matches_sha256_of_image() {
        use crate::backend::{Hash, Sha256Hash};
        let digest = Sha256Hash.sha256(&EMPTY_DICT_IMAGE).await;
        assert_eq!(digest, EMPTY_DICT_DIGEST);
    }
}
