#![no_std]

#[cfg(any(feature = "std", test))]
extern crate std;

// Needed for Vec, String, collections.
extern crate alloc;

pub mod bytes;
pub mod config;
pub mod constants;
pub mod error;
pub mod header;
pub mod key;
pub mod node;
pub mod topology;
pub mod validator;

#[cfg(feature = "std")]
pub mod backend;

#[cfg(feature = "std")]
pub mod controller;

pub use config::Config;
pub use constants::{empty_dict_key, EMPTY_DICT_DIGEST, EMPTY_DICT_IMAGE};
pub use error::CasError;
pub use header::{CtSlotClass, Header, NodeType};
pub use key::{Digest, Key};
pub use node::{decode_node, encode_dict, encode_file, encode_successor, DecodedNode, DictEntry};
pub use topology::{compute_layout, usable_space, LayoutNode};
pub use validator::{validate_full, validate_structural, Validated};

#[cfg(feature = "std")]
pub use backend::{Hash, InMemoryStorage, Sha256Hash, Storage};

#[cfg(feature = "std")]
pub use controller::{Controller, FileStream, NodeInfo, WriteResult};
