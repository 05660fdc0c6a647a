#![allow(
    clippy::missing_docs_in_private_items,
    reason = "internal helpers are self-describing"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "cross-crate inlining is left to the optimizer"
)]
#![allow(
    clippy::min_ident_chars,
    reason = "generic parameters follow std naming"
)]
//! Host document backend: an arena-backed DOM mutated through batched
//! updates, structured markup, markup checksums and an HTML loader.

pub mod checksum;
pub mod dom;
pub mod markup;
pub mod parser;

pub use dom::{DOM, DOMSubscriber, DOMUpdate, MOUNT_ID_ATTR, MutationLog, NodeKey, NodeKind, NodeRef};
pub use markup::Markup;
