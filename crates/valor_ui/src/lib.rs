#![allow(
    clippy::missing_docs_in_private_items,
    reason = "internal helpers are self-describing"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "cross-crate inlining is left to the optimizer"
)]
#![allow(
    clippy::cast_possible_truncation,
    reason = "operation counts fit in u64"
)]
#![allow(
    clippy::module_name_repetitions,
    reason = "public types are re-exported at the crate root"
)]
//! Declarative component runtime.
//!
//! Components are [`ComponentClass`]es that render [`Element`] descriptions.
//! A [`Ui`] mounts element trees into containers of a host [`html::DOM`],
//! keeps the resulting instance tree, and reconciles it against new
//! descriptions with the fewest document mutations it can find. All state and
//! props changes go through one batch per [`Ui`] and are flushed parent
//! first, each instance at most once per pass.

mod batch;
mod component;
mod config;
mod diff;
mod element;
mod error;
mod instance;
mod mount;
mod reconcile;
mod runtime;
mod server;
mod telemetry;
mod transfer;
mod value;

pub use batch::{BatchEvent, BatchPhase, transition};
pub use component::{
    Callback, ComponentClass, ComponentClassBuilder, Hook, Hooks, RenderScope, Scope, UpdateArgs,
};
pub use config::{DEFAULT_BULK_THRESHOLD, UiConfig};
pub use diff::{ChildDiff, ChildStep, diff_children};
pub use element::{Children, Element, ElementBuilder, ElementType, Owner, host};
pub use error::UiError;
pub use instance::{DOCUMENT_LEVEL_TAGS, Instance, InstanceId, InstanceKind, Lifecycle};
pub use runtime::Ui;
pub use server::{render_to_string, render_to_string_with};
pub use telemetry::ReconcileCounters;
pub use transfer::{clone_with_props, merge_props};
pub use value::{Value, ValueMap, merge_into};
