//! Islands
//!
//! An island is a named, template-backed rendering unit with props, child
//! islands, and an optional per-request payload.
//!
//! # Composition
//!
//! Islands nest. Every child is attached in one of two modes:
//!
//! - **Eager**: the child is rendered before its parent and the resulting HTML
//!   string is placed in the parent's bag under `.children.<name>`.
//! - **Lazy**: the child handle itself is placed in the bag. The parent's
//!   template renders it on demand with `{{ .children.<name>.Render }}`, or
//!   not at all.
//!
//! Lazy is strictly more expressive: an eager child is exactly a lazy child
//! whose `Render` is called unconditionally up front.
//!
//! # Hydration
//!
//! Hydration attaches request-scoped JSON (`.payload.*`) to an island right
//! before rendering. Each hydration replaces the previous payload wholesale,
//! so rendering is idempotent on props and template but not on payload.
//!
//! # Sharing
//!
//! [`Island`] is a cheap handle; clones point at the same node. Mutations go
//! through a lock, so sharing a handle across threads is memory-safe, but
//! hydrate-then-render on a shared handle is still a logical race. Serve each
//! request from its own [`Island::fork`], which shares the immutable name and
//! template and copies the props and child handles.
//!
//! Cycles are not detected. A child that reaches its own ancestor recurses
//! without bound when rendered eagerly.

mod bag;
mod node;

pub use bag::{AttributeBag, ChildSlot, Props};
pub use node::{must_render, ChildMode, Island};
