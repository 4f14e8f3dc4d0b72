//! Structure-aware version control for HTML documents.
//!
//! The crate derives semantic change sets over parsed HTML trees and
//! replays or reconciles them:
//!
//! - [`diff`] walks two documents and produces a [`Delta`], a
//!   hash-tagged list of path-addressed operations including
//!   character-level text edits;
//! - [`patch`] replays a delta against its base document with
//!   preconditions checked, all-or-nothing;
//! - [`merge`] reconciles two concurrent deltas over a common base,
//!   reporting conflicts or rebasing one side's operations over the
//!   other's before applying both atomically.
//!
//! The engine is a pure, synchronous library: every call owns its inputs,
//! holds no shared state, and releases everything on return. Parsing and
//! serialization sit on html5ever; round trips are compared under the
//! parse-render canonical form, never textual identity.

pub mod delta;
pub mod diff;
pub mod dom;
pub mod merge;
pub mod patch;

pub use delta::codec::CodecError;
pub use delta::{base_hash, Conflict, ConflictKind, Delta, NodePath, Op};
pub use diff::{diff, DiffError};
pub use dom::{Document, DomError, ElementData, NodeKind};
pub use merge::{merge, merge_all, MergeError, MergeOutcome};
pub use patch::{patch, ApplyError, PatchError};
