//! Identifier aliases shared across the control plane.
//!
//! All identifiers are opaque strings, client- or server-chosen per the
//! data model in spec.md §3. Keeping them as plain `String` (rather than
//! newtypes) matches how the rest of the corpus treats composite-key ids.

/// Opaque, client-chosen identity for an engine node. Unique per
/// registration lifetime (a re-registered node after OFFLINE gets a new
/// record, but may reuse the same `node_id` string).
pub type NodeId = String;

/// `<node_id>-<container_id>-<internal_id>`, stable after creation.
pub type MatchId = String;

/// Player identity as asserted by `IdentityService`.
pub type PlayerId = String;

/// `(name, version)` identifies a `ModuleMetadata` record.
pub type ModuleName = String;
pub type ModuleVersion = String;
