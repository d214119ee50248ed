//! Domain model and services for slug allocation and locking.
//!
//! The module is organised hexagonally: [`ports`] defines the store boundary
//! the service drives, everything else is transport- and storage-agnostic
//! domain logic. Policy lives in the rule registry; the allocation service is
//! generic over entity kinds and store implementations.

pub mod ports;

mod allocation;
mod candidate;
mod collision;
mod entity;
mod error;
mod rules;
mod seed_text;

pub use allocation::{
    AllocateOptions, AllocationConfig, AllocationOutcome, SlugAllocationService,
};
pub use candidate::{ResolutionPath, SlugCandidate};
pub use collision::{resolve_unique, ResolvedCandidate, SUFFIX_CEILING};
pub use entity::{EntityDocument, RelationRef, SlugRecord};
pub use error::AllocationError;
pub use rules::{
    ApprovalRequirement, EntityKind, EntityRule, EntityRules, SeedSource, UniquenessScope,
    UnknownEntityKind,
};
pub use seed_text::{preview_seed_text, resolve_seed_text, SeedText};

/// Check a slug against the format grammar.
///
/// Re-exported from the text primitives crate so delivery layers validate
/// with exactly the grammar the allocator enforces.
pub use slugtext::{validate as validate_format, SlugFormatViolation};
