//! Allocation error taxonomy.
//!
//! Terminal errors will not succeed on retry until external state changes
//! (an approval is granted, data is fixed); exhaustion errors may be retried
//! later. Transient store conflicts during the lock commit never appear
//! here — the allocation service recovers them internally up to its retry
//! ceiling and only surfaces [`AllocationError::RetriesExhausted`].

use slugtext::SlugFormatViolation;
use uuid::Uuid;

use crate::domain::ports::DirectoryStoreError;
use crate::domain::rules::UnknownEntityKind;
use crate::domain::EntityKind;

/// Failure modes of slug allocation and lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    /// The requested entity kind is not registered.
    #[error(transparent)]
    UnknownEntityKind(#[from] UnknownEntityKind),

    /// The entity to allocate for does not exist.
    #[error("{kind} {id} not found")]
    EntityNotFound {
        /// Entity kind.
        kind: EntityKind,
        /// Entity identifier.
        id: Uuid,
    },

    /// The entity has not passed its kind's approval gate. Callers must not
    /// retry until the gate's state changes.
    #[error("{kind} {id} has not passed its approval gate")]
    ApprovalRequired {
        /// Entity kind.
        kind: EntityKind,
        /// Entity identifier.
        id: Uuid,
    },

    /// The declared seed field (or a required join) is empty or missing.
    #[error("seed text field {field:?} is empty or missing")]
    MissingSourceField {
        /// Name of the missing field.
        field: String,
    },

    /// A resolved candidate violated the slug grammar. This indicates a
    /// normalizer or policy bug and is logged at error level rather than
    /// silently falling back.
    #[error("candidate slug {slug:?} violates the format grammar: {violation}")]
    InvalidSlugFormat {
        /// The offending candidate.
        slug: String,
        /// The grammar violation.
        violation: SlugFormatViolation,
    },

    /// Every candidate up to the probe ceiling was occupied.
    #[error("no free candidate for base {base:?} within {ceiling} probes")]
    SuffixExhausted {
        /// Normalized base that was probed.
        base: String,
        /// Probe ceiling that was hit.
        ceiling: u32,
    },

    /// The conditional commit lost every race up to the retry ceiling.
    #[error("slug commit lost {attempts} consecutive races; retry later")]
    RetriesExhausted {
        /// Number of commit attempts made.
        attempts: u32,
    },

    /// The caller asked for a specific slug text on an entity whose slug is
    /// already locked, without forcing regeneration.
    #[error("{kind} {id} already holds locked slug {slug:?}")]
    AlreadyLocked {
        /// Entity kind.
        kind: EntityKind,
        /// Entity identifier.
        id: Uuid,
        /// The slug already held.
        slug: String,
    },

    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] DirectoryStoreError),
}

impl AllocationError {
    /// Whether retrying without an external state change is pointless.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::UnknownEntityKind(_)
                | Self::EntityNotFound { .. }
                | Self::ApprovalRequired { .. }
                | Self::MissingSourceField { .. }
                | Self::InvalidSlugFormat { .. }
                | Self::AlreadyLocked { .. }
        )
    }

    /// Whether the caller may retry later (exhaustion or store trouble).
    pub fn is_retryable(&self) -> bool {
        !self.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_required_is_terminal() {
        let err = AllocationError::ApprovalRequired {
            kind: EntityKind::Clinic,
            id: Uuid::new_v4(),
        };
        assert!(err.is_terminal());
        assert!(!err.is_retryable());
    }

    #[test]
    fn exhaustion_and_store_errors_are_retryable() {
        assert!(AllocationError::RetriesExhausted { attempts: 5 }.is_retryable());
        assert!(AllocationError::SuffixExhausted {
            base: "dr-jane-smith".to_owned(),
            ceiling: 1000
        }
        .is_retryable());
        assert!(
            AllocationError::Store(DirectoryStoreError::connection("pool unavailable"))
                .is_retryable()
        );
    }

    #[test]
    fn unknown_kind_converts_from_parse_error() {
        let err: AllocationError = "pharmacy"
            .parse::<EntityKind>()
            .expect_err("unregistered kind")
            .into();
        assert!(matches!(err, AllocationError::UnknownEntityKind(_)));
        assert!(err.to_string().contains("pharmacy"));
    }
}
