//! Ephemeral slug candidates and the resolution path taken to reach them.

/// How a final candidate slug was arrived at.
///
/// Registration and preview flows phrase their copy differently depending on
/// whether a collision had to be resolved, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPath {
    /// The base slug was free; no collision occurred.
    Free,
    /// The unqualified base collided, but appending the locality qualifier
    /// yielded a free slug without resorting to a counter.
    LocalityQualified,
    /// A numeric suffix was appended to find a free slot.
    CounterSuffix {
        /// Probe counter that landed (2 for the first suffixed form).
        counter: u32,
    },
}

impl ResolutionPath {
    /// Stable machine-readable code for API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::LocalityQualified => "locality",
            Self::CounterSuffix { .. } => "counter",
        }
    }

    /// Human-readable explanation for registration and preview flows.
    pub fn explanation(&self) -> &'static str {
        match self {
            Self::Free => "no collision",
            Self::LocalityQualified => "collision resolved by adding a locality qualifier",
            Self::CounterSuffix { .. } => "collision resolved by appending a counter",
        }
    }
}

/// A slug candidate produced during one allocation or preview attempt.
///
/// Candidates are ephemeral; only the final slug is ever persisted, and only
/// by the lock transition's conditional commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugCandidate {
    /// Seed text the candidate was derived from, pre-normalization.
    pub base_text: String,
    /// Deterministic normalization of the seed text.
    pub normalized_base: String,
    /// Numeric suffix appended to the base; `0` when unsuffixed.
    pub attempt_suffix: u32,
    /// The candidate believed free as of the probe.
    pub final_slug: String,
    /// How the candidate was arrived at.
    pub path: ResolutionPath,
}
