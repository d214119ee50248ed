//! Collision resolution over a uniqueness probe.
//!
//! Probes run strictly sequentially: suffix counters are deterministic
//! tie-break order, so parallel probing would buy nothing and widen the race
//! window between probe and commit. Staleness in the probe only costs a
//! wasted retry — the store's constraint re-validates at commit time.

use std::future::Future;

use crate::domain::error::AllocationError;
use crate::domain::ports::DirectoryStoreError;

/// Default ceiling on sequential candidate probes.
pub const SUFFIX_CEILING: u32 = 1000;

/// A candidate the probe reported free, with the counter that landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCandidate {
    /// The free candidate slug.
    pub slug: String,
    /// Probe counter: `1` is the unsuffixed base, `2` the first suffixed
    /// form (`base-2`), and so on.
    pub counter: u32,
}

impl ResolvedCandidate {
    /// Numeric suffix carried by the candidate; `0` when unsuffixed.
    pub fn attempt_suffix(&self) -> u32 {
        if self.counter > 1 { self.counter } else { 0 }
    }
}

/// Probe candidates derived from `base` until one is free.
///
/// Tries `base` first, then `base-2`, `base-3`, … — the unsuffixed form is
/// attempt one, so counters start at two. The suffix order is deterministic
/// and reproducible for a fixed base and a fixed observed existing-set.
///
/// # Errors
///
/// [`AllocationError::SuffixExhausted`] once `ceiling` candidates were all
/// occupied, guaranteeing termination; store failures propagate.
pub async fn resolve_unique<F, Fut>(
    base: &str,
    ceiling: u32,
    mut exists: F,
) -> Result<ResolvedCandidate, AllocationError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, DirectoryStoreError>>,
{
    for counter in 1..=ceiling {
        let candidate = if counter == 1 {
            base.to_owned()
        } else {
            slugtext::with_suffix(base, counter)
        };

        if !exists(candidate.clone()).await? {
            return Ok(ResolvedCandidate {
                slug: candidate,
                counter,
            });
        }
    }

    Err(AllocationError::SuffixExhausted {
        base: base.to_owned(),
        ceiling,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    async fn resolve_against(
        base: &str,
        ceiling: u32,
        taken: &HashSet<String>,
    ) -> Result<ResolvedCandidate, AllocationError> {
        resolve_unique(base, ceiling, |candidate| {
            let hit = taken.contains(&candidate);
            async move { Ok(hit) }
        })
        .await
    }

    #[tokio::test]
    async fn free_base_resolves_unsuffixed() {
        let taken = HashSet::new();
        let resolved = resolve_against("city-dental-clinic", SUFFIX_CEILING, &taken)
            .await
            .expect("base is free");

        assert_eq!(resolved.slug, "city-dental-clinic");
        assert_eq!(resolved.counter, 1);
        assert_eq!(resolved.attempt_suffix(), 0);
    }

    #[tokio::test]
    async fn first_collision_lands_on_suffix_two() {
        let taken = HashSet::from(["city-dental-clinic".to_owned()]);
        let resolved = resolve_against("city-dental-clinic", SUFFIX_CEILING, &taken)
            .await
            .expect("suffix two is free");

        assert_eq!(resolved.slug, "city-dental-clinic-2");
        assert_eq!(resolved.attempt_suffix(), 2);
    }

    #[tokio::test]
    async fn suffixes_advance_past_a_dense_prefix() {
        let taken = HashSet::from([
            "dr-john-smith".to_owned(),
            "dr-john-smith-2".to_owned(),
            "dr-john-smith-3".to_owned(),
        ]);
        let resolved = resolve_against("dr-john-smith", SUFFIX_CEILING, &taken)
            .await
            .expect("suffix four is free");

        assert_eq!(resolved.slug, "dr-john-smith-4");
    }

    #[tokio::test]
    async fn exhaustion_terminates_at_the_ceiling() {
        let err = resolve_unique("dr-john-smith", 4, |_| async { Ok(true) })
            .await
            .expect_err("everything is taken");

        assert_eq!(
            err,
            AllocationError::SuffixExhausted {
                base: "dr-john-smith".to_owned(),
                ceiling: 4
            }
        );
    }

    #[tokio::test]
    async fn resolution_is_deterministic_for_a_fixed_snapshot() {
        let taken = HashSet::from(["harley-clinic".to_owned(), "harley-clinic-2".to_owned()]);

        let first = resolve_against("harley-clinic", SUFFIX_CEILING, &taken)
            .await
            .expect("resolves");
        let second = resolve_against("harley-clinic", SUFFIX_CEILING, &taken)
            .await
            .expect("resolves");

        assert_eq!(first, second);
        assert_eq!(first.slug, "harley-clinic-3");
    }

    #[tokio::test]
    async fn probe_failures_propagate() {
        let err = resolve_unique("dr-john-smith", 4, |_| async {
            Err(DirectoryStoreError::connection("pool unavailable"))
        })
        .await
        .expect_err("probe failed");

        assert!(matches!(err, AllocationError::Store(_)));
    }
}
