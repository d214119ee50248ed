//! Slug allocation and the lock transition protocol.
//!
//! The service holds no state of its own and takes no in-process lock:
//! correctness under concurrency rests entirely on the store's uniqueness
//! constraint, which the conditional commit exercises. The probe/resolve
//! steps are best-effort optimization to avoid obviously doomed commits,
//! never a substitute for that constraint.

use std::sync::Arc;

use mockable::Clock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::candidate::{ResolutionPath, SlugCandidate};
use crate::domain::collision::{resolve_unique, SUFFIX_CEILING};
use crate::domain::entity::{EntityDocument, RelationRef, SlugRecord};
use crate::domain::error::AllocationError;
use crate::domain::ports::{DirectoryStore, DirectoryStoreError};
use crate::domain::rules::{EntityKind, EntityRule, EntityRules};
use crate::domain::seed_text::{preview_seed_text, resolve_seed_text, SeedText};

/// Tunables for the allocation loop. No lazy globals: the process entry
/// point constructs this and passes it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationConfig {
    /// Ceiling on conditional-commit attempts before surfacing
    /// [`AllocationError::RetriesExhausted`].
    pub max_commit_attempts: u32,
    /// Ceiling on sequential uniqueness probes per attempt.
    pub suffix_ceiling: u32,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: 5,
            suffix_ceiling: SUFFIX_CEILING,
        }
    }
}

/// Options accepted by [`SlugAllocationService::allocate_and_lock`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocateOptions {
    /// Replace the rule-derived seed text with an explicit value.
    pub custom_text: Option<String>,
    /// Administrative path: clear an existing lock and reallocate.
    pub force_regenerate: bool,
}

/// Result of an allocation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationOutcome {
    /// The entity already held a locked slug; no write was performed.
    Existing(SlugRecord),
    /// This call locked a fresh slug.
    Locked {
        /// The persisted record.
        record: SlugRecord,
        /// The candidate that won, with its resolution path.
        candidate: SlugCandidate,
    },
}

impl AllocationOutcome {
    /// The locked slug value.
    pub fn slug(&self) -> Option<&str> {
        match self {
            Self::Existing(record) | Self::Locked { record, .. } => record.slug.as_deref(),
        }
    }

    /// Whether this call performed the lock transition.
    pub fn freshly_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    /// The slug record, however it was obtained.
    pub fn into_record(self) -> SlugRecord {
        match self {
            Self::Existing(record) | Self::Locked { record, .. } => record,
        }
    }
}

/// Allocates and locks slugs for directory entities.
///
/// One instance serves every entity kind; policy differences live entirely
/// in the rule registry.
pub struct SlugAllocationService<S: ?Sized> {
    store: Arc<S>,
    rules: Arc<EntityRules>,
    clock: Arc<dyn Clock>,
    config: AllocationConfig,
}

// Hand-written so cloning does not require `S: Clone` (the store is held
// behind an `Arc` and may be a trait object).
impl<S: ?Sized> Clone for SlugAllocationService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            rules: Arc::clone(&self.rules),
            clock: Arc::clone(&self.clock),
            config: self.config,
        }
    }
}

impl<S> SlugAllocationService<S>
where
    S: DirectoryStore + ?Sized,
{
    /// Create a service over a store handle, rule registry, and clock.
    ///
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use mockable::DefaultClock;
    ///
    /// use backend::domain::ports::FixtureDirectoryStore;
    /// use backend::domain::{EntityRules, SlugAllocationService};
    ///
    /// let service = SlugAllocationService::new(
    ///     Arc::new(FixtureDirectoryStore),
    ///     Arc::new(EntityRules::standard()),
    ///     Arc::new(DefaultClock),
    /// );
    /// ```
    pub fn new(store: Arc<S>, rules: Arc<EntityRules>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            rules,
            clock,
            config: AllocationConfig::default(),
        }
    }

    /// Override the allocation tunables.
    pub fn with_config(mut self, config: AllocationConfig) -> Self {
        self.config = config;
        self
    }

    /// Route prefix metadata for building canonical URLs.
    pub fn route_prefix(&self, kind: EntityKind) -> &'static str {
        self.rules.rule_for(kind).route_prefix
    }

    /// Allocate and irrevocably lock a slug for an entity.
    ///
    /// Safe to call speculatively: an already-locked entity short-circuits to
    /// its existing record without writes, so concurrent calls for one entity
    /// converge on a single winning slug.
    ///
    /// # Errors
    ///
    /// Terminal: [`AllocationError::EntityNotFound`],
    /// [`AllocationError::ApprovalRequired`],
    /// [`AllocationError::MissingSourceField`],
    /// [`AllocationError::InvalidSlugFormat`],
    /// [`AllocationError::AlreadyLocked`]. Retryable:
    /// [`AllocationError::SuffixExhausted`],
    /// [`AllocationError::RetriesExhausted`], store failures. Lost commit
    /// races below the retry ceiling are recovered internally and never
    /// surface.
    pub async fn allocate_and_lock(
        &self,
        kind: EntityKind,
        id: Uuid,
        options: AllocateOptions,
    ) -> Result<AllocationOutcome, AllocationError> {
        let rule = self.rules.rule_for(kind);
        let entity = self.require_entity(kind, id).await?;

        if entity.slug.locked {
            if !options.force_regenerate {
                if options.custom_text.is_some() {
                    return Err(AllocationError::AlreadyLocked {
                        kind,
                        id,
                        slug: entity.slug.slug.unwrap_or_default(),
                    });
                }
                debug!(%kind, %id, "slug already locked; idempotent short-circuit");
                return Ok(AllocationOutcome::Existing(entity.slug));
            }
            warn!(%kind, %id, "forced slug regeneration; clearing lock");
            self.store.clear_lock(kind, id).await?;
        }

        let related = self.fetch_related(rule, &entity).await?;
        if !rule.approval.satisfied_by(&entity, related.as_ref()) {
            return Err(AllocationError::ApprovalRequired { kind, id });
        }

        let seed = resolve_seed_text(rule, &entity, related.as_ref(), options.custom_text.as_deref())?;

        let mut attempt: u32 = 1;
        loop {
            let base_text = self.freshened_seed(&seed, attempt);
            let candidate = self
                .build_candidate(rule, kind, &base_text, &seed, Some(id))
                .await?;

            match self
                .store
                .commit_locked_slug(kind, id, &candidate.final_slug)
                .await
            {
                Ok(()) => {
                    info!(%kind, %id, slug = %candidate.final_slug, attempt, "slug locked");
                    let record = SlugRecord::locked(candidate.final_slug.clone());
                    return Ok(AllocationOutcome::Locked { record, candidate });
                }
                Err(DirectoryStoreError::DuplicateSlug { message }) => {
                    warn!(
                        %kind, %id, slug = %candidate.final_slug, attempt, %message,
                        "slug commit lost a race"
                    );
                    // A concurrent allocation for this same entity may have
                    // won; the postcondition is then already satisfied.
                    let current = self.require_entity(kind, id).await?;
                    if current.slug.locked {
                        debug!(%kind, %id, "entity locked by a concurrent writer");
                        return Ok(AllocationOutcome::Existing(current.slug));
                    }
                    if attempt >= self.config.max_commit_attempts {
                        return Err(AllocationError::RetriesExhausted { attempts: attempt });
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Compute the candidate slug an allocation would produce for free text,
    /// without persisting anything.
    ///
    /// Probes are read-only; the reported [`ResolutionPath`] tells callers
    /// whether a collision would be resolved by the locality qualifier or by
    /// a counter.
    ///
    /// # Errors
    ///
    /// [`AllocationError::MissingSourceField`] for blank text,
    /// [`AllocationError::InvalidSlugFormat`] for text that normalizes to a
    /// grammar violation, [`AllocationError::SuffixExhausted`] and store
    /// failures from probing.
    pub async fn preview_slug(
        &self,
        kind: EntityKind,
        text: &str,
    ) -> Result<SlugCandidate, AllocationError> {
        let rule = self.rules.rule_for(kind);
        let seed = preview_seed_text(rule, text)?;
        let base_text = seed.qualified.clone();
        self.build_candidate(rule, kind, &base_text, &seed, None)
            .await
    }

    /// Look up the entity holding a locked slug.
    ///
    /// Grammar-violating input cannot name a locked slug (the format
    /// invariant holds for every persisted value), so it resolves to `None`
    /// without a store round-trip.
    ///
    /// # Errors
    ///
    /// Store failures propagate.
    pub async fn find_by_locked_slug(
        &self,
        kind: EntityKind,
        slug: &str,
    ) -> Result<Option<EntityDocument>, AllocationError> {
        if slugtext::validate(slug).is_err() {
            return Ok(None);
        }
        let rule = self.rules.rule_for(kind);
        Ok(self
            .store
            .find_by_locked_slug(kind, rule.scope, slug)
            .await?)
    }

    /// Lazily lock a slug for a pre-existing record the first time it is
    /// needed.
    ///
    /// An entity that has not passed its approval gate is simply not
    /// publishable yet — not an error on this path — so its current
    /// (unlocked) record is returned unchanged.
    ///
    /// # Errors
    ///
    /// Every failure other than [`AllocationError::ApprovalRequired`]
    /// propagates.
    pub async fn backfill(
        &self,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<SlugRecord, AllocationError> {
        match self
            .allocate_and_lock(kind, id, AllocateOptions::default())
            .await
        {
            Ok(outcome) => Ok(outcome.into_record()),
            Err(AllocationError::ApprovalRequired { .. }) => {
                let entity = self.require_entity(kind, id).await?;
                Ok(entity.slug)
            }
            Err(err) => Err(err),
        }
    }

    async fn require_entity(
        &self,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<EntityDocument, AllocationError> {
        self.store
            .load_entity(kind, id)
            .await?
            .ok_or(AllocationError::EntityNotFound { kind, id })
    }

    /// Fetch the related owning record a rule needs, tolerating the three
    /// relation representations uniformly. An expanded relation needs no
    /// store round-trip.
    async fn fetch_related(
        &self,
        rule: &EntityRule,
        entity: &EntityDocument,
    ) -> Result<Option<serde_json::Value>, AllocationError> {
        let Some((relation_field, collection)) = rule.needed_relation() else {
            return Ok(None);
        };
        let Some(reference) = entity.relation(relation_field) else {
            return Ok(None);
        };
        match reference {
            RelationRef::Expanded(value) => Ok(Some(value)),
            RelationRef::Reference(id) | RelationRef::Raw(id) => {
                Ok(self.store.load_related(collection, id).await?)
            }
        }
    }

    /// Seed text for the `attempt`th commit try. The first retry re-resolves
    /// from the unchanged base so racing callers converge on predictable
    /// sequential suffixes; from the second consecutive lost race onward a
    /// clock-derived token breaks pathological collision storms.
    fn freshened_seed(&self, seed: &SeedText, attempt: u32) -> String {
        if attempt <= 2 {
            seed.qualified.clone()
        } else {
            format!("{} {}", seed.qualified, self.clock.utc().timestamp())
        }
    }

    /// Steps 3–4 of the lock protocol: normalize, resolve a free candidate,
    /// and re-validate the grammar before any persistence is attempted.
    async fn build_candidate(
        &self,
        rule: &EntityRule,
        kind: EntityKind,
        base_text: &str,
        seed: &SeedText,
        exclude: Option<Uuid>,
    ) -> Result<SlugCandidate, AllocationError> {
        let normalized = slugtext::normalize(base_text);
        if normalized.is_empty() {
            // Pathological seed text (symbols-only, non-Latin): fail fast
            // rather than probe and persist a malformed value.
            return Err(AllocationError::InvalidSlugFormat {
                slug: normalized,
                violation: slugtext::SlugFormatViolation::Empty,
            });
        }

        let store = Arc::clone(&self.store);
        let scope = rule.scope;
        let resolved = resolve_unique(&normalized, self.config.suffix_ceiling, move |candidate| {
            let store = Arc::clone(&store);
            async move { store.slug_exists(kind, scope, &candidate, exclude).await }
        })
        .await?;

        if let Err(violation) = slugtext::validate(&resolved.slug) {
            return Err(AllocationError::InvalidSlugFormat {
                slug: resolved.slug,
                violation,
            });
        }

        let path = self
            .classify_path(rule, kind, seed, &normalized, resolved.counter, exclude)
            .await?;

        Ok(SlugCandidate {
            base_text: base_text.to_owned(),
            normalized_base: normalized,
            attempt_suffix: resolved.attempt_suffix(),
            final_slug: resolved.slug,
            path,
        })
    }

    /// Report which resolution path produced the candidate. When the
    /// locality qualifier is what kept the slug unsuffixed, one extra probe
    /// against the unqualified base detects it.
    async fn classify_path(
        &self,
        rule: &EntityRule,
        kind: EntityKind,
        seed: &SeedText,
        normalized: &str,
        counter: u32,
        exclude: Option<Uuid>,
    ) -> Result<ResolutionPath, AllocationError> {
        if counter > 1 {
            return Ok(ResolutionPath::CounterSuffix { counter });
        }
        if seed.locality_applied() {
            let bare = slugtext::normalize(&seed.bare);
            if !bare.is_empty()
                && bare != normalized
                && self
                    .store
                    .slug_exists(kind, rule.scope, &bare, exclude)
                    .await?
            {
                return Ok(ResolutionPath::LocalityQualified);
            }
        }
        Ok(ResolutionPath::Free)
    }
}

#[cfg(test)]
#[path = "allocation_tests.rs"]
mod tests;
