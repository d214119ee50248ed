//! Entity kinds and the per-kind slug policy registry.
//!
//! One rule table covers every entity shape the directory publishes under a
//! slug. Adding a kind means adding a tag to [`EntityKind`] and a rule entry
//! to [`EntityRules::standard`]; resolver and lock code never change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::entity::bool_field;
use crate::domain::EntityDocument;

/// Closed tag identifying a sluggable entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    /// A clinic or medical centre listing.
    Clinic,
    /// A doctor profile (display name lives on the owning account record).
    Doctor,
    /// An editorial blog post.
    BlogPost,
    /// A job posting published by a clinic.
    JobPosting,
}

impl EntityKind {
    /// All entity kind variants, in registry order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Clinic,
        EntityKind::Doctor,
        EntityKind::BlogPost,
        EntityKind::JobPosting,
    ];

    /// Stable string representation used in URLs and the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clinic => "clinic",
            Self::Doctor => "doctor",
            Self::BlogPost => "blog-post",
            Self::JobPosting => "job-posting",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unregistered entity kind string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity kind: {input}")]
pub struct UnknownEntityKind {
    /// The unrecognised input string.
    pub input: String,
}

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownEntityKind {
                input: s.to_owned(),
            })
    }
}

/// Which stored records a candidate slug must be unique against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniquenessScope {
    /// Unique among records whose slug is locked. Two unlocked previews may
    /// transiently share a candidate without violating the invariant.
    LockedOnly,
    /// Unique among published records (editorial content keeps draft slugs
    /// out of the namespace until publication).
    PublishedOnly,
}

/// Where the seed text for a kind's slug comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    /// A text field on the entity record itself.
    Field {
        /// Field name on the entity.
        field: &'static str,
    },
    /// A text field on a related owning record reached through one hop.
    Related {
        /// Field on the entity holding the relation reference.
        relation: &'static str,
        /// Store collection the related record lives in.
        collection: &'static str,
        /// Field name on the related record.
        field: &'static str,
    },
}

/// Gate that must hold before a slug may be locked for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalRequirement {
    /// No gate; locking is allowed as soon as the entity exists.
    None,
    /// A boolean field on the entity itself must be `true`.
    EntityFlag {
        /// Field name on the entity.
        field: &'static str,
    },
    /// A text field on the entity must equal a fixed value.
    EntityFieldEquals {
        /// Field name on the entity.
        field: &'static str,
        /// Required value.
        value: &'static str,
    },
    /// A boolean field on a related owning record must be `true`.
    RelatedFlag {
        /// Field on the entity holding the relation reference.
        relation: &'static str,
        /// Store collection the related record lives in.
        collection: &'static str,
        /// Field name on the related record.
        field: &'static str,
    },
}

impl ApprovalRequirement {
    /// Evaluate the gate against an entity and its (optionally fetched)
    /// related record. Absent or malformed fields read as not approved.
    pub fn satisfied_by(&self, entity: &EntityDocument, related: Option<&Value>) -> bool {
        match self {
            Self::None => true,
            Self::EntityFlag { field } => entity.bool_field(field).unwrap_or(false),
            Self::EntityFieldEquals { field, value } => entity.text_field(field) == Some(*value),
            Self::RelatedFlag { field, .. } => related
                .and_then(|record| bool_field(record, field))
                .unwrap_or(false),
        }
    }
}

/// Static slug policy for one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRule {
    /// Kind the rule applies to.
    pub kind: EntityKind,
    /// Seed text source.
    pub seed: SeedSource,
    /// Fixed textual prefix applied before the seed (e.g. a professional
    /// title), pre-normalization.
    pub title_prefix: Option<&'static str>,
    /// Free-text address field mined for a locality qualifier, if any.
    pub locality_field: Option<&'static str>,
    /// Approval gate for the lock transition.
    pub approval: ApprovalRequirement,
    /// Records the candidate must be unique against.
    pub scope: UniquenessScope,
    /// URL path prefix for canonical links. Metadata only.
    pub route_prefix: &'static str,
}

impl EntityRule {
    /// The single relation (entity field, store collection) this rule needs,
    /// whether for seed text or for the approval gate.
    pub fn needed_relation(&self) -> Option<(&'static str, &'static str)> {
        if let SeedSource::Related {
            relation,
            collection,
            ..
        } = self.seed
        {
            return Some((relation, collection));
        }
        if let ApprovalRequirement::RelatedFlag {
            relation,
            collection,
            ..
        } = self.approval
        {
            return Some((relation, collection));
        }
        None
    }
}

/// Registry of slug policies, built once at process start.
#[derive(Debug, Clone)]
pub struct EntityRules {
    clinic: EntityRule,
    doctor: EntityRule,
    blog_post: EntityRule,
    job_posting: EntityRule,
}

impl EntityRules {
    /// The directory's standard rule table.
    pub fn standard() -> Self {
        Self {
            clinic: EntityRule {
                kind: EntityKind::Clinic,
                seed: SeedSource::Field { field: "name" },
                title_prefix: None,
                locality_field: Some("address"),
                approval: ApprovalRequirement::EntityFlag {
                    field: "is_approved",
                },
                scope: UniquenessScope::LockedOnly,
                route_prefix: "/clinics",
            },
            doctor: EntityRule {
                kind: EntityKind::Doctor,
                seed: SeedSource::Related {
                    relation: "account",
                    collection: "accounts",
                    field: "display_name",
                },
                title_prefix: Some("dr"),
                locality_field: Some("address"),
                approval: ApprovalRequirement::RelatedFlag {
                    relation: "account",
                    collection: "accounts",
                    field: "is_approved",
                },
                scope: UniquenessScope::LockedOnly,
                route_prefix: "/doctors",
            },
            blog_post: EntityRule {
                kind: EntityKind::BlogPost,
                seed: SeedSource::Field { field: "title" },
                title_prefix: None,
                locality_field: None,
                approval: ApprovalRequirement::EntityFieldEquals {
                    field: "status",
                    value: "published",
                },
                scope: UniquenessScope::PublishedOnly,
                route_prefix: "/blog",
            },
            job_posting: EntityRule {
                kind: EntityKind::JobPosting,
                seed: SeedSource::Field { field: "title" },
                title_prefix: None,
                locality_field: Some("location"),
                approval: ApprovalRequirement::EntityFlag {
                    field: "is_approved",
                },
                scope: UniquenessScope::LockedOnly,
                route_prefix: "/jobs",
            },
        }
    }

    /// Policy for a kind. Total over the closed tag set.
    pub fn rule_for(&self, kind: EntityKind) -> &EntityRule {
        match kind {
            EntityKind::Clinic => &self.clinic,
            EntityKind::Doctor => &self.doctor,
            EntityKind::BlogPost => &self.blog_post,
            EntityKind::JobPosting => &self.job_posting,
        }
    }

    /// Policy looked up by the string form of a kind, for string-typed
    /// callers such as HTTP handlers.
    pub fn rule_for_name(&self, name: &str) -> Result<&EntityRule, UnknownEntityKind> {
        Ok(self.rule_for(name.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use crate::domain::SlugRecord;

    use super::*;

    #[test]
    fn every_kind_has_a_rule_matching_its_tag() {
        let rules = EntityRules::standard();
        for kind in EntityKind::ALL {
            assert_eq!(rules.rule_for(kind).kind, kind);
        }
    }

    #[test]
    fn kind_strings_round_trip() {
        for kind in EntityKind::ALL {
            let parsed: EntityKind = kind.as_str().parse().expect("round trip");
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn unknown_kind_is_rejected_by_name_lookup() {
        let rules = EntityRules::standard();
        let err = rules
            .rule_for_name("pharmacy")
            .expect_err("pharmacy is not registered");
        assert_eq!(err.input, "pharmacy");
    }

    #[test]
    fn entity_flag_approval_reads_missing_field_as_unapproved() {
        let rule = ApprovalRequirement::EntityFlag {
            field: "is_approved",
        };
        let entity = EntityDocument::new(
            Uuid::new_v4(),
            EntityKind::Clinic,
            SlugRecord::vacant(),
            json!({ "name": "City Dental Clinic" }),
        );
        assert!(!rule.satisfied_by(&entity, None));
    }

    #[test]
    fn related_flag_approval_reads_related_record() {
        let rule = ApprovalRequirement::RelatedFlag {
            relation: "account",
            collection: "accounts",
            field: "is_approved",
        };
        let entity = EntityDocument::new(
            Uuid::new_v4(),
            EntityKind::Doctor,
            SlugRecord::vacant(),
            json!({}),
        );

        assert!(rule.satisfied_by(&entity, Some(&json!({ "is_approved": true }))));
        assert!(!rule.satisfied_by(&entity, Some(&json!({ "is_approved": false }))));
        assert!(!rule.satisfied_by(&entity, None));
    }

    #[test]
    fn field_equality_approval_compares_trimmed_text() {
        let rule = ApprovalRequirement::EntityFieldEquals {
            field: "status",
            value: "published",
        };
        let entity = EntityDocument::new(
            Uuid::new_v4(),
            EntityKind::BlogPost,
            SlugRecord::vacant(),
            json!({ "status": "published" }),
        );
        assert!(rule.satisfied_by(&entity, None));

        let draft = EntityDocument::new(
            Uuid::new_v4(),
            EntityKind::BlogPost,
            SlugRecord::vacant(),
            json!({ "status": "draft" }),
        );
        assert!(!rule.satisfied_by(&draft, None));
    }

    #[test]
    fn doctor_rule_names_one_relation_for_seed_and_approval() {
        let rules = EntityRules::standard();
        assert_eq!(
            rules.rule_for(EntityKind::Doctor).needed_relation(),
            Some(("account", "accounts"))
        );
        assert_eq!(rules.rule_for(EntityKind::Clinic).needed_relation(), None);
    }
}
