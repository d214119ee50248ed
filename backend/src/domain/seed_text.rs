//! Seed text resolution: the text a slug is derived from.
//!
//! Beyond the plain field lookup a rule declares, two enrichments materially
//! improve real-world uniqueness: a locality qualifier mined from the
//! entity's free-text address (two identically named clinics in different
//! cities get different base slugs instead of `-2` suffixes), and a one-hop
//! join for kinds whose display name lives on a related owning record.

use serde_json::Value;

use crate::domain::entity::text_field;
use crate::domain::error::AllocationError;
use crate::domain::rules::{EntityRule, SeedSource};
use crate::domain::EntityDocument;

/// Resolved seed text, kept in both qualified and unqualified forms so the
/// allocator can report when the locality qualifier was what avoided a
/// collision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedText {
    /// Full seed including title prefix and locality qualifier.
    pub qualified: String,
    /// Seed without the locality qualifier.
    pub bare: String,
}

impl SeedText {
    /// Whether a locality qualifier was appended.
    pub fn locality_applied(&self) -> bool {
        self.qualified != self.bare
    }
}

/// Build the seed text for an entity under a rule.
///
/// `custom_text`, when present, replaces the entire seed verbatim (no prefix
/// or locality enrichment) — it is an explicit operator override. Otherwise
/// the rule's seed source is read from the entity or the pre-fetched related
/// record, the title prefix is applied, and the locality qualifier is mined
/// from the configured address field.
///
/// # Errors
///
/// [`AllocationError::MissingSourceField`] when the custom text is blank,
/// the declared source field is empty/missing, or the required related
/// record was not available.
pub fn resolve_seed_text(
    rule: &EntityRule,
    entity: &EntityDocument,
    related: Option<&Value>,
    custom_text: Option<&str>,
) -> Result<SeedText, AllocationError> {
    if let Some(custom) = custom_text {
        let trimmed = custom.trim();
        if trimmed.is_empty() {
            return Err(AllocationError::MissingSourceField {
                field: "custom_text".to_owned(),
            });
        }
        return Ok(SeedText {
            qualified: trimmed.to_owned(),
            bare: trimmed.to_owned(),
        });
    }

    let name = lookup_source(rule, entity, related)?;
    let bare = apply_title_prefix(rule, &name);
    let locality = rule
        .locality_field
        .and_then(|field| entity.text_field(field))
        .and_then(first_comma_segment);

    let qualified = match locality {
        Some(locality) => format!("{bare} {locality}"),
        None => bare.clone(),
    };

    Ok(SeedText { qualified, bare })
}

/// Build preview seed text from caller-supplied free text.
///
/// Previews have no entity record to mine an address from, so the free text
/// itself carries the shape the resolver understands: everything before the
/// first comma is the name, and (for kinds with locality augmentation) the
/// first segment after it is the locality.
///
/// # Errors
///
/// [`AllocationError::MissingSourceField`] when the name part is blank.
pub fn preview_seed_text(rule: &EntityRule, text: &str) -> Result<SeedText, AllocationError> {
    let (name_part, locality) = if rule.locality_field.is_some() {
        match text.split_once(',') {
            Some((name, rest)) => (name.trim(), first_comma_segment(rest)),
            None => (text.trim(), None),
        }
    } else {
        (text.trim(), None)
    };
    if name_part.is_empty() {
        return Err(AllocationError::MissingSourceField {
            field: "text".to_owned(),
        });
    }

    let bare = apply_title_prefix(rule, name_part);

    let qualified = match locality {
        Some(locality) => format!("{bare} {locality}"),
        None => bare.clone(),
    };

    Ok(SeedText { qualified, bare })
}

fn lookup_source(
    rule: &EntityRule,
    entity: &EntityDocument,
    related: Option<&Value>,
) -> Result<String, AllocationError> {
    match rule.seed {
        SeedSource::Field { field } => entity
            .text_field(field)
            .map(str::to_owned)
            .ok_or_else(|| AllocationError::MissingSourceField {
                field: field.to_owned(),
            }),
        SeedSource::Related { field, .. } => related
            .and_then(|record| text_field(record, field))
            .map(str::to_owned)
            .ok_or_else(|| AllocationError::MissingSourceField {
                field: field.to_owned(),
            }),
    }
}

fn apply_title_prefix(rule: &EntityRule, name: &str) -> String {
    match rule.title_prefix {
        Some(prefix) => format!("{prefix} {name}"),
        None => name.to_owned(),
    }
}

/// First comma-delimited segment of a free-text address, trimmed; the
/// locality token.
fn first_comma_segment(address: &str) -> Option<String> {
    address
        .split(',')
        .next()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use crate::domain::rules::{EntityKind, EntityRules};
    use crate::domain::SlugRecord;

    use super::*;

    fn clinic(fields: Value) -> EntityDocument {
        EntityDocument::new(
            Uuid::new_v4(),
            EntityKind::Clinic,
            SlugRecord::vacant(),
            fields,
        )
    }

    #[test]
    fn plain_field_seed_with_locality() {
        let rules = EntityRules::standard();
        let rule = rules.rule_for(EntityKind::Clinic);
        let entity = clinic(json!({
            "name": "City Dental Clinic",
            "address": "Dubai Marina, Dubai, UAE",
        }));

        let seed = resolve_seed_text(rule, &entity, None, None).expect("seed resolves");
        assert_eq!(seed.qualified, "City Dental Clinic Dubai Marina");
        assert_eq!(seed.bare, "City Dental Clinic");
        assert!(seed.locality_applied());
    }

    #[test]
    fn missing_address_skips_locality() {
        let rules = EntityRules::standard();
        let rule = rules.rule_for(EntityKind::Clinic);
        let entity = clinic(json!({ "name": "City Dental Clinic" }));

        let seed = resolve_seed_text(rule, &entity, None, None).expect("seed resolves");
        assert_eq!(seed.qualified, "City Dental Clinic");
        assert!(!seed.locality_applied());
    }

    #[test]
    fn related_seed_applies_title_prefix() {
        let rules = EntityRules::standard();
        let rule = rules.rule_for(EntityKind::Doctor);
        let entity = EntityDocument::new(
            Uuid::new_v4(),
            EntityKind::Doctor,
            SlugRecord::vacant(),
            json!({ "address": "Jumeirah, Dubai" }),
        );
        let account = json!({ "display_name": "Jane Smith" });

        let seed = resolve_seed_text(rule, &entity, Some(&account), None).expect("seed resolves");
        assert_eq!(seed.qualified, "dr Jane Smith Jumeirah");
        assert_eq!(seed.bare, "dr Jane Smith");
    }

    #[test]
    fn missing_source_field_is_reported_by_name() {
        let rules = EntityRules::standard();
        let rule = rules.rule_for(EntityKind::Clinic);
        let entity = clinic(json!({ "address": "Dubai Marina" }));

        let err = resolve_seed_text(rule, &entity, None, None).expect_err("no name");
        assert_eq!(
            err,
            AllocationError::MissingSourceField {
                field: "name".to_owned()
            }
        );
    }

    #[test]
    fn missing_related_record_is_a_source_failure() {
        let rules = EntityRules::standard();
        let rule = rules.rule_for(EntityKind::Doctor);
        let entity = EntityDocument::new(
            Uuid::new_v4(),
            EntityKind::Doctor,
            SlugRecord::vacant(),
            json!({}),
        );

        let err = resolve_seed_text(rule, &entity, None, None).expect_err("no account");
        assert_eq!(
            err,
            AllocationError::MissingSourceField {
                field: "display_name".to_owned()
            }
        );
    }

    #[test]
    fn custom_text_bypasses_enrichment() {
        let rules = EntityRules::standard();
        let rule = rules.rule_for(EntityKind::Doctor);
        let entity = EntityDocument::new(
            Uuid::new_v4(),
            EntityKind::Doctor,
            SlugRecord::vacant(),
            json!({ "address": "Jumeirah, Dubai" }),
        );

        let seed = resolve_seed_text(rule, &entity, None, Some("Dr Jane Smith Cardiology"))
            .expect("custom seed");
        assert_eq!(seed.qualified, "Dr Jane Smith Cardiology");
        assert!(!seed.locality_applied());
    }

    #[test]
    fn blank_custom_text_is_rejected() {
        let rules = EntityRules::standard();
        let rule = rules.rule_for(EntityKind::Clinic);
        let entity = clinic(json!({ "name": "City Dental Clinic" }));

        let err = resolve_seed_text(rule, &entity, None, Some("   ")).expect_err("blank custom");
        assert!(matches!(err, AllocationError::MissingSourceField { .. }));
    }

    #[test]
    fn preview_splits_name_and_locality_from_free_text() {
        let rules = EntityRules::standard();
        let rule = rules.rule_for(EntityKind::Clinic);

        let seed = preview_seed_text(rule, "City Dental Clinic, Dubai Marina, UAE")
            .expect("preview seed");
        assert_eq!(seed.qualified, "City Dental Clinic Dubai Marina");
        assert_eq!(seed.bare, "City Dental Clinic");
    }

    #[test]
    fn preview_without_locality_rule_keeps_commas_in_the_name() {
        let rules = EntityRules::standard();
        let rule = rules.rule_for(EntityKind::BlogPost);

        let seed = preview_seed_text(rule, "Ten Tips, For Healthy Teeth").expect("preview seed");
        assert_eq!(seed.qualified, "Ten Tips, For Healthy Teeth");
        assert!(!seed.locality_applied());
    }
}
