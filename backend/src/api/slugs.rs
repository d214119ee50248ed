//! Slug API handlers.
//!
//! Thin delivery adapters over [`SlugAllocationService`]; every behaviour
//! decision lives in the domain. Handlers parse the string-typed entity kind
//! from the route, which is where `unknown_entity_kind` surfaces.

use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::ports::DirectoryStore;
use crate::domain::{
    AllocateOptions, AllocationOutcome, EntityKind, SlugAllocationService, SlugCandidate,
};

use super::error::{ApiError, ErrorBody};

/// Allocation service as the delivery layer sees it: type-erased over the
/// store implementation.
pub type SlugService = SlugAllocationService<dyn DirectoryStore>;

/// Request body for slug previews.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    /// Entity kind tag (`clinic`, `doctor`, `blog-post`, `job-posting`).
    #[schema(example = "clinic")]
    pub kind: String,
    /// Free text to derive the slug from. For kinds with locality
    /// augmentation, text after the first comma is treated as an address.
    #[schema(example = "City Dental Clinic, Dubai Marina, UAE")]
    pub text: String,
}

/// Response body for slug previews and allocations.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CandidateBody {
    /// The candidate slug.
    #[schema(example = "city-dental-clinic-dubai-marina")]
    pub slug: String,
    /// Deterministic normalization of the seed text, before suffixing.
    pub normalized_base: String,
    /// Numeric suffix appended; `0` when unsuffixed.
    pub attempt_suffix: u32,
    /// Stable resolution path code: `free`, `locality`, or `counter`.
    #[schema(example = "locality")]
    pub path: String,
    /// Human-readable account of the resolution path.
    #[schema(example = "collision resolved by adding a locality qualifier")]
    pub explanation: String,
}

impl From<SlugCandidate> for CandidateBody {
    fn from(candidate: SlugCandidate) -> Self {
        Self {
            slug: candidate.final_slug,
            normalized_base: candidate.normalized_base,
            attempt_suffix: candidate.attempt_suffix,
            path: candidate.path.code().to_owned(),
            explanation: candidate.path.explanation().to_owned(),
        }
    }
}

/// Preview the slug an allocation would produce. Never persists.
#[utoipa::path(
    post,
    path = "/api/v1/slugs/preview",
    request_body = PreviewRequest,
    responses(
        (status = 200, description = "Candidate slug", body = CandidateBody),
        (status = 400, description = "Unknown entity kind", body = ErrorBody),
        (status = 422, description = "Blank seed text", body = ErrorBody)
    ),
    tags = ["slugs"],
    operation_id = "previewSlug"
)]
#[post("/slugs/preview")]
pub async fn preview(
    service: web::Data<SlugService>,
    body: web::Json<PreviewRequest>,
) -> Result<web::Json<CandidateBody>, ApiError> {
    let kind: EntityKind = body.kind.parse()?;
    let candidate = service.preview_slug(kind, &body.text).await?;
    Ok(web::Json(candidate.into()))
}

/// Request body for format validation.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    /// Slug to check against the format grammar.
    #[schema(example = "dr-jane-smith-dubai")]
    pub slug: String,
}

/// Response body for format validation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    /// Whether the slug satisfies the grammar.
    pub valid: bool,
    /// Violation description when invalid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Check a slug against the format grammar.
#[utoipa::path(
    post,
    path = "/api/v1/slugs/validate",
    request_body = ValidateRequest,
    responses(
        (status = 200, description = "Validation verdict", body = ValidateResponse)
    ),
    tags = ["slugs"],
    operation_id = "validateSlugFormat"
)]
#[post("/slugs/validate")]
pub async fn validate(body: web::Json<ValidateRequest>) -> web::Json<ValidateResponse> {
    let verdict = crate::domain::validate_format(&body.slug);
    web::Json(ValidateResponse {
        valid: verdict.is_ok(),
        reason: verdict.err().map(|violation| violation.to_string()),
    })
}

/// Request body for allocation calls.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllocateRequest {
    /// Replace the rule-derived seed text with an explicit value.
    #[serde(default)]
    pub custom_text: Option<String>,
    /// Administrative path: clear an existing lock and reallocate.
    #[serde(default)]
    pub force_regenerate: bool,
}

/// Response body for allocation calls.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllocateResponse {
    /// The locked slug.
    #[schema(example = "dr-jane-smith-dubai")]
    pub slug: String,
    /// Whether this call performed the lock transition (`false` when the
    /// idempotent short-circuit returned an existing record).
    pub freshly_locked: bool,
    /// Candidate details when freshly locked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<CandidateBody>,
    /// Canonical URL path for the entity.
    #[schema(example = "/doctors/dr-jane-smith-dubai")]
    pub url: String,
}

/// Allocate and irrevocably lock a slug for an entity.
#[utoipa::path(
    post,
    path = "/api/v1/slugs/{kind}/{id}/lock",
    params(
        ("kind" = String, Path, description = "Entity kind tag"),
        ("id" = Uuid, Path, description = "Entity identifier")
    ),
    request_body = AllocateRequest,
    responses(
        (status = 200, description = "Locked slug", body = AllocateResponse),
        (status = 400, description = "Unknown entity kind", body = ErrorBody),
        (status = 404, description = "Entity not found", body = ErrorBody),
        (status = 409, description = "Approval gate failed or slug already locked", body = ErrorBody),
        (status = 503, description = "Allocation exhausted; retry later", body = ErrorBody)
    ),
    tags = ["slugs"],
    operation_id = "allocateAndLockSlug"
)]
#[post("/slugs/{kind}/{id}/lock")]
pub async fn allocate(
    service: web::Data<SlugService>,
    path: web::Path<(String, Uuid)>,
    body: web::Json<AllocateRequest>,
) -> Result<web::Json<AllocateResponse>, ApiError> {
    let (kind_raw, id) = path.into_inner();
    let kind: EntityKind = kind_raw.parse()?;
    let request = body.into_inner();

    let outcome = service
        .allocate_and_lock(
            kind,
            id,
            AllocateOptions {
                custom_text: request.custom_text,
                force_regenerate: request.force_regenerate,
            },
        )
        .await?;

    Ok(web::Json(allocate_response(&service, kind, outcome)))
}

fn allocate_response(
    service: &SlugService,
    kind: EntityKind,
    outcome: AllocationOutcome,
) -> AllocateResponse {
    let freshly_locked = outcome.freshly_locked();
    let slug = outcome.slug().unwrap_or_default().to_owned();
    let url = format!("{}/{slug}", service.route_prefix(kind));
    let candidate = match outcome {
        AllocationOutcome::Locked { candidate, .. } => Some(candidate.into()),
        AllocationOutcome::Existing(_) => None,
    };

    AllocateResponse {
        slug,
        freshly_locked,
        candidate,
        url,
    }
}

/// Response body for slug resolution.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedEntityBody {
    /// Entity identifier.
    pub id: Uuid,
    /// Entity kind tag.
    #[schema(example = "doctor")]
    pub kind: String,
    /// The locked slug.
    pub slug: String,
    /// Canonical URL path for the entity.
    pub url: String,
}

/// Resolve an entity by its locked slug.
#[utoipa::path(
    get,
    path = "/api/v1/slugs/{kind}/{slug}",
    params(
        ("kind" = String, Path, description = "Entity kind tag"),
        ("slug" = String, Path, description = "Locked slug")
    ),
    responses(
        (status = 200, description = "Entity holding the slug", body = ResolvedEntityBody),
        (status = 400, description = "Unknown entity kind", body = ErrorBody),
        (status = 404, description = "No entity holds this slug")
    ),
    tags = ["slugs"],
    operation_id = "resolveByLockedSlug"
)]
#[get("/slugs/{kind}/{slug}")]
pub async fn resolve(
    service: web::Data<SlugService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (kind_raw, slug) = path.into_inner();
    let kind: EntityKind = kind_raw.parse()?;

    match service.find_by_locked_slug(kind, &slug).await? {
        Some(document) => {
            let slug = document.slug.slug.clone().unwrap_or_default();
            Ok(HttpResponse::Ok().json(ResolvedEntityBody {
                id: document.id,
                kind: kind.as_str().to_owned(),
                url: format!("{}/{slug}", service.route_prefix(kind)),
                slug,
            }))
        }
        None => Ok(HttpResponse::NotFound().json(ErrorBody {
            code: "slug_not_found".to_owned(),
            message: format!("no {kind} holds slug {slug:?}"),
            retryable: false,
        })),
    }
}

/// Response body for entity detail reads.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityDetailBody {
    /// Entity identifier.
    pub id: Uuid,
    /// Entity kind tag.
    pub kind: String,
    /// Current slug value, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Whether the slug is locked.
    pub locked: bool,
}

/// Entity detail read with lazy slug backfill.
///
/// A pre-existing record that reached its approval gate before the slug
/// service was introduced gets its slug generated and locked on first read;
/// records still short of the gate are returned as-is.
#[utoipa::path(
    get,
    path = "/api/v1/directory/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "Entity kind tag"),
        ("id" = Uuid, Path, description = "Entity identifier")
    ),
    responses(
        (status = 200, description = "Entity detail", body = EntityDetailBody),
        (status = 400, description = "Unknown entity kind", body = ErrorBody),
        (status = 404, description = "Entity not found", body = ErrorBody)
    ),
    tags = ["directory"],
    operation_id = "entityDetail"
)]
#[get("/directory/{kind}/{id}")]
pub async fn entity_detail(
    service: web::Data<SlugService>,
    path: web::Path<(String, Uuid)>,
) -> Result<web::Json<EntityDetailBody>, ApiError> {
    let (kind_raw, id) = path.into_inner();
    let kind: EntityKind = kind_raw.parse()?;

    let record = service.backfill(kind, id).await?;

    Ok(web::Json(EntityDetailBody {
        id,
        kind: kind.as_str().to_owned(),
        slug: record.slug,
        locked: record.locked,
    }))
}
