//! OpenAPI documentation aggregate.

use utoipa::OpenApi;

use crate::api;

/// Public OpenAPI surface used by Swagger UI and tooling.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Directory Slug Service",
        description = "Slug allocation, locking, and resolution for directory entities."
    ),
    paths(
        api::slugs::preview,
        api::slugs::validate,
        api::slugs::allocate,
        api::slugs::resolve,
        api::slugs::entity_detail,
        api::health::ready,
        api::health::live,
    ),
    components(schemas(
        api::error::ErrorBody,
        api::slugs::PreviewRequest,
        api::slugs::CandidateBody,
        api::slugs::ValidateRequest,
        api::slugs::ValidateResponse,
        api::slugs::AllocateRequest,
        api::slugs::AllocateResponse,
        api::slugs::ResolvedEntityBody,
        api::slugs::EntityDetailBody,
    )),
    tags(
        (name = "slugs", description = "Slug allocation and resolution"),
        (name = "directory", description = "Entity reads with lazy backfill"),
        (name = "health", description = "Orchestration probes")
    )
)]
pub struct ApiDoc;
