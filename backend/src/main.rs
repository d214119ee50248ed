//! Service entry-point: wires the store, the allocation service, and the
//! REST endpoints.

use std::env;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetricsBuilder;
use mockable::DefaultClock;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use backend::api::health::{live, ready, HealthState};
use backend::api::slugs::{allocate, entity_detail, preview, resolve, validate, SlugService};
#[cfg(debug_assertions)]
use backend::doc::ApiDoc;
use backend::domain::ports::DirectoryStore;
use backend::domain::{EntityRules, SlugAllocationService};
use backend::outbound::persistence::{
    run_pending_migrations, DbPool, DieselDirectoryStore, PoolConfig,
};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let database_url = env::var("DATABASE_URL")
        .map_err(|_| std::io::Error::other("DATABASE_URL must be set"))?;
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());

    run_pending_migrations(&database_url).map_err(std::io::Error::other)?;

    let pool = DbPool::new(PoolConfig::new(&database_url))
        .await
        .map_err(std::io::Error::other)?;

    // Explicit construction and hand-off: the store handle is owned here,
    // not by a lazy global.
    let store: Arc<dyn DirectoryStore> = Arc::new(DieselDirectoryStore::new(pool));
    let rules = Arc::new(EntityRules::standard());
    let service: web::Data<SlugService> = web::Data::from(Arc::new(
        SlugAllocationService::new(store, rules, Arc::new(DefaultClock)),
    ));

    let health_state = web::Data::new(HealthState::new());
    // Clone for the server factory so the readiness probe stays reachable.
    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || {
        let api = web::scope("/api/v1")
            .app_data(service.clone())
            .service(preview)
            .service(validate)
            .service(allocate)
            .service(resolve)
            .service(entity_detail);

        let app = App::new()
            .app_data(server_health_state.clone())
            .service(api)
            .service(ready)
            .service(live);

        #[cfg(feature = "metrics")]
        let app = app.wrap(make_metrics());

        #[cfg(debug_assertions)]
        let app =
            app.service(SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()));

        app
    })
    .bind(bind_addr)?;

    health_state.mark_ready();
    server.run().await
}

#[cfg(feature = "metrics")]
fn make_metrics() -> actix_web_prom::PrometheusMetrics {
    PrometheusMetricsBuilder::new("slug_service")
        .endpoint("/metrics")
        .build()
        .expect("configure Prometheus metrics")
}
