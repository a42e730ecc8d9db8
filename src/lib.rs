pub mod api;
pub mod config;
pub mod forms;
pub mod services;
pub mod utils;

use crate::config::UploadConfig;
use crate::services::upload_intake::UploadIntakeHandler;
use crate::services::upload_pipeline::UploadPipeline;
use crate::utils::messages::Translator;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_file,
        api::handlers::forms::describe_points_trigger,
        api::handlers::forms::bind_points_trigger,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::upload::UploadForm,
            services::upload_intake::FinalizeOutcome,
            forms::FieldSpec,
            forms::FieldType,
            forms::points_trigger::PointsTriggerData,
            api::handlers::forms::BindPointsRequest,
            api::handlers::forms::BindPointsResponse,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "uploads", description = "Asset upload intake"),
        (name = "forms", description = "Form field declarations"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<UploadConfig>,
    pub pipeline: Arc<UploadPipeline>,
    pub translator: Arc<dyn Translator>,
}

impl AppState {
    /// Wires the intake handler into a fresh pipeline.
    pub fn new(config: UploadConfig, translator: Arc<dyn Translator>) -> Self {
        let config = Arc::new(config);
        let intake = UploadIntakeHandler::new(config.clone(), translator.clone());

        let mut pipeline = UploadPipeline::new(config.clone());
        pipeline.register(Arc::new(intake));

        Self {
            config,
            pipeline: Arc::new(pipeline),
            translator,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    // Leave room for multipart framing on top of the file itself
    let body_limit = state.config.request_body_limit_bytes() + 1024 * 1024;

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/upload",
            post(api::handlers::upload::upload_file)
                .layer(axum::extract::DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/forms/points-trigger",
            get(api::handlers::forms::describe_points_trigger)
                .post(api::handlers::forms::bind_points_trigger),
        )
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
