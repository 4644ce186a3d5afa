use axum::http::{header, HeaderValue, Method};
use axum::Router;
use leadpay_common::{config_error, LeadpayError, ServiceFactory};
use leadpay_config::AppConfig;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// CORS for the single web client origin. Cookies are allowed, so the origin
/// must be exact rather than a wildcard.
pub fn cors_layer(client_url: &str) -> Result<CorsLayer, LeadpayError> {
    let origin = HeaderValue::from_str(client_url.trim_end_matches('/'))
        .map_err(|e| config_error(format!("Invalid client_url {:?}: {}", client_url, e)))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true))
}

/// Builds the application router.
///
/// `/health` sits at the root; checkout and ledger routes are nested under `/api`.
pub fn build_app(
    config: Arc<AppConfig>,
    factory: Arc<dyn ServiceFactory>,
) -> Result<Router, LeadpayError> {
    let ledger = factory.ledger_service();
    if !config.stripe_enabled() {
        info!("Stripe is disabled; checkout routes will answer 503");
    }

    let api_router = Router::new()
        .merge(leadpay_stripe::routes(config.clone(), ledger.clone()))
        .merge(leadpay_firestore::routes(ledger));

    #[allow(unused_mut)] // mutated only with the openapi feature
    let mut app = Router::new()
        .merge(leadpay_common::routes())
        .nest("/api", api_router);

    // Conditionally add Swagger UI and JSON endpoint if openapi feature enabled
    #[cfg(feature = "openapi")]
    {
        use leadpay_firestore::doc::FirestoreApiDoc;
        use leadpay_stripe::doc::StripeApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        #[derive(OpenApi)]
        #[openapi(
            info(
                title = "LeadPay API",
                version = "0.1.0",
                description = "Lead checkout and payment ledger",
                license(name = "MIT", url = "https://opensource.org/licenses/MIT")
            ),
            servers((url = "/api", description = "Main API Prefix")),
        )]
        struct ApiDoc;

        let mut openapi_doc = ApiDoc::openapi();
        openapi_doc.merge(StripeApiDoc::openapi());
        openapi_doc.merge(FirestoreApiDoc::openapi());
        info!("Adding Swagger UI at /api/docs");

        let swagger_ui = SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc);
        app = app.merge(swagger_ui);
    }

    Ok(app
        .layer(cors_layer(&config.client_url)?)
        .layer(TraceLayer::new_for_http()))
}
