use crate::cli::Args;
use crate::models::chat::HealthQuery;
use crate::relay::LlmRelay;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    routing::post,
    Router,
    Json,
    extract::State,
    http::{ header, HeaderValue, Method, StatusCode },
    response::{ IntoResponse, Response },
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use log::{ error, info };

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Clone)]
struct AppState {
    relay: Arc<LlmRelay>,
}

pub async fn start_http_server(
    addr: &str,
    relay: Arc<LlmRelay>,
    args: Args,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = addr.parse::<SocketAddr>()?;
    info!("Starting relay server on: http://{}", addr);

    let origin = args.allowed_origin.parse::<HeaderValue>()?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let app = Router::new()
        .route("/analyse", post(analyse_handler))
        .layer(cors)
        .with_state(AppState { relay });

    if args.enable_tls && args.tls_cert_path.is_some() && args.tls_key_path.is_some() {
        let cert_path = args.tls_cert_path.as_ref().unwrap();
        let key_path = args.tls_key_path.as_ref().unwrap();

        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            cert_path,
            key_path
        ).await?;

        info!("TLS enabled for relay server");
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

async fn analyse_handler(
    State(state): State<AppState>,
    Json(query): Json<HealthQuery>,
) -> Response {
    match state.relay.analyse(&query).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!("Symptom analysis failed: {}", e);
            let status = if e.is_validation() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::BAD_GATEWAY
            };
            (status, Json(ErrorBody { detail: e.to_string() })).into_response()
        }
    }
}
