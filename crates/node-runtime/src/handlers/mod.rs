//! The HTTP surface of §6: one `axum` router per path shape
//! (`/{account}`, `/{account}/{container}`, `/{account}/{container}/*name`),
//! each handler doing nothing but extracting a `RequestContext` and the
//! operation's parameters before handing off to the `StorageFacade`.

mod account;
mod containers;
mod objects;
mod public;

use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Router;
use nimbus_types::Principal;
use nimbus_storage::RequestContext;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::container::AppState;

/// Header carrying the already-authenticated caller's principal. Identity
/// and authentication are an explicit Non-goal (§1): the core consumes an
/// opaque authenticated principal, and this is the header an upstream
/// auth-terminating proxy is expected to set.
const AUTH_USER_HEADER: &str = "x-auth-user";

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn request_context(headers: &HeaderMap, account: String) -> RequestContext {
    let user = headers
        .get(AUTH_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous");
    RequestContext { user: Principal::new(user), account }
}

/// Records a request counter and latency histogram per route/status, the
/// only metrics this node emits (§6 "Configuration" metrics_addr).
async fn track_metrics(req: Request, next: Next) -> impl IntoResponse {
    let method = req.method().to_string();
    let route = req.uri().path().to_string();
    let start = Instant::now();
    let response = next.run(req).await;
    let status = response.status().as_u16().to_string();
    metrics::counter!("nimbus_http_requests_total", "method" => method.clone(), "route" => route.clone(), "status" => status)
        .increment(1);
    metrics::histogram!("nimbus_http_request_duration_seconds", "method" => method, "route" => route)
        .record(start.elapsed().as_secs_f64());
    response
}

pub fn build_router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(track_metrics));

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/public/:token", get(public::resolve))
        .route(
            "/:account",
            get(account::list_containers)
                .head(account::account_stats)
                .post(account::update_account),
        )
        .route(
            "/:account/:container",
            put(containers::put_container)
                .get(containers::list_objects)
                .delete(containers::delete_container)
                .post(containers::update_container_policy),
        )
        .route(
            "/:account/:container/*name",
            put(objects::put_object)
                .get(objects::get_object)
                .head(objects::get_object)
                .post(objects::update_object)
                .delete(objects::delete_object),
        )
        .layer(middleware)
        .with_state(state)
}
