use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post, MethodRouter},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::{Gate, Subject, TokenCodec};
use crate::config::AppConfig;
use crate::database::Store;
use crate::handlers::{protected, public};
use crate::middleware::require_auth;

/// Shared, read-only per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenCodec>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn gate(&self, subject: Subject) -> Gate<'_, dyn Store> {
        Gate::new(&*self.store, subject)
    }

    /// Row cap for list endpoints
    pub fn get_limit(&self) -> i64 {
        self.config.database.get_limit
    }
}

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Public
        .route("/", get(public::home::home).options(public::home::options))
        .route("/health", get(public::home::health))
        .route("/login", post(public::login::login).options(public::login::options))
        // Resources
        .merge(user_routes(&state))
        .merge(form_routes(&state))
        .merge(subscription_routes(&state))
        .merge(profile_link_routes(&state))
        .merge(report_routes(&state))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wraps instance mutations in the token middleware
fn authenticated(state: &AppState, routes: MethodRouter<AppState>) -> MethodRouter<AppState> {
    routes.route_layer(from_fn_with_state(state.clone(), require_auth))
}

fn user_routes(state: &AppState) -> Router<AppState> {
    use axum::routing::put;
    use protected::users;

    Router::new()
        .route(
            "/user",
            get(users::list).post(users::create).options(users::options),
        )
        .route(
            "/user/:id",
            get(users::show).merge(authenticated(state, put(users::update).delete(users::remove))),
        )
}

fn form_routes(state: &AppState) -> Router<AppState> {
    use axum::routing::put;
    use protected::forms;

    Router::new()
        .route(
            "/form",
            get(forms::list).post(forms::create).options(forms::options),
        )
        .route(
            "/form/:id",
            get(forms::show).merge(authenticated(state, put(forms::update).delete(forms::remove))),
        )
}

fn subscription_routes(state: &AppState) -> Router<AppState> {
    use axum::routing::put;
    use protected::subscriptions;

    Router::new()
        .route(
            "/subscription",
            get(subscriptions::list)
                .post(subscriptions::create)
                .options(subscriptions::options),
        )
        .route(
            "/subscription/:id",
            get(subscriptions::show).merge(authenticated(
                state,
                put(subscriptions::update).delete(subscriptions::remove),
            )),
        )
}

fn profile_link_routes(state: &AppState) -> Router<AppState> {
    use axum::routing::delete;
    use protected::profile_links;

    Router::new()
        .route(
            "/profile-link",
            get(profile_links::list)
                .post(profile_links::create)
                .options(profile_links::options),
        )
        // GET addresses a link by hash, DELETE by id
        .route(
            "/profile-link/:key",
            get(profile_links::show).merge(authenticated(state, delete(profile_links::remove))),
        )
}

fn report_routes(state: &AppState) -> Router<AppState> {
    use axum::routing::delete;
    use protected::reports;

    Router::new()
        .route(
            "/subscription-report",
            get(reports::list).post(reports::create).options(reports::options),
        )
        // GET addresses a report by path, DELETE by id
        .route(
            "/subscription-report/:key",
            get(reports::show).merge(authenticated(state, delete(reports::remove))),
        )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.is_development() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
