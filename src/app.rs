use std::net::SocketAddr;
use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::auth;
use crate::config::AppConfig;
use crate::state::AppState;

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn ana() -> Value {
        json!({"name": "Ana", "email": "a@x.com", "password": "secret1"})
    }

    fn with_bearer(method: &str, uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn full_session_scenario() {
        let app = build_app(AppState::fake());

        let (status, user) = call(&app, post_json("/register", ana())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user["id"], 1);
        assert!(user.get("password").is_none());

        let (status, login) = call(
            &app,
            post_json("/login", json!({"email": "a@x.com", "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = login["token"].as_str().unwrap().to_string();

        let (status, profile) = call(&app, with_bearer("GET", "/profile", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["id"], 1);
        assert_eq!(profile["name"], "Ana");
        assert_eq!(profile["email"], "a@x.com");
        assert!(profile["created_at"].is_string());

        let (status, out) = call(&app, with_bearer("POST", "/logout", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(out["message"], "Logout successful");

        // the token is not revoked by logout
        let (status, _) = call(&app, with_bearer("GET", "/profile", &token)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn duplicate_email_is_bad_request() {
        let app = build_app(AppState::fake());
        let body = json!({"name": "Ana", "email": "a@x.com", "password": "secret1"});
        assert_eq!(call(&app, post_json("/register", body.clone())).await.0, StatusCode::CREATED);

        let (status, err) = call(&app, post_json("/register", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"], "email already registered");
    }

    #[tokio::test]
    async fn invalid_input_is_bad_request() {
        let app = build_app(AppState::fake());
        let cases = [
            json!({"name": "Ana", "email": "nope", "password": "secret1"}),
            json!({"name": "Ana", "email": "a@x.com", "password": "12345"}),
            json!({"email": "a@x.com", "password": "secret1"}),
        ];
        for body in cases {
            let (status, err) = call(&app, post_json("/register", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(err["error"].is_string());
        }

        let garbage = Request::post("/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        assert_eq!(call(&app, garbage).await.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bad_login_is_unauthorized_and_generic() {
        let app = build_app(AppState::fake());
        call(&app, post_json("/register", ana())).await;

        let wrong_password = json!({"email": "a@x.com", "password": "wrong!!"});
        let unknown_email = json!({"email": "b@x.com", "password": "secret1"});
        let (s1, e1) = call(&app, post_json("/login", wrong_password)).await;
        let (s2, e2) = call(&app, post_json("/login", unknown_email)).await;
        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!(s2, StatusCode::UNAUTHORIZED);
        assert_eq!(e1, e2);
        assert_eq!(e1["error"], "invalid email or password");
    }

    #[tokio::test]
    async fn protected_routes_require_valid_bearer() {
        let app = build_app(AppState::fake());

        let bare = Request::get("/profile").body(Body::empty()).unwrap();
        let (status, err) = call(&app, bare).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(err["error"], "authorization header is required");

        let basic = Request::post("/logout")
            .header(header::AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap();
        let (status, err) = call(&app, basic).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(err["error"], "invalid token format");

        let (status, err) = call(&app, with_bearer("GET", "/profile", "a.b.c")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(err["error"], "invalid token");
    }

    #[tokio::test]
    async fn profile_of_missing_user_is_not_found() {
        let state = AppState::fake();
        let token = state.tokens.issue(99, "ghost@x.com").unwrap();
        let app = build_app(state);

        let (status, err) = call(&app, with_bearer("GET", "/profile", &token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err["error"], "user not found");
    }

    #[tokio::test]
    async fn logout_without_credential_is_server_error() {
        let state = AppState::fake();
        let token = state.tokens.issue(99, "ghost@x.com").unwrap();
        let app = build_app(state);

        let (status, err) = call(&app, with_bearer("POST", "/logout", &token)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err["error"], "internal server error");
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
