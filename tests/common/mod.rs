#![allow(dead_code)]

use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use voyage::{
    auth::{self, AuthenticatedUser},
    config::{AiConfig, AppConfig, RoutingConfig, WeatherConfig},
    db::{init_pool, run_migrations},
    routes::create_router,
    state::AppState,
};

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    _root: TempDir,
}

impl TestApp {
    /// Fresh database; every upstream points at `upstream_url`.
    pub async fn new(upstream_url: &str) -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir")?;
        let database_url = format!("sqlite://{}", root.path().join("test.sqlite").display());
        let timeout = Duration::from_secs(5);

        let config = AppConfig {
            database_url,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cookie_secret: "test-cookie-secret".into(),
            weather: WeatherConfig {
                base_url: upstream_url.into(),
                api_key: "weather-key".into(),
                timeout,
            },
            ai: AiConfig {
                base_url: upstream_url.into(),
                api_key: "ai-key".into(),
                model: "test-model".into(),
                timeout,
            },
            routing: RoutingConfig {
                base_url: upstream_url.into(),
                api_key: "routing-key".into(),
                timeout,
            },
        };

        let db = init_pool(&config.database_url).await?;
        run_migrations(&db).await?;
        let state = AppState::new(config, db)?;
        let router = create_router(state.clone());
        Ok(Self {
            state,
            router,
            _root: root,
        })
    }

    pub async fn user(&self, username: &str) -> AuthenticatedUser {
        auth::register_user(
            &self.state,
            username,
            &format!("{username}@example.com"),
            "correct horse battery",
        )
        .await
        .expect("register user")
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        user: Option<&AuthenticatedUser>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send(request(method, uri, user, body)).await
    }
}

pub fn request(
    method: &str,
    uri: &str,
    user: Option<&AuthenticatedUser>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.extension(user.clone());
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}
