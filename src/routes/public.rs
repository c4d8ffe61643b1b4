use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::{PrivateCookieJar, WithRejection};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::{self, AuthenticatedUser, CurrentUser},
    error::AppError,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register_submit))
        .route("/auth/login", post(login_submit))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct LoginForm {
    identifier: String,
    password: String,
}

async fn login_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    WithRejection(Json(form), _): WithRejection<Json<LoginForm>, AppError>,
) -> Result<(PrivateCookieJar, Json<AuthenticatedUser>), AppError> {
    let user = auth::authenticate_user(&state, &form.identifier, &form.password).await?;
    let session_id = auth::create_session(&state, user.id).await?;
    Ok((auth::apply_session_cookie(jar, &session_id), Json(user)))
}

#[derive(Deserialize)]
struct RegisterForm {
    username: String,
    email: String,
    password: String,
    password_confirm: String,
}

async fn register_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    WithRejection(Json(form), _): WithRejection<Json<RegisterForm>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    if form.password != form.password_confirm {
        return Err(AppError::invalid_field(
            "password_confirm",
            "Passwords do not match.",
        ));
    }

    let user = auth::register_user(&state, &form.username, &form.email, &form.password).await?;
    let session_id = auth::create_session(&state, user.id).await?;
    Ok((
        StatusCode::CREATED,
        auth::apply_session_cookie(jar, &session_id),
        Json(user),
    ))
}

async fn logout(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, StatusCode), AppError> {
    if let Some(cookie) = jar.get(auth::SESSION_COOKIE) {
        auth::destroy_session(&state, cookie.value()).await?;
    }
    Ok((auth::clear_session_cookie(jar), StatusCode::NO_CONTENT))
}

async fn me(current: CurrentUser) -> Result<Json<AuthenticatedUser>, AppError> {
    Ok(Json(current.require_user()?.clone()))
}
