use actix_web::cookie::{time::Duration as CookieDuration, Cookie};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::middleware::CurrentUser;
use crate::models::{
    ApiResponse, CreateTourRequest, ForgotPasswordRequest, ListResponse, LoginRequest,
    ResetPasswordRequest, Role, SignupRequest, TokenResponse, UpdateMeRequest, UpdatePasswordRequest,
    UpdateTourRequest, User,
};
use crate::query::Query;
use crate::services::{authorize, AccountService, TourService};

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

/// Run validator-derive checks, mapping the first failure to a
/// ValidationError.
fn validate_payload(payload: &impl Validate) -> Result<(), AppError> {
    payload.validate().map_err(|errors| {
        let message = errors
            .field_errors()
            .into_iter()
            .flat_map(|(_, errs)| errs.iter())
            .filter_map(|e| e.message.as_ref())
            .map(|m| m.to_string())
            .next()
            .unwrap_or_else(|| "Invalid input".to_string());
        AppError::validation(message)
    })
}

/// Attach the session token as the `jwt` cookie and send the standard
/// token envelope.
fn send_token(
    accounts: &AccountService,
    user: User,
    token: String,
    status: actix_web::http::StatusCode,
) -> HttpResponse {
    let cookie = Cookie::build("jwt", token.clone())
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::seconds(accounts.auth.cookie_max_age_seconds()))
        .finish();

    HttpResponse::build(status)
        .cookie(cookie)
        .json(TokenResponse::new(token, user))
}

fn current_user(req: &HttpRequest) -> Result<User, AppError> {
    req.extensions()
        .get::<CurrentUser>()
        .map(|c| c.0.clone())
        .ok_or_else(|| {
            AppError::authentication("You are not logged in. Please log in to get access.")
        })
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::validation(format!("Invalid id: {}", raw)))
}

pub async fn sign_up(
    req: web::Json<SignupRequest>,
    accounts: web::Data<Arc<AccountService>>,
) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();
    validate_payload(&req)?;

    let (user, token) = accounts.sign_up(req).await?;
    Ok(send_token(&accounts, user, token, actix_web::http::StatusCode::CREATED))
}

pub async fn login(
    req: web::Json<LoginRequest>,
    accounts: web::Data<Arc<AccountService>>,
) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();
    validate_payload(&req)?;

    let (user, token) = accounts.login(req).await?;
    Ok(send_token(&accounts, user, token, actix_web::http::StatusCode::OK))
}

/// Overwrite the session cookie with a short-lived dummy value.
pub async fn logout() -> HttpResponse {
    let cookie = Cookie::build("jwt", "loggedout")
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::seconds(10))
        .finish();

    HttpResponse::Ok()
        .cookie(cookie)
        .json(serde_json::json!({ "status": "success" }))
}

/// The reset token travels out-of-band only; the response never carries it.
pub async fn forgot_password(
    req: web::Json<ForgotPasswordRequest>,
    accounts: web::Data<Arc<AccountService>>,
) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();
    validate_payload(&req)?;

    accounts.forgot_password(&req.email).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "message": "Token sent to email!",
    })))
}

pub async fn reset_password(
    path: web::Path<String>,
    req: web::Json<ResetPasswordRequest>,
    accounts: web::Data<Arc<AccountService>>,
) -> Result<HttpResponse, AppError> {
    let token = path.into_inner();
    let req = req.into_inner();

    let (user, session) = accounts
        .reset_password(&token, &req.password, &req.password_confirm)
        .await?;
    Ok(send_token(&accounts, user, session, actix_web::http::StatusCode::OK))
}

pub async fn update_my_password(
    http_req: HttpRequest,
    req: web::Json<UpdatePasswordRequest>,
    accounts: web::Data<Arc<AccountService>>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&http_req)?;
    let req = req.into_inner();

    let (user, session) = accounts
        .change_password(&user.id, &req.current_password, &req.password, &req.password_confirm)
        .await?;
    Ok(send_token(&accounts, user, session, actix_web::http::StatusCode::OK))
}

pub async fn get_me(http_req: HttpRequest) -> Result<HttpResponse, AppError> {
    let user = current_user(&http_req)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({ "user": user }))))
}

pub async fn update_me(
    http_req: HttpRequest,
    body: web::Json<serde_json::Value>,
    accounts: web::Data<Arc<AccountService>>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&http_req)?;
    let body = body.into_inner();

    // Password changes go through their own route with current-password
    // verification; this one silently ignoring them would be worse.
    if body.get("password").is_some() || body.get("password_confirm").is_some() {
        return Err(AppError::validation(
            "This route is not for password updates. Please use /update-my-password.",
        ));
    }

    let req: UpdateMeRequest = serde_json::from_value(body)
        .map_err(|e| AppError::validation(format!("Invalid input: {}", e)))?;
    validate_payload(&req)?;

    let updated = accounts
        .update_profile(&user.id, req.name.as_deref(), req.email.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({ "user": updated }))))
}

pub async fn delete_me(
    http_req: HttpRequest,
    accounts: web::Data<Arc<AccountService>>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&http_req)?;
    accounts.deactivate(&user.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Admin listing over the generic query builder.
pub async fn list_users(
    http_req: HttpRequest,
    params: web::Query<HashMap<String, String>>,
    accounts: web::Data<Arc<AccountService>>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&http_req)?;
    authorize(&user, &[Role::Admin])?;

    let query = Query::build(&params.into_inner());
    let users = accounts.list_users(&query).await?;
    Ok(HttpResponse::Ok().json(ListResponse::success(users)))
}

/// Public tour listing over the generic query builder.
pub async fn list_tours(
    params: web::Query<HashMap<String, String>>,
    tours: web::Data<Arc<TourService>>,
) -> Result<HttpResponse, AppError> {
    let query = Query::build(&params.into_inner());
    let found = tours.list(&query).await?;
    Ok(HttpResponse::Ok().json(ListResponse::success(found)))
}

pub async fn get_tour(
    path: web::Path<String>,
    tours: web::Data<Arc<TourService>>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path.into_inner())?;
    let tour = tours.get(&id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({ "tour": tour }))))
}

pub async fn create_tour(
    http_req: HttpRequest,
    req: web::Json<CreateTourRequest>,
    tours: web::Data<Arc<TourService>>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&http_req)?;
    authorize(&user, &[Role::Admin, Role::LeadGuide])?;

    let req = req.into_inner();
    validate_payload(&req)?;

    let tour = tours.create(&req).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(serde_json::json!({ "tour": tour }))))
}

pub async fn update_tour(
    http_req: HttpRequest,
    path: web::Path<String>,
    req: web::Json<UpdateTourRequest>,
    tours: web::Data<Arc<TourService>>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&http_req)?;
    authorize(&user, &[Role::Admin, Role::LeadGuide])?;

    let id = parse_id(&path.into_inner())?;
    let tour = tours.update(&id, &req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({ "tour": tour }))))
}

pub async fn delete_tour(
    http_req: HttpRequest,
    path: web::Path<String>,
    tours: web::Data<Arc<TourService>>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&http_req)?;
    authorize(&user, &[Role::Admin, Role::LeadGuide])?;

    let id = parse_id(&path.into_inner())?;
    tours.delete(&id).await?;
    Ok(HttpResponse::NoContent().finish())
}
