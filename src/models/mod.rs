use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Account record. The password hash and reset-token fields never leave
/// the process: they are skipped during serialization and only the
/// database layer reads them.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub photo: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub active: bool,
    #[serde(skip_serializing)]
    pub password_changed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fixed, closed role set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "lead-guide")]
    LeadGuide,
    #[serde(rename = "guide")]
    Guide,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::LeadGuide => "lead-guide",
            Role::Guide => "guide",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            "lead-guide" => Role::LeadGuide,
            "guide" => Role::Guide,
            _ => Role::User,
        }
    }
}

/// Tour catalogue record.
#[derive(Debug, Clone, Serialize)]
pub struct Tour {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub duration: i64,
    pub max_group_size: i64,
    pub difficulty: String,
    pub ratings_average: f64,
    pub ratings_quantity: i64,
    pub price: i64,
    pub summary: String,
    pub description: Option<String>,
    pub image_cover: String,
    #[serde(skip_serializing)]
    pub secret_tour: bool,
    pub created_at: DateTime<Utc>,
}

/// Signup payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, message = "A user must have a name"))]
    pub name: String,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    pub password_confirm: String,
}

/// Login payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Please provide a password"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub password: String,
    pub password_confirm: String,
}

/// Profile update payload. Password fields are deliberately absent; the
/// handler rejects requests that try to smuggle them in.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, message = "A user must have a name"))]
    pub name: Option<String>,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTourRequest {
    #[validate(length(min = 10, max = 40, message = "A tour name must be 10-40 characters"))]
    pub name: String,
    pub duration: i64,
    pub max_group_size: i64,
    pub difficulty: String,
    pub price: i64,
    #[validate(length(min = 1, message = "A tour must have a summary"))]
    pub summary: String,
    pub description: Option<String>,
    pub image_cover: String,
    #[serde(default)]
    pub secret_tour: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTourRequest {
    pub name: Option<String>,
    pub duration: Option<i64>,
    pub max_group_size: Option<i64>,
    pub difficulty: Option<String>,
    pub price: Option<i64>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub image_cover: Option<String>,
    pub secret_tour: Option<bool>,
}

/// Standard success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            data,
        }
    }
}

/// List envelope: success plus result count and request timestamp.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub status: &'static str,
    pub requested_at: DateTime<Utc>,
    pub results: usize,
    pub data: Vec<T>,
}

impl<T: Serialize> ListResponse<T> {
    pub fn success(data: Vec<T>) -> Self {
        Self {
            status: "success",
            requested_at: Utc::now(),
            results: data.len(),
            data,
        }
    }
}

/// Issued after signup, login and password changes.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub status: &'static str,
    pub token: String,
    pub data: TokenResponseData,
}

#[derive(Debug, Serialize)]
pub struct TokenResponseData {
    pub user: User,
}

impl TokenResponse {
    pub fn new(token: String, user: User) -> Self {
        Self {
            status: "success",
            token,
            data: TokenResponseData { user },
        }
    }
}
