use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::{self, AuthService};
use crate::database::DatabaseService;
use crate::email::Mailer;
use crate::errors::AppError;
use crate::models::{
    CreateTourRequest, LoginRequest, Role, SignupRequest, Tour, UpdateTourRequest, User,
};
use crate::query::Query;

/// Pure role check. Composed after `authenticate`, which supplies the
/// identified account.
pub fn authorize(user: &User, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::authorization(
            "You do not have permission to perform this action",
        ))
    }
}

/// Password/confirmation constraints shared by signup, reset and change.
pub fn check_password_pair(password: &str, password_confirm: &str) -> Result<(), AppError> {
    if password.len() < 8 {
        return Err(AppError::validation("Password must be at least 8 characters"));
    }
    if password != password_confirm {
        return Err(AppError::validation(
            "Password and confirm password are not the same",
        ));
    }
    Ok(())
}

/// Credential and session manager: account creation, password verification,
/// token issuance and verification, and the password-reset lifecycle.
pub struct AccountService {
    pub db: Arc<DatabaseService>,
    pub auth: Arc<AuthService>,
    pub mailer: Arc<dyn Mailer>,
    base_url: String,
}

impl AccountService {
    pub fn new(
        db: Arc<DatabaseService>,
        auth: Arc<AuthService>,
        mailer: Arc<dyn Mailer>,
        base_url: String,
    ) -> Self {
        Self {
            db,
            auth,
            mailer,
            base_url,
        }
    }

    /// Create an account and log it in. The confirmation field never leaves
    /// this function; the welcome email is best-effort and cannot fail the
    /// signup.
    pub async fn sign_up(&self, req: SignupRequest) -> Result<(User, String), AppError> {
        check_password_pair(&req.password, &req.password_confirm)?;

        let password_hash = self.auth.hash_password(&req.password)?;
        let mut user = self.db.create_user(&req.name, &req.email, &password_hash).await?;

        let mailer = Arc::clone(&self.mailer);
        let welcome_user = user.clone();
        let url = format!("{}/me", self.base_url);
        tokio::spawn(async move {
            if let Err(e) = mailer.send_welcome(&welcome_user, &url).await {
                log::warn!("welcome email to {} failed: {}", welcome_user.email, e);
            }
        });

        let token = self.auth.sign_token(&user.id.to_string())?;
        user.password_hash = String::new();
        Ok((user, token))
    }

    /// Verify credentials and issue a token. The failure message never
    /// reveals whether the email or the password was wrong.
    pub async fn login(&self, req: LoginRequest) -> Result<(User, String), AppError> {
        let mut user = self
            .db
            .find_user_by_email(&req.email)
            .await?
            .ok_or_else(|| AppError::authentication("Incorrect email or password"))?;

        if !self.auth.verify_password(&req.password, &user.password_hash)? {
            return Err(AppError::authentication("Incorrect email or password"));
        }

        let token = self.auth.sign_token(&user.id.to_string())?;
        user.password_hash = String::new();
        Ok((user, token))
    }

    /// Strict session verification: any failure halts the request.
    /// Checks, in order: token present, signature and expiry valid, account
    /// still exists and is active, token not issued before the last
    /// password change.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<User, AppError> {
        let token = token.ok_or_else(|| {
            AppError::authentication("You are not logged in. Please log in to get access.")
        })?;

        let claims = self.auth.decode_token(token)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::authentication("Invalid or expired session. Please log in again."))?;

        let mut user = self.db.find_user_by_id(&user_id).await?.ok_or_else(|| {
            AppError::authentication("The user belonging to this token does no longer exist.")
        })?;

        if auth::issued_before_password_change(claims.iat, user.password_changed_at) {
            return Err(AppError::authentication(
                "User changed password recently. Please log in again.",
            ));
        }

        user.password_hash = String::new();
        Ok(user)
    }

    /// Lenient session verification: every failure is treated as "no
    /// session". Used for pages that merely vary by login state.
    pub async fn identify(&self, token: Option<&str>) -> Option<User> {
        self.authenticate(token).await.ok()
    }

    /// Issue a reset token and dispatch it out-of-band. If dispatch fails
    /// the stored token is rolled back, since an undeliverable token would
    /// block the reset window until it expires.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let user = self
            .db
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::not_found("There is no user with this email"))?;

        let (plaintext, token_hash) = self.auth.generate_reset_token()?;
        let expires_at = Utc::now() + self.auth.reset_token_ttl();
        self.db.set_password_reset(&user.id, &token_hash, expires_at).await?;

        let reset_url = format!("{}/api/v1/users/reset-password/{}", self.base_url, plaintext);
        if let Err(e) = self.mailer.send_password_reset(&user, &reset_url).await {
            log::error!("password reset dispatch to {} failed: {}", user.email, e);
            if let Err(rollback) = self.db.clear_password_reset(&user.id, &token_hash).await {
                log::error!("reset-token rollback for {} failed: {}", user.id, rollback);
            }
            return Err(AppError::dispatch(
                "There was an error sending the email. Please try again later.",
            ));
        }

        Ok(())
    }

    /// Redeem a reset token. Succeeds at most once per token: the stored
    /// hash is cleared by the same write that sets the new password.
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<(User, String), AppError> {
        let token_hash = auth::hash_token(token);
        let mut user = self
            .db
            .find_user_by_reset_token(&token_hash)
            .await?
            .ok_or_else(|| AppError::validation("Token is invalid or expired"))?;

        // The lookup already narrows to live tokens; re-check on the record
        // itself so the rule does not live in the store alone.
        if !auth::reset_token_valid(
            user.password_reset_token.as_deref(),
            user.password_reset_expires,
            &token_hash,
            Utc::now(),
        ) {
            return Err(AppError::validation("Token is invalid or expired"));
        }

        check_password_pair(password, password_confirm)?;

        let password_hash = self.auth.hash_password(password)?;
        self.db.update_password(&user.id, &password_hash).await?;

        let session = self.auth.sign_token(&user.id.to_string())?;
        user.password_hash = String::new();
        Ok((user, session))
    }

    /// Change the password of a logged-in account. Same effects as a
    /// successful reset: prior session tokens stop verifying.
    pub async fn change_password(
        &self,
        user_id: &Uuid,
        current_password: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<(User, String), AppError> {
        let mut user = self.db.find_user_by_id(user_id).await?.ok_or_else(|| {
            AppError::authentication("The user belonging to this token does no longer exist.")
        })?;

        if !self.auth.verify_password(current_password, &user.password_hash)? {
            return Err(AppError::authentication("Your current password is wrong"));
        }

        check_password_pair(password, password_confirm)?;

        let password_hash = self.auth.hash_password(password)?;
        self.db.update_password(&user.id, &password_hash).await?;

        let session = self.auth.sign_token(&user.id.to_string())?;
        user.password_hash = String::new();
        Ok((user, session))
    }

    pub async fn list_users(&self, query: &Query) -> Result<Vec<serde_json::Value>, AppError> {
        self.db.list_users(query).await
    }

    pub async fn update_profile(
        &self,
        user_id: &Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, AppError> {
        self.db
            .update_user_profile(user_id, name, email)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    pub async fn deactivate(&self, user_id: &Uuid) -> Result<(), AppError> {
        self.db.deactivate_user(user_id).await
    }
}

/// Tour catalogue service
pub struct TourService {
    pub db: Arc<DatabaseService>,
}

impl TourService {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    pub async fn list(&self, query: &Query) -> Result<Vec<serde_json::Value>, AppError> {
        self.db.list_tours(query).await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Tour, AppError> {
        self.db
            .get_tour(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No tour found with the id: {}", id)))
    }

    pub async fn create(&self, req: &CreateTourRequest) -> Result<Tour, AppError> {
        self.db.create_tour(req).await
    }

    pub async fn update(&self, id: &Uuid, req: &UpdateTourRequest) -> Result<Tour, AppError> {
        self.db
            .update_tour(id, req)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No tour found with the id: {}", id)))
    }

    pub async fn delete(&self, id: &Uuid) -> Result<(), AppError> {
        if self.db.delete_tour(id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("No tour found with the id: {}", id)))
        }
    }
}
