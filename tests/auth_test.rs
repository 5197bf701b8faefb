#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use wildtrails_tour_service::auth::{
        extract_bearer_token, hash_token, issued_before_password_change, reset_token_valid,
        AuthService,
    };
    use wildtrails_tour_service::config::AuthConfig;
    use wildtrails_tour_service::errors::AppError;
    use wildtrails_tour_service::models::{Role, User};
    use wildtrails_tour_service::services::{authorize, check_password_pair};

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret-do-not-use".to_string(),
            jwt_expires_in_hours: 1,
            jwt_cookie_expires_in_days: 1,
            // low cost keeps the test fast; production default is 12
            bcrypt_cost: 4,
            reset_token_ttl_minutes: 10,
        }
    }

    fn test_user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test Guide".to_string(),
            email: "guide@wildtrails.example".to_string(),
            photo: "default.jpg".to_string(),
            role,
            password_hash: String::new(),
            active: true,
            password_changed_at: None,
            password_reset_token: None,
            password_reset_expires: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let auth = AuthService::new(test_config());
        let hash = auth.hash_password("correct-horse-battery").unwrap();

        assert_ne!(hash, "correct-horse-battery");
        assert!(auth.verify_password("correct-horse-battery", &hash).unwrap());
        assert!(!auth.verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_token_roundtrip_preserves_subject() {
        let auth = AuthService::new(test_config());
        let user_id = Uuid::new_v4().to_string();

        let token = auth.sign_token(&user_id).unwrap();
        let claims = auth.decode_token(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let auth = AuthService::new(test_config());
        let mut other_config = test_config();
        other_config.jwt_secret = "a-different-secret".to_string();
        let other = AuthService::new(other_config);

        let token = other.sign_token("someone").unwrap();
        let err = auth.decode_token(&token).unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let auth = AuthService::new(test_config());
        assert!(matches!(
            auth.decode_token("not.a.token").unwrap_err(),
            AppError::Authentication(_)
        ));
    }

    #[test]
    fn test_password_change_invalidates_earlier_tokens() {
        let issued_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let changed_later = Utc.with_ymd_and_hms(2026, 3, 1, 12, 5, 0).unwrap();
        let changed_earlier = Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap();

        // token issued before the change: invalid
        assert!(issued_before_password_change(
            issued_at.timestamp(),
            Some(changed_later)
        ));
        // token issued after the change: still valid
        assert!(!issued_before_password_change(
            issued_at.timestamp(),
            Some(changed_earlier)
        ));
        // never changed: nothing to invalidate
        assert!(!issued_before_password_change(issued_at.timestamp(), None));
    }

    #[test]
    fn test_reset_token_generation() {
        let auth = AuthService::new(test_config());

        let (plaintext, stored_hash) = auth.generate_reset_token().unwrap();
        // 32 random bytes, hex encoded
        assert_eq!(plaintext.len(), 64);
        // the stored value is the one-way hash of the plaintext
        assert_eq!(stored_hash, hash_token(&plaintext));
        assert_ne!(stored_hash, plaintext);

        let (second, _) = auth.generate_reset_token().unwrap();
        assert_ne!(plaintext, second);
    }

    #[test]
    fn test_reset_token_redeems_exactly_once() {
        let now = Utc::now();
        let stored = hash_token("emailed-token");
        let expires = now + chrono::Duration::minutes(10);

        assert!(reset_token_valid(Some(&stored), Some(expires), &stored, now));
        // redemption clears both fields; the same token no longer verifies
        assert!(!reset_token_valid(None, None, &stored, now));
    }

    #[test]
    fn test_expired_reset_token_fails_despite_matching_hash() {
        let now = Utc::now();
        let stored = hash_token("emailed-token");

        assert!(!reset_token_valid(
            Some(&stored),
            Some(now - chrono::Duration::seconds(1)),
            &stored,
            now
        ));
        assert!(!reset_token_valid(Some(&stored), None, &stored, now));
        // a live record still rejects the wrong token
        assert!(!reset_token_valid(
            Some(&stored),
            Some(now + chrono::Duration::minutes(5)),
            &hash_token("some-other-token"),
            now
        ));
    }

    #[test]
    fn test_hash_token_is_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token(""), None);
    }

    #[test]
    fn test_authorize_by_role() {
        let admin = test_user(Role::Admin);
        let guide = test_user(Role::Guide);

        assert!(authorize(&admin, &[Role::Admin]).is_ok());
        let err = authorize(&guide, &[Role::Admin]).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        assert!(authorize(&guide, &[Role::Admin, Role::Guide]).is_ok());
    }

    #[test]
    fn test_password_pair_constraints() {
        assert!(check_password_pair("longenough", "longenough").is_ok());
        assert!(matches!(
            check_password_pair("short", "short").unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            check_password_pair("longenough", "different1").unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[test]
    fn test_serialized_user_never_contains_password_hash() {
        let mut user = test_user(Role::User);
        user.password_hash = "$2b$04$secret-hash".to_string();
        user.password_reset_token = Some("reset-hash".to_string());

        let json = serde_json::to_value(&user).unwrap();
        let rendered = json.to_string();

        assert!(json.get("password_hash").is_none());
        assert!(json.get("password_reset_token").is_none());
        assert!(!rendered.contains("secret-hash"));
        assert!(!rendered.contains("reset-hash"));
    }
}
