#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App, HttpResponse};

    use wildtrails_tour_service::auth::extract_token_from_request;
    use wildtrails_tour_service::errors::AppError;
    use wildtrails_tour_service::handlers::logout;
    use wildtrails_tour_service::models::{ApiResponse, ListResponse};

    async fn fail_validation() -> Result<HttpResponse, AppError> {
        Err(AppError::validation("Password must be at least 8 characters"))
    }

    async fn fail_authentication() -> Result<HttpResponse, AppError> {
        Err(AppError::authentication("Incorrect email or password"))
    }

    async fn fail_authorization() -> Result<HttpResponse, AppError> {
        Err(AppError::authorization(
            "You do not have permission to perform this action",
        ))
    }

    async fn fail_not_found() -> Result<HttpResponse, AppError> {
        Err(AppError::not_found("There is no user with this email"))
    }

    async fn fail_unexpected() -> Result<HttpResponse, AppError> {
        Err(AppError::unexpected("database error: connection refused"))
    }

    fn error_app() -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .route("/validation", web::get().to(fail_validation))
            .route("/authentication", web::get().to(fail_authentication))
            .route("/authorization", web::get().to(fail_authorization))
            .route("/not-found", web::get().to(fail_not_found))
            .route("/unexpected", web::get().to(fail_unexpected))
    }

    #[actix_rt::test]
    async fn test_error_kinds_map_to_status_codes_and_fail_envelope() {
        let app = test::init_service(error_app()).await;

        for (path, expected) in [
            ("/validation", StatusCode::BAD_REQUEST),
            ("/authentication", StatusCode::UNAUTHORIZED),
            ("/authorization", StatusCode::FORBIDDEN),
            ("/not-found", StatusCode::NOT_FOUND),
        ] {
            let req = test::TestRequest::get().uri(path).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), expected, "path {}", path);

            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["status"], "fail");
            assert!(body["message"].is_string());
        }
    }

    #[actix_rt::test]
    async fn test_unexpected_error_hides_detail_from_the_client() {
        let app = test::init_service(error_app()).await;

        let req = test::TestRequest::get().uri("/unexpected").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Something went very wrong!");
    }

    #[actix_rt::test]
    async fn test_wrong_password_and_unknown_email_are_indistinguishable() {
        // both failure paths go through the same handler-visible error
        let wrong_password = AppError::authentication("Incorrect email or password");
        let unknown_email = AppError::authentication("Incorrect email or password");
        assert_eq!(wrong_password.public_message(), unknown_email.public_message());
    }

    #[actix_rt::test]
    async fn test_token_extraction_prefers_bearer_header() {
        let req = test::TestRequest::default()
            .insert_header(("authorization", "Bearer header-token"))
            .insert_header(("cookie", "jwt=cookie-token"))
            .to_http_request();
        assert_eq!(extract_token_from_request(&req), Some("header-token".to_string()));
    }

    #[actix_rt::test]
    async fn test_token_extraction_falls_back_to_jwt_cookie() {
        let req = test::TestRequest::default()
            .insert_header(("cookie", "theme=dark; jwt=cookie-token; lang=en"))
            .to_http_request();
        assert_eq!(extract_token_from_request(&req), Some("cookie-token".to_string()));

        let bare = test::TestRequest::default().to_http_request();
        assert_eq!(extract_token_from_request(&bare), None);
    }

    #[actix_rt::test]
    async fn test_logout_overwrites_the_session_cookie() {
        let resp = logout().await;
        assert_eq!(resp.status(), StatusCode::OK);

        let cookie = resp
            .headers()
            .get(actix_web::http::header::SET_COOKIE)
            .expect("logout must set a cookie")
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("jwt=loggedout"));
    }

    #[actix_rt::test]
    async fn test_success_envelopes() {
        let single = serde_json::to_value(ApiResponse::success(serde_json::json!({"ok": true})))
            .unwrap();
        assert_eq!(single["status"], "success");
        assert_eq!(single["data"]["ok"], true);

        let list = serde_json::to_value(ListResponse::success(vec![
            serde_json::json!({"name": "The Forest Hiker"}),
            serde_json::json!({"name": "The Sea Explorer"}),
        ]))
        .unwrap();
        assert_eq!(list["status"], "success");
        assert_eq!(list["results"], 2);
        assert!(list["requested_at"].is_string());
        assert_eq!(list["data"][0]["name"], "The Forest Hiker");
    }
}
