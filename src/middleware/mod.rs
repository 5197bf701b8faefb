use actix_web::{
    body::BoxBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};

use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::sync::Arc;

use crate::auth::extract_token_from_request;
use crate::services::AccountService;

/// The account attached to a request once its session verified.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub crate::models::User);

/// Strict session middleware: verification failure halts the request with
/// the error envelope. Routes behind this always see a `CurrentUser`.
pub struct RequireAuth {
    pub accounts: Arc<AccountService>,
}

impl<S> Transform<S, ServiceRequest> for RequireAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireAuthService {
            service: Arc::new(service),
            accounts: Arc::clone(&self.accounts),
        }))
    }
}

pub struct RequireAuthService<S> {
    service: Arc<S>,
    accounts: Arc<AccountService>,
}

impl<S> Service<ServiceRequest> for RequireAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Arc::clone(&self.service);
        let accounts = Arc::clone(&self.accounts);

        Box::pin(async move {
            let token = extract_token_from_request(&req);

            match accounts.authenticate(token.as_deref()).await {
                Ok(user) => {
                    req.extensions_mut().insert(CurrentUser(user));
                    service.call(req).await
                }
                Err(err) => {
                    use actix_web::ResponseError;
                    Ok(req.into_response(err.error_response()))
                }
            }
        })
    }
}

/// Lenient session middleware: a verified session attaches a `CurrentUser`,
/// any failure is treated as "not logged in" and the request proceeds.
pub struct OptionalAuth {
    pub accounts: Arc<AccountService>,
}

impl<S> Transform<S, ServiceRequest> for OptionalAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = OptionalAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(OptionalAuthService {
            service: Arc::new(service),
            accounts: Arc::clone(&self.accounts),
        }))
    }
}

pub struct OptionalAuthService<S> {
    service: Arc<S>,
    accounts: Arc<AccountService>,
}

impl<S> Service<ServiceRequest> for OptionalAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Arc::clone(&self.service);
        let accounts = Arc::clone(&self.accounts);

        Box::pin(async move {
            let token = extract_token_from_request(&req);

            if let Some(user) = accounts.identify(token.as_deref()).await {
                req.extensions_mut().insert(CurrentUser(user));
            }
            service.call(req).await
        })
    }
}

/// Request logging middleware
pub struct RequestLog;

impl<S> Transform<S, ServiceRequest> for RequestLog
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLogService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLogService {
            service: Arc::new(service),
        }))
    }
}

pub struct RequestLogService<S> {
    service: Arc<S>,
}

impl<S> Service<ServiceRequest> for RequestLogService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Arc::clone(&self.service);
        let start = std::time::Instant::now();
        let method = req.method().clone();
        let uri = req.uri().clone();

        Box::pin(async move {
            let result = service.call(req).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(res) => log::info!(
                    "{} {} {} {}ms",
                    method,
                    uri,
                    res.status().as_u16(),
                    elapsed.as_millis()
                ),
                Err(err) => log::error!("{} {} failed: {} {}ms", method, uri, err, elapsed.as_millis()),
            }

            result
        })
    }
}
