//! Access gate middleware.
//!
//! Wraps a scope or resource and classifies each request before the handler
//! runs. The resolved [`Identity`] is stored in the request extensions where
//! handlers pick it up through the [`Identity`] / [`AuthenticatedUser`]
//! extractors.

use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures::future::LocalBoxFuture;
use tracing::{debug, info};

use crate::auth::TokenService;
use crate::error::{AppError, AuthError};

/// Username recorded for requests that carry no token in optional mode.
pub const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    User(String),
    Anonymous,
}

impl Identity {
    pub fn username(&self) -> &str {
        match self {
            Identity::User(username) => username,
            Identity::Anonymous => ANONYMOUS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// No header, or a bad token, is rejected.
    Mandatory,
    /// No header proceeds as anonymous; a bad token is still rejected.
    Optional,
}

#[derive(Clone)]
pub struct AccessGate {
    tokens: Arc<TokenService>,
    mode: GateMode,
}

impl AccessGate {
    pub fn mandatory(tokens: Arc<TokenService>) -> Self {
        Self { tokens, mode: GateMode::Mandatory }
    }

    pub fn optional(tokens: Arc<TokenService>) -> Self {
        Self { tokens, mode: GateMode::Optional }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AccessGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AccessGateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AccessGateMiddleware {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
            mode: self.mode,
        }))
    }
}

pub struct AccessGateMiddleware<S> {
    service: Rc<S>,
    tokens: Arc<TokenService>,
    mode: GateMode,
}

/// Classifies a raw `Authorization` header value.
///
/// A blank value counts as no header at all. A value without the `Bearer `
/// prefix is validated as-is and so fails as an invalid token.
pub fn classify(
    tokens: &TokenService,
    mode: GateMode,
    header: Option<&str>,
) -> Result<Identity, AppError> {
    match header.filter(|value| !value.trim().is_empty()) {
        None => match mode {
            GateMode::Mandatory => Err(AuthError::MissingToken.into()),
            GateMode::Optional => Ok(Identity::Anonymous),
        },
        Some(value) => {
            let token = value.strip_prefix("Bearer ").unwrap_or(value);
            tokens.validate(token).map(Identity::User)
        }
    }
}

impl<S, B> Service<ServiceRequest> for AccessGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();

        // Non UTF-8 bytes survive lossily and then fail validation.
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .map(|h| String::from_utf8_lossy(h.as_bytes()).into_owned());
        let outcome = classify(&self.tokens, self.mode, header.as_deref());

        Box::pin(async move {
            match outcome {
                Ok(identity) => {
                    debug!("Access gate resolved identity: {}", identity.username());
                    req.extensions_mut().insert(identity);
                    let response = srv.call(req).await?.map_into_left_body();
                    Ok(response)
                }
                Err(e) => {
                    info!("Access gate rejected {} {}: {}", req.method(), req.path(), e);
                    let response = e.error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Identity>()
                .cloned()
                .ok_or_else(|| AuthError::MissingToken.into()),
        )
    }
}

/// Extractor for handlers behind a mandatory gate.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = match req.extensions().get::<Identity>() {
            Some(Identity::User(username)) => Ok(AuthenticatedUser(username.clone())),
            _ => Err(AuthError::MissingToken.into()),
        };
        ready(result)
    }
}
