use std::rc::Rc;
use std::sync::Arc;

use actix_service::{forward_ready, Service};
use actix_web::body::EitherBody;
use actix_web::dev::{ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{Error, HttpMessage};
use futures::future::{ok, LocalBoxFuture, Ready};

use crate::gate::Gate;
use crate::models::Role;

/// Middleware factory guarding a resource with the [`Gate`].
///
/// On success the resolved [`crate::models::AuthUser`] is stored in the
/// request extensions for handlers to pick up with `web::ReqData`.
pub struct AuthMiddleware {
    gate: Arc<Gate>,
    allowed: &'static [Role],
}

impl AuthMiddleware {
    pub fn new(gate: Arc<Gate>, allowed: &'static [Role]) -> Self {
        AuthMiddleware { gate, allowed }
    }

    pub fn admin(gate: Arc<Gate>) -> Self {
        Self::new(gate, Role::ADMIN_ONLY)
    }

    pub fn any_account(gate: Arc<Gate>) -> Self {
        Self::new(gate, Role::ANY_ACCOUNT)
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Rc::new(service),
            gate: self.gate.clone(),
            allowed: self.allowed,
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    gate: Arc<Gate>,
    allowed: &'static [Role],
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let gate = self.gate.clone();
        let service = self.service.clone();
        let allowed = self.allowed;

        Box::pin(async move {
            let header = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);

            match gate.check(header.as_deref(), allowed).await {
                Ok(user) => {
                    req.extensions_mut().insert(user);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(err) => Ok(req.error_response(err).map_into_right_body()),
            }
        })
    }
}
