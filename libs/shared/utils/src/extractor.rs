use axum::{
    body::Body,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

use shared_models::actor::{Actor, ActorRole};
use shared_models::error::AppError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

// Identity is authenticated by the gateway in front of this service; the
// middleware only turns the forwarded headers into an `Actor` extension.
pub async fn actor_middleware(
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let actor = actor_from_headers(request.headers())?;
    debug!("Request actor {:?} ({:?})", actor.id, actor.role);

    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let id = match headers.get(ACTOR_ID_HEADER) {
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|_| AppError::BadRequest("Invalid actor id header".to_string()))?;
            Some(
                Uuid::parse_str(raw.trim())
                    .map_err(|_| AppError::BadRequest(format!("Invalid actor id: {}", raw)))?,
            )
        }
        None => None,
    };

    let role = match headers.get(ACTOR_ROLE_HEADER) {
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|_| AppError::BadRequest("Invalid actor role header".to_string()))?;
            ActorRole::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown actor role: {}", raw)))?
        }
        None => ActorRole::Staff,
    };

    Ok(Actor { id, role })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::HeaderValue;

    #[test]
    fn test_missing_headers_default_to_staff() {
        let actor = actor_from_headers(&HeaderMap::new()).unwrap();
        assert_eq!(actor, Actor::anonymous());
    }

    #[test]
    fn test_headers_parsed() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_static("scheduler"));

        let actor = actor_from_headers(&headers).unwrap();
        assert_eq!(actor.id, Some(id));
        assert!(actor.is_privileged());
    }

    #[test]
    fn test_bad_headers_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert_matches!(actor_from_headers(&headers), Err(AppError::BadRequest(_)));

        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_static("pirate"));
        assert_matches!(actor_from_headers(&headers), Err(AppError::BadRequest(_)));
    }
}
