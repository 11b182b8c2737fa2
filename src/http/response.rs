//! Response mapping for the HTTP surface.
//!
//! Successful pipeline runs answer `200` with the JSON envelope; the origin's
//! own status travels inside it. Failures answer with the error's status and
//! an [`ErrorBody`](crate::error::ErrorBody).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::ProxyError;
use crate::proxy::ProxyResponse;

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_body())).into_response()
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RejectReason;

    #[test]
    fn test_error_status() {
        let response = ProxyError::PolicyRejected(RejectReason::DomainBlocked).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = ProxyError::ContentTooLarge { limit: 1 }.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_envelope_is_200_even_for_origin_errors() {
        let mut inner = ProxyResponse::unavailable();
        inner.status = 404;
        assert_eq!(inner.into_response().status(), StatusCode::OK);
    }
}
