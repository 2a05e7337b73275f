use crate::error::Error;
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub(crate) struct APIError(anyhow::Error);

impl APIError {
    fn status(&self) -> StatusCode {
        // Form extractor rejections arrive through the blanket `From` below.
        if let Some(rejection) = self.0.downcast_ref::<FormRejection>() {
            return form_rejection_status(rejection);
        }
        match self.0.downcast_ref::<Error>() {
            Some(Error::AuthForbidden(_, _)) => StatusCode::FORBIDDEN,
            Some(
                Error::InvalidName(_, _)
                | Error::InvalidAddress(_)
                | Error::UnknownZone(_)
                | Error::ReservedName(_),
            ) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn form_rejection_status(rejection: &FormRejection) -> StatusCode {
    match rejection {
        FormRejection::InvalidFormContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        FormRejection::FailedToDeserializeForm(_) => StatusCode::UNPROCESSABLE_ENTITY,
        other => other.status(),
    }
}

impl IntoResponse for APIError {
    fn into_response(self) -> Response {
        let status = self.status();
        let any_err = self.0;
        if status.is_server_error() {
            tracing::error!("internal error handling API request: {any_err:?}");
        }
        let body = Json(json!({
            "error": format!("{any_err}"),
        }));
        (status, body).into_response()
    }
}

impl<E> From<E> for APIError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
