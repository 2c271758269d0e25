use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use std::io::Cursor;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("login failed: {0}")]
    LoginError(String),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("unexpected API response")]
    UnexpectedApiResponse,
    #[error("invalid API response ({1}): {0}")]
    InvalidResponse(String, String),
    #[error("unknown device type: {0}")]
    UnknownDeviceType(u64),
    #[error("rate exceeded: {0}")]
    RateExceeded(String),
    /// Invalid arguments, rejected before any request is made.
    #[error("invalid parameter: {0}")]
    ParameterError(String),
    /// V1 API reported a non-zero `error_code`.
    #[error("Error during {operation}: {error_code:?} {error_msg}")]
    V1ApiError {
        operation: String,
        error_code: Option<i64>,
        error_msg: String,
    },
    #[error("format error")]
    FormatError,
    #[error("internal error")]
    InternalError,
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        match self {
            Error::RateExceeded(s) => {
                let error = format!("<html><body><h3>429 Too Many Requests</h3>Growatt API response: <code>{}</code></body></html>", s);
                Response::build()
                    .status(Status::TooManyRequests)
                    .sized_body(error.len(), Cursor::new(error))
                    .header(ContentType::new("text", "html"))
                    .ok()
            }
            Error::LoginError(s) => {
                let error = format!("<html><body><h3>403 Forbidden</h3>Error while authenticating to Growatt API: <code>{}</code></body></html>", s);
                Response::build()
                    .status(Status::Forbidden)
                    .sized_body(error.len(), Cursor::new(error))
                    .header(ContentType::new("text", "html"))
                    .ok()
            }
            Error::ParameterError(s) => {
                let error = format!(
                    "<html><body><h3>400 Bad Request</h3><code>{}</code></body></html>",
                    s
                );
                Response::build()
                    .status(Status::BadRequest)
                    .sized_body(error.len(), Cursor::new(error))
                    .header(ContentType::new("text", "html"))
                    .ok()
            }
            _ => {
                let error = format!(
                    "<html><body><h3>Unknown exception</h3><code>{}</code></body></html>",
                    self
                );
                Response::build()
                    .status(Status::InternalServerError)
                    .sized_body(error.len(), Cursor::new(error))
                    .header(ContentType::new("text", "html"))
                    .ok()
            }
        }
    }
}
