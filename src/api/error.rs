use std::fmt;

#[derive(Debug, Clone)]
pub enum Error {
    LoginError(String),
    ApiError(String),
    /// The API answered but refused the request (4xx or `"success": false`)
    Refused(String),
    UnexpectedApiResponse,
    /// Response body and the parser message
    InvalidResponse(String, String),
    RateExceeded(String),
    NoSite,
    InternalError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LoginError(s) => write!(f, "login failed: {}", s),
            Error::ApiError(s) => write!(f, "API error: {}", s),
            Error::Refused(s) => write!(f, "request refused: {}", s),
            Error::UnexpectedApiResponse => write!(f, "unexpected API response"),
            Error::InvalidResponse(body, e) => write!(f, "invalid response ({}): {}", e, body),
            Error::RateExceeded(s) => write!(f, "rate exceeded: {}", s),
            Error::NoSite => write!(f, "no site registered for this account"),
            Error::InternalError(s) => write!(f, "internal error: {}", s),
        }
    }
}

impl std::error::Error for Error {}
