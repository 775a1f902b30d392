use reqwest::StatusCode;
use std::error::Error as StdError;
use std::io;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("catalog rejected the credentials (HTTP {0})")]
    Auth(u16),
    #[error("no bearer token available for the catalog")]
    MissingToken,
    #[error("catalog responded with HTTP {0}")]
    Http(u16),
    #[error("catalog request timed out")]
    Timeout,
    #[error("could not reach the catalog: {0}")]
    Transport(String),
    #[error("invalid catalog response: {0}")]
    Parse(String),
}

impl FetchError {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Auth(status.as_u16()),
            _ => Self::Http(status.as_u16()),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::MissingToken)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

fn is_timed_out_io(err: &(dyn StdError + 'static)) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|err| err.kind() == io::ErrorKind::TimedOut)
}

/// Deadlines hit inside the connector surface as a nested `TimedOut` io error.
fn timed_out_source(err: &(dyn StdError + 'static)) -> bool {
    let mut source = err.source();

    while let Some(err) = source {
        if is_timed_out_io(err) {
            return true;
        }
        source = err.source();
    }

    false
}

impl From<reqwest_middleware::Error> for FetchError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            reqwest_middleware::Error::Middleware(err) => {
                if err.chain().any(is_timed_out_io) {
                    Self::Timeout
                } else {
                    Self::Transport(err.to_string())
                }
            }
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || timed_out_source(&err) {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::from_status(status)
        } else {
            Self::Transport(err.to_string())
        }
    }
}
