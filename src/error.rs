use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP error! status: {0}")]
    Http(u16),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("local storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("local storage is corrupt: {0}")]
    StorageFormat(#[from] serde_json::Error),
}

impl ClientError {
    pub fn invalid_credentials() -> Self {
        ClientError::Auth("Invalid email or password".into())
    }

    pub fn not_logged_in() -> Self {
        ClientError::Auth("Not logged in. Run `dental-admin login` first".into())
    }

    pub fn missing_fields() -> Self {
        ClientError::Validation("Please fill in all fields".into())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return ClientError::Http(status.as_u16());
        }
        if e.is_decode() {
            return ClientError::Decode(e.to_string());
        }
        if e.is_timeout() {
            return ClientError::Network(format!("request timed out: {e}"));
        }
        ClientError::Network(e.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
