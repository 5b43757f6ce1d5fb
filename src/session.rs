use tracing::{info, warn};

use crate::api::ClinicApi;
use crate::error::{ClientError, ClientResult};
use crate::models::{AdminProfile, LoginRequest, LoginResponse};
use crate::storage::{LocalStorage, TOKEN_KEY, USER_KEY};

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub admin: AdminProfile,
}

impl Session {
    /// A login response counts only if it carries both a token and an admin.
    pub fn from_response(res: LoginResponse) -> ClientResult<Self> {
        match (res.token, res.admin) {
            (Some(token), Some(admin)) if !token.trim().is_empty() => Ok(Self { token, admin }),
            _ => Err(ClientError::invalid_credentials()),
        }
    }
}

pub async fn login(
    api: &dyn ClinicApi,
    storage: &LocalStorage,
    email: &str,
    password: &str,
) -> ClientResult<Session> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ClientError::missing_fields());
    }

    let request = LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    };
    let response = match api.login(&request).await {
        Ok(res) => res,
        Err(ClientError::Http(400 | 401 | 403 | 404)) => {
            warn!(email, "login rejected");
            return Err(ClientError::invalid_credentials());
        }
        Err(e) => return Err(e),
    };

    let session = Session::from_response(response)?;
    storage.set(TOKEN_KEY, &session.token)?;
    storage.set(USER_KEY, &session.admin)?;
    info!(admin = session.admin.display_name(), "logged in");
    Ok(session)
}

/// The persisted session, if both the token and the admin profile are present.
pub fn restore(storage: &LocalStorage) -> ClientResult<Option<Session>> {
    let token: Option<String> = storage.get(TOKEN_KEY)?;
    let admin: Option<AdminProfile> = storage.get(USER_KEY)?;
    Ok(match (token, admin) {
        (Some(token), Some(admin)) => Some(Session { token, admin }),
        _ => None,
    })
}

/// Guard for everything except `login`.
pub fn require(storage: &LocalStorage) -> ClientResult<Session> {
    restore(storage)?.ok_or_else(ClientError::not_logged_in)
}

pub fn logout(storage: &LocalStorage) -> ClientResult<()> {
    storage.remove(TOKEN_KEY)?;
    storage.remove(USER_KEY)?;
    info!("logged out");
    Ok(())
}
