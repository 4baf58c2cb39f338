use crate::domain::calendar::CalendarEvent;
use crate::domain::directory::driven_ports::{DelegatedTokenSource, DirectoryApi};
use crate::domain::directory::driving_ports::DirectoryError;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use std::fmt::{self, Debug, Formatter};
use thiserror::Error;
use tracing::info;

/// Delegated scopes needed to look up the directory's user list
pub const USER_LISTING_SCOPES: &[&str] = &["user.read.all"];

/// Delegated scopes needed to read the caller's profile and write to their calendar
pub const CALENDAR_EVENT_SCOPES: &[&str] = &[
    "user.read",
    "user.readbasic.all",
    "mail.send",
    "calendars.readwrite",
    "calendars.readwrite.shared",
    "user.read.all",
];

/// An access token acting on behalf of the signed-in user
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

impl AccessToken {
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// The signed-in user's own directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_principal_name: String,
    pub display_name: String,
}

/// An account listed in the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    pub id: String,
    pub user_principal_name: String,
}

/// The user's cached grant doesn't cover the requested scopes, so they have to go through an
/// interactive consent flow before the operation can succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("user interaction is required ({error_code}): {message}")]
pub struct AuthorizationRequired {
    pub error_code: String,
    pub message: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Error)]
pub enum TokenAcquisitionError {
    #[error(transparent)]
    InteractionRequired(#[from] AuthorizationRequired),
    #[error(transparent)]
    PortError(#[from] anyhow::Error),
}

pub mod driven_ports {
    use super::*;
    use crate::external_connections::ExternalConnectivity;

    /// Exchanges the caller's own token for one usable against downstream APIs
    pub trait DelegatedTokenSource {
        async fn acquire_delegated_token(
            &self,
            user_assertion: &str,
            scopes: &[&str],
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<AccessToken, TokenAcquisitionError>;
    }

    /// The directory and calendar provider
    pub trait DirectoryApi {
        async fn get_my_profile(
            &self,
            token: &AccessToken,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<UserProfile, anyhow::Error>;

        async fn list_enabled_users(
            &self,
            token: &AccessToken,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<DirectoryUser>, anyhow::Error>;

        /// Returns [None] when the provider accepted the request but acknowledged nothing
        async fn create_event(
            &self,
            token: &AccessToken,
            event: &CalendarEvent,
            time_zone_preference: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<CalendarEvent>, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use crate::external_connections::ExternalConnectivity;

    #[derive(Debug, Error)]
    pub enum DirectoryError {
        #[error(transparent)]
        AuthorizationRequired(#[from] AuthorizationRequired),
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    impl From<TokenAcquisitionError> for DirectoryError {
        fn from(value: TokenAcquisitionError) -> Self {
            match value {
                TokenAcquisitionError::InteractionRequired(auth_err) => {
                    Self::AuthorizationRequired(auth_err)
                }
                TokenAcquisitionError::PortError(err) => {
                    Self::PortError(err.context("acquiring a token to read the directory"))
                }
            }
        }
    }


    pub trait DirectoryPort {
        /// Lists the principal names of every enabled account in the directory
        async fn list_user_names(
            &self,
            user_assertion: &str,
            ext_cxn: &mut impl ExternalConnectivity,
            token_source: &impl driven_ports::DelegatedTokenSource,
            directory: &impl driven_ports::DirectoryApi,
        ) -> Result<Vec<String>, DirectoryError>;
    }
}

pub struct DirectoryService;

impl driving_ports::DirectoryPort for DirectoryService {
    async fn list_user_names(
        &self,
        user_assertion: &str,
        ext_cxn: &mut impl ExternalConnectivity,
        token_source: &impl DelegatedTokenSource,
        directory: &impl DirectoryApi,
    ) -> Result<Vec<String>, DirectoryError> {
        let token = token_source
            .acquire_delegated_token(user_assertion, USER_LISTING_SCOPES, &mut *ext_cxn)
            .await?;

        let users = directory
            .list_enabled_users(&token, &mut *ext_cxn)
            .await
            .context("listing enabled directory users")?;
        info!("Found {} enabled users in the directory", users.len());

        Ok(users
            .into_iter()
            .map(|user| user.user_principal_name)
            .collect())
    }
}
