//! Logging in, logging out and registering users.
//!
//! The server issues a pair of tokens at log in. Only the access token is
//! attached to requests, the refresh token is stored alongside it so that a
//! later log in can replace both together.

use serde::{Deserialize, Serialize};

use crate::{Error, client::HttpLedgerClient, session::SessionStore};

const LOG_IN_PATH: &str = "token";
const REGISTER_PATH: &str = "user/register";

/// The credentials a user logs in with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginCredentials {
    /// The user's email address.
    pub email: String,
    /// The user's password.
    pub password: String,
}

/// The tokens issued by the server on a successful log in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    /// The bearer token attached to every request.
    pub access: String,
    /// The token used to obtain a new access token.
    pub refresh: String,
}

/// The details for registering a new user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    /// The user's display name.
    pub name: String,
    /// A unique username.
    pub username: String,
    /// The email address used to log in.
    pub email: String,
    /// The password used to log in.
    pub password: String,
    /// The password typed a second time.
    pub confirm_password: String,
}

/// Exchange `credentials` for a token pair and store it in the client's session.
///
/// # Errors
///
/// Returns [Error::Client] if the server rejects the credentials, in which
/// case the stored session is left unchanged.
pub async fn login<S: SessionStore>(
    client: &HttpLedgerClient<S>,
    credentials: &LoginCredentials,
) -> Result<TokenPair, Error> {
    let tokens: TokenPair = client.post_json(LOG_IN_PATH, credentials).await?;

    client
        .session()
        .set_session(&tokens.access, &tokens.refresh)
        .await?;
    tracing::info!("logged in as {}", credentials.email);

    Ok(tokens)
}

/// Forget the stored tokens.
pub async fn logout<S: SessionStore>(client: &HttpLedgerClient<S>) -> Result<(), Error> {
    client.session().clear_token().await?;
    tracing::info!("logged out");

    Ok(())
}

/// Register a new user. This does not log the user in.
///
/// # Errors
///
/// Returns [Error::PasswordMismatch] without contacting the server if the
/// passwords differ, or [Error::Client] with the server's validation messages.
pub async fn register<S: SessionStore>(
    client: &HttpLedgerClient<S>,
    user: &NewUser,
) -> Result<(), Error> {
    if user.password != user.confirm_password {
        return Err(Error::PasswordMismatch);
    }

    let _: serde_json::Value = client.post_json(REGISTER_PATH, user).await?;
    tracing::info!("registered user {}", user.username);

    Ok(())
}
