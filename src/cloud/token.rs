//! Ambient access tokens for the compute API.

use tokio::process::Command;
use tracing::debug;

use crate::error::CloudError;

/// Environment variable holding a ready-made OAuth access token.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Where API credentials come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessTokenSource {
    /// A fixed token.
    Static(String),
    /// `gcloud auth print-access-token`, run on every request.
    Gcloud,
}

impl AccessTokenSource {
    /// Uses the token from the environment if set, else `gcloud`.
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var(ACCESS_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Self::Static(token.trim().to_string()),
            _ => Self::Gcloud,
        }
    }

    /// Returns a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` if no token can be obtained.
    pub async fn token(&self) -> Result<String, CloudError> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::Gcloud => {
                debug!("Requesting access token from gcloud");
                let output = Command::new("gcloud")
                    .args(["auth", "print-access-token"])
                    .output()
                    .await
                    .map_err(|e| CloudError::AuthenticationFailed {
                        message: format!("failed to run gcloud: {e}"),
                    })?;
                if !output.status.success() {
                    return Err(CloudError::AuthenticationFailed {
                        message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    });
                }
                let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if token.is_empty() {
                    return Err(CloudError::AuthenticationFailed {
                        message: String::from("gcloud returned an empty access token"),
                    });
                }
                Ok(token)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_static_token() {
        let source = AccessTokenSource::Static(String::from("ya29.token"));
        assert_eq!(assert_ok!(source.token().await), "ya29.token");
    }

    #[test]
    fn test_static_token_blocking() {
        let source = AccessTokenSource::Static(String::from("ya29.other"));
        let token = tokio_test::block_on(source.token());
        assert_eq!(assert_ok!(token), "ya29.other");
    }
}
