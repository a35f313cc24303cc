//! Bearer credentials for the management endpoint.
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("access token is empty")]
    Empty,

    #[error("failed to read token file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("token file {0:?} is empty")]
    EmptyFile(PathBuf),
}

/// Where the token comes from.
#[derive(Debug, Clone)]
enum TokenSource {
    Literal(SecretString),
    /// Re-read on every request so a rotated token is picked up.
    File(PathBuf),
}

/// An access token given either literally or as `file:/path/to/token`.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct AuthToken(TokenSource);

impl AuthToken {
    pub fn new(token: SecretString) -> Self {
        Self(TokenSource::Literal(token))
    }

    /// Resolves the current token value.
    pub async fn resolve(&self) -> Result<SecretString, AuthError> {
        match &self.0 {
            TokenSource::Literal(s) => Ok(s.clone()),
            TokenSource::File(path) => {
                let content =
                    tokio::fs::read_to_string(path)
                        .await
                        .map_err(|source| AuthError::Read {
                            path: path.clone(),
                            source,
                        })?;
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    return Err(AuthError::EmptyFile(path.clone()));
                }
                Ok(SecretString::new(trimmed.to_owned().into()))
            }
        }
    }
}

impl Serialize for AuthToken {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

impl TryFrom<String> for AuthToken {
    type Error = AuthError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl FromStr for AuthToken {
    type Err = AuthError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AuthError::Empty);
        }
        if let Some(path) = s.strip_prefix("file:") {
            let cleaned = path.strip_prefix("//").unwrap_or(path);
            return Ok(Self(TokenSource::File(PathBuf::from(cleaned))));
        }
        Ok(Self(TokenSource::Literal(SecretString::new(
            s.to_owned().into(),
        ))))
    }
}

impl std::fmt::Display for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            TokenSource::Literal(_) => write!(f, "[REDACTED]"),
            TokenSource::File(p) => write!(f, "file:{}", p.display()),
        }
    }
}

impl PartialEq for AuthToken {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (TokenSource::Literal(l), TokenSource::Literal(r)) => {
                l.expose_secret() == r.expose_secret()
            }
            (TokenSource::File(l), TokenSource::File(r)) => l == r,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_literal_token() {
        let token: AuthToken = "  abc  ".parse().unwrap();
        assert_eq!(token.resolve().await.unwrap().expose_secret(), "abc");
        assert_eq!(token.to_string(), "[REDACTED]");
    }

    #[tokio::test]
    async fn test_file_token_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "from-file").unwrap();
        let token: AuthToken = format!("file:{}", file.path().display()).parse().unwrap();
        assert_eq!(token.resolve().await.unwrap().expose_secret(), "from-file");
    }

    #[tokio::test]
    async fn test_empty_file_token() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let token: AuthToken = format!("file:{}", file.path().display()).parse().unwrap();
        assert!(matches!(
            token.resolve().await,
            Err(AuthError::EmptyFile(_))
        ));
    }

    #[test]
    fn test_empty_literal_rejected() {
        assert!(matches!("   ".parse::<AuthToken>(), Err(AuthError::Empty)));
    }

    #[test]
    fn test_serialize_redacts() {
        let token: AuthToken = "secret".parse().unwrap();
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"[REDACTED]\"");
    }
}
