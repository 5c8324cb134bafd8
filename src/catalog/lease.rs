//! Process-wide credential lease for the catalog service.
//!
//! The catalog API uses short-lived client-credentials tokens. The lease
//! owns the token lifecycle: `acquire` performs the grant, `renew`
//! re-acquires, and a scheduled task keeps the lease fresh ahead of
//! expiry. Callers never see the raw token outside of [`CredentialLease::bearer`],
//! which refuses to hand out anything expired.

use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::CatalogConfig;
use crate::error::{Error, Result};

/// Renew this long before the token expires.
const RENEWAL_LEAD: Duration = Duration::from_secs(300);

/// Delay before retrying a failed grant.
const RETRY_DELAY: Duration = Duration::from_secs(10);

/// Connection timeout for token requests.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

pub struct CredentialLease {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    state: RwLock<Option<LeaseState>>,
}

struct LeaseState {
    token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

impl CredentialLease {
    pub fn new(config: &CatalogConfig) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECTION_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("failed to build HTTP client with timeout: {e}");
                reqwest::Client::new()
            });

        Self {
            http,
            token_url: config.token_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            state: RwLock::new(None),
        }
    }

    /// Perform the client-credentials grant and store the fresh token.
    /// Returns the token's lifetime so the renewal task can schedule itself.
    pub async fn acquire(&self) -> Result<Duration> {
        let resp = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| Error::upstream(format!("token request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::upstream(format!(
                "token endpoint answered {}",
                resp.status()
            )));
        }

        let grant: TokenResponse = resp
            .json()
            .await
            .map_err(|e| Error::upstream(format!("token response parse error: {e}")))?;

        let ttl = Duration::from_secs(grant.expires_in);
        *self.state.write() = Some(LeaseState {
            token: grant.access_token,
            expires_at: Instant::now() + ttl,
        });

        tracing::info!("catalog token refreshed, valid for {}s", grant.expires_in);
        Ok(ttl)
    }

    /// Re-acquire unconditionally, replacing whatever is held.
    pub async fn renew(&self) -> Result<Duration> {
        self.acquire().await
    }

    /// Whether a token is held and not yet expired.
    pub fn is_valid(&self) -> bool {
        self.state
            .read()
            .as_ref()
            .is_some_and(|s| Instant::now() < s.expires_at)
    }

    /// The current bearer token, only while valid.
    pub fn bearer(&self) -> Result<String> {
        let state = self.state.read();
        match state.as_ref() {
            Some(s) if Instant::now() < s.expires_at => Ok(s.token.clone()),
            _ => Err(Error::AuthNotReady(
                "catalog auth not ready, try again in a few seconds".into(),
            )),
        }
    }

    /// Keep the lease fresh: renew, sleep until shortly before expiry,
    /// repeat. Failed grants retry on a short delay.
    pub fn spawn_renewal(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let lease = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match lease.renew().await {
                    Ok(ttl) => {
                        let pause = ttl.saturating_sub(RENEWAL_LEAD).max(RETRY_DELAY);
                        tokio::time::sleep(pause).await;
                    }
                    Err(e) => {
                        tracing::warn!("catalog token renewal failed: {e}");
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn lease_for(server: &MockServer) -> CredentialLease {
        CredentialLease::new(&CatalogConfig {
            token_url: format!("{}/token", server.uri()),
            client_id: "id".into(),
            client_secret: "secret".into(),
            ..CatalogConfig::default()
        })
    }

    fn token_body(token: &str, expires_in: u64) -> serde_json::Value {
        serde_json::json!({ "access_token": token, "expires_in": expires_in })
    }

    #[tokio::test]
    async fn acquire_makes_the_lease_valid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1", 3600)))
            .mount(&server)
            .await;

        let lease = lease_for(&server);
        assert!(!lease.is_valid());
        assert_matches!(lease.bearer(), Err(Error::AuthNotReady(_)));

        let ttl = lease.acquire().await.unwrap();
        assert_eq!(ttl, Duration::from_secs(3600));
        assert!(lease.is_valid());
        assert_eq!(lease.bearer().unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn renew_replaces_the_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1", 3600)))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-2", 3600)))
            .mount(&server)
            .await;

        let lease = lease_for(&server);
        lease.acquire().await.unwrap();
        assert_eq!(lease.bearer().unwrap(), "tok-1");

        lease.renew().await.unwrap();
        assert_eq!(lease.bearer().unwrap(), "tok-2");
    }

    #[tokio::test]
    async fn expired_token_is_not_handed_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1", 0)))
            .mount(&server)
            .await;

        let lease = lease_for(&server);
        lease.acquire().await.unwrap();
        assert!(!lease.is_valid());
        assert_matches!(lease.bearer(), Err(Error::AuthNotReady(_)));
    }

    #[tokio::test]
    async fn failed_grant_surfaces_as_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let lease = lease_for(&server);
        assert_matches!(lease.acquire().await, Err(Error::UpstreamUnavailable(_)));
        assert!(!lease.is_valid());
    }
}
