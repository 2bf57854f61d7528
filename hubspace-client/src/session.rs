//! Connection management.
//!
//! A [`Session`] holds one application credential and a token cache keyed by
//! identity. [`Session::authorize`] scopes the session to one identity; every
//! call made through the resulting [`UserSession`] presents that identity's
//! token and nobody else's.
//!
//! When the hub rejects a cached token the entry is dropped, a new token is
//! issued once and the call is retried once. A second rejection is returned
//! to the caller.

use crate::config::HubConfig;
use crate::error::{HubError, HubResult};
use crate::transport::{HttpTransport, HubTransport, RequestContext, Token};
use chrono::Utc;
use hubspace_crypto::{Credential, Identity, PublicKey};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

struct SessionInner {
    transport: Arc<dyn HubTransport>,
    credential: Credential,
    tokens: RwLock<HashMap<PublicKey, Token>>,
    closed: AtomicBool,
}

/// An authenticated connection to a hub.
///
/// Cloning is cheap; clones share the token cache.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.inner.credential.key())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Session {
    /// Connects through `transport`, checking the credential with the hub.
    ///
    /// An expired signed credential is rejected before anything is sent.
    pub async fn connect(
        transport: Arc<dyn HubTransport>,
        credential: Credential,
    ) -> HubResult<Self> {
        if credential.key().trim().is_empty() {
            return Err(HubError::Configuration("application key is required".to_string()));
        }
        credential.check_fresh(Utc::now())?;
        transport.verify_credential(&credential).await?;

        info!(key = credential.key(), "Connected to hub");
        Ok(Self {
            inner: Arc::new(SessionInner {
                transport,
                credential,
                tokens: RwLock::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Connects over HTTP using `config`.
    pub async fn connect_with_config(config: HubConfig, credential: Credential) -> HubResult<Self> {
        let transport = HttpTransport::new(config)?;
        Self::connect(Arc::new(transport), credential).await
    }

    pub fn credential(&self) -> &Credential {
        &self.inner.credential
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Drops every cached token. Later calls fail with `Configuration`.
    pub async fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.tokens.write().await.clear();
        info!("Session closed");
    }

    /// Obtains a fresh token for `identity` and caches it.
    ///
    /// Fails with `Authentication` if the credential is expired or does not
    /// cover `identity`.
    pub async fn issue_token(&self, identity: &Identity) -> HubResult<Token> {
        self.ensure_open()?;
        let credential = &self.inner.credential;
        credential.check_fresh(Utc::now())?;

        let public = identity.public();
        if !credential.authorizes(&public) {
            return Err(HubError::Authentication(format!(
                "credential is not valid for identity {public}"
            )));
        }

        let transport = &self.inner.transport;
        let challenge = transport.token_challenge(credential, &public).await?;
        let signature = identity.sign(challenge.nonce.as_bytes());
        let token = transport
            .issue_token(credential, &public, &challenge, &signature)
            .await?;
        if token.identity() != public {
            return Err(HubError::Protocol(format!(
                "hub issued a token for {} instead of {public}",
                token.identity()
            )));
        }

        self.inner.tokens.write().await.insert(public, token.clone());
        debug!(identity = %public, "Token issued");
        Ok(token)
    }

    /// Returns the cached token for `identity`, if any.
    pub async fn cached_token(&self, identity: &PublicKey) -> Option<Token> {
        self.inner.tokens.read().await.get(identity).cloned()
    }

    /// Scopes the session to `identity`, issuing a token if none is cached.
    pub async fn authorize(&self, identity: &Identity) -> HubResult<UserSession> {
        self.token_for(identity).await?;
        Ok(UserSession {
            session: self.clone(),
            identity: identity.clone(),
        })
    }

    async fn token_for(&self, identity: &Identity) -> HubResult<Token> {
        self.ensure_open()?;
        if let Some(token) = self.cached_token(&identity.public()).await {
            return Ok(token);
        }
        self.issue_token(identity).await
    }

    async fn invalidate(&self, identity: &PublicKey) {
        self.inner.tokens.write().await.remove(identity);
    }

    fn ensure_open(&self) -> HubResult<()> {
        if self.is_closed() {
            return Err(HubError::Configuration("session closed".to_string()));
        }
        Ok(())
    }
}

/// A session acting for one identity.
#[derive(Debug, Clone)]
pub struct UserSession {
    session: Session,
    identity: Identity,
}

impl UserSession {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    async fn context(&self) -> HubResult<RequestContext> {
        let credential = self.session.credential();
        credential.check_fresh(Utc::now())?;
        let token = self.session.token_for(&self.identity).await?;
        Ok(RequestContext {
            credential: credential.clone(),
            token,
        })
    }

    /// Runs `op` with this identity's token, re-issuing it once on rejection.
    pub(crate) async fn call<T, F, Fut>(&self, op: F) -> HubResult<T>
    where
        F: Fn(Arc<dyn HubTransport>, RequestContext) -> Fut,
        Fut: Future<Output = HubResult<T>>,
    {
        let transport = Arc::clone(&self.session.inner.transport);
        let ctx = self.context().await?;
        match op(Arc::clone(&transport), ctx).await {
            Err(e) if e.is_auth() => {
                let public = self.identity.public();
                warn!(identity = %public, error = %e, "Token rejected, re-issuing");
                self.session.invalidate(&public).await;
                let ctx = self.context().await?;
                op(transport, ctx).await
            }
            other => other,
        }
    }
}
