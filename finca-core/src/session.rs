//! Login against the remote API and the locally remembered session
//!
//! [`SessionClient`] is the HTTP side. It never reads ambient state: the bearer
//! token is handed to it explicitly with [`SessionClient::with_token`].
//! [`Session`] ties a client to the key-value store, where the auth token and
//! the "remember me" email are kept as plain strings.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::AppConfig;
use crate::error::{AuthError, FincaError};
use crate::kv::KeyValueStore;

/// Key holding the auth token after a successful login
pub const TOKEN_KEY: &str = "token";

/// Key holding the email to pre-fill on the login form
pub const REMEMBERED_EMAIL_KEY: &str = "rememberedEmail";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Successful login response
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// HTTP client for the login API
#[derive(Debug, Clone)]
pub struct SessionClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl SessionClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a client for `base_url` with the given request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("finca/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Create a client from the configured base URL and timeout
    pub fn from_config(config: &AppConfig) -> Result<Self, AuthError> {
        Self::new(config.api_base_url.clone(), config.request_timeout())
    }

    /// Attach a bearer token to every request this client sends
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.http.post(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    /// POST `/login` with the given credentials.
    ///
    /// A 401 is reported as [`AuthError::Unauthorized`]; callers use it to send
    /// the user back to the login form.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let res = self
            .post("/login")
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => res
                .json::<LoginResponse>()
                .await
                .map_err(|e| AuthError::Serde(e.to_string())),
            StatusCode::UNAUTHORIZED => {
                tracing::warn!("login rejected, credentials not accepted");
                Err(AuthError::Unauthorized)
            }
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(AuthError::Http { status, body })
            }
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> AuthError {
    if e.is_timeout() {
        AuthError::Timeout
    } else {
        AuthError::Transport(e.to_string())
    }
}

/// Login state persisted in the key-value store
pub struct Session {
    backend: Arc<dyn KeyValueStore>,
    client: SessionClient,
}

impl Session {
    pub fn new(backend: Arc<dyn KeyValueStore>, client: SessionClient) -> Self {
        Self { backend, client }
    }

    async fn read(&self, key: &str) -> Result<Option<String>, FincaError> {
        self.backend
            .get(key)
            .await
            .map_err(|e| FincaError::storage(key, e))
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), FincaError> {
        self.backend
            .set(key, value)
            .await
            .map_err(|e| FincaError::storage(key, e))
    }

    async fn clear(&self, key: &str) -> Result<(), FincaError> {
        self.backend
            .remove(key)
            .await
            .map_err(|e| FincaError::storage(key, e))
    }

    /// Email saved by a previous "remember me" login
    pub async fn remembered_email(&self) -> Result<Option<String>, FincaError> {
        self.read(REMEMBERED_EMAIL_KEY).await
    }

    /// Whether a login should remember its email.
    ///
    /// An explicit choice wins. Otherwise the box starts checked when an email
    /// is already remembered, so a plain login keeps it.
    pub async fn should_remember(&self, choice: Option<bool>) -> Result<bool, FincaError> {
        match choice {
            Some(remember) => Ok(remember),
            None => Ok(self.remembered_email().await?.is_some()),
        }
    }

    /// Token from the last successful login
    pub async fn token(&self) -> Result<Option<String>, FincaError> {
        self.read(TOKEN_KEY).await
    }

    /// Logs in, stores the token, and stores or forgets the email depending
    /// on `remember`. Nothing is written when the login fails.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<String, FincaError> {
        let response = self.client.login(email, password).await?;

        self.write(TOKEN_KEY, &response.access_token).await?;
        if remember {
            self.write(REMEMBERED_EMAIL_KEY, email).await?;
        } else {
            self.clear(REMEMBERED_EMAIL_KEY).await?;
        }

        info!(email, remember, "logged in");
        Ok(response.access_token)
    }

    /// Forgets the token; the remembered email stays
    pub async fn logout(&self) -> Result<(), FincaError> {
        self.clear(TOKEN_KEY).await?;
        info!("logged out");
        Ok(())
    }

    /// A client carrying the stored token, if there is one
    pub async fn client(&self) -> Result<SessionClient, FincaError> {
        let client = self.client.clone();
        Ok(match self.token().await? {
            Some(token) => client.with_token(token),
            None => client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryBackend;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    const EMAIL: &str = "ana@finca.co";
    const PASSWORD: &str = "secreto";

    async fn login_handler(
        headers: AxumHeaders,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, (AxumStatus, String)> {
        if body["email"] == "boom@finca.co" {
            return Err((AxumStatus::INTERNAL_SERVER_ERROR, "db down".to_string()));
        }
        if body["email"] != EMAIL || body["password"] != PASSWORD {
            return Err((AxumStatus::UNAUTHORIZED, String::new()));
        }
        // Echo the bearer header back so tests can see what was sent
        let token = match headers.get("authorization") {
            Some(value) => format!("echo:{}", value.to_str().unwrap()),
            None => "tok-123".to_string(),
        };
        Ok(Json(json!({ "access_token": token })))
    }

    async fn spawn_api() -> String {
        let app = Router::new().route("/login", post(login_handler));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn api_client(base_url: impl Into<String>) -> SessionClient {
        SessionClient::new(base_url, SessionClient::DEFAULT_TIMEOUT).unwrap()
    }

    async fn session() -> (Session, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let client = api_client(spawn_api().await);
        (Session::new(backend.clone(), client), backend)
    }

    #[tokio::test]
    async fn test_login_returns_token() {
        let client = api_client(spawn_api().await);
        let response = client.login(EMAIL, PASSWORD).await.unwrap();
        assert_eq!(response.access_token, "tok-123");
    }

    #[test]
    fn test_base_url_drops_trailing_slash() {
        let client = api_client("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[tokio::test]
    async fn test_slow_server_is_a_timeout() {
        async fn slow_login() -> Json<Value> {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "access_token": "late" }))
        }

        let app = Router::new().route("/login", post(slow_login));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let timeout = Duration::from_millis(200);
        let client = SessionClient::new(format!("http://{}", addr), timeout).unwrap();
        let err = client.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::Timeout));
    }

    #[tokio::test]
    async fn test_login_401_is_unauthorized() {
        let client = api_client(spawn_api().await);
        let err = client.login(EMAIL, "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn test_login_server_error_surfaces_status() {
        let client = api_client(spawn_api().await);
        let err = client.login("boom@finca.co", PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::Http { status: 500, ref body } if body == "db down"));
    }

    #[tokio::test]
    async fn test_login_unreachable_is_transport_error() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = api_client(format!("http://{}", addr));
        let err = client.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::Transport(_)));
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent_when_given() {
        let client = api_client(spawn_api().await).with_token("abc");
        let response = client.login(EMAIL, PASSWORD).await.unwrap();
        assert_eq!(response.access_token, "echo:Bearer abc");
    }

    #[tokio::test]
    async fn test_session_login_remembers_email() {
        let (session, backend) = session().await;

        let token = session.login(EMAIL, PASSWORD, true).await.unwrap();

        assert_eq!(token, "tok-123");
        assert_eq!(
            backend.get(TOKEN_KEY).await.unwrap().as_deref(),
            Some("tok-123")
        );
        assert_eq!(
            session.remembered_email().await.unwrap().as_deref(),
            Some(EMAIL)
        );
    }

    #[tokio::test]
    async fn test_session_login_without_remember_forgets_email() {
        let (session, backend) = session().await;
        backend.set(REMEMBERED_EMAIL_KEY, "old@finca.co").await.unwrap();

        session.login(EMAIL, PASSWORD, false).await.unwrap();
        assert_eq!(session.remembered_email().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_login_writes_nothing() {
        let (session, backend) = session().await;

        let err = session.login(EMAIL, "wrong", true).await.unwrap_err();

        assert!(matches!(err, FincaError::Auth(AuthError::Unauthorized)));
        assert!(backend.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_plain_login_keeps_remembered_email() {
        let (session, _) = session().await;
        assert!(!session.should_remember(None).await.unwrap());

        session.login(EMAIL, PASSWORD, true).await.unwrap();

        // A later login with no explicit choice starts with the box checked
        let remember = session.should_remember(None).await.unwrap();
        assert!(remember);
        session.login(EMAIL, PASSWORD, remember).await.unwrap();
        assert_eq!(
            session.remembered_email().await.unwrap().as_deref(),
            Some(EMAIL)
        );

        // Unchecking it forgets the email
        let remember = session.should_remember(Some(false)).await.unwrap();
        session.login(EMAIL, PASSWORD, remember).await.unwrap();
        assert_eq!(session.remembered_email().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_keeps_remembered_email() {
        let (session, _) = session().await;
        session.login(EMAIL, PASSWORD, true).await.unwrap();

        session.logout().await.unwrap();

        assert_eq!(session.token().await.unwrap(), None);
        assert_eq!(
            session.remembered_email().await.unwrap().as_deref(),
            Some(EMAIL)
        );
    }

    #[tokio::test]
    async fn test_client_carries_stored_token() {
        let (session, _) = session().await;
        assert_eq!(session.client().await.unwrap().token(), None);

        session.login(EMAIL, PASSWORD, false).await.unwrap();
        assert_eq!(session.client().await.unwrap().token(), Some("tok-123"));
    }
}
