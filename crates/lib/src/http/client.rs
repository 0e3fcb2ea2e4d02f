//! Authorized fetch.
//!
//! [`HttpClient`] turns a path and a body into a request against the
//! configured base URL, attaches the stored bearer token, and classifies the
//! response. A 401 triggers one shared refresh followed by exactly one retry;
//! a failed refresh or a second 401 ends the session.

use std::{fmt, sync::Arc, time::Duration};

use reqwest::{
    Method,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{Instrument, debug, debug_span, error, info, warn};
use url::Url;
use uuid::Uuid;

use super::{
    body::{ProgressFn, RequestBody, UploadPayload},
    errors::HttpError,
    refresh::{RefreshGate, RefreshOutcome},
    response::{Payload, error_message},
};
use crate::{
    Result,
    auth::expiry_or_unknown,
    config::{ClientConfig, ConfigError},
    constants::endpoints,
    models::TokenPair,
    session::SharedSession,
    store::TokenStore,
};

/// A request description that can be sent more than once.
#[derive(Clone)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) body: RequestBody,
    pub(crate) authorized: bool,
    pub(crate) timeout: Option<Duration>,
    pub(crate) expect_blob: bool,
    pub(crate) progress: Option<ProgressFn>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::None,
            authorized: true,
            timeout: None,
            expect_blob: false,
            progress: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    fn is_upload(&self) -> bool {
        matches!(self.body, RequestBody::Upload(_))
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body", &self.body)
            .field("authorized", &self.authorized)
            .field("timeout", &self.timeout)
            .field("expect_blob", &self.expect_blob)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// HTTP client bound to one API and one token store.
pub struct HttpClient {
    config: ClientConfig,
    inner: reqwest::Client,
    store: Arc<dyn TokenStore>,
    session: SharedSession,
    gate: RefreshGate,
    refresh_url: Url,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.config.base_url())
            .field("store", &self.store)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        session: SharedSession,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let inner = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::InvalidSetting {
                setting: "http_client",
                reason: e.to_string(),
            })?;
        let refresh_url = config.endpoint(endpoints::TOKEN_REFRESH)?;

        Ok(Self {
            config,
            inner,
            store,
            session,
            gate: RefreshGate::default(),
            refresh_url,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn request(&self, method: Method, path: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder {
            client: self,
            request: Request::new(method, path),
        }
    }

    pub fn get(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::POST, path)
    }

    pub fn patch(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::PATCH, path)
    }

    pub fn delete(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::DELETE, path)
    }

    /// Send `request`, refreshing and retrying once on a 401.
    pub async fn execute(&self, request: Request) -> Result<Payload> {
        let url = self.config.endpoint(&request.path)?;
        let span = debug_span!(
            "request",
            id = %Uuid::new_v4(),
            method = %request.method,
            path = %request.path,
        );
        self.execute_at(&request, &url).instrument(span).await
    }

    async fn execute_at(&self, request: &Request, url: &Url) -> Result<Payload> {
        if !request.authorized {
            return Ok(self.send_once(request, url, None).await?);
        }

        let Some(tokens) = self.store.load()? else {
            debug!("no stored credentials");
            return Err(HttpError::NotAuthenticated.into());
        };

        match self.send_once(request, url, Some(&tokens.access)).await {
            Err(err) if err.is_unauthorized() => {
                debug!("access token rejected, refreshing");
            }
            other => return Ok(other?),
        }

        let renewed = self.refresh_once(Some(&tokens.access)).await?;
        match self.send_once(request, url, Some(&renewed.access)).await {
            Err(err) if err.is_unauthorized() => {
                let reason = "request rejected after token refresh".to_string();
                self.expire_session(&reason);
                Err(HttpError::SessionExpired { reason }.into())
            }
            other => Ok(other?),
        }
    }

    async fn send_once(
        &self,
        request: &Request,
        url: &Url,
        access: Option<&str>,
    ) -> std::result::Result<Payload, HttpError> {
        let timeout = request.timeout.unwrap_or_else(|| {
            if request.is_upload() {
                self.config.upload_timeout()
            } else {
                self.config.request_timeout()
            }
        });

        let mut builder = self
            .inner
            .request(request.method.clone(), url.clone())
            .timeout(timeout);
        if let Some(token) = access {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            RequestBody::None => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Upload(upload) => builder.multipart(
                upload.to_form(self.config.upload_chunk_size(), request.progress.clone())?,
            ),
        };

        let response = builder.send().await.map_err(|e| {
            let err = HttpError::from_reqwest(e);
            warn!(error = %err, "request failed");
            err
        })?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("json"));
        let bytes = response.bytes().await.map_err(HttpError::from_reqwest)?;
        debug!(status = status.as_u16(), len = bytes.len(), "response");

        if !status.is_success() {
            return Err(HttpError::Api {
                status: status.as_u16(),
                message: error_message(status.as_u16(), &bytes),
            });
        }
        if bytes.is_empty() {
            return Ok(Payload::Empty);
        }
        if is_json && !request.expect_blob {
            let value = serde_json::from_slice(&bytes).map_err(|e| HttpError::Decode {
                path: request.path.clone(),
                reason: e.to_string(),
            })?;
            return Ok(Payload::Json(value));
        }
        Ok(Payload::Blob(bytes.to_vec()))
    }

    /// Renew the access token, sharing the work with concurrent callers.
    ///
    /// `stale_access` is the token the caller saw rejected. If the stored
    /// token already differs from it, another caller renewed it in the
    /// meantime and the stored pair is returned without a network call.
    /// Pass `None` to force a refresh.
    pub async fn refresh_once(&self, stale_access: Option<&str>) -> Result<TokenPair> {
        let outcome = self
            .gate
            .run(
                || self.renewed_since(stale_access),
                || self.perform_refresh(),
            )
            .await;
        Ok(outcome?)
    }

    fn renewed_since(&self, stale_access: Option<&str>) -> Option<RefreshOutcome> {
        match self.store.load() {
            Err(err) => Some(Err(HttpError::Storage {
                reason: err.to_string(),
            })),
            Ok(None) => Some(Err(HttpError::SessionExpired {
                reason: "no refresh token stored".to_string(),
            })),
            Ok(Some(pair)) => match stale_access {
                Some(stale) if pair.access != stale => Some(Ok(pair)),
                _ => None,
            },
        }
    }

    async fn perform_refresh(&self) -> RefreshOutcome {
        let current = match self.store.load() {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                return Err(HttpError::SessionExpired {
                    reason: "no refresh token stored".to_string(),
                });
            }
            Err(err) => {
                return Err(HttpError::Storage {
                    reason: err.to_string(),
                });
            }
        };

        let generation = self.session.begin_refresh();
        let mut request = Request::new(Method::POST, endpoints::TOKEN_REFRESH);
        request.body = RequestBody::Json(json!({ "refresh": current.refresh }));
        request.authorized = false;

        let response = self
            .send_once(&request, &self.refresh_url, None)
            .await
            .and_then(|payload| payload.into_json::<RefreshResponse>(endpoints::TOKEN_REFRESH));

        let renewed = match response {
            Ok(body) if !body.access.is_empty() => body,
            Ok(_) => {
                let reason = "refresh response carried no access token".to_string();
                self.expire_session(&reason);
                return Err(HttpError::SessionExpired { reason });
            }
            Err(err) => {
                let reason = format!("token refresh failed: {err}");
                self.expire_session(&reason);
                return Err(HttpError::SessionExpired { reason });
            }
        };

        let refresh = renewed
            .refresh
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| current.refresh.clone());
        let pair = TokenPair::new(renewed.access, refresh);
        let expiry = expiry_or_unknown(&pair.access);

        match self
            .session
            .refreshed(generation, &pair, expiry, |pair| self.store.save(pair))
        {
            Ok(true) => {
                info!(expiry = ?expiry, "access token refreshed");
                Ok(pair)
            }
            Ok(false) => {
                info!("session ended while refreshing, renewed tokens dropped");
                Err(HttpError::NotAuthenticated)
            }
            Err(err) => {
                error!(error = %err, "could not persist refreshed tokens");
                Err(HttpError::Storage {
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Purge stored credentials and move the session to anonymous.
    pub(crate) fn expire_session(&self, reason: &str) {
        self.session.expire(reason);
        if let Err(err) = self.store.clear() {
            error!(error = %err, "could not clear token store");
        }
    }
}

/// Builder for a single request. Created by [`HttpClient::get`] and friends.
#[must_use = "a request does nothing until it is sent"]
pub struct RequestBuilder<'a> {
    client: &'a HttpClient,
    request: Request,
}

impl RequestBuilder<'_> {
    /// Send `value` as a JSON body.
    pub fn json(mut self, value: Value) -> Self {
        self.request.body = RequestBody::Json(value);
        self
    }

    /// Send a file as `multipart/form-data`.
    pub fn upload(mut self, payload: UploadPayload) -> Self {
        self.request.body = RequestBody::Upload(payload);
        self
    }

    /// Called with upload progress percentages.
    pub fn on_progress(mut self, progress: ProgressFn) -> Self {
        self.request.progress = Some(progress);
        self
    }

    /// Send without credentials.
    pub fn anonymous(mut self) -> Self {
        self.request.authorized = false;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = Some(timeout);
        self
    }

    /// Return the body as raw bytes whatever its content type.
    pub fn blob(mut self) -> Self {
        self.request.expect_blob = true;
        self
    }

    pub fn build(self) -> Request {
        self.request
    }

    pub async fn send(self) -> Result<Payload> {
        self.client.execute(self.request).await
    }

    /// Send and deserialize the JSON response.
    pub async fn json_response<T: DeserializeOwned>(self) -> Result<T> {
        let path = self.request.path.clone();
        let payload = self.send().await?;
        Ok(payload.into_json(&path)?)
    }
}
