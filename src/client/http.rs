//! Request Executor: turns (method, path, query, body, authorised) into an HTTP call.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use url::Url;

use super::session::SessionManager;
use super::{BoxFuture, SilCommsError};

const APPLICATION_JSON: &str = "application/json";

#[derive(Debug, Clone)]
pub(crate) struct HttpRequest {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Raw response handed back to endpoint-specific interpretation.
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

pub(crate) trait HttpTransport: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>>;
}

#[derive(Debug, Clone)]
pub(crate) struct ReqwestTransport {
    pub(crate) client: reqwest::Client,
}

impl HttpTransport for ReqwestTransport {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method, request.url)
                .headers(request.headers);
            if let Some(body) = request.body {
                builder = builder.body(body);
            }
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(HttpResponse { status, body })
        })
    }
}

#[derive(Clone)]
pub(crate) struct RequestExecutor {
    base_url: String,
    http: Arc<dyn HttpTransport>,
}

impl RequestExecutor {
    pub(crate) fn new(base_url: &Url, http: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_url: base_url.as_str().trim_end_matches('/').to_owned(),
            http,
        }
    }

    /// Only `GET` and `POST` are supported. `session` is consulted (and the bearer
    /// attached) only for authorised requests; an unusable session fails the call
    /// before anything is sent.
    pub(crate) async fn make_request<B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&BTreeMap<String, String>>,
        body: Option<&B>,
        session: Option<&SessionManager>,
    ) -> Result<HttpResponse, SilCommsError>
    where
        B: Serialize + ?Sized,
    {
        let body = if method == Method::GET {
            None
        } else if method == Method::POST {
            let encoded = match body {
                Some(body) => serde_json::to_vec(body),
                None => serde_json::to_vec(&serde_json::Value::Null),
            }
            .map_err(SilCommsError::Serialize)?;
            Some(encoded)
        } else {
            return Err(SilCommsError::UnsupportedMethod(method));
        };

        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|err| SilCommsError::InvalidRequest(Box::new(err)))?;
        if let Some(query) = query.filter(|query| !query.is_empty()) {
            url.query_pairs_mut().extend_pairs(query);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));

        if let Some(session) = session {
            let Some(token) = session.authorization().await else {
                tracing::warn!(%method, path, "Rejecting request: session is not usable");
                return Err(SilCommsError::InvalidCredentials);
            };
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|err| SilCommsError::InvalidRequest(Box::new(err)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        tracing::debug!(%method, path, authorised = session.is_some(), "Dispatching request");

        self.http
            .execute(HttpRequest {
                method,
                url,
                headers,
                body,
            })
            .await
            .map_err(SilCommsError::Transport)
    }
}
