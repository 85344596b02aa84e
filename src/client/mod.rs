//! Client layer: orchestrates the session, the request executor and endpoint decoding.

mod gateway;
mod http;
mod session;

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use url::Url;

pub use gateway::{AuthError, AuthGateway};
pub use http::HttpResponse;
pub use session::{Scheduler, SessionManager, SessionStatus};

use crate::config::ConfigError;
use crate::domain::{
    ActivateSubscription, BulkSms, Credentials, DEFAULT_ACCESS_TOKEN_LIFETIME,
    DEFAULT_REFRESH_TOKEN_LIFETIME, Page, PremiumSms, SendBulkSms, SendPremiumSms, SenderId,
    Status, Subscription, SubscriptionQuery, TokenLifetimes, ValidationError, Variant,
};
use crate::transport::{
    BULK_SMS_PATH, DecodeError, Envelope, PREMIUM_SMS_PATH, SUBSCRIPTIONS_PATH, decode_bulk_sms,
    decode_envelope, decode_error_message, decode_premium_sms, decode_subscriptions_page,
    encode_activate_subscription_payload, encode_bulk_sms_payload, encode_premium_sms_payload,
};
use gateway::RestAuthGateway;
use http::{HttpTransport, RequestExecutor, ReqwestTransport};

/// Whole-request timeout applied unless [`SilCommsClientBuilder::timeout`] overrides it.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Boxed future returned by [`AuthGateway`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, thiserror::Error)]
/// Errors returned by [`SilCommsClient`].
///
/// This error preserves:
/// - transport failures and request construction failures,
/// - HTTP-level failures (status other than the one the endpoint answers with),
/// - API-level failures (envelope `status != success`),
/// - decode failures, tagged with the step that failed,
/// - auth failures and local rejections while the session is degraded.
pub enum SilCommsError {
    /// HTTP client / transport failure (DNS, TLS, timeouts, etc).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),

    /// Only `GET` and `POST` requests can be made.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(Method),

    /// The request URL or headers could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(#[source] Box<dyn StdError + Send + Sync>),

    /// The request body could not be serialized as JSON.
    #[error("failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The server answered with a status code other than the expected one.
    #[error("unexpected HTTP status: {status} (expected {expected})")]
    HttpStatus {
        expected: u16,
        status: u16,
        message: Option<String>,
        body: Option<String>,
    },

    /// The response envelope reported a `failure` or `error` status.
    #[error("API error: {status} {message:?}")]
    Api { status: Status, message: String },

    /// The response envelope or its payload did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Logging in or refreshing tokens failed.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The session is degraded; no authenticated request is attempted.
    #[error("invalid credentials, cannot make request")]
    InvalidCredentials,

    /// One of the domain constructors rejected an invalid value.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Client configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Clone)]
/// Builder for [`SilCommsClient`].
///
/// Everything the client needs is passed in here; nothing is read from the
/// process environment unless you start from [`SilCommsClientBuilder::from_env`].
pub struct SilCommsClientBuilder {
    base_url: String,
    credentials: Credentials,
    sender_id: SenderId,
    afya_moja_sender_id: Option<SenderId>,
    access_token_lifetime: Duration,
    refresh_token_lifetime: Duration,
    retry_interval: Option<Duration>,
    timeout: Duration,
    user_agent: Option<String>,
    auth_gateway: Option<Arc<dyn AuthGateway>>,
}

impl fmt::Debug for SilCommsClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SilCommsClientBuilder")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("sender_id", &self.sender_id)
            .field("afya_moja_sender_id", &self.afya_moja_sender_id)
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .field("retry_interval", &self.retry_interval)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("custom_auth_gateway", &self.auth_gateway.is_some())
            .finish()
    }
}

impl SilCommsClientBuilder {
    /// Create a builder with default token lifetimes (30 minutes / 24 hours).
    pub fn new(base_url: impl Into<String>, credentials: Credentials, sender_id: SenderId) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            sender_id,
            afya_moja_sender_id: None,
            access_token_lifetime: DEFAULT_ACCESS_TOKEN_LIFETIME,
            refresh_token_lifetime: DEFAULT_REFRESH_TOKEN_LIFETIME,
            retry_interval: None,
            timeout: DEFAULT_HTTP_TIMEOUT,
            user_agent: None,
            auth_gateway: None,
        }
    }

    /// Sender id used for [`Variant::AfyaMoja`] bulk messages.
    pub fn afya_moja_sender_id(mut self, sender_id: SenderId) -> Self {
        self.afya_moja_sender_id = Some(sender_id);
        self
    }

    /// How often the access token is refreshed.
    pub fn access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    /// How often a full credential login is performed.
    pub fn refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_token_lifetime = lifetime;
        self
    }

    /// Wait this long before retrying a failed scheduled rotation instead of a
    /// full token lifetime.
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = Some(interval);
        self
    }

    /// Set the HTTP client timeout applied to the entire request (default 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the HTTP `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Obtain tokens from a custom identity provider instead of the SIL Comms
    /// `auth/token` endpoints.
    pub fn auth_gateway(mut self, gateway: Arc<dyn AuthGateway>) -> Self {
        self.auth_gateway = Some(gateway);
        self
    }

    /// Build the client: log in, then start background token rotation.
    ///
    /// Must be called from within a tokio runtime. Fails if the initial login
    /// fails; no partially initialized client is returned.
    pub async fn build(self) -> Result<SilCommsClient, SilCommsError> {
        if self.timeout.is_zero() {
            return Err(ValidationError::ZeroDuration { field: "timeout" }.into());
        }

        let mut builder = reqwest::Client::builder().timeout(self.timeout);
        if let Some(user_agent) = self.user_agent.as_deref() {
            builder = builder.user_agent(user_agent);
        }

        let client = builder
            .build()
            .map_err(|err| SilCommsError::Transport(Box::new(err)))?;

        self.build_with_transport(Arc::new(ReqwestTransport { client }))
            .await
    }

    async fn build_with_transport(
        self,
        http: Arc<dyn HttpTransport>,
    ) -> Result<SilCommsClient, SilCommsError> {
        let base_url = Url::parse(&self.base_url).map_err(|err| ConfigError::Invalid {
            name: "base_url",
            reason: err.to_string(),
        })?;
        let lifetimes =
            TokenLifetimes::new(self.access_token_lifetime, self.refresh_token_lifetime)?;
        if self.retry_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(ValidationError::ZeroDuration {
                field: "retry_interval",
            }
            .into());
        }

        let executor = RequestExecutor::new(&base_url, http);
        let gateway: Arc<dyn AuthGateway> = match self.auth_gateway {
            Some(gateway) => gateway,
            None => Arc::new(RestAuthGateway::new(executor.clone())),
        };

        let session =
            SessionManager::new(gateway, self.credentials, lifetimes, self.retry_interval);
        session.login().await?;
        let scheduler = session.spawn_scheduler();

        Ok(SilCommsClient {
            executor,
            session,
            scheduler: Arc::new(scheduler),
            sender_id: self.sender_id,
            afya_moja_sender_id: self.afya_moja_sender_id,
        })
    }
}

#[derive(Clone)]
/// High-level SIL Comms client.
///
/// The client logs in when it is built and keeps a fresh bearer token in the
/// background. Clones share the session; background rotation stops when the
/// last clone is dropped or [`SilCommsClient::shutdown`] is called.
///
/// Every operation is a future: dropping it cancels the request without
/// affecting token rotation.
pub struct SilCommsClient {
    executor: RequestExecutor,
    session: SessionManager,
    scheduler: Arc<Scheduler>,
    sender_id: SenderId,
    afya_moja_sender_id: Option<SenderId>,
}

impl SilCommsClient {
    /// Start building a client.
    pub fn builder(
        base_url: impl Into<String>,
        credentials: Credentials,
        sender_id: SenderId,
    ) -> SilCommsClientBuilder {
        SilCommsClientBuilder::new(base_url, credentials, sender_id)
    }

    /// The session backing this client.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Stop background token rotation for every clone of this client.
    ///
    /// Tokens already held stay in place but will not be rotated anymore.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }

    /// Perform a raw request against `{base}{path}`.
    ///
    /// Only `GET` and `POST` are supported. `GET` ignores `body`; `POST` sends it
    /// as JSON. With `authorised`, the current access token is attached, and the
    /// call fails with [`SilCommsError::InvalidCredentials`] without touching the
    /// network while the session is degraded. The status code is not interpreted.
    pub async fn make_request<B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&BTreeMap<String, String>>,
        body: Option<&B>,
        authorised: bool,
    ) -> Result<HttpResponse, SilCommsError>
    where
        B: Serialize + ?Sized,
    {
        self.executor
            .make_request(method, path, query, body, authorised.then_some(&self.session))
            .await
    }

    /// Send one message to many recipients.
    ///
    /// The API accepts the batch (HTTP 202) and delivers in the background;
    /// delivery reports go to the application's callback URL.
    ///
    /// Errors:
    /// - [`SilCommsError::Validation`] when [`Variant::AfyaMoja`] is requested but no
    ///   AfyaMoja sender id is configured,
    /// - [`SilCommsError::HttpStatus`] for any status other than 202,
    /// - [`SilCommsError::Api`] when the envelope status is not `success`.
    pub async fn send_bulk_sms(&self, request: SendBulkSms) -> Result<BulkSms, SilCommsError> {
        let sender = self.sender_for(request.variant())?;
        let payload = encode_bulk_sms_payload(&request, sender);

        let response = self
            .make_request(Method::POST, BULK_SMS_PATH, None, Some(&payload), true)
            .await?;
        let envelope = expect_envelope(response, 202)?;

        Ok(decode_bulk_sms(&envelope)?)
    }

    /// Send a premium SMS billed against a subscription.
    pub async fn send_premium_sms(
        &self,
        request: SendPremiumSms,
    ) -> Result<PremiumSms, SilCommsError> {
        let payload = encode_premium_sms_payload(&request);

        let response = self
            .make_request(Method::POST, PREMIUM_SMS_PATH, None, Some(&payload), true)
            .await?;
        let envelope = expect_envelope(response, 200)?;

        Ok(decode_premium_sms(&envelope)?)
    }

    /// Subscribe a phone number to an offer.
    pub async fn activate_subscription(
        &self,
        request: ActivateSubscription,
    ) -> Result<(), SilCommsError> {
        let payload = encode_activate_subscription_payload(&request);

        let response = self
            .make_request(Method::POST, SUBSCRIPTIONS_PATH, None, Some(&payload), true)
            .await?;
        expect_envelope(response, 200)?;

        Ok(())
    }

    /// List subscriptions matching `query`, returning the page metadata as well.
    pub async fn get_subscriptions_page(
        &self,
        query: &SubscriptionQuery,
    ) -> Result<Page<Subscription>, SilCommsError> {
        let response = self
            .make_request::<()>(
                Method::GET,
                SUBSCRIPTIONS_PATH,
                Some(query.params()),
                None,
                true,
            )
            .await?;
        let envelope = expect_envelope(response, 200)?;

        Ok(decode_subscriptions_page(&envelope)?)
    }

    /// List subscriptions matching `query`.
    pub async fn get_subscriptions(
        &self,
        query: &SubscriptionQuery,
    ) -> Result<Vec<Subscription>, SilCommsError> {
        Ok(self.get_subscriptions_page(query).await?.results)
    }

    fn sender_for(&self, variant: Variant) -> Result<&SenderId, ValidationError> {
        match variant {
            Variant::Default => Ok(&self.sender_id),
            Variant::AfyaMoja => {
                self.afya_moja_sender_id
                    .as_ref()
                    .ok_or(ValidationError::SenderNotConfigured {
                        variant: variant.as_str(),
                    })
            }
        }
    }
}

fn expect_envelope(response: HttpResponse, expected: u16) -> Result<Envelope, SilCommsError> {
    if response.status != expected {
        return Err(SilCommsError::HttpStatus {
            expected,
            status: response.status,
            message: decode_error_message(&response.body),
            body: non_blank(response.body),
        });
    }

    let envelope = decode_envelope(&response.body)?;
    if envelope.status != Status::Success {
        return Err(SilCommsError::Api {
            status: envelope.status,
            message: envelope.message,
        });
    }

    Ok(envelope)
}

fn non_blank(body: String) -> Option<String> {
    if body.trim().is_empty() {
        None
    } else {
        Some(body)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use crate::domain::{
        MessageText, OfferCode, RawPhoneNumber, SubscriptionId, TokenPair,
    };
    use crate::transport::DecodeStage;

    use super::http::HttpRequest;
    use super::session::Timer;
    use super::*;

    impl HttpRequest {
        pub(crate) fn json_body(&self) -> serde_json::Value {
            serde_json::from_slice(self.body.as_deref().unwrap_or_default()).unwrap()
        }

        pub(crate) fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(name).and_then(|value| value.to_str().ok())
        }
    }

    #[derive(Debug, Clone)]
    pub(crate) struct FakeTransport {
        state: Arc<Mutex<FakeTransportState>>,
    }

    #[derive(Debug)]
    struct FakeTransportState {
        requests: Vec<HttpRequest>,
        routes: Vec<(String, u16, String)>,
        fallback: Result<(u16, String), String>,
    }

    impl FakeTransport {
        pub(crate) fn new(response_status: u16, response_body: impl Into<String>) -> Self {
            Self::with_fallback(Ok((response_status, response_body.into())))
        }

        pub(crate) fn failing(message: impl Into<String>) -> Self {
            Self::with_fallback(Err(message.into()))
        }

        fn with_fallback(fallback: Result<(u16, String), String>) -> Self {
            Self {
                state: Arc::new(Mutex::new(FakeTransportState {
                    requests: Vec::new(),
                    routes: Vec::new(),
                    fallback,
                })),
            }
        }

        /// Answer requests to `path` with a fixed response.
        pub(crate) fn route(self, path: &str, status: u16, body: impl Into<String>) -> Self {
            self.state
                .lock()
                .unwrap()
                .routes
                .push((path.to_owned(), status, body.into()));
            self
        }

        pub(crate) fn last_request(&self) -> Option<HttpRequest> {
            self.state.lock().unwrap().requests.last().cloned()
        }

        pub(crate) fn calls(&self) -> usize {
            self.state.lock().unwrap().requests.len()
        }
    }

    impl HttpTransport for FakeTransport {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>> {
            Box::pin(async move {
                let response = {
                    let mut state = self.state.lock().unwrap();
                    let routed = state
                        .routes
                        .iter()
                        .find(|(path, _, _)| path == request.url.path())
                        .map(|(_, status, body)| (*status, body.clone()));
                    state.requests.push(request);
                    routed.map_or_else(|| state.fallback.clone(), Ok)
                };
                let (status, body) = response?;
                Ok(HttpResponse { status, body })
            })
        }
    }

    /// Gateway issuing `access-N` / `refresh-N` pairs.
    #[derive(Debug, Clone)]
    pub(crate) struct FakeGateway {
        pub(crate) login_calls: Arc<AtomicUsize>,
        pub(crate) refresh_calls: Arc<AtomicUsize>,
        pub(crate) fail_login: Arc<AtomicBool>,
        pub(crate) fail_refresh: Arc<AtomicBool>,
        pub(crate) rotate_refresh: Arc<AtomicBool>,
        issued: Arc<AtomicUsize>,
    }

    impl FakeGateway {
        pub(crate) fn new() -> Self {
            Self {
                login_calls: Arc::default(),
                refresh_calls: Arc::default(),
                fail_login: Arc::default(),
                fail_refresh: Arc::default(),
                rotate_refresh: Arc::new(AtomicBool::new(true)),
                issued: Arc::default(),
            }
        }
    }

    impl AuthGateway for FakeGateway {
        fn login<'a>(
            &'a self,
            _credentials: &'a Credentials,
        ) -> BoxFuture<'a, Result<TokenPair, AuthError>> {
            Box::pin(async move {
                self.login_calls.fetch_add(1, Ordering::SeqCst);
                if self.fail_login.load(Ordering::SeqCst) {
                    return Err(AuthError::Rejected {
                        status: 401,
                        message: None,
                        body: None,
                    });
                }
                let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(TokenPair::new(format!("access-{n}"), format!("refresh-{n}")).unwrap())
            })
        }

        fn refresh<'a>(
            &'a self,
            refresh_token: &'a str,
        ) -> BoxFuture<'a, Result<TokenPair, AuthError>> {
            Box::pin(async move {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                if self.fail_refresh.load(Ordering::SeqCst) {
                    return Err(AuthError::Transport("auth server unreachable".into()));
                }
                let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
                let refresh = if self.rotate_refresh.load(Ordering::SeqCst) {
                    format!("refresh-{n}")
                } else {
                    refresh_token.to_owned()
                };
                Ok(TokenPair::new(format!("access-{n}"), refresh).unwrap())
            })
        }
    }

    fn builder() -> SilCommsClientBuilder {
        SilCommsClient::builder(
            "https://example.invalid/api",
            Credentials::new("ops@example.com", "secret").unwrap(),
            SenderId::new("SIL").unwrap(),
        )
    }

    async fn make_client(transport: FakeTransport, gateway: FakeGateway) -> SilCommsClient {
        builder()
            .afya_moja_sender_id(SenderId::new("AFYAMOJA").unwrap())
            .auth_gateway(Arc::new(gateway))
            .build_with_transport(Arc::new(transport))
            .await
            .unwrap()
    }

    fn bulk_request(variant: Variant) -> SendBulkSms {
        SendBulkSms::new(
            MessageText::new("hello").unwrap(),
            vec![RawPhoneNumber::new("+254700000000").unwrap()],
            variant,
        )
        .unwrap()
    }

    const BULK_OK: &str = r#"
    {
      "status": "success",
      "message": "accepted",
      "data": {
        "guid": "g1",
        "sender": "SIL",
        "message": "hello",
        "recipients": ["+254700000000"],
        "state": "QUEUED",
        "sms": [],
        "created": "2024-01-01T00:00:00Z",
        "updated": "2024-01-01T00:00:00Z"
      }
    }
    "#;

    #[tokio::test]
    async fn build_logs_in_through_rest_gateway() {
        let transport = FakeTransport::new(404, "").route(
            "/api/auth/token/",
            200,
            r#"{"status": "success", "data": {"access": "a1", "refresh": "r1"}}"#,
        );

        let client = builder()
            .build_with_transport(Arc::new(transport.clone()))
            .await
            .unwrap();

        assert_eq!(client.session().access_token().await.as_deref(), Some("a1"));
        assert_eq!(client.session().status().await, SessionStatus::Active);
        assert_eq!(transport.calls(), 1);
        client.shutdown().await;
    }

    #[tokio::test]
    async fn build_fails_when_initial_login_fails() {
        let transport = FakeTransport::new(401, r#"{"detail": "bad credentials"}"#);

        let err = builder()
            .build_with_transport(Arc::new(transport))
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SilCommsError::Auth(AuthError::Rejected { status: 401, .. })
        ));
    }

    #[test]
    fn builder_defaults_to_ten_second_timeout() {
        assert!(format!("{:?}", builder()).contains("timeout: 10s"));
        let custom = builder().timeout(Duration::from_secs(30));
        assert!(format!("{custom:?}").contains("timeout: 30s"));
    }

    #[tokio::test]
    async fn build_rejects_zero_timeout() {
        let err = builder()
            .timeout(Duration::ZERO)
            .build()
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SilCommsError::Validation(ValidationError::ZeroDuration { field: "timeout" })
        ));
    }

    #[tokio::test]
    async fn build_rejects_invalid_configuration() {
        let transport = FakeTransport::new(200, "");

        let err = SilCommsClient::builder(
            "not a url",
            Credentials::new("ops@example.com", "secret").unwrap(),
            SenderId::new("SIL").unwrap(),
        )
        .build_with_transport(Arc::new(transport.clone()))
        .await
        .err()
        .unwrap();
        assert!(matches!(
            err,
            SilCommsError::Config(ConfigError::Invalid {
                name: "base_url",
                ..
            })
        ));

        let err = builder()
            .access_token_lifetime(Duration::ZERO)
            .build_with_transport(Arc::new(transport.clone()))
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SilCommsError::Validation(ValidationError::ZeroDuration { .. })
        ));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn send_bulk_sms_posts_payload_with_bearer() {
        let transport = FakeTransport::new(202, BULK_OK);
        let client = make_client(transport.clone(), FakeGateway::new()).await;

        let bulk = client
            .send_bulk_sms(bulk_request(Variant::Default))
            .await
            .unwrap();
        assert_eq!(bulk.guid, "g1");
        assert_eq!(bulk.recipients, vec!["+254700000000".to_owned()]);

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url.as_str(), "https://example.invalid/api/v1/sms/bulk/");
        assert_eq!(request.header("accept"), Some("application/json"));
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("authorization"), Some("Bearer access-1"));
        assert_eq!(
            request.json_body(),
            serde_json::json!({
                "sender": "SIL",
                "message": "hello",
                "recipients": ["+254700000000"]
            })
        );
    }

    #[tokio::test]
    async fn send_bulk_sms_uses_afya_moja_sender_for_that_variant_only() {
        let transport = FakeTransport::new(202, BULK_OK);
        let client = make_client(transport.clone(), FakeGateway::new()).await;

        client
            .send_bulk_sms(bulk_request(Variant::AfyaMoja))
            .await
            .unwrap();
        assert_eq!(transport.last_request().unwrap().json_body()["sender"], "AFYAMOJA");

        client
            .send_bulk_sms(bulk_request(Variant::Default))
            .await
            .unwrap();
        assert_eq!(transport.last_request().unwrap().json_body()["sender"], "SIL");
    }

    #[tokio::test]
    async fn send_bulk_sms_without_afya_moja_sender_is_a_validation_error() {
        let transport = FakeTransport::new(202, BULK_OK);
        let client = builder()
            .auth_gateway(Arc::new(FakeGateway::new()))
            .build_with_transport(Arc::new(transport.clone()))
            .await
            .unwrap();

        let err = client
            .send_bulk_sms(bulk_request(Variant::AfyaMoja))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SilCommsError::Validation(ValidationError::SenderNotConfigured { .. })
        ));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn send_bulk_sms_requires_202() {
        let transport = FakeTransport::new(200, BULK_OK);
        let client = make_client(transport, FakeGateway::new()).await;

        let err = client
            .send_bulk_sms(bulk_request(Variant::Default))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SilCommsError::HttpStatus {
                expected: 202,
                status: 200,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn non_expected_status_keeps_error_message_and_body() {
        let transport = FakeTransport::new(
            400,
            r#"{"status": "error", "message": "invalid sender", "data": {"sender": ["unknown"]}}"#,
        );
        let client = make_client(transport, FakeGateway::new()).await;

        let err = client
            .send_bulk_sms(bulk_request(Variant::Default))
            .await
            .unwrap_err();
        match err {
            SilCommsError::HttpStatus {
                status,
                message,
                body,
                ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(message.as_deref(), Some("invalid sender"));
                assert!(body.unwrap().contains("unknown"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_error_body_maps_to_none() {
        let transport = FakeTransport::new(503, "   ");
        let client = make_client(transport, FakeGateway::new()).await;

        let err = client
            .send_bulk_sms(bulk_request(Variant::Default))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SilCommsError::HttpStatus {
                status: 503,
                body: None,
                message: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn failure_envelope_maps_to_api_error() {
        let transport = FakeTransport::new(
            200,
            r#"{"status": "failure", "message": "subscription inactive", "data": null}"#,
        );
        let client = make_client(transport, FakeGateway::new()).await;

        let request = SendPremiumSms {
            body: MessageText::new("tip").unwrap(),
            msisdn: RawPhoneNumber::new("+254700000000").unwrap(),
            subscription: SubscriptionId::new("sub-1").unwrap(),
        };
        let err = client.send_premium_sms(request).await.unwrap_err();
        match err {
            SilCommsError::Api { status, message } => {
                assert_eq!(status, Status::Failure);
                assert_eq!(message, "subscription inactive");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_json_maps_to_envelope_decode_error() {
        let transport = FakeTransport::new(202, "{ not json }");
        let client = make_client(transport, FakeGateway::new()).await;

        let err = client
            .send_bulk_sms(bulk_request(Variant::Default))
            .await
            .unwrap_err();
        match err {
            SilCommsError::Decode(err) => assert_eq!(err.stage(), DecodeStage::Envelope),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn wrong_payload_maps_to_payload_decode_error() {
        let transport = FakeTransport::new(202, r#"{"status": "success", "data": {"sender": "SIL"}}"#);
        let client = make_client(transport, FakeGateway::new()).await;

        let err = client
            .send_bulk_sms(bulk_request(Variant::Default))
            .await
            .unwrap_err();
        match err {
            SilCommsError::Decode(err) => assert_eq!(err.stage(), DecodeStage::Payload),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn activate_subscription_posts_offer_and_msisdn() {
        let transport = FakeTransport::new(
            200,
            r#"{"status": "success", "message": "subscription activated", "data": {}}"#,
        );
        let client = make_client(transport.clone(), FakeGateway::new()).await;

        client
            .activate_subscription(ActivateSubscription {
                offer: OfferCode::new("01262000").unwrap(),
                msisdn: RawPhoneNumber::new("+254700000000").unwrap(),
                activate: Some(true),
            })
            .await
            .unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(request.url.path(), "/api/v1/sms/subscriptions/");
        assert_eq!(
            request.json_body(),
            serde_json::json!({"offer": "01262000", "msisdn": "+254700000000", "activate": true})
        );
    }

    #[tokio::test]
    async fn get_subscriptions_sends_query_without_body() {
        let transport = FakeTransport::new(
            200,
            r#"
            {
              "status": "success",
              "message": "ok",
              "data": {
                "count": 3,
                "next": "https://example.invalid/api/v1/sms/subscriptions/?page=2",
                "previous": null,
                "results": [
                  {"guid": "s1", "offer": "01262000", "msisdn": "+254700000000"}
                ]
              }
            }
            "#,
        );
        let client = make_client(transport.clone(), FakeGateway::new()).await;
        let query = SubscriptionQuery::new()
            .msisdn(&RawPhoneNumber::new("+254700000000").unwrap())
            .page(1);

        let page = client.get_subscriptions_page(&query).await.unwrap();
        assert_eq!(page.count, 3);
        assert!(page.next.is_some());
        assert_eq!(page.results.len(), 1);

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, Method::GET);
        assert!(request.body.is_none());
        let pairs = request.url.query_pairs().into_owned().collect::<BTreeMap<_, _>>();
        assert_eq!(pairs.get("msisdn").map(String::as_str), Some("+254700000000"));
        assert_eq!(pairs.get("page").map(String::as_str), Some("1"));

        let subscriptions = client.get_subscriptions(&query).await.unwrap();
        assert_eq!(subscriptions[0].guid, "s1");
    }

    #[tokio::test]
    async fn make_request_rejects_unsupported_method_without_network_call() {
        let transport = FakeTransport::new(200, "{}");
        let client = make_client(transport.clone(), FakeGateway::new()).await;

        let err = client
            .make_request::<()>(Method::OPTIONS, BULK_SMS_PATH, None, None, true)
            .await
            .unwrap_err();
        assert!(matches!(err, SilCommsError::UnsupportedMethod(method) if method == Method::OPTIONS));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn make_request_reports_serialization_failure_without_network_call() {
        let transport = FakeTransport::new(200, "{}");
        let client = make_client(transport.clone(), FakeGateway::new()).await;
        let body = BTreeMap::from([(vec![1_u8], 1_u8)]);

        let err = client
            .make_request(Method::POST, BULK_SMS_PATH, None, Some(&body), true)
            .await
            .unwrap_err();
        assert!(matches!(err, SilCommsError::Serialize(_)));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn degraded_session_rejects_authorised_requests_without_network_call() {
        let transport = FakeTransport::new(202, BULK_OK);
        let gateway = FakeGateway::new();
        let client = make_client(transport.clone(), gateway.clone()).await;

        gateway.fail_refresh.store(true, Ordering::SeqCst);
        client.session().run_timer(Timer::AccessToken).await;
        assert!(!client.session().is_usable().await);

        let err = client
            .send_bulk_sms(bulk_request(Variant::Default))
            .await
            .unwrap_err();
        assert!(matches!(err, SilCommsError::InvalidCredentials));
        assert_eq!(err.to_string(), "invalid credentials, cannot make request");
        assert_eq!(transport.calls(), 0);

        // Unauthenticated calls do not consult the gate.
        client
            .make_request::<()>(Method::GET, "/health/", None, None, false)
            .await
            .unwrap();
        let request = transport.last_request().unwrap();
        assert!(request.header("authorization").is_none());
        assert_eq!(transport.calls(), 1);

        gateway.fail_refresh.store(false, Ordering::SeqCst);
        client.session().run_timer(Timer::AccessToken).await;
        let bulk = client
            .send_bulk_sms(bulk_request(Variant::Default))
            .await
            .unwrap();
        assert_eq!(bulk.guid, "g1");
        assert_eq!(
            transport.last_request().unwrap().header("authorization"),
            Some("Bearer access-2")
        );
    }

    #[tokio::test]
    async fn transport_failure_is_surfaced() {
        let transport = FakeTransport::failing("connection reset");
        let client = make_client(transport, FakeGateway::new()).await;

        let err = client
            .send_bulk_sms(bulk_request(Variant::Default))
            .await
            .unwrap_err();
        assert!(matches!(err, SilCommsError::Transport(_)));
    }

    #[tokio::test]
    async fn shutdown_is_shared_by_clones() {
        let client = make_client(FakeTransport::new(200, "{}"), FakeGateway::new()).await;
        let clone = client.clone();

        clone.shutdown().await;
        assert!(!client.scheduler.is_running());
        client.shutdown().await;
    }
}
