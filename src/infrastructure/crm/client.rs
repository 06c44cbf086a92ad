//! REST client for the CRM backend.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::dto::{
    AssignBody, ErrorResponse, LoginResponse, RoleBody, StatusBody, StatusQuery,
    UnreadCountResponse, UnreadQuery,
};
use crate::domain::entities::{
    AuthToken, Conversation, ConversationId, ConversationStatus, Customer, CustomerId, Message,
    MessageId, User, UserId, UserRole,
};
use crate::domain::errors::ApiError;
use crate::domain::ports::{
    AuthPort, CreateCustomerRequest, CrmDataPort, DirectoryPort, LoginCredentials,
    SendMessageRequest, UpdateCustomerRequest,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_AFTER_MS: u64 = 5000;
const USER_AGENT: &str = concat!("chatdesk/", env!("CARGO_PKG_VERSION"));

/// HTTP adapter for every backend port.
///
/// Requests carry the bearer token set with [`CrmClient::set_token`], if any.
pub struct CrmClient {
    client: Client,
    base_url: String,
    token: RwLock<Option<AuthToken>>,
}

impl CrmClient {
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::unexpected(format!("failed to create HTTP client: {e}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            token: RwLock::new(None),
        })
    }

    /// Sets the bearer token used by every following request.
    #[must_use]
    pub fn with_token(self, token: AuthToken) -> Self {
        self.set_token(Some(token));
        self
    }

    /// Replaces or clears the bearer token.
    pub fn set_token(&self, token: Option<AuthToken>) {
        *self.token.write() = token;
    }

    /// Backend url without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{path}", self.base_url));

        match self.token.read().as_ref() {
            Some(token) => builder.header(header::AUTHORIZATION, token.bearer()),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "Request to backend failed");
            transport_error(&e)
        })?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(error_from_response(status, response).await)
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.execute(builder).await?;
        response.json::<T>().await.map_err(|e| {
            warn!(error = %e, "Failed to decode backend response");
            ApiError::decode(e.to_string())
        })
    }

    async fn fetch_empty(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        self.execute(builder).await.map(|_| ())
    }
}

fn transport_error(error: &reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::network("request timed out")
    } else if error.is_connect() {
        ApiError::network("failed to connect to backend")
    } else {
        ApiError::network(error.to_string())
    }
}

fn retry_after_ms(response: &Response) -> u64 {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map_or(DEFAULT_RETRY_AFTER_MS, |secs| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let ms = (secs * 1000.0) as u64;
            ms
        })
}

async fn error_from_response(status: StatusCode, response: Response) -> ApiError {
    let retry_after = retry_after_ms(&response);
    let message = response
        .json::<ErrorResponse>()
        .await
        .ok()
        .and_then(|body| body.summary())
        .unwrap_or_else(|| format!("HTTP {status}"));

    debug!(status = status.as_u16(), message = %message, "Backend returned an error");

    match status {
        StatusCode::UNAUTHORIZED => ApiError::unauthorized(message),
        StatusCode::FORBIDDEN => ApiError::forbidden(message),
        StatusCode::NOT_FOUND => ApiError::not_found(message),
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited {
            retry_after_ms: retry_after,
        },
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ApiError::network(format!("backend temporarily unavailable: {message}"))
        }
        _ => ApiError::unexpected(format!("unexpected response: {status} - {message}")),
    }
}

#[async_trait]
impl AuthPort for CrmClient {
    async fn login(&self, credentials: &LoginCredentials) -> Result<(AuthToken, User), ApiError> {
        debug!(email = %credentials.email, "Logging in");

        let response: LoginResponse = self
            .fetch(self.request(Method::POST, "/auth/login").json(credentials))
            .await?;

        let token = AuthToken::new(response.access_token)
            .ok_or_else(|| ApiError::invalid_format("backend returned a malformed token"))?;

        Ok((token, response.user))
    }

    async fn validate_token(&self, token: &AuthToken) -> Result<User, ApiError> {
        let user: User = self
            .fetch(
                self.client
                    .get(format!("{}/users/me", self.base_url))
                    .header(header::AUTHORIZATION, token.bearer()),
            )
            .await?;

        debug!(user_id = %user.id, email = %user.email, "Token validated");
        Ok(user)
    }
}

#[async_trait]
impl CrmDataPort for CrmClient {
    async fn fetch_conversations(
        &self,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, ApiError> {
        self.fetch(
            self.request(Method::GET, "/conversations")
                .query(&StatusQuery { status }),
        )
        .await
    }

    async fn fetch_my_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.fetch(self.request(Method::GET, "/conversations/my-conversations"))
            .await
    }

    async fn fetch_conversation(&self, id: ConversationId) -> Result<Conversation, ApiError> {
        self.fetch(self.request(Method::GET, &format!("/conversations/{id}")))
            .await
    }

    async fn assign_conversation(
        &self,
        id: ConversationId,
        user_id: UserId,
    ) -> Result<Conversation, ApiError> {
        self.fetch(
            self.request(Method::PATCH, &format!("/conversations/{id}/assign"))
                .json(&AssignBody { user_id }),
        )
        .await
    }

    async fn update_conversation_status(
        &self,
        id: ConversationId,
        status: ConversationStatus,
    ) -> Result<Conversation, ApiError> {
        self.fetch(
            self.request(Method::PATCH, &format!("/conversations/{id}/status"))
                .json(&StatusBody { status }),
        )
        .await
    }

    async fn fetch_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, ApiError> {
        self.fetch(self.request(
            Method::GET,
            &format!("/messages/conversation/{conversation_id}"),
        ))
        .await
    }

    async fn send_message(&self, request: SendMessageRequest) -> Result<Message, ApiError> {
        self.fetch(self.request(Method::POST, "/messages/send").json(&request))
            .await
    }

    async fn mark_message_read(&self, id: MessageId) -> Result<Message, ApiError> {
        self.fetch(self.request(Method::POST, &format!("/messages/{id}/read")))
            .await
    }

    async fn mark_conversation_read(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, ApiError> {
        self.fetch(self.request(
            Method::POST,
            &format!("/messages/conversation/{conversation_id}/read"),
        ))
        .await
    }

    async fn fetch_unread_count(
        &self,
        conversation_id: Option<ConversationId>,
    ) -> Result<u64, ApiError> {
        let response: UnreadCountResponse = self
            .fetch(
                self.request(Method::GET, "/messages/unread/count")
                    .query(&UnreadQuery { conversation_id }),
            )
            .await?;
        Ok(response.count)
    }

    async fn fetch_unread_messages(
        &self,
        conversation_id: Option<ConversationId>,
    ) -> Result<Vec<Message>, ApiError> {
        self.fetch(
            self.request(Method::GET, "/messages/unread")
                .query(&UnreadQuery { conversation_id }),
        )
        .await
    }
}

#[async_trait]
impl DirectoryPort for CrmClient {
    async fn fetch_users(&self) -> Result<Vec<User>, ApiError> {
        self.fetch(self.request(Method::GET, "/users")).await
    }

    async fn update_user_role(&self, id: UserId, role: UserRole) -> Result<User, ApiError> {
        self.fetch(
            self.request(Method::PUT, &format!("/users/{id}/role"))
                .json(&RoleBody { role }),
        )
        .await
    }

    async fn delete_user(&self, id: UserId) -> Result<(), ApiError> {
        self.fetch_empty(self.request(Method::DELETE, &format!("/users/{id}")))
            .await
    }

    async fn fetch_customers(&self) -> Result<Vec<Customer>, ApiError> {
        self.fetch(self.request(Method::GET, "/customers")).await
    }

    async fn fetch_customer(&self, id: CustomerId) -> Result<Customer, ApiError> {
        self.fetch(self.request(Method::GET, &format!("/customers/{id}")))
            .await
    }

    async fn create_customer(&self, request: CreateCustomerRequest) -> Result<Customer, ApiError> {
        self.fetch(self.request(Method::POST, "/customers").json(&request))
            .await
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        request: UpdateCustomerRequest,
    ) -> Result<Customer, ApiError> {
        self.fetch(
            self.request(Method::PATCH, &format!("/customers/{id}"))
                .json(&request),
        )
        .await
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<(), ApiError> {
        self.fetch_empty(self.request(Method::DELETE, &format!("/customers/{id}")))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOjF9.c2lnbmF0dXJlLXZhbHVl";

    /// Answers a single HTTP request with `status` and `body`, returning the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0_u8; 4096];

            loop {
                let n = stream.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();

            String::from_utf8_lossy(&raw).to_string()
        });

        (url, handle)
    }

    fn client(url: &str) -> CrmClient {
        CrmClient::new(url)
            .unwrap()
            .with_token(AuthToken::new_unchecked(TOKEN))
    }

    #[test]
    fn test_client_creation_trims_base_url() {
        let client = CrmClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[tokio::test]
    async fn test_unread_count_sends_token_and_query() {
        let (url, server) = serve_once("200 OK", r#"{"count":4}"#).await;

        let count = client(&url)
            .fetch_unread_count(Some(ConversationId(7)))
            .await
            .unwrap();
        let request = server.await.unwrap();

        assert_eq!(count, 4);
        assert!(request.starts_with("GET /messages/unread/count?conversationId=7 HTTP/1.1"));
        let expected = format!("authorization: bearer {TOKEN}").to_ascii_lowercase();
        assert!(request.to_ascii_lowercase().contains(&expected));
    }

    #[tokio::test]
    async fn test_global_unread_count_has_no_query() {
        let (url, server) = serve_once("200 OK", r#"{"count":0}"#).await;

        client(&url).fetch_unread_count(None).await.unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("GET /messages/unread/count HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_status_update_body() {
        let body = r#"{"id":7,"customerId":3,"status":"closed","lastMessageAt":"2024-05-01T10:00:00Z","customer":{"id":3,"phoneNumber":"+5511999","name":"Maria"}}"#;
        let (url, server) = serve_once("200 OK", body).await;

        let conversation = client(&url)
            .update_conversation_status(ConversationId(7), ConversationStatus::Closed)
            .await
            .unwrap();
        let request = server.await.unwrap();

        assert_eq!(conversation.status, ConversationStatus::Closed);
        assert!(request.starts_with("PATCH /conversations/7/status HTTP/1.1"));
        assert!(request.ends_with(r#"{"status":"closed"}"#));
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_error() {
        let (url, _server) =
            serve_once("401 Unauthorized", r#"{"statusCode":401,"message":"Unauthorized"}"#)
                .await;

        let err = client(&url).fetch_unread_messages(None).await.unwrap_err();

        assert!(err.is_auth_error());
    }

    #[tokio::test]
    async fn test_not_found_carries_backend_message() {
        let (url, _server) =
            serve_once("404 Not Found", r#"{"message":"Conversation not found"}"#).await;

        let err = client(&url)
            .fetch_conversation(ConversationId(99))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::NotFound { ref resource } if resource == "Conversation not found"
        ));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_decode_error() {
        let (url, _server) = serve_once("200 OK", r#"{"unexpected":true}"#).await;

        let err = client(&url).fetch_unread_count(None).await.unwrap_err();

        assert!(matches!(err, ApiError::Decode { .. }));
    }

    const USER: &str =
        r#"{"id":5,"email":"ana@desk.io","fullName":"Ana","role":"admin","isActive":true}"#;
    const CUSTOMER: &str = r#"{"id":3,"phoneNumber":"+5511999","name":"Maria"}"#;

    #[tokio::test]
    async fn test_update_user_role() {
        let (url, server) = serve_once("200 OK", USER).await;

        let user = client(&url)
            .update_user_role(UserId(5), UserRole::Admin)
            .await
            .unwrap();
        let request = server.await.unwrap();

        assert_eq!(user.role, UserRole::Admin);
        assert!(request.starts_with("PUT /users/5/role HTTP/1.1"));
        assert!(request.ends_with(r#"{"role":"admin"}"#));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let (url, server) = serve_once("204 No Content", "").await;

        client(&url).delete_user(UserId(5)).await.unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("DELETE /users/5 HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_delete_user_forbidden_for_agents() {
        let (url, _server) =
            serve_once("403 Forbidden", r#"{"message":"Admins only"}"#).await;

        let err = client(&url).delete_user(UserId(5)).await.unwrap_err();

        assert!(matches!(err, ApiError::Forbidden { ref message } if message == "Admins only"));
    }

    #[tokio::test]
    async fn test_create_customer() {
        let (url, server) = serve_once("201 Created", CUSTOMER).await;

        let request = CreateCustomerRequest {
            name: "Maria".to_string(),
            phone_number: "+5511999".to_string(),
            email: None,
        };
        let customer = client(&url).create_customer(request).await.unwrap();
        let raw = server.await.unwrap();

        assert_eq!(customer.id, CustomerId(3));
        assert!(raw.starts_with("POST /customers HTTP/1.1"));
        assert!(raw.ends_with(r#"{"name":"Maria","phoneNumber":"+5511999"}"#));
    }

    #[tokio::test]
    async fn test_create_customer_validation_errors_are_joined() {
        let (url, _server) = serve_once(
            "400 Bad Request",
            r#"{"message":["name should not be empty","phoneNumber must be a string"]}"#,
        )
        .await;

        let request = CreateCustomerRequest {
            name: String::new(),
            phone_number: String::new(),
            email: None,
        };
        let err = client(&url).create_customer(request).await.unwrap_err();

        assert!(matches!(
            err,
            ApiError::Unexpected { ref message }
                if message.contains("name should not be empty; phoneNumber must be a string")
        ));
    }

    #[tokio::test]
    async fn test_update_customer_sends_present_fields() {
        let (url, server) = serve_once("200 OK", CUSTOMER).await;

        let request = UpdateCustomerRequest {
            email: Some("maria@mail.com".to_string()),
            ..UpdateCustomerRequest::default()
        };
        let customer = client(&url)
            .update_customer(CustomerId(3), request)
            .await
            .unwrap();
        let raw = server.await.unwrap();

        assert_eq!(customer.name, "Maria");
        assert!(raw.starts_with("PATCH /customers/3 HTTP/1.1"));
        assert!(raw.ends_with(r#"{"email":"maria@mail.com"}"#));
    }

    #[tokio::test]
    async fn test_delete_customer() {
        let (url, server) = serve_once("200 OK", "{}").await;

        client(&url).delete_customer(CustomerId(3)).await.unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("DELETE /customers/3 HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_missing_customer_is_not_found() {
        let (url, _server) =
            serve_once("404 Not Found", r#"{"message":"Customer not found"}"#).await;

        let err = client(&url)
            .delete_customer(CustomerId(404))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_rate_limit_defaults_retry_after() {
        let (url, _server) = serve_once("429 Too Many Requests", "{}").await;

        let err = client(&url).fetch_customers().await.unwrap_err();

        assert!(matches!(
            err,
            ApiError::RateLimited {
                retry_after_ms: DEFAULT_RETRY_AFTER_MS
            }
        ));
    }

    #[tokio::test]
    async fn test_unavailable_backend_is_network_error() {
        let (url, _server) = serve_once("503 Service Unavailable", "{}").await;

        let err = client(&url).fetch_users().await.unwrap_err();

        assert!(err.is_network_error());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = client(&url).fetch_users().await.unwrap_err();

        assert!(err.is_network_error());
    }
}
