//! Thin client for the console's REST API.
//!
//! Every endpoint answers with the same envelope: `{ code, msg, data }`, plus
//! `total`, `page` and `page_size` for paginated lists. `code` other than 200
//! is a failure even when the HTTP status is 200.

mod agno;

pub use agno::{Conversation, ConversationQuery, Message, NewConversation, AGNO_PREFIX};

use reqwest::header::HeaderValue;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Header carrying the access token on authenticated requests.
pub const TOKEN_HEADER: &str = "token";

const SUCCESS_CODE: i64 = 200;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid API URL")]
    Url(#[from] url::ParseError),

    #[error("request failed")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("API error {code}: {msg}")]
    Envelope { code: i64, msg: String },

    #[error("failed to decode API response")]
    Decode(#[from] serde_json::Error),

    #[error("API response carried no data")]
    MissingData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    pub msg: Option<String>,
    pub data: Option<T>,
    pub total: Option<u64>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl<T> ApiResponse<T> {
    pub fn into_data(self) -> Result<T, ApiError> {
        self.data.ok_or(ApiError::MissingData)
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn into_page(self) -> Page<T> {
        let items = self.data.unwrap_or_default();
        Page {
            total: self.total.unwrap_or(items.len() as u64),
            page: self.page.unwrap_or(1),
            page_size: self.page_size.unwrap_or(items.len() as u64),
            items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// `base_url` includes the API version path, e.g. `http://host:9999/api/v1`.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}{}", self.base_url, path))
    }

    /// Request builder with the access token attached, if any.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let req = self.http.request(method, url);
        match self.token.as_deref().map(HeaderValue::from_str) {
            Some(Ok(v)) => req.header(TOKEN_HEADER, v),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "access token is not a valid header value; sending without it");
                req
            }
            None => req,
        }
    }

    pub async fn get<T, Q>(&self, path: &str, query: &Q) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        self.send(self.request(Method::GET, url).query(query)).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        self.send(self.request(Method::POST, url).json(body)).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        self.send(self.request(Method::PUT, url).json(body)).await
    }

    pub async fn delete<T>(&self, path: &str) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        self.send(self.request(Method::DELETE, url)).await
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<ApiResponse<T>, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let envelope: ApiResponse<T> = serde_json::from_slice(&body)?;
        if envelope.code != SUCCESS_CODE {
            return Err(ApiError::Envelope {
                code: envelope.code,
                msg: envelope.msg.unwrap_or_default(),
            });
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let api = ApiClient::new(reqwest::Client::new(), "http://localhost:9999/api/v1/");
        let url = api.endpoint("/agno/conversations").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9999/api/v1/agno/conversations");
    }

    #[test]
    fn relative_base_url_is_rejected() {
        let api = ApiClient::new(reqwest::Client::new(), "/api/v1");
        assert!(api.endpoint("/agno").is_err());
    }

    #[test]
    fn page_from_extra_envelope() {
        let resp: ApiResponse<Vec<u32>> = serde_json::from_str(
            r#"{"code":200,"msg":"OK","data":[1,2],"total":7,"page":2,"page_size":2}"#,
        )
        .unwrap();
        let page = resp.into_page();
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!((page.total, page.page, page.page_size), (7, 2, 2));
    }

    #[test]
    fn null_data_is_missing() {
        let resp: ApiResponse<u32> =
            serde_json::from_str(r#"{"code":200,"msg":"删除成功","data":null}"#).unwrap();
        assert!(matches!(resp.into_data(), Err(ApiError::MissingData)));
    }
}
