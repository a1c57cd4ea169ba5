use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::ClientConfig;
use shared_models::ClientError;

use crate::envelope::ErrorEnvelope;

pub struct CrisisApiClient {
    client: Client,
    base_url: String,
}

impl CrisisApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token.filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ClientError::Auth("token contains invalid header characters".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let headers = self.get_headers(auth_token)?;

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);

            return Err(ErrorEnvelope::parse(&error_text).into_client_error(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            // Some endpoints answer 204 or an empty 200.
            return serde_json::from_value(Value::Null).map_err(ClientError::from);
        }

        let data = serde_json::from_slice::<T>(&bytes)?;
        Ok(data)
    }

    pub async fn get<T>(&self, path: &str, auth_token: Option<&str>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, auth_token, None).await
    }

    pub async fn post<T>(&self, path: &str, auth_token: Option<&str>, body: Value) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, auth_token, Some(body)).await
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CrisisApiClient {
        CrisisApiClient::new(&ClientConfig::default()).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = ClientConfig {
            api_url: "http://api.local/".to_string(),
            ..ClientConfig::default()
        };
        let client = CrisisApiClient::new(&config).unwrap();
        assert_eq!(client.get_base_url(), "http://api.local");
    }

    #[test]
    fn test_headers_include_bearer_token() {
        let headers = client().get_headers(Some("abc")).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
    }

    #[test]
    fn test_headers_skip_empty_token() {
        let headers = client().get_headers(Some("")).unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_headers_reject_control_characters() {
        let result = client().get_headers(Some("bad\ntoken"));
        assert!(matches!(result, Err(ClientError::Auth(_))));
    }
}
