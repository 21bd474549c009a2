// src/requests.rs

use crate::client::UsergridClient;
use crate::error::UsergridError;

use reqwest::{Method, Response as HttpResponse};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

impl UsergridClient {
    // Turns a raw response into `R` on success or a `UsergridError` built from the error body.
    pub(crate) async fn _send_and_process_response<R: DeserializeOwned + Send + 'static>(
        &self,
        response: HttpResponse,
        endpoint_context: &str,
    ) -> Result<R, UsergridError> {
        let status = response.status();
        let response_url = response.url().to_string();

        if log::log_enabled!(log::Level::Debug) {
            log::debug!("--- Usergrid Response ---");
            log::debug!("Status: {}", status);
            for (name, value) in response.headers() {
                log::debug!("Header: {}: {:?}", name, value);
            }
        }

        let response_text = response.text().await.map_err(UsergridError::Transport)?;

        if status.is_success() {
            let body = if response_text.trim().is_empty() {
                "{}"
            } else {
                response_text.as_str()
            };
            log::debug!("Request to '{}' succeeded. Body: {}", endpoint_context, body);
            serde_json::from_str::<R>(body).map_err(|e| {
                log::error!(
                    "JSON deserialization failed for successful response from '{}'. Status: {}. Error: {}. Body: {}",
                    response_url,
                    status,
                    e,
                    body
                );
                UsergridError::JsonDeserializationFailed(format!(
                    "Failed to deserialize response from '{}': {}. Body: {}",
                    response_url, e, body
                ))
            })
        } else {
            log::warn!(
                "Request to '{}' failed with status {}. Body: {}",
                response_url,
                status,
                response_text
            );
            let parsed_body: Value = match serde_json::from_str::<Value>(&response_text) {
                Ok(json_val) if json_val.is_object() => json_val,
                _ => {
                    log::warn!(
                        "Error response body from '{}' is not a JSON object",
                        response_url
                    );
                    let error_type = status
                        .canonical_reason()
                        .unwrap_or("unknown_error")
                        .to_lowercase()
                        .replace(' ', "_");
                    let mut description: String = response_text.chars().take(100).collect();
                    if description.is_empty() {
                        description = format!("HTTP error {} with empty body", status.as_u16());
                    }
                    json!({
                        "error": error_type,
                        "error_description": description,
                    })
                }
            };
            Err(UsergridError::from_response(status.as_u16(), parsed_body))
        }
    }

    /// Sends an authenticated `GET` to `endpoint` (relative to the application URL).
    pub async fn get<R: DeserializeOwned + Send + 'static>(
        &self,
        endpoint: &str,
    ) -> Result<R, UsergridError> {
        self._request(Method::GET, endpoint, &[], None::<&Value>, true)
            .await
    }

    /// Sends an authenticated `GET` with query parameters.
    pub async fn get_with_params<R: DeserializeOwned + Send + 'static>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<R, UsergridError> {
        self._request(Method::GET, endpoint, params, None::<&Value>, true)
            .await
    }

    pub async fn post<T: Serialize + Send + Sync + ?Sized, R: DeserializeOwned + Send + 'static>(
        &self,
        endpoint: &str,
        data: &T,
    ) -> Result<R, UsergridError> {
        self._request(Method::POST, endpoint, &[], Some(data), true)
            .await
    }

    pub async fn put<T: Serialize + Send + Sync + ?Sized, R: DeserializeOwned + Send + 'static>(
        &self,
        endpoint: &str,
        data: &T,
    ) -> Result<R, UsergridError> {
        self._request(Method::PUT, endpoint, &[], Some(data), true)
            .await
    }

    pub async fn delete<R: DeserializeOwned + Send + 'static>(
        &self,
        endpoint: &str,
    ) -> Result<R, UsergridError> {
        self._request(Method::DELETE, endpoint, &[], None::<&Value>, true)
            .await
    }
}
