use reqwest::Client;
use serde::Deserialize;
use sonic_rs::Value;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::user::{NewUser, RemoteUser, UpdateUser};

/// The reply shape of an `authenticate` call.
#[derive(Deserialize, Debug)]
struct AuthReply {
    #[serde(default)]
    success: bool,
    user: Option<RemoteUser>,
}

/// Client for the spreadsheet script endpoint.
///
/// Every request carries the shared `key`; the `action` parameter selects
/// the behavior. Calls are unary with no retry and no timeout beyond the
/// transport default, so a hanging call blocks only the requesting handler.
/// Replies are JSON text, but several actions tolerate garbage with a safe
/// per-action default instead of failing the request.
#[derive(Clone)]
pub struct DatastoreClient {
    http: Client,
    script_url: String,
    api_key: Zeroizing<String>,
}

impl DatastoreClient {
    /// Creates a new `DatastoreClient` for the configured endpoint.
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .user_agent("certportal/1.0")
            .build()
            .map_err(AppError::Upstream)?;

        Ok(Self {
            http,
            script_url: config.script_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Exchanges credentials for the stored user record.
    ///
    /// Returns `Ok(Some(user))` on success and `Ok(None)` when the endpoint
    /// explicitly rejects the credentials. Transport failures and replies
    /// that do not have the expected shape are errors; callers distinguish
    /// the two outcomes for the login redirect.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<RemoteUser>> {
        let response = self
            .http
            .post(&self.script_url)
            .form(&[
                ("key", self.api_key.as_str()),
                ("action", "authenticate"),
                ("username", username),
                ("password", password),
            ])
            .send()
            .await?;

        let text = response.text().await?;
        let reply: AuthReply = sonic_rs::from_str(&text)
            .map_err(|e| AppError::UpstreamParse(format!("authenticate reply: {}", e)))?;

        if !reply.success {
            return Ok(None);
        }

        match reply.user {
            Some(user) => Ok(Some(user)),
            None => Err(AppError::UpstreamParse(
                "authenticate reply missing user".to_string(),
            )),
        }
    }

    /// Fetches every stored user. A body that is not valid JSON degrades to
    /// an empty list.
    pub async fn get_users(&self) -> Result<Value> {
        let response = self
            .http
            .get(&self.script_url)
            .query(&[("key", self.api_key.as_str()), ("action", "getUsers")])
            .send()
            .await?;

        let text = response.text().await?;
        Ok(sonic_rs::from_str(&text).unwrap_or_else(|_| {
            tracing::error!("Failed to parse users reply: {}", text);
            sonic_rs::json!([])
        }))
    }

    /// Relays a user creation and passes the reply through.
    pub async fn add_user(&self, user: &NewUser) -> Result<Value> {
        let response = self
            .http
            .post(&self.script_url)
            .form(&[
                ("key", self.api_key.as_str()),
                ("action", "addUser"),
                ("username", user.username.as_str()),
                ("email", user.email.as_str()),
                ("password", user.password.as_str()),
                ("role", user.role.as_str()),
            ])
            .send()
            .await?;

        let text = response.text().await?;
        sonic_rs::from_str(&text)
            .map_err(|e| AppError::UpstreamParse(format!("addUser reply: {}", e)))
    }

    /// Relays a user update. The password travels only when one was given.
    pub async fn update_user(&self, original_username: &str, user: &UpdateUser) -> Result<Value> {
        let mut form = vec![
            ("key", self.api_key.as_str()),
            ("action", "updateUser"),
            ("originalUsername", original_username),
            ("username", user.username.as_str()),
            ("email", user.email.as_str()),
            ("role", user.role.as_str()),
        ];
        if !user.password.trim().is_empty() {
            form.push(("password", user.password.as_str()));
        }

        let response = self.http.post(&self.script_url).form(&form).send().await?;

        let text = response.text().await?;
        sonic_rs::from_str(&text)
            .map_err(|e| AppError::UpstreamParse(format!("updateUser reply: {}", e)))
    }

    /// Relays a user deletion and passes the reply through.
    pub async fn delete_user(&self, username: &str) -> Result<Value> {
        let response = self
            .http
            .post(&self.script_url)
            .form(&[
                ("key", self.api_key.as_str()),
                ("action", "deleteUser"),
                ("username", username),
            ])
            .send()
            .await?;

        let text = response.text().await?;
        sonic_rs::from_str(&text)
            .map_err(|e| AppError::UpstreamParse(format!("deleteUser reply: {}", e)))
    }

    /// Looks up a certificate by number. A body that is not valid JSON
    /// degrades to an invalid-certificate reply carrying the raw text.
    pub async fn verify(&self, certificate_no: &str) -> Result<Value> {
        let response = self
            .http
            .get(&self.script_url)
            .query(&[
                ("action", "verify"),
                ("certificateNo", certificate_no),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let text = response.text().await?;
        Ok(sonic_rs::from_str::<Value>(&text).unwrap_or_else(|_| {
            sonic_rs::json!({
                "message": text,
                "valid": false,
            })
        }))
    }

    /// Forwards arbitrary record fields to the spreadsheet. A body that is
    /// not valid JSON degrades to a generic outcome derived from the
    /// response status.
    pub async fn add_record(&self, fields: &[(String, String)]) -> Result<Value> {
        let mut form: Vec<(&str, &str)> = vec![("key", self.api_key.as_str())];
        for (name, value) in fields {
            form.push((name.as_str(), value.as_str()));
        }

        let response = self.http.post(&self.script_url).form(&form).send().await?;

        let ok = response.status().is_success();
        let text = response.text().await?;
        Ok(sonic_rs::from_str::<Value>(&text).unwrap_or_else(|_| {
            let message = if ok {
                "Data added successfully"
            } else {
                "Failed to add data"
            };
            sonic_rs::json!({ "success": ok, "message": message })
        }))
    }

    /// Fetches the full record list (no `action`). A body that is not valid
    /// JSON degrades to an empty list.
    pub async fn list_records(&self) -> Result<Value> {
        let response = self
            .http
            .get(&self.script_url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let text = response.text().await?;
        Ok(sonic_rs::from_str(&text).unwrap_or_else(|_| sonic_rs::json!([])))
    }
}
