use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::error::{DashError, Result};

const USER_AGENT: &str = concat!("depboard/", env!("CARGO_PKG_VERSION"));

/// Thin GraphQL + REST client for the tracker. Cheap to clone.
#[derive(Clone)]
pub struct TrackerClient {
    http: Client,
    graphql_url: String,
    rest_url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct GraphQLRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Deserialize, Debug)]
struct GraphQLError {
    message: String,
}

impl TrackerClient {
    /// Build a client from config, reading the token from the configured
    /// environment variable. A missing token is allowed; the tracker will
    /// reject the request if it needs one.
    pub fn from_config(config: &TrackerConfig) -> Self {
        let token = config.token();
        if token.is_none() {
            tracing::warn!(env = %config.token_env, "no tracker token set; requests are unauthenticated");
        }
        Self::new(config.graphql_url.clone(), config.rest_url.clone(), token)
    }

    pub fn new(graphql_url: String, rest_url: String, token: Option<String>) -> Self {
        Self {
            http: Client::new(),
            graphql_url,
            rest_url: rest_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let req = req.header("User-Agent", USER_AGENT);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let request = GraphQLRequest { query, variables };

        let response = self
            .authorize(self.http.post(&self.graphql_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DashError::Api {
                status: response.status().as_u16(),
                message: response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<failed to read response body>".to_string()),
            });
        }

        let gql_response: GraphQLResponse<T> = response.json().await?;

        if let Some(errors) = gql_response.errors.filter(|e| !e.is_empty()) {
            return Err(DashError::GraphQl(
                errors.into_iter().map(|e| e.message).collect(),
            ));
        }

        gql_response.data.ok_or(DashError::EmptyResponse)
    }

    /// GET `{rest_url}{path}` and decode the JSON body.
    pub async fn rest_get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.rest_url, path);
        let response = self
            .authorize(self.http.get(&url))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DashError::Api {
                status: response.status().as_u16(),
                message: response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<failed to read response body>".to_string()),
            });
        }

        Ok(response.json().await?)
    }
}
