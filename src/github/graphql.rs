// GitHub GraphQL transport.
// A single query entry point that never fails: problems are logged and yield an empty object.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::client::GitHubClient;

const LOG_TARGET: &str = "ghpulse::graphql";

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<Value>>,
}

impl GitHubClient {
    /// Run a GraphQL query and return its `data` object.
    ///
    /// Non-200 responses, transport failures, undecodable bodies and top-level
    /// `errors` all produce an empty object.
    pub async fn query(&self, query: &str, variables: Value) -> Value {
        let payload = json!({ "query": query, "variables": variables });

        let response = match self
            .send_with_retry(|| self.graphql_request(&payload))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "GraphQL request failed: {}", e);
                return empty();
            }
        };

        if response.status() != StatusCode::OK {
            log::warn!(target: LOG_TARGET, "GraphQL non-200: {}", response.status());
            return empty();
        }

        let body: GraphQlResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "GraphQL response not decodable: {}", e);
                return empty();
            }
        };

        if let Some(errors) = body.errors.filter(|errors| !errors.is_empty()) {
            log::warn!(target: LOG_TARGET, "GraphQL errors: {}", Value::Array(errors));
            return empty();
        }

        body.data.filter(Value::is_object).unwrap_or_else(empty)
    }
}

fn empty() -> Value {
    Value::Object(Map::new())
}
