use agentforge_core::config::ApiConfig;
use agentforge_core::{
    Agent, AgentId, AgentRepository, ExecutionGateway, ExecutionRecord, ExecutionTicket,
    ForgeError, Result,
};
use futures::future::BoxFuture;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// REST client for the agent backend (`/agents` and `/agents/{id}/execute`).
///
/// One request per call, no retry. Transport failures surface as
/// `ForgeError::Transport`, 404 as `NotFound`, other non-2xx as `Backend`.
pub struct HttpAgentClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpAgentClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ForgeError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn agent_url(&self, id: &AgentId, suffix: &str) -> String {
        format!(
            "{}/agents/{}{}",
            self.base_url,
            urlencoding::encode(id.as_str()),
            suffix
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let req = self.client.request(method, url);
        match self.token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send and map transport and status failures. `what` names the resource
    /// for `NotFound`.
    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let resp = req
            .send()
            .await
            .map_err(|e| ForgeError::Transport(format!("Request failed: {}", e)))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ForgeError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ForgeError::Backend {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
        let resp = self.send(req, what).await?;
        let status = resp.status().as_u16();
        resp.json().await.map_err(|e| ForgeError::Backend {
            status,
            message: format!("Failed to parse response: {}", e),
        })
    }
}

/// Prefer the backend's `{"message": ...}` or `{"error": ...}` field over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// A created or updated agent must come back with a server id.
fn require_id(agent: Agent) -> Result<Agent> {
    if agent.id().is_none() {
        return Err(ForgeError::Backend {
            status: 200,
            message: "response carried no agent id".to_string(),
        });
    }
    Ok(agent)
}

impl AgentRepository for HttpAgentClient {
    fn create<'a>(&'a self, agent: &'a Agent) -> BoxFuture<'a, Result<Agent>> {
        Box::pin(async move {
            let url = format!("{}/agents", self.base_url);
            let req = self.request(Method::POST, &url).json(agent);
            let created = require_id(self.send_json(req, "agents").await?)?;
            info!(agent_id = %created.identity.key(), name = %created.name, "Agent created");
            Ok(created)
        })
    }

    fn update<'a>(&'a self, id: &'a AgentId, agent: &'a Agent) -> BoxFuture<'a, Result<Agent>> {
        Box::pin(async move {
            let req = self.request(Method::PUT, &self.agent_url(id, "")).json(agent);
            let updated = require_id(self.send_json(req, id.as_str()).await?)?;
            info!(agent_id = %id, "Agent updated");
            Ok(updated)
        })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<Agent>>> {
        Box::pin(async move {
            let url = format!("{}/agents", self.base_url);
            let agents: Vec<Agent> = self.send_json(self.request(Method::GET, &url), "agents").await?;
            debug!(count = agents.len(), "Agents listed");
            Ok(agents)
        })
    }

    fn get<'a>(&'a self, id: &'a AgentId) -> BoxFuture<'a, Result<Agent>> {
        Box::pin(async move {
            let req = self.request(Method::GET, &self.agent_url(id, ""));
            self.send_json(req, id.as_str()).await
        })
    }

    fn delete<'a>(&'a self, id: &'a AgentId) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let req = self.request(Method::DELETE, &self.agent_url(id, ""));
            self.send(req, id.as_str()).await?;
            info!(agent_id = %id, "Agent deleted");
            Ok(())
        })
    }
}

impl ExecutionGateway for HttpAgentClient {
    fn execute<'a>(&'a self, id: &'a AgentId) -> BoxFuture<'a, Result<ExecutionTicket>> {
        Box::pin(async move {
            let req = self.request(Method::POST, &self.agent_url(id, "/execute"));
            let ticket: ExecutionTicket = self.send_json(req, id.as_str()).await?;
            info!(agent_id = %id, status = %ticket.status, "Execution requested");
            Ok(ticket)
        })
    }

    fn executions<'a>(&'a self, id: &'a AgentId) -> BoxFuture<'a, Result<Vec<ExecutionRecord>>> {
        Box::pin(async move {
            let req = self.request(Method::GET, &self.agent_url(id, "/executions"));
            self.send_json(req, id.as_str()).await
        })
    }
}
