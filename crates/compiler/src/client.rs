//! HTTP client for the external compiler service
//!
//! One POST per compile request. There is no retry and nothing is cached:
//! a failed attempt is reported and forgotten.

use crate::interpreter::ErrorInterpreter;
use crate::request::CompileRequest;
use crate::response::CompilerResult;
use crate::{CompilerError, ServiceResult};
use reqwest::Client;
use resolver::CompilationUnit;
use std::time::Duration;
use url::Url;

/// Default endpoint of the hosted compiler service
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3001/api/compile";

/// Connection settings for the compiler service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub user_agent: String,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment
    pub use_system_proxy: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(60),
            user_agent: format!("SolidityStudio/{}", env!("CARGO_PKG_VERSION")),
            use_system_proxy: true,
        }
    }
}

/// Compiler service client
pub struct CompilerClient {
    client: Client,
    endpoint: Url,
    interpreter: ErrorInterpreter,
}

impl CompilerClient {
    pub fn new(config: &ClientConfig) -> ServiceResult<Self> {
        let endpoint = parse_endpoint(&config.endpoint)?;

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str());
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
            interpreter: ErrorInterpreter::new(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send one request and decode the answer
    ///
    /// Transport failures are errors. Anything the service answers, including
    /// non-success status codes, becomes a `CompilerResult`.
    pub async fn compile(&self, request: &CompileRequest) -> ServiceResult<CompilerResult> {
        tracing::info!(
            "Compiling {} ({} source files) via {}",
            request.entry_point(),
            request.source_count(),
            self.endpoint
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("Compiler service answered {} ({} bytes)", status, body.len());

        if status.is_success() {
            return CompilerResult::from_json(&body, &self.interpreter);
        }

        // Error payloads usually still carry a JSON message
        match CompilerResult::from_json(&body, &self.interpreter) {
            Ok(result @ CompilerResult::Failure(_)) => Ok(result),
            _ => {
                let raw = if body.trim().is_empty() {
                    format!("Compiler service returned HTTP {}", status)
                } else {
                    format!("Compiler service returned HTTP {}: {}", status, body.trim())
                };
                tracing::warn!("{}", raw);
                Ok(CompilerResult::failure(raw, &self.interpreter))
            }
        }
    }

    /// Build the request for a unit and send it
    pub async fn compile_unit(&self, unit: &CompilationUnit) -> ServiceResult<CompilerResult> {
        let request = CompileRequest::from_unit(unit)?;
        self.compile(&request).await
    }
}

/// Only absolute http(s) URLs are accepted
pub fn parse_endpoint(endpoint: &str) -> ServiceResult<Url> {
    let url = Url::parse(endpoint).map_err(|e| CompilerError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(CompilerError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: format!("unsupported scheme '{}', only http and https are allowed", scheme),
        }),
    }
}
