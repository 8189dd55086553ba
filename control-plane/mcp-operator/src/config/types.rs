use std::time::Duration;

use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct OperatorConfig {
    /// Port for the health endpoints.
    #[envconfig(from = "HTTP_PORT", default = "8081")]
    pub http_port: u16,

    /// Restrict watches to one namespace; cluster-wide when unset.
    /// Env: MCP_OPERATOR_WATCH_NAMESPACE
    #[envconfig(from = "MCP_OPERATOR_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    #[envconfig(from = "MCP_OPERATOR_WORKERS", default = "4")]
    pub workers: usize,

    /// Delay before retrying a pass that failed with a hard error.
    /// Env: MCP_OPERATOR_ERROR_REQUEUE_SECS
    #[envconfig(from = "MCP_OPERATOR_ERROR_REQUEUE_SECS", default = "60")]
    pub error_requeue_secs: u64,
}

impl OperatorConfig {
    /// Clamp counts and delays to usable values and drop a blank namespace.
    pub fn normalized(mut self) -> Self {
        self.workers = self.workers.max(1);
        self.error_requeue_secs = self.error_requeue_secs.max(1);
        if self
            .watch_namespace
            .as_deref()
            .map(|ns| ns.trim().is_empty())
            .unwrap_or(false)
        {
            self.watch_namespace = None;
        }
        self
    }

    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            http_port: 8081,
            watch_namespace: None,
            workers: 4,
            error_requeue_secs: 60,
        }
    }
}
