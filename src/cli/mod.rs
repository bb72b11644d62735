use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host address and port for the relay server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Base URL of the external LLM service the relay forwards to
    /// (e.g., http://localhost:8000/v1).
    #[arg(long, env = "LLM_SERVICE_URL", default_value = "http://localhost:8000/v1")]
    pub llm_service_url: String,

    /// Browser origin allowed to call the relay (CORS).
    #[arg(long, env = "ALLOWED_ORIGIN", default_value = "http://localhost:3000")]
    pub allowed_origin: String,

    /// Base URL of the conversation store service.
    #[arg(long, env = "STORE_BASE_URL", default_value = "http://localhost:8080")]
    pub store_base_url: String,

    /// Timeout in seconds applied to every outbound HTTP call.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Optional path to the TLS certificate file (PEM format) for serving HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for serving HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}
