use anyhow::{Context, Result};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;

/// Server-level settings: bind address and the origin allowed by CORS.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub frontend_url: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self> {
        let host =
            std::env::var("HERON_SERVER__HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = match std::env::var("HERON_SERVER__PORT") {
            Ok(val) => val
                .parse::<u16>()
                .with_context(|| format!("Invalid HERON_SERVER__PORT: {val}"))?,
            Err(_) => DEFAULT_PORT,
        };
        let frontend_url = std::env::var("FRONTEND_URL").ok();

        Ok(Self {
            host,
            port,
            frontend_url,
        })
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
