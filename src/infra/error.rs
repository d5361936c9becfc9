//! Faults raised while bringing the service up or reaching its host
//! environment. Request-time persistence failures go through `RepoError`
//! instead.

use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("database unavailable: {message}")]
    Database { message: String },
    #[error("upload storage at `{directory}` is unusable")]
    UploadRoot {
        directory: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not bind listener on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("tracing setup failed: {message}")]
    Telemetry { message: String },
    #[error("missing or invalid configuration: {message}")]
    Configuration { message: String },
}

impl InfraError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn upload_root(directory: impl Into<String>, source: std::io::Error) -> Self {
        Self::UploadRoot {
            directory: directory.into(),
            source,
        }
    }

    pub fn bind(addr: SocketAddr, source: std::io::Error) -> Self {
        Self::Bind { addr, source }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
