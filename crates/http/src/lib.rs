//! HTTP side of the Icinga 2 API client: a `ureq` transport, configuration
//! loading and event streams.

pub mod config;
pub mod error;
pub mod stream;
pub mod transport;

pub use config::{prepare_base_url, read_client_config, ClientConfig};
pub use error::ConfigError;
pub use stream::{events_request, EventStream};
pub use transport::HttpTransport;
