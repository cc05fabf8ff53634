/// Errors raised while building a client from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to prepare URL '{0}'")]
    InvalidUrl(String),

    #[error("could not read config file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("could not parse config file '{path}': {message}")]
    Parse { path: String, message: String },

    /// No URL in the file, on the command line or in `ICINGA2_API_URL`.
    #[error("no API URL configured")]
    MissingUrl,
}
