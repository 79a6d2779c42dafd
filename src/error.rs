use thiserror::Error;

#[derive(Error, Debug)]
pub enum NatterError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for NatterError {
    fn from(err: reqwest::Error) -> Self {
        NatterError::Api(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NatterError>;
