use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{context} rejected ({status}): {message}")]
    Api {
        context: &'static str,
        status: u16,
        message: String,
    },
}
