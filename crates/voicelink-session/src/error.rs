use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token endpoint returned {status}: {body}")]
    TokenStatus { status: u16, body: String },

    #[error("invalid token response: {0}")]
    TokenResponse(String),

    #[error("room error: {0}")]
    Room(String),

    #[error("audio device error: {0}")]
    Audio(String),
}
