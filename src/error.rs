pub type SceneTraceResult<T> = Result<T, SceneTraceError>;

#[derive(thiserror::Error, Debug)]
pub enum SceneTraceError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("search request error: {0}")]
    Request(String),

    #[error("meme composition error: {0}")]
    Compose(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SceneTraceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    pub fn compose(msg: impl Into<String>) -> Self {
        Self::Compose(msg.into())
    }
}
