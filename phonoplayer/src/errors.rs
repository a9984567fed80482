use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    // Control operation issued with no eligible active session
    #[error("Nothing is currently playing")]
    NotPlaying,
    #[error("Download failed: {0}")]
    Download(String),
    #[error("Duration probe failed: {0}")]
    Probe(String),
    #[error("Failed to start player process: {0}")]
    Spawn(String),
    #[error("Process control failed: {0}")]
    ProcessControl(String),
}

impl PlayerError {
    pub fn download(message: impl ToString) -> Self {
        PlayerError::Download(message.to_string())
    }

    pub fn probe(message: impl ToString) -> Self {
        PlayerError::Probe(message.to_string())
    }

    pub fn spawn(message: impl ToString) -> Self {
        PlayerError::Spawn(message.to_string())
    }

    pub fn process_control(message: impl ToString) -> Self {
        PlayerError::ProcessControl(message.to_string())
    }
}
