use crate::error::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Process started without a {0} pipe")]
    MissingPipe(&'static str),

    #[error("Process exited before its pid could be read")]
    MissingPid,
}

impl ProcessError {
    pub fn code(&self) -> u16 {
        match self {
            ProcessError::CommandNotFound(_) => ErrorCode::EXEC_COMMAND_NOT_FOUND,
            ProcessError::Io(_) => ErrorCode::EXEC_SPAWN_FAILED,
            ProcessError::MissingPipe(_) | ProcessError::MissingPid => {
                ErrorCode::EXEC_OUTPUT_ERROR
            }
        }
    }
}
