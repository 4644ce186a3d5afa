use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The API answered with a non-success status
    #[error("{message} (Status: {status})")]
    Api { status: u16, message: String },

    #[error("Request to LeadPay API failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The dollar amount has no valid positive cent value
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl ClientError {
    /// The message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
