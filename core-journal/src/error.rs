use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Failed to decode {record}: {source}")]
    Decode {
        record: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl JournalError {
    pub fn record(&self) -> &'static str {
        match self {
            JournalError::Decode { record, .. } => record,
        }
    }
}

pub type Result<T> = std::result::Result<T, JournalError>;
