use thiserror::Error;

/// Failures raised by the token vault.
///
/// `Key` and `Data` come out of the cipher layer; `Store` covers reading and
/// writing the backing file.
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("encryption key error: {0}")]
    Key(String),
    #[error("encryption data error: {0}")]
    Data(String),
    #[error("token store error: {0}")]
    Store(String),
}

impl From<std::io::Error> for EncryptionError {
    fn from(err: std::io::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<serde_json::Error> for EncryptionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(err.to_string())
    }
}
