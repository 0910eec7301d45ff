use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("source archive root is missing or not a directory: {}", .0.display())]
    ArchiveRootMissing(PathBuf),
    #[error("destination root is missing or not a directory: {}", .0.display())]
    DestinationRootMissing(PathBuf),
    #[error("registry unavailable: {0}")]
    RegistryUnavailable(String),
    #[error("metadata unreadable for {}: {reason}", path.display())]
    MetadataUnreadable { path: PathBuf, reason: String },
    #[error("failed to list directory {}: {source}", path.display())]
    DirRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create destination directory: {0}")]
    DirCreation(megsync_files::FilesError),
    #[error("failed to read config file: {0}")]
    ConfigRead(std::io::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("failed to serialize disposition record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to write disposition log: {0}")]
    DispositionLog(std::io::Error),
    #[error("invalid recording name: {0}")]
    Name(#[from] crate::naming::NameError),
    #[error("transfer error: {0}")]
    Transfer(#[from] megsync_files::FilesError),
    #[error("invalid text: {0}")]
    Text(#[from] megsync_types::TextError),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
