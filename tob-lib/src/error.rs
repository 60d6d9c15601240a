#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The preamble's first field is not a recognized table format tag.
    #[error("file type not supported: {0:?}")]
    UnsupportedFormat(String),

    #[error("malformed header: {0}")]
    Header(String),

    #[error("unrecognized field type: {0:?}")]
    FieldType(String),

    #[error("unrecognized frequency token: {0:?}")]
    Frequency(String),

    /// Frame size does not divide evenly into whole records.
    #[error("frame size {frame_size} does not divide into {record_size} byte records")]
    FrameSize {
        frame_size: usize,
        record_size: usize,
    },

    #[error("invalid timestamp: {0:?}")]
    Timestamp(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
