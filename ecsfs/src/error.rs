use block_dev::DeviceError;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("volume signature or block count does not match the device")]
    InvalidVolume,
    #[error("invalid filename or descriptor")]
    InvalidArgument,
    #[error("no room left in the table")]
    CapacityExhausted,
    #[error("no such file or descriptor")]
    NotFound,
    #[error("file already exists")]
    Duplicate,
    #[error("block device failure: {0:?}")]
    Device(DeviceError),
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Self::Device(e)
    }
}

pub type Result<T> = core::result::Result<T, Error>;
