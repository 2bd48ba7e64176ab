use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsrcnnError {
	#[error("IO error: {0}")]
	Io(#[from] io::Error),

	#[error("Image processing error: {0}")]
	Image(#[from] image::ImageError),

	#[error("Shape error: {0}")]
	Shape(String),

	#[error("Parse error: {0}")]
	Parse(String),

	#[error("Invalid parameter: {0}")]
	InvalidParameter(String),

	#[error("Device unavailable: {0}")]
	DeviceUnavailable(String),

	#[error("Serialization error: {0}")]
	Serialization(String),

	#[error("Dataset error: {0}")]
	Dataset(String),

	#[error("File not found: {}", .0.display())]
	FileNotFound(PathBuf),
}

impl From<ndarray::ShapeError> for FsrcnnError {
	fn from(err: ndarray::ShapeError) -> Self {
		FsrcnnError::Shape(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, FsrcnnError>;
