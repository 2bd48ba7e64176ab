pub mod error_helpers;
pub mod file_io;
pub mod image;

pub use self::error_helpers::{IoErrorMapper, ParseErrorMapper};
pub use self::image::{shave, Ycbcr};
