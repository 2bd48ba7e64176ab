use crate::error::{FsrcnnError, Result};
use std::io;
use std::path::Path;

pub trait IoErrorMapper<T> {
    fn map_io_err(self) -> Result<T>;

    /// Reports a missing file as [`FsrcnnError::FileNotFound`] naming `path`.
    fn map_io_err_at(self, path: &Path) -> Result<T>;
}

impl<T> IoErrorMapper<T> for std::result::Result<T, io::Error> {
    fn map_io_err(self) -> Result<T> {
        self.map_err(FsrcnnError::Io)
    }

    fn map_io_err_at(self, path: &Path) -> Result<T> {
        self.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => FsrcnnError::FileNotFound(path.to_path_buf()),
            _ => FsrcnnError::Io(e),
        })
    }
}

pub trait ParseErrorMapper<T> {
    fn map_parse_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> ParseErrorMapper<T> for std::result::Result<T, E> {
    fn map_parse_err(self, context: &str) -> Result<T> {
        self.map_err(|e| FsrcnnError::Parse(format!("{}: {}", context, e)))
    }
}

#[macro_export]
macro_rules! parse_param {
    ($app_m:expr, $param:expr, $type:ty, $desc:expr) => {
        if let Some(value) = $app_m.value_of($param) {
            Some(value.parse::<$type>()
                .map_err(|_| $crate::error::FsrcnnError::InvalidParameter(
                    format!("{} must be {}", $param, $desc)
                ))?)
        } else {
            None
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_the_path() {
        let err = std::fs::read("/definitely/not/here.rsr")
            .map_io_err_at(Path::new("/definitely/not/here.rsr"))
            .unwrap_err();
        assert!(matches!(err, FsrcnnError::FileNotFound(_)));
    }

    #[test]
    fn test_parse_context_is_kept() {
        let err = "x".parse::<usize>().map_parse_err("epochs").unwrap_err();
        assert!(err.to_string().contains("epochs"));
    }
}
