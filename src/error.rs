use thiserror::Error;

/// Recoverable editor failures. Every other editing operation is total.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("input too short: {len} characters, at least {min} required")]
    InputTooShort { len: usize, min: usize },
}

#[derive(Debug, Error)]
pub enum RenderError {
    /// The terminal is smaller than the minimum usable size; rendering cannot
    /// place the cursor safely.
    #[error("terminal too small: {width}x{height}, need at least {min_width}x{min_height}")]
    GeometryOverflow {
        width: usize,
        height: usize,
        min_width: usize,
        min_height: usize,
    },
    #[error("terminal write failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_limits() {
        let err = EditorError::InputTooShort { len: 1, min: 3 };
        assert_eq!(
            err.to_string(),
            "input too short: 1 characters, at least 3 required"
        );

        let err = RenderError::GeometryOverflow {
            width: 2,
            height: 1,
            min_width: 4,
            min_height: 2,
        };
        assert!(err.to_string().contains("2x1"));
        assert!(err.to_string().contains("4x2"));
    }
}
