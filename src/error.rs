pub type KinreelResult<T> = Result<T, KinreelError>;

#[derive(thiserror::Error, Debug)]
pub enum KinreelError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KinreelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            KinreelError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            KinreelError::render("x")
                .to_string()
                .contains("render error:")
        );
        assert!(
            KinreelError::encode("x")
                .to_string()
                .contains("encode error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = KinreelError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
