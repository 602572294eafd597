/// Errors raised while reading a redirect callback.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RedirectError {
    #[error("redirect landed on {actual}, expected a location under {expected}")]
    UnexpectedLocation { expected: String, actual: String },
    #[error("redirect is missing the `{0}` parameter")]
    MissingParam(&'static str),
    #[error("unsupported identity provider `{0}`")]
    UnsupportedProvider(String),
}
