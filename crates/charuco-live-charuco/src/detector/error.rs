/// Errors returned when building a ChArUco detector.
#[derive(thiserror::Error, Debug)]
pub enum CharucoDetectError {
    #[error("invalid detector parameter `{field}`: {reason}")]
    InvalidParams {
        field: &'static str,
        reason: &'static str,
    },
}
