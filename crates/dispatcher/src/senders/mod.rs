//! Network sender implementations
//!
//! Contains LogSender and, with the `http` feature, HttpSender.

#[cfg(feature = "http")]
mod http;
mod log;

#[cfg(feature = "http")]
pub use self::http::HttpSender;
pub use self::log::LogSender;

use contracts::SendFailure;

/// Map a collection endpoint status code to a send result
///
/// 400, 413 and 422 mean the payload can never be accepted; every other
/// non-2xx status is retried.
pub fn classify_status(status: u16) -> Result<(), SendFailure> {
    match status {
        200..=299 => Ok(()),
        400 | 413 | 422 => Err(SendFailure::request_invalid(format!(
            "endpoint rejected batch with status {status}"
        ))),
        _ => Err(SendFailure::transient(format!(
            "endpoint answered with status {status}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::FailureKind;

    #[test]
    fn test_classify_status() {
        assert!(classify_status(200).is_ok());
        assert!(classify_status(204).is_ok());

        for status in [400, 413, 422] {
            let failure = classify_status(status).unwrap_err();
            assert_eq!(failure.kind, FailureKind::RequestInvalid);
        }
        for status in [401, 404, 429, 500, 503] {
            let failure = classify_status(status).unwrap_err();
            assert_eq!(failure.kind, FailureKind::Transient);
        }
    }
}
