//! Verdict interpretation.

use http::StatusCode;
use promptgate_detector_protocol::DetectorVerdict;

use crate::error::ViolationError;

/// Turn a detector verdict into control flow.
///
/// A flagged verdict becomes a [`ViolationError`] carrying the raw verdict and
/// `block_status`; an unflagged verdict has no effect.
pub fn interpret_verdict(
    verdict: DetectorVerdict,
    block_status: StatusCode,
) -> Result<(), ViolationError> {
    if verdict.is_flagged() {
        Err(ViolationError::new(verdict, block_status))
    } else {
        Ok(())
    }
}
