//! Error types for whole-transfer failures.
//!
//! Per-track problems never show up here; they are recorded in
//! [`crate::models::TransferResult::failed`].

use crate::models::ProviderKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    /// The provider has no access token for the current user.
    #[error("no access token for {0}")]
    AuthMissing(ProviderKind),

    /// The source playlist could not be listed.
    #[error("source playlist unreadable: {0:#}")]
    SourceUnreadable(anyhow::Error),

    /// Creating the destination playlist failed; nothing was transferred.
    #[error("destination playlist could not be created: {0:#}")]
    DestinationCreateFailed(anyhow::Error),
}

impl TransferError {
    /// Single user-facing error string. Never includes upstream bodies.
    pub fn user_message(&self) -> String {
        match self {
            TransferError::AuthMissing(kind) => format!("Connect {} first", kind.display_name()),
            TransferError::SourceUnreadable(_) => "Could not read the source playlist".to_string(),
            TransferError::DestinationCreateFailed(_) => {
                "Could not create the destination playlist".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_hides_platform_details() {
        let e = TransferError::DestinationCreateFailed(anyhow::anyhow!(
            "create playlist failed: 409 => {{\"error\":\"duplicate\"}}"
        ));
        assert!(!e.user_message().contains("409"));
        assert!(e.to_string().contains("409"));
        assert_eq!(
            TransferError::AuthMissing(ProviderKind::Youtube).user_message(),
            "Connect YouTube first"
        );
    }
}
