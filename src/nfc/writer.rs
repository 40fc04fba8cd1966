use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::NfcError;

/// Proximity writing capability.
///
/// `write` waits until a tag is presented and the payload is confirmed on it.
/// The adapter must resolve with [`NfcError::Aborted`] once `abort` fires;
/// there is no hard cancellation of the underlying device operation.
#[async_trait]
pub trait TagWriter: Send + Sync {
    fn is_supported(&self) -> bool;

    async fn write(&self, payload: &str, abort: CancellationToken) -> Result<(), NfcError>;
}
