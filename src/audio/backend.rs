use tokio::sync::mpsc;

use crate::error::CaptureError;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Target format for finalized recordings
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (decimated down to if the device runs faster)
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000,
            target_channels: 1,
        }
    }
}

/// Audio capture device trait
///
/// Implementations:
/// - `MicrophoneDevice`: default input device via cpal
/// - scripted devices (tests)
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Whether the platform offers a capture device at all
    fn is_supported(&self) -> bool;

    /// Acquire the device and start continuous chunked capture
    ///
    /// Returns a channel receiver that will receive audio frames. The channel
    /// closes once the device is released.
    async fn open(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError>;

    /// Release the device
    async fn close(&mut self) -> Result<(), CaptureError>;

    /// Check if the device is currently held
    fn is_capturing(&self) -> bool;

    /// Get device name for logging
    fn name(&self) -> &str;
}

/// Map a platform error message onto the capture error taxonomy
pub fn classify_device_error(message: &str) -> CaptureError {
    let lower = message.to_lowercase();
    if ["permission", "denied", "not allowed", "not authorized"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        CaptureError::PermissionDenied
    } else {
        CaptureError::DeviceError(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_messages_map_to_permission_denied() {
        assert_eq!(
            classify_device_error("Access DENIED by the user"),
            CaptureError::PermissionDenied
        );
        assert_eq!(
            classify_device_error("The requested operation is not allowed"),
            CaptureError::PermissionDenied
        );
    }

    #[test]
    fn other_messages_map_to_device_error() {
        assert_eq!(
            classify_device_error("device busy"),
            CaptureError::DeviceError("device busy".to_string())
        );
    }
}
