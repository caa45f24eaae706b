pub mod backend;
pub mod convert;
pub mod file;
pub mod microphone;
pub mod recorder;
pub mod wav;

pub use backend::{classify_device_error, AudioFrame, CaptureConfig, CaptureDevice};
pub use file::AudioFile;
pub use microphone::MicrophoneDevice;
pub use recorder::{is_submittable, AudioRecorder, RecorderState, MIN_SUBMIT_BYTES};
pub use wav::{encode_frames, WAV_MIME};
