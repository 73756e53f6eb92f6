//! Voice pipeline: audio capture, wake phrase detection, transcription,
//! speech output, and the session loop that ties them together.

pub mod audio_io;
pub mod session;
pub mod speech;
pub mod stt;
pub mod tts;
pub mod types;
pub mod wake;

pub use audio_io::{AudioSink, AudioSource, MockAudioSource, NullSink};
pub use session::{SessionController, SessionParams, SessionState};
pub use speech::{RecordingSpeech, SpeechChannel, SpeechOutput};
pub use stt::{MockSttProvider, OpenAiSttProvider, SttProvider};
pub use tts::{MockTtsProvider, OpenAiTtsProvider, TtsProvider};
pub use types::{AudioChunk, SynthesisRequest, TranscriptionResult};
pub use wake::{WakeHit, WakePhrase};

#[cfg(feature = "audio")]
pub use audio_io::{CpalAudioSource, CpalSink};
