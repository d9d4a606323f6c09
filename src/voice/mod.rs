pub mod controller;
pub mod duration;
pub mod intent;
pub mod loop_worker;
pub mod speech;

pub use controller::VoiceController;
pub use intent::{classify, Intent};
pub use loop_worker::VoiceLoopSignal;
pub use speech::{ConsoleSpeech, SpeechIo};
