pub mod asr;
pub mod companion;
pub mod config;
pub mod decode;
pub mod emotion;
pub mod face;
pub mod labels;
pub mod reply;
pub mod tts;
pub mod util;
