//! Lesson Helper Speech Library
//!
//! The `synthesizeSpeech` function: reads lesson text aloud using Google
//! Cloud Text-to-Speech and returns MP3 audio as base64.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod handler;
pub mod server;

pub use handler::{SpeechHandler, SpeechRequest, SpeechResponse, SynthesizedAudio};
pub use server::SpeechServer;
