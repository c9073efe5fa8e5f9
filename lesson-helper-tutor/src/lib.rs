//! Lesson Helper Tutor Library
//!
//! The `askTheTutor` function: answers a young child's question about a
//! lesson with Google's Gemini API, constrained to the lesson's own text.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod handler;
pub mod server;

pub use handler::{TutorHandler, TutorRequest, TutorResponse, build_prompt};
pub use server::TutorServer;
