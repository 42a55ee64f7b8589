pub mod classify;
pub mod gemini;
