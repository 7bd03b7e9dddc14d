mod claude;
mod gemini;

pub use claude::ClaudeClient;
pub use gemini::GeminiClient;
