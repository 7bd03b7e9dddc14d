pub mod clients;
pub mod selector;
pub mod traits;
pub mod types;

pub use selector::ModelSelector;
pub use traits::ModelBackend;
pub use types::{ModelError, ModelRequest, ModelResponse};
