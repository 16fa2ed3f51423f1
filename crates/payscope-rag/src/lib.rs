pub mod compose;
pub mod dispatch;
pub mod embedding;
pub mod intent;
pub mod retrieve;
pub mod types;

pub use compose::compose;
pub use dispatch::dispatch;
pub use embedding::EmbeddingClient;
pub use intent::{classify_intent, IntentModelClient};
pub use retrieve::retrieve;
pub use types::{Intent, IntentClassification, IntentLabel, StructuredResponse};
