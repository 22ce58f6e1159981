pub mod azure_openai;
pub mod scripted;

pub use azure_openai::AzureOpenAIProvider;
pub use scripted::ScriptedProvider;
