// Library interface for bookscope modules
// This allows tests and other binaries to import modules

pub mod cache;
pub mod confidence;
pub mod counters;
pub mod error;
pub mod fallback;
pub mod invoker;
pub mod language;
pub mod llm;
pub mod request;
pub mod server;
pub mod storage;
pub mod summary;
pub mod truncate;
