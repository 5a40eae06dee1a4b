pub mod ai;
pub mod extract;
pub mod file_storage;
pub mod processing;

pub use ai::AiService;
pub use file_storage::FileStorageService;
pub use processing::DocumentProcessingService;
