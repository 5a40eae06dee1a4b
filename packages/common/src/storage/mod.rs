mod error;
mod key;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use key::StorageKey;
pub use traits::{BoxReader, FileStore};
