//! File ingestion and path safety: filename sanitizing, the batch size
//! ceiling, and sandboxed reads and writes under a project root.

pub mod limits;
pub mod sandbox;
pub mod sanitize;

pub use limits::{TooLarge, UploadLimit};
pub use sandbox::SandboxError;
pub use sanitize::sanitize;
