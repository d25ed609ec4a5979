mod in_memory;
mod r#trait;

pub use in_memory::InMemoryReconStore;
pub use r#trait::{ReconStore, ReconStoreError};
