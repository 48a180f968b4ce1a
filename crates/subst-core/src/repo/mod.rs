pub mod types;
pub use types::{InMemoryPackageStore, PackageStore, StoreError};
