// subst-domain library entry point
pub mod error;
pub mod id;
pub mod record;
pub mod request;
pub use error::DomainError;
pub use id::generate_package_id;
pub use record::{merge_metadata, PackageRecord};
pub use request::{EntryDraft, SubstitutionDraft, SubstitutionEntry, SubstitutionRequest};
