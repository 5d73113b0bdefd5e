// Resumind core: client-side coordinator for the hosted platform.
// The platform binding arrives asynchronously; everything here is built
// around waiting for it, mediating auth, and running the resume analysis
// workflow over the platform's storage, key-value and AI surfaces.

pub mod config;
pub mod errors;
pub mod models;
pub mod platform;
pub mod resume;
pub mod store;

pub use config::{FeedbackBackend, StoreConfig};
pub use errors::StoreError;
pub use models::{Feedback, ResumeRecord, StructuredFeedback};
pub use platform::{LateBinding, Platform, UploadFile};
pub use store::{PlatformStore, StoreOptions};
