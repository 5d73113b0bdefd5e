// Stored data model: wire-format structs shared by the adapters, the
// analysis workflow and the record library. Serialized field names are
// pinned to the platform's existing camelCase layout — records written by
// earlier client revisions must keep decoding.

pub mod feedback;
pub mod resume;
pub mod user;

pub use feedback::{CategoryScore, Feedback, StructuredFeedback, Tip, TipKind};
pub use resume::{record_key, ResumeRecord, INDEX_KEY, RECORD_PATTERN};
pub use user::PlatformUser;
