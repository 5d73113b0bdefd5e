// Resume domain: the analyze workflow and the stored-record library.
// All storage access goes through the store's adapters — no module here
// talks to the platform binding directly.

pub mod library;
pub mod prompts;
pub mod workflow;

pub use library::{list_records, load_artifact, load_record, stored_index, wipe};
pub use workflow::{analyze, AnalyzeOutcome, AnalyzePhase, AnalyzeRequest, Progress};
