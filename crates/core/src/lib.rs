pub mod field;
pub mod record;
pub mod result;

pub use field::{FieldEntry, FieldName, LabelFields, UnknownField};
pub use record::LogRecord;
pub use result::{is_match, VerificationResult, MATCH_THRESHOLD};
