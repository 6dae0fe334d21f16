pub mod distance;
pub mod fuzzy;

pub use distance::levenshtein_distance;
pub use fuzzy::{find_best_match, verify_all, verify_field, BestMatch, VerifyError, MAX_PHRASE_WORDS};
