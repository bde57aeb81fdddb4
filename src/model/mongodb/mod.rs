mod bson;
mod collection;
mod counter;
mod errors;

pub use bson::u32_id_filter;
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{
    ensure_counters_exist, Counter, ELECTION_ID_COUNTER, VOTER_ID_COUNTER,
};
pub use errors::is_duplicate_key_error;
