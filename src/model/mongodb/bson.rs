use mongodb::bson::{doc, Document};

/// Build an `_id` filter for one of our u32 IDs.
///
/// Serde serialises a u32 field to the smallest BSON integer that fits,
/// while `doc!` widens to Int64; MongoDB compares numeric types
/// interchangeably so the mismatch is harmless.
pub fn u32_id_filter(id: u32) -> Document {
    doc! {
        "_id": id as i64,
    }
}
