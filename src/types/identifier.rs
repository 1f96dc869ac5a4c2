use mongodb::bson::{Bson, oid::ObjectId};

use super::Filter;

/// Field holding the primary key of every document.
pub const ID_FIELD: &str = "_id";

/// Renders a generated identifier as a string.
///
/// Object ids are rendered as their 24-digit hex form and string ids are
/// returned as-is. Any other identifier kind yields [`None`].
pub fn id_to_string(id: &Bson) -> Option<String> {
    match id {
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Builds an `_id` filter from an identifier previously returned by a save.
///
/// A valid object id hex string is matched as an object id, anything else as a
/// plain string id.
pub fn by_id(id: &str) -> Filter {
    let value = match ObjectId::parse_str(id) {
        Ok(oid) => Bson::ObjectId(oid),
        Err(_) => Bson::String(id.to_owned()),
    };

    let mut filter = Filter::new();
    filter.insert(ID_FIELD, value);
    filter
}
