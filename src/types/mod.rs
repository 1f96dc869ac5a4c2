//! Caller-facing value types.
//!
//! Filters, updates, projections and sort specifications are plain documents in the
//! store's native query model. They are forwarded verbatim, the aliases below only
//! document intent at call sites.

pub use mongodb::bson::{Bson, Document, doc, oid::ObjectId};

mod identifier;
pub use identifier::*;

/// Selects which documents an operation applies to.
pub type Filter = Document;
/// Update operators applied to every matched document (`{ "$set": {..} }`).
pub type Update = Document;
/// Fields to omit from (or keep in) a fetch result.
pub type Projection = Document;
/// Ordered sort keys, `1` ascending and `-1` descending.
pub type Sort = Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl From<Order> for Bson {
    fn from(value: Order) -> Self {
        match value {
            Order::Asc => Bson::Int32(1),
            Order::Desc => Bson::Int32(-1),
        }
    }
}

/// Builds a field-exclusion projection, e.g. `exclude(["password"])` gives
/// `{ "password": 0 }`.
pub fn exclude<I, S>(fields: I) -> Projection
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fields
        .into_iter()
        .map(|f| (f.into(), Bson::Int32(0)))
        .collect()
}

/// Builds a single-key sort specification. Further keys can be appended with
/// [`Document::insert`], insertion order is the sort priority.
pub fn sort_by(field: impl Into<String>, order: Order) -> Sort {
    let mut sort = Sort::new();
    sort.insert(field.into(), order);
    sort
}

/// A filter matching every document.
pub fn everything() -> Filter {
    Filter::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_projection() {
        assert_eq!(
            exclude(["password", "token"]),
            doc! { "password": 0, "token": 0 }
        );
        assert!(exclude(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn sort_spec() {
        let mut sort = sort_by("age", Order::Desc);
        sort.insert("name", Order::Asc);

        assert_eq!(sort, doc! { "age": -1, "name": 1 });
        let keys: Vec<&String> = sort.keys().collect();
        assert_eq!(keys, ["age", "name"]);
    }
}
