use mongodb::bson::{Bson, Document};

use super::{Error, path};

const ID_FIELD: &str = "_id";

/// Applies an update document (`{ "$set": {..}, "$inc": {..} }`) to `doc`.
///
/// Returns `true` when the document actually changed, which is what the
/// modified count of an update reports.
pub fn apply_update(doc: &mut Document, update: &Document) -> Result<bool, Error> {
    if update.is_empty() {
        return Err(Error::EmptyUpdate);
    }

    // Work on a copy so a failing operator leaves the stored document untouched
    let mut updated = doc.clone();

    for (op, fields) in update {
        let fields = match fields {
            Bson::Document(fields) => fields,
            _ if !op.starts_with('$') => return Err(Error::MissingOperator(op.clone())),
            _ => {
                return Err(Error::BadOperand {
                    op: op.clone(),
                    expected: "a document",
                });
            }
        };

        match op.as_str() {
            "$set" => {
                for (field, value) in fields {
                    guard_id(field, path::lookup(&updated, field), Some(value))?;
                    path::set(&mut updated, field, value.clone())?;
                }
            }
            "$unset" => {
                for (field, _) in fields {
                    guard_id(field, path::lookup(&updated, field), None)?;
                    path::remove(&mut updated, field);
                }
            }
            "$inc" => {
                for (field, delta) in fields {
                    guard_id(field, None, None)?;
                    let current = path::lookup(&updated, field);
                    let value = increment(field, current, delta)?;
                    path::set(&mut updated, field, value)?;
                }
            }
            other if other.starts_with('$') => {
                return Err(Error::UnknownOperator(other.to_owned()));
            }
            other => return Err(Error::MissingOperator(other.to_owned())),
        }
    }

    let modified = updated != *doc;
    *doc = updated;
    Ok(modified)
}

/// Rejects any change to `_id`, re-setting it to the same value is allowed.
fn guard_id(field: &str, current: Option<&Bson>, new: Option<&Bson>) -> Result<(), Error> {
    let touches_id = field == ID_FIELD || field.starts_with("_id.");
    if touches_id && (new.is_none() || current != new) {
        return Err(Error::ImmutableId);
    }
    Ok(())
}

fn increment(field: &str, current: Option<&Bson>, delta: &Bson) -> Result<Bson, Error> {
    let bad_delta = || Error::BadOperand {
        op: "$inc".to_owned(),
        expected: "a numeric value",
    };

    let checked = |a: i64, b: i64| {
        a.checked_add(b)
            .ok_or_else(|| Error::Overflow(field.to_owned()))
    };

    let current = current.unwrap_or(&Bson::Int32(0));

    let value = match (current, delta) {
        (Bson::Int32(a), Bson::Int32(b)) => a
            .checked_add(*b)
            .map(Bson::Int32)
            .unwrap_or_else(|| Bson::Int64(i64::from(*a) + i64::from(*b))),
        (Bson::Int32(a), Bson::Int64(b)) => Bson::Int64(checked(i64::from(*a), *b)?),
        (Bson::Int64(a), Bson::Int32(b)) => Bson::Int64(checked(*a, i64::from(*b))?),
        (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(checked(*a, *b)?),
        (Bson::Double(a), Bson::Double(b)) => Bson::Double(a + b),
        (Bson::Double(a), Bson::Int32(b)) => Bson::Double(a + f64::from(*b)),
        (Bson::Double(a), Bson::Int64(b)) => Bson::Double(a + *b as f64),
        (Bson::Int32(a), Bson::Double(b)) => Bson::Double(f64::from(*a) + b),
        (Bson::Int64(a), Bson::Double(b)) => Bson::Double(*a as f64 + b),
        (Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_), _) => return Err(bad_delta()),
        _ => return Err(Error::NonNumeric(field.to_owned())),
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn set_and_unset() {
        let mut d = doc! { "_id": 1, "name": "ada", "age": 36 };

        let modified = apply_update(
            &mut d,
            &doc! { "$set": { "name": "grace", "address.city": "ny" }, "$unset": { "age": "" } },
        )
        .unwrap();

        assert!(modified);
        assert_eq!(
            d,
            doc! { "_id": 1, "name": "grace", "address": { "city": "ny" } }
        );
    }

    #[test]
    fn noop_update_is_not_modified() {
        let mut d = doc! { "_id": 1, "name": "ada" };
        let modified = apply_update(&mut d, &doc! { "$set": { "name": "ada" } }).unwrap();
        assert!(!modified);
    }

    #[test]
    fn inc() {
        let mut d = doc! { "n": 1, "f": 1.5, "big": i32::MAX };
        apply_update(
            &mut d,
            &doc! { "$inc": { "n": 2, "f": 1, "big": 1, "fresh": 5i64 } },
        )
        .unwrap();

        assert_eq!(d.get("n"), Some(&Bson::Int32(3)));
        assert_eq!(d.get("f"), Some(&Bson::Double(2.5)));
        assert_eq!(
            d.get("big"),
            Some(&Bson::Int64(i64::from(i32::MAX) + 1))
        );
        assert_eq!(d.get("fresh"), Some(&Bson::Int64(5)));
    }

    #[test]
    fn inc_overflow_is_rejected() {
        let mut d = doc! { "n": i64::MAX, "m": i32::MIN };
        let before = d.clone();

        assert_eq!(
            apply_update(&mut d, &doc! { "$inc": { "n": 1i64 } }),
            Err(Error::Overflow("n".to_owned()))
        );
        assert_eq!(
            apply_update(&mut d, &doc! { "$inc": { "n": 1 } }),
            Err(Error::Overflow("n".to_owned()))
        );
        assert_eq!(
            apply_update(&mut d, &doc! { "$inc": { "m": i64::MIN } }),
            Err(Error::Overflow("m".to_owned()))
        );
        assert_eq!(d, before);

        // stepping back from the edge is fine
        apply_update(&mut d, &doc! { "$inc": { "n": -1i64 } }).unwrap();
        assert_eq!(d.get("n"), Some(&Bson::Int64(i64::MAX - 1)));
    }

    #[test]
    fn set_inside_array() {
        let mut d = doc! { "items": [ { "qty": 1 }, { "qty": 2 } ] };
        assert!(apply_update(&mut d, &doc! { "$set": { "items.1.qty": 5 } }).unwrap());
        assert_eq!(d, doc! { "items": [ { "qty": 1 }, { "qty": 5 } ] });
    }

    #[test]
    fn inc_non_numeric() {
        let mut d = doc! { "name": "ada" };
        let before = d.clone();
        assert_eq!(
            apply_update(&mut d, &doc! { "$inc": { "name": 1 } }),
            Err(Error::NonNumeric("name".to_owned()))
        );
        assert_eq!(d, before, "failed updates leave the document untouched");
    }

    #[test]
    fn replacement_document_rejected() {
        let mut d = doc! { "name": "ada" };
        assert_eq!(
            apply_update(&mut d, &doc! { "name": "bob" }),
            Err(Error::MissingOperator("name".to_owned()))
        );
        assert_eq!(apply_update(&mut d, &doc! {}), Err(Error::EmptyUpdate));
        assert_eq!(
            apply_update(&mut d, &doc! { "$push": { "tags": "x" } }),
            Err(Error::UnknownOperator("$push".to_owned()))
        );
    }

    #[test]
    fn id_is_immutable() {
        let mut d = doc! { "_id": 1, "name": "ada" };
        assert_eq!(
            apply_update(&mut d, &doc! { "$set": { "_id": 2 } }),
            Err(Error::ImmutableId)
        );
        assert_eq!(
            apply_update(&mut d, &doc! { "$unset": { "_id": "" } }),
            Err(Error::ImmutableId)
        );
        assert!(!apply_update(&mut d, &doc! { "$set": { "_id": 1 } }).unwrap());
    }
}
