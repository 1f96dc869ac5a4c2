use mongodb::bson::{Bson, Document};

use super::Error;

/// Resolves a dotted path (`a.b.0.c`) inside a document.
///
/// Numeric segments index into arrays, any other traversal through a
/// non-container yields [`None`].
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    // `split` always yields at least one item
    let mut current = doc.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Largest array index a write may pad up to.
const MAX_ARRAY_INDEX: usize = 1_500_000;

/// Sets `value` at `path`, creating intermediate documents as needed.
///
/// Numeric segments address array elements. Writing past the end pads the
/// array with nulls.
pub fn set(doc: &mut Document, path: &str, value: Bson) -> Result<(), Error> {
    set_in_document(doc, path, value, path)
}

fn set_in_document(
    doc: &mut Document,
    path: &str,
    value: Bson,
    full: &str,
) -> Result<(), Error> {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            let child = doc
                .entry(head.to_owned())
                .or_insert_with(|| Bson::Document(Document::new()));
            set_in_value(child, rest, value, full)
        }
    }
}

fn set_in_value(node: &mut Bson, path: &str, value: Bson, full: &str) -> Result<(), Error> {
    match node {
        Bson::Document(inner) => set_in_document(inner, path, value, full),
        Bson::Array(items) => set_in_array(items, path, value, full),
        _ => Err(Error::PathConflict(full.to_owned())),
    }
}

fn set_in_array(
    items: &mut Vec<Bson>,
    path: &str,
    value: Bson,
    full: &str,
) -> Result<(), Error> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    let index = head
        .parse::<usize>()
        .ok()
        .filter(|index| *index <= MAX_ARRAY_INDEX)
        .ok_or_else(|| Error::PathConflict(full.to_owned()))?;

    let padded = index >= items.len();
    if padded {
        items.resize(index + 1, Bson::Null);
    }
    let slot = &mut items[index];

    match rest {
        None => {
            *slot = value;
            Ok(())
        }
        Some(rest) => {
            if padded {
                *slot = Bson::Document(Document::new());
            }
            set_in_value(slot, rest, value, full)
        }
    }
}

/// Removes the value at `path`, returns it if it was present.
///
/// Array elements are not shifted, a removed element becomes null.
pub fn remove(doc: &mut Document, path: &str) -> Option<Bson> {
    match path.split_once('.') {
        None => doc.remove(path),
        Some((head, rest)) => remove_in_value(doc.get_mut(head)?, rest),
    }
}

fn remove_in_value(node: &mut Bson, path: &str) -> Option<Bson> {
    match node {
        Bson::Document(inner) => remove(inner, path),
        Bson::Array(items) => {
            let (head, rest) = match path.split_once('.') {
                Some((head, rest)) => (head, Some(rest)),
                None => (path, None),
            };
            let slot = items.get_mut(head.parse::<usize>().ok()?)?;
            match rest {
                None => Some(std::mem::replace(slot, Bson::Null)),
                Some(rest) => remove_in_value(slot, rest),
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn lookup_nested() {
        let d = doc! { "a": { "b": [ { "c": 1 }, { "c": 2 } ] }, "x": 5 };

        assert_eq!(lookup(&d, "x"), Some(&Bson::Int32(5)));
        assert_eq!(lookup(&d, "a.b.1.c"), Some(&Bson::Int32(2)));
        assert_eq!(lookup(&d, "a.b.7.c"), None);
        assert_eq!(lookup(&d, "x.y"), None);
        assert_eq!(lookup(&d, "missing"), None);
    }

    #[test]
    fn set_creates_parents() {
        let mut d = doc! { "a": 1 };
        set(&mut d, "b.c.d", Bson::Boolean(true)).unwrap();
        assert_eq!(d, doc! { "a": 1, "b": { "c": { "d": true } } });

        assert_eq!(
            set(&mut d, "a.z", Bson::Null),
            Err(Error::PathConflict("a.z".to_owned()))
        );
    }

    #[test]
    fn set_through_arrays() {
        let mut d = doc! { "a": [ { "b": 1 }, { "b": 2 } ], "n": [1] };

        set(&mut d, "a.0.b", Bson::Int32(5)).unwrap();
        set(&mut d, "n.3", Bson::Int32(4)).unwrap();
        set(&mut d, "a.2.c", Bson::Boolean(true)).unwrap();

        assert_eq!(
            d,
            doc! {
                "a": [ { "b": 5 }, { "b": 2 }, { "c": true } ],
                "n": [1, null, null, 4],
            }
        );

        assert_eq!(
            set(&mut d, "a.x", Bson::Null),
            Err(Error::PathConflict("a.x".to_owned()))
        );
        assert_eq!(
            set(&mut d, "n.1.z", Bson::Null),
            Err(Error::PathConflict("n.1.z".to_owned()))
        );
    }

    #[test]
    fn remove_array_element_leaves_null() {
        let mut d = doc! { "a": [ { "b": 1, "c": 2 }, 7 ] };
        assert_eq!(remove(&mut d, "a.0.b"), Some(Bson::Int32(1)));
        assert_eq!(remove(&mut d, "a.1"), Some(Bson::Int32(7)));
        assert_eq!(remove(&mut d, "a.5"), None);
        assert_eq!(d, doc! { "a": [ { "c": 2 }, null ] });
    }

    #[test]
    fn remove_nested() {
        let mut d = doc! { "a": { "b": 1, "c": 2 } };
        assert_eq!(remove(&mut d, "a.b"), Some(Bson::Int32(1)));
        assert_eq!(remove(&mut d, "a.b"), None);
        assert_eq!(d, doc! { "a": { "c": 2 } });
    }
}
