use mongodb::bson::{Bson, Document};

use super::{Error, order::as_f64, path};

const ID_FIELD: &str = "_id";

fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        other => as_f64(other).is_none_or(|n| n != 0.0),
    }
}

/// Shapes `doc` according to `projection`.
///
/// `{ "secret": 0 }` removes fields, `{ "name": 1 }` keeps only the listed
/// fields (plus `_id` unless explicitly excluded). An empty projection returns
/// the document unchanged.
pub fn project(doc: &Document, projection: &Document) -> Result<Document, Error> {
    if projection.is_empty() {
        return Ok(doc.clone());
    }

    let mut include_id = true;
    let mut included: Vec<&str> = Vec::new();
    let mut excluded: Vec<&str> = Vec::new();

    for (field, flag) in projection {
        let keep = is_truthy(flag);
        if field == ID_FIELD {
            include_id = keep;
        } else if keep {
            included.push(field);
        } else {
            excluded.push(field);
        }
    }

    if !included.is_empty() && !excluded.is_empty() {
        return Err(Error::MixedProjection);
    }

    if included.is_empty() {
        let mut out = doc.clone();
        for field in excluded {
            path::remove(&mut out, field);
        }
        if !include_id {
            out.remove(ID_FIELD);
        }
        return Ok(out);
    }

    let mut out = Document::new();
    if let Some(id) = doc.get(ID_FIELD).filter(|_| include_id) {
        out.insert(ID_FIELD, id.clone());
    }
    for field in included {
        if let Some(value) = path::lookup(doc, field) {
            path::set(&mut out, field, value.clone())?;
        }
    }

    Ok(out)
}
