use std::cmp::Ordering;

use mongodb::bson::{Bson, Document};

use super::{
    Error,
    order::{compare, type_rank},
    path,
};

/// Returns `true` when `doc` satisfies every clause of `filter`.
///
/// An empty filter matches every document.
pub fn matches(doc: &Document, filter: &Document) -> Result<bool, Error> {
    for (key, cond) in filter {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for sub in sub_filters(key, cond)? {
                    if !matches(doc, sub)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for sub in sub_filters(key, cond)? {
                    if matches(doc, sub)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$nor" => {
                let mut none = true;
                for sub in sub_filters(key, cond)? {
                    if matches(doc, sub)? {
                        none = false;
                        break;
                    }
                }
                none
            }
            op if op.starts_with('$') => return Err(Error::UnknownOperator(op.to_owned())),
            field => field_matches(path::lookup(doc, field), cond)?,
        };

        if !ok {
            return Ok(false);
        }
    }

    Ok(true)
}

fn sub_filters<'a>(op: &str, cond: &'a Bson) -> Result<Vec<&'a Document>, Error> {
    let bad_operand = || Error::BadOperand {
        op: op.to_owned(),
        expected: "a non-empty array of documents",
    };

    let Bson::Array(items) = cond else {
        return Err(bad_operand());
    };
    if items.is_empty() {
        return Err(bad_operand());
    }

    items
        .iter()
        .map(|item| item.as_document().ok_or_else(bad_operand))
        .collect()
}

/// An operator document is a document whose keys all start with `$`.
fn as_operator_doc(cond: &Bson) -> Option<&Document> {
    match cond {
        Bson::Document(d) if !d.is_empty() && d.keys().all(|k| k.starts_with('$')) => Some(d),
        _ => None,
    }
}

fn field_matches(value: Option<&Bson>, cond: &Bson) -> Result<bool, Error> {
    let Some(ops) = as_operator_doc(cond) else {
        return Ok(equals(value, cond));
    };

    for (op, operand) in ops {
        let ok = match op.as_str() {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$gt" => compares(value, operand, |o| o == Ordering::Greater),
            "$gte" => compares(value, operand, |o| o != Ordering::Less),
            "$lt" => compares(value, operand, |o| o == Ordering::Less),
            "$lte" => compares(value, operand, |o| o != Ordering::Greater),
            "$in" => in_list(op, value, operand)?,
            "$nin" => !in_list(op, value, operand)?,
            "$exists" => {
                let wanted = match operand {
                    Bson::Boolean(b) => *b,
                    other => super::order::as_f64(other).is_some_and(|n| n != 0.0),
                };
                value.is_some() == wanted
            }
            other => return Err(Error::UnknownOperator(other.to_owned())),
        };

        if !ok {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Equality with array fan-out: an array field matches when either the whole
/// array or one of its elements equals the expected value. A missing field
/// equals null.
fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    let value = value.unwrap_or(&Bson::Null);

    if compare(value, expected) == Ordering::Equal {
        return true;
    }

    match value {
        Bson::Array(items) => items
            .iter()
            .any(|item| compare(item, expected) == Ordering::Equal),
        _ => false,
    }
}

/// Range comparison only matches values in the same type bracket as the operand.
fn compares<F>(value: Option<&Bson>, operand: &Bson, pred: F) -> bool
where
    F: Fn(Ordering) -> bool,
{
    let Some(value) = value else {
        return false;
    };

    let check = |v: &Bson| type_rank(v) == type_rank(operand) && pred(compare(v, operand));

    match value {
        Bson::Array(items) if type_rank(operand) != type_rank(value) => items.iter().any(check),
        _ => check(value),
    }
}

fn in_list(op: &str, value: Option<&Bson>, operand: &Bson) -> Result<bool, Error> {
    let Bson::Array(candidates) = operand else {
        return Err(Error::BadOperand {
            op: op.to_owned(),
            expected: "an array",
        });
    };

    Ok(candidates.iter().any(|c| equals(value, c)))
}
