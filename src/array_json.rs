//! Purpose: Convert between nested JSON number arrays and n-dimensional `f64` arrays.
//! Exports: `array_from_json`, `array_json`.
//! Role: CLI-side codec for `tpd put` input and `--data` output.
//! Invariants: Input must be rectangular; every leaf sits at the same depth and is a number.
//! Invariants: Output nesting follows row-major order, matching container storage.

use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};
use serde_json::Value;
use tpd::api::{Error, ErrorKind};

pub(crate) fn array_from_json(value: &Value) -> Result<ArrayD<f64>, Error> {
    let mut shape = Vec::new();
    let mut cursor = value;
    while let Value::Array(items) = cursor {
        shape.push(items.len());
        match items.first() {
            Some(first) => cursor = first,
            None => break,
        }
    }

    let mut data = Vec::with_capacity(shape.iter().product());
    flatten(value, &shape, 0, &mut data)?;
    ArrayD::from_shape_vec(IxDyn(&shape), data)
        .map_err(|err| Error::new(ErrorKind::Internal).with_source(err))
}

fn flatten(value: &Value, shape: &[usize], depth: usize, out: &mut Vec<f64>) -> Result<(), Error> {
    if depth == shape.len() {
        let number = value.as_f64().ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("expected a number at depth {depth}, found {value}"))
        })?;
        out.push(number);
        return Ok(());
    }
    let items = value.as_array().ok_or_else(|| ragged(depth))?;
    if items.len() != shape[depth] {
        return Err(ragged(depth));
    }
    for item in items {
        flatten(item, shape, depth + 1, out)?;
    }
    Ok(())
}

fn ragged(depth: usize) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message(format!("JSON array is not rectangular at depth {depth}"))
        .with_hint("Every nested list at the same depth must have the same length.")
}

pub(crate) fn array_json(view: ArrayViewD<'_, f64>) -> Value {
    if view.ndim() == 0 {
        return view.iter().next().map_or(Value::Null, |&value| Value::from(value));
    }
    Value::Array(view.axis_iter(Axis(0)).map(array_json).collect())
}

#[cfg(test)]
mod tests {
    use super::{array_from_json, array_json};
    use serde_json::json;
    use tpd::api::ErrorKind;

    #[test]
    fn nested_lists_become_row_major_arrays() {
        let array = array_from_json(&json!([[1, 2, 3], [4, 5, 6]])).expect("array");
        assert_eq!(array.shape(), &[2, 3]);
        assert_eq!(
            array.iter().copied().collect::<Vec<_>>(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
        assert_eq!(array_json(array.view()), json!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]));
    }

    #[test]
    fn scalars_and_empty_lists_are_accepted() {
        let scalar = array_from_json(&json!(2.5)).expect("scalar");
        assert_eq!(scalar.ndim(), 0);
        assert_eq!(array_json(scalar.view()), json!(2.5));

        let empty = array_from_json(&json!([])).expect("empty");
        assert_eq!(empty.shape(), &[0]);
    }

    #[test]
    fn ragged_and_non_numeric_input_is_usage_error() {
        let err = array_from_json(&json!([[1, 2], [3]])).expect_err("ragged");
        assert_eq!(err.kind(), ErrorKind::Usage);

        let err = array_from_json(&json!([1, "two"])).expect_err("text");
        assert_eq!(err.kind(), ErrorKind::Usage);

        let err = array_from_json(&json!([[1], 2])).expect_err("mixed depth");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
