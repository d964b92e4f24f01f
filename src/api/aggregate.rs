//! Purpose: Plan and assemble a split's feature matrix from heterogeneous sources.
//! Exports: `ColumnBlock`, `MatrixPlan`, `plan_feature_matrix`, `assemble_feature_matrix`.
//! Role: Pure planning over shapes, then one read-and-copy pass over source arrays.
//! Invariants: Planning rejects every mismatched source before any data is read.
//! Invariants: Column order is source order; a source's own columns keep row-major order.
use ndarray::{Array2, ArrayD, ArrayView2, s};

use crate::core::error::{Error, ErrorKind};
use crate::core::shape::Shape;

/// Contiguous run of output columns filled by one source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnBlock {
    pub source: usize,
    pub shape: Shape,
    pub offset: usize,
    pub columns: usize,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatrixPlan {
    pub instances: usize,
    pub columns: usize,
    pub blocks: Vec<ColumnBlock>,
}

pub fn plan_feature_matrix(instances: usize, shapes: &[Shape]) -> Result<MatrixPlan, Error> {
    let mut blocks = Vec::with_capacity(shapes.len());
    let mut offset = 0usize;
    for (source, shape) in shapes.iter().enumerate() {
        let columns = shape.feature_columns(instances).ok_or_else(|| {
            Error::new(ErrorKind::ShapeMismatch).with_message(format!(
                "feature source {source} has shape {shape}, which does not fit {instances} instances"
            ))
        })?;
        blocks.push(ColumnBlock {
            source,
            shape: shape.clone(),
            offset,
            columns,
        });
        offset = offset.checked_add(columns).ok_or_else(|| {
            Error::new(ErrorKind::Usage).with_message("feature column count overflows")
        })?;
    }
    Ok(MatrixPlan {
        instances,
        columns: offset,
        blocks,
    })
}

/// Fills the planned matrix; `read` yields the array of the source at an index.
pub fn assemble_feature_matrix<F>(plan: &MatrixPlan, mut read: F) -> Result<Array2<f64>, Error>
where
    F: FnMut(usize) -> Result<ArrayD<f64>, Error>,
{
    let mut matrix = Array2::<f64>::zeros((plan.instances, plan.columns));
    for block in &plan.blocks {
        let array = read(block.source)?;
        if array.shape() != block.shape.dims() {
            return Err(Error::new(ErrorKind::ShapeMismatch).with_message(format!(
                "feature source {} changed shape from {} to {} while reading",
                block.source,
                block.shape,
                Shape::new(array.shape())
            )));
        }
        let data = array.iter().copied().collect::<Vec<_>>();
        let view = ArrayView2::from_shape((plan.instances, block.columns), &data)
            .map_err(|err| Error::new(ErrorKind::Internal).with_source(err))?;
        matrix
            .slice_mut(s![.., block.offset..block.offset + block.columns])
            .assign(&view);
    }
    Ok(matrix)
}
