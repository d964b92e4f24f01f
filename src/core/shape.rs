//! Purpose: Dataset shape value and the instance/feature arithmetic built on it.
//! Exports: `Shape`.
//! Role: Pure helpers used by slot admission and feature aggregation.
//! Invariants: The instance count of a shape is its leading dimension (1 for scalars).
//! Invariants: Feature classification checks the total-count rule before the leading-dim rule.
//! Invariants: A slot source matches a baseline on equal leading dimension or equal total count.
use std::fmt;

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn new(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn instance_count(&self) -> usize {
        self.0.first().copied().unwrap_or(1)
    }

    pub fn element_count(&self) -> usize {
        self.0.iter().product()
    }

    /// Columns this shape contributes to a feature matrix with `instances` rows.
    ///
    /// A source whose total element count equals `instances` is one feature per
    /// instance. Otherwise its leading dimension must equal `instances` and the
    /// trailing dimensions are flattened into columns.
    pub fn feature_columns(&self, instances: usize) -> Option<usize> {
        if self.element_count() == instances {
            return Some(1);
        }
        if self.rank() > 0 && self.instance_count() == instances {
            return Some(self.0[1..].iter().product());
        }
        None
    }

    /// Whether a slot source with this shape fits a split's `baseline`.
    ///
    /// The leading dimensions agree, or both hold the same number of elements
    /// (a flat `(1000,)` label volume fits a `(10, 10, 10)` baseline).
    pub fn matches_baseline(&self, baseline: &Shape) -> bool {
        self.instance_count() == baseline.instance_count()
            || self.element_count() == baseline.element_count()
    }

    pub fn to_u64s(&self) -> Vec<u64> {
        self.0.iter().map(|&dim| dim as u64).collect()
    }

    pub fn from_u64s(values: &[u64]) -> Option<Self> {
        values
            .iter()
            .map(|&value| usize::try_from(value).ok())
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, dim) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{dim}")?;
        }
        if self.0.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::Shape;

    #[test]
    fn counts_follow_leading_and_product() {
        let shape = Shape::new(&[10, 10, 10]);
        assert_eq!(shape.instance_count(), 10);
        assert_eq!(shape.element_count(), 1000);

        let scalar = Shape::default();
        assert_eq!(scalar.instance_count(), 1);
        assert_eq!(scalar.element_count(), 1);
    }

    #[test]
    fn feature_columns_classifies_sources() {
        assert_eq!(Shape::new(&[1000]).feature_columns(1000), Some(1));
        assert_eq!(Shape::new(&[1000, 3]).feature_columns(1000), Some(3));
        assert_eq!(Shape::new(&[10, 10, 10]).feature_columns(1000), Some(1));
        assert_eq!(Shape::new(&[10, 4, 5]).feature_columns(10), Some(20));
        assert_eq!(Shape::new(&[999]).feature_columns(1000), None);
        assert_eq!(Shape::new(&[1000, 1]).feature_columns(1000), Some(1));
    }

    #[test]
    fn baseline_match_accepts_leading_or_total_count() {
        let baseline = Shape::new(&[10, 10, 10]);
        assert!(Shape::new(&[10, 4]).matches_baseline(&baseline));
        assert!(Shape::new(&[1000]).matches_baseline(&baseline));
        assert!(Shape::new(&[100, 10]).matches_baseline(&baseline));
        assert!(!Shape::new(&[999]).matches_baseline(&baseline));
        assert!(!Shape::new(&[20, 5]).matches_baseline(&baseline));
    }

    #[test]
    fn u64_conversion_keeps_dims() {
        let shape = Shape::new(&[3, 4]);
        assert_eq!(Shape::from_u64s(&shape.to_u64s()), Some(shape));
    }

    #[test]
    fn display_matches_tuple_notation() {
        assert_eq!(Shape::new(&[5]).to_string(), "(5,)");
        assert_eq!(Shape::new(&[2, 3]).to_string(), "(2, 3)");
        assert_eq!(Shape::default().to_string(), "()");
    }
}
