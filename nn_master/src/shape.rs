use std::fmt;

use serde::{Deserialize, Serialize};

/// The per-sample shape of some data, without the batch axis.
///
/// Displayed as a tuple, `(a, b)`, or as a bare number when it has a single dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Self(dims)
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// The amount of scalar values a sample of this shape holds.
    pub fn size(&self) -> usize {
        self.0.iter().product()
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [d] = self.0.as_slice() {
            return write!(f, "{d}");
        }

        let dims: Vec<String> = self.0.iter().map(usize::to_string).collect();
        write!(f, "({})", dims.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_like_a_tuple() {
        assert_eq!(Shape::new(vec![7, 1]).to_string(), "(7, 1)");
        assert_eq!(Shape::new(vec![2, 3, 4]).to_string(), "(2, 3, 4)");
        assert_eq!(Shape::new(vec![5]).to_string(), "5");
    }

    #[test]
    fn size_is_the_product_of_dims() {
        assert_eq!(Shape::new(vec![2, 3, 4]).size(), 24);
        assert_eq!(Shape::new(vec![]).size(), 1);
    }
}
