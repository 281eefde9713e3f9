use crate::error::{Result, TensorError};
use std::fmt;

/// Axis carrying time in every batched tensor: `[batch, time, features...]`.
pub const TIME_AXIS: usize = 1;

/// A tensor shape, wrapping a vector of dimension sizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Create a new shape from a vector of dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// Create a shape from a slice of dimensions.
    pub fn from_slice(dims: &[usize]) -> Self {
        Shape {
            dims: dims.to_vec(),
        }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements (product of all dimension sizes).
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the size of dimension `i`.
    ///
    /// # Panics
    /// Panics if `i >= ndim()`.
    pub fn dim(&self, i: usize) -> usize {
        self.dims[i]
    }

    /// Returns a reference to the underlying dimension sizes.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Length of the time axis, if the shape has one.
    pub fn time_len(&self) -> Option<usize> {
        self.dims.get(TIME_AXIS).copied()
    }

    /// Checks that `axis` is a valid dimension index.
    pub fn check_axis(&self, axis: usize) -> Result<()> {
        if axis >= self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis,
                ndim: self.ndim(),
            });
        }
        Ok(())
    }

    /// Returns a copy of this shape with dimension `axis` replaced by `size`.
    pub fn with_dim(&self, axis: usize, size: usize) -> Result<Shape> {
        self.check_axis(axis)?;
        let mut dims = self.dims.clone();
        dims[axis] = size;
        Ok(Shape::new(dims))
    }

    /// Returns a copy of this shape with a unit dimension inserted at `axis`.
    pub fn insert_unit(&self, axis: usize) -> Result<Shape> {
        if axis > self.ndim() {
            return Err(TensorError::InvalidAxis {
                axis,
                ndim: self.ndim(),
            });
        }
        let mut dims = self.dims.clone();
        dims.insert(axis, 1);
        Ok(Shape::new(dims))
    }

    /// Splits the row-major layout around `axis`.
    ///
    /// Returns `(outer, size, inner)` where `outer` is the product of the
    /// dimensions before `axis` and `inner` the product of those after it.
    /// Any contiguous tensor is then `outer` blocks of `size * inner` values.
    pub fn split_at_axis(&self, axis: usize) -> Result<(usize, usize, usize)> {
        self.check_axis(axis)?;
        let outer = self.dims[..axis].iter().product();
        let inner = self.dims[axis + 1..].iter().product();
        Ok((outer, self.dims[axis], inner))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::from_slice(dims)
    }
}
