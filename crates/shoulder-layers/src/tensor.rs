#![allow(clippy::needless_range_loop)]
//! Tensor type for layer computations.
//!
//! [`Tensor`] is a dense, row-major `f32` array with an explicit shape. It is
//! the single numeric currency of the crate: token matrices, embeddings,
//! parameters and gradients are all tensors, and the whole parameter tree
//! serializes through it.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// A multi-dimensional array for layer computations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    /// The shape of the tensor (dimensions)
    shape: Vec<usize>,
    /// The underlying data in row-major order
    #[serde(with = "float_data")]
    data: Vec<f32>,
}

/// Serde adapter for tensor data.
///
/// JSON has no literal for NaN or infinities, so in human-readable formats
/// those elements are written as the strings `"NaN"`, `"inf"` and `"-inf"`.
/// Binary formats carry the raw `f32` values.
mod float_data {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Element {
        Number(f32),
        Special(String),
    }

    pub fn serialize<S: Serializer>(data: &[f32], serializer: S) -> Result<S::Ok, S::Error> {
        if !serializer.is_human_readable() {
            return data.serialize(serializer);
        }
        serializer.collect_seq(data.iter().map(|&x| {
            if x.is_nan() {
                Element::Special("NaN".into())
            } else if x == f32::INFINITY {
                Element::Special("inf".into())
            } else if x == f32::NEG_INFINITY {
                Element::Special("-inf".into())
            } else {
                Element::Number(x)
            }
        }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f32>, D::Error> {
        if !deserializer.is_human_readable() {
            return Vec::<f32>::deserialize(deserializer);
        }
        Vec::<Element>::deserialize(deserializer)?
            .into_iter()
            .map(|element| match element {
                Element::Number(x) => Ok(x),
                Element::Special(name) => match name.as_str() {
                    "NaN" => Ok(f32::NAN),
                    "inf" => Ok(f32::INFINITY),
                    "-inf" => Ok(f32::NEG_INFINITY),
                    other => Err(D::Error::custom(format!("invalid tensor element {other:?}"))),
                },
            })
            .collect()
    }
}

impl Tensor {
    /// Creates a new tensor with the given shape, filled with zeros.
    ///
    /// # Example
    ///
    /// ```
    /// use shoulder_layers::tensor::Tensor;
    ///
    /// let t = Tensor::zeros(&[2, 3]);
    /// assert_eq!(t.shape(), &[2, 3]);
    /// assert_eq!(t.numel(), 6);
    /// ```
    pub fn zeros(shape: &[usize]) -> Self {
        let numel: usize = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            data: vec![0.0; numel],
        }
    }

    /// Creates a new tensor with the given shape, filled with ones.
    pub fn ones(shape: &[usize]) -> Self {
        let numel: usize = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            data: vec![1.0; numel],
        }
    }

    /// Creates a new tensor with the given shape and data.
    ///
    /// # Panics
    ///
    /// Panics if the data length doesn't match the shape
    pub fn from_data(shape: &[usize], data: Vec<f32>) -> Self {
        let numel: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            numel,
            "Data length {} doesn't match shape {:?} (expected {})",
            data.len(),
            shape,
            numel
        );
        Self {
            shape: shape.to_vec(),
            data,
        }
    }

    /// Builds a 2D tensor from equally long rows.
    ///
    /// # Panics
    ///
    /// Panics if the rows have different lengths.
    pub fn from_rows(rows: &[Vec<f32>]) -> Self {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            assert_eq!(row.len(), cols, "All rows must have the same length");
            data.extend_from_slice(row);
        }
        Self::from_data(&[rows.len(), cols], data)
    }

    /// Returns the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Returns the total number of elements.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Number of rows of a 2D tensor.
    pub fn rows(&self) -> usize {
        assert_eq!(self.ndim(), 2, "rows requires a 2D tensor");
        self.shape[0]
    }

    /// Number of columns of a 2D tensor.
    pub fn cols(&self) -> usize {
        assert_eq!(self.ndim(), 2, "cols requires a 2D tensor");
        self.shape[1]
    }

    /// Returns a reference to the underlying data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns a mutable reference to the underlying data.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the tensor and returns its data.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Returns row `i` of a 2D tensor.
    pub fn row(&self, i: usize) -> &[f32] {
        let n = self.cols();
        &self.data[i * n..(i + 1) * n]
    }

    /// Gathers the given rows of a 2D tensor into a new tensor, in order.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    pub fn select_rows(&self, indices: &[usize]) -> Tensor {
        let n = self.cols();
        let mut data = Vec::with_capacity(indices.len() * n);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Tensor::from_data(&[indices.len(), n], data)
    }

    /// Matrix multiplication between two 2D tensors.
    ///
    /// # Panics
    ///
    /// Panics if the inner dimensions don't match
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.ndim(), 2, "matmul requires 2D tensors");
        assert_eq!(other.ndim(), 2, "matmul requires 2D tensors");
        assert_eq!(
            self.shape[1], other.shape[0],
            "Inner dimensions must match for matmul"
        );

        let (m, n) = (self.shape[0], other.shape[1]);
        let a = ArrayView2::from_shape((m, self.shape[1]), &self.data)
            .expect("lhs shape validated above");
        let b = ArrayView2::from_shape((other.shape[0], n), &other.data)
            .expect("rhs shape validated above");
        let product = a.dot(&b);
        Tensor::from_data(&[m, n], product.iter().copied().collect())
    }

    /// Transposes a 2D tensor.
    pub fn transpose(&self) -> Tensor {
        assert_eq!(self.ndim(), 2, "transpose requires 2D tensor");
        let m = self.shape[0];
        let n = self.shape[1];

        let mut result = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                result[j * m + i] = self.data[i * n + j];
            }
        }

        Tensor::from_data(&[n, m], result)
    }

    /// Element-wise addition with broadcasting.
    ///
    /// Supports equal shapes, a single-element `other` (scalar broadcast),
    /// and a 1D `other` added to every row of a 2D tensor (bias addition).
    pub fn add(&self, other: &Tensor) -> Tensor {
        if self.shape == other.shape {
            self.zip_with(other, |a, b| a + b)
        } else if other.numel() == 1 {
            let scalar = other.data[0];
            self.map(|a| a + scalar)
        } else if self.ndim() == 2 && other.ndim() == 1 && self.shape[1] == other.shape[0] {
            let mut data = self.data.clone();
            let n = self.shape[1];
            for i in 0..self.shape[0] {
                for j in 0..n {
                    data[i * n + j] += other.data[j];
                }
            }
            Tensor::from_data(&self.shape, data)
        } else {
            panic!(
                "Cannot broadcast shapes {:?} and {:?}",
                self.shape, other.shape
            );
        }
    }

    /// Element-wise subtraction of an equally shaped tensor.
    pub fn sub(&self, other: &Tensor) -> Tensor {
        assert_eq!(
            self.shape, other.shape,
            "Cannot subtract shapes {:?} and {:?}",
            self.shape, other.shape
        );
        self.zip_with(other, |a, b| a - b)
    }

    /// Element-wise multiplication.
    pub fn mul(&self, other: &Tensor) -> Tensor {
        if self.shape == other.shape {
            self.zip_with(other, |a, b| a * b)
        } else if other.numel() == 1 {
            let scalar = other.data[0];
            self.map(|a| a * scalar)
        } else {
            panic!(
                "Cannot multiply shapes {:?} and {:?}",
                self.shape, other.shape
            );
        }
    }

    /// Scalar multiplication.
    pub fn scale(&self, scalar: f32) -> Tensor {
        self.map(|a| a * scalar)
    }

    /// Element-wise square.
    pub fn sqr(&self) -> Tensor {
        self.map(|a| a * a)
    }

    /// Sum all elements in the tensor.
    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }

    /// Mean of all elements, `0.0` for an empty tensor.
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            0.0
        } else {
            self.sum() / self.numel() as f32
        }
    }

    /// Sum along an axis of a 2D tensor.
    ///
    /// Axis 0 collapses rows into shape `[n]`; axis 1 collapses columns into
    /// shape `[m]`.
    pub fn sum_axis(&self, axis: usize) -> Tensor {
        assert_eq!(self.ndim(), 2, "sum_axis only implemented for 2D tensors");
        assert!(axis < 2, "Axis out of bounds");

        let (m, n) = (self.shape[0], self.shape[1]);
        if axis == 0 {
            let mut result = vec![0.0; n];
            for i in 0..m {
                for j in 0..n {
                    result[j] += self.data[i * n + j];
                }
            }
            Tensor::from_data(&[n], result)
        } else {
            let result: Vec<f32> = (0..m)
                .map(|i| self.data[i * n..(i + 1) * n].iter().sum())
                .collect();
            Tensor::from_data(&[m], result)
        }
    }

    /// Apply a function element-wise.
    pub fn map<F>(&self, f: F) -> Tensor
    where
        F: Fn(f32) -> f32,
    {
        let data: Vec<f32> = self.data.iter().map(|&x| f(x)).collect();
        Tensor::from_data(&self.shape, data)
    }

    /// Combine two equally shaped tensors element-wise.
    pub fn zip_with<F>(&self, other: &Tensor, f: F) -> Tensor
    where
        F: Fn(f32, f32) -> f32,
    {
        assert_eq!(self.shape, other.shape, "zip_with requires equal shapes");
        let data: Vec<f32> = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Tensor::from_data(&self.shape, data)
    }

    /// Reshape the tensor to a new shape.
    ///
    /// # Panics
    ///
    /// Panics if the new shape has a different number of elements
    pub fn reshape(&self, new_shape: &[usize]) -> Tensor {
        let new_numel: usize = new_shape.iter().product();
        assert_eq!(
            self.numel(),
            new_numel,
            "Cannot reshape tensor of {} elements to shape {:?}",
            self.numel(),
            new_shape
        );
        Tensor::from_data(new_shape, self.data.clone())
    }

    /// Returns true when every element is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}

impl std::ops::Add for &Tensor {
    type Output = Tensor;

    fn add(self, other: &Tensor) -> Tensor {
        Tensor::add(self, other)
    }
}

impl std::ops::Mul for &Tensor {
    type Output = Tensor;

    fn mul(self, other: &Tensor) -> Tensor {
        Tensor::mul(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_creation() {
        let t = Tensor::zeros(&[2, 3]);
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.numel(), 6);
        assert!(t.data().iter().all(|&x| x == 0.0));

        let t = Tensor::ones(&[3, 2]);
        assert!(t.data().iter().all(|&x| x == 1.0));
    }

    #[test]
    fn test_from_rows() {
        let t = Tensor::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(t.row(1), &[3.0, 4.0]);
    }

    #[test]
    fn test_matmul() {
        let a = Tensor::from_data(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = Tensor::from_data(&[3, 2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let c = a.matmul(&b);
        assert_eq!(c.shape(), &[2, 2]);
        assert_eq!(c.data(), &[22.0, 28.0, 49.0, 64.0]);
    }

    #[test]
    fn test_transpose() {
        let a = Tensor::from_data(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = a.transpose();
        assert_eq!(b.shape(), &[3, 2]);
        assert_eq!(b.data(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_add_broadcast() {
        let a = Tensor::from_data(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = Tensor::from_data(&[3], vec![10.0, 20.0, 30.0]);
        let c = a.add(&b);
        assert_eq!(c.data(), &[11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);

        let d = a.add(&Tensor::from_data(&[1], vec![1.0]));
        assert_eq!(d.data()[0], 2.0);
    }

    #[test]
    fn test_sum_axis() {
        let a = Tensor::from_data(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(a.sum_axis(0).data(), &[5.0, 7.0, 9.0]);
        assert_eq!(a.sum_axis(1).data(), &[6.0, 15.0]);
        assert!((a.mean() - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_select_rows() {
        let a = Tensor::from_data(&[3, 2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let picked = a.select_rows(&[2, 0]);
        assert_eq!(picked.shape(), &[2, 2]);
        assert_eq!(picked.data(), &[5.0, 6.0, 1.0, 2.0]);
    }

    #[test]
    fn test_serde_keeps_shape() {
        let a = Tensor::from_data(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]);
        let json = serde_json::to_string(&a).unwrap();
        let back: Tensor = serde_json::from_str(&json).unwrap();
        assert_eq!(a, back);
    }

    #[test]
    #[should_panic(expected = "Inner dimensions")]
    fn test_matmul_mismatch_panics() {
        Tensor::zeros(&[2, 3]).matmul(&Tensor::zeros(&[2, 3]));
    }

    #[test]
    fn test_non_finite_values_survive_json() {
        let t = Tensor::from_data(&[2, 2], vec![1.5, f32::NAN, f32::INFINITY, f32::NEG_INFINITY]);
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains(r#"[1.5,"NaN","inf","-inf"]"#));

        let back: Tensor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.shape(), &[2, 2]);
        assert_eq!(back.data()[0], 1.5);
        assert!(back.data()[1].is_nan());
        assert_eq!(back.data()[2], f32::INFINITY);
        assert_eq!(back.data()[3], f32::NEG_INFINITY);

        let bad = r#"{"shape":[1],"data":["huge"]}"#;
        assert!(serde_json::from_str::<Tensor>(bad).is_err());
    }
}
