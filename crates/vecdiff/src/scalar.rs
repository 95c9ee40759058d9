//! Scalar trait for vector element types.

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use faer_traits::RealField;
use num_traits::Float;

use crate::error::DiffError;
use crate::random::{RandomNormal, RandomUniform};

/// Floating-point representation of a vector's components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F64,
}

impl DType {
    /// Default gradient-check precision for this representation.
    pub fn default_prec(self) -> f64 {
        match self {
            DType::F32 => 1e-3,
            DType::F64 => 1e-5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
        }
    }
}

impl Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = DiffError;

    /// # Example
    ///
    /// ```
    /// use vecdiff::DType;
    ///
    /// assert_eq!("float32".parse::<DType>().unwrap(), DType::F32);
    /// assert!("f16".parse::<DType>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "f32" | "float32" => Ok(DType::F32),
            "f64" | "float64" => Ok(DType::F64),
            other => Err(DiffError::UnsupportedScalar(other.to_string())),
        }
    }
}

/// Trait for scalar types supported by vecdiff.
///
/// This combines faer's `RealField` (needed for GEMM) with
/// `num_traits::Float` for the elementwise math.
pub trait Scalar:
    RealField + Float + Copy + Debug + Display + Default + RandomUniform + RandomNormal + 'static
{
    /// Representation tag.
    const DTYPE: DType;

    /// Convert from an `f64` literal, rounding if needed.
    fn from_f64(x: f64) -> Self;

    /// Widen to `f64`.
    fn as_f64(self) -> f64;
}

impl Scalar for f32 {
    const DTYPE: DType = DType::F32;

    fn from_f64(x: f64) -> Self {
        x as f32
    }

    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Scalar for f64 {
    const DTYPE: DType = DType::F64;

    fn from_f64(x: f64) -> Self {
        x
    }

    fn as_f64(self) -> f64 {
        self
    }
}

/// Flat serialized form of a vector.
#[derive(Debug, Clone, PartialEq)]
pub enum FlatData {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl FlatData {
    pub fn dtype(&self) -> DType {
        match self {
            FlatData::F32(_) => DType::F32,
            FlatData::F64(_) => DType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FlatData::F32(v) => v.len(),
            FlatData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Components widened to `f64`.
    pub fn to_f64s(&self) -> Vec<f64> {
        match self {
            FlatData::F32(v) => v.iter().map(|&x| x as f64).collect(),
            FlatData::F64(v) => v.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_tags() {
        assert_eq!(<f32 as Scalar>::DTYPE, DType::F32);
        assert_eq!(<f64 as Scalar>::DTYPE, DType::F64);
    }

    #[test]
    fn test_default_prec() {
        assert_eq!(DType::F32.default_prec(), 1e-3);
        assert_eq!(DType::F64.default_prec(), 1e-5);
    }

    #[test]
    fn test_parse_dtype() {
        assert_eq!("f64".parse::<DType>().unwrap(), DType::F64);
        assert_eq!("float64".parse::<DType>().unwrap(), DType::F64);
        let err = "bf16".parse::<DType>().unwrap_err();
        assert_eq!(err, DiffError::UnsupportedScalar("bf16".to_string()));
        assert!(err.to_string().contains("bf16"));
    }

    #[test]
    fn test_flat_data() {
        let flat = FlatData::F32(vec![1.0, 2.5]);
        assert_eq!(flat.dtype(), DType::F32);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat.to_f64s(), vec![1.0, 2.5]);
    }

    #[test]
    fn test_literal_round_trip() {
        assert_eq!(f32::from_f64(0.5).as_f64(), 0.5);
        assert_eq!(f64::from_f64(-3.25), -3.25);
    }
}
