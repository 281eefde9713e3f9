use std::fmt;

/// Element types a prompt array may arrive in.
///
/// Tensors used by the generation loop always compute in F32; the other
/// types only describe host arrays before conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit floating point.
    F32,
    /// 16-bit floating point (IEEE 754 half-precision, via the `half` crate).
    F16,
    /// 64-bit signed integers, typically quantized class indices.
    I64,
}

impl DType {
    /// Returns the size in bytes of a single element.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F16 => 2,
            DType::I64 => 8,
        }
    }

    /// Returns true if this dtype holds floating point values.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F16)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F16 => write!(f, "f16"),
            DType::I64 => write!(f, "i64"),
        }
    }
}
