//! Single host elements.

use crate::context::{ValueBinaryOperation, ValueLogicalOperation};
use crate::error::{EmitError, EmitResult};
use crate::intrinsics::Intrinsic;
use crate::value::ConstantData;
use crate::value_type::ValueType;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) enum Datum {
    Boolean(bool),
    Byte(u8),
    Char8(i8),
    Short(i16),
    Int32(i32),
    Int64(i64),
    Double(f64),
}

fn out_of_range(index: usize, len: usize) -> EmitError {
    EmitError::invalid_argument(format!("element {index} is outside storage of {len} elements"))
}

impl Datum {
    pub(super) fn load(data: &ConstantData, index: usize) -> EmitResult<Self> {
        let len = data.len();
        let missing = || out_of_range(index, len);
        Ok(match data {
            ConstantData::Boolean(v) => Datum::Boolean(*v.get(index).ok_or_else(missing)?),
            ConstantData::Byte(v) => Datum::Byte(*v.get(index).ok_or_else(missing)?),
            ConstantData::Char8(v) => Datum::Char8(*v.get(index).ok_or_else(missing)?),
            ConstantData::Short(v) => Datum::Short(*v.get(index).ok_or_else(missing)?),
            ConstantData::Int32(v) => Datum::Int32(*v.get(index).ok_or_else(missing)?),
            ConstantData::Int64(v) => Datum::Int64(*v.get(index).ok_or_else(missing)?),
            ConstantData::Double(v) => Datum::Double(*v.get(index).ok_or_else(missing)?),
        })
    }

    /// Write into `data`, converting to its element type.
    pub(super) fn store(self, data: &mut ConstantData, index: usize) -> EmitResult<()> {
        let len = data.len();
        let value = self.convert(data.value_type());
        macro_rules! put {
            ($v:expr, $variant:ident) => {{
                let slot = $v.get_mut(index).ok_or_else(|| out_of_range(index, len))?;
                if let Datum::$variant(x) = value {
                    *slot = x;
                }
            }};
        }
        match data {
            ConstantData::Boolean(v) => put!(v, Boolean),
            ConstantData::Byte(v) => put!(v, Byte),
            ConstantData::Char8(v) => put!(v, Char8),
            ConstantData::Short(v) => put!(v, Short),
            ConstantData::Int32(v) => put!(v, Int32),
            ConstantData::Int64(v) => put!(v, Int64),
            ConstantData::Double(v) => put!(v, Double),
        }
        Ok(())
    }

    pub(super) fn ty(self) -> ValueType {
        match self {
            Datum::Boolean(_) => ValueType::Boolean,
            Datum::Byte(_) => ValueType::Byte,
            Datum::Char8(_) => ValueType::Char8,
            Datum::Short(_) => ValueType::Short,
            Datum::Int32(_) => ValueType::Int32,
            Datum::Int64(_) => ValueType::Int64,
            Datum::Double(_) => ValueType::Double,
        }
    }

    fn as_i64(self) -> i64 {
        match self {
            Datum::Boolean(b) => i64::from(b),
            Datum::Byte(x) => i64::from(x),
            Datum::Char8(x) => i64::from(x),
            Datum::Short(x) => i64::from(x),
            Datum::Int32(x) => i64::from(x),
            Datum::Int64(x) => x,
            #[allow(clippy::cast_possible_truncation, reason = "float to int casts saturate")]
            Datum::Double(x) => x as i64,
        }
    }

    #[allow(clippy::cast_precision_loss, reason = "wide integers round like a C conversion")]
    fn as_f64(self) -> f64 {
        match self {
            Datum::Double(x) => x,
            other => other.as_i64() as f64,
        }
    }

    /// Element index held by an integral datum.
    pub(super) fn as_index(self) -> EmitResult<usize> {
        usize::try_from(self.as_i64())
            .map_err(|_| EmitError::invalid_argument(format!("negative index {}", self.as_i64())))
    }

    pub(super) fn as_bool(self) -> bool {
        match self {
            Datum::Boolean(b) => b,
            Datum::Double(x) => x != 0.0,
            other => other.as_i64() != 0,
        }
    }

    /// Numeric conversion. Integers wrap, doubles saturate.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "narrowing conversions wrap in the target width"
    )]
    pub(super) fn convert(self, ty: ValueType) -> Datum {
        if self.ty() == ty {
            return self;
        }
        match ty {
            ValueType::Boolean | ValueType::PBoolean => Datum::Boolean(self.as_bool()),
            ValueType::Double | ValueType::PDouble => Datum::Double(self.as_f64()),
            ValueType::Byte | ValueType::PByte => Datum::Byte(self.integral_bits() as u8),
            ValueType::Char8 | ValueType::PChar8 => Datum::Char8(self.integral_bits() as i8),
            ValueType::Short | ValueType::PShort => Datum::Short(self.integral_bits() as i16),
            ValueType::Int32 | ValueType::PInt32 => Datum::Int32(self.integral_bits() as i32),
            ValueType::Int64 | ValueType::PInt64 => Datum::Int64(self.integral_bits()),
            // No element carries `Void`.
            ValueType::Void | ValueType::PVoid => self,
        }
    }

    #[allow(clippy::cast_possible_truncation, reason = "float to int casts saturate")]
    fn integral_bits(self) -> i64 {
        match self {
            Datum::Double(x) => x as i64,
            other => other.as_i64(),
        }
    }

    /// Rebuild a datum of this datum's type from a wide integer.
    fn with_i64(self, x: i64) -> Datum {
        Datum::Int64(x).convert(self.ty())
    }

    pub(super) fn binary(self, op: ValueBinaryOperation, rhs: Datum) -> EmitResult<Datum> {
        if let (Datum::Double(a), Datum::Double(b)) = (self, rhs) {
            return Ok(Datum::Double(match op {
                ValueBinaryOperation::Add => a + b,
                ValueBinaryOperation::Subtract => a - b,
                ValueBinaryOperation::Multiply => a * b,
                ValueBinaryOperation::Divide => a / b,
                ValueBinaryOperation::Modulus => a % b,
            }));
        }
        let (a, b) = (self.as_i64(), rhs.as_i64());
        let result = match op {
            ValueBinaryOperation::Add => a.wrapping_add(b),
            ValueBinaryOperation::Subtract => a.wrapping_sub(b),
            ValueBinaryOperation::Multiply => a.wrapping_mul(b),
            ValueBinaryOperation::Divide | ValueBinaryOperation::Modulus if b == 0 => {
                return Err(EmitError::invalid_argument("integer division by zero"));
            }
            ValueBinaryOperation::Divide => a.wrapping_div(b),
            ValueBinaryOperation::Modulus => a.wrapping_rem(b),
        };
        Ok(self.with_i64(result))
    }

    pub(super) fn compare(self, op: ValueLogicalOperation, rhs: Datum) -> bool {
        let ordering = match (self, rhs) {
            (Datum::Double(a), Datum::Double(b)) => a.partial_cmp(&b),
            _ => Some(self.as_i64().cmp(&rhs.as_i64())),
        };
        // Unordered (NaN) comparisons are false except inequality.
        let Some(ordering) = ordering else {
            return op == ValueLogicalOperation::Inequality;
        };
        match op {
            ValueLogicalOperation::Equality => ordering.is_eq(),
            ValueLogicalOperation::Inequality => ordering.is_ne(),
            ValueLogicalOperation::LessThan => ordering.is_lt(),
            ValueLogicalOperation::LessThanOrEqual => ordering.is_le(),
            ValueLogicalOperation::GreaterThan => ordering.is_gt(),
            ValueLogicalOperation::GreaterThanOrEqual => ordering.is_ge(),
        }
    }

    /// Unary math. Only `abs` is defined on integers.
    pub(super) fn unary(self, intrinsic: Intrinsic) -> Datum {
        if let Datum::Double(x) = self {
            return Datum::Double(match intrinsic {
                Intrinsic::Abs => x.abs(),
                Intrinsic::Cos => x.cos(),
                Intrinsic::Exp => x.exp(),
                Intrinsic::Log => x.ln(),
                Intrinsic::Sin => x.sin(),
                Intrinsic::Sqrt => x.sqrt(),
                Intrinsic::Tanh => x.tanh(),
                Intrinsic::MaxNum | Intrinsic::MinNum | Intrinsic::Pow => x,
            });
        }
        self.with_i64(self.as_i64().wrapping_abs())
    }

    pub(super) fn max(self, rhs: Datum) -> Datum {
        match (self, rhs) {
            (Datum::Double(a), Datum::Double(b)) => Datum::Double(a.max(b)),
            _ => self.with_i64(self.as_i64().max(rhs.as_i64())),
        }
    }

    pub(super) fn min(self, rhs: Datum) -> Datum {
        match (self, rhs) {
            (Datum::Double(a), Datum::Double(b)) => Datum::Double(a.min(b)),
            _ => self.with_i64(self.as_i64().min(rhs.as_i64())),
        }
    }

    pub(super) fn pow(self, exponent: Datum) -> Datum {
        Datum::Double(self.as_f64().powf(exponent.as_f64()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap to panic on unexpected state")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn integer_arithmetic_wraps_in_its_own_width() {
        let sum = Datum::Byte(250).binary(ValueBinaryOperation::Add, Datum::Byte(10));
        assert_eq!(sum, Ok(Datum::Byte(4)));
    }

    #[test]
    fn integer_division_by_zero_is_rejected() {
        let err = Datum::Int32(1)
            .binary(ValueBinaryOperation::Divide, Datum::Int32(0))
            .unwrap_err();
        assert!(matches!(err, EmitError::InvalidArgument(_)));
    }

    #[test]
    fn nan_compares_unordered() {
        let nan = Datum::Double(f64::NAN);
        assert!(!nan.compare(ValueLogicalOperation::Equality, nan));
        assert!(nan.compare(ValueLogicalOperation::Inequality, nan));
        assert!(!nan.compare(ValueLogicalOperation::LessThan, Datum::Double(0.0)));
    }

    #[test]
    fn conversions() {
        assert_eq!(Datum::Double(2.9).convert(ValueType::Int32), Datum::Int32(2));
        assert_eq!(Datum::Int32(0).convert(ValueType::Boolean), Datum::Boolean(false));
        assert_eq!(Datum::Boolean(true).convert(ValueType::Double), Datum::Double(1.0));
        assert_eq!(Datum::Int32(-1).convert(ValueType::Byte), Datum::Byte(255));
    }

    #[test]
    fn store_converts_to_the_buffer_type() {
        let mut data = ConstantData::Int64(vec![0; 2]);
        Datum::Int32(7).store(&mut data, 1).unwrap();
        assert_eq!(data, ConstantData::Int64(vec![0, 7]));
        assert!(Datum::Int32(7).store(&mut data, 2).is_err());
    }
}
