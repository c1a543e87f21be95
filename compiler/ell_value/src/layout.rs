//! Multi-dimensional memory layouts and linear addressing.
//!
//! A [`MemoryLayout`] stores its per-dimension vectors in *physical* order:
//! physical dimension `d` holds logical dimension `order[d]`. The linear
//! offset of a logical coordinate vector `c` is
//!
//! ```text
//! Σ increment[d] · (c[order[d]] + offset[d])
//! ```
//!
//! where `increment` is the cumulative stride derived from the allocated
//! extents (innermost physical dimension has stride 1). Permuting `order`
//! lets higher layers address channel-last and channel-first tensors with
//! the same backend code.

use crate::context::{EmitterContext, ValueBinaryOperation};
use crate::error::{EmitError, EmitResult};
use crate::scalar::Scalar;
use crate::value::ConstantData;
use crate::value_type::ValueType;

/// Shape descriptor for a value: sizes, padding, strides, and logical order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemoryLayout {
    /// Active size per physical dimension.
    size: Vec<usize>,
    /// Allocated extent per physical dimension (`size + padding`).
    extent: Vec<usize>,
    /// Axis offset (leading padding) per physical dimension.
    offset: Vec<usize>,
    /// Cumulative stride per physical dimension.
    increment: Vec<usize>,
    /// Physical dimension `d` stores logical dimension `order[d]`.
    order: Vec<usize>,
}

impl MemoryLayout {
    /// Canonical, unpadded, row-major layout.
    ///
    /// Sizes whose element count overflows `usize` are `InvalidArgument`.
    pub fn new(size: impl Into<Vec<usize>>) -> EmitResult<Self> {
        let size = size.into();
        let rank = size.len();
        Self::build(size.clone(), size, vec![0; rank], (0..rank).collect())
    }

    /// Rank-0 layout holding exactly one element.
    pub fn scalar() -> Self {
        Self {
            size: Vec::new(),
            extent: Vec::new(),
            offset: Vec::new(),
            increment: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Layout with symmetric padding: `extent = size + 2·padding`.
    pub fn with_padding(
        size: impl Into<Vec<usize>>,
        padding: impl Into<Vec<usize>>,
    ) -> EmitResult<Self> {
        let size = size.into();
        let padding = padding.into();
        if size.len() != padding.len() {
            return Err(EmitError::invalid_argument(format!(
                "padding has {} dimensions, size has {}",
                padding.len(),
                size.len()
            )));
        }
        let extent = size
            .iter()
            .zip(&padding)
            .map(|(&s, &p)| p.checked_mul(2).and_then(|p2| s.checked_add(p2)))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| EmitError::invalid_argument("padded extent overflows usize"))?;
        let order = (0..size.len()).collect();
        Self::from_parts(size, extent, padding, order)
    }

    /// Fully specified layout.
    ///
    /// All vectors are in physical order; `order` must be a permutation of
    /// `0..rank` and every `offset[d] + size[d]` must fit in `extent[d]`.
    pub fn from_parts(
        size: Vec<usize>,
        extent: Vec<usize>,
        offset: Vec<usize>,
        order: Vec<usize>,
    ) -> EmitResult<Self> {
        let rank = size.len();
        if extent.len() != rank || offset.len() != rank || order.len() != rank {
            return Err(EmitError::invalid_argument(format!(
                "layout vectors disagree on rank: size {rank}, extent {}, offset {}, order {}",
                extent.len(),
                offset.len(),
                order.len()
            )));
        }
        validate_order(&order)?;
        for d in 0..rank {
            if !offset[d].checked_add(size[d]).is_some_and(|end| end <= extent[d]) {
                return Err(EmitError::invalid_argument(format!(
                    "dimension {d}: offset {} + size {} exceeds extent {}",
                    offset[d], size[d], extent[d]
                )));
            }
        }
        Self::build(size, extent, offset, order)
    }

    /// Derive strides. Every element count and stride must fit in `usize`,
    /// which keeps the unchecked products in the accessors below in range.
    fn build(
        size: Vec<usize>,
        extent: Vec<usize>,
        offset: Vec<usize>,
        order: Vec<usize>,
    ) -> EmitResult<Self> {
        let overflow = || {
            EmitError::invalid_argument(format!("layout extents {extent:?} overflow usize"))
        };
        if volume(&size).is_none() || volume(&extent).is_none() {
            return Err(overflow());
        }
        let mut increment = vec![1usize; extent.len()];
        for d in (0..extent.len().saturating_sub(1)).rev() {
            increment[d] = increment[d + 1]
                .checked_mul(extent[d + 1])
                .ok_or_else(overflow)?;
        }
        Ok(Self {
            size,
            extent,
            offset,
            increment,
            order,
        })
    }

    /// Same physical storage, different logical-to-physical mapping.
    pub fn reorder(&self, order: impl Into<Vec<usize>>) -> EmitResult<Self> {
        let order = order.into();
        if order.len() != self.num_dimensions() {
            return Err(EmitError::invalid_argument(format!(
                "order has {} dimensions, layout has {}",
                order.len(),
                self.num_dimensions()
            )));
        }
        validate_order(&order)?;
        Ok(Self {
            order,
            ..self.clone()
        })
    }

    #[inline]
    pub fn num_dimensions(&self) -> usize {
        self.size.len()
    }

    /// Number of active elements (1 for rank 0).
    pub fn num_elements(&self) -> usize {
        self.size.iter().product()
    }

    /// Number of allocated elements including padding (1 for rank 0).
    pub fn memory_size(&self) -> usize {
        self.extent.iter().product()
    }

    #[inline]
    pub fn size(&self) -> &[usize] {
        &self.size
    }

    #[inline]
    pub fn extent(&self) -> &[usize] {
        &self.extent
    }

    #[inline]
    pub fn offset(&self) -> &[usize] {
        &self.offset
    }

    #[inline]
    pub fn cumulative_increment(&self) -> &[usize] {
        &self.increment
    }

    #[inline]
    pub fn logical_dimension_order(&self) -> &[usize] {
        &self.order
    }

    /// Active size of each logical dimension.
    pub fn logical_size(&self) -> Vec<usize> {
        let mut logical = vec![0; self.num_dimensions()];
        for (d, &l) in self.order.iter().enumerate() {
            logical[l] = self.size[d];
        }
        logical
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.size.is_empty()
    }

    /// No padding: every allocated element is active.
    pub fn is_contiguous(&self) -> bool {
        self.size == self.extent
    }

    /// Host-side linear offset of a logical coordinate vector.
    pub fn entry_offset(&self, coordinates: &[usize]) -> EmitResult<usize> {
        self.check_rank(coordinates.len())?;
        (0..self.num_dimensions())
            .try_fold(0usize, |total, d| {
                coordinates[self.order[d]]
                    .checked_add(self.offset[d])
                    .and_then(|c| c.checked_mul(self.increment[d]))
                    .and_then(|term| total.checked_add(term))
            })
            .ok_or_else(|| {
                EmitError::invalid_argument(format!(
                    "offset of coordinates {coordinates:?} overflows usize"
                ))
            })
    }

    /// Every logical coordinate vector, last logical dimension fastest.
    pub fn logical_coordinates(&self) -> LogicalCoordinates {
        LogicalCoordinates::new(self.logical_size())
    }

    pub(crate) fn check_rank(&self, coordinates: usize) -> EmitResult<()> {
        if coordinates == self.num_dimensions() {
            Ok(())
        } else {
            Err(EmitError::invalid_argument(format!(
                "expected {} coordinates, got {coordinates}",
                self.num_dimensions()
            )))
        }
    }
}

/// Product of `dims`, or `None` on overflow.
fn volume(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
}

fn validate_order(order: &[usize]) -> EmitResult<()> {
    let mut seen = vec![false; order.len()];
    for &l in order {
        match seen.get_mut(l) {
            Some(slot) if !*slot => *slot = true,
            _ => {
                return Err(EmitError::invalid_argument(format!(
                    "dimension order {order:?} is not a permutation"
                )))
            }
        }
    }
    Ok(())
}

/// Iterator over the cross product of logical sizes.
#[derive(Clone, Debug)]
pub struct LogicalCoordinates {
    sizes: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl LogicalCoordinates {
    fn new(sizes: Vec<usize>) -> Self {
        let next = if sizes.iter().any(|&s| s == 0) {
            None
        } else {
            Some(vec![0; sizes.len()])
        };
        Self { sizes, next }
    }
}

impl Iterator for LogicalCoordinates {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut successor = current.clone();
        for d in (0..self.sizes.len()).rev() {
            successor[d] += 1;
            if successor[d] < self.sizes[d] {
                self.next = Some(successor);
                return Some(current);
            }
            successor[d] = 0;
        }
        // Wrapped around every dimension (or rank 0): `current` was the last.
        Some(current)
    }
}

/// Emit the linear offset of `coordinates` within `layout`.
///
/// Arithmetic is emitted through `ctx` in the coordinates' integer type
/// (`Int32` when there are no coordinates). Zero offsets and unit strides
/// are folded away.
pub fn calculate_offset<C: EmitterContext + ?Sized>(
    ctx: &C,
    layout: &MemoryLayout,
    coordinates: &[Scalar],
) -> EmitResult<Scalar> {
    layout.check_rank(coordinates.len())?;
    let index_type = coordinates.first().map_or(ValueType::Int32, Scalar::ty);
    if !index_type.is_integral() {
        return Err(EmitError::TypeMismatch {
            expected: ValueType::Int32,
            found: index_type,
        });
    }

    let mut result: Option<Scalar> = None;
    for d in 0..layout.num_dimensions() {
        let mut term = coordinates[layout.order[d]].clone();
        if layout.offset[d] != 0 {
            let offset = index_constant(ctx, index_type, layout.offset[d])?;
            term = scalar_op(ctx, ValueBinaryOperation::Add, &term, &offset)?;
        }
        if layout.increment[d] != 1 {
            let stride = index_constant(ctx, index_type, layout.increment[d])?;
            term = scalar_op(ctx, ValueBinaryOperation::Multiply, &term, &stride)?;
        }
        result = Some(match result {
            Some(acc) => scalar_op(ctx, ValueBinaryOperation::Add, &acc, &term)?,
            None => term,
        });
    }

    match result {
        Some(offset) => Ok(offset),
        None => index_constant(ctx, index_type, 0),
    }
}

fn index_constant<C: EmitterContext + ?Sized>(
    ctx: &C,
    ty: ValueType,
    value: usize,
) -> EmitResult<Scalar> {
    let too_large = || EmitError::invalid_argument(format!("index {value} does not fit in {ty}"));
    let data = match ty {
        ValueType::Int64 => ConstantData::Int64(vec![i64::try_from(value).map_err(|_| too_large())?]),
        ValueType::Short => ConstantData::Short(vec![i16::try_from(value).map_err(|_| too_large())?]),
        ValueType::Byte => ConstantData::Byte(vec![u8::try_from(value).map_err(|_| too_large())?]),
        ValueType::Char8 => ConstantData::Char8(vec![i8::try_from(value).map_err(|_| too_large())?]),
        _ => ConstantData::Int32(vec![i32::try_from(value).map_err(|_| too_large())?]),
    };
    let mut value = ctx.store_constant_data(data)?;
    value.set_layout(MemoryLayout::scalar());
    Scalar::new(value)
}

fn scalar_op<C: EmitterContext + ?Sized>(
    ctx: &C,
    op: ValueBinaryOperation,
    lhs: &Scalar,
    rhs: &Scalar,
) -> EmitResult<Scalar> {
    Scalar::new(ctx.binary_operation(op, lhs.value(), rhs.value())?)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
