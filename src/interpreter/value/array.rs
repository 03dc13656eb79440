use std::sync::Arc;

use crate::interpreter::value::{
    complex::Complex,
    core::Value,
    number::{Number, NumberTag},
    tower::Tower,
};

/// Most elements a single array may hold.
pub const MAX_ELEMENTS: usize = 1 << 28;

/// Returns the number of elements in an array of `shape`, or `None` when
/// the product overflows or exceeds [`MAX_ELEMENTS`].
///
/// # Example
/// ```
/// use aplomb::interpreter::value::array::element_count;
///
/// assert_eq!(element_count(&[2, 3]), Some(6));
/// assert_eq!(element_count(&[]), Some(1));
/// assert_eq!(element_count(&[1 << 32, 1 << 32]), None);
/// ```
#[must_use]
pub fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter()
         .try_fold(1usize, |acc, &d| acc.checked_mul(d))
         .filter(|&n| n <= MAX_ELEMENTS)
}

/// Storage behind an [`Array`].
///
/// `General` holds arbitrary values; the other variants are compact uniform
/// backings for homogeneous data. A uniform backing is only an optimization:
/// every array can be turned back into a general one.
#[derive(Debug, Clone)]
pub enum ArrayData {
    /// Heterogeneous slots.
    General(Vec<Value>),
    /// Booleans.
    Bool(Vec<bool>),
    /// Numbers of the integer class.
    Int(Vec<i64>),
    /// Numbers of the float class.
    Float(Vec<f64>),
    /// Numbers of the complex class.
    Complex(Vec<Complex>),
    /// Strings.
    Str(Vec<String>),
}

impl ArrayData {
    fn len(&self) -> usize {
        match self {
            Self::General(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Complex(v) => v.len(),
            Self::Str(v) => v.len(),
        }
    }
}

/// A multi-dimensional array stored in row-major order, last axis fastest.
///
/// The unique array of size zero is the canonical empty array: shape `[0]`
/// with a general backing. Every constructor that would produce a zero-size
/// array returns it instead.
#[derive(Debug, Clone)]
pub struct Array {
    shape: Vec<usize>,
    data:  ArrayData,
}

impl Array {
    /// Creates a general array from a shape and values in row-major order.
    ///
    /// The number of values must equal the product of the shape.
    #[must_use]
    pub fn new(shape: Vec<usize>, values: Vec<Value>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), values.len());
        if shape.contains(&0) {
            return Self::empty();
        }
        Self { shape,
               data: ArrayData::General(values) }
    }

    /// Creates an array from uniform storage. The storage length must equal
    /// the product of the shape.
    #[must_use]
    pub fn from_data(shape: Vec<usize>, data: ArrayData) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        if shape.contains(&0) {
            return Self::empty();
        }
        Self { shape, data }
    }

    /// Creates a vector.
    ///
    /// # Example
    /// ```
    /// use aplomb::interpreter::value::{array::Array, core::Value};
    ///
    /// let v = Array::vector(vec![Value::Int(1), Value::Int(2)]);
    /// assert_eq!(v.shape(), &[2]);
    /// assert_eq!(Array::vector(vec![]).shape(), &[0]);
    /// ```
    #[must_use]
    pub fn vector(values: Vec<Value>) -> Self {
        Self::new(vec![values.len()], values)
    }

    /// The canonical empty array.
    #[must_use]
    pub fn empty() -> Self {
        Self { shape: vec![0],
               data:  ArrayData::General(Vec::new()), }
    }

    /// A rank-0 array holding one value. Only used as an intermediate view;
    /// converting it back into a [`Value`] yields the scalar.
    #[must_use]
    pub fn scalar(value: Value) -> Self {
        Self { shape: Vec::new(),
               data:  ArrayData::General(vec![value]), }
    }

    /// Returns the shape.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the number of axes.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns the number of elements, the product of the shape.
    #[must_use]
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Returns `true` for the canonical empty array.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns the backing storage.
    #[must_use]
    pub const fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Returns `true` unless the array is general.
    #[must_use]
    pub const fn is_uniform(&self) -> bool {
        !matches!(self.data, ArrayData::General(_))
    }

    /// Returns the element at a flat index.
    ///
    /// # Panics
    /// Panics if the index is out of range.
    #[must_use]
    pub fn at(&self, index: usize) -> Value {
        match &self.data {
            ArrayData::General(v) => v[index].clone(),
            ArrayData::Bool(v) => Value::Bool(v[index]),
            ArrayData::Int(v) => Value::Number(Number::Integer(v[index])),
            ArrayData::Float(v) => Value::Number(Number::Float(v[index])),
            ArrayData::Complex(v) => Value::Number(Number::Complex(v[index])),
            ArrayData::Str(v) => Value::Str(v[index].clone()),
        }
    }

    /// Stores a value at a flat index, upgrading the backing to general when
    /// the value does not fit it.
    pub fn set(&mut self, index: usize, value: Value) {
        match (&mut self.data, value) {
            (ArrayData::General(v), value) => v[index] = value,
            (ArrayData::Bool(v), Value::Bool(b)) => v[index] = b,
            (ArrayData::Int(v), Value::Number(Number::Integer(n))) => v[index] = n,
            (ArrayData::Float(v), Value::Number(Number::Float(x))) => v[index] = x,
            (ArrayData::Complex(v), Value::Number(Number::Complex(c))) => v[index] = c,
            (ArrayData::Str(v), Value::Str(s)) => v[index] = s,
            (_, value) => {
                self.data = ArrayData::General(self.values());
                if let ArrayData::General(v) = &mut self.data {
                    v[index] = value;
                }
            },
        }
    }

    /// Returns all elements in row-major order.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        (0..self.size()).map(|i| self.at(i)).collect()
    }

    /// Returns a copy with general backing.
    #[must_use]
    pub fn to_general(&self) -> Self {
        Self { shape: self.shape.clone(),
               data:  ArrayData::General(self.values()), }
    }

    /// Converts a multi-index into a flat index.
    ///
    /// # Example
    /// ```
    /// use aplomb::interpreter::value::{array::Array, core::Value};
    ///
    /// let m = Array::new(vec![2, 3], (0..6).map(Value::Int).collect());
    /// assert_eq!(m.flat_index(&[1, 2]), Some(5));
    /// assert_eq!(m.flat_index(&[2, 0]), None);
    /// assert_eq!(m.index_vector(5), vec![1, 2]);
    /// ```
    #[must_use]
    pub fn flat_index(&self, index: &[usize]) -> Option<usize> {
        flat_index(&self.shape, index)
    }

    /// Converts a flat index into a multi-index.
    #[must_use]
    pub fn index_vector(&self, flat: usize) -> Vec<usize> {
        index_vector(&self.shape, flat)
    }

    /// Reshapes by cycling through the elements in row-major order.
    ///
    /// Enlarging is never an error. Reshaping an empty array to a non-zero
    /// size fills with zeros; reshaping to size zero yields the canonical
    /// empty array. Callers check user-supplied shapes with
    /// [`element_count`] first.
    #[must_use]
    pub fn reshape(&self, shape: Vec<usize>) -> Self {
        let size: usize = shape.iter().product();
        if size == 0 {
            return Self::empty();
        }
        let source = self.size();
        if source == 0 {
            return Self::new(shape, vec![Value::Number(Number::Integer(0)); size]);
        }
        macro_rules! cycle {
            ($v:expr, $variant:ident) => {
                ArrayData::$variant((0..size).map(|i| $v[i % source].clone()).collect())
            };
        }
        let data = match &self.data {
            ArrayData::General(v) => cycle!(v, General),
            ArrayData::Bool(v) => cycle!(v, Bool),
            ArrayData::Int(v) => cycle!(v, Int),
            ArrayData::Float(v) => cycle!(v, Float),
            ArrayData::Complex(v) => cycle!(v, Complex),
            ArrayData::Str(v) => cycle!(v, Str),
        };
        Self { shape, data }
    }

    /// Finds the most specific uniform backing for the elements.
    ///
    /// With `uptype`, numbers of mixed classes (and booleans or raw integers
    /// mixed with numbers) are first brought to a common class through the
    /// tower. The empty array stays general, a size-1 array takes the backing
    /// of its only element, and arrays of raw integers stay general.
    #[must_use]
    pub fn unify(&self, tower: &Tower, uptype: bool) -> Self {
        if self.is_empty() {
            return Self::empty();
        }
        let values = self.values();
        if values.len() == 1 {
            return Self { shape: self.shape.clone(),
                          data:  uniform(values.clone()).unwrap_or(ArrayData::General(values)), };
        }
        if let Some(data) = uniform(values.clone()) {
            return Self { shape: self.shape.clone(),
                          data };
        }
        if uptype && let Some(numbers) = common_class(tower, &values) {
            let numbers = numbers.into_iter().map(Value::Number).collect();
            if let Some(data) = uniform(numbers) {
                return Self { shape: self.shape.clone(),
                              data };
            }
        }
        self.to_general()
    }

    /// Splits the array into cells of the trailing `rank` axes.
    ///
    /// Returns the frame (the leading axes) and one value per cell. Rank-0
    /// cells come back as scalars.
    #[must_use]
    pub fn cells(&self, rank: usize) -> (Vec<usize>, Vec<Value>) {
        let rank = rank.min(self.rank());
        let split = self.rank() - rank;
        let frame = self.shape[..split].to_vec();
        let cell_shape = self.shape[split..].to_vec();
        let cell_size: usize = cell_shape.iter().product();
        let count: usize = frame.iter().product();
        let values = self.values();
        let cells = (0..count).map(|c| {
                                  let chunk = values[c * cell_size..(c + 1) * cell_size].to_vec();
                                  Value::from(Self::new(cell_shape.clone(), chunk))
                              })
                              .collect();
        (frame, cells)
    }

    /// Reassembles results computed per cell.
    ///
    /// Cell results are conformed to a common shape: lower-rank results get
    /// leading unit axes, then every result is extended or truncated to the
    /// per-axis maximum, filling with zeros. The result shape is the frame
    /// followed by the common cell shape.
    #[must_use]
    pub fn from_cells(frame: &[usize], cells: Vec<Value>) -> Value {
        let arrays: Vec<Self> = cells.into_iter().map(|v| v.as_array_view()).collect();
        let rank = arrays.iter().map(Self::rank).max().unwrap_or(0);
        let mut common = vec![0; rank];
        for array in &arrays {
            let padded = pad_shape(array.shape(), rank);
            for (axis, &n) in padded.iter().enumerate() {
                common[axis] = common[axis].max(n);
            }
        }
        let mut shape = frame.to_vec();
        shape.extend_from_slice(&common);
        let mut values = Vec::with_capacity(shape.iter().product());
        for array in arrays {
            let padded = Self { shape: pad_shape(array.shape(), rank),
                                data:  array.data, };
            values.extend(padded.take(&common).values());
        }
        Value::from(Self::new(shape, values))
    }

    /// Takes `counts[i]` elements from the start of each axis, filling past
    /// the end with the array's fill value.
    #[must_use]
    pub fn take(&self, counts: &[usize]) -> Self {
        let fill = self.fill_value();
        let size: usize = counts.iter().product();
        let values = (0..size).map(|flat| {
                                  let index = index_vector(counts, flat);
                                  self.flat_index(&index).map_or_else(|| fill.clone(), |i| self.at(i))
                              })
                              .collect();
        Self::new(counts.to_vec(), values)
    }

    /// Returns the element used to pad overtakes: a blank for strings, zero
    /// otherwise.
    #[must_use]
    pub fn fill_value(&self) -> Value {
        match self.values().first() {
            Some(Value::Str(_)) => Value::Str(" ".to_string()),
            _ => Value::Number(Number::Integer(0)),
        }
    }

    /// Returns the vectors running along `axis`, one per position of the
    /// remaining axes in row-major order.
    #[must_use]
    pub fn lanes(&self, axis: usize) -> Vec<Vec<Value>> {
        let length = self.shape[axis];
        let outer: usize = self.shape[..axis].iter().product();
        let inner: usize = self.shape[axis + 1..].iter().product();
        let values = self.values();
        let mut lanes = Vec::with_capacity(outer * inner);
        for o in 0..outer {
            for i in 0..inner {
                lanes.push((0..length).map(|k| values[(o * length + k) * inner + i].clone())
                                      .collect());
            }
        }
        lanes
    }

    /// Inverse of [`Array::lanes`]: rebuilds an array from lanes along
    /// `axis`, where `shape` already carries the new axis length.
    #[must_use]
    pub fn from_lanes(shape: Vec<usize>, axis: usize, lanes: &[Vec<Value>]) -> Self {
        let length = shape[axis];
        let inner: usize = shape[axis + 1..].iter().product();
        let size: usize = shape.iter().product();
        let mut values = vec![Value::Int(0); size];
        for (l, lane) in lanes.iter().enumerate() {
            let (o, i) = (l / inner.max(1), l % inner.max(1));
            for (k, value) in lane.iter().enumerate().take(length) {
                values[(o * length + k) * inner + i] = value.clone();
            }
        }
        Self::new(shape, values)
    }

    /// Returns the shape with `axis` removed.
    #[must_use]
    pub fn shape_without(&self, axis: usize) -> Vec<usize> {
        let mut shape = self.shape.clone();
        shape.remove(axis);
        shape
    }

    /// Returns the major cells, the items along the first axis.
    #[must_use]
    pub fn major_cells(&self) -> Vec<Value> {
        self.cells(self.rank().saturating_sub(1)).1
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && (0..self.size()).all(|i| self.at(i) == other.at(i))
    }
}

impl From<Array> for Value {
    /// Wraps an array, disclosing rank-0 arrays to their scalar.
    fn from(array: Array) -> Self {
        if array.rank() == 0 {
            return array.at(0);
        }
        if array.is_empty() {
            return Self::Array(Arc::new(Array::empty()));
        }
        Self::Array(Arc::new(array))
    }
}

/// Converts a multi-index into a flat index for `shape`.
#[must_use]
pub fn flat_index(shape: &[usize], index: &[usize]) -> Option<usize> {
    if index.len() != shape.len() {
        return None;
    }
    let mut flat = 0;
    for (&i, &n) in index.iter().zip(shape) {
        if i >= n {
            return None;
        }
        flat = flat * n + i;
    }
    Some(flat)
}

/// Converts a flat index into a multi-index for `shape`.
#[must_use]
pub fn index_vector(shape: &[usize], mut flat: usize) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (axis, &n) in shape.iter().enumerate().rev() {
        if n > 0 {
            index[axis] = flat % n;
            flat /= n;
        }
    }
    index
}

fn pad_shape(shape: &[usize], rank: usize) -> Vec<usize> {
    let mut padded = vec![1; rank.saturating_sub(shape.len())];
    padded.extend_from_slice(shape);
    padded
}

fn uniform(values: Vec<Value>) -> Option<ArrayData> {
    let first = values.first()?;
    match first {
        Value::Bool(_) => values.into_iter()
                                .map(|v| match v {
                                    Value::Bool(b) => Some(b),
                                    _ => None,
                                })
                                .collect::<Option<_>>()
                                .map(ArrayData::Bool),
        Value::Str(_) => values.into_iter()
                               .map(|v| match v {
                                   Value::Str(s) => Some(s),
                                   _ => None,
                               })
                               .collect::<Option<_>>()
                               .map(ArrayData::Str),
        Value::Number(n) => match n.tag() {
            NumberTag::Integer => values.into_iter()
                                        .map(|v| match v {
                                            Value::Number(Number::Integer(i)) => Some(i),
                                            _ => None,
                                        })
                                        .collect::<Option<_>>()
                                        .map(ArrayData::Int),
            NumberTag::Float => values.into_iter()
                                      .map(|v| match v {
                                          Value::Number(Number::Float(x)) => Some(x),
                                          _ => None,
                                      })
                                      .collect::<Option<_>>()
                                      .map(ArrayData::Float),
            NumberTag::Complex => values.into_iter()
                                        .map(|v| match v {
                                            Value::Number(Number::Complex(c)) => Some(c),
                                            _ => None,
                                        })
                                        .collect::<Option<_>>()
                                        .map(ArrayData::Complex),
        },
        _ => None,
    }
}

fn common_class(tower: &Tower, values: &[Value]) -> Option<Vec<Number>> {
    if !values.iter().any(|v| matches!(v, Value::Number(_))) {
        return None;
    }
    let numbers = values.iter().map(|v| tower.import(v)).collect::<Option<Vec<_>>>()?;
    let top = numbers.iter().filter_map(|n| tower.class_of(n)).max()?;
    numbers.into_iter()
           .map(|mut n| {
               while tower.class_of(&n)? < top {
                   n = tower.uptype(n)?;
               }
               Some(n)
           })
           .collect()
}

#[cfg(test)]
mod tests {
    use proptest::{prelude::*, test_runner::Config as ProptestConfig};

    use super::*;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&n| Value::Number(Number::Integer(n))).collect()
    }

    #[test]
    fn set_upgrades_uniform_backing() {
        let mut array = Array::vector(ints(&[1, 2, 3])).unify(&Tower::default(), false);
        assert!(matches!(array.data(), ArrayData::Int(_)));
        array.set(1, Value::Str("x".into()));
        assert!(!array.is_uniform());
        assert_eq!(array.at(1), Value::Str("x".into()));
        assert_eq!(array.at(2), Value::Number(Number::Integer(3)));
    }

    #[test]
    fn unify_special_cases() {
        let tower = Tower::default();
        assert!(!Array::empty().unify(&tower, true).is_uniform());

        let raw = Array::vector(vec![Value::Int(1), Value::Int(2)]).unify(&tower, false);
        assert!(!raw.is_uniform());

        let single = Array::vector(vec![Value::Bool(true)]).unify(&tower, true);
        assert!(matches!(single.data(), ArrayData::Bool(_)));

        let mixed = Array::vector(vec![Value::Number(Number::Integer(1)),
                                       Value::Number(Number::Float(0.5))]);
        assert!(!mixed.unify(&tower, false).is_uniform());
        assert!(matches!(mixed.unify(&tower, true).data(), ArrayData::Float(_)));
    }

    #[test]
    fn cells_and_back() {
        let m = Array::new(vec![2, 3], ints(&[1, 2, 3, 4, 5, 6]));
        let (frame, rows) = m.cells(1);
        assert_eq!(frame, vec![2]);
        assert_eq!(rows.len(), 2);
        assert_eq!(Array::from_cells(&frame, rows), Value::from(m));
    }

    #[test]
    fn from_cells_conforms_ragged_results() {
        let short = Value::from(Array::vector(ints(&[1])));
        let long = Value::from(Array::vector(ints(&[2, 3])));
        let result = Array::from_cells(&[2], vec![short, long]);
        let expected = Value::from(Array::new(vec![2, 2], ints(&[1, 0, 2, 3])));
        assert_eq!(result, expected);
    }

    #[test]
    fn lanes_follow_the_requested_axis() {
        let m = Array::new(vec![2, 3], ints(&[1, 2, 3, 4, 5, 6]));
        assert_eq!(m.lanes(1), vec![ints(&[1, 2, 3]), ints(&[4, 5, 6])]);
        assert_eq!(m.lanes(0), vec![ints(&[1, 4]), ints(&[2, 5]), ints(&[3, 6])]);
        assert_eq!(Array::from_lanes(vec![2, 3], 0, &m.lanes(0)), m);
    }

    #[test]
    fn reshaping_to_nothing_yields_the_canonical_empty_array() {
        let v = Array::vector(ints(&[1, 2, 3])).unify(&Tower::default(), false);
        for shape in [vec![0], vec![2, 0], vec![0, 3, 4]] {
            let empty = v.reshape(shape);
            assert_eq!(empty.shape(), &[0]);
            assert!(empty.is_empty());
            assert!(!empty.is_uniform());
        }
        assert_eq!(Array::empty().reshape(vec![2]).values(), ints(&[0, 0]));
    }

    #[test]
    fn oversized_shapes_have_no_element_count() {
        assert_eq!(element_count(&[3, 0, 5]), Some(0));
        assert_eq!(element_count(&[MAX_ELEMENTS]), Some(MAX_ELEMENTS));
        assert_eq!(element_count(&[MAX_ELEMENTS, 2]), None);
        assert_eq!(element_count(&[usize::MAX, usize::MAX]), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig { failure_persistence: None, .. ProptestConfig::default() })]

        #[test]
        fn flat_and_multi_indices_are_inverse(shape in proptest::collection::vec(1usize..6, 0..4), seed: usize) {
            let size: usize = shape.iter().product();
            let flat = seed % size;
            let index = index_vector(&shape, flat);
            prop_assert!(index.iter().zip(&shape).all(|(i, n)| i < n));
            prop_assert_eq!(flat_index(&shape, &index), Some(flat));
        }

        #[test]
        fn out_of_range_indices_have_no_flat_position(shape in proptest::collection::vec(1usize..6, 1..4),
                                                       axis: usize) {
            let axis = axis % shape.len();
            let mut index = vec![0; shape.len()];
            index[axis] = shape[axis];
            prop_assert_eq!(flat_index(&shape, &index), None);
        }
    }
}
