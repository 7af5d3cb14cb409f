//! Typed input and output buffers consumed and produced by tasks.

use std::fmt;

use thiserror::Error;

/// The element type of a [`Buffer`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ElementType {
    /// `u8` elements.
    U8,
    /// `i32` elements.
    I32,
    /// `i64` elements.
    I64,
    /// `f32` elements.
    F32,
    /// `f64` elements.
    F64,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::U8 => "u8",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        })
    }
}

/// A contiguous run of elements of a single [`ElementType`].
///
/// The element type travels with the data, so a task that asks for the wrong type gets an
/// error instead of a reinterpretation of the bytes.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Buffer {
    /// `u8` elements.
    U8(Vec<u8>),
    /// `i32` elements.
    I32(Vec<i32>),
    /// `i64` elements.
    I64(Vec<i64>),
    /// `f32` elements.
    F32(Vec<f32>),
    /// `f64` elements.
    F64(Vec<f64>),
}

impl Buffer {
    /// Allocates a buffer of `count` zero-valued elements.
    #[must_use]
    pub fn zeroed(element_type: ElementType, count: usize) -> Self {
        match element_type {
            ElementType::U8 => Self::U8(vec![0; count]),
            ElementType::I32 => Self::I32(vec![0; count]),
            ElementType::I64 => Self::I64(vec![0; count]),
            ElementType::F32 => Self::F32(vec![0.0; count]),
            ElementType::F64 => Self::F64(vec![0.0; count]),
        }
    }

    /// The type of the elements in this buffer.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::U8(_) => ElementType::U8,
            Self::I32(_) => ElementType::I32,
            Self::I64(_) => ElementType::I64,
            Self::F32(_) => ElementType::F32,
            Self::F64(_) => ElementType::F64,
        }
    }

    /// Number of elements in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    /// Whether the buffer holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Views the elements as `T`, or `None` if the buffer holds a different element type.
    #[must_use]
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::view(self)
    }

    /// Mutably views the elements as `T`, or `None` if the buffer holds a different element type.
    #[must_use]
    pub fn as_mut_slice<T: Element>(&mut self) -> Option<&mut [T]> {
        T::view_mut(self)
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A primitive type that can be stored in a [`Buffer`].
///
/// This trait is sealed; the set of element types is closed.
pub trait Element: Copy + sealed::Sealed + 'static {
    /// The buffer element type tag corresponding to `Self`.
    const TYPE: ElementType;

    #[doc(hidden)]
    fn view(buffer: &Buffer) -> Option<&[Self]>;

    #[doc(hidden)]
    fn view_mut(buffer: &mut Buffer) -> Option<&mut [Self]>;
}

macro_rules! element {
    ($t:ty, $variant:ident) => {
        impl sealed::Sealed for $t {}

        impl Element for $t {
            const TYPE: ElementType = ElementType::$variant;

            fn view(buffer: &Buffer) -> Option<&[Self]> {
                match buffer {
                    Buffer::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn view_mut(buffer: &mut Buffer) -> Option<&mut [Self]> {
                match buffer {
                    Buffer::$variant(values) => Some(values),
                    _ => None,
                }
            }
        }

        impl From<Vec<$t>> for Buffer {
            fn from(values: Vec<$t>) -> Self {
                Self::$variant(values)
            }
        }
    };
}

element!(u8, U8);
element!(i32, I32);
element!(i64, I64);
element!(f32, F32);
element!(f64, F64);

/// Which side of a [`TaskData`] a buffer is on.
#[derive(Clone, Copy, Debug, Eq, PartialEq, derive_more::Display)]
#[non_exhaustive]
pub enum Direction {
    /// Data the task reads.
    #[display("input")]
    Input,

    /// Data the task writes during post-processing.
    #[display("output")]
    Output,
}

/// Errors from typed access to [`TaskData`] buffers.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum TaskDataError {
    /// The requested buffer index is out of range.
    #[error("{direction} buffer {index} does not exist, there are {available}")]
    MissingBuffer {
        /// Input or output side.
        direction: Direction,
        /// The index that was requested.
        index: usize,
        /// How many buffers exist on that side.
        available: usize,
    },

    /// The buffer exists but holds a different element type.
    #[error("{direction} buffer {index} holds {actual} elements, not {expected}")]
    ElementTypeMismatch {
        /// Input or output side.
        direction: Direction,
        /// The index that was requested.
        index: usize,
        /// The element type the caller asked for.
        expected: ElementType,
        /// The element type the buffer holds.
        actual: ElementType,
    },
}

pub(crate) type Result<T> = std::result::Result<T, TaskDataError>;

/// The input/output buffer descriptor of one task.
///
/// `TaskData` is owned by whoever sets up the task (a test case, a benchmark iteration, one rank
/// of a distributed run). A [`Task`][crate::Task] borrows it for its whole lifetime, reads the
/// inputs during pre-processing and writes the outputs during post-processing.
///
/// Output buffers are declared up front by element type and count. Task bodies check those
/// counts during validation and reject a mismatch by returning `false`.
///
/// # Examples
///
/// ```
/// use variant_bench::{ElementType, TaskData};
///
/// let mut data = TaskData::new()
///     .with_input(vec![1_i64, 2, 3])
///     .with_output(ElementType::I64, 1);
///
/// assert!(data.has_output(0, ElementType::I64, 1));
///
/// data.output_mut::<i64>(0).unwrap()[0] = 6;
/// assert_eq!(data.output::<i64>(0).unwrap(), &[6]);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskData {
    inputs: Vec<Buffer>,
    outputs: Vec<Buffer>,
}

impl TaskData {
    /// Creates a descriptor with no buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an input buffer.
    #[must_use]
    pub fn with_input(mut self, buffer: impl Into<Buffer>) -> Self {
        self.inputs.push(buffer.into());
        self
    }

    /// Appends a zero-filled output buffer of `count` elements.
    #[must_use]
    pub fn with_output(mut self, element_type: ElementType, count: usize) -> Self {
        self.outputs.push(Buffer::zeroed(element_type, count));
        self
    }

    /// All input buffers in declaration order.
    #[must_use]
    pub fn inputs(&self) -> &[Buffer] {
        &self.inputs
    }

    /// All output buffers in declaration order.
    #[must_use]
    pub fn outputs(&self) -> &[Buffer] {
        &self.outputs
    }

    /// Whether input `index` exists and holds elements of `element_type`.
    #[must_use]
    pub fn has_input(&self, index: usize, element_type: ElementType) -> bool {
        self.inputs
            .get(index)
            .is_some_and(|b| b.element_type() == element_type)
    }

    /// Whether output `index` exists, holds `element_type` and has exactly `count` elements.
    #[must_use]
    pub fn has_output(&self, index: usize, element_type: ElementType, count: usize) -> bool {
        self.outputs
            .get(index)
            .is_some_and(|b| b.element_type() == element_type && b.len() == count)
    }

    /// Views input `index` as a slice of `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer does not exist or holds a different element type.
    pub fn input<T: Element>(&self, index: usize) -> Result<&[T]> {
        let buffer = lookup(&self.inputs, Direction::Input, index)?;
        buffer
            .as_slice()
            .ok_or_else(|| mismatch::<T>(Direction::Input, index, buffer))
    }

    /// Views output `index` as a slice of `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer does not exist or holds a different element type.
    pub fn output<T: Element>(&self, index: usize) -> Result<&[T]> {
        let buffer = lookup(&self.outputs, Direction::Output, index)?;
        buffer
            .as_slice()
            .ok_or_else(|| mismatch::<T>(Direction::Output, index, buffer))
    }

    /// Mutably views output `index` as a slice of `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer does not exist or holds a different element type.
    pub fn output_mut<T: Element>(&mut self, index: usize) -> Result<&mut [T]> {
        let available = self.outputs.len();

        let buffer = self
            .outputs
            .get_mut(index)
            .ok_or(TaskDataError::MissingBuffer {
                direction: Direction::Output,
                index,
                available,
            })?;

        let actual = buffer.element_type();

        buffer
            .as_mut_slice()
            .ok_or(TaskDataError::ElementTypeMismatch {
                direction: Direction::Output,
                index,
                expected: T::TYPE,
                actual,
            })
    }
}

fn lookup(buffers: &[Buffer], direction: Direction, index: usize) -> Result<&Buffer> {
    buffers.get(index).ok_or(TaskDataError::MissingBuffer {
        direction,
        index,
        available: buffers.len(),
    })
}

fn mismatch<T: Element>(direction: Direction, index: usize, buffer: &Buffer) -> TaskDataError {
    TaskDataError::ElementTypeMismatch {
        direction,
        index,
        expected: T::TYPE,
        actual: buffer.element_type(),
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(TaskData: Send, Sync, Clone);
    assert_impl_all!(TaskDataError: Send, Sync, std::error::Error);

    #[test]
    fn zeroed_buffer_has_requested_shape() {
        let buffer = Buffer::zeroed(ElementType::F32, 4);

        assert_eq!(buffer.element_type(), ElementType::F32);
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.as_slice::<f32>(), Some(&[0.0_f32; 4][..]));
    }

    #[test]
    fn typed_view_of_wrong_type_is_none() {
        let buffer = Buffer::from(vec![1_i32, 2]);

        assert!(buffer.as_slice::<i64>().is_none());
        assert!(buffer.as_slice::<u8>().is_none());
        assert_eq!(buffer.as_slice::<i32>(), Some(&[1, 2][..]));
    }

    #[test]
    fn input_access_reports_missing_buffer() {
        let data = TaskData::new().with_input(vec![1_u8]);

        assert_eq!(
            data.input::<u8>(1),
            Err(TaskDataError::MissingBuffer {
                direction: Direction::Input,
                index: 1,
                available: 1,
            })
        );
    }

    #[test]
    fn output_access_reports_type_mismatch() {
        let mut data = TaskData::new().with_output(ElementType::I64, 1);

        let expected = TaskDataError::ElementTypeMismatch {
            direction: Direction::Output,
            index: 0,
            expected: ElementType::F64,
            actual: ElementType::I64,
        };

        assert_eq!(data.output::<f64>(0), Err(expected.clone()));
        assert_eq!(data.output_mut::<f64>(0).map(|s| s.len()), Err(expected));
    }

    #[test]
    fn shape_checks() {
        let data = TaskData::new()
            .with_input(vec![1.0_f64, 2.0])
            .with_output(ElementType::I32, 1)
            .with_output(ElementType::I64, 2);

        assert!(data.has_input(0, ElementType::F64));
        assert!(!data.has_input(0, ElementType::F32));
        assert!(!data.has_input(1, ElementType::F64));

        assert!(data.has_output(0, ElementType::I32, 1));
        assert!(!data.has_output(0, ElementType::I32, 2));
        assert!(data.has_output(1, ElementType::I64, 2));
        assert!(!data.has_output(2, ElementType::I64, 2));
    }

    #[test]
    fn outputs_are_writable_in_place() {
        let mut data = TaskData::new().with_output(ElementType::U8, 3);

        data.output_mut::<u8>(0).unwrap().copy_from_slice(&[7, 8, 9]);

        assert_eq!(data.output::<u8>(0).unwrap(), &[7, 8, 9]);
        assert_eq!(data.outputs()[0].len(), 3);
    }

    #[test]
    fn error_messages_name_the_buffer() {
        let error = TaskDataError::ElementTypeMismatch {
            direction: Direction::Input,
            index: 2,
            expected: ElementType::I32,
            actual: ElementType::F64,
        };

        assert_eq!(
            error.to_string(),
            "input buffer 2 holds f64 elements, not i32"
        );
    }
}
