//! Typed array values and their wire codec

mod codec;
pub mod element;
pub mod scalar_array;
pub mod scalar_type;
pub mod value;

pub use element::Element;
pub use scalar_array::{create_array, ScalarArray};
pub use scalar_type::{ArrayField, ScalarType};
pub use value::ArrayValue;
