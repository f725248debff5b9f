//! Element kinds and array field descriptors

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of element stored in an array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    UByte,
    UShort,
    UInt,
    ULong,
    Float,
    Double,
    String,
}

impl ScalarType {
    /// Every element kind, in declaration order
    pub const ALL: [ScalarType; 12] = [
        ScalarType::Boolean,
        ScalarType::Byte,
        ScalarType::Short,
        ScalarType::Int,
        ScalarType::Long,
        ScalarType::UByte,
        ScalarType::UShort,
        ScalarType::UInt,
        ScalarType::ULong,
        ScalarType::Float,
        ScalarType::Double,
        ScalarType::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Boolean => "boolean",
            ScalarType::Byte => "byte",
            ScalarType::Short => "short",
            ScalarType::Int => "int",
            ScalarType::Long => "long",
            ScalarType::UByte => "ubyte",
            ScalarType::UShort => "ushort",
            ScalarType::UInt => "uint",
            ScalarType::ULong => "ulong",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
            ScalarType::String => "string",
        }
    }

    /// Look up a kind by its name
    pub fn from_name(name: &str) -> Option<ScalarType> {
        ScalarType::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ScalarType::Byte
                | ScalarType::Short
                | ScalarType::Int
                | ScalarType::Long
                | ScalarType::UByte
                | ScalarType::UShort
                | ScalarType::UInt
                | ScalarType::ULong
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            ScalarType::UByte | ScalarType::UShort | ScalarType::UInt | ScalarType::ULong
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, ScalarType::Float | ScalarType::Double)
    }

    /// Wire width of one element; `None` for variable-width text
    pub fn element_size(self) -> Option<usize> {
        match self {
            ScalarType::Boolean | ScalarType::Byte | ScalarType::UByte => Some(1),
            ScalarType::Short | ScalarType::UShort => Some(2),
            ScalarType::Int | ScalarType::UInt | ScalarType::Float => Some(4),
            ScalarType::Long | ScalarType::ULong | ScalarType::Double => Some(8),
            ScalarType::String => None,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Introspection descriptor of an array field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayField {
    name: String,
    element_type: ScalarType,
}

impl ArrayField {
    pub fn new(name: impl Into<String>, element_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            element_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_type(&self) -> ScalarType {
        self.element_type
    }

    /// Type id such as `double[]`
    pub fn type_id(&self) -> String {
        format!("{}[]", self.element_type.name())
    }
}

impl fmt::Display for ArrayField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.type_id(), self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for kind in ScalarType::ALL {
            assert_eq!(ScalarType::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ScalarType::from_name("quad"), None);
    }

    #[test]
    fn test_classification() {
        assert!(ScalarType::UShort.is_integer());
        assert!(ScalarType::UShort.is_unsigned());
        assert!(ScalarType::Float.is_numeric());
        assert!(!ScalarType::Boolean.is_numeric());
        assert_eq!(ScalarType::String.element_size(), None);
        assert_eq!(ScalarType::ULong.element_size(), Some(8));
    }

    #[test]
    fn test_field_display_and_serde() {
        let field = ArrayField::new("value", ScalarType::Double);
        assert_eq!(field.type_id(), "double[]");
        assert_eq!(field.to_string(), "double[] value");

        let json = serde_json::to_string(&field).unwrap();
        assert!(json.contains("\"double\""));
        let back: ArrayField = serde_json::from_str(&json).unwrap();
        assert_eq!(back, field);
    }
}
