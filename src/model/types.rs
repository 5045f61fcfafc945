//! Type tags used by `is`, `as`, `ofType` and `type()`.

use std::fmt;

/// A FHIRPath type name, either a System primitive or a named Element type
/// reported by the host's [`crate::evaluator::ResourceAdapter`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeInfo {
    /// `System.Boolean`
    Boolean,
    /// `System.Integer`
    Integer,
    /// `System.Long`
    Long,
    /// `System.Decimal`
    Decimal,
    /// `System.String`
    String,
    /// `System.Date`
    Date,
    /// `System.DateTime`
    DateTime,
    /// `System.Time`
    Time,
    /// `System.Quantity`
    Quantity,
    /// A named Element/resource type, e.g. `FHIR.Patient`.
    Named(String),
}

impl TypeInfo {
    /// Parse a type name as it appears in `is`/`as`/`ofType`, accepting an
    /// optional `System.`/`FHIR.` namespace prefix.
    pub fn from_name(name: &str) -> TypeInfo {
        let bare = name
            .strip_prefix("System.")
            .or_else(|| name.strip_prefix("FHIR."))
            .unwrap_or(name);
        match bare {
            "Boolean" => TypeInfo::Boolean,
            "Integer" => TypeInfo::Integer,
            "Long" => TypeInfo::Long,
            "Decimal" => TypeInfo::Decimal,
            "String" => TypeInfo::String,
            "Date" => TypeInfo::Date,
            "DateTime" => TypeInfo::DateTime,
            "Time" => TypeInfo::Time,
            "Quantity" => TypeInfo::Quantity,
            other => TypeInfo::Named(other.to_string()),
        }
    }

    /// The namespace this type reports for `type().namespace`.
    pub fn namespace(&self) -> &'static str {
        match self {
            TypeInfo::Named(_) => "FHIR",
            _ => "System",
        }
    }

    /// The bare type name this type reports for `type().name`.
    pub fn name(&self) -> &str {
        match self {
            TypeInfo::Boolean => "Boolean",
            TypeInfo::Integer => "Integer",
            TypeInfo::Long => "Long",
            TypeInfo::Decimal => "Decimal",
            TypeInfo::String => "String",
            TypeInfo::Date => "Date",
            TypeInfo::DateTime => "DateTime",
            TypeInfo::Time => "Time",
            TypeInfo::Quantity => "Quantity",
            TypeInfo::Named(name) => name,
        }
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace(), self.name())
    }
}
