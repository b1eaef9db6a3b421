//! Error taxonomy for the schema-driven element engine (§7).

use thiserror::Error;

/// Errors surfaced by the MusicXML element engine. Every variant is
/// recoverable by the caller; schema-table corruption (a programmer error)
/// panics instead of going through this type.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MusicXmlError {
    /// A scalar value failed simple-type validation.
    #[error("invalid value for type '{type_name}': '{value}' ({reason})")]
    BadValue {
        type_name: String,
        value: String,
        reason: String,
    },

    /// An attribute name is not declared for this complex type.
    #[error("element '{element}' has no attribute '{attr}'")]
    UnknownAttribute { element: String, attr: String },

    /// A required attribute was absent at final check.
    #[error("element '{element}' is missing required attribute '{attr}'")]
    RequiredAttributeMissing { element: String, attr: String },

    /// No legal placement exists in the content model for this child.
    #[error("'{child}' cannot be added to '{parent}': {reason}")]
    ChildNotAllowed {
        parent: String,
        child: String,
        reason: String,
    },

    /// A required particle was left unsatisfied at final check.
    #[error("element '{element}' is missing required child at '{particle_path}'")]
    RequiredChildMissing {
        element: String,
        particle_path: String,
    },

    /// The XML/archive input could not be parsed.
    #[error("parse error at {path}:{offset}: {detail}")]
    ParseError {
        path: String,
        offset: u64,
        detail: String,
    },
}

impl MusicXmlError {
    pub fn bad_value(
        type_name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::BadValue {
            type_name: type_name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_attribute(element: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            element: element.into(),
            attr: attr.into(),
        }
    }

    pub fn required_attribute_missing(element: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::RequiredAttributeMissing {
            element: element.into(),
            attr: attr.into(),
        }
    }

    pub fn child_not_allowed(
        parent: impl Into<String>,
        child: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ChildNotAllowed {
            parent: parent.into(),
            child: child.into(),
            reason: reason.into(),
        }
    }

    pub fn required_child_missing(
        element: impl Into<String>,
        particle_path: impl Into<String>,
    ) -> Self {
        Self::RequiredChildMissing {
            element: element.into(),
            particle_path: particle_path.into(),
        }
    }

    pub fn parse_error(path: impl Into<String>, offset: u64, detail: impl Into<String>) -> Self {
        Self::ParseError {
            path: path.into(),
            offset,
            detail: detail.into(),
        }
    }
}

/// Result type used throughout the crate's public surface.
pub type MusicXmlResult<T> = Result<T, MusicXmlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_value_message_contains_context() {
        let err = MusicXmlError::bad_value("step", "H", "not in enumeration");
        let msg = err.to_string();
        assert!(msg.contains("step"));
        assert!(msg.contains('H'));
        assert!(msg.contains("not in enumeration"));
    }

    #[test]
    fn required_child_missing_message() {
        let err = MusicXmlError::required_child_missing("pitch", "step");
        assert!(err.to_string().contains("pitch"));
        assert!(err.to_string().contains("step"));
    }

    #[test]
    fn child_not_allowed_message() {
        let err = MusicXmlError::child_not_allowed("pitch", "clef", "no matching particle");
        let msg = err.to_string();
        assert!(msg.contains("clef"));
        assert!(msg.contains("pitch"));
    }
}
