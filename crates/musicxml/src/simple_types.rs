//! Simple-type validators (§4.B): `validate(type_ref, raw_value) → normalized_value | error`.

use regex::Regex;

use crate::error::{MusicXmlError, MusicXmlResult};
use crate::schema::{schema_table, AtomicKind, Facets, SimpleTypeDef};

/// A validated, normalized scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Decimal(f64),
    Bool(bool),
}

impl Value {
    /// Render for XML text/attribute output.
    pub fn as_xml_text(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Decimal(d) => format_decimal(*d),
            Value::Bool(b) => if *b { "yes".to_string() } else { "no".to_string() },
        }
    }
}

fn format_decimal(d: f64) -> String {
    if d.fract() == 0.0 && d.abs() < 1e15 {
        format!("{}", d as i64)
    } else {
        let s = format!("{d}");
        s
    }
}

fn atomic_kind_from_xsd_name(name: &str) -> AtomicKind {
    match name {
        "xs:integer" | "xs:int" | "xs:long" | "xs:positiveInteger" => AtomicKind::Integer,
        "xs:nonNegativeInteger" => AtomicKind::NonNegativeInteger,
        "xs:decimal" | "xs:float" | "xs:double" => AtomicKind::Decimal,
        "xs:boolean" => AtomicKind::Boolean,
        "xs:token" | "xs:normalizedString" | "xs:NMTOKEN" | "xs:anyURI" => AtomicKind::Token,
        _ => AtomicKind::String,
    }
}

fn validate_atomic(type_name: &str, base: AtomicKind, raw: &str) -> MusicXmlResult<Value> {
    match base {
        AtomicKind::String | AtomicKind::Token => Ok(Value::Str(raw.to_string())),
        AtomicKind::Integer => raw
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| MusicXmlError::bad_value(type_name, raw, "not a valid integer")),
        AtomicKind::NonNegativeInteger => {
            let n: i64 = raw
                .parse()
                .map_err(|_| MusicXmlError::bad_value(type_name, raw, "not a valid integer"))?;
            if n < 0 {
                Err(MusicXmlError::bad_value(type_name, raw, "must be non-negative"))
            } else {
                Ok(Value::Int(n))
            }
        }
        AtomicKind::Decimal => raw
            .trim()
            .parse::<f64>()
            .map(Value::Decimal)
            .map_err(|_| MusicXmlError::bad_value(type_name, raw, "not a valid decimal")),
        AtomicKind::Boolean => match raw {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(MusicXmlError::bad_value(type_name, raw, "not a valid boolean")),
        },
    }
}

fn numeric_of(v: &Value) -> Option<f64> {
    match v {
        Value::Int(n) => Some(*n as f64),
        Value::Decimal(d) => Some(*d),
        _ => None,
    }
}

fn apply_facets(type_name: &str, raw: &str, value: &Value, facets: &Facets) -> MusicXmlResult<()> {
    if let Some(pattern) = facets.pattern {
        let re = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|e| MusicXmlError::bad_value(type_name, raw, format!("invalid pattern facet: {e}")))?;
        if !re.is_match(raw) {
            return Err(MusicXmlError::bad_value(
                type_name,
                raw,
                format!("does not match pattern '{pattern}'"),
            ));
        }
    }
    if let Some(n) = numeric_of(value) {
        if let Some(min) = facets.min_inclusive {
            if n < min {
                return Err(MusicXmlError::bad_value(type_name, raw, format!("must be >= {min}")));
            }
        }
        if let Some(max) = facets.max_inclusive {
            if n > max {
                return Err(MusicXmlError::bad_value(type_name, raw, format!("must be <= {max}")));
            }
        }
        if let Some(min) = facets.min_exclusive {
            if n <= min {
                return Err(MusicXmlError::bad_value(type_name, raw, format!("must be > {min}")));
            }
        }
        if let Some(max) = facets.max_exclusive {
            if n >= max {
                return Err(MusicXmlError::bad_value(type_name, raw, format!("must be < {max}")));
            }
        }
    }
    let len = raw.chars().count() as u64;
    if let Some(exact) = facets.length {
        if len != exact {
            return Err(MusicXmlError::bad_value(type_name, raw, format!("length must be {exact}")));
        }
    }
    if let Some(min) = facets.min_length {
        if len < min {
            return Err(MusicXmlError::bad_value(type_name, raw, format!("length must be >= {min}")));
        }
    }
    if let Some(max) = facets.max_length {
        if len > max {
            return Err(MusicXmlError::bad_value(type_name, raw, format!("length must be <= {max}")));
        }
    }
    Ok(())
}

/// Validate `raw` against the simple type named `type_ref`, which may be a
/// bare XSD primitive (`xs:decimal`) or a named schema simple type
/// (`font-size`, `step`, …).
pub fn validate(type_ref: &str, raw: &str) -> MusicXmlResult<Value> {
    if let Some(rest) = type_ref.strip_prefix("xs:") {
        let _ = rest;
        return validate_atomic(type_ref, atomic_kind_from_xsd_name(type_ref), raw);
    }

    match schema_table().simple_type(type_ref) {
        None => {
            // Unknown named type: schema-table corruption would mean the
            // generator and validator disagree, which is a programmer bug.
            panic!("schema table corrupted: no simple type named '{type_ref}'")
        }
        Some(SimpleTypeDef::Atomic { base }) => validate_atomic(type_ref, *base, raw),
        Some(SimpleTypeDef::Enumeration { base, values }) => {
            if values.iter().any(|v| *v == raw) {
                validate_atomic(type_ref, *base, raw)
            } else {
                Err(MusicXmlError::bad_value(type_ref, raw, "not in enumeration"))
            }
        }
        Some(SimpleTypeDef::Restriction { base, facets }) => {
            let value = validate_atomic(type_ref, *base, raw)?;
            apply_facets(type_ref, raw, &value, facets)?;
            Ok(value)
        }
        Some(SimpleTypeDef::List { item_type }) => {
            for item in raw.split_whitespace() {
                validate(item_type, item)?;
            }
            Ok(Value::Str(raw.to_string()))
        }
        Some(SimpleTypeDef::Union { member_types }) => {
            let mut reasons = Vec::new();
            for member in member_types {
                match validate(member, raw) {
                    Ok(v) => return Ok(v),
                    Err(e) => reasons.push(format!("{member}: {e}")),
                }
            }
            Err(MusicXmlError::bad_value(
                type_ref,
                raw,
                format!("matched no union member ({})", reasons.join("; ")),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_xsd_decimal() {
        assert_eq!(validate("xs:decimal", "17.2").unwrap(), Value::Decimal(17.2));
        assert!(validate("xs:decimal", "huge").is_err());
    }

    #[test]
    fn validates_step_enumeration() {
        assert!(validate("step", "G").is_ok());
        let err = validate("step", "H").unwrap_err();
        assert!(err.to_string().contains("not in enumeration"));
    }

    #[test]
    fn validates_octave_range() {
        assert!(validate("octave", "3").is_ok());
        assert!(validate("octave", "15").is_err());
    }

    #[test]
    fn validates_font_size_union() {
        assert!(validate("font-size", "17.2").is_ok());
        assert!(validate("font-size", "large").is_ok());
        assert!(validate("font-size", "huge").is_err());
    }

    #[test]
    fn validates_font_family_list() {
        assert!(validate("font-family", "Arial Times").is_ok());
    }
}
