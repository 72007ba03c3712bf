//! Record normalization and document building.
//!
//! [`normalize_record`] canonicalizes field names and resolves missing
//! values according to a [`MissingValuePolicy`]; [`build_document`] renders
//! a normalized [`Record`] into a [`Document`] with a fixed sentence
//! template and the full field set as metadata.

use tracing::warn;

use crate::config::MissingValuePolicy;
use crate::error::{RagError, Result};
use crate::models::{Document, MetaValue, Metadata, RawRecord, Record};

/// Placeholder substituted for absent values.
pub const UNKNOWN: &str = "Unknown";

/// Fields every record must carry, in canonical key form.
pub const REQUIRED_FIELDS: [&str; 16] = [
    "year",
    "make",
    "model",
    "vehicle_size",
    "vehicle_style",
    "number_of_doors",
    "market_category",
    "msrp",
    "engine_hp",
    "engine_cylinders",
    "engine_fuel_type",
    "transmission_type",
    "driven_wheels",
    "city_mpg",
    "highway_mpg",
    "popularity",
];

/// Canonical key form: trimmed, lower-cased, whitespace runs become `_`.
///
/// `"Engine HP"` → `"engine_hp"`, `"highway MPG"` → `"highway_mpg"`.
pub fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Normalize keys and resolve missing values.
///
/// A required field whose column is absent altogether is always a
/// validation error, as are two columns with the same canonical key. A
/// present column with an absent value is handled by `policy`.
pub fn normalize_record(raw: RawRecord, policy: MissingValuePolicy) -> Result<Record> {
    let mut fields = Metadata::new();
    let mut missing = Vec::new();

    for (source, value) in raw.fields {
        let key = normalize_key(&source);
        if key.is_empty() {
            continue;
        }
        if fields.contains_key(&key) {
            return Err(RagError::Validation(format!(
                "record {} has more than one column for '{}' (duplicate: '{}')",
                raw.position, key, source
            )));
        }
        match value {
            Some(v) => {
                fields.insert(key, v);
            }
            None => {
                fields.insert(key.clone(), MetaValue::from(UNKNOWN));
                missing.push(key);
            }
        }
    }

    let absent: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|f| !fields.contains_key(*f))
        .collect();
    if !absent.is_empty() {
        return Err(RagError::Validation(format!(
            "record {} has no field(s): {}",
            raw.position,
            absent.join(", ")
        )));
    }

    if !missing.is_empty() {
        match policy {
            MissingValuePolicy::Substitute => {}
            MissingValuePolicy::Warn => warn!(
                record = raw.position,
                fields = %missing.join(", "),
                "missing values replaced with '{}'",
                UNKNOWN
            ),
            MissingValuePolicy::Reject => {
                return Err(RagError::Validation(format!(
                    "record {} is missing value(s) for: {}",
                    raw.position,
                    missing.join(", ")
                )))
            }
        }
    }

    Ok(Record {
        position: raw.position,
        fields,
    })
}

/// Render a record into a document with the given id.
pub fn build_document(id: impl Into<String>, record: &Record) -> Result<Document> {
    let field = |name: &str| -> Result<&MetaValue> {
        record.get(name).ok_or_else(|| {
            RagError::Validation(format!(
                "record {} has no field: {}",
                record.position, name
            ))
        })
    };

    let text = format!(
        "The {} {} {} is a {} {} with {} doors. \
         Category: {}. \
         It has an MSRP of ${}. \
         Engine: {} HP, {} cylinders, {}. \
         Transmission: {}, Driven Wheels: {}. \
         Fuel Economy: {} City MPG / {} Highway MPG. \
         Popularity score: {}.",
        field("year")?,
        field("make")?,
        field("model")?,
        field("vehicle_size")?,
        field("vehicle_style")?,
        field("number_of_doors")?,
        field("market_category")?,
        field("msrp")?,
        field("engine_hp")?,
        field("engine_cylinders")?,
        field("engine_fuel_type")?,
        field("transmission_type")?,
        field("driven_wheels")?,
        field("city_mpg")?,
        field("highway_mpg")?,
        field("popularity")?,
    );

    Ok(Document {
        id: id.into(),
        text,
        metadata: record.fields.clone(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A complete raw row for the 2017 Toyota 86, with source-style headers.
    pub(crate) fn toyota_86(position: usize) -> RawRecord {
        RawRecord::new(
            position,
            [
                ("Make", MetaValue::parse("Toyota")),
                ("Model", MetaValue::parse("86")),
                ("Year", MetaValue::parse("2017")),
                ("Engine Fuel Type", MetaValue::parse("premium unleaded (required)")),
                ("Engine HP", MetaValue::parse("205.0")),
                ("Engine Cylinders", MetaValue::parse("4.0")),
                ("Transmission Type", MetaValue::parse("MANUAL")),
                ("Driven_Wheels", MetaValue::parse("rear wheel drive")),
                ("Number of Doors", MetaValue::parse("2.0")),
                ("Market Category", MetaValue::parse("Performance")),
                ("Vehicle Size", MetaValue::parse("Compact")),
                ("Vehicle Style", MetaValue::parse("Coupe")),
                ("highway MPG", MetaValue::parse("30")),
                ("city mpg", MetaValue::parse("21")),
                ("Popularity", MetaValue::parse("2031")),
                ("MSRP", MetaValue::parse("26255")),
            ],
        )
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Engine HP"), "engine_hp");
        assert_eq!(normalize_key("  highway   MPG "), "highway_mpg");
        assert_eq!(normalize_key("Driven_Wheels"), "driven_wheels");
    }

    #[test]
    fn test_build_renders_template() {
        let record = normalize_record(toyota_86(0), MissingValuePolicy::Reject).unwrap();
        let doc = build_document("0", &record).unwrap();
        assert!(doc.text.starts_with("The 2017 Toyota 86 is a Compact Coupe with 2 doors."));
        assert!(doc.text.contains("205 HP, 4 cylinders"));
        assert!(doc.text.contains("It has an MSRP of $26255."));
        assert!(doc.text.contains("Transmission: MANUAL, Driven Wheels: rear wheel drive."));
        assert!(doc.text.ends_with("Popularity score: 2031."));
        assert_eq!(doc.metadata.get("year"), Some(&MetaValue::Int(2017)));
        assert_eq!(doc.metadata.len(), REQUIRED_FIELDS.len());
    }

    #[test]
    fn test_build_is_deterministic() {
        let record = normalize_record(toyota_86(0), MissingValuePolicy::Warn).unwrap();
        assert_eq!(
            build_document("0", &record).unwrap(),
            build_document("0", &record).unwrap()
        );
    }

    #[test]
    fn test_missing_value_substituted() {
        let mut raw = toyota_86(3);
        raw.fields.retain(|(k, _)| k != "Market Category");
        raw.fields.push(("Market Category".into(), None));
        let record = normalize_record(raw, MissingValuePolicy::Substitute).unwrap();
        let doc = build_document("3", &record).unwrap();
        assert!(doc.text.contains("Category: Unknown."));
        assert_eq!(doc.metadata["market_category"], MetaValue::from(UNKNOWN));
    }

    #[test]
    fn test_missing_value_rejected() {
        let mut raw = toyota_86(7);
        raw.fields.push(("Engine HP".into(), None));
        raw.fields.retain(|(k, v)| k != "Engine HP" || v.is_none());
        let err = normalize_record(raw, MissingValuePolicy::Reject).unwrap_err();
        assert!(matches!(err, RagError::Validation(ref m) if m.contains("engine_hp")));
    }

    #[test]
    fn test_missing_column_is_validation_error() {
        let mut raw = toyota_86(1);
        raw.fields.retain(|(k, _)| k != "MSRP");
        let err = normalize_record(raw, MissingValuePolicy::Substitute).unwrap_err();
        assert!(matches!(err, RagError::Validation(ref m) if m.contains("msrp")));
    }

    #[test]
    fn test_extra_columns_kept_in_metadata() {
        let mut raw = toyota_86(0);
        raw.fields.push(("Trim Level".into(), MetaValue::parse("Base")));
        let record = normalize_record(raw, MissingValuePolicy::Warn).unwrap();
        let doc = build_document("0", &record).unwrap();
        assert_eq!(doc.metadata["trim_level"], MetaValue::from("Base"));
    }

    #[test]
    fn test_duplicate_canonical_key_rejected() {
        let mut raw = toyota_86(4);
        raw.fields.push(("engine_hp".into(), MetaValue::parse("300")));
        let err = normalize_record(raw, MissingValuePolicy::Substitute).unwrap_err();
        assert!(
            matches!(err, RagError::Validation(ref m) if m.contains("'engine_hp'") && m.contains("record 4")),
            "{}",
            err
        );
    }
}
