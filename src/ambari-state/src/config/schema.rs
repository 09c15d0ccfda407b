// ambari-state/src/config/schema.rs

//! Declarative mapping from nested payload items to flat record fields.
//!
//! Every mapper describes its record families as a [`RecordSchema`]: which
//! store field is read from which dotted source path, which fields make up
//! the fingerprint, and how the id is assembled. Schemas are validated once
//! when the mapper is built, so a typo in a path is a startup error and not
//! a silently empty field.

use crate::config::fingerprint::{fingerprint_values, Fingerprint};
use crate::error::{FieldMapError, MissingField};
use crate::store::{Fields, RecordType};
use serde_json::Value;
use std::collections::HashSet;

/// `store_field <- source.path` with its role in change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: String,
    pub path: String,
    pub fingerprint: bool,
    pub required: bool,
}

impl FieldSpec {
    /// A field every item must carry; items without it are skipped.
    pub fn required(field: &str, path: &str) -> Self {
        Self {
            field: field.to_string(),
            path: path.to_string(),
            fingerprint: false,
            required: true,
        }
    }

    /// A field that is copied when present and left untouched when absent.
    pub fn optional(field: &str, path: &str) -> Self {
        Self {
            required: false,
            ..Self::required(field, path)
        }
    }

    /// Mark the field as part of the fingerprint.
    pub fn fingerprinted(mut self) -> Self {
        self.fingerprint = true;
        self
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.')
    }

    /// Walk the dotted path; numeric segments index into arrays.
    pub fn resolve<'a>(&self, item: &'a Value) -> Option<&'a Value> {
        self.segments()
            .try_fold(item, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(values) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| values.get(index)),
                _ => None,
            })
    }
}

/// A validated list of [`FieldSpec`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    specs: Vec<FieldSpec>,
}

impl FieldMap {
    pub fn new(specs: Vec<FieldSpec>) -> Result<Self, FieldMapError> {
        let mut seen = HashSet::new();
        for spec in &specs {
            if spec.path.is_empty() || spec.segments().any(str::is_empty) {
                return Err(FieldMapError::EmptyPath(spec.field.clone()));
            }
            if !seen.insert(spec.field.as_str()) {
                return Err(FieldMapError::DuplicateField(spec.field.clone()));
            }
        }
        if !specs.iter().any(|spec| spec.fingerprint) {
            return Err(FieldMapError::NoFingerprintFields);
        }
        Ok(Self { specs })
    }

    pub fn specs(&self) -> &[FieldSpec] {
        &self.specs
    }

    pub fn spec(&self, field: &str) -> Option<&FieldSpec> {
        self.specs.iter().find(|spec| spec.field == field)
    }

    /// Store field names that feed the fingerprint, in declaration order.
    pub fn fingerprint_fields(&self) -> impl Iterator<Item = &str> {
        self.specs
            .iter()
            .filter(|spec| spec.fingerprint)
            .map(|spec| spec.field.as_str())
    }

    /// Pull the mapped fields out of one payload item.
    ///
    /// A required field that is absent or `null` fails the item. Absent
    /// optional fields are left out of the result so a merge keeps the
    /// previously stored value.
    pub fn extract(&self, item: &Value) -> Result<Fields, MissingField> {
        let mut fields = Fields::new();
        for spec in &self.specs {
            match spec.resolve(item) {
                Some(Value::Null) | None if spec.required => {
                    return Err(MissingField {
                        field: spec.field.clone(),
                        path: spec.path.clone(),
                        id: None,
                    });
                }
                Some(value) => {
                    fields.insert(spec.field.clone(), value.clone());
                }
                None => {}
            }
        }
        Ok(fields)
    }

    pub fn fingerprint(&self, fields: &Fields) -> Fingerprint {
        self.fingerprint_with(fields, &[])
    }

    /// Fingerprint over the declared fingerprint fields plus `extra` derived
    /// fields, in that order.
    pub fn fingerprint_with(&self, fields: &Fields, extra: &[&str]) -> Fingerprint {
        fingerprint_values(
            self.fingerprint_fields()
                .chain(extra.iter().copied())
                .map(|name| fields.get(name)),
        )
    }
}

/// How a record id is assembled from extracted fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdTemplate {
    fields: Vec<String>,
    separator: &'static str,
}

impl IdTemplate {
    pub fn new(fields: &[&str], separator: &'static str) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            separator,
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Join the id fields; `None` if one is missing or not a scalar.
    pub fn render(&self, fields: &Fields) -> Option<String> {
        let parts = self
            .fields
            .iter()
            .map(|name| match fields.get(name)? {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect::<Option<Vec<String>>>()?;
        Some(parts.join(self.separator))
    }
}

/// A payload item reduced to what the store and the diff need.
#[derive(Debug, Clone, PartialEq)]
pub struct Identified {
    pub id: String,
    pub fields: Fields,
    pub fingerprint: Fingerprint,
}

/// Field map and id scheme of one record family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    record_type: RecordType,
    fields: FieldMap,
    id: IdTemplate,
}

impl RecordSchema {
    pub fn new(
        record_type: RecordType,
        fields: FieldMap,
        id: IdTemplate,
    ) -> Result<Self, FieldMapError> {
        if id.fields().is_empty() {
            return Err(FieldMapError::EmptyIdTemplate);
        }
        for name in id.fields() {
            match fields.spec(name) {
                Some(spec) if spec.required => {}
                _ => return Err(FieldMapError::IdFieldNotRequired(name.clone())),
            }
        }
        Ok(Self {
            record_type,
            fields,
            id,
        })
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.fields
    }

    pub fn id_template(&self) -> &IdTemplate {
        &self.id
    }

    /// Extract fields, derive the id and compute the fingerprint.
    ///
    /// When another required field is missing but the id fields are all
    /// present, the error still names the id so the known record is kept.
    pub fn identify(&self, item: &Value) -> Result<Identified, MissingField> {
        let fields = self.fields.extract(item).map_err(|mut err| {
            err.id = self.id_of(item);
            err
        })?;
        let id = self.id.render(&fields).ok_or_else(|| {
            let name = self.id.fields().join("+");
            MissingField {
                field: name.clone(),
                path: name,
                id: None,
            }
        })?;
        let fingerprint = self.fields.fingerprint(&fields);
        Ok(Identified {
            id,
            fields,
            fingerprint,
        })
    }

    /// Render the id from the id fields alone.
    pub fn id_of(&self, item: &Value) -> Option<String> {
        let mut fields = Fields::new();
        for name in self.id.fields() {
            let value = self.fields.spec(name)?.resolve(item)?;
            fields.insert(name.clone(), value.clone());
        }
        self.id.render(&fields)
    }
}
