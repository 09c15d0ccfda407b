// ambari-state/src/fetch/descriptor.rs

use crate::error::FetchError;
use crate::sync::Resource;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Which field list a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Every field the mappers know about; used on the first cycle.
    Full,
    /// Only the fields that change at runtime.
    Update,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::Full => f.write_str("full"),
            FetchMode::Update => f.write_str("update"),
        }
    }
}

/// How to build the request for one polled resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub resource: Resource,
    /// Path below the API root with `{placeholder}`s
    pub template: String,
    pub full_fields: Vec<String>,
    pub update_fields: Vec<String>,
    pub minimal_response: bool,
}

impl ResourceDescriptor {
    pub fn for_resource(resource: Resource) -> Self {
        Self {
            resource,
            template: resource.url_template().to_string(),
            full_fields: owned(resource.full_fields()),
            update_fields: owned(resource.update_fields()),
            minimal_response: resource.minimal_response(),
        }
    }

    pub fn fields(&self, mode: FetchMode) -> &[String] {
        match mode {
            FetchMode::Full => &self.full_fields,
            FetchMode::Update => &self.update_fields,
        }
    }

    /// Fill the placeholders and append the `fields=` query for `mode`.
    pub fn render(
        &self,
        vars: &BTreeMap<String, String>,
        mode: FetchMode,
    ) -> Result<String, FetchError> {
        let mut path = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find('{') {
            path.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                return Err(FetchError::Placeholder {
                    template: self.template.clone(),
                    placeholder: after.to_string(),
                });
            };
            let name = &after[..end];
            let value = vars.get(name).ok_or_else(|| FetchError::Placeholder {
                template: self.template.clone(),
                placeholder: name.to_string(),
            })?;
            path.push_str(value);
            rest = &after[end + 1..];
        }
        path.push_str(rest);

        let mut query = Vec::new();
        let fields = self.fields(mode);
        if !fields.is_empty() {
            query.push(format!("fields={}", fields.join(",")));
        }
        if self.minimal_response {
            query.push("minimal_response=true".to_string());
        }
        if !query.is_empty() {
            path.push(if path.contains('?') { '&' } else { '?' });
            path.push_str(&query.join("&"));
        }
        Ok(path)
    }
}

fn owned(fields: Vec<&str>) -> Vec<String> {
    fields.into_iter().map(str::to_string).collect()
}
