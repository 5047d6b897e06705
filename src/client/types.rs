//! Type definitions for the business-administration backend.
//!
//! The backend tables are exposed by PostgREST, so rows travel as plain JSON
//! objects. Rather than one struct per table, every row is a [`ResourceRecord`]
//! and the per-table rules (path, required fields, search fields, relations)
//! live in a static [`ResourceSchema`].
//!
//! ## Key Types
//!
//! - [`ResourceRecord`] - One backend row, keyed by column name
//! - [`Resource`] - The catalogue of tables this crate knows about
//! - [`ResourceSchema`] - Client-side rules for a single table
//! - [`ListOptions`] - Ordering and row caps for filtered listings

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::client::error::ResourceError;

/// One row of a backend table.
///
/// Only `id` has a fixed meaning: it is assigned by the server and never sent
/// back on writes. Every other field is whatever the table defines, including
/// nested objects when a relation was embedded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceRecord(Map<String, Value>);

impl ResourceRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Server-assigned identifier, if the row carries one.
    pub fn id(&self) -> Option<i64> {
        self.0.get("id").and_then(Value::as_i64)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Embedded relation, present only when the row was fetched with expansion.
    pub fn nested(&self, relation: &str) -> Option<&Map<String, Value>> {
        self.0.get(relation).and_then(Value::as_object)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// True when the field exists, is not null and is not a blank string.
    pub fn has_value(&self, field: &str) -> bool {
        match self.0.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ResourceRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for ResourceRecord {
    type Error = ResourceError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ResourceError::Decode(format!(
                "expected a JSON object, got {}",
                other
            ))),
        }
    }
}

/// A foreign-key relation PostgREST can embed into the parent row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// Name of the related table as PostgREST resolves it
    pub name: &'static str,
    /// Columns of the related table to embed
    pub fields: &'static [&'static str],
}

impl Relation {
    /// `relation(field1,field2)` as used inside a `select` parameter.
    pub fn select_clause(&self) -> String {
        format!("{}({})", self.name, self.fields.join(","))
    }
}

/// Client-side rules for one backend table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSchema {
    /// Human readable singular name used in log messages
    pub label: &'static str,
    /// Path segment under the PostgREST base URL
    pub path: &'static str,
    /// Fields that must be present and non-empty on create
    pub required: &'static [&'static str],
    /// Text columns matched by `search`
    pub search_fields: &'static [&'static str],
    /// Relations embedded when expansion is requested
    pub relations: &'static [Relation],
    /// Column filled with the current timestamp on create when absent
    pub created_at_field: Option<&'static str>,
}

impl ResourceSchema {
    /// Required fields missing from `fields`, in schema order.
    pub fn missing_required(&self, fields: &ResourceRecord) -> Vec<&'static str> {
        self.required
            .iter()
            .copied()
            .filter(|field| !fields.has_value(field))
            .collect()
    }

    /// `*` followed by one `relation(fields)` clause per configured relation.
    pub fn embed_select(&self) -> String {
        let mut columns = vec!["*".to_string()];
        columns.extend(self.relations.iter().map(Relation::select_clause));
        columns.join(",")
    }
}

/// The tables exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Clients,
    Quotations,
    Projects,
    Services,
    Payments,
    Locations,
}

static CLIENTS: ResourceSchema = ResourceSchema {
    label: "client",
    path: "cliente",
    required: &["nombre"],
    search_fields: &["nombre"],
    relations: &[],
    created_at_field: None,
};

static QUOTATIONS: ResourceSchema = ResourceSchema {
    label: "quotation",
    path: "cotizacion",
    required: &["id_cliente"],
    search_fields: &["numero", "descripcion"],
    relations: &[
        Relation {
            name: "cliente",
            fields: &["id", "nombre"],
        },
        Relation {
            name: "proyecto",
            fields: &["id", "nombre_proyecto"],
        },
    ],
    created_at_field: Some("fecha_creacion"),
};

static PROJECTS: ResourceSchema = ResourceSchema {
    label: "project",
    path: "proyecto",
    required: &["nombre_proyecto"],
    search_fields: &["nombre_proyecto", "descripcion", "ubicacion"],
    relations: &[],
    created_at_field: None,
};

static SERVICES: ResourceSchema = ResourceSchema {
    label: "service",
    path: "servicio",
    required: &["concepto"],
    search_fields: &["concepto", "descripcion"],
    relations: &[],
    created_at_field: None,
};

static PAYMENTS: ResourceSchema = ResourceSchema {
    label: "payment",
    path: "pago",
    required: &["id_cliente", "monto"],
    search_fields: &["comprobante", "moneda"],
    relations: &[
        Relation {
            name: "cliente",
            fields: &["id", "nombre"],
        },
        Relation {
            name: "cotizacion",
            fields: &["id", "numero", "total"],
        },
    ],
    created_at_field: None,
};

static LOCATIONS: ResourceSchema = ResourceSchema {
    label: "location",
    path: "ubicacion",
    required: &["provincia"],
    search_fields: &["provincia", "distrito", "distritomunicipal"],
    relations: &[],
    created_at_field: None,
};

impl Resource {
    pub const ALL: [Resource; 6] = [
        Resource::Clients,
        Resource::Quotations,
        Resource::Projects,
        Resource::Services,
        Resource::Payments,
        Resource::Locations,
    ];

    pub fn schema(&self) -> &'static ResourceSchema {
        match self {
            Resource::Clients => &CLIENTS,
            Resource::Quotations => &QUOTATIONS,
            Resource::Projects => &PROJECTS,
            Resource::Services => &SERVICES,
            Resource::Payments => &PAYMENTS,
            Resource::Locations => &LOCATIONS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Clients => "clients",
            Resource::Quotations => "quotations",
            Resource::Projects => "projects",
            Resource::Services => "services",
            Resource::Payments => "payments",
            Resource::Locations => "locations",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = ResourceError;

    /// Accepts the English name or the backend path, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Resource::ALL
            .into_iter()
            .find(|r| r.name() == wanted || r.schema().path == wanted)
            .ok_or_else(|| ResourceError::UnknownResource(s.to_string()))
    }
}

/// Sort direction for `order=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Ordering and row cap for [`list_by`](crate::client::ResourceClient::list_by).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub order_by: Option<(String, SortOrder)>,
    pub limit: Option<u32>,
}

impl ListOptions {
    pub fn newest_first(field: &str) -> Self {
        Self {
            order_by: Some((field.to_string(), SortOrder::Desc)),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ResourceRecord {
        ResourceRecord::try_from(value).unwrap()
    }

    #[test]
    fn test_resource_from_name_or_path() {
        assert_eq!("clients".parse::<Resource>().unwrap(), Resource::Clients);
        assert_eq!("Cotizacion".parse::<Resource>().unwrap(), Resource::Quotations);
        assert!(matches!(
            "invoices".parse::<Resource>(),
            Err(ResourceError::UnknownResource(_))
        ));
    }

    #[test]
    fn test_missing_required_treats_blank_and_null_as_missing() {
        let schema = Resource::Payments.schema();
        let fields = record(json!({"id_cliente": null, "monto": 0}));
        assert_eq!(schema.missing_required(&fields), vec!["id_cliente"]);

        let fields = record(json!({"nombre": "   "}));
        assert_eq!(Resource::Clients.schema().missing_required(&fields), vec!["nombre"]);
    }

    #[test]
    fn test_embed_select_lists_every_relation() {
        assert_eq!(
            Resource::Quotations.schema().embed_select(),
            "*,cliente(id,nombre),proyecto(id,nombre_proyecto)"
        );
        assert_eq!(
            Resource::Payments.schema().embed_select(),
            "*,cliente(id,nombre),cotizacion(id,numero,total)"
        );
        assert_eq!(Resource::Clients.schema().embed_select(), "*");
    }

    #[test]
    fn test_record_rejects_non_objects() {
        assert!(ResourceRecord::try_from(json!([1, 2])).is_err());
        assert_eq!(record(json!({"id": 3})).id(), Some(3));
    }
}
