use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::client::{
    config::EndpointConfig,
    error::{ResourceError, ResourceResult},
    query::{contains_pattern, is_reserved_key, list_contains_pattern, Condition, FilterOperator, Query},
    types::*,
};

const PREFER: &str = "Prefer";
const RETURN_REPRESENTATION: &str = "return=representation";
const QUOTATION_LINK: &str = "id_cotizacion";

/// Configuration plus the HTTP connection pool, shared by every resource.
#[derive(Debug, Clone)]
pub struct PostgrestBackend {
    config: Arc<EndpointConfig>,
    client: Client,
}

impl PostgrestBackend {
    pub fn new(config: EndpointConfig) -> ResourceResult<Self> {
        let client = config.http_client()?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn resource(&self, resource: Resource) -> ResourceClient {
        ResourceClient {
            resource,
            schema: resource.schema(),
            config: Arc::clone(&self.config),
            client: self.client.clone(),
        }
    }

    /// Links a payment to a quotation by setting the payment's `id_cotizacion`.
    ///
    /// Both rows must exist. A missing quotation fails before the payment is
    /// touched; a missing payment fails before any PATCH is sent.
    pub async fn assign_payment(
        &self,
        payment_id: i64,
        quotation_id: i64,
    ) -> ResourceResult<ResourceRecord> {
        self.resource(Resource::Quotations)
            .get_by_id(quotation_id)
            .await?;

        let mut fields = ResourceRecord::new();
        fields.insert(QUOTATION_LINK, quotation_id);
        let payment = self
            .resource(Resource::Payments)
            .update(payment_id, fields)
            .await?;

        tracing::info!("Assigned payment {} to quotation {}", payment_id, quotation_id);
        Ok(payment)
    }
}

/// CRUD accessor for one PostgREST table.
pub struct ResourceClient {
    resource: Resource,
    schema: &'static ResourceSchema,
    config: Arc<EndpointConfig>,
    client: Client,
}

impl ResourceClient {
    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn schema(&self) -> &'static ResourceSchema {
        self.schema
    }

    fn url(&self, query: &Query) -> ResourceResult<String> {
        Ok(query.url(&self.config.resource_url(self.schema.path)?))
    }

    fn report(&self, action: &str, error: &ResourceError) {
        if error.is_not_found() {
            tracing::warn!("{}", error);
        } else {
            tracing::error!("Error trying to {} {} records: {}", action, self.schema.label, error);
        }
    }

    async fn send(&self, request: RequestBuilder) -> ResourceResult<Response> {
        let response = request.send().await?;

        let status = response.status();
        tracing::debug!("{} response status: {}", self.schema.path, status);

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(ResourceError::Http { status, body });
        }

        Ok(response)
    }

    /// Decodes a PostgREST body: an array of rows, a single row, or nothing.
    async fn rows(&self, response: Response) -> ResourceResult<Vec<ResourceRecord>> {
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Value>(&body)? {
            Value::Array(items) => items.into_iter().map(ResourceRecord::try_from).collect(),
            Value::Object(map) => Ok(vec![map.into()]),
            other => Err(ResourceError::Decode(format!(
                "expected rows from {}, got {}",
                self.schema.path, other
            ))),
        }
    }

    async fn fetch(&self, query: &Query) -> ResourceResult<Vec<ResourceRecord>> {
        let url = self.url(query)?;
        tracing::debug!("GET {}", url);
        let response = self.send(self.client.get(&url)).await?;
        self.rows(response).await
    }

    async fn find(&self, id: i64) -> ResourceResult<ResourceRecord> {
        self.fetch(&Query::new().eq("id", id))
            .await?
            .into_iter()
            .next()
            .ok_or(ResourceError::NotFound {
                resource: self.schema.label,
                id,
            })
    }

    async fn insert(&self, fields: &ResourceRecord) -> ResourceResult<ResourceRecord> {
        let url = self.url(&Query::new())?;
        tracing::debug!("POST {}", url);
        let request = self
            .client
            .post(&url)
            .header(PREFER, RETURN_REPRESENTATION)
            .json(fields);
        let response = self.send(request).await?;

        self.rows(response).await?.into_iter().next().ok_or_else(|| {
            ResourceError::Decode(format!(
                "{} returned no representation for the created row",
                self.schema.path
            ))
        })
    }

    async fn patch(&self, id: i64, fields: &ResourceRecord) -> ResourceResult<ResourceRecord> {
        let url = self.url(&Query::new().eq("id", id))?;
        tracing::debug!("PATCH {}", url);
        let request = self
            .client
            .patch(&url)
            .header(PREFER, RETURN_REPRESENTATION)
            .json(fields);
        let response = self.send(request).await?;

        // Zero rows back means the row vanished after the existence check.
        self.rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or(ResourceError::NotFound {
                resource: self.schema.label,
                id,
            })
    }

    async fn remove(&self, id: i64) -> ResourceResult<()> {
        let url = self.url(&Query::new().eq("id", id))?;
        tracing::debug!("DELETE {}", url);
        self.send(self.client.delete(&url)).await?;
        Ok(())
    }

    /// Every row of the table. With `embed`, each configured relation is
    /// resolved server-side into a nested object.
    pub async fn list_all(&self, embed: bool) -> ResourceResult<Vec<ResourceRecord>> {
        let mut query = Query::new();
        if embed {
            query = query.select(&self.schema.embed_select());
        }

        let records = self
            .fetch(&query)
            .await
            .inspect_err(|e| self.report("list", e))?;
        tracing::debug!("Retrieved {} {} records", records.len(), self.schema.label);
        Ok(records)
    }

    /// Rows whose `field` equals `value`, optionally ordered and capped.
    pub async fn list_by(
        &self,
        field: &str,
        value: impl fmt::Display,
        options: &ListOptions,
    ) -> ResourceResult<Vec<ResourceRecord>> {
        self.list_where(field, FilterOperator::Eq, value, options).await
    }

    /// Rows matching `field=<operator>.<value>`, optionally ordered and capped.
    ///
    /// `field` must be a column name; PostgREST modifier keys such as `order`
    /// or `select` are rejected before any request.
    pub async fn list_where(
        &self,
        field: &str,
        operator: FilterOperator,
        value: impl fmt::Display,
        options: &ListOptions,
    ) -> ResourceResult<Vec<ResourceRecord>> {
        if is_reserved_key(field) {
            let error = ResourceError::ReservedField(field.to_string());
            self.report("list", &error);
            return Err(error);
        }

        let mut query = Query::new().filter(field, operator, value);
        if let Some((column, order)) = &options.order_by {
            query = query.order(column, *order);
        }
        if let Some(limit) = options.limit {
            query = query.limit(limit);
        }

        self.fetch(&query)
            .await
            .inspect_err(|e| self.report("list", e))
    }

    /// Fetches at most one row to confirm the table is reachable. Failures are
    /// returned without being logged.
    pub async fn ping(&self) -> ResourceResult<()> {
        self.fetch(&Query::new().limit(1)).await.map(|_| ())
    }

    /// The row with this `id`, or [`ResourceError::NotFound`].
    pub async fn get_by_id(&self, id: i64) -> ResourceResult<ResourceRecord> {
        self.find(id).await.inspect_err(|e| self.report("fetch", e))
    }

    /// Inserts a row after checking the schema's required fields locally.
    ///
    /// A missing required field fails without any request. Any `id` in
    /// `fields` is dropped; the server assigns it.
    pub async fn create(&self, mut fields: ResourceRecord) -> ResourceResult<ResourceRecord> {
        if fields.remove("id").is_some() {
            tracing::debug!("Dropping client-supplied id from new {}", self.schema.label);
        }

        if let Some(field) = self.schema.missing_required(&fields).first().copied() {
            let error = ResourceError::Validation {
                resource: self.schema.label,
                field,
            };
            self.report("create", &error);
            return Err(error);
        }

        if let Some(column) = self.schema.created_at_field {
            if !fields.has_value(column) {
                fields.insert(column, chrono::Local::now().to_rfc3339());
            }
        }

        let created = self
            .insert(&fields)
            .await
            .inspect_err(|e| self.report("create", e))?;

        tracing::info!(
            "Created {} with ID {}",
            self.schema.label,
            created.id().map_or_else(|| "?".to_string(), |id| id.to_string())
        );
        Ok(created)
    }

    /// Sparse update: only the supplied fields change.
    ///
    /// Existence is checked with a GET first, so a missing row is reported as
    /// [`ResourceError::NotFound`]. An empty `fields` still issues the PATCH.
    pub async fn update(&self, id: i64, mut fields: ResourceRecord) -> ResourceResult<ResourceRecord> {
        self.get_by_id(id).await?;

        if fields.remove("id").is_some() {
            tracing::debug!("Ignoring id in update payload for {} {}", self.schema.label, id);
        }

        let updated = self
            .patch(id, &fields)
            .await
            .inspect_err(|e| self.report("update", e))?;

        tracing::info!("Updated {} {}", self.schema.label, id);
        Ok(updated)
    }

    /// Deletes the row after confirming it exists; no DELETE is sent otherwise.
    pub async fn delete(&self, id: i64) -> ResourceResult<()> {
        self.get_by_id(id).await?;

        self.remove(id)
            .await
            .inspect_err(|e| self.report("delete", e))?;

        tracing::info!("Deleted {} {}", self.schema.label, id);
        Ok(())
    }

    /// Case-insensitive substring search over the schema's text columns.
    ///
    /// A missing or blank term matches every row with a single unfiltered GET.
    pub async fn search(&self, term: Option<&str>) -> ResourceResult<Vec<ResourceRecord>> {
        let term = term.map(str::trim).unwrap_or_default();

        let query = if term.is_empty() {
            tracing::debug!("Empty search term for {}, listing all rows", self.schema.label);
            Query::new()
        } else {
            match self.schema.search_fields {
                [] => Query::new(),
                [field] => Query::new().ilike(field, &contains_pattern(term)),
                fields => {
                    let pattern = list_contains_pattern(term);
                    let conditions: Vec<Condition> = fields
                        .iter()
                        .map(|field| Condition::ilike(field, &pattern))
                        .collect();
                    Query::new().or(&conditions)
                }
            }
        };

        let records = self
            .fetch(&query)
            .await
            .inspect_err(|e| self.report("search", e))?;
        tracing::debug!(
            "Search for {:?} matched {} {} records",
            term,
            records.len(),
            self.schema.label
        );
        Ok(records)
    }
}
