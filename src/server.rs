use std::future::Future;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::*,
    schemars,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use serde_json::{json, Map, Value};

use crate::client::{
    query::FilterOperator, EndpointConfig, ListOptions, PostgrestBackend, Resource, ResourceClient,
    ResourceError, ResourceRecord, SortOrder,
};

// Parameter structs for tools
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ListRecordsParams {
    /// Resource name, e.g. "clients" or "cotizacion"
    pub resource: String,
    #[serde(default)]
    pub embed: bool,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct RecordIdParams {
    pub resource: String,
    pub id: i64,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct CreateRecordParams {
    pub resource: String,
    pub fields: Map<String, Value>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct UpdateRecordParams {
    pub resource: String,
    pub id: i64,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SearchRecordsParams {
    pub resource: String,
    #[serde(default)]
    pub term: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ListRelatedParams {
    pub resource: String,
    /// Column to filter on, e.g. "id_cliente"
    pub field: String,
    pub value: Value,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub descending: bool,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AssignPaymentParams {
    pub payment_id: i64,
    pub quotation_id: i64,
}

fn render(value: &Value) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn failure(action: &str, error: &ResourceError) -> Result<CallToolResult, McpError> {
    let error = json!({
        "error": format!("Failed to {}", action),
        "kind": error.kind(),
        "details": error.to_string()
    });
    Ok(CallToolResult::error(vec![Content::text(error.to_string())]))
}

fn records_json(resource: &ResourceClient, records: Vec<ResourceRecord>) -> Value {
    json!({
        "resource": resource.resource().name(),
        "count": records.len(),
        "records": records
    })
}

/// `null` can only be matched with `is`; everything else compares with `eq`.
fn filter_for(value: &Value) -> (FilterOperator, String) {
    match value {
        Value::Null => (FilterOperator::Is, "null".to_string()),
        Value::String(s) => (FilterOperator::Eq, s.clone()),
        other => (FilterOperator::Eq, other.to_string()),
    }
}

#[derive(Clone)]
pub struct OrgmMcpServer {
    backend: PostgrestBackend,
    tool_router: ToolRouter<OrgmMcpServer>,
}

#[tool_router]
impl OrgmMcpServer {
    pub fn new(backend: PostgrestBackend) -> Self {
        Self {
            backend,
            tool_router: Self::tool_router(),
        }
    }

    pub fn from_config(config: EndpointConfig) -> Result<Self, ResourceError> {
        Ok(Self::new(PostgrestBackend::new(config)?))
    }

    pub fn backend(&self) -> &PostgrestBackend {
        &self.backend
    }

    fn resource(&self, name: &str) -> Result<ResourceClient, ResourceError> {
        let resource: Resource = name.parse()?;
        Ok(self.backend.resource(resource))
    }

    /// Reads at most one client row to confirm the backend answers.
    pub async fn test_api_access(&self) -> Result<(), anyhow::Error> {
        let clients = self.backend.resource(Resource::Clients);
        tracing::debug!("Testing API access by reading the {} table...", clients.schema().path);

        match clients.ping().await {
            Ok(()) => {
                tracing::info!("API access test successful");
                Ok(())
            }
            Err(e) => {
                tracing::error!("API access test failed: {}", e);
                Err(e.into())
            }
        }
    }

    #[tool(description = "List the available resources with their required and searchable fields")]
    pub async fn list_resources(&self) -> Result<CallToolResult, McpError> {
        let resources: Vec<Value> = Resource::ALL
            .iter()
            .map(|resource| {
                let schema = resource.schema();
                json!({
                    "name": resource.name(),
                    "path": schema.path,
                    "required": schema.required,
                    "search_fields": schema.search_fields,
                    "relations": schema.relations.iter().map(|r| r.select_clause()).collect::<Vec<_>>()
                })
            })
            .collect();

        render(&json!({ "resources": resources }))
    }

    #[tool(description = "List every record of a resource, optionally embedding related records")]
    pub async fn list_records(
        &self,
        Parameters(params): Parameters<ListRecordsParams>,
    ) -> Result<CallToolResult, McpError> {
        let client = match self.resource(&params.resource) {
            Ok(client) => client,
            Err(e) => return failure("list records", &e),
        };

        match client.list_all(params.embed).await {
            Ok(records) => render(&records_json(&client, records)),
            Err(e) => failure("list records", &e),
        }
    }

    #[tool(description = "Get a single record by its ID")]
    pub async fn get_record(
        &self,
        Parameters(params): Parameters<RecordIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let client = match self.resource(&params.resource) {
            Ok(client) => client,
            Err(e) => return failure("get record", &e),
        };

        match client.get_by_id(params.id).await {
            Ok(record) => render(&json!(record)),
            Err(e) => failure("get record", &e),
        }
    }

    #[tool(description = "Create a record; required fields are checked before anything is sent")]
    pub async fn create_record(
        &self,
        Parameters(params): Parameters<CreateRecordParams>,
    ) -> Result<CallToolResult, McpError> {
        let client = match self.resource(&params.resource) {
            Ok(client) => client,
            Err(e) => return failure("create record", &e),
        };

        match client.create(params.fields.into()).await {
            Ok(record) => render(&json!({
                "created": record,
                "message": format!(
                    "Created {} with ID {}",
                    client.schema().label,
                    record.id().map_or_else(|| "?".to_string(), |id| id.to_string())
                )
            })),
            Err(e) => failure("create record", &e),
        }
    }

    #[tool(description = "Update only the given fields of an existing record")]
    pub async fn update_record(
        &self,
        Parameters(params): Parameters<UpdateRecordParams>,
    ) -> Result<CallToolResult, McpError> {
        let client = match self.resource(&params.resource) {
            Ok(client) => client,
            Err(e) => return failure("update record", &e),
        };

        match client.update(params.id, params.fields.into()).await {
            Ok(record) => render(&json!({ "updated": record })),
            Err(e) => failure("update record", &e),
        }
    }

    #[tool(description = "Delete a record by its ID")]
    pub async fn delete_record(
        &self,
        Parameters(params): Parameters<RecordIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let client = match self.resource(&params.resource) {
            Ok(client) => client,
            Err(e) => return failure("delete record", &e),
        };

        match client.delete(params.id).await {
            Ok(()) => render(&json!({
                "deleted": true,
                "message": format!("Deleted {} {}", client.schema().label, params.id)
            })),
            Err(e) => failure("delete record", &e),
        }
    }

    #[tool(description = "Case-insensitive text search across a resource's searchable fields; an empty term returns everything")]
    pub async fn search_records(
        &self,
        Parameters(params): Parameters<SearchRecordsParams>,
    ) -> Result<CallToolResult, McpError> {
        let client = match self.resource(&params.resource) {
            Ok(client) => client,
            Err(e) => return failure("search records", &e),
        };

        match client.search(params.term.as_deref()).await {
            Ok(records) => render(&records_json(&client, records)),
            Err(e) => failure("search records", &e),
        }
    }

    #[tool(description = "List records whose field equals a value, e.g. the quotations of one client, newest first")]
    pub async fn list_related(
        &self,
        Parameters(params): Parameters<ListRelatedParams>,
    ) -> Result<CallToolResult, McpError> {
        let client = match self.resource(&params.resource) {
            Ok(client) => client,
            Err(e) => return failure("list related records", &e),
        };

        let order = if params.descending { SortOrder::Desc } else { SortOrder::Asc };
        let options = ListOptions {
            order_by: params.order_by.map(|column| (column, order)),
            limit: params.limit,
        };

        let (operator, value) = filter_for(&params.value);
        match client
            .list_where(&params.field, operator, value, &options)
            .await
        {
            Ok(records) => render(&records_json(&client, records)),
            Err(e) => failure("list related records", &e),
        }
    }

    #[tool(description = "Assign a payment to a quotation; both records must exist")]
    pub async fn assign_payment(
        &self,
        Parameters(params): Parameters<AssignPaymentParams>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .backend
            .assign_payment(params.payment_id, params.quotation_id)
            .await
        {
            Ok(payment) => render(&json!({
                "assigned": payment,
                "message": format!(
                    "Assigned payment {} to quotation {}",
                    params.payment_id, params.quotation_id
                )
            })),
            Err(e) => failure("assign payment", &e),
        }
    }
}

#[tool_handler]
impl ServerHandler for OrgmMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some("This server manages the ORGM business-administration records (clients, quotations, projects, services, payments and locations) stored behind PostgREST. Use list_resources to discover resource names, then list, get, search, create, update or delete records, and assign_payment to link a payment to its quotation. Writes validate required fields and report not-found IDs distinctly from backend failures.".to_string()),
        }
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, McpError> {
        Ok(self.get_info())
    }
}
