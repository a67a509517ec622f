//! Aklla MCP Server Implementation
//!
//! Implements the MCP server with all Aklla tools. The server owns the
//! current formulation; each tool call locks it, applies one edit and
//! answers with the recomputed result.

use std::sync::{Arc, MutexGuard};

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::Database;
use crate::formulation::NumericInput;
use crate::models::{Catalog, Formulation};
use crate::tools::catalog;
use crate::tools::formulation;
use crate::tools::saved;
use crate::tools::status::StatusTracker;
use crate::tools::ToolError;

/// Aklla MCP Service
#[derive(Clone)]
pub struct AkllaService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    catalog: Arc<Catalog>,
    /// The formulation being edited
    formulation: Arc<std::sync::Mutex<Formulation>>,
    tool_router: ToolRouter<AkllaService>,
}

impl AkllaService {
    pub fn new(database: Database, catalog: Catalog) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database.clone()))),
            database,
            catalog: Arc::new(catalog),
            formulation: Arc::new(std::sync::Mutex::new(Formulation::default())),
            tool_router: Self::tool_router(),
        }
    }

    fn formulation(&self) -> Result<MutexGuard<'_, Formulation>, McpError> {
        self.formulation
            .lock()
            .map_err(|e| McpError::internal_error(format!("Formulation state poisoned: {}", e), None))
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Bad requests and missing records are the caller's to fix; storage failures are ours
fn tool_error(e: ToolError) -> McpError {
    if e.is_caller_error() {
        McpError::invalid_params(e.to_string(), None)
    } else {
        McpError::internal_error(e.to_string(), None)
    }
}

/// Tool result for an edit that is either applied or refused with an explanation
fn outcome_result<T: Serialize, R: Serialize>(outcome: Result<T, R>) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(applied) => json_result(&applied),
        Err(refused) => json_result(&refused),
    }
}

// ============================================================================
// Catalog Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListCatalogParams {
    /// Category tag, e.g. "AceitesVegetales"
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IngredientIdParams {
    /// Catalog id, e.g. "coconutOil"
    pub id: String,
}

// ============================================================================
// Formulation Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetSoapTypeParams {
    /// "glicerina" (melt-and-pour) or "saponificado" (cold process)
    pub soap_type: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetBatchWeightParams {
    /// Grams; values below 1 become 1
    pub batch_weight: NumericInput,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetSuperfatParams {
    /// Percent of lye discount
    pub superfat: NumericInput,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdatePercentParams {
    pub id: String,
    /// Percent of batch weight
    pub percent: NumericInput,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateGramsParams {
    pub id: String,
    pub grams: NumericInput,
}

// ============================================================================
// Saved Formulation Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaveFormulationParams {
    pub name: String,
    pub lot_code: Option<String>,
    pub operator: Option<String>,
    /// YYYY-MM-DD; defaults to today
    pub batch_date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListSavedFormulationsParams {
    /// Matches name or lot code
    pub query: Option<String>,
    pub soap_type: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_list_limit() -> i64 { 50 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SavedFormulationIdParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateSavedFormulationParams {
    pub id: i64,
    pub name: Option<String>,
    pub lot_code: Option<String>,
    pub operator: Option<String>,
    /// YYYY-MM-DD
    pub batch_date: Option<String>,
    pub notes: Option<String>,
}

// ============================================================================
// Tool Router
// ============================================================================

#[tool_router]
impl AkllaService {
    // --- Status ---

    #[tool(description = "Get the current status of the Aklla service including build info, database status, and process information")]
    async fn aklla_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(self.catalog.len());
        json_result(&status)
    }

    #[tool(description = "Get step-by-step instructions for building soap formulations. Call this when starting a formulation session or when unsure how to use the formulation tools.")]
    fn formulation_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::FORMULATION_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(FORMULATION_INSTRUCTIONS)]))
    }

    // --- Catalog ---

    #[tool(description = "List catalog ingredients with their default percent and SAP value, optionally filtered by category")]
    fn list_catalog(&self, Parameters(p): Parameters<ListCatalogParams>) -> Result<CallToolResult, McpError> {
        let result = catalog::list_catalog(&self.catalog, p.category.as_deref())
            .map_err(|e| McpError::invalid_params(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get one catalog ingredient by id")]
    fn get_catalog_ingredient(&self, Parameters(p): Parameters<IngredientIdParams>) -> Result<CallToolResult, McpError> {
        match catalog::get_catalog_ingredient(&self.catalog, &p.id) {
            Some(entry) => json_result(&entry),
            None => json_result(&serde_json::json!({ "error": "Ingredient not in catalog", "id": p.id })),
        }
    }

    // --- Formulation ---

    #[tool(description = "Get the current formulation with totals, suggested pH, and NaOH estimate for cold process")]
    fn get_formulation(&self) -> Result<CallToolResult, McpError> {
        let current = self.formulation()?;
        json_result(&formulation::get_formulation(&current, &self.catalog))
    }

    #[tool(description = "Replace the current formulation with the starter melt-and-pour formula (800 g)")]
    fn reset_formulation(&self) -> Result<CallToolResult, McpError> {
        let mut current = self.formulation()?;
        json_result(&formulation::reset_formulation(&mut current, &self.catalog))
    }

    #[tool(description = "Set the soap type: 'glicerina' (melt-and-pour) or 'saponificado' (cold process)")]
    fn set_soap_type(&self, Parameters(p): Parameters<SetSoapTypeParams>) -> Result<CallToolResult, McpError> {
        let mut current = self.formulation()?;
        let result = formulation::set_soap_type(&mut current, &self.catalog, &p.soap_type)
            .map_err(|e| McpError::invalid_params(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Set the total batch weight in grams. Percents are kept and grams rescale. Minimum 1 g.")]
    fn set_batch_weight(&self, Parameters(p): Parameters<SetBatchWeightParams>) -> Result<CallToolResult, McpError> {
        let mut current = self.formulation()?;
        json_result(&formulation::set_batch_weight(&mut current, &self.catalog, &p.batch_weight))
    }

    #[tool(description = "Set the superfat percent (lye discount) used by the cold-process NaOH estimate")]
    fn set_superfat(&self, Parameters(p): Parameters<SetSuperfatParams>) -> Result<CallToolResult, McpError> {
        let mut current = self.formulation()?;
        json_result(&formulation::set_superfat(&mut current, &self.catalog, &p.superfat))
    }

    #[tool(description = "Add a catalog ingredient to the formulation at its default percent")]
    fn add_ingredient(&self, Parameters(p): Parameters<IngredientIdParams>) -> Result<CallToolResult, McpError> {
        let mut current = self.formulation()?;
        let result = formulation::add_ingredient(&mut current, &self.catalog, &p.id)
            .map_err(|e| McpError::invalid_params(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Set an ingredient's percent of batch weight; grams are recomputed")]
    fn update_ingredient_percent(&self, Parameters(p): Parameters<UpdatePercentParams>) -> Result<CallToolResult, McpError> {
        let mut current = self.formulation()?;
        let result = formulation::update_ingredient_percent(&mut current, &self.catalog, &p.id, &p.percent)
            .map_err(|e| McpError::invalid_params(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Set an ingredient's grams; its percent is recomputed from the batch weight")]
    fn update_ingredient_grams(&self, Parameters(p): Parameters<UpdateGramsParams>) -> Result<CallToolResult, McpError> {
        let mut current = self.formulation()?;
        let result = formulation::update_ingredient_grams(&mut current, &self.catalog, &p.id, &p.grams)
            .map_err(|e| McpError::invalid_params(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Remove an ingredient from the formulation")]
    fn remove_ingredient(&self, Parameters(p): Parameters<IngredientIdParams>) -> Result<CallToolResult, McpError> {
        let mut current = self.formulation()?;
        let result = formulation::remove_ingredient(&mut current, &self.catalog, &p.id)
            .map_err(|e| McpError::invalid_params(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Remove every ingredient; batch weight, soap type and superfat are kept")]
    fn clear_formulation(&self) -> Result<CallToolResult, McpError> {
        let mut current = self.formulation()?;
        json_result(&formulation::clear_formulation(&mut current, &self.catalog))
    }

    #[tool(description = "Scale every ingredient proportionally so the percents total exactly 100")]
    fn rebalance_to_hundred(&self) -> Result<CallToolResult, McpError> {
        let mut current = self.formulation()?;
        outcome_result(formulation::rebalance_to_hundred(&mut current, &self.catalog))
    }

    #[tool(description = "Melt-and-pour only: set the glycerin base to the share the other ingredients leave free. Refused for cold process, where oils must be adjusted manually.")]
    fn fill_base_to_hundred(&self) -> Result<CallToolResult, McpError> {
        let mut current = self.formulation()?;
        outcome_result(formulation::fill_base_to_hundred(&mut current, &self.catalog))
    }

    #[tool(description = "Estimate NaOH and lye water for the vegetable oils in a cold-process formulation. Always verify with a lye calculator.")]
    fn estimate_naoh(&self) -> Result<CallToolResult, McpError> {
        let current = self.formulation()?;
        json_result(&formulation::estimate_naoh(&current, &self.catalog))
    }

    #[tool(description = "Export the current formulation as a JSON document")]
    fn export_formulation(&self) -> Result<CallToolResult, McpError> {
        let current = self.formulation()?;
        let export = formulation::export_formulation(&current, &self.catalog);
        let json = export
            .to_json_pretty()
            .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    // --- Saved Formulations ---

    #[tool(description = "Save the current formulation as a batch record with name, lot code, operator, batch date (YYYY-MM-DD, default today) and notes")]
    fn save_formulation(&self, Parameters(p): Parameters<SaveFormulationParams>) -> Result<CallToolResult, McpError> {
        let current = self.formulation()?;
        let result = saved::save_formulation(
            &self.database, &current, &p.name, p.lot_code, p.operator, p.batch_date.as_deref(), p.notes,
        )
        .map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "List saved formulations, newest first, with optional search by name or lot code, soap type filter, and pagination")]
    fn list_saved_formulations(&self, Parameters(p): Parameters<ListSavedFormulationsParams>) -> Result<CallToolResult, McpError> {
        let result = saved::list_saved_formulations(
            &self.database, p.query.as_deref(), p.soap_type.as_deref(), p.limit, p.offset,
        )
        .map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Get a saved formulation with its ingredient lines and recomputed export")]
    fn get_saved_formulation(&self, Parameters(p): Parameters<SavedFormulationIdParams>) -> Result<CallToolResult, McpError> {
        let result = saved::get_saved_formulation(&self.database, &self.catalog, p.id)
            .map_err(tool_error)?;
        match result {
            Some(detail) => json_result(&detail),
            None => json_result(&serde_json::json!({ "error": "Saved formulation not found", "id": p.id })),
        }
    }

    #[tool(description = "Replace the current formulation with a saved one")]
    fn load_formulation(&self, Parameters(p): Parameters<SavedFormulationIdParams>) -> Result<CallToolResult, McpError> {
        let mut current = self.formulation()?;
        let result = saved::load_formulation(&self.database, &self.catalog, &mut current, p.id)
            .map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Update a saved formulation's name, lot code, operator, batch date or notes. Ingredient lines of a saved batch cannot be changed.")]
    fn update_saved_formulation(&self, Parameters(p): Parameters<UpdateSavedFormulationParams>) -> Result<CallToolResult, McpError> {
        let result = saved::update_saved_formulation(
            &self.database, p.id, p.name, p.lot_code, p.operator, p.batch_date.as_deref(), p.notes,
        )
        .map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Delete a saved formulation and its ingredient lines")]
    fn delete_saved_formulation(&self, Parameters(p): Parameters<SavedFormulationIdParams>) -> Result<CallToolResult, McpError> {
        let result = saved::delete_saved_formulation(&self.database, p.id)
            .map_err(tool_error)?;
        json_result(&result)
    }
}

#[tool_handler]
impl ServerHandler for AkllaService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "aklla".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Aklla Soap Formulator".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Aklla Soap Formulator - melt-and-pour and cold-process soap formulation. \
                 IMPORTANT: Call formulation_instructions before building a formulation. \
                 Catalog: list_catalog, get_catalog_ingredient. \
                 Formulation: get_formulation, reset_formulation, set_soap_type, set_batch_weight, set_superfat, \
                 add_ingredient, update_ingredient_percent, update_ingredient_grams, remove_ingredient, clear_formulation. \
                 Adjust: rebalance_to_hundred, fill_base_to_hundred (melt-and-pour only). \
                 Lye: estimate_naoh (cold process; verify with a lye calculator). \
                 Export: export_formulation. \
                 Batch records: save_formulation, list_saved_formulations, get_saved_formulation, \
                 load_formulation, update_saved_formulation, delete_saved_formulation."
                    .into(),
            ),
        }
    }
}
