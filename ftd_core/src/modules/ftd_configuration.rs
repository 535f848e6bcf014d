/// # ftd_configuration
///
/// Manages configuration objects of an FTD device through the FDM REST API.
///
/// The `operation` is a verb followed by a model name. Verbs are `add`, `edit`, `delete`, `get`,
/// `upsert` and `get…List`. Write operations are idempotent: nothing is sent when the device
/// already holds an equal object.
///
/// ## Attributes
///
/// ```yaml
/// check_mode:
///   support: full
/// ```
///
/// ## Examples
///
/// ```yaml
/// - ftd_configuration:
///     operation: upsertNetworkObject
///     data:
///       name: web
///       subType: HOST
///       value: 10.0.0.1
///       type: networkobject
///
/// - ftd_configuration:
///     operation: getAccessRuleList
///     path_params:
///       parentId: default
///     filters:
///       name: allow-web
///
/// - ftd_configuration:
///     operation: deleteNetworkObject
///     path_params:
///       objId: 2fa6d6a8-1b7a-11e9-a0c4-c1a4a4f4bfe1
/// ```
use crate::compare::{ConfigObject, as_config_object};
use crate::connection::PathParams;
use crate::error::Result;
use crate::model::{ModelRegistry, Operation};
use crate::modules::{Module, ModuleContext, ModuleResult, parse_params};
use crate::pageable::QueryParams;
use crate::resource::{ConfigurationResource, OperationParams};

use serde::Deserialize;
use serde_json::{Value, json};
use serde_norway::Value as YamlValue;

#[derive(Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Params {
    /// Operation name, like `addNetworkObject`.
    pub operation: String,
    /// Object body for add, edit and upsert.
    pub data: Option<Value>,
    pub query_params: Option<QueryParamsArgs>,
    /// Values for the placeholders of the model URL, like `parentId` or `objId`.
    pub path_params: Option<PathParams>,
    /// Properties every listed object must match.
    pub filters: Option<Value>,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryParamsArgs {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub filter: Option<String>,
    pub sort: Option<String>,
}

impl From<QueryParamsArgs> for QueryParams {
    fn from(args: QueryParamsArgs) -> Self {
        QueryParams {
            offset: args.offset.unwrap_or_default(),
            limit: args.limit,
            filter: args.filter,
            sort: args.sort,
        }
    }
}

fn optional_object(value: Option<&Value>) -> Result<ConfigObject> {
    match value {
        None | Some(Value::Null) => Ok(ConfigObject::new()),
        Some(value) => as_config_object(value).cloned(),
    }
}

impl Params {
    fn operation(&self, registry: &ModelRegistry) -> Result<Operation> {
        registry.operation(&self.operation)
    }

    fn into_operation_params(self) -> Result<OperationParams> {
        Ok(OperationParams {
            data: optional_object(self.data.as_ref())?,
            path_params: self.path_params.unwrap_or_default(),
            query_params: self.query_params.map(QueryParams::from).unwrap_or_default(),
            filters: optional_object(self.filters.as_ref())?,
        })
    }
}

fn describe(response: &Value) -> Option<String> {
    match response {
        Value::Object(object) => {
            let name = object.get("name").and_then(Value::as_str);
            let id = object.get("id").and_then(Value::as_str);
            match (name, id) {
                (Some(name), Some(id)) => Some(format!("{name} ({id})")),
                (Some(name), None) => Some(name.to_owned()),
                (None, Some(id)) => Some(id.to_owned()),
                (None, None) => None,
            }
        }
        Value::Array(items) => Some(format!("{} objects", items.len())),
        _ => None,
    }
}

pub fn ftd_configuration(context: &ModuleContext, params: Params) -> Result<ModuleResult> {
    let operation = params.operation(context.registry)?;
    let operation_params = params.into_operation_params()?;

    let resource = ConfigurationResource::new(
        context.connection,
        context.registry,
        context.page_size,
        context.check_mode,
    );
    let result = resource.execute(&operation, operation_params)?;

    let output = describe(&result.response).map(|description| format!("{operation}: {description}"));
    Ok(ModuleResult::new(
        result.changed,
        Some(json!({ "response": result.response })),
        output,
    ))
}

#[derive(Debug)]
pub struct FtdConfiguration;

impl Module for FtdConfiguration {
    fn get_name(&self) -> &str {
        "ftd_configuration"
    }

    fn validate(&self, params: &YamlValue, registry: &ModelRegistry) -> Result<()> {
        let params: Params = parse_params(params.clone())?;
        params.operation(registry)?;
        optional_object(params.data.as_ref())?;
        optional_object(params.filters.as_ref())?;
        Ok(())
    }

    fn exec(&self, context: &ModuleContext, params: YamlValue) -> Result<ModuleResult> {
        ftd_configuration(context, parse_params(params)?)
    }
}
