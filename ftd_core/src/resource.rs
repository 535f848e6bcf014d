//! Idempotent CRUD over one generic FDM resource.
use crate::compare::{ConfigObject, equal_objects, requires_update};
use crate::connection::{Connection, PathParams};
use crate::error::{Error, ErrorKind, Result};
use crate::http::HttpMethod;
use crate::model::{ModelRegistry, Operation, OperationKind};
use crate::pageable::{QueryParams, find_by_name, iterate_over_pageable_resource, resolve_by_name};

use serde_json::Value;

/// Message the device puts in a 422 answer when the name is already taken.
pub const DUPLICATE_NAME_ERROR_MESSAGE: &str = "Validation failed due to a duplicate name";

const OBJ_ID_PATH_PARAM: &str = "objId";

/// Inputs of any operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperationParams {
    pub data: ConfigObject,
    pub path_params: PathParams,
    pub query_params: QueryParams,
    /// Client side filters for list operations: every key must match.
    pub filters: ConfigObject,
}

impl OperationParams {
    pub fn name(&self) -> Option<&str> {
        self.data.get("name").and_then(Value::as_str)
    }

    fn obj_id(&self) -> Result<&str> {
        self.path_params
            .get(OBJ_ID_PATH_PARAM)
            .map(String::as_str)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidData,
                    format!("path param '{OBJ_ID_PATH_PARAM}' is required"),
                )
            })
    }
}

/// Outcome of one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    pub changed: bool,
    pub response: Value,
}

impl OperationResult {
    fn changed(response: Value) -> Self {
        OperationResult {
            changed: true,
            response,
        }
    }

    fn unchanged(response: Value) -> Self {
        OperationResult {
            changed: false,
            response,
        }
    }
}

pub fn is_duplicate_name_error(error: &Error) -> bool {
    error
        .server_error()
        .map(|e| e.code == 422 && e.response_text().contains(DUPLICATE_NAME_ERROR_MESSAGE))
        .unwrap_or(false)
}

/// Copies `id` (into the body and the `objId` path param) and `version` from the object stored on
/// the device, so the desired object can be sent as an edit.
pub fn copy_identity_properties(existing: &ConfigObject, mut params: OperationParams) -> OperationParams {
    if let Some(id) = existing.get("id") {
        params.data.insert("id".to_owned(), id.clone());
        let id = match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        params.path_params.insert(OBJ_ID_PATH_PARAM.to_owned(), id);
    }
    if let Some(version) = existing.get("version") {
        params.data.insert("version".to_owned(), version.clone());
    }
    params
}

/// Create-preferred upsert.
///
/// `add` is tried first. Only when the device rejects it because the name is taken, the existing
/// object is resolved by name and, if it differs from the desired one, edited in place with the
/// identity copied over. Every other failure is returned as is.
pub fn upsert<A, E, R>(
    mut add: A,
    mut edit: E,
    mut resolve: R,
    params: OperationParams,
) -> Result<OperationResult>
where
    A: FnMut(&OperationParams) -> Result<Value>,
    E: FnMut(&OperationParams) -> Result<Value>,
    R: FnMut(&OperationParams, &str) -> Result<ConfigObject>,
{
    let add_error = match add(&params) {
        Ok(response) => return Ok(OperationResult::changed(response)),
        Err(e) if is_duplicate_name_error(&e) => e,
        Err(e) => return Err(e),
    };

    let Some(name) = params.name().map(str::to_owned) else {
        return Err(add_error);
    };
    debug!("object '{name}' already exists, editing it instead");
    let existing = resolve(&params, &name)?;

    if !requires_update(&params.data, &existing) {
        return Ok(OperationResult::unchanged(Value::Object(existing)));
    }

    let params = copy_identity_properties(&existing, params);
    edit(&params).map(OperationResult::changed)
}

fn matches_filters(item: &Value, filters: &ConfigObject) -> bool {
    filters.iter().all(|(key, expected)| item.get(key) == Some(expected))
}

/// Operations of one model, dispatched by [`OperationKind`].
pub struct ConfigurationResource<'a> {
    connection: &'a Connection,
    registry: &'a ModelRegistry,
    page_size: u64,
    check_mode: bool,
}

impl<'a> ConfigurationResource<'a> {
    pub fn new(
        connection: &'a Connection,
        registry: &'a ModelRegistry,
        page_size: u64,
        check_mode: bool,
    ) -> Self {
        ConfigurationResource {
            connection,
            registry,
            page_size,
            check_mode,
        }
    }

    pub fn execute(&self, operation: &Operation, params: OperationParams) -> Result<OperationResult> {
        let url = self.registry.url(&operation.model)?;
        debug!("executing {operation} on {url}");
        if self.check_mode && operation.kind.is_write() {
            debug!("check mode: {operation} will only be compared against the device");
        }
        match operation.kind {
            OperationKind::Add => self.add_object(url, params),
            OperationKind::Edit => self.edit_object(url, params),
            OperationKind::Delete => self.delete_object(url, params),
            OperationKind::Get => self.get_object(url, &params).map(OperationResult::unchanged),
            OperationKind::GetList => self.get_objects_by_filter(url, params),
            OperationKind::Upsert => self.upsert_object(url, params),
        }
    }

    fn object_url(url: &str) -> String {
        format!("{url}/{{{OBJ_ID_PATH_PARAM}}}")
    }

    fn send(
        &self,
        method: HttpMethod,
        url: &str,
        path_params: &PathParams,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        self.connection
            .send_request(method, url, path_params, query, body)
    }

    fn list_params(&self, params: &OperationParams) -> QueryParams {
        QueryParams {
            limit: params.query_params.limit.or(Some(self.page_size)),
            ..params.query_params.clone()
        }
    }

    fn find_object_by_name(
        &self,
        url: &str,
        params: &OperationParams,
        name: &str,
    ) -> Result<Option<ConfigObject>> {
        let list_page = |query: &QueryParams| {
            self.send(HttpMethod::Get, url, &params.path_params, &query.to_pairs(), None)
        };
        find_by_name(list_page, name, self.list_params(params))
    }

    fn create(&self, url: &str, params: &OperationParams) -> Result<Value> {
        let body = Value::Object(params.data.clone());
        self.send(HttpMethod::Post, url, &params.path_params, &[], Some(&body))
    }

    fn update(&self, url: &str, params: &OperationParams) -> Result<Value> {
        let body = Value::Object(params.data.clone());
        self.send(
            HttpMethod::Put,
            &Self::object_url(url),
            &params.path_params,
            &[],
            Some(&body),
        )
    }

    fn get_object(&self, url: &str, params: &OperationParams) -> Result<Value> {
        params.obj_id()?;
        self.send(HttpMethod::Get, &Self::object_url(url), &params.path_params, &[], None)
    }

    /// Creates the object. A name collision with an equal object is not a change.
    pub fn add_object(&self, url: &str, params: OperationParams) -> Result<OperationResult> {
        if self.check_mode {
            return self.check_upsert(url, &params, false);
        }
        match self.create(url, &params) {
            Ok(response) => Ok(OperationResult::changed(response)),
            Err(e) if is_duplicate_name_error(&e) => {
                let existing = match params.name() {
                    Some(name) => self.find_object_by_name(url, &params, name)?,
                    None => None,
                };
                match existing {
                    Some(existing) if equal_objects(&params.data, &existing) => {
                        Ok(OperationResult::unchanged(Value::Object(existing)))
                    }
                    _ => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Updates the object addressed by `objId` when it differs from `data`.
    pub fn edit_object(&self, url: &str, mut params: OperationParams) -> Result<OperationResult> {
        let existing = self.get_object(url, &params)?;
        let existing_obj = existing.as_object().cloned().unwrap_or_default();

        if !requires_update(&params.data, &existing_obj) {
            return Ok(OperationResult::unchanged(existing));
        }
        if self.check_mode {
            return Ok(OperationResult::changed(Value::Object(params.data)));
        }

        if !params.data.contains_key("version")
            && let Some(version) = existing_obj.get("version")
        {
            params.data.insert("version".to_owned(), version.clone());
        }
        if !params.data.contains_key("id")
            && let Ok(id) = params.obj_id()
        {
            let id = Value::String(id.to_owned());
            params.data.insert("id".to_owned(), id);
        }
        self.update(url, &params).map(OperationResult::changed)
    }

    /// Deletes the object addressed by `objId`; an already absent object is not a change.
    pub fn delete_object(&self, url: &str, params: OperationParams) -> Result<OperationResult> {
        params.obj_id()?;
        let result = if self.check_mode {
            self.get_object(url, &params)
        } else {
            self.send(
                HttpMethod::Delete,
                &Self::object_url(url),
                &params.path_params,
                &[],
                None,
            )
        };
        match result {
            Ok(_) => Ok(OperationResult::changed(Value::Null)),
            Err(e) if e.status_code() == Some(404) => {
                debug!("object {} already absent", params.obj_id()?);
                Ok(OperationResult::unchanged(Value::Null))
            }
            Err(e) => Err(e),
        }
    }

    /// Every object of the collection matching `filters`.
    ///
    /// A `name` filter is also sent to the device to reduce the number of pages.
    pub fn get_objects_by_filter(&self, url: &str, params: OperationParams) -> Result<OperationResult> {
        let mut query = self.list_params(&params);
        if let Some(name) = params.filters.get("name").and_then(Value::as_str) {
            query = query.with_name_filter(name);
        }
        let list_page = |query: &QueryParams| {
            self.send(HttpMethod::Get, url, &params.path_params, &query.to_pairs(), None)
        };

        let items = iterate_over_pageable_resource(list_page, query)
            .filter(|item| match item {
                Ok(item) => matches_filters(item, &params.filters),
                Err(_) => true,
            })
            .collect::<Result<Vec<Value>>>()?;
        Ok(OperationResult::unchanged(Value::Array(items)))
    }

    pub fn upsert_object(&self, url: &str, params: OperationParams) -> Result<OperationResult> {
        if self.check_mode {
            return self.check_upsert(url, &params, true);
        }
        upsert(
            |p| self.create(url, p),
            |p| self.update(url, p),
            |p, name| {
                let list_page = |query: &QueryParams| {
                    self.send(HttpMethod::Get, url, &p.path_params, &query.to_pairs(), None)
                };
                resolve_by_name(list_page, name, self.list_params(p))
            },
            params,
        )
    }

    /// Dry run of add/upsert: look the object up by name and compare.
    fn check_upsert(
        &self,
        url: &str,
        params: &OperationParams,
        allow_edit: bool,
    ) -> Result<OperationResult> {
        let existing = match params.name() {
            Some(name) => self.find_object_by_name(url, params, name)?,
            None => None,
        };
        match existing {
            None => Ok(OperationResult::changed(Value::Object(params.data.clone()))),
            Some(existing) if !requires_update(&params.data, &existing) => {
                Ok(OperationResult::unchanged(Value::Object(existing)))
            }
            Some(_) if allow_edit => Ok(OperationResult::changed(Value::Object(params.data.clone()))),
            Some(_) => Err(Error::new(
                ErrorKind::InvalidData,
                "Cannot add new object. An object with the same name but different parameters already exists.",
            )),
        }
    }
}
