/// # ftd_deploy
///
/// Deploys pending configuration changes and waits for the deployment to finish.
///
/// Nothing is deployed when the device reports no pending changes.
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
/// - ftd_deploy:
///
/// - ftd_deploy:
///     timeout: 1200
///     poll_interval: 10
/// ```
use crate::connection::{Connection, PathParams};
use crate::error::{Error, ErrorKind, Result};
use crate::http::HttpMethod;
use crate::model::ModelRegistry;
use crate::modules::{Module, ModuleContext, ModuleResult, parse_params};
use crate::pageable::{QueryParams, iterate_over_pageable_resource};

use std::thread::sleep;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{Value, json};
use serde_norway::Value as YamlValue;
use strum_macros::{Display, EnumString};

const PENDING_CHANGES_URL: &str = "/operational/pendingchanges";
const DEPLOY_URL: &str = "/operational/deploy";
const DEPLOY_JOB_URL: &str = "/operational/deploy/{objId}";

#[derive(Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Params {
    /// Seconds to wait for the deployment to finish.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Seconds between two status checks.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_timeout() -> u64 {
    600
}

fn default_poll_interval() -> u64 {
    5
}

/// Deployment job states reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
enum DeployState {
    Queued,
    Deploying,
    Deployed,
    DeployFailed,
}

fn job_state(job: &Value) -> Option<DeployState> {
    let state = job.get("state").and_then(Value::as_str)?;
    state
        .parse::<DeployState>()
        .inspect_err(|_| debug!("unknown deployment state: {state}"))
        .ok()
}

fn job_id(job: &Value) -> Result<String> {
    job.get("id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidData,
                format!("deployment job without id: {job}"),
            )
        })
}

fn has_pending_changes(connection: &Connection) -> Result<bool> {
    let list_page = |query: &QueryParams| {
        connection.send_request(
            HttpMethod::Get,
            PENDING_CHANGES_URL,
            &PathParams::new(),
            &query.to_pairs(),
            None,
        )
    };
    iterate_over_pageable_resource(list_page, QueryParams::default())
        .next()
        .transpose()
        .map(|first| first.is_some())
}

fn wait_for_deployment(connection: &Connection, id: &str, params: &Params) -> Result<Value> {
    let path_params: PathParams = [("objId".to_owned(), id.to_owned())].into_iter().collect();
    let timeout = Duration::from_secs(params.timeout);
    let start = Instant::now();

    loop {
        let job = connection.send_request(HttpMethod::Get, DEPLOY_JOB_URL, &path_params, &[], None)?;
        match job_state(&job) {
            Some(DeployState::Deployed) => return Ok(job),
            Some(DeployState::DeployFailed) => {
                return Err(Error::new(
                    ErrorKind::ServerError,
                    format!("deployment {id} failed: {job}"),
                ));
            }
            state => trace!("deployment {id} state: {state:?}"),
        }

        if start.elapsed() >= timeout {
            return Err(Error::new(
                ErrorKind::Timeout,
                format!("deployment {id} not finished after {}s", params.timeout),
            ));
        }
        sleep(Duration::from_secs(params.poll_interval));
    }
}

pub fn ftd_deploy(context: &ModuleContext, params: Params) -> Result<ModuleResult> {
    if !has_pending_changes(context.connection)? {
        return Ok(ModuleResult::new(
            false,
            None,
            Some("no pending changes".to_owned()),
        ));
    }
    if context.check_mode {
        return Ok(ModuleResult::new(
            true,
            None,
            Some("pending changes would be deployed".to_owned()),
        ));
    }

    let job = context.connection.send_request(
        HttpMethod::Post,
        DEPLOY_URL,
        &PathParams::new(),
        &[],
        None,
    )?;
    let id = job_id(&job)?;
    info!("deployment {id} started");

    let job = wait_for_deployment(context.connection, &id, &params)?;
    Ok(ModuleResult::new(
        true,
        Some(json!({ "response": job })),
        Some(format!("deployment {id} finished")),
    ))
}

#[derive(Debug)]
pub struct FtdDeploy;

impl Module for FtdDeploy {
    fn get_name(&self) -> &str {
        "ftd_deploy"
    }

    fn validate(&self, params: &YamlValue, _: &ModelRegistry) -> Result<()> {
        if !params.is_null() {
            parse_params::<Params>(params.clone())?;
        }
        Ok(())
    }

    fn exec(&self, context: &ModuleContext, params: YamlValue) -> Result<ModuleResult> {
        let params = match params {
            YamlValue::Null => Params::default(),
            params => parse_params(params)?,
        };
        ftd_deploy(context, params)
    }
}
