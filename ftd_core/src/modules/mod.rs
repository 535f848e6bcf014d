mod ftd_configuration;
mod ftd_deploy;

use crate::connection::Connection;
use crate::error::{Error, ErrorKind, Result};
use crate::model::ModelRegistry;

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_norway::Value as YamlValue;

/// Return values by [`Module`] execution.
#[derive(Debug, PartialEq)]
pub struct ModuleResult {
    changed: bool,
    extra: Option<Value>,
    output: Option<String>,
}

impl ModuleResult {
    pub fn new(changed: bool, extra: Option<Value>, output: Option<String>) -> Self {
        ModuleResult {
            changed,
            extra,
            output,
        }
    }

    /// Return changed
    pub fn get_changed(&self) -> bool {
        self.changed
    }

    /// Return extra
    pub fn get_extra(&self) -> Option<Value> {
        self.extra.clone()
    }

    /// Return output which is printed in log
    pub fn get_output(&self) -> Option<String> {
        self.output.clone()
    }
}

/// Shared state handed to every module of a run.
pub struct ModuleContext<'a> {
    pub connection: &'a Connection,
    pub registry: &'a ModelRegistry,
    pub page_size: u64,
    pub check_mode: bool,
}

pub trait Module: Send + Sync + std::fmt::Debug {
    fn get_name(&self) -> &str;

    /// Checks params without contacting the device, so a bad task file fails before login.
    fn validate(&self, params: &YamlValue, registry: &ModelRegistry) -> Result<()>;

    fn exec(&self, context: &ModuleContext, params: YamlValue) -> Result<ModuleResult>;
}

pub static MODULES: LazyLock<HashMap<&'static str, Box<dyn Module>>> = LazyLock::new(|| {
    vec![
        (
            "ftd_configuration",
            Box::new(ftd_configuration::FtdConfiguration) as Box<dyn Module>,
        ),
        ("ftd_deploy", Box::new(ftd_deploy::FtdDeploy) as Box<dyn Module>),
    ]
    .into_iter()
    .collect()
});

#[inline(always)]
pub fn is_module(module: &str) -> bool {
    MODULES.get(module).is_some()
}

#[inline]
pub fn parse_params<P: DeserializeOwned>(yaml: YamlValue) -> Result<P> {
    trace!("parse params: {yaml:?}");
    serde_norway::from_value(yaml).map_err(|e| Error::new(ErrorKind::InvalidData, e))
}
