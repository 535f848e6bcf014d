//! Resource models and operation names.
//!
//! Every FDM resource follows the same CRUD pattern under a base URL, so a model is just a name
//! bound to that URL. Operation names combine a verb with a model name, like
//! `addNetworkObject` or `getAccessRuleList`.
use crate::error::{Error, ErrorKind, Result};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter};

const BUILTIN_MODELS: [(&str, &str); 18] = [
    ("NetworkObject", "/object/networks"),
    ("NetworkObjectGroup", "/object/networkgroups"),
    ("TCPPortObject", "/object/tcpports"),
    ("UDPPortObject", "/object/udpports"),
    ("ICMPv4PortObject", "/object/icmpv4ports"),
    ("PortObjectGroup", "/object/portgroups"),
    ("SecurityZone", "/object/securityzones"),
    ("URLObject", "/object/urls"),
    ("URLObjectGroup", "/object/urlgroups"),
    ("ApplicationFilter", "/object/applicationfilters"),
    ("DNSServerGroup", "/object/dnsservergroups"),
    ("ActiveDirectoryRealm", "/object/realms"),
    ("AccessPolicy", "/policy/accesspolicies"),
    ("AccessRule", "/policy/accesspolicies/{parentId}/accessrules"),
    ("ManualNatRule", "/policy/manualnatpolicies/{parentId}/manualnatrules"),
    ("ObjectNatRule", "/policy/objectnatpolicies/{parentId}/objectnatrules"),
    ("PhysicalInterface", "/devices/default/interfaces"),
    ("StandardAccessList", "/object/standardaccesslists"),
];

/// Model name to base URL table.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRegistry {
    models: BTreeMap<String, String>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        ModelRegistry {
            models: BUILTIN_MODELS
                .iter()
                .map(|(name, url)| (name.to_string(), url.to_string()))
                .collect(),
        }
    }
}

impl ModelRegistry {
    /// Builtin models plus `extra`, which wins on name clashes.
    pub fn with_models(extra: &BTreeMap<String, String>) -> Self {
        let mut registry = ModelRegistry::default();
        registry
            .models
            .extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        registry
    }

    pub fn url(&self, model: &str) -> Result<&str> {
        self.models.get(model).map(String::as_str).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidData,
                format!("unknown model '{model}', add it to `models` in the config file"),
            )
        })
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    /// Parses `name` and checks its model is known.
    ///
    /// `get…List` is a single get when only the model with the `List` suffix exists, like
    /// `getStandardAccessList`.
    pub fn operation(&self, name: &str) -> Result<Operation> {
        let mut operation = name.parse::<Operation>()?;
        if operation.kind == OperationKind::GetList && !self.contains(&operation.model) {
            let model = format!("{}List", operation.model);
            if self.contains(&model) {
                operation = Operation {
                    kind: OperationKind::Get,
                    model,
                };
            }
        }
        self.url(&operation.model)?;
        Ok(operation)
    }
}

/// What an operation does with its model, regardless of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum OperationKind {
    Upsert,
    Add,
    Edit,
    Delete,
    GetList,
    Get,
}

impl OperationKind {
    /// Whether the operation may modify the device.
    pub fn is_write(self) -> bool {
        !matches!(self, OperationKind::Get | OperationKind::GetList)
    }
}

/// A parsed operation name such as `editNetworkObject`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationKind,
    pub model: String,
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        let invalid = || {
            Error::new(
                ErrorKind::InvalidData,
                format!(
                    "invalid operation '{name}', expected one of {} followed by a model name",
                    OperationKind::iter()
                        .filter(|k| *k != OperationKind::GetList)
                        .map(|k| k.to_string())
                        .collect::<Vec<_>>()
                        .join("/")
                ),
            )
        };

        let (verb, model) = [
            OperationKind::Upsert,
            OperationKind::Add,
            OperationKind::Edit,
            OperationKind::Delete,
            OperationKind::Get,
        ]
        .into_iter()
        .find_map(|kind| name.strip_prefix(kind.as_ref()).map(|model| (kind, model)))
        .ok_or_else(invalid)?;

        if !model.starts_with(|c: char| c.is_ascii_uppercase()) {
            return Err(invalid());
        }

        let (kind, model) = match (verb, model.strip_suffix("List")) {
            (OperationKind::Get, Some(model)) if !model.is_empty() => (OperationKind::GetList, model),
            _ => (verb, model),
        };

        Ok(Operation {
            kind,
            model: model.to_owned(),
        })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OperationKind::GetList => write!(f, "get{}List", self.model),
            kind => write!(f, "{kind}{}", self.model),
        }
    }
}
