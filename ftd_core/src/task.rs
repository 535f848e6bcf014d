//! Task files: a YAML list where every entry runs one module.
//!
//! ```yaml
//! - name: web server address
//!   ftd_configuration:
//!     operation: upsertNetworkObject
//!     data:
//!       name: web
//!       subType: HOST
//!       value: 10.0.0.1
//!       type: networkobject
//!
//! - ftd_deploy:
//! ```
use crate::error::{Error, ErrorKind, Result};
use crate::model::ModelRegistry;
use crate::modules::{MODULES, Module, ModuleContext, ModuleResult, is_module};

use serde_norway::Value as YamlValue;

const TASK_ATTRS: [&str; 2] = ["name", "ignore_errors"];

/// One module execution with its params.
#[derive(Debug, Clone)]
pub struct Task {
    /// Module could be any [`Module`] accessible by its name.
    module: &'static dyn Module,
    /// Params passed to [`Module::exec`].
    params: YamlValue,
    name: Option<String>,
    /// If true, a failure is logged and the run goes on.
    ignore_errors: bool,
}

pub type Tasks = Vec<Task>;

fn attr_key(key: &YamlValue, task: &YamlValue) -> Result<String> {
    key.as_str().map(str::to_owned).ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidData,
            format!("{key:?} is not valid in {task:?}"),
        )
    })
}

impl Task {
    /// Builds a task from one entry of a task file.
    ///
    /// The entry must be a mapping of task attributes plus exactly one module name.
    pub fn new(yaml: &YamlValue) -> Result<Self> {
        trace!("new task: {yaml:?}");
        let attrs = yaml.as_mapping().ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidData,
                format!("Task is not a mapping {yaml:?}"),
            )
        })?;

        let mut module = None;
        let mut name = None;
        let mut ignore_errors = false;
        for (key, value) in attrs {
            match attr_key(key, yaml)?.as_str() {
                "name" => name = Some(attr_key(value, yaml)?),
                "ignore_errors" => {
                    ignore_errors = value.as_bool().ok_or_else(|| {
                        Error::new(
                            ErrorKind::InvalidData,
                            format!("ignore_errors must be a boolean in {yaml:?}"),
                        )
                    })?
                }
                key if is_module(key) => {
                    if module.is_some() {
                        return Err(Error::new(
                            ErrorKind::InvalidData,
                            format!("Multiple modules found in task: {yaml:?}"),
                        ));
                    }
                    module = MODULES.get(key).map(|m| (m.as_ref(), value.clone()));
                }
                key => {
                    return Err(Error::new(
                        ErrorKind::InvalidData,
                        format!(
                            "'{key}' is not valid in task, expected one of {TASK_ATTRS:?} or a module ({:?})",
                            MODULES.keys().collect::<Vec<_>>()
                        ),
                    ));
                }
            }
        }

        let (module, params) = module.ok_or_else(|| {
            Error::new(
                ErrorKind::NotFound,
                format!("Not module found in task: {yaml:?}"),
            )
        })?;
        Ok(Task {
            module,
            params,
            name,
            ignore_errors,
        })
    }

    pub fn get_name(&self) -> Option<String> {
        self.name.clone()
    }

    pub fn get_module(&self) -> &dyn Module {
        self.module
    }

    /// Name to show in logs, defaulting to the module name.
    pub fn get_display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.module.get_name().to_owned())
    }

    /// Checks the module params, without any request to the device.
    pub fn validate(&self, registry: &ModelRegistry) -> Result<()> {
        self.module
            .validate(&self.params, registry)
            .map_err(|e| {
                Error::new(
                    e.kind(),
                    format!("task '{}': {e}", self.get_display_name()),
                )
            })
    }

    /// Runs the module. Returns `None` when the task failed and errors are ignored.
    pub fn exec(&self, context: &ModuleContext) -> Result<Option<ModuleResult>> {
        info!(target: "task", "[{}]", self.get_display_name());
        match self.module.exec(context, self.params.clone()) {
            Ok(result) => {
                let target = match result.get_changed() {
                    true => "changed",
                    false => "ok",
                };
                info!(target: target, "{}", result.get_output().unwrap_or_default());
                if let Some(extra) = result.get_extra() {
                    trace!("{extra}");
                }
                Ok(Some(result))
            }
            Err(e) if self.ignore_errors => {
                info!(target: "ignoring", "{e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

pub fn parse_file(tasks_file: &str) -> Result<Tasks> {
    let tasks: Vec<YamlValue> = serde_norway::from_str(tasks_file)?;
    tasks.iter().map(Task::new).collect::<Result<Tasks>>()
}

/// Checks every task before any of them runs.
pub fn validate_tasks(tasks: &[Task], registry: &ModelRegistry) -> Result<()> {
    tasks.iter().try_for_each(|task| task.validate(registry))
}

/// Runs tasks in order, stopping on the first failure. Returns how many changed something.
pub fn exec_tasks(tasks: &[Task], context: &ModuleContext) -> Result<usize> {
    tasks.iter().try_fold(0, |changed, task| {
        let result = task.exec(context)?;
        Ok(changed + usize::from(result.is_some_and(|r| r.get_changed())))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::tests::test_connection;

    use serde_json::json;

    fn yaml(s: &str) -> YamlValue {
        serde_norway::from_str(s).unwrap()
    }

    #[test]
    fn test_from_yaml() {
        let task = Task::new(&yaml(
            r#"
            name: 'Test task'
            ftd_configuration:
              operation: getNetworkObjectList
            "#,
        ))
        .unwrap();

        assert_eq!(task.get_name().unwrap(), "Test task");
        assert_eq!(task.get_module().get_name(), "ftd_configuration");
        assert!(!task.ignore_errors);
    }

    #[test]
    fn test_from_yaml_display_name_defaults_to_module() {
        let task = Task::new(&yaml("ftd_deploy:")).unwrap();
        assert_eq!(task.get_display_name(), "ftd_deploy");
    }

    #[test]
    fn test_from_yaml_no_module() {
        let err = Task::new(&yaml("name: 'Test task'")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_from_yaml_invalid_attr() {
        let err = Task::new(&yaml(
            r#"
            name: 'Test task'
            ftd_deploy:
            register: foo
            "#,
        ))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(err.to_string().contains("register"));
    }

    #[test]
    fn test_from_yaml_multiple_modules() {
        let err = Task::new(&yaml(
            r#"
            ftd_deploy:
            ftd_configuration:
              operation: getNetworkObjectList
            "#,
        ))
        .unwrap_err();
        assert!(err.to_string().contains("Multiple modules"));
    }

    #[test]
    fn test_from_yaml_not_mapping() {
        assert_eq!(
            Task::new(&yaml("- ftd_deploy")).unwrap_err().kind(),
            ErrorKind::InvalidData
        );
    }

    #[test]
    fn test_parse_file() {
        let tasks = parse_file(
            r#"
            - name: list networks
              ftd_configuration:
                operation: getNetworkObjectList
            - ftd_deploy:
                timeout: 60
            "#,
        )
        .unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].get_module().get_name(), "ftd_deploy");
    }

    #[test]
    fn test_validate_tasks() {
        let registry = ModelRegistry::default();
        let tasks = parse_file(
            r#"
            - ftd_configuration:
                operation: getNetworkObjectList
            - name: broken
              ftd_configuration:
                operation: fetchNetworkObject
            "#,
        )
        .unwrap();

        let err = validate_tasks(&tasks, &registry).unwrap_err();
        assert!(err.to_string().starts_with("task 'broken'"));
    }

    #[test]
    fn test_exec_tasks() {
        let (connection, transport) = test_connection(vec![
            (200, json!({"items": [{"id": "n1", "name": "web"}]})),
            (200, json!({"id": "n2", "name": "db"})),
        ]);
        let registry = ModelRegistry::default();
        let context = ModuleContext {
            connection: &connection,
            registry: &registry,
            page_size: 10,
            check_mode: false,
        };
        let tasks = parse_file(
            r#"
            - ftd_configuration:
                operation: getNetworkObjectList
            - ftd_configuration:
                operation: addNetworkObject
                data:
                  name: db
            "#,
        )
        .unwrap();

        assert_eq!(exec_tasks(&tasks, &context).unwrap(), 1);
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn test_exec_tasks_ignore_errors() {
        let (connection, transport) = test_connection(vec![
            (500, json!({"message": "boom"})),
            (200, json!({"items": []})),
        ]);
        let registry = ModelRegistry::default();
        let context = ModuleContext {
            connection: &connection,
            registry: &registry,
            page_size: 10,
            check_mode: false,
        };
        let tasks = parse_file(
            r#"
            - ignore_errors: true
              ftd_configuration:
                operation: addNetworkObject
                data:
                  name: db
            - ftd_configuration:
                operation: getNetworkObjectList
            "#,
        )
        .unwrap();

        assert_eq!(exec_tasks(&tasks, &context).unwrap(), 0);
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn test_exec_tasks_stops_on_error() {
        let (connection, transport) = test_connection(vec![(500, json!({"message": "boom"}))]);
        let registry = ModelRegistry::default();
        let context = ModuleContext {
            connection: &connection,
            registry: &registry,
            page_size: 10,
            check_mode: false,
        };
        let tasks = parse_file(
            r#"
            - ftd_configuration:
                operation: addNetworkObject
                data:
                  name: db
            - ftd_deploy:
            "#,
        )
        .unwrap();

        let err = exec_tasks(&tasks, &context).unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(transport.requests().len(), 1);
    }
}
