use async_trait::async_trait;
use hataori::prelude::*;
use serde_json::{json, Value};
use std::io::Write;

#[derive(Debug)]
struct MyTask {
    name: String,
    fields: Fields,
}

impl TaskType for MyTask {
    fn declare(name: &str) -> Result<Self, WorkflowError> {
        Ok(Self {
            name: name.to_string(),
            fields: Fields::new()
                .with(Field::string("param1"))
                .with(Field::string("param2"))
                .with(Field::number("param3").with_default(154)?),
        })
    }
}

#[async_trait]
impl Task for MyTask {
    impl_task_accessors!();

    async fn run(&mut self, _ctx: &Context) -> Result<TaskOutcome, WorkflowError> {
        Ok(TaskOutcome::done())
    }
}

#[derive(Debug)]
struct CalledTask {
    name: String,
    fields: Fields,
    run_count: u32,
}

impl TaskType for CalledTask {
    fn declare(name: &str) -> Result<Self, WorkflowError> {
        Ok(Self {
            name: name.to_string(),
            fields: Fields::new(),
            run_count: 0,
        })
    }
}

#[async_trait]
impl Task for CalledTask {
    impl_task_accessors!();

    async fn run(&mut self, _ctx: &Context) -> Result<TaskOutcome, WorkflowError> {
        self.run_count += 1;
        Ok(TaskOutcome::done())
    }

    fn output(&self, _ctx: &Context) -> Result<Option<Value>, WorkflowError> {
        Ok(Some(json!(self.run_count)))
    }
}

#[derive(Debug)]
struct RunErrorTask {
    name: String,
    fields: Fields,
}

impl TaskType for RunErrorTask {
    fn declare(name: &str) -> Result<Self, WorkflowError> {
        Ok(Self {
            name: name.to_string(),
            fields: Fields::new().with(Field::string("error_message").with_default("wth")?),
        })
    }
}

#[async_trait]
impl Task for RunErrorTask {
    impl_task_accessors!();

    async fn run(&mut self, ctx: &Context) -> Result<TaskOutcome, WorkflowError> {
        let message = self.fields.get_str("error_message", ctx)?.unwrap_or_default();
        Err(self.fail(message))
    }
}

#[derive(Debug)]
struct ReadFileTask {
    name: String,
    fields: Fields,
    content: Option<String>,
}

impl TaskType for ReadFileTask {
    fn declare(name: &str) -> Result<Self, WorkflowError> {
        Ok(Self {
            name: name.to_string(),
            fields: Fields::new().with(Field::string("path").required()),
            content: None,
        })
    }
}

#[async_trait]
impl Task for ReadFileTask {
    impl_task_accessors!();

    async fn run(&mut self, ctx: &Context) -> Result<TaskOutcome, WorkflowError> {
        let path = self.fields.get_str("path", ctx)?.unwrap_or_default();
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| self.fail(format!("cannot read {}: {}", path, e)))?;
        self.content = Some(content);
        Ok(TaskOutcome::done())
    }

    fn output(&self, _ctx: &Context) -> Result<Option<Value>, WorkflowError> {
        Ok(Some(json!({ "content": self.content })))
    }
}

#[derive(Debug)]
struct VerifyConnectTask {
    name: String,
    fields: Fields,
}

impl TaskType for VerifyConnectTask {
    fn declare(name: &str) -> Result<Self, WorkflowError> {
        Ok(Self {
            name: name.to_string(),
            fields: Fields::new()
                .with(Field::string("content"))
                .with(Field::string("verify_content"))
                .with(Field::string("required_content").required()),
        })
    }
}

#[async_trait]
impl Task for VerifyConnectTask {
    impl_task_accessors!();

    async fn run(&mut self, ctx: &Context) -> Result<TaskOutcome, WorkflowError> {
        let content = self.fields.get("content", ctx)?;
        let expected = self.fields.get("verify_content", ctx)?;
        self.fields.get("required_content", ctx)?;
        if content != expected {
            return Err(self.fail(format!("{} != {}", content, expected)));
        }
        Ok(TaskOutcome::done())
    }
}

#[derive(Debug)]
struct HibernateTask {
    name: String,
    fields: Fields,
}

impl TaskType for HibernateTask {
    fn declare(name: &str) -> Result<Self, WorkflowError> {
        Ok(Self {
            name: name.to_string(),
            fields: Fields::new()
                .with(Field::number("time_in_ms").with_default(1000)?)
                .with(Field::number("run_count").with_default(1)?),
        })
    }
}

#[async_trait]
impl Task for HibernateTask {
    impl_task_accessors!();

    async fn run(&mut self, ctx: &Context) -> Result<TaskOutcome, WorkflowError> {
        let run_count = self.fields.get_i64("run_count", ctx)?.unwrap_or(0);
        if run_count == 1 {
            self.fields.set("run_count", run_count + 1)?;
            return Ok(TaskOutcome::pause("test pause workflow"));
        }
        Ok(TaskOutcome::done())
    }
}

#[derive(Debug)]
struct RunLimit {
    name: String,
    fields: Fields,
    count: i64,
}

impl TaskType for RunLimit {
    fn declare(name: &str) -> Result<Self, WorkflowError> {
        Ok(Self {
            name: name.to_string(),
            fields: Fields::new()
                .with(Field::number("count").with_default(0)?)
                .with(Field::number("limit").with_default(1)?),
            count: 0,
        })
    }
}

#[async_trait]
impl Task for RunLimit {
    impl_task_accessors!();

    fn init(&mut self) -> Result<(), WorkflowError> {
        self.count = self.fields.get_i64("count", None)?.unwrap_or(0);
        Ok(())
    }

    async fn run(&mut self, ctx: &Context) -> Result<TaskOutcome, WorkflowError> {
        self.count += 1;
        let limit = self.fields.get_i64("limit", ctx)?.unwrap_or(0);
        if self.count > limit {
            return Err(self.fail(format!("Run count {} > limit {}", self.count, limit)));
        }
        Ok(TaskOutcome::done())
    }
}

fn registry() -> TaskRegistry {
    TaskRegistry::new()
        .with_namespace(
            Namespace::new("tests.test_tasks")
                .register::<MyTask>("MyTask")
                .register::<CalledTask>("CalledTask"),
        )
        .with_namespace(
            Namespace::new("tests.test_workflow")
                .register::<RunErrorTask>("RunErrorTask")
                .register::<ReadFileTask>("ReadFileTask")
                .register::<VerifyConnectTask>("VerifyConnectTask")
                .register::<HibernateTask>("HibernateTask")
                .register::<RunLimit>("RunLimit"),
        )
}

fn definition(value: Value) -> WorkflowDefinition {
    WorkflowDefinition::from_value(value).expect("valid definition")
}

#[tokio::test]
async fn test_define_workflow() {
    let registry = registry();
    let workflow = Workflow::new(
        false,
        definition(json!({
            "modules": ["tests.test_tasks"],
            "tasks": {
                "MyTask": {"parameters": {"param1": "abc", "param2": "def"}}
            }
        })),
        &registry,
    )
    .expect("valid workflow");

    let task = workflow.get_task("MyTask").expect("task exists");
    assert_eq!(task.name(), "MyTask");
    assert_eq!(task.fields().get("param1", None).unwrap(), json!("abc"));
    assert_eq!(task.fields().get("param3", None).unwrap(), json!(154));
}

#[tokio::test]
async fn test_undeclared_parameter_aborts_construction() {
    let registry = registry();
    let result = Workflow::new(
        false,
        definition(json!({
            "modules": ["tests.test_tasks"],
            "tasks": {
                "MyTask": {"parameters": {"param1": "abc", "param4": "${}"}}
            }
        })),
        &registry,
    );
    assert!(matches!(
        result,
        Err(WorkflowError::UnknownParameter { parameter, .. }) if parameter == "param4"
    ));
}

#[tokio::test]
async fn test_unresolvable_class_aborts_construction() {
    let registry = registry();
    let result = Workflow::new(
        false,
        definition(json!({
            "modules": ["tests.test_tasks", "tests.elsewhere"],
            "tasks": {"RunErrorTask": {"parameters": {}}}
        })),
        &registry,
    );
    match result {
        Err(WorkflowError::ClassNotFound { class, searched }) => {
            assert_eq!(class, "RunErrorTask");
            assert_eq!(searched, vec!["tests.test_tasks", "tests.elsewhere"]);
        }
        other => panic!("Unexpected result: {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_run_workflow() {
    let registry = registry();
    let mut workflow = Workflow::new(
        false,
        definition(json!({
            "modules": ["tests.test_tasks"],
            "tasks": {"CalledTask": {"parameters": {}}}
        })),
        &registry,
    )
    .expect("valid workflow");

    assert_eq!(workflow.status(), RunStatus::NotStarted);
    workflow.run().await.expect("not raised");

    assert_eq!(workflow.status(), RunStatus::Success);
    assert_eq!(workflow.context().get("CalledTask").unwrap(), &json!(1));
    let stat = workflow.task_run_stat("CalledTask").unwrap();
    assert_eq!(stat.status, RunStatus::Success);
    assert_eq!(stat.output, Some(json!(1)));
    assert!(stat.end_time.is_some());
}

#[tokio::test]
async fn test_run_workflow_error() {
    let registry = registry();
    let mut workflow = Workflow::new(
        false,
        definition(json!({
            "modules": ["tests.test_tasks", "tests.test_workflow"],
            "tasks": {
                "CalledTask": {"parameters": {}},
                "RunErrorTask": {
                    "name": "run_error_task",
                    "parameters": {"error_message": "this is a test error"}
                },
                "MyTask": {"parameters": {}}
            }
        })),
        &registry,
    )
    .expect("valid workflow");

    let status = workflow.run().await.expect("errors are not raised by default");

    assert_eq!(status, RunStatus::Error);
    assert_eq!(workflow.status(), RunStatus::Error);
    assert!(workflow.trace().unwrap().contains("RunErrorTask"));
    assert_eq!(
        workflow.error(),
        Some(&WorkflowError::task_failed(
            "run_error_task",
            "this is a test error"
        ))
    );
    assert_eq!(
        workflow.task_run_stat("CalledTask").unwrap().status,
        RunStatus::Success
    );
    assert!(workflow.task_run_stat("MyTask").is_none());
}

#[tokio::test]
async fn test_raise_on_error() {
    let registry = registry();
    let mut workflow = Workflow::new(
        true,
        definition(json!({
            "modules": ["tests.test_workflow"],
            "tasks": {"RunErrorTask": {"parameters": {}}}
        })),
        &registry,
    )
    .expect("valid workflow");

    let error = workflow.run().await.unwrap_err();
    assert_eq!(error, WorkflowError::task_failed("RunErrorTask", "wth"));
    assert_eq!(workflow.error(), Some(&error));
    assert_eq!(workflow.status(), RunStatus::Error);
}

#[tokio::test]
async fn test_connect_parameters() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "this is a sample content").unwrap();

    let registry = registry();
    let mut workflow = Workflow::new(
        true,
        definition(json!({
            "modules": ["tests.test_workflow"],
            "context": {"extra": {"required": "yes"}},
            "tasks": {
                "ReadFileTask": {
                    "parameters": {"path": file.path().to_string_lossy()}
                },
                "VerifyConnectTask": {
                    "name": "VerifyConnectTask",
                    "parameters": {
                        "content": "$context.content",
                        "verify_content": "this is a sample content",
                        "required_content": "$context.extra.required"
                    }
                }
            }
        })),
        &registry,
    )
    .expect("valid workflow");

    assert_eq!(workflow.run().await, Ok(RunStatus::Success));
    assert_eq!(
        workflow.context().get("content").unwrap(),
        &json!("this is a sample content")
    );
}

#[tokio::test]
async fn test_required_context_reference_fails_when_empty() {
    let registry = registry();
    let mut workflow = Workflow::new(
        false,
        definition(json!({
            "modules": ["tests.test_workflow"],
            "context": {"content": "x", "blank": ""},
            "tasks": {
                "VerifyConnectTask": {
                    "parameters": {
                        "content": "$context.content",
                        "verify_content": "x",
                        "required_content": "$context.blank"
                    }
                }
            }
        })),
        &registry,
    )
    .expect("assignment of a reference is not checked for emptiness");

    assert_eq!(workflow.run().await, Ok(RunStatus::Error));
    assert!(matches!(
        workflow.error(),
        Some(WorkflowError::Validation { field, .. }) if field == "required_content"
    ));
}

#[tokio::test]
async fn test_missing_context_path_is_lookup_error() {
    let registry = registry();
    let mut workflow = Workflow::new(
        false,
        definition(json!({
            "modules": ["tests.test_workflow"],
            "context": {"key1": {"key2": {"key3": "value4"}}},
            "tasks": {
                "VerifyConnectTask": {
                    "parameters": {
                        "content": "$context.key1.key2.key5",
                        "required_content": "present"
                    }
                }
            }
        })),
        &registry,
    )
    .expect("valid workflow");

    assert_eq!(workflow.run().await, Ok(RunStatus::Error));
    assert!(matches!(
        workflow.error(),
        Some(WorkflowError::KeyNotFound { segment, .. }) if segment == "key5"
    ));
}

#[tokio::test]
async fn test_pause_and_resume() {
    let registry = registry();
    let mut workflow = Workflow::new(
        false,
        definition(json!({
            "modules": ["tests.test_tasks", "tests.test_workflow"],
            "tasks": {
                "CalledTask": {"parameters": {}},
                "HibernateTask": {
                    "name": "HibernateTask",
                    "parameters": {"time_in_ms": 1000}
                },
                "MyTask": {"parameters": {}}
            }
        })),
        &registry,
    )
    .expect("valid workflow");

    assert_eq!(workflow.run().await, Ok(RunStatus::Paused));
    assert_eq!(workflow.status(), RunStatus::Paused);
    let paused = workflow.task_run_stat("HibernateTask").unwrap();
    assert_eq!(paused.status, RunStatus::Paused);
    assert_eq!(paused.status_text.as_deref(), Some("test pause workflow"));
    assert!(workflow.task_run_stat("MyTask").is_none());

    let called = workflow.task_run_stat("CalledTask").unwrap().clone();

    assert_eq!(workflow.resume().await, Ok(RunStatus::Success));
    assert_eq!(workflow.task_run_stat("CalledTask").unwrap(), &called);
    // the first task was not run a second time
    assert_eq!(workflow.context().get("CalledTask").unwrap(), &json!(1));
    assert_eq!(
        workflow.task_run_stat("HibernateTask").unwrap().status,
        RunStatus::Success
    );
    assert_eq!(
        workflow.task_run_stat("MyTask").unwrap().status,
        RunStatus::Success
    );
}

#[tokio::test]
async fn test_resume_after_error_retries_failed_task() {
    let registry = registry();
    let mut workflow = Workflow::new(
        false,
        definition(json!({
            "modules": ["tests.test_workflow"],
            "tasks": {"RunLimit": {"parameters": {"limit": 2}}}
        })),
        &registry,
    )
    .expect("valid workflow");

    assert_eq!(workflow.run().await, Ok(RunStatus::Success));

    // a fresh workflow whose task always fails keeps failing on resume
    let mut failing = Workflow::new(
        false,
        definition(json!({
            "modules": ["tests.test_workflow"],
            "tasks": {"RunLimit": {"parameters": {"limit": 0}}}
        })),
        &registry,
    )
    .expect("valid workflow");

    assert_eq!(failing.run().await, Ok(RunStatus::Error));
    let first_error = failing.error().cloned();
    assert_eq!(failing.resume().await, Ok(RunStatus::Error));
    assert_eq!(
        failing.error(),
        Some(&WorkflowError::task_failed("RunLimit", "Run count 2 > limit 0"))
    );
    assert_ne!(failing.error().cloned(), first_error);
    assert_eq!(
        failing.task_run_stat("RunLimit").unwrap().status,
        RunStatus::Error
    );
}

#[tokio::test]
async fn test_numeric_context_reference() {
    let registry = registry();
    let mut workflow = Workflow::new(
        false,
        definition(json!({
            "modules": ["tests.test_workflow"],
            "context": {"limits": {"runs": "3"}},
            "tasks": {
                "RunLimit": {"parameters": {"count": 2, "limit": "$context.limits.runs"}}
            }
        })),
        &registry,
    )
    .expect("valid workflow");

    assert_eq!(workflow.run().await, Ok(RunStatus::Success));
}

#[tokio::test]
async fn test_qualified_class_and_renamed_tasks() {
    let registry = registry();
    let mut workflow = Workflow::new(
        false,
        definition(json!({
            "modules": [],
            "tasks": {
                "first_call": {"cls": "tests.test_tasks.CalledTask", "parameters": {}},
                "second_call": {"cls": "tests.test_tasks.CalledTask", "name": "again"}
            }
        })),
        &registry,
    )
    .expect("valid workflow");

    assert_eq!(workflow.get_task("second_call").unwrap().name(), "again");
    assert_eq!(workflow.run().await, Ok(RunStatus::Success));
    // outputs are stored under the task key, not the display name
    assert_eq!(workflow.context().get("first_call").unwrap(), &json!(1));
    assert_eq!(workflow.context().get("second_call").unwrap(), &json!(1));
    assert!(workflow.context().get("again").is_err());
}

#[tokio::test]
async fn test_yaml_definition() {
    let registry = registry();
    let definition = WorkflowDefinition::from_yaml_str(
        r#"
modules:
  - tests.test_tasks
context:
  seed: 10
tasks:
  MyTask:
    parameters:
      param1: $context.seed
      param3: 7
"#,
    )
    .expect("valid yaml");

    let workflow = Workflow::new(false, definition, &registry).expect("valid workflow");
    let task = workflow.get_task("MyTask").unwrap();
    assert_eq!(
        task.fields().get("param1", workflow.context()).unwrap(),
        json!(10)
    );
    assert_eq!(task.fields().get_i64("param3", None).unwrap(), Some(7));
}

#[tokio::test]
async fn test_state_snapshot_restore() {
    let registry = registry();
    let source = json!({
        "modules": ["tests.test_tasks", "tests.test_workflow"],
        "context": {"origin": "queue"},
        "tasks": {
            "CalledTask": {"parameters": {}},
            "HibernateTask": {"parameters": {"run_count": 2}}
        }
    });

    let mut workflow =
        Workflow::new(false, definition(source.clone()), &registry).expect("valid workflow");
    workflow.run().await.expect("not raised");
    let snapshot = serde_json::to_string(workflow.state()).expect("serializable");

    let state: WorkflowState = serde_json::from_str(&snapshot).expect("deserializable");
    assert_eq!(&state, workflow.state());

    let mut restored = Workflow::builder()
        .registry(&registry)
        .definition(definition(source))
        .state(state)
        .build()
        .expect("valid workflow");

    assert_eq!(restored.status(), RunStatus::Success);
    assert_eq!(restored.context().get("origin").unwrap(), &json!("queue"));
    assert_eq!(restored.resume().await, Ok(RunStatus::Success));
    // nothing ran again, so the restored state is unchanged apart from status
    assert_eq!(restored.into_state(), workflow.into_state());
}
