//! Approval workflow that pauses until an external decision arrives.
//!
//! Run with `RUST_LOG=debug` to see field assignments and skipped tasks.

use async_trait::async_trait;
use hataori::prelude::*;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct PrepareOrder {
    name: String,
    fields: Fields,
}

impl TaskType for PrepareOrder {
    fn declare(name: &str) -> Result<Self, WorkflowError> {
        Ok(Self {
            name: name.to_string(),
            fields: Fields::new()
                .with(Field::string("order_id").required())
                .with(Field::number("quantity").with_default(1)?),
        })
    }
}

#[async_trait]
impl Task for PrepareOrder {
    impl_task_accessors!();

    async fn run(&mut self, ctx: &Context) -> Result<TaskOutcome, WorkflowError> {
        let order_id = self.fields.get_str("order_id", ctx)?.unwrap_or_default();
        println!("Preparing order {}", order_id);
        Ok(TaskOutcome::done())
    }

    fn output(&self, ctx: &Context) -> Result<Option<Value>, WorkflowError> {
        Ok(Some(json!({
            "order": {
                "id": self.fields.get("order_id", ctx)?,
                "quantity": self.fields.get("quantity", ctx)?,
            }
        })))
    }
}

#[derive(Debug)]
struct AwaitApproval {
    name: String,
    fields: Fields,
    requested: bool,
}

impl TaskType for AwaitApproval {
    fn declare(name: &str) -> Result<Self, WorkflowError> {
        Ok(Self {
            name: name.to_string(),
            fields: Fields::new().with(Field::string("approver")),
            requested: false,
        })
    }
}

#[async_trait]
impl Task for AwaitApproval {
    impl_task_accessors!();

    async fn run(&mut self, ctx: &Context) -> Result<TaskOutcome, WorkflowError> {
        if !ctx.contains("approval") {
            if !self.requested {
                let approver = self.fields.get_str("approver", ctx)?.unwrap_or_default();
                println!("Approval requested from {}", approver);
                self.requested = true;
            }
            return Ok(TaskOutcome::pause("waiting for approval"));
        }
        Ok(TaskOutcome::done())
    }
}

#[derive(Debug)]
struct ShipOrder {
    name: String,
    fields: Fields,
}

impl TaskType for ShipOrder {
    fn declare(name: &str) -> Result<Self, WorkflowError> {
        Ok(Self {
            name: name.to_string(),
            fields: Fields::new()
                .with(Field::string("order_id").required())
                .with(Field::number("quantity")),
        })
    }
}

#[async_trait]
impl Task for ShipOrder {
    impl_task_accessors!();

    async fn run(&mut self, ctx: &Context) -> Result<TaskOutcome, WorkflowError> {
        let order_id = self.fields.get_str("order_id", ctx)?.unwrap_or_default();
        let quantity = self.fields.get_i64("quantity", ctx)?.unwrap_or(0);
        println!("Shipping {} item(s) of order {}", quantity, order_id);
        Ok(TaskOutcome::done())
    }

    fn output(&self, _ctx: &Context) -> Result<Option<Value>, WorkflowError> {
        Ok(Some(json!("shipped")))
    }
}

const DEFINITION: &str = r#"
modules:
  - shop.tasks
context:
  customer: acme
tasks:
  prepare:
    cls: PrepareOrder
    parameters:
      order_id: A-1001
      quantity: 3
  approve:
    cls: AwaitApproval
    parameters:
      approver: $context.customer
  ship:
    cls: ShipOrder
    parameters:
      order_id: $context.order.id
      quantity: $context.order.quantity
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = TaskRegistry::new().with_namespace(
        Namespace::new("shop.tasks")
            .register::<PrepareOrder>("PrepareOrder")
            .register::<AwaitApproval>("AwaitApproval")
            .register::<ShipOrder>("ShipOrder"),
    );

    let definition = WorkflowDefinition::from_yaml_str(DEFINITION)?;
    let mut workflow = Workflow::new(true, definition, &registry)?;

    let status = workflow.run().await?;
    println!("Workflow status: {}", status);

    workflow.context_mut().insert("approval", json!({"by": "acme"}));

    let status = workflow.resume().await?;
    println!("Workflow status: {}", status);

    for (key, stat) in workflow.task_run_stats() {
        println!(
            "{:<8} {:<8} {}",
            key,
            stat.status.to_string(),
            stat.output.as_ref().map(|v| v.to_string()).unwrap_or_default()
        );
    }

    Ok(())
}
