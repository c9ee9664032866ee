#![allow(dead_code)]

use rester::{
    Dispatcher, Failure, Handler, HookCatalog, HookRegistry, OperationResponse, RequestContext,
    Settings,
    testing::{CapturingReporter, MemoryDatabase, StaticProvider},
};
use serde_json::json;

// ============================================================================
// Settings
// ============================================================================

pub fn settings(toml: &str) -> Settings {
    Settings::builder().without_env().toml(toml).build().unwrap()
}

pub fn production() -> Settings {
    settings(
        r#"
        mode = "production"
        [application]
        allow_output_extensions = true
        "#,
    )
}

pub fn development() -> Settings {
    settings(
        r#"
        mode = "development"
        [application]
        allow_output_extensions = true
        "#,
    )
}

// ============================================================================
// Test Handler
// ============================================================================

/// Routes on the first segment:
///
/// - `users` lists two users, `users/<id>` echoes a numeric id
/// - `signup/<name>` stores a record and fires `user_created`
/// - `explode` raises an unhandled failure
/// - an empty first segment answers as the empty route
pub struct UsersHandler;

impl Handler for UsersHandler {
    async fn handle(&self, request: &mut RequestContext) -> Result<OperationResponse, Failure> {
        match (request.segment(0), request.segment(1)) {
            (Some("users"), None) => Ok(OperationResponse::ok(json!([
                { "id": 1, "name": "ada" },
                { "id": 2, "name": "grace" },
            ]))),
            (Some("users"), Some(id)) => {
                let id: u64 = id.parse().map_err(|_| Failure::invalid_argument("bad id"))?;
                Ok(OperationResponse::ok(json!({ "id": id })))
            }
            (Some("signup"), Some(name)) => {
                let name = name.to_string();
                let db = request
                    .resources()
                    .db_as::<MemoryDatabase>()
                    .ok_or_else(|| Failure::message("unexpected database"))?;
                db.insert(name.clone(), json!({ "name": name }))?;
                request.trigger_event("user_created").await?;
                Ok(OperationResponse::created(json!({ "name": name })))
            }
            (Some("explode"), _) => Err(Failure::unhandled(std::io::Error::other("db exploded"))),
            (Some(""), None) => Ok(OperationResponse::ok(json!({ "route": "" }))),
            _ => Err(Failure::invalid_argument("unknown route")),
        }
    }
}

// ============================================================================
// Assembly
// ============================================================================

pub struct Harness {
    pub dispatcher: Dispatcher<StaticProvider>,
    pub provider: StaticProvider,
    pub reporter: CapturingReporter,
}

pub fn harness(settings: Settings) -> Harness {
    harness_with(settings, HookRegistry::new(), HookCatalog::new())
}

pub fn harness_with(settings: Settings, hooks: HookRegistry, catalog: HookCatalog) -> Harness {
    let provider = StaticProvider::new();
    let reporter = CapturingReporter::new();
    let dispatcher = Dispatcher::builder(settings, provider.clone())
        .hooks(hooks)
        .catalog(catalog)
        .reporter(reporter.clone())
        .handler(UsersHandler)
        .build()
        .unwrap();
    Harness {
        dispatcher,
        provider,
        reporter,
    }
}
