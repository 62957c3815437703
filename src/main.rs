//! Binary entry point for the `tier3` CLI.

mod cli;

use std::io::{self, Write};
use std::process;

use clap::Parser;
use serde_json::Value;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use cli::{BodyCommand, Cli, GetCommand, StatusCommand, TargetArgs, WaitCommand, WaitKind};
use tier3::deployment::query_status;
use tier3::{
    ApiClient, ApiError, ConfigError, DeploymentPoller, OperationKind, ResponseBody,
    ResponseFuture, Tier3Config, check_context,
};

/// Filter applied when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "tier3=info";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("invalid JSON body: {0}")]
    Body(String),
    #[error("account check failed for `{0}`")]
    Context(String),
    #[error("request {0} did not report a resource before the wait bound")]
    Unconfirmed(i64),
    #[error("failed to write output: {0}")]
    Output(String),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config = Tier3Config::load_without_cli_args()?;
    let client = ApiClient::from_config(&config)?;
    let mut stdout = io::stdout();
    match cli {
        Cli::Logon => {
            let cookie = client.logon().await?;
            write_line(&mut stdout, &cookie)
        }
        Cli::Get(command) => run_get(&client, command, &mut stdout).await,
        Cli::Post(command) => {
            let body = parse_body(&command)?;
            let response = client.post(&command.resource, &body).await?;
            write_response(&mut stdout, &response).await
        }
        Cli::Put(command) => {
            let body = parse_body(&command)?;
            let response = client
                .put(&command.resource, command.id.as_deref(), &body)
                .await?;
            write_response(&mut stdout, &response).await
        }
        Cli::Delete(target) => run_delete(&client, target).await,
        Cli::Status(StatusCommand { request_id }) => {
            let status = query_status(&client, request_id).await?;
            let rendered = format!("{status:#?}");
            write_line(&mut stdout, &rendered)
        }
        Cli::Wait(command) => run_wait(client, &command, &mut stdout).await,
        Cli::Check => {
            let alias = check_context(&client)
                .await
                .ok_or_else(|| CliError::Context(client.account().to_owned()))?;
            write_line(&mut stdout, &alias)
        }
    }
}

async fn run_get(
    client: &ApiClient,
    command: GetCommand,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let TargetArgs {
        resource,
        id,
        params,
    } = command.target;
    let first = client.get("cli get", &resource, id.as_deref(), params);
    if command.first_page {
        return write_response(out, &first).await;
    }
    let mut cursor = Some(first);
    while let Some(page) = cursor {
        write_response(out, &page).await?;
        cursor = page.next().await?;
    }
    Ok(())
}

async fn run_delete(client: &ApiClient, target: TargetArgs) -> Result<(), CliError> {
    client
        .delete(&target.resource, target.id.as_deref(), target.params)
        .await?;
    Ok(())
}

async fn run_wait(
    client: ApiClient,
    command: &WaitCommand,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let poller = DeploymentPoller::new(client, operation_kind(command.kind));
    let resource = poller
        .wait_for_resource(command.request_id)
        .await?
        .ok_or(CliError::Unconfirmed(command.request_id))?;
    write_line(out, &resource)
}

const fn operation_kind(kind: WaitKind) -> OperationKind {
    match kind {
        WaitKind::Provision => OperationKind::Provision,
        WaitKind::Resize => OperationKind::Resize,
        WaitKind::Snapshot => OperationKind::Snapshot,
        WaitKind::Delete => OperationKind::Delete,
    }
}

fn parse_body(command: &BodyCommand) -> Result<Value, CliError> {
    serde_json::from_str(&command.body).map_err(|err| CliError::Body(err.to_string()))
}

async fn write_response(out: &mut impl Write, response: &ResponseFuture) -> Result<(), CliError> {
    let rendered = render_body(&response.body().await?)?;
    if rendered.is_empty() {
        return Ok(());
    }
    write_line(out, &rendered)
}

fn render_body(body: &ResponseBody) -> Result<String, CliError> {
    match body {
        ResponseBody::Json(document) => serde_json::to_string_pretty(document)
            .map_err(|err| CliError::Output(err.to_string())),
        ResponseBody::Raw(data) => Ok(String::from_utf8_lossy(data).into_owned()),
        ResponseBody::Empty => Ok(String::new()),
    }
}

fn write_line(out: &mut impl Write, text: &str) -> Result<(), CliError> {
    writeln!(out, "{text}").map_err(|err| CliError::Output(err.to_string()))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
