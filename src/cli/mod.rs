//! Command-line interface definitions for the `tier3` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser, ValueEnum};

/// Top-level CLI for the `tier3` binary.
#[derive(Debug, Parser)]
#[command(
    name = "tier3",
    about = "Call the Tier3 REST API with a cached session",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Log on and print the session cookie.
    #[command(name = "logon", about = "Log on and print the session cookie")]
    Logon,
    /// Issue a GET and print every page.
    #[command(name = "get", about = "Issue a GET and print every page")]
    Get(GetCommand),
    /// Issue a POST with a JSON body.
    #[command(name = "post", about = "Issue a POST with a JSON body")]
    Post(BodyCommand),
    /// Issue a PUT with a JSON body.
    #[command(name = "put", about = "Issue a PUT with a JSON body")]
    Put(BodyCommand),
    /// Issue a DELETE.
    #[command(name = "delete", about = "Issue a DELETE")]
    Delete(TargetArgs),
    /// Print the deployment status of a request.
    #[command(name = "status", about = "Print the deployment status of a request")]
    Status(StatusCommand),
    /// Wait until a request reports a resource.
    #[command(name = "wait", about = "Wait until a request reports a resource")]
    Wait(WaitCommand),
    /// Verify the configured account and credentials.
    #[command(name = "check", about = "Verify the configured account and credentials")]
    Check,
}

/// Resource, identifier and query parameters of a call.
#[derive(Debug, Args)]
pub(crate) struct TargetArgs {
    /// Resource path below `/REST/`, for example `Server/GetServer/JSON`.
    #[arg(value_name = "RESOURCE")]
    pub(crate) resource: String,
    /// Resource identifier appended to the path.
    #[arg(long, value_name = "ID")]
    pub(crate) id: Option<String>,
    /// Query parameter as `KEY=VALUE`; may be repeated.
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub(crate) params: Vec<(String, String)>,
}

/// Arguments for the `tier3 get` subcommand.
#[derive(Debug, Args)]
pub(crate) struct GetCommand {
    /// Call target.
    #[command(flatten)]
    pub(crate) target: TargetArgs,
    /// Print only the first page of a multi-page result.
    #[arg(long)]
    pub(crate) first_page: bool,
}

/// Arguments for the `tier3 post` and `tier3 put` subcommands.
#[derive(Debug, Args)]
pub(crate) struct BodyCommand {
    /// Resource path below `/REST/`.
    #[arg(value_name = "RESOURCE")]
    pub(crate) resource: String,
    /// Resource identifier appended to the path (PUT only).
    #[arg(long, value_name = "ID")]
    pub(crate) id: Option<String>,
    /// JSON request body.
    #[arg(long, value_name = "JSON", default_value = "{}")]
    pub(crate) body: String,
}

/// Arguments for the `tier3 status` subcommand.
#[derive(Debug, Args)]
pub(crate) struct StatusCommand {
    /// Correlation identifier returned by a mutating call.
    #[arg(value_name = "REQUEST_ID")]
    pub(crate) request_id: i64,
}

/// Arguments for the `tier3 wait` subcommand.
#[derive(Debug, Args)]
pub(crate) struct WaitCommand {
    /// Correlation identifier returned by a mutating call.
    #[arg(value_name = "REQUEST_ID")]
    pub(crate) request_id: i64,
    /// Kind of operation, which sets how long to wait.
    #[arg(long, value_enum, default_value_t = WaitKind::Provision)]
    pub(crate) kind: WaitKind,
}

/// Operation kinds accepted by `tier3 wait`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum WaitKind {
    /// Server creation (two minutes).
    Provision,
    /// Server resize (two minutes).
    Resize,
    /// Server snapshot (one minute).
    Snapshot,
    /// Server deletion (one minute).
    Delete,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    if key.trim().is_empty() {
        return Err(format!("missing key in `{raw}`"));
    }
    Ok((key.trim().to_owned(), value.to_owned()))
}
