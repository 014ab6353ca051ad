//! Command-line entrypoint for inspecting conversation exports.
//!
//! ```text
//! branchview tree <export.json>
//! branchview plan <export.json> <node-id>
//! branchview navigate <export.json> <node-id>
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use branchview::start_branchview::init_tracing;
use branchview::tree::core::config::BranchviewConfig;
use branchview::tree::core::ids::NodeId;
use branchview::tree::core::raw::Conversation;
use branchview::tree::navigation::{
    CurrentNodeOracle, Navigator, SimulatedBranchSurface, plan_steps,
};
use branchview::tree::normalize::{Normalizer, load_export};
use branchview::tree::session::ConversationSession;
use tokio::sync::RwLock;

const USAGE: &str = "usage: branchview <tree|plan|navigate> <export.json> [node-id]";

fn main() -> ExitCode {
    init_tracing();
    let args: Vec<String> = std::env::args().skip(1).collect();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match rt.block_on(dispatch(&args)) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn dispatch(args: &[String]) -> Result<String> {
    let (command, path) = match args {
        [command, path, ..] => (command.as_str(), path.as_str()),
        _ => bail!(USAGE),
    };
    let conversation =
        load_export(path).with_context(|| format!("failed to read export {path}"))?;
    let target = || -> Result<NodeId> {
        args.get(2)
            .map(|id| NodeId::from(id.as_str()))
            .context(USAGE)
    };

    match command {
        "tree" => show_tree(&conversation),
        "plan" => plan(&conversation, &target()?).await,
        "navigate" => navigate(&conversation, &target()?).await,
        other => bail!("unknown command {other:?}\n{USAGE}"),
    }
}

fn show_tree(conversation: &Conversation) -> Result<String> {
    let config = BranchviewConfig::from_env();
    let tree = Normalizer::new(config.normalize).normalize(&conversation.mapping);
    Ok(serde_json::to_string_pretty(&tree)?)
}

/// Plan against the branch the export was saved on.
async fn plan(conversation: &Conversation, target: &NodeId) -> Result<String> {
    let config = BranchviewConfig::from_env();
    config.validate()?;
    let tree = RwLock::new(Normalizer::new(config.normalize).normalize(&conversation.mapping));
    let oracle = CurrentNodeOracle::from_conversation(conversation);
    Navigator::new(config.navigation)
        .refresh(&tree, &oracle)
        .await?;

    let steps = plan_steps(&tree.read().await.nodes, target.as_str());
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "target": target,
        "count": steps.len(),
        "steps": steps,
    }))?)
}

/// Dry run against a simulated page opened on the export's current branch.
async fn navigate(conversation: &Conversation, target: &NodeId) -> Result<String> {
    let config = BranchviewConfig::from_env();
    let tree = Normalizer::new(config.normalize.clone()).normalize(&conversation.mapping);
    let surface = Arc::new(SimulatedBranchSurface::from_tree(&tree));
    if let Some(current) = &conversation.current_node {
        surface.show(current).await;
    }

    let session = ConversationSession::new(config, surface.clone(), surface.clone())?;
    session.load_conversation(conversation).await;
    let outcome = session
        .navigate_to(target)
        .await
        .with_context(|| format!("navigation to {target} failed"))?;

    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "outcome": outcome,
        "steps": surface.executed().await,
    }))?)
}
