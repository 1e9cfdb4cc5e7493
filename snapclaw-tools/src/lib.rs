pub mod list_tool;
pub mod read_tool;
pub mod run_tool;
pub mod write_tool;

use std::sync::Arc;
use std::time::Duration;

use snapclaw_core::agent::ToolRegistry;
use snapclaw_core::confiner::Confiner;

use crate::list_tool::ListTool;
use crate::read_tool::ReadTool;
use crate::run_tool::RunTool;
use crate::write_tool::WriteTool;

/// Build the registry with the full built-in tool set, all bound to the same
/// confined workspace.
pub fn builtin_registry(confiner: Arc<Confiner>, script_timeout: Duration) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ListTool::new(Arc::clone(&confiner))));
    registry.register(Arc::new(ReadTool::new(Arc::clone(&confiner))));
    registry.register(Arc::new(WriteTool::new(Arc::clone(&confiner))));
    registry.register(Arc::new(RunTool::new(confiner, script_timeout)));
    registry
}
