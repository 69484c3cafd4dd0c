//! Response assembly — shaping the engine's terminal state into the
//! externally visible reply.
//!
//! A pure function: no side effects, no failure modes.

use chatforge_core::tool::{ToolInvocationRecord, ToolRef};
use chatforge_core::turn::Reply;

/// Build the reply from final content, reasoning, the truncation flag, and
/// the full invocation trace.
///
/// `tools_used` lists each distinct tool that produced at least one
/// successful record, in first-use order. Failed-only tools are visible in
/// the trace on the stored turn but are not claimed as "used".
pub fn assemble_reply(
    content: String,
    reasoning: Option<String>,
    truncated: bool,
    trace: &[ToolInvocationRecord],
) -> Reply {
    let mut tools_used: Vec<ToolRef> = Vec::new();
    for record in trace {
        if record.outcome.is_success() && !tools_used.contains(&record.tool) {
            tools_used.push(record.tool.clone());
        }
    }

    Reply {
        content,
        tools_used,
        reasoning,
        truncated,
    }
}
