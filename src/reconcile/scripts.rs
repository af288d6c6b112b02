//! Script activation.
//!
//! # Responsibilities
//! - Recreate script elements introduced by a patch so the host runs them
//! - Run inline scripts immediately, external ones one at a time in order
//! - Mark activated scripts so no later patch runs them again
//!
//! # Design Decisions
//! - The activation marker is an attribute, so it survives into history
//!   snapshots and restored pages never re-run their scripts
//! - Inline scripts are marked before they run, external ones only after
//!   their load completes
//! - A failing script is logged and skipped; it never fails a navigation

use crate::dom::{NodeId, SharedSurface, Surface};
use crate::host::ScriptRunner;
use crate::observability::metrics;
use crate::reconcile::EXECUTED_ATTR;

const SCRIPT_TYPES: &[&str] = &[
    "",
    "module",
    "text/javascript",
    "application/javascript",
    "application/ecmascript",
    "text/ecmascript",
];

/// Where a script's code comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    Inline(String),
    External(String),
}

/// Whether `node` is a script the host should run and has not run yet.
pub fn is_pending_script(surface: &dyn Surface, node: NodeId) -> bool {
    if surface.tag(node) != Some("script") || surface.attribute(node, EXECUTED_ATTR).is_some() {
        return false;
    }
    let script_type = surface
        .attribute(node, "type")
        .map(|t| t.trim().to_ascii_lowercase())
        .unwrap_or_default();
    SCRIPT_TYPES.contains(&script_type.as_str())
}

/// Activate scripts in the given (document) order. Returns how many ran.
pub async fn activate_scripts(
    surface: &SharedSurface,
    runner: &dyn ScriptRunner,
    scripts: &[NodeId],
) -> usize {
    let mut activated = 0;
    for &script in scripts {
        let Some((fresh, source)) = recreate(&mut *surface.lock(), script) else {
            continue;
        };

        match source {
            ScriptSource::Inline(code) => {
                if let Err(e) = runner.execute_inline(&code).await {
                    tracing::warn!(error = %e, "Inline script failed");
                }
                metrics::record_script_activation("inline");
                activated += 1;
            }
            ScriptSource::External(src) => match runner.load_external(&src).await {
                Ok(()) => {
                    surface.lock().set_attribute(fresh, EXECUTED_ATTR, "true");
                    metrics::record_script_activation("external");
                    activated += 1;
                }
                Err(e) => {
                    tracing::warn!(src = %src, error = %e, "External script failed to load");
                }
            },
        }
    }
    activated
}

/// Swap a pending script for a fresh copy and report its source.
fn recreate(surface: &mut dyn Surface, script: NodeId) -> Option<(NodeId, ScriptSource)> {
    if !surface.is_connected(script) || !is_pending_script(surface, script) {
        return None;
    }
    let copy = surface.snapshot(script)?;
    let fresh = surface.create(&copy);
    surface.replace(script, fresh);

    let source = match surface.attribute(fresh, "src") {
        Some(src) if !src.trim().is_empty() => ScriptSource::External(src),
        _ => {
            surface.set_attribute(fresh, EXECUTED_ATTR, "true");
            ScriptSource::Inline(surface.text_content(fresh))
        }
    };
    Some((fresh, source))
}
