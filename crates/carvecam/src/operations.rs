//! Operation assembly.
//!
//! The client may post a structured `operations` array selecting tools and
//! polyline subsets. The payload is weakly typed and parsed best-effort:
//! invalid entries are dropped or fall back to the request's default tool,
//! while a payload that is present but not a JSON array at all is a request
//! error. Without a payload, one implicit operation wraps all geometry.

use crate::error::{ConvertError, ConvertResult};
use crate::tool_library::ToolLibrary;
use crate::types::{Operation, Polyline, Tool};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

pub const OUTLINE_STRATEGY: &str = "outline";

/// One entry of the client-supplied operations array.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperationSpec {
    pub tool_id: Option<String>,
    pub tool_diameter_mm: Option<f64>,
    pub strategy: Option<String>,
    /// Indices into the extracted polylines; absent selects everything.
    pub polyline_indices: Option<Vec<usize>>,
}

/// Parse the raw `operations` value into specs.
///
/// `None` (absent) is fine; a JSON string is parsed as embedded JSON; any
/// present value that is not an array fails. Entries that do not fit the
/// spec shape are dropped silently.
pub fn parse_operation_specs(raw: Option<&Value>) -> ConvertResult<Option<Vec<OperationSpec>>> {
    let value = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => serde_json::from_str::<Value>(s)
            .map_err(|e| ConvertError::InvalidOperationsPayload(e.to_string()))?,
        Some(other) => other.clone(),
    };

    let Value::Array(entries) = value else {
        return Err(ConvertError::InvalidOperationsPayload(
            "expected a JSON array".to_string(),
        ));
    };

    let mut specs = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<OperationSpec>(entry) {
            Ok(spec) => specs.push(spec),
            Err(err) => warn!(%err, "dropping malformed operation entry"),
        }
    }
    Ok(Some(specs))
}

/// Bind specs (or the implicit default) to tools and geometry.
///
/// Unknown tool ids inside an entry fall back to the request's resolved
/// tool rather than failing; out-of-range polyline indices are dropped
/// silently.
pub fn assemble(
    polylines: Vec<Polyline>,
    specs: Option<Vec<OperationSpec>>,
    library: &ToolLibrary,
    default_tool: &Tool,
) -> Vec<Operation> {
    let specs = match specs {
        Some(specs) if !specs.is_empty() => specs,
        _ => {
            return vec![Operation {
                id: 0,
                tool: default_tool.clone(),
                strategy: OUTLINE_STRATEGY.to_string(),
                polylines,
            }];
        }
    };

    let mut operations = Vec::with_capacity(specs.len());
    for (id, spec) in specs.into_iter().enumerate() {
        let mut tool = match spec.tool_id.as_deref() {
            Some(tool_id) => match library.get(tool_id) {
                Some(tool) => tool.clone(),
                None => {
                    warn!(tool_id, "unknown tool in operation entry, using default");
                    default_tool.clone()
                }
            },
            None => default_tool.clone(),
        };
        if let Some(diameter) = spec.tool_diameter_mm {
            if diameter > 0.0 {
                tool.diameter_mm = diameter;
            }
        }

        let selected: Vec<Polyline> = match &spec.polyline_indices {
            Some(indices) => indices
                .iter()
                .filter_map(|&i| polylines.get(i).cloned())
                .collect(),
            None => polylines.clone(),
        };
        if selected.is_empty() {
            continue;
        }

        operations.push(Operation {
            id,
            tool,
            strategy: spec
                .strategy
                .unwrap_or_else(|| OUTLINE_STRATEGY.to_string()),
            polylines: selected,
        });
    }
    operations
}
