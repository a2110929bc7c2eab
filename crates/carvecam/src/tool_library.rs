use crate::error::{ConvertError, ConvertResult};
use crate::types::{Tool, ToolShape};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Static collection of tool definitions, loaded once at startup and
/// read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolLibrary {
    pub tools: Vec<Tool>,
}

impl ToolLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Load a library from the provided path. A missing file yields the
    /// built-in default library.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default_library());
        }

        let data =
            fs::read(path).with_context(|| format!("read tool library {}", path.display()))?;
        let library: ToolLibrary =
            serde_json::from_slice(&data).context("deserialize tool library")?;
        Ok(library)
    }

    /// Persist the library to the provided path, ensuring the directory exists.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create tool library directory {}", parent.display()))?;
        }

        let data =
            serde_json::to_vec_pretty(self).context("serialize tool library to JSON bytes")?;
        fs::write(path, data).with_context(|| format!("write tool library {}", path.display()))
    }

    /// Resolve the default library path (`~/.carvecam/tools/library.json`).
    pub fn default_library_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("could not determine home directory"))?;
        Ok(home.join(".carvecam").join("tools").join("library.json"))
    }

    pub fn get(&self, id: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.id == id)
    }

    /// Resolve the tool for a request.
    ///
    /// No `tool_id` yields a synthetic legacy flat tool with unlimited
    /// depth, matching conversions predating the tool library. A diameter
    /// override replaces the resolved diameter only when positive. An
    /// unknown id is a request error.
    pub fn resolve(
        &self,
        tool_id: Option<&str>,
        diameter_override_mm: Option<f64>,
    ) -> ConvertResult<Tool> {
        let mut tool = match tool_id {
            Some(id) => self
                .get(id)
                .cloned()
                .ok_or_else(|| ConvertError::UnknownTool(id.to_string()))?,
            None => Self::legacy_tool(),
        };

        if let Some(diameter) = diameter_override_mm {
            if diameter > 0.0 {
                tool.diameter_mm = diameter;
            }
        }

        Ok(tool)
    }

    /// The fallback tool used when a request names no tool at all.
    pub fn legacy_tool() -> Tool {
        Tool {
            id: "legacy".to_string(),
            name: "Legacy flat cutter".to_string(),
            shape: ToolShape::Flat,
            diameter_mm: 3.175,
            max_depth_mm: f64::INFINITY,
            flute_length_mm: None,
            default_feed_rate_xy: 800.0,
            default_feed_rate_z: 300.0,
            default_spindle_speed: 12000.0,
            tool_number: 0,
        }
    }

    /// Built-in library used when no library file exists on disk.
    pub fn default_library() -> Self {
        let tools = vec![
            Tool {
                id: "flat-6mm".to_string(),
                name: "6mm Flat Endmill".to_string(),
                shape: ToolShape::Flat,
                diameter_mm: 6.0,
                max_depth_mm: 20.0,
                flute_length_mm: Some(20.0),
                default_feed_rate_xy: 1000.0,
                default_feed_rate_z: 300.0,
                default_spindle_speed: 12000.0,
                tool_number: 1,
            },
            Tool {
                id: "flat-3mm".to_string(),
                name: "3mm Flat Endmill".to_string(),
                shape: ToolShape::Flat,
                diameter_mm: 3.0,
                max_depth_mm: 12.0,
                flute_length_mm: Some(12.0),
                default_feed_rate_xy: 800.0,
                default_feed_rate_z: 250.0,
                default_spindle_speed: 14000.0,
                tool_number: 2,
            },
            Tool {
                id: "ball-6mm".to_string(),
                name: "6mm Ball Endmill".to_string(),
                shape: ToolShape::Ball,
                diameter_mm: 6.0,
                max_depth_mm: 20.0,
                flute_length_mm: Some(20.0),
                default_feed_rate_xy: 900.0,
                default_feed_rate_z: 300.0,
                default_spindle_speed: 12000.0,
                tool_number: 3,
            },
            Tool {
                id: "vbit-60".to_string(),
                name: "60° V-Bit".to_string(),
                shape: ToolShape::VBit { angle_deg: 60.0 },
                diameter_mm: 6.0,
                max_depth_mm: 5.0,
                flute_length_mm: None,
                default_feed_rate_xy: 600.0,
                default_feed_rate_z: 200.0,
                default_spindle_speed: 16000.0,
                tool_number: 4,
            },
            Tool {
                id: "vbit-90".to_string(),
                name: "90° V-Bit".to_string(),
                shape: ToolShape::VBit { angle_deg: 90.0 },
                diameter_mm: 9.0,
                max_depth_mm: 4.5,
                flute_length_mm: None,
                default_feed_rate_xy: 600.0,
                default_feed_rate_z: 200.0,
                default_spindle_speed: 16000.0,
                tool_number: 5,
            },
        ];
        Self { tools }
    }
}
