//! Scripted region edits, for running the editor without a screen.
//!
//! A script is a JSON array of actions applied in order:
//!
//! ```json
//! [
//!   {"action": "draw", "frame": 12, "from": [100, 100], "to": [160, 160]},
//!   {"action": "remove_at", "frame": 12, "point": [120, 120]},
//!   {"action": "remove", "frame": 3, "index": 0},
//!   {"action": "clear", "frame": 5}
//! ]
//! ```
//!
//! Points are in display pixels of the editor canvas.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use maskflow_core::editor::domain::render_surface::{RenderSurface, SurfaceLayout};
use maskflow_core::editor::infrastructure::raster_surface::RasterSurface;
use maskflow_core::editor::region_editor::{DrawOutcome, RegionEditor};
use maskflow_core::pipeline::error::PipelineError;
use maskflow_core::shared::geometry::DisplayPoint;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EditAction {
    Draw {
        frame: u32,
        from: [f64; 2],
        to: [f64; 2],
    },
    RemoveAt {
        frame: u32,
        point: [f64; 2],
    },
    Remove {
        frame: u32,
        index: usize,
    },
    Clear {
        frame: u32,
    },
}

impl EditAction {
    pub fn frame(&self) -> u32 {
        match self {
            Self::Draw { frame, .. }
            | Self::RemoveAt { frame, .. }
            | Self::Remove { frame, .. }
            | Self::Clear { frame } => *frame,
        }
    }
}

pub fn load(path: &Path) -> Result<Vec<EditAction>, Box<dyn std::error::Error>> {
    let json = fs::read_to_string(path)
        .map_err(|e| format!("Cannot read edit script {}: {e}", path.display()))?;
    let actions = serde_json::from_str(&json)
        .map_err(|e| format!("Invalid edit script {}: {e}", path.display()))?;
    Ok(actions)
}

fn point([x, y]: [f64; 2]) -> DisplayPoint {
    DisplayPoint::new(x, y)
}

/// Applies `actions` through the editor, optionally saving a snapshot of
/// the canvas after each one.
pub async fn apply(
    editor: &mut RegionEditor,
    surface: &mut RasterSurface,
    actions: &[EditAction],
    render_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let layout = SurfaceLayout::unscaled(surface.size());
    editor.load_frame(surface).await?;

    for (step, action) in actions.iter().enumerate() {
        if action.frame() != editor.current_frame() {
            editor.go_to_frame(action.frame(), surface).await?;
        }
        apply_one(editor, surface, &layout, action).await?;
        if let Some(dir) = render_dir {
            let path = snapshot_path(dir, step, editor.current_frame());
            surface.save_png(&path)?;
            log::debug!("Saved {}", path.display());
        }
    }
    Ok(())
}

async fn apply_one(
    editor: &mut RegionEditor,
    surface: &mut RasterSurface,
    layout: &SurfaceLayout,
    action: &EditAction,
) -> Result<(), PipelineError> {
    match *action {
        EditAction::Draw { frame, from, to } => {
            if !editor.mode().is_adding() {
                editor.toggle_add_mode(surface);
            }
            editor.pointer_down(layout, point(from));
            editor.pointer_move(layout, point(to), surface);
            match editor.pointer_up(layout, point(to), surface).await? {
                DrawOutcome::Added(rect) => log::info!("Frame {frame}: added {:?}", rect.rounded()),
                DrawOutcome::Discarded => log::warn!("Frame {frame}: rectangle too small, skipped"),
                DrawOutcome::Ignored => {}
            }
        }
        EditAction::RemoveAt { frame, point: at } => {
            if !editor.mode().is_removing() {
                editor.toggle_remove_mode(surface);
            }
            if editor.pointer_click(layout, point(at), surface).await?.is_none() {
                log::warn!("Frame {frame}: no face at ({}, {})", at[0], at[1]);
            }
        }
        EditAction::Remove { index, .. } => editor.remove_face(index, surface).await?,
        EditAction::Clear { frame } => {
            let cleared = editor.clear_current_frame(surface).await?;
            log::info!("Frame {frame}: cleared {cleared} faces");
        }
    }
    Ok(())
}

fn snapshot_path(dir: &Path, step: usize, frame: u32) -> PathBuf {
    dir.join(format!("edit_{step:03}_frame_{frame:05}.png"))
}
