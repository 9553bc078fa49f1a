//! Editor session: one timeline, its history and the view zoom.

use std::path::Path;

use splice_core::{EditorSettings, RationalTime, Result, SpliceError, Zoom};
use tracing::{info, warn};

use crate::action_log::ActionLog;
use crate::editing::{Edge, EditMode, EditingContext};
use crate::ids::ObjectId;
use crate::snapshot::SnapshotFile;
use crate::timeline::Timeline;

/// Owns a [`Timeline`] and its [`ActionLog`]. User-level actions run
/// through here so each one lands in the history as a single step.
#[derive(Debug)]
pub struct EditorSession {
    settings: EditorSettings,
    zoom: Zoom,
    timeline: Timeline,
    log: ActionLog,
    edit: Option<EditingContext>,
}

impl EditorSession {
    pub fn new(settings: EditorSettings) -> Self {
        let zoom = settings.zoom();
        let timeline = Timeline::with_settings(&settings);
        let log = ActionLog::new(settings.max_undo_depth);
        Self {
            settings,
            zoom,
            timeline,
            log,
            edit: None,
        }
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Direct access for mutations outside a transaction. They are not
    /// undoable.
    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    pub fn action_log(&self) -> &ActionLog {
        &self.log
    }

    pub fn action_log_mut(&mut self) -> &mut ActionLog {
        &mut self.log
    }

    // ── History ─────────────────────────────────────────────────

    pub fn begin(&mut self, name: impl Into<String>) {
        self.log.begin(&mut self.timeline, name);
    }

    pub fn commit(&mut self) -> Result<()> {
        self.log.commit(&mut self.timeline)
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.log.rollback(&mut self.timeline)
    }

    pub fn undo(&mut self) -> Result<bool> {
        self.log.undo(&mut self.timeline)
    }

    pub fn redo(&mut self) -> Result<bool> {
        self.log.redo(&mut self.timeline)
    }

    pub fn checkpoint(&mut self) -> Result<()> {
        self.log.checkpoint()
    }

    pub fn is_dirty(&self) -> bool {
        self.log.dirty()
    }

    /// Run `f` inside a transaction named `name`. If `f` fails, the open
    /// transaction is rolled back and the error returned.
    pub fn transaction<T>(
        &mut self,
        name: impl Into<String>,
        f: impl FnOnce(&mut Timeline) -> Result<T>,
    ) -> Result<T> {
        self.log.begin(&mut self.timeline, name);
        match f(&mut self.timeline) {
            Ok(value) => {
                self.log.commit(&mut self.timeline)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.log.rollback(&mut self.timeline) {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    // ── Zoom ────────────────────────────────────────────────────

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    /// Change the zoom; the snapping deadband follows it.
    pub fn set_zoom(&mut self, zoom: Zoom) {
        self.zoom = zoom;
        let distance = self.settings.snapping_distance(zoom);
        self.timeline.set_snapping_distance(distance);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom.zoom_in());
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom.zoom_out());
    }

    /// Zoom so the whole timeline fits in `width_px`. Does nothing for an
    /// empty timeline.
    pub fn zoom_fit(&mut self, width_px: f64) {
        if let Some(zoom) = Zoom::fit(self.timeline.duration(), width_px) {
            self.set_zoom(zoom);
        }
    }

    // ── Interactive edits ───────────────────────────────────────

    /// Start editing `focus`. If the focus is selected, the rest of the
    /// selection moves with it.
    pub fn start_edit(&mut self, focus: ObjectId, mode: EditMode, edge: Edge) -> Result<()> {
        if self.edit.is_some() {
            return Err(SpliceError::InvalidState(
                "another edit is already in progress".into(),
            ));
        }
        let selection = self.timeline.selection();
        let secondary: Vec<ObjectId> = if selection.contains(focus) {
            selection
                .members()
                .iter()
                .copied()
                .filter(|id| *id != focus)
                .collect()
        } else {
            Vec::new()
        };
        let context = EditingContext::new(&mut self.timeline, focus, &secondary, mode, edge)?;
        self.edit = Some(context);
        Ok(())
    }

    pub fn edit_to(&mut self, delta: RationalTime, priority: u32) -> Result<()> {
        let context = self
            .edit
            .as_mut()
            .ok_or_else(|| SpliceError::InvalidState("no edit in progress".into()))?;
        context.edit_to(&mut self.timeline, delta, priority)
    }

    pub fn finish_edit(&mut self) -> Result<()> {
        let mut context = self.take_edit()?;
        context.finish(&mut self.timeline, &mut self.log)
    }

    pub fn cancel_edit(&mut self) -> Result<()> {
        let mut context = self.take_edit()?;
        context.cancel(&mut self.timeline)
    }

    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }

    fn take_edit(&mut self) -> Result<EditingContext> {
        self.edit
            .take()
            .ok_or_else(|| SpliceError::InvalidState("no edit in progress".into()))
    }

    // ── Selection actions ───────────────────────────────────────

    fn selected(&self) -> Vec<ObjectId> {
        self.timeline.selection().members().to_vec()
    }

    /// Remove every selected object. Returns how many were removed.
    pub fn delete_selected(&mut self) -> Result<usize> {
        let selected: Vec<ObjectId> = self
            .selected()
            .into_iter()
            .filter(|id| self.timeline.object(*id).is_ok_and(|o| !o.is_transition()))
            .collect();
        self.transaction("delete", |timeline| {
            for id in &selected {
                timeline.remove_object(*id)?;
            }
            Ok(selected.len())
        })
    }

    /// Lock the clips of every selected object to their object.
    pub fn group_selected(&mut self) -> Result<()> {
        self.set_selected_locked("group", true)
    }

    /// Unlock the clips of every selected object so they can be placed
    /// independently.
    pub fn ungroup_selected(&mut self) -> Result<()> {
        self.set_selected_locked("ungroup", false)
    }

    fn set_selected_locked(&mut self, name: &str, locked: bool) -> Result<()> {
        let selected = self.selected();
        self.transaction(name, |timeline| {
            for id in &selected {
                timeline.set_object_locked(*id, locked)?;
            }
            Ok(())
        })
    }

    pub fn link_selected(&mut self) -> Result<()> {
        let selected = self.selected();
        self.transaction("link", |timeline| timeline.link_objects(&selected).map(drop))
    }

    pub fn unlink_selected(&mut self) -> Result<()> {
        let selected = self.selected();
        self.transaction("unlink", |timeline| {
            for id in &selected {
                timeline.unlink_object(*id)?;
            }
            Ok(())
        })
    }

    /// Split every object crossing `position`.
    pub fn split_at(&mut self, position: RationalTime) -> Result<Vec<ObjectId>> {
        self.transaction("split", |timeline| timeline.split_at(position))
    }

    // ── Persistence ─────────────────────────────────────────────

    pub fn save(&mut self, path: &Path) -> Result<()> {
        SnapshotFile::new(self.timeline.extract_snapshot()).save_to_file(path)?;
        self.log.checkpoint()?;
        info!(path = %path.display(), "timeline saved");
        Ok(())
    }

    /// Replace the timeline contents with the ones stored at `path`.
    /// Listeners and the player stay attached, history is cleared and the
    /// zoom, with the snapping distance it implies, returns to the
    /// settings' default.
    pub fn open(&mut self, path: &Path) -> Result<()> {
        if self.edit.is_some() || self.log.in_transaction() {
            return Err(SpliceError::InvalidState(
                "cannot open a timeline while editing".into(),
            ));
        }
        let file = SnapshotFile::load_from_file(path)?;
        self.timeline.replace_contents(file.timeline)?;
        self.set_zoom(self.settings.zoom());
        self.log.clean()?;
        info!(path = %path.display(), "timeline opened");
        Ok(())
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}
