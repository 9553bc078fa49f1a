//! Splice Timeline - Layered timeline editing model
//!
//! Implements the editing side of a non-linear video editor:
//! - Layers, tracks, timeline objects and their per-track clips
//! - Interactive move, ripple and trim edits with snapping
//! - Transactional undo/redo history
//! - Auto-transitions and commit to a playback pipeline on its own thread
//! - Versioned JSON snapshots

pub mod action_log;
pub mod clip;
pub mod editing;
pub mod ids;
pub mod layer;
pub mod object;
pub mod operation;
pub mod player;
pub mod selection;
pub mod session;
pub mod signal;
pub mod snapping;
pub mod snapshot;
pub mod timeline;
pub mod track;
pub mod transition;

pub use action_log::{ActionLog, ActionLogEvent, Transaction};
pub use clip::{Clip, ClipKind, Placement};
pub use editing::{Edge, EditMode, EditState, EditingContext};
pub use ids::{ClipId, LayerId, LinkId, ObjectId, TrackId};
pub use layer::Layer;
pub use object::{MediaSource, ObjectSpec, TimelineObject};
pub use operation::{ObjectRecord, Operation};
pub use player::{HeadlessPipeline, PlaybackState, Pipeline, PlayerHandle};
pub use selection::{Selection, SelectionMode};
pub use session::EditorSession;
pub use signal::{Signal, SubscriptionId};
pub use snapping::{SnapChange, SnapMatch, SnapPoint, SnappingEngine};
pub use snapshot::{SnapshotFile, TimelineSnapshot};
pub use timeline::{Timeline, TimelineEvent};
pub use track::{Track, TrackKind};
pub use transition::{find_overlaps, ClipOverlap};
