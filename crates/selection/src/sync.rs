//! Cross-page selection synchronizer
//!
//! A single logical selection may span many page containers. Every host
//! notification is turned into a [`SelectionEvent`] and fed through
//! [`SelectionSync::handle`], which decides which containers are selecting
//! and where the end-of-content marker sits so dragging past the last glyph
//! of a page keeps extending the selection.

use std::collections::HashMap;

use crate::host::{ContainerId, MarkerId, MarkerSide, NodeId, SelectionHost, SelectionRange};
use crate::registry::{ContainerRegistry, RegistryEntry};

/// Host notifications the synchronizer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    PointerDown,
    PointerUp,
    WindowBlur,
    KeyUp,
    /// Current host range, or `None` when nothing is selected
    SelectionChanged(Option<SelectionRange>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerState {
    #[default]
    Idle,
    Selecting,
}

/// Where the end marker was moved during a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerPlacement {
    pub container: ContainerId,
    pub marker: MarkerId,
    pub anchor: NodeId,
    pub side: MarkerSide,
}

/// What one transition did to the host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub activated: Vec<ContainerId>,
    pub reset: Vec<ContainerId>,
    pub marker: Option<MarkerPlacement>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.activated.is_empty() && self.reset.is_empty() && self.marker.is_none()
    }
}

/// Selection state machine owned by one viewer
#[derive(Debug, Default)]
pub struct SelectionSync {
    registry: ContainerRegistry,
    states: HashMap<ContainerId, ContainerState>,
    pointer_down: bool,
    previous: Option<SelectionRange>,
    native_trailing: Option<bool>,
}

impl SelectionSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ContainerRegistry {
        &self.registry
    }

    pub fn mount(&mut self, container: ContainerId, end_marker: MarkerId) {
        self.registry.insert(container, end_marker);
        self.states.insert(container, ContainerState::Idle);
    }

    pub fn unmount(&mut self, container: ContainerId) -> Option<RegistryEntry> {
        self.states.remove(&container);
        self.registry.remove(container)
    }

    pub fn state(&self, container: ContainerId) -> Option<ContainerState> {
        self.states.get(&container).copied()
    }

    pub fn is_pointer_down(&self) -> bool {
        self.pointer_down
    }

    pub fn previous_range(&self) -> Option<SelectionRange> {
        self.previous
    }

    /// Apply one event. This is the only place selection state changes.
    pub fn handle(&mut self, event: SelectionEvent, host: &mut dyn SelectionHost) -> SweepReport {
        match event {
            SelectionEvent::PointerDown => {
                self.pointer_down = true;
                SweepReport::default()
            }
            SelectionEvent::PointerUp | SelectionEvent::WindowBlur => {
                self.pointer_down = false;
                self.reset_all(host)
            }
            SelectionEvent::KeyUp => {
                if self.pointer_down {
                    SweepReport::default()
                } else {
                    self.reset_all(host)
                }
            }
            SelectionEvent::SelectionChanged(None) => {
                self.previous = None;
                self.reset_all(host)
            }
            SelectionEvent::SelectionChanged(Some(range)) => {
                let mut report = self.sweep(&range, host);
                report.marker = self.reposition_marker(&range, host);
                self.previous = Some(range);
                report
            }
        }
    }

    fn reset_all(&mut self, host: &mut dyn SelectionHost) -> SweepReport {
        let mut report = SweepReport::default();
        for entry in self.registry.snapshot() {
            self.reset(&entry, host);
            report.reset.push(entry.container);
        }
        report
    }

    fn reset(&mut self, entry: &RegistryEntry, host: &mut dyn SelectionHost) {
        host.reset_marker(entry.container, entry.end_marker);
        host.set_selecting(entry.container, false);
        self.states.insert(entry.container, ContainerState::Idle);
    }

    fn sweep(&mut self, range: &SelectionRange, host: &mut dyn SelectionHost) -> SweepReport {
        let mut report = SweepReport::default();
        for entry in self.registry.snapshot() {
            if host.intersects(range, entry.container) {
                host.set_selecting(entry.container, true);
                self.states.insert(entry.container, ContainerState::Selecting);
                report.activated.push(entry.container);
            } else {
                self.reset(&entry, host);
                report.reset.push(entry.container);
            }
        }
        report
    }

    fn reposition_marker(
        &mut self,
        range: &SelectionRange,
        host: &mut dyn SelectionHost,
    ) -> Option<MarkerPlacement> {
        let native = *self.native_trailing.get_or_insert_with(|| host.native_trailing_selection());
        if native {
            return None;
        }

        let modify_start = self
            .previous
            .is_some_and(|previous| range.end == previous.end || range.start == previous.end);

        let (anchor, side) = if modify_start {
            (range.start.node, MarkerSide::Before)
        } else if range.end.offset == 0 {
            (host.previous_content_node(range.end.node)?, MarkerSide::After)
        } else {
            (range.end.node, MarkerSide::After)
        };

        let Some(container) = host.container_of(anchor) else {
            log::debug!("selection anchor {:?} is outside every page container", anchor);
            return None;
        };
        let marker = self.registry.marker_for(container)?;

        host.place_marker(marker, container, anchor, side);
        Some(MarkerPlacement { container, marker, anchor, side })
    }
}
