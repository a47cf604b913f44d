//! Gesture state machine driving placement, drag, resize, rotation,
//! duplication and deletion of annotations.
//!
//! Mouse and touch input are both reduced to [`PointerSample`]s before they
//! get here. Exactly one gesture can be active; a second pointer-down while
//! dragging or resizing is ignored until the first one ends.

use crate::annotation::{AnnotationId, Rotation, TextStyle};
use crate::capture::SignatureImage;
use crate::error::Error;
use crate::geometry::{
    drag_position, grab_offset, pointer_to_document, Point, PointerSample, ResizeStart, ScreenRect,
    Size,
};
use crate::history::HistoryLog;
use crate::store::AnnotationStore;
use log::debug;
use std::sync::Arc;

/// What a pointer-down landed on, as reported by the host's hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Annotation(AnnotationId),
    ResizeHandle(AnnotationId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
}

/// Content supplied when the placement input is confirmed.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingContent {
    /// Use the capture surface's current bitmap.
    Signature,
    Text {
        content: String,
        style: Option<TextStyle>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    Click(PointerSample),
    PointerDown {
        sample: PointerSample,
        target: Target,
    },
    PointerMove(PointerSample),
    PointerUp,
    PointerLeave,
    DoubleClick(AnnotationId),
    Delete(AnnotationId),
    Rotate(AnnotationId),
    Confirm(PendingContent),
    Cancel,
}

impl InteractionEvent {
    /// Map a touch event onto the same transitions as the mouse.
    ///
    /// `touches` holds the active touch points; the first one drives the
    /// gesture. A start without a target is not a gesture.
    pub fn from_touch(
        phase: TouchPhase,
        touches: &[(f64, f64)],
        target: Option<Target>,
    ) -> Option<Self> {
        match phase {
            TouchPhase::Start => {
                let sample = PointerSample::from_touches(touches)?;
                Some(InteractionEvent::PointerDown {
                    sample,
                    target: target?,
                })
            }
            TouchPhase::Move => {
                PointerSample::from_touches(touches).map(InteractionEvent::PointerMove)
            }
            TouchPhase::End => Some(InteractionEvent::PointerUp),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum InteractionState {
    #[default]
    Idle,
    /// A spot was chosen; the signature/text input is open.
    PlacingPending { target: Point },
    /// `grab` is the pointer's screen offset from the annotation's top-left.
    Dragging { id: AnnotationId, grab: Point },
    Resizing { id: AnnotationId, start: ResizeStart },
}

/// Observable outcome of one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Ignored,
    AwaitingContent { target: Point },
    Cancelled,
    Placed(AnnotationId),
    GestureStarted(AnnotationId),
    Moved { id: AnnotationId, position: Point },
    Resized { id: AnnotationId, size: Size },
    Released(AnnotationId),
    Duplicated { source: AnnotationId, copy: AnnotationId },
    Removed(AnnotationId),
    Rotated { id: AnnotationId, rotation: Rotation },
}

/// Where the current page is on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub page_rect: ScreenRect,
    pub scale: f64,
    pub page: u32,
}

/// Everything a transition may read or mutate.
pub struct Workspace<'a> {
    pub store: &'a mut AnnotationStore,
    pub history: &'a mut HistoryLog,
    pub viewport: Viewport,
    pub capture: Option<&'a Arc<SignatureImage>>,
    pub stroke_color: Option<String>,
    pub text_style: &'a TextStyle,
    pub min_width: f64,
    /// False in fallback render mode: no placement, drag or resize.
    pub gestures_enabled: bool,
}

#[derive(Debug, Default)]
pub struct Interaction {
    state: InteractionState,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_gesture_active(&self) -> bool {
        matches!(
            self.state,
            InteractionState::Dragging { .. } | InteractionState::Resizing { .. }
        )
    }

    /// Drop whatever is in progress without committing.
    pub fn reset(&mut self) {
        self.state = InteractionState::Idle;
    }

    pub fn handle(
        &mut self,
        mut ws: Workspace<'_>,
        event: InteractionEvent,
    ) -> Result<Effect, Error> {
        match event {
            InteractionEvent::Click(sample) => Ok(self.click(&ws, sample)),
            InteractionEvent::Confirm(content) => self.confirm(ws, content),
            InteractionEvent::Cancel => Ok(self.cancel()),
            InteractionEvent::PointerDown { sample, target } => {
                self.pointer_down(&ws, sample, target)
            }
            InteractionEvent::PointerMove(sample) => self.pointer_move(ws, sample),
            InteractionEvent::PointerUp | InteractionEvent::PointerLeave => Ok(self.release(ws)),
            InteractionEvent::DoubleClick(id) => {
                let copy = ws.store.duplicate(id)?;
                ws.history.commit(ws.store);
                self.state = InteractionState::Idle;
                Ok(Effect::Duplicated { source: id, copy })
            }
            InteractionEvent::Delete(id) => {
                ws.store.remove(id)?;
                ws.history.commit(ws.store);
                self.state = InteractionState::Idle;
                Ok(Effect::Removed(id))
            }
            InteractionEvent::Rotate(id) => {
                let rotation = ws.store.rotate(id)?;
                ws.history.commit(ws.store);
                self.state = InteractionState::Idle;
                Ok(Effect::Rotated { id, rotation })
            }
        }
    }

    fn click(&mut self, ws: &Workspace<'_>, sample: PointerSample) -> Effect {
        if self.state != InteractionState::Idle || !ws.gestures_enabled {
            return Effect::Ignored;
        }
        match pointer_to_document(sample, ws.viewport.page_rect, ws.viewport.scale) {
            Some(target) => {
                debug!("placement pending at ({}, {})", target.x, target.y);
                self.state = InteractionState::PlacingPending { target };
                Effect::AwaitingContent { target }
            }
            None => Effect::Ignored,
        }
    }

    fn confirm(&mut self, mut ws: Workspace<'_>, content: PendingContent) -> Result<Effect, Error> {
        let InteractionState::PlacingPending { target } = self.state else {
            return Ok(Effect::Ignored);
        };
        let id = match content {
            PendingContent::Signature => {
                let image = ws.capture.ok_or(Error::EmptyCapture)?;
                let id = ws.store.add_signature(image, target, ws.viewport.page, None);
                ws.store.set_stroke_color(id, ws.stroke_color)?;
                id
            }
            PendingContent::Text { content, style } => {
                if content.trim().is_empty() {
                    return Err(Error::EmptyText);
                }
                let style = style.unwrap_or_else(|| ws.text_style.clone());
                ws.store.add_text(content, target, ws.viewport.page, style)
            }
        };
        ws.history.commit(ws.store);
        self.state = InteractionState::Idle;
        Ok(Effect::Placed(id))
    }

    fn cancel(&mut self) -> Effect {
        if let InteractionState::PlacingPending { .. } = self.state {
            self.state = InteractionState::Idle;
            Effect::Cancelled
        } else {
            Effect::Ignored
        }
    }

    fn pointer_down(
        &mut self,
        ws: &Workspace<'_>,
        sample: PointerSample,
        target: Target,
    ) -> Result<Effect, Error> {
        if self.state != InteractionState::Idle || !ws.gestures_enabled {
            return Ok(Effect::Ignored);
        }
        match target {
            Target::Annotation(id) => {
                let bounds = ws.store.bounds(id).ok_or(Error::UnknownAnnotation(id))?;
                let grab = grab_offset(
                    sample,
                    ws.viewport.page_rect,
                    ws.viewport.scale,
                    bounds.origin,
                );
                debug!("drag start {id}");
                self.state = InteractionState::Dragging { id, grab };
                Ok(Effect::GestureStarted(id))
            }
            Target::ResizeHandle(id) => {
                if !ws.store.contains(id) {
                    return Err(Error::UnknownAnnotation(id));
                }
                let Some(signature) = ws.store.signature(id) else {
                    // text marks have no resize handle
                    return Ok(Effect::Ignored);
                };
                debug!("resize start {id}");
                self.state = InteractionState::Resizing {
                    id,
                    start: ResizeStart::new(sample, signature.size),
                };
                Ok(Effect::GestureStarted(id))
            }
        }
    }

    fn pointer_move(
        &mut self,
        mut ws: Workspace<'_>,
        sample: PointerSample,
    ) -> Result<Effect, Error> {
        let Viewport {
            page_rect, scale, ..
        } = ws.viewport;
        match self.state {
            InteractionState::Dragging { id, grab } => {
                let Some(size) = ws.store.bounds(id).map(|b| b.size) else {
                    self.state = InteractionState::Idle;
                    return Ok(Effect::Ignored);
                };
                let (Some(position), Some(page_bounds)) = (
                    drag_position(sample, grab, page_rect, scale, size),
                    page_rect.display_bounds(scale),
                ) else {
                    return Ok(Effect::Ignored);
                };
                let position = ws.store.update_position(id, position, page_bounds)?;
                Ok(Effect::Moved { id, position })
            }
            InteractionState::Resizing { id, start } => {
                if !ws.store.contains(id) {
                    self.state = InteractionState::Idle;
                    return Ok(Effect::Ignored);
                }
                let size = start.resized(sample, scale, ws.min_width);
                ws.store.update_size(id, size)?;
                Ok(Effect::Resized { id, size })
            }
            _ => Ok(Effect::Ignored),
        }
    }

    fn release(&mut self, mut ws: Workspace<'_>) -> Effect {
        let (InteractionState::Dragging { id, .. } | InteractionState::Resizing { id, .. }) =
            self.state
        else {
            return Effect::Ignored;
        };
        self.state = InteractionState::Idle;
        if !ws.store.contains(id) {
            return Effect::Ignored;
        }
        ws.history.commit(ws.store);
        debug!("gesture released {id}");
        Effect::Released(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::tests::png_bytes;
    use crate::capture::SignatureCapture;

    struct Rig {
        store: AnnotationStore,
        history: HistoryLog,
        capture: SignatureCapture,
        style: TextStyle,
        interaction: Interaction,
        enabled: bool,
    }

    impl Rig {
        fn new() -> Self {
            let mut capture = SignatureCapture::new();
            capture.accept_png(png_bytes(3, 1)).unwrap();
            Self {
                store: AnnotationStore::default(),
                history: HistoryLog::new(),
                capture,
                style: TextStyle::default(),
                interaction: Interaction::new(),
                enabled: true,
            }
        }

        fn send(&mut self, event: InteractionEvent) -> Result<Effect, Error> {
            let ws = Workspace {
                store: &mut self.store,
                history: &mut self.history,
                viewport: Viewport {
                    page_rect: ScreenRect::new(0.0, 0.0, 600.0, 800.0),
                    scale: 1.0,
                    page: 1,
                },
                capture: self.capture.current(),
                stroke_color: Some("#000000".to_owned()),
                text_style: &self.style,
                min_width: 50.0,
                gestures_enabled: self.enabled,
            };
            self.interaction.handle(ws, event)
        }

        fn place_signature(&mut self, x: f64, y: f64) -> AnnotationId {
            self.send(InteractionEvent::Click(PointerSample::new(x, y))).unwrap();
            match self.send(InteractionEvent::Confirm(PendingContent::Signature)).unwrap() {
                Effect::Placed(id) => id,
                other => panic!("expected placement, got {other:?}"),
            }
        }
    }

    #[test]
    fn click_then_confirm_places_and_commits() {
        let mut rig = Rig::new();
        let effect = rig.send(InteractionEvent::Click(PointerSample::new(100.0, 100.0))).unwrap();
        assert_eq!(effect, Effect::AwaitingContent { target: Point::new(100.0, 100.0) });

        let id = match rig.send(InteractionEvent::Confirm(PendingContent::Signature)).unwrap() {
            Effect::Placed(id) => id,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(rig.store.signature(id).unwrap().position, Point::new(100.0, 100.0));
        assert_eq!(rig.history.current_index(), 1);
        assert_eq!(*rig.interaction.state(), InteractionState::Idle);
    }

    #[test]
    fn click_outside_page_does_nothing() {
        let mut rig = Rig::new();
        let effect = rig.send(InteractionEvent::Click(PointerSample::new(700.0, 10.0))).unwrap();
        assert_eq!(effect, Effect::Ignored);
        assert_eq!(*rig.interaction.state(), InteractionState::Idle);
    }

    #[test]
    fn cancel_discards_pending_target() {
        let mut rig = Rig::new();
        rig.send(InteractionEvent::Click(PointerSample::new(10.0, 10.0))).unwrap();
        assert_eq!(rig.send(InteractionEvent::Cancel).unwrap(), Effect::Cancelled);
        assert!(rig.store.is_empty());
        assert_eq!(rig.history.current_index(), 0);
    }

    #[test]
    fn confirm_without_capture_is_refused() {
        let mut rig = Rig::new();
        rig.capture.clear();
        rig.send(InteractionEvent::Click(PointerSample::new(10.0, 10.0))).unwrap();
        let err = rig.send(InteractionEvent::Confirm(PendingContent::Signature)).unwrap_err();
        assert!(matches!(err, Error::EmptyCapture));
        assert!(matches!(rig.interaction.state(), InteractionState::PlacingPending { .. }));
        assert!(rig.store.is_empty());
    }

    #[test]
    fn blank_text_is_refused() {
        let mut rig = Rig::new();
        rig.send(InteractionEvent::Click(PointerSample::new(10.0, 10.0))).unwrap();
        let err = rig
            .send(InteractionEvent::Confirm(PendingContent::Text {
                content: "   ".to_owned(),
                style: None,
            }))
            .unwrap_err();
        assert!(matches!(err, Error::EmptyText));
    }

    #[test]
    fn drag_moves_without_commit_until_release() {
        let mut rig = Rig::new();
        let id = rig.place_signature(100.0, 100.0);

        rig.send(InteractionEvent::PointerDown {
            sample: PointerSample::new(110.0, 105.0),
            target: Target::Annotation(id),
        })
        .unwrap();
        let moved = rig
            .send(InteractionEvent::PointerMove(PointerSample::new(210.0, 305.0)))
            .unwrap();
        assert_eq!(moved, Effect::Moved { id, position: Point::new(200.0, 300.0) });
        assert_eq!(rig.history.current_index(), 1);

        assert_eq!(rig.send(InteractionEvent::PointerUp).unwrap(), Effect::Released(id));
        assert_eq!(rig.history.current_index(), 2);
    }

    #[test]
    fn drag_is_clamped_to_page() {
        let mut rig = Rig::new();
        let id = rig.place_signature(100.0, 100.0);
        rig.send(InteractionEvent::PointerDown {
            sample: PointerSample::new(100.0, 100.0),
            target: Target::Annotation(id),
        })
        .unwrap();
        rig.send(InteractionEvent::PointerMove(PointerSample::new(5000.0, 5000.0))).unwrap();
        assert_eq!(rig.store.signature(id).unwrap().position, Point::new(450.0, 750.0));
        rig.send(InteractionEvent::PointerLeave).unwrap();
        assert_eq!(*rig.interaction.state(), InteractionState::Idle);
    }

    #[test]
    fn second_pointer_down_is_ignored() {
        let mut rig = Rig::new();
        let first = rig.place_signature(10.0, 10.0);
        let second = rig.place_signature(300.0, 300.0);
        rig.send(InteractionEvent::PointerDown {
            sample: PointerSample::new(10.0, 10.0),
            target: Target::Annotation(first),
        })
        .unwrap();
        let effect = rig
            .send(InteractionEvent::PointerDown {
                sample: PointerSample::new(300.0, 300.0),
                target: Target::ResizeHandle(second),
            })
            .unwrap();
        assert_eq!(effect, Effect::Ignored);
        assert!(matches!(
            rig.interaction.state(),
            InteractionState::Dragging { id, .. } if *id == first
        ));
    }

    #[test]
    fn resize_preserves_ratio() {
        let mut rig = Rig::new();
        let id = rig.place_signature(10.0, 10.0);
        rig.send(InteractionEvent::PointerDown {
            sample: PointerSample::new(160.0, 60.0),
            target: Target::ResizeHandle(id),
        })
        .unwrap();
        rig.send(InteractionEvent::PointerMove(PointerSample::new(220.0, 90.0))).unwrap();
        rig.send(InteractionEvent::PointerUp).unwrap();

        let size = rig.store.signature(id).unwrap().size;
        assert!((size.width - 210.0).abs() < 1e-9);
        assert!((size.height - 70.0).abs() < 1e-9);
        assert_eq!(rig.history.current_index(), 2);
    }

    #[test]
    fn double_click_duplicates_and_commits() {
        let mut rig = Rig::new();
        let id = rig.place_signature(10.0, 10.0);
        let effect = rig.send(InteractionEvent::DoubleClick(id)).unwrap();
        let Effect::Duplicated { copy, .. } = effect else {
            panic!("unexpected {effect:?}");
        };
        assert_eq!(rig.store.signature(copy).unwrap().position, Point::new(30.0, 30.0));
        assert_eq!(rig.history.current_index(), 2);
    }

    #[test]
    fn delete_and_rotate_commit() {
        let mut rig = Rig::new();
        let id = rig.place_signature(10.0, 10.0);
        assert_eq!(
            rig.send(InteractionEvent::Rotate(id)).unwrap(),
            Effect::Rotated { id, rotation: Rotation::Deg90 }
        );
        assert_eq!(rig.send(InteractionEvent::Delete(id)).unwrap(), Effect::Removed(id));
        assert!(rig.store.is_empty());
        assert_eq!(rig.history.current_index(), 3);
    }

    #[test]
    fn touch_maps_to_pointer_transitions() {
        let mut rig = Rig::new();
        let id = rig.place_signature(10.0, 10.0);
        let down = InteractionEvent::from_touch(
            TouchPhase::Start,
            &[(20.0, 20.0)],
            Some(Target::Annotation(id)),
        )
        .unwrap();
        rig.send(down).unwrap();
        let moved = InteractionEvent::from_touch(TouchPhase::Move, &[(40.0, 50.0)], None).unwrap();
        rig.send(moved).unwrap();
        let end = InteractionEvent::from_touch(TouchPhase::End, &[], None).unwrap();
        assert_eq!(rig.send(end).unwrap(), Effect::Released(id));
        assert_eq!(rig.store.signature(id).unwrap().position, Point::new(30.0, 40.0));
        assert_eq!(rig.history.current_index(), 2);
    }

    #[test]
    fn fallback_mode_blocks_placement_and_drag() {
        let mut rig = Rig::new();
        let id = rig.place_signature(10.0, 10.0);
        rig.enabled = false;
        assert_eq!(
            rig.send(InteractionEvent::Click(PointerSample::new(50.0, 50.0)))
                .unwrap(),
            Effect::Ignored
        );
        let effect = rig
            .send(InteractionEvent::PointerDown {
                sample: PointerSample::new(10.0, 10.0),
                target: Target::Annotation(id),
            })
            .unwrap();
        assert_eq!(effect, Effect::Ignored);
    }
}
