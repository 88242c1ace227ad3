//! Pointer and keyboard driven editing of the selected layer.
//!
//! [`EditorController`] owns the only mutable [`EditorState`]. Renderers get
//! a shared reference to it (for highlighting the hovered vertex or edge) and
//! never change it.

use serde::{Deserialize, Serialize};

use crate::error::{BorderError, LayerError, PageError};
use crate::geometry::Point;
use crate::layer::Layer;
use crate::page::{ComicBook, Page};
use crate::settings::EditorSettings;
use crate::spatial::LayerIndex;

/// The gesture in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditAction {
    #[default]
    Idle,
    /// Dragging the vertex at `index`.
    ModifyVertex { index: usize },
    /// Translating; `last` is the previous pointer position.
    MoveBorderOrContents { last: Point },
    /// Scaling by vertical drag; `last` is the previous pointer position.
    ScaleBorderOrContents { last: Point },
}

/// What move and scale gestures apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EditTarget {
    Border,
    Contents,
    #[default]
    Both,
}

impl EditTarget {
    fn border(self) -> bool {
        matches!(self, EditTarget::Border | EditTarget::Both)
    }

    fn contents(self) -> bool {
        matches!(self, EditTarget::Contents | EditTarget::Both)
    }
}

/// What lies under the pointer when no gesture is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hover {
    /// Close to this vertex.
    Vertex(Point),
    /// Close to this point on an edge, where a double click would add a vertex.
    Edge(Point),
    Interior,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// A decoded pointer event in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub position: Point,
    /// Held button; `None` for plain movement.
    pub button: Option<PointerButton>,
    pub double_click: bool,
}

impl PointerEvent {
    pub fn moved(x: i32, y: i32) -> Self {
        Self {
            position: Point::new(x, y),
            button: None,
            double_click: false,
        }
    }

    pub fn primary(x: i32, y: i32) -> Self {
        Self {
            position: Point::new(x, y),
            button: Some(PointerButton::Primary),
            double_click: false,
        }
    }

    pub fn secondary(x: i32, y: i32) -> Self {
        Self {
            position: Point::new(x, y),
            button: Some(PointerButton::Secondary),
            double_click: false,
        }
    }

    pub fn with_double_click(mut self) -> Self {
        self.double_click = true;
        self
    }
}

/// Selection and gesture state of the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditorState {
    pub page: usize,
    pub layer: usize,
    pub target: EditTarget,
    pub action: EditAction,
    pub hover: Hover,
}

/// Turns pointer and key events into edits of the selected layer.
#[derive(Debug, Clone, Default)]
pub struct EditorController {
    state: EditorState,
    settings: EditorSettings,
}

impl EditorController {
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            state: EditorState::default(),
            settings,
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn set_target(&mut self, target: EditTarget) {
        self.state.target = target;
    }

    /// Selects a page and its bottom layer.
    pub fn select_page(&mut self, book: &ComicBook, page: usize) -> Result<(), PageError> {
        if page >= book.page_count() {
            return Err(PageError::PageIndexOutOfRange {
                index: page,
                len: book.page_count(),
            });
        }
        self.state.page = page;
        self.state.layer = 0;
        self.reset_gesture();
        Ok(())
    }

    pub fn select_layer(&mut self, book: &ComicBook, layer: usize) -> Result<(), PageError> {
        let len = self.page(book)?.layer_count();
        if layer >= len {
            return Err(PageError::LayerIndexOutOfRange { index: layer, len });
        }
        self.state.layer = layer;
        self.reset_gesture();
        Ok(())
    }

    /// Selects the topmost layer whose border contains `point`, if any.
    pub fn select_layer_at(
        &mut self,
        book: &ComicBook,
        point: Point,
    ) -> Result<Option<usize>, PageError> {
        let page = self.page(book)?;
        let hit = LayerIndex::build(page).topmost_at(page, point);
        if let Some(layer) = hit {
            log::debug!("Selected layer {} at ({}, {})", layer, point.x, point.y);
            self.state.layer = layer;
            self.reset_gesture();
        }
        Ok(hit)
    }

    /// Toggles the grid on the selected layer's border using the configured spacing.
    pub fn toggle_grid(&mut self, book: &mut ComicBook) -> Result<bool, PageError> {
        let spacing = self.settings.grid_spacing;
        let border = self.layer_mut(book)?.border_mut();
        if border.grid_active() {
            border.deactivate_grid();
            Ok(false)
        } else {
            border.set_grid(spacing).map_err(LayerError::from)?;
            Ok(true)
        }
    }

    fn reset_gesture(&mut self) {
        self.state.action = EditAction::Idle;
        self.state.hover = Hover::None;
    }

    fn page<'a>(&self, book: &'a ComicBook) -> Result<&'a Page, PageError> {
        book.page(self.state.page).ok_or(PageError::PageIndexOutOfRange {
            index: self.state.page,
            len: book.page_count(),
        })
    }

    fn layer<'a>(&self, book: &'a ComicBook) -> Result<&'a Layer, PageError> {
        let page = self.page(book)?;
        page.layer(self.state.layer).ok_or(PageError::LayerIndexOutOfRange {
            index: self.state.layer,
            len: page.layer_count(),
        })
    }

    fn layer_mut<'a>(&self, book: &'a mut ComicBook) -> Result<&'a mut Layer, PageError> {
        let (page_index, layer_index) = (self.state.page, self.state.layer);
        let page_count = book.page_count();
        let page = book.page_mut(page_index).ok_or(PageError::PageIndexOutOfRange {
            index: page_index,
            len: page_count,
        })?;
        let layer_count = page.layer_count();
        page.layer_mut(layer_index).ok_or(PageError::LayerIndexOutOfRange {
            index: layer_index,
            len: layer_count,
        })
    }

    // ── Pointer events ───────────────────────────────────────────────

    /// Starts a gesture: a primary press near a vertex grabs it, inside the
    /// border it moves, and a secondary press inside the border scales.
    ///
    /// With the grid active the stored press position is snapped, so every
    /// drag delta is a whole number of grid steps.
    pub fn pointer_pressed(
        &mut self,
        book: &ComicBook,
        event: PointerEvent,
    ) -> Result<EditAction, PageError> {
        let border = self.layer(book)?.border();
        let mouse = event.position;
        let vertex = border.closest_vertex(mouse);
        let inside = border.contains_point(mouse);
        let near_vertex = vertex.distance_to(&mouse) < self.settings.vertex_snap_distance;
        let anchor = if border.grid_active() {
            border.to_grid(mouse)
        } else {
            mouse
        };

        let action = match event.button {
            Some(PointerButton::Primary) if near_vertex => match border.vertex_index(vertex) {
                Some(index) => EditAction::ModifyVertex { index },
                None => EditAction::Idle,
            },
            Some(PointerButton::Primary) if inside => {
                EditAction::MoveBorderOrContents { last: anchor }
            }
            Some(PointerButton::Secondary) if inside => {
                EditAction::ScaleBorderOrContents { last: anchor }
            }
            _ => EditAction::Idle,
        };
        log::debug!("Editor gesture {:?} -> {:?}", self.state.action, action);
        self.state.action = action;
        Ok(action)
    }

    /// Applies one step of the active gesture. A button that does not match
    /// the gesture ends it.
    pub fn pointer_dragged(
        &mut self,
        book: &mut ComicBook,
        event: PointerEvent,
    ) -> Result<(), PageError> {
        let target = self.state.target;
        let sensitivity = self.settings.scale_sensitivity;
        let action = self.state.action;
        let layer = self.layer_mut(book)?;
        let mut mouse = event.position;
        if layer.border().grid_active() {
            mouse = layer.border().to_grid(mouse);
        }

        let next = match (action, event.button) {
            (EditAction::ModifyVertex { index }, Some(PointerButton::Primary)) => {
                let snapped = layer.border().to_grid(mouse);
                layer.border_mut().set_point(index, snapped).map_err(LayerError::from)?;
                action
            }
            (EditAction::MoveBorderOrContents { last }, Some(PointerButton::Primary)) => {
                let (dx, dy) = (mouse.x - last.x, mouse.y - last.y);
                if target.border() {
                    layer.translate_border(dx, dy);
                }
                if target.contents() {
                    layer.translate_contents(dx, dy);
                }
                EditAction::MoveBorderOrContents { last: mouse }
            }
            (EditAction::ScaleBorderOrContents { last }, Some(PointerButton::Secondary)) => {
                let factor = 2f64.powf(-f64::from(mouse.y - last.y) / sensitivity);
                if target.border() {
                    layer.scale_border(factor).map_err(LayerError::from)?;
                }
                if target.contents() {
                    layer.scale_contents(factor).map_err(LayerError::from)?;
                }
                EditAction::ScaleBorderOrContents { last: mouse }
            }
            _ => EditAction::Idle,
        };
        self.state.action = next;
        Ok(())
    }

    /// Ends the gesture. A double click near a vertex removes it; near an edge
    /// it inserts a vertex on that edge.
    pub fn pointer_released(
        &mut self,
        book: &mut ComicBook,
        event: PointerEvent,
    ) -> Result<(), PageError> {
        self.state.action = EditAction::Idle;
        if event.double_click {
            let mouse = event.position;
            let border = self.layer_mut(book)?.border_mut();
            let vertex = border.closest_vertex(mouse);
            let edge_point = border.closest_edge_point(mouse);

            if vertex.distance_to(&mouse) < self.settings.vertex_snap_distance {
                if let Some(index) = border.vertex_index(vertex) {
                    match border.remove_point(index) {
                        Ok(_) => log::debug!("Removed vertex {}", index),
                        Err(BorderError::TooFewVertices(_)) => {
                            log::debug!("Kept vertex {}: border needs three", index)
                        }
                        Err(e) => return Err(LayerError::from(e).into()),
                    }
                }
            } else if edge_point.distance_to(&mouse) < self.settings.edge_snap_distance {
                let index = border.closest_edge_index(mouse) + 1;
                let p = border.to_grid(edge_point);
                border.insert_point(index, p).map_err(LayerError::from)?;
                log::debug!("Inserted vertex {} at ({}, {})", index, p.x, p.y);
            }
        }
        self.pointer_moved(book, event)?;
        Ok(())
    }

    /// Updates the hover classification from a move with no gesture active.
    pub fn pointer_moved(
        &mut self,
        book: &ComicBook,
        event: PointerEvent,
    ) -> Result<Hover, PageError> {
        let border = self.layer(book)?.border();
        let mouse = event.position;
        let vertex = border.closest_vertex(mouse);
        let edge_point = border.closest_edge_point(mouse);
        let hover = if vertex.distance_to(&mouse) < self.settings.vertex_snap_distance {
            Hover::Vertex(vertex)
        } else if edge_point.distance_to(&mouse) < self.settings.edge_snap_distance {
            Hover::Edge(edge_point)
        } else if border.contains_point(mouse) {
            Hover::Interior
        } else {
            Hover::None
        };
        self.state.hover = hover;
        Ok(hover)
    }

    pub fn pointer_exited(&mut self) {
        self.reset_gesture();
    }

    // ── Keyboard ─────────────────────────────────────────────────────

    /// Types into the selected layer. Returns `false` when it holds an image.
    pub fn key_typed(&mut self, book: &mut ComicBook, c: char) -> Result<bool, PageError> {
        let layer = self.layer_mut(book)?;
        if !layer.is_text() {
            return Ok(false);
        }
        layer.append_text(c)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerContent;

    /// A 200x200 book whose only layer has the border (50,50)-(150,150).
    fn book() -> ComicBook {
        ComicBook::new("editor", 200, 200)
    }

    fn border(book: &ComicBook) -> &crate::border::BorderPolygon {
        book.page(0).unwrap().layer(0).unwrap().border()
    }

    #[test]
    fn test_press_classification() {
        let _ = env_logger::builder().is_test(true).try_init();
        let b = book();
        let mut editor = EditorController::default();
        assert_eq!(
            editor.pointer_pressed(&b, PointerEvent::primary(55, 45)).unwrap(),
            EditAction::ModifyVertex { index: 0 }
        );
        assert_eq!(
            editor.pointer_pressed(&b, PointerEvent::primary(100, 100)).unwrap(),
            EditAction::MoveBorderOrContents { last: Point::new(100, 100) }
        );
        assert_eq!(
            editor.pointer_pressed(&b, PointerEvent::secondary(100, 100)).unwrap(),
            EditAction::ScaleBorderOrContents { last: Point::new(100, 100) }
        );
        assert_eq!(
            editor.pointer_pressed(&b, PointerEvent::secondary(5, 5)).unwrap(),
            EditAction::Idle
        );
    }

    #[test]
    fn test_drag_vertex_clamps_into_bounds() {
        let mut b = book();
        let mut editor = EditorController::default();
        editor.pointer_pressed(&b, PointerEvent::primary(150, 150)).unwrap();
        editor.pointer_dragged(&mut b, PointerEvent::primary(170, 160)).unwrap();
        editor.pointer_dragged(&mut b, PointerEvent::primary(250, 190)).unwrap();
        assert_eq!(border(&b).point(2), Some(Point::new(200, 190)));
        editor.pointer_released(&mut b, PointerEvent::primary(250, 190)).unwrap();
        assert_eq!(editor.state().action, EditAction::Idle);
    }

    #[test]
    fn test_drag_vertex_snaps_to_grid() {
        let mut b = book();
        let mut editor = EditorController::default();
        assert!(editor.toggle_grid(&mut b).unwrap());
        editor.pointer_pressed(&b, PointerEvent::primary(52, 52)).unwrap();
        editor.pointer_dragged(&mut b, PointerEvent::primary(33, 47)).unwrap();
        assert_eq!(border(&b).point(0), Some(Point::new(30, 50)));
    }

    #[test]
    fn test_move_with_grid_keeps_vertices_on_grid() {
        let mut b = book();
        let mut editor = EditorController::default();
        assert!(editor.toggle_grid(&mut b).unwrap());
        assert_eq!(
            editor.pointer_pressed(&b, PointerEvent::primary(103, 103)).unwrap(),
            EditAction::MoveBorderOrContents { last: Point::new(110, 110) }
        );
        // A drag that does not move the pointer leaves the border in place.
        editor.pointer_dragged(&mut b, PointerEvent::primary(103, 103)).unwrap();
        assert_eq!(border(&b).bounds().min, Point::new(50, 50));

        editor.pointer_dragged(&mut b, PointerEvent::primary(125, 97)).unwrap();
        let on_grid = |v: &Point| v.x % 20 == 10 && v.y % 20 == 10;
        assert!(border(&b).vertices().iter().all(on_grid));
        assert_eq!(border(&b).bounds().min, Point::new(70, 30));
    }

    #[test]
    fn test_scale_with_grid_starts_from_snapped_press() {
        let mut b = book();
        let mut editor = EditorController::default();
        assert!(editor.toggle_grid(&mut b).unwrap());
        editor.pointer_pressed(&b, PointerEvent::secondary(97, 97)).unwrap();
        editor.pointer_dragged(&mut b, PointerEvent::secondary(97, 97)).unwrap();
        assert_eq!(border(&b).bounds().min, Point::new(50, 50));
        assert_eq!(border(&b).bounds().max, Point::new(150, 150));
    }

    #[test]
    fn test_move_respects_target() {
        let mut b = book();
        let mut editor = EditorController::default();
        editor.set_target(EditTarget::Border);
        editor.pointer_pressed(&b, PointerEvent::primary(100, 100)).unwrap();
        editor.pointer_dragged(&mut b, PointerEvent::primary(110, 95)).unwrap();
        editor.pointer_dragged(&mut b, PointerEvent::primary(120, 90)).unwrap();
        let layer = b.page(0).unwrap().layer(0).unwrap();
        assert_eq!(layer.border().bounds().min, Point::new(70, 40));
        assert_eq!(layer.contents().position, Point::new(50, 50));
    }

    #[test]
    fn test_scale_by_vertical_drag() {
        let mut b = book();
        let mut editor = EditorController::default();
        editor.pointer_pressed(&b, PointerEvent::secondary(100, 100)).unwrap();
        // Dragging up by the sensitivity doubles the size.
        editor.pointer_dragged(&mut b, PointerEvent::secondary(100, -100)).unwrap();
        let layer = b.page(0).unwrap().layer(0).unwrap();
        assert_eq!(layer.border().bounds().min, Point::new(0, 0));
        assert_eq!(layer.border().bounds().max, Point::new(200, 200));
        assert_eq!(layer.contents().width, 200);
    }

    #[test]
    fn test_wrong_button_ends_gesture() {
        let mut b = book();
        let mut editor = EditorController::default();
        editor.pointer_pressed(&b, PointerEvent::primary(100, 100)).unwrap();
        editor.pointer_dragged(&mut b, PointerEvent::secondary(90, 90)).unwrap();
        assert_eq!(editor.state().action, EditAction::Idle);
        assert_eq!(border(&b).bounds().min, Point::new(50, 50));
    }

    #[test]
    fn test_double_click_inserts_then_removes_vertex() {
        let mut b = book();
        let mut editor = EditorController::default();
        editor
            .pointer_released(&mut b, PointerEvent::primary(100, 45).with_double_click())
            .unwrap();
        assert_eq!(border(&b).vertex_count(), 5);
        assert_eq!(border(&b).point(1), Some(Point::new(100, 50)));
        assert_eq!(editor.state().hover, Hover::Vertex(Point::new(100, 50)));

        editor
            .pointer_released(&mut b, PointerEvent::primary(100, 52).with_double_click())
            .unwrap();
        assert_eq!(border(&b).vertex_count(), 4);
    }

    #[test]
    fn test_double_click_never_drops_below_three_vertices() {
        let mut b = book();
        let mut editor = EditorController::default();
        editor
            .pointer_released(&mut b, PointerEvent::primary(50, 50).with_double_click())
            .unwrap();
        assert_eq!(border(&b).vertex_count(), 3);
        editor
            .pointer_released(&mut b, PointerEvent::primary(150, 50).with_double_click())
            .unwrap();
        assert_eq!(border(&b).vertex_count(), 3);
    }

    #[test]
    fn test_hover_classification() {
        let b = book();
        let mut editor = EditorController::default();
        assert_eq!(
            editor.pointer_moved(&b, PointerEvent::moved(48, 52)).unwrap(),
            Hover::Vertex(Point::new(50, 50))
        );
        assert_eq!(
            editor.pointer_moved(&b, PointerEvent::moved(100, 140)).unwrap(),
            Hover::Edge(Point::new(100, 150))
        );
        assert_eq!(
            editor.pointer_moved(&b, PointerEvent::moved(100, 100)).unwrap(),
            Hover::Interior
        );
        assert_eq!(
            editor.pointer_moved(&b, PointerEvent::moved(5, 100)).unwrap(),
            Hover::None
        );
        editor.pointer_exited();
        assert_eq!(editor.state().hover, Hover::None);
    }

    #[test]
    fn test_typing_into_text_layer() {
        let mut b = book();
        let mut editor = EditorController::default();
        assert!(!editor.key_typed(&mut b, 'x').unwrap());

        b.page_mut(0).unwrap().add_text_layer();
        editor.select_layer(&b, 1).unwrap();
        for c in "ab\u{8}c".chars() {
            assert!(editor.key_typed(&mut b, c).unwrap());
        }
        match b.page(0).unwrap().layer(1).unwrap().content() {
            LayerContent::Text(text) => assert_eq!(text.text(), Some("ac")),
            LayerContent::Image(_) => panic!("expected text"),
        }
    }

    #[test]
    fn test_select_layer_at_and_bounds_checks() {
        let mut b = book();
        b.page_mut(0).unwrap().add_text_layer();
        let mut editor = EditorController::default();
        assert_eq!(
            editor.select_layer_at(&b, Point::new(100, 100)).unwrap(),
            Some(1)
        );
        assert_eq!(editor.state().layer, 1);
        assert_eq!(editor.select_layer_at(&b, Point::new(5, 5)).unwrap(), None);
        assert_eq!(editor.state().layer, 1);
        assert!(editor.select_layer(&b, 7).is_err());
        assert!(editor.select_page(&b, 1).is_err());
    }
}
