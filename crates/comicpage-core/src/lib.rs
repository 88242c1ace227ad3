//! # Comicpage Core
//!
//! The page model: polygon borders with grid snapping and nearest
//! vertex/edge queries, image and text layers, pages and books with JSON
//! persistence, and the editing state machine that turns pointer gestures
//! into border edits.

pub mod border;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod page;
pub mod settings;
pub mod spatial;

pub use border::BorderPolygon;
pub use editor::{
    EditAction, EditTarget, EditorController, EditorState, Hover, PointerButton, PointerEvent,
};
pub use error::{BorderError, LayerError, PageError, SettingsError};
pub use geometry::{BBox, Point};
pub use layer::{
    BorderStyle, ContentRegion, ImageContent, Layer, LayerColor, LayerContent, LayerId,
    TextContent,
};
pub use page::{ComicBook, Page};
pub use settings::Settings;
