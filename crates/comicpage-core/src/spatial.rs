use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::{BBox, Point};
use crate::page::Page;

/// An entry in the R-tree, referencing a layer by its stacking index.
#[derive(Debug, Clone)]
pub struct LayerEntry {
    /// Index into the page's layer list.
    pub layer_index: usize,
    /// Bounding box of the layer's border.
    pub bbox: BBox,
}

impl RTreeObject for LayerEntry {
    type Envelope = AABB<[i32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min.x, self.bbox.min.y],
            [self.bbox.max.x, self.bbox.max.y],
        )
    }
}

/// Spatial index over the borders of one page, for pointer hit-testing.
///
/// Built from a snapshot of the page; rebuild it after borders change.
pub struct LayerIndex {
    tree: RTree<LayerEntry>,
}

impl LayerIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Indexes every layer border of `page`.
    pub fn build(page: &Page) -> Self {
        let entries = page
            .layers()
            .iter()
            .enumerate()
            .map(|(layer_index, layer)| LayerEntry {
                layer_index,
                bbox: layer.border().bounds(),
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Layers whose border bounding box contains `point`, in no particular order.
    pub fn query_point(&self, point: &Point) -> Vec<&LayerEntry> {
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([point.x, point.y]))
            .collect()
    }

    /// Index of the topmost layer whose border polygon contains `point`.
    pub fn topmost_at(&self, page: &Page, point: Point) -> Option<usize> {
        self.query_point(&point)
            .into_iter()
            .map(|entry| entry.layer_index)
            .filter(|&i| page.layer(i).is_some_and(|l| l.border().contains_point(point)))
            .max()
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for LayerIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topmost_layer_wins() {
        let mut page = Page::new(400, 400);
        page.add_text_layer();
        page.layer_mut(1).unwrap().translate(150, 150);
        let index = LayerIndex::build(&page);
        assert_eq!(index.len(), 2);

        // Only the bottom layer covers (110, 110).
        assert_eq!(index.topmost_at(&page, Point::new(110, 110)), Some(0));
        // Both cover (260, 260); the one drawn last is on top.
        assert_eq!(index.topmost_at(&page, Point::new(260, 260)), Some(1));
        assert_eq!(index.topmost_at(&page, Point::new(5, 5)), None);
    }

    #[test]
    fn test_bbox_hit_outside_polygon_is_ignored() {
        let mut page = Page::new(200, 200);
        let border = page.layer_mut(0).unwrap().border_mut();
        border.remove_point(2).unwrap();
        // Triangle (50,50), (150,50), (50,150): (140,140) is in the box only.
        let index = LayerIndex::build(&page);
        assert_eq!(index.query_point(&Point::new(140, 140)).len(), 1);
        assert_eq!(index.topmost_at(&page, Point::new(140, 140)), None);
        assert_eq!(index.topmost_at(&page, Point::new(60, 60)), Some(0));
    }
}
