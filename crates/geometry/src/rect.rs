//! Axis-aligned rectangle used for both client and page space

/// Axis-aligned rectangle with a top-left origin.
///
/// Y grows downwards, matching the client coordinate system of the host
/// surface. The same type is used for page-local rects before they are
/// tagged with a page number.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// Build a rect from its edges. Inverted edges yield zero size.
    pub fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, width: (right - left).max(0.0), height: (bottom - top).max(0.0) }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right() && y >= self.top && y <= self.bottom()
    }

    /// Intersection with `other`, or `None` when they share no area.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right > left && bottom > top {
            Some(Rect::from_edges(left, top, right, bottom))
        } else {
            None
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_edges(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect { left: self.left + dx, top: self.top + dy, ..*self }
    }

    pub fn scale(&self, factor: f64) -> Rect {
        Rect {
            left: self.left * factor,
            top: self.top * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

/// Union bounding box of `rects`, or `None` for an empty input.
pub fn bounding_box<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
    rects.into_iter().fold(None, |acc: Option<Rect>, rect| match acc {
        Some(bounds) => Some(bounds.union(rect)),
        None => Some(*rect),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 60.0, 100.0, 100.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(50.0, 60.0, 50.0, 40.0)));

        let far = Rect::new(200.0, 200.0, 10.0, 10.0);
        assert_eq!(a.intersection(&far), None);

        // Touching edges share no area
        let touching = Rect::new(100.0, 0.0, 10.0, 10.0);
        assert_eq!(a.intersection(&touching), None);
    }

    #[test]
    fn test_bounding_box() {
        let rects = [Rect::new(10.0, 10.0, 5.0, 5.0), Rect::new(-5.0, 20.0, 5.0, 10.0)];
        assert_eq!(bounding_box(&rects), Some(Rect::new(-5.0, 10.0, 20.0, 20.0)));
        assert_eq!(bounding_box(&[] as &[Rect]), None);
    }

    #[test]
    fn test_from_edges_clamps_inverted() {
        let rect = Rect::from_edges(10.0, 10.0, 5.0, 5.0);
        assert!(rect.is_empty());
        assert_eq!(rect.area(), 0.0);
    }
}
