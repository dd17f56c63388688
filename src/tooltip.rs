//! Placement and lifetime of the citation panel.
//!
//! At most one panel is open at a time. It is placed next to the citation
//! that opened it, kept inside the viewport, and dismissed by the first
//! later click that lands outside it.

use crate::Reference;

/// Vertical distance between the anchor and the panel.
pub const TOOLTIP_GAP: f64 = 5.0;

/// Space kept free between the panel and the right edge of the viewport.
pub const TOOLTIP_MARGIN: f64 = 20.0;

/// A position in viewport coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    /// Distance from the left edge.
    pub x: f64,
    /// Distance from the top edge.
    pub y: f64,
}

impl Point {
    /// Creates a point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A width and height.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Size {
    /// Creates a size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Rect {
    /// Creates a rectangle from its top-left corner and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Left edge.
    pub fn left(&self) -> f64 {
        self.x
    }

    /// Top edge.
    pub fn top(&self) -> f64 {
        self.y
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Returns true if `point` lies inside or on the edge of this rectangle.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    /// Returns true if this rectangle lies entirely within `viewport`.
    pub fn fits_within(&self, viewport: Size) -> bool {
        self.left() >= 0.0
            && self.top() >= 0.0
            && self.right() <= viewport.width
            && self.bottom() <= viewport.height
    }
}

/// Computes where a panel of `size` opens for a click at `click` on `anchor`.
///
/// The panel starts at the click's x and just below the anchor. It flips
/// above the anchor if it would overflow the bottom, and is then clamped so
/// no edge leaves the viewport. A panel larger than the viewport is pinned
/// to the top-left corner.
pub fn place_tooltip(anchor: Rect, click: Point, size: Size, viewport: Size) -> Rect {
    let max_x = (viewport.width - size.width - TOOLTIP_MARGIN).max(0.0);
    let x = click.x.clamp(0.0, max_x);

    let mut y = anchor.bottom() + TOOLTIP_GAP;
    if y + size.height > viewport.height {
        y = anchor.top() - size.height - TOOLTIP_GAP;
    }
    let max_y = (viewport.height - size.height).max(0.0);
    let y = y.clamp(0.0, max_y);

    Rect::new(x, y, size.width, size.height)
}

/// An open citation panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    /// Index of the message holding the citation.
    pub message: usize,
    /// Index of the citation within that message.
    pub citation: usize,
    /// The deserialized citation.
    pub reference: Reference,
    /// Where the panel is drawn.
    pub bounds: Rect,
}

#[derive(Debug)]
struct OpenTooltip {
    tooltip: Tooltip,
    opened_by: u64,
}

/// Holds the single open panel and its outside-click dismissal.
///
/// Clicks are numbered by [`TooltipLayer::begin_click`]. A panel ignores the
/// click that opened it, so the click is not also taken as an outside click.
#[derive(Debug, Default)]
pub struct TooltipLayer {
    open: Option<OpenTooltip>,
    clicks: u64,
}

impl TooltipLayer {
    /// Creates a layer with no open panel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Numbers a new click.
    pub fn begin_click(&mut self) -> u64 {
        self.clicks += 1;
        self.clicks
    }

    /// Opens `tooltip` on behalf of click `click`, returning the panel it replaced.
    pub fn open(&mut self, tooltip: Tooltip, click: u64) -> Option<Tooltip> {
        let replaced = self.close();
        self.open = Some(OpenTooltip {
            tooltip,
            opened_by: click,
        });
        replaced
    }

    /// Closes the open panel, if any.
    pub fn close(&mut self) -> Option<Tooltip> {
        self.open.take().map(|open| open.tooltip)
    }

    /// Closes the panel if click `click` at `point` is a later click outside it.
    pub fn dismiss_if_outside(&mut self, point: Point, click: u64) -> Option<Tooltip> {
        let open = self.open.as_ref()?;
        if click <= open.opened_by || open.tooltip.bounds.contains(point) {
            return None;
        }
        self.close()
    }

    /// The open panel, if any.
    pub fn current(&self) -> Option<&Tooltip> {
        self.open.as_ref().map(|open| &open.tooltip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Size = Size {
        width: 1024.0,
        height: 768.0,
    };

    fn tooltip(bounds: Rect) -> Tooltip {
        Tooltip {
            message: 0,
            citation: 0,
            reference: Reference::default(),
            bounds,
        }
    }

    #[test]
    fn opens_below_anchor() {
        let anchor = Rect::new(100.0, 100.0, 40.0, 16.0);
        let placed = place_tooltip(
            anchor,
            Point::new(110.0, 108.0),
            Size::new(500.0, 200.0),
            VIEWPORT,
        );
        assert_eq!(placed, Rect::new(110.0, 121.0, 500.0, 200.0));
        assert!(placed.fits_within(VIEWPORT));
    }

    #[test]
    fn flips_above_near_bottom() {
        let anchor = Rect::new(100.0, 700.0, 40.0, 16.0);
        let placed = place_tooltip(
            anchor,
            Point::new(110.0, 705.0),
            Size::new(500.0, 200.0),
            VIEWPORT,
        );
        assert_eq!(placed.y, 495.0);
        assert!(placed.fits_within(VIEWPORT));
    }

    #[test]
    fn clamps_right_edge() {
        let anchor = Rect::new(900.0, 100.0, 40.0, 16.0);
        let placed = place_tooltip(
            anchor,
            Point::new(950.0, 108.0),
            Size::new(500.0, 200.0),
            VIEWPORT,
        );
        assert_eq!(placed.x, 1024.0 - 500.0 - TOOLTIP_MARGIN);
        assert!(placed.fits_within(VIEWPORT));
    }

    #[test]
    fn clamps_top_when_flip_overflows() {
        let viewport = Size::new(600.0, 300.0);
        let anchor = Rect::new(10.0, 120.0, 40.0, 16.0);
        let placed = place_tooltip(anchor, Point::new(12.0, 125.0), Size::new(200.0, 250.0), viewport);
        assert_eq!(placed.y, 0.0);
        assert!(placed.fits_within(viewport));
    }

    #[test]
    fn oversized_panel_pins_to_origin() {
        let viewport = Size::new(300.0, 200.0);
        let anchor = Rect::new(50.0, 50.0, 40.0, 16.0);
        let placed = place_tooltip(anchor, Point::new(60.0, 60.0), Size::new(500.0, 400.0), viewport);
        assert_eq!((placed.x, placed.y), (0.0, 0.0));
    }

    #[test]
    fn every_anchor_position_stays_inside() {
        let size = Size::new(500.0, 180.0);
        for row in 0..48 {
            for column in 0..64 {
                let anchor = Rect::new(column as f64 * 16.0, row as f64 * 16.0, 16.0, 16.0);
                let click = Point::new(anchor.x + 4.0, anchor.y + 4.0);
                let placed = place_tooltip(anchor, click, size, VIEWPORT);
                assert!(placed.fits_within(VIEWPORT), "anchor {anchor:?} -> {placed:?}");
            }
        }
    }

    #[test]
    fn triggering_click_does_not_dismiss() {
        let mut layer = TooltipLayer::new();
        let click = layer.begin_click();
        layer.open(tooltip(Rect::new(0.0, 0.0, 100.0, 100.0)), click);
        assert!(layer.dismiss_if_outside(Point::new(500.0, 500.0), click).is_none());
        assert!(layer.current().is_some());

        let next = layer.begin_click();
        assert!(layer.dismiss_if_outside(Point::new(50.0, 50.0), next).is_none());
        let next = layer.begin_click();
        assert!(layer.dismiss_if_outside(Point::new(500.0, 500.0), next).is_some());
        assert!(layer.current().is_none());
    }

    #[test]
    fn opening_replaces_previous() {
        let mut layer = TooltipLayer::new();
        let first = layer.begin_click();
        assert!(layer.open(tooltip(Rect::new(0.0, 0.0, 10.0, 10.0)), first).is_none());
        let second = layer.begin_click();
        let replaced = layer.open(tooltip(Rect::new(20.0, 20.0, 10.0, 10.0)), second);
        assert_eq!(replaced.unwrap().bounds.x, 0.0);
        assert_eq!(layer.current().unwrap().bounds.x, 20.0);
    }
}
