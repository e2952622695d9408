#![allow(clippy::float_cmp)]

use super::*;
use crate::chart::LinearChart;
use crate::hit::Viewport;
use crate::shape::{Style, WidthMode};

// Identity chart: pixel x = t, pixel y = 200 - p.
struct Frame {
    settings: Settings,
    selection: BTreeSet<ShapeId>,
    ghost: Option<Ghost>,
    marquee: Option<Rect>,
}

impl Frame {
    fn new() -> Self {
        Self { settings: Settings::default(), selection: BTreeSet::new(), ghost: None, marquee: None }
    }

    fn select(mut self, id: &str) -> Self {
        self.selection.insert(id.to_owned());
        self
    }

    fn render(&self, shapes: &[Shape]) -> DisplayList {
        let mut list = DisplayList::new();
        match self.render_into(&mut list, shapes) {
            Ok(()) => list,
            Err(never) => match never {},
        }
    }

    fn render_into<P: Painter>(&self, painter: &mut P, shapes: &[Shape]) -> Result<(), P::Error> {
        let chart = LinearChart::identity(400.0, 200.0);
        let projector = Projector::new(&chart, &self.settings, Viewport::new(400.0, 200.0));
        let scene = Scene {
            shapes,
            selection: &self.selection,
            ghost: self.ghost.as_ref(),
            marquee: self.marquee,
            handle_size: 6.0,
        };
        draw(painter, &scene, &projector)
    }
}

/// Records like [`DisplayList`] but rejects any non-empty dash pattern.
#[derive(Default)]
struct NoDash(DisplayList);

impl NoDash {
    fn balance(&self) -> (usize, usize) {
        (count(&self.0, |c| *c == DrawCommand::Save), count(&self.0, |c| *c == DrawCommand::Restore))
    }
}

fn recorded(result: Result<(), Infallible>) {
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

impl Painter for NoDash {
    type Error = &'static str;

    fn save(&mut self) {
        self.0.save();
    }
    fn restore(&mut self) {
        self.0.restore();
    }
    fn clear_rect(&mut self, rect: Rect) {
        self.0.clear_rect(rect);
    }
    fn set_stroke_style(&mut self, color: &str) {
        self.0.set_stroke_style(color);
    }
    fn set_fill_style(&mut self, color: &str) {
        self.0.set_fill_style(color);
    }
    fn set_line_width(&mut self, width: f64) {
        self.0.set_line_width(width);
    }
    fn set_line_cap(&mut self, cap: LineCap) {
        self.0.set_line_cap(cap);
    }
    fn set_global_alpha(&mut self, alpha: f64) {
        self.0.set_global_alpha(alpha);
    }
    fn set_font(&mut self, font: &str) {
        self.0.set_font(font);
    }
    fn set_line_dash(&mut self, segments: &[f64]) -> Result<(), &'static str> {
        if !segments.is_empty() {
            return Err("dash rejected");
        }
        recorded(self.0.set_line_dash(segments));
        Ok(())
    }
    fn begin_path(&mut self) {
        self.0.begin_path();
    }
    fn move_to(&mut self, pt: Point) {
        self.0.move_to(pt);
    }
    fn line_to(&mut self, pt: Point) {
        self.0.line_to(pt);
    }
    fn close_path(&mut self) {
        self.0.close_path();
    }
    fn stroke(&mut self) {
        self.0.stroke();
    }
    fn fill(&mut self) {
        self.0.fill();
    }
    fn stroke_rect(&mut self, rect: Rect) {
        self.0.stroke_rect(rect);
    }
    fn fill_rect(&mut self, rect: Rect) {
        self.0.fill_rect(rect);
    }
    fn fill_text(&mut self, text: &str, at: Point) -> Result<(), &'static str> {
        recorded(self.0.fill_text(text, at));
        Ok(())
    }
}

fn dp(t: f64, p: f64) -> DataPoint {
    DataPoint::new(t, p)
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

/// Every stroked `move_to → line_to` pair.
fn lines(list: &DisplayList) -> Vec<(Point, Point)> {
    list.commands()
        .windows(3)
        .filter_map(|w| match w {
            [DrawCommand::MoveTo(a), DrawCommand::LineTo(b), DrawCommand::Stroke] => Some((*a, *b)),
            _ => None,
        })
        .collect()
}

fn count(list: &DisplayList, pred: impl Fn(&DrawCommand) -> bool) -> usize {
    list.commands().iter().filter(|c| pred(c)).count()
}

fn trendline(id: &str) -> Shape {
    Shape::with_id(id, Geometry::Trendline { points: [dp(0.0, 10.0), dp(5.0, 20.0)] })
}

// =============================================================
// Per-type geometry
// =============================================================

#[test]
fn frame_starts_by_clearing_viewport() {
    let list = Frame::new().render(&[]);
    assert_eq!(list.commands(), &[DrawCommand::ClearRect(Rect { x: 0.0, y: 0.0, w: 400.0, h: 200.0 })]);
}

#[test]
fn trendline_is_one_segment_at_projected_pixels() {
    let list = Frame::new().render(&[trendline("t")]);
    assert_eq!(lines(&list), vec![(pt(0.0, 190.0), pt(5.0, 180.0))]);
}

#[test]
fn hline_spans_viewport_width() {
    let list = Frame::new().render(&[Shape::with_id("h", Geometry::Hline { y: 150.0 })]);
    assert_eq!(lines(&list), vec![(pt(0.0, 50.0), pt(400.0, 50.0))]);
}

#[test]
fn vline_spans_viewport_height() {
    let list = Frame::new().render(&[Shape::with_id("v", Geometry::Vline { x: 30.0 })]);
    assert_eq!(lines(&list), vec![(pt(30.0, 0.0), pt(30.0, 200.0))]);
}

#[test]
fn rect_is_normalized_before_stroking() {
    let shape = Shape::with_id("r", Geometry::Rect { points: [dp(150.0, 80.0), dp(50.0, 150.0)] });
    let list = Frame::new().render(&[shape]);
    assert!(list.commands().contains(&DrawCommand::StrokeRect(Rect { x: 50.0, y: 50.0, w: 100.0, h: 70.0 })));
}

#[test]
fn rect_fill_comes_from_style() {
    let mut shape = Shape::with_id("r", Geometry::Rect { points: [dp(0.0, 100.0), dp(10.0, 90.0)] });
    assert_eq!(count(&Frame::new().render(&[shape.clone()]), |c| matches!(c, DrawCommand::FillRect(_))), 0);
    shape.style.fill = Some("rgba(0, 0, 0, 0.1)".to_owned());
    let list = Frame::new().render(&[shape]);
    assert!(list.commands().contains(&DrawCommand::FillStyle("rgba(0, 0, 0, 0.1)".to_owned())));
    assert_eq!(count(&list, |c| matches!(c, DrawCommand::FillRect(_))), 1);
}

#[test]
fn channel_draws_baseline_and_parallel_edge() {
    let shape = Shape::with_id(
        "c",
        Geometry::Channel { points: [dp(0.0, 100.0), dp(100.0, 100.0)], width_mode: WidthMode::Price, width: 20.0 },
    );
    let list = Frame::new().render(&[shape]);
    assert_eq!(lines(&list), vec![(pt(0.0, 100.0), pt(100.0, 100.0)), (pt(0.0, 80.0), pt(100.0, 80.0))]);
}

#[test]
fn fib_draws_diagonal_and_one_guide_per_level() {
    let shape = Shape::with_id("f", Geometry::Fib { points: [dp(0.0, 100.0), dp(100.0, 200.0)], levels: vec![0.0, 0.5, 1.0] });
    let list = Frame::new().render(&[shape]);
    assert_eq!(
        lines(&list),
        vec![
            (pt(0.0, 100.0), pt(100.0, 0.0)),
            (pt(0.0, 0.0), pt(100.0, 0.0)),
            (pt(0.0, 50.0), pt(100.0, 50.0)),
            (pt(0.0, 100.0), pt(100.0, 100.0)),
        ]
    );
}

#[test]
fn text_uses_font_size_from_style() {
    let mut shape = Shape::with_id("x", Geometry::Text { point: dp(10.0, 150.0), text: "note".to_owned() });
    shape.style.font_size = Some(20.0);
    let list = Frame::new().render(&[shape]);
    assert!(list.commands().contains(&DrawCommand::Font("20px sans-serif".to_owned())));
    assert!(list.commands().contains(&DrawCommand::FillText { text: "note".to_owned(), at: pt(10.0, 70.0) }));
}

#[test]
fn group_draws_visible_children() {
    let mut hidden = trendline("b");
    hidden.hidden = true;
    let group = Shape::with_id("g", Geometry::Group { children: vec![Shape::with_id("a", Geometry::Vline { x: 5.0 }), hidden] });
    let list = Frame::new().render(&[group]);
    assert_eq!(lines(&list), vec![(pt(5.0, 0.0), pt(5.0, 200.0))]);
}

#[test]
fn hidden_and_unprojectable_shapes_are_skipped() {
    let mut hidden = trendline("h");
    hidden.hidden = true;
    let off_scale = Shape::with_id("o", Geometry::Trendline { points: [dp(f64::INFINITY, 1.0), dp(5.0, 20.0)] });
    let list = Frame::new().render(&[hidden, off_scale]);
    assert!(lines(&list).is_empty());
}

// =============================================================
// Style
// =============================================================

#[test]
fn style_overrides_stroke_and_width() {
    let mut shape = trendline("t");
    shape.style = Style { stroke: Some("#ff0000".to_owned()), width: Some(3.0), ..Style::default() };
    let list = Frame::new().render(&[shape]);
    assert!(list.commands().contains(&DrawCommand::StrokeStyle("#ff0000".to_owned())));
    assert!(list.commands().contains(&DrawCommand::LineWidth(3.0)));
}

#[test]
fn line_cap_comes_from_settings() {
    let mut frame = Frame::new();
    frame.settings.line_cap = LineCap::Round;
    let list = frame.render(&[trendline("t")]);
    assert!(list.commands().contains(&DrawCommand::LineCap(LineCap::Round)));
}

#[test]
fn arrowhead_follows_settings() {
    let arrow = Shape::with_id("a", Geometry::Arrow { points: [dp(0.0, 100.0), dp(100.0, 100.0)] });
    let mut frame = Frame::new();

    let filled = frame.render(std::slice::from_ref(&arrow));
    assert_eq!(count(&filled, |c| *c == DrawCommand::Fill), 1);

    frame.settings.arrow_head = ArrowHead::Open;
    let open = frame.render(std::slice::from_ref(&arrow));
    assert_eq!(count(&open, |c| *c == DrawCommand::Fill), 0);
    assert_eq!(count(&open, |c| *c == DrawCommand::Stroke), 2);

    frame.settings.arrow_head = ArrowHead::None;
    let plain = frame.render(std::slice::from_ref(&arrow));
    assert_eq!(count(&plain, |c| *c == DrawCommand::Stroke), 1);
}

#[test]
fn arrowhead_tip_sits_on_second_anchor() {
    let arrow = Shape::with_id("a", Geometry::Arrow { points: [dp(0.0, 100.0), dp(100.0, 100.0)] });
    let list = Frame::new().render(&[arrow]);
    let tip = list.commands().iter().rposition(|c| *c == DrawCommand::MoveTo(pt(100.0, 100.0)));
    assert!(tip.is_some());
}

// =============================================================
// Labels
// =============================================================

#[test]
fn labels_are_off_by_default() {
    let shapes = [
        Shape::with_id("h", Geometry::Hline { y: 150.0 }),
        Shape::with_id("m", Geometry::Measure { points: [dp(0.0, 100.0), dp(10.0, 110.0)] }),
    ];
    assert!(Frame::new().render(&shapes).texts().is_empty());
}

#[test]
fn line_labels_show_price_and_ruler_change() {
    let mut frame = Frame::new();
    frame.settings.show_line_labels = true;
    let shapes = [
        Shape::with_id("h", Geometry::Hline { y: 150.0 }),
        Shape::with_id("m", Geometry::Measure { points: [dp(0.0, 100.0), dp(10.0, 110.0)] }),
    ];
    assert_eq!(frame.render(&shapes).texts(), vec!["150.00", "+10.00 (+10.00%)"]);
}

#[test]
fn fib_labels_show_ratio_and_price() {
    let mut frame = Frame::new();
    frame.settings.show_line_labels = true;
    let shape = Shape::with_id("f", Geometry::Fib { points: [dp(0.0, 100.0), dp(100.0, 200.0)], levels: vec![0.5] });
    assert_eq!(frame.render(&[shape]).texts(), vec!["0.5 (150.00)"]);
}

#[test]
fn ruler_label_without_start_price_omits_percent() {
    assert_eq!(ruler_label(dp(0.0, 0.0), dp(1.0, 5.0)), "+5.00");
    assert_eq!(ruler_label(dp(0.0, 200.0), dp(1.0, 150.0)), "-50.00 (-25.00%)");
}

// =============================================================
// Selection UI
// =============================================================

fn handle_rects(list: &DisplayList) -> Vec<Rect> {
    list.commands()
        .iter()
        .filter_map(|c| match c {
            DrawCommand::FillRect(r) => Some(*r),
            _ => None,
        })
        .collect()
}

#[test]
fn selected_shape_gets_square_handles() {
    let list = Frame::new().select("t").render(&[trendline("t")]);
    assert_eq!(
        handle_rects(&list),
        vec![Rect { x: -6.0, y: 184.0, w: 12.0, h: 12.0 }, Rect { x: -1.0, y: 174.0, w: 12.0, h: 12.0 }]
    );
}

#[test]
fn unselected_shape_has_no_handles() {
    let list = Frame::new().render(&[trendline("t")]);
    assert!(handle_rects(&list).is_empty());
}

#[test]
fn handles_respect_show_handles_setting() {
    let mut frame = Frame::new().select("t");
    frame.settings.show_handles = false;
    assert!(handle_rects(&frame.render(&[trendline("t")])).is_empty());
}

#[test]
fn channel_shows_width_handle() {
    let shape = Shape::with_id(
        "c",
        Geometry::Channel { points: [dp(0.0, 100.0), dp(100.0, 100.0)], width_mode: WidthMode::Price, width: 20.0 },
    );
    let list = Frame::new().select("c").render(&[shape]);
    assert_eq!(handle_rects(&list).len(), 3);
}

#[test]
fn ghost_is_dashed_and_faded() {
    let mut frame = Frame::new();
    frame.ghost = Some(Ghost { plugin_id: "trendline-plus".to_owned(), shape: trendline("ghost") });
    let list = frame.render(&[]);
    assert_eq!(lines(&list), vec![(pt(0.0, 190.0), pt(5.0, 180.0))]);
    assert!(list.commands().contains(&DrawCommand::LineDash(vec![PREVIEW_DASH_PX, PREVIEW_DASH_PX])));
    assert!(list.commands().contains(&DrawCommand::GlobalAlpha(GHOST_ALPHA)));
}

#[test]
fn marquee_is_filled_and_stroked() {
    let mut frame = Frame::new();
    let rect = Rect { x: 10.0, y: 20.0, w: 30.0, h: 40.0 };
    frame.marquee = Some(rect);
    let list = frame.render(&[]);
    assert!(list.commands().contains(&DrawCommand::FillStyle(MARQUEE_FILL.to_owned())));
    assert!(list.commands().contains(&DrawCommand::FillRect(rect)));
    assert!(list.commands().contains(&DrawCommand::StrokeRect(rect)));
}

// =============================================================
// Painter failures
// =============================================================

#[test]
fn failed_ghost_style_still_restores() {
    let mut frame = Frame::new();
    frame.ghost = Some(Ghost { plugin_id: "trendline-plus".to_owned(), shape: trendline("ghost") });
    let mut painter = NoDash::default();
    assert_eq!(frame.render_into(&mut painter, &[trendline("a")]), Err("dash rejected"));
    let (saves, restores) = painter.balance();
    assert_eq!(saves, 2);
    assert_eq!(saves, restores);
}

#[test]
fn failed_fib_dash_still_restores() {
    let fib = Shape::with_id("f", Geometry::Fib { points: [dp(0.0, 100.0), dp(100.0, 200.0)], levels: vec![0.5] });
    let mut painter = NoDash::default();
    assert!(Frame::new().render_into(&mut painter, &[fib]).is_err());
    let (saves, restores) = painter.balance();
    assert_eq!(saves, 2);
    assert_eq!(saves, restores);
}

#[test]
fn failed_marquee_dash_still_restores() {
    let mut frame = Frame::new();
    frame.marquee = Some(Rect { x: 10.0, y: 10.0, w: 50.0, h: 30.0 });
    let mut painter = NoDash::default();
    assert!(frame.render_into(&mut painter, &[]).is_err());
    let (saves, restores) = painter.balance();
    assert_eq!((saves, restores), (1, 1));
    assert_eq!(count(&painter.0, |c| matches!(c, DrawCommand::FillRect(_))), 0);
}
