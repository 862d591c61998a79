use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Path, Program, Stroke};
use iced::{Color, Pixels, Point, Rectangle, Renderer, Size, Theme};

use crate::state::geometry::{self, RegionKind, Regions};
use crate::Message;

const PHOTO_COLOR: Color = Color {
    r: 0.2,
    g: 0.6,
    b: 1.0,
    a: 1.0,
};
const NUMBER_COLOR: Color = Color {
    r: 1.0,
    g: 0.55,
    b: 0.1,
    a: 1.0,
};

/// Crop canvas drawn on top of the template image.
/// The template is shown at 1:1, so canvas coordinates are image pixels.
pub struct CropCanvas {
    pub regions: Regions,
    pub active: RegionKind,
    /// Mirrors the editor's drag state so moves are only reported mid-drag
    pub dragging: bool,
}

/// Cursor position relative to the canvas, clamped to its bounds
pub fn to_canvas(bounds: Rectangle, position: Point) -> geometry::Point {
    geometry::Point::new(
        (position.x - bounds.x).clamp(0.0, bounds.width) as f64,
        (position.y - bounds.y).clamp(0.0, bounds.height) as f64,
    )
}

fn region_color(kind: RegionKind) -> Color {
    match kind {
        RegionKind::Photo => PHOTO_COLOR,
        RegionKind::Number => NUMBER_COLOR,
    }
}

impl Program<Message> for CropCanvas {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        for kind in RegionKind::ALL {
            let rect = self.regions.get(kind);
            if !rect.is_defined() {
                continue;
            }

            let color = region_color(kind);
            let top_left = Point::new(rect.x as f32, rect.y as f32);
            let size = Size::new(rect.width as f32, rect.height as f32);
            let is_active = kind == self.active;

            if is_active {
                frame.fill_rectangle(top_left, size, Color { a: 0.2, ..color });
            }
            frame.stroke(
                &Path::rectangle(top_left, size),
                Stroke::default()
                    .with_color(color)
                    .with_width(if is_active { 3.0 } else { 1.5 }),
            );
            frame.fill_text(canvas::Text {
                content: kind.to_string(),
                position: Point::new(top_left.x + 4.0, top_left.y + 2.0),
                color,
                size: Pixels(14.0),
                ..canvas::Text::default()
            });
        }

        vec![frame.into_geometry()]
    }

    fn update(
        &self,
        _state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        match event {
            // Drags only start inside the canvas
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if let Some(pos) = cursor.position_in(bounds) {
                    let point = geometry::Point::new(pos.x as f64, pos.y as f64);
                    return (
                        canvas::event::Status::Captured,
                        Some(Message::CropPressed(point)),
                    );
                }
            }

            // Moves and the release are tracked even outside, clamped to the edge
            canvas::Event::Mouse(mouse::Event::CursorMoved { position }) if self.dragging => {
                return (
                    canvas::event::Status::Captured,
                    Some(Message::CropMoved(to_canvas(bounds, position))),
                );
            }

            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left))
                if self.dragging =>
            {
                return (canvas::event::Status::Captured, Some(Message::CropReleased));
            }

            _ => {}
        }

        (canvas::event::Status::Ignored, None)
    }

    fn mouse_interaction(
        &self,
        _state: &Self::State,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> mouse::Interaction {
        if self.dragging || cursor.is_over(bounds) {
            mouse::Interaction::Crosshair
        } else {
            mouse::Interaction::default()
        }
    }
}
