use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Path, Program, Stroke};
use iced::{Color, Point, Rectangle, Renderer, Theme};

use crate::geo::GeoPoint;
use crate::location::Viewport;
use crate::Message;

/// Pointer travel (in pixels) below which a press/release counts as a click
const CLICK_SLOP: f32 = 4.0;

/// Grid spacings in degrees, finest first
const GRID_STEPS: [f64; 10] = [0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0];

/// Coordinate pad used to pick a point
///
/// Shows a lat/lng grid, review markers and the current selection.
/// Click picks a point, drag pans, wheel zooms.
pub struct MapPad {
    pub viewport: Viewport,
    /// Positions of the reviews currently listed
    pub markers: Vec<GeoPoint>,
    pub selected: Option<GeoPoint>,
}

impl Program<Message> for MapPad {
    type State = DragState;

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        let (width, height) = (bounds.width, bounds.height);

        frame.fill_rectangle(Point::ORIGIN, bounds.size(), Color::from_rgb(0.09, 0.13, 0.18));

        // Graticule
        let span = self.viewport.span_deg();
        let lat_span = span * f64::from(height.max(1.0)) / f64::from(width.max(1.0));
        let (center_lat, center_lng) = self.viewport.center();
        let step = grid_step(span);
        let grid = Stroke::default()
            .with_color(Color::from_rgba(1.0, 1.0, 1.0, 0.08))
            .with_width(1.0);

        let left = center_lng - span / 2.0;
        let mut lng = (left / step).ceil() * step;
        while lng <= left + span {
            let x = ((lng - left) / span) as f32 * width;
            frame.stroke(&Path::line(Point::new(x, 0.0), Point::new(x, height)), grid.clone());
            lng += step;
        }

        let top = center_lat + lat_span / 2.0;
        let mut lat = (top / step).floor() * step;
        while lat >= top - lat_span {
            let y = ((top - lat) / lat_span) as f32 * height;
            frame.stroke(&Path::line(Point::new(0.0, y), Point::new(width, y)), grid.clone());
            lat -= step;
        }

        // Review markers
        for marker in &self.markers {
            if let Some((x, y)) = self.viewport.to_screen(marker, width, height) {
                frame.fill(&Path::circle(Point::new(x, y), 4.0), Color::from_rgb(0.83, 0.69, 0.22));
            }
        }

        // Current selection
        if let Some(selected) = &self.selected {
            if let Some((x, y)) = self.viewport.to_screen(selected, width, height) {
                let center = Point::new(x, y);
                frame.fill(&Path::circle(center, 3.0), Color::WHITE);
                frame.stroke(
                    &Path::circle(center, 9.0),
                    Stroke::default().with_color(Color::WHITE).with_width(2.0),
                );
            }
        }

        vec![frame.into_geometry()]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        match event {
            // Mouse wheel for zooming
            canvas::Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                if cursor.position_in(bounds).is_none() {
                    return (canvas::event::Status::Ignored, None);
                }
                let zoom_delta = match delta {
                    mouse::ScrollDelta::Lines { y, .. } => y * 0.1,
                    mouse::ScrollDelta::Pixels { y, .. } => y * 0.01,
                };
                return (canvas::event::Status::Captured, Some(Message::MapZoom(zoom_delta)));
            }

            // Press - may become a click or a drag
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if let Some(pos) = cursor.position_in(bounds) {
                    state.is_dragging = true;
                    state.moved = false;
                    state.press_position = Some(pos);
                    state.last_position = Some(pos);
                    return (canvas::event::Status::Captured, None);
                }
            }

            // Release - a press that did not travel is a click
            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                if !state.is_dragging {
                    return (canvas::event::Status::Ignored, None);
                }
                let was_click = !state.moved;
                let press = state.press_position;
                *state = DragState::default();

                if let (true, Some(pos)) = (was_click, press) {
                    let (latitude, longitude) =
                        self.viewport.to_geo(pos.x, pos.y, bounds.width, bounds.height);
                    return (
                        canvas::event::Status::Captured,
                        Some(Message::MapClicked { latitude, longitude }),
                    );
                }
                return (canvas::event::Status::Captured, None);
            }

            // Mouse move - pan if dragging
            canvas::Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                if state.is_dragging {
                    if let (Some(current), Some(last)) = (cursor.position_in(bounds), state.last_position) {
                        if let Some(press) = state.press_position {
                            if current.distance(press) > CLICK_SLOP {
                                state.moved = true;
                            }
                        }
                        if !state.moved {
                            return (canvas::event::Status::Captured, None);
                        }

                        let width = bounds.width.max(1.0);
                        let height = bounds.height.max(1.0);
                        state.last_position = Some(current);
                        return (
                            canvas::event::Status::Captured,
                            Some(Message::MapPan {
                                dx: (current.x - last.x) / width,
                                dy: (current.y - last.y) / height,
                                aspect: height / width,
                            }),
                        );
                    }
                }
            }

            _ => {}
        }

        (canvas::event::Status::Ignored, None)
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> mouse::Interaction {
        if state.moved {
            mouse::Interaction::Grabbing
        } else if cursor.is_over(bounds) {
            mouse::Interaction::Crosshair
        } else {
            mouse::Interaction::default()
        }
    }
}

/// State for click/drag interactions
#[derive(Debug, Clone, Default)]
pub struct DragState {
    pub is_dragging: bool,
    /// Travelled far enough to be a drag rather than a click
    pub moved: bool,
    pub press_position: Option<Point>,
    pub last_position: Option<Point>,
}

/// Coarsest spacing that still draws a handful of lines across the pad
fn grid_step(span_deg: f64) -> f64 {
    GRID_STEPS
        .iter()
        .copied()
        .find(|step| span_deg / step <= 12.0)
        .unwrap_or(30.0)
}
