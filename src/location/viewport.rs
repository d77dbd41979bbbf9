/// Equirectangular window onto the globe used by the map pad
///
/// Degrees are kept square on screen: the vertical span follows from the
/// horizontal span and the pad's aspect ratio.
use crate::geo::GeoPoint;

/// Narrowest horizontal span (about 500 m at the equator)
pub const MIN_SPAN_DEG: f64 = 0.005;
/// Widest horizontal span
pub const MAX_SPAN_DEG: f64 = 180.0;
/// Keeps the view away from the poles, where equirectangular breaks down
const MAX_CENTER_LAT: f64 = 85.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    center_lat: f64,
    center_lng: f64,
    /// Horizontal span in degrees of longitude
    span_deg: f64,
}

impl Default for Viewport {
    /// Myanmar and its neighbours
    fn default() -> Self {
        Self::new(19.0, 96.5, 12.0)
    }
}

impl Viewport {
    pub fn new(center_lat: f64, center_lng: f64, span_deg: f64) -> Self {
        Self {
            center_lat: center_lat.clamp(-MAX_CENTER_LAT, MAX_CENTER_LAT),
            center_lng: wrap_longitude(center_lng),
            span_deg: span_deg.clamp(MIN_SPAN_DEG, MAX_SPAN_DEG),
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.center_lat, self.center_lng)
    }

    pub fn span_deg(&self) -> f64 {
        self.span_deg
    }

    /// Recenter on a point, optionally zooming in to at least `span_deg`
    pub fn focus(&mut self, point: &GeoPoint, span_deg: Option<f64>) {
        *self = Self::new(
            point.latitude(),
            point.longitude(),
            span_deg.map_or(self.span_deg, |s| s.min(self.span_deg)),
        );
    }

    /// Pad position (pixels from the top-left) to latitude/longitude
    pub fn to_geo(&self, x: f32, y: f32, width: f32, height: f32) -> (f64, f64) {
        let (width, height) = (f64::from(width.max(1.0)), f64::from(height.max(1.0)));
        let lat_span = self.span_deg * height / width;

        let lng = self.center_lng + (f64::from(x) / width - 0.5) * self.span_deg;
        let lat = self.center_lat - (f64::from(y) / height - 0.5) * lat_span;

        (lat.clamp(-90.0, 90.0), wrap_longitude(lng))
    }

    /// Latitude/longitude to pad position; None when outside the pad
    pub fn to_screen(&self, point: &GeoPoint, width: f32, height: f32) -> Option<(f32, f32)> {
        let (w, h) = (f64::from(width.max(1.0)), f64::from(height.max(1.0)));
        let lat_span = self.span_deg * h / w;

        let d_lng = wrap_longitude(point.longitude() - self.center_lng);
        let x = (d_lng / self.span_deg + 0.5) * w;
        let y = (0.5 - (point.latitude() - self.center_lat) / lat_span) * h;

        ((0.0..=w).contains(&x) && (0.0..=h).contains(&y)).then(|| (x as f32, y as f32))
    }

    /// Positive `delta` zooms in, negative zooms out
    pub fn zoom(&mut self, delta: f32) {
        let factor = (1.0 - f64::from(delta)).clamp(0.5, 2.0);
        self.span_deg = (self.span_deg * factor).clamp(MIN_SPAN_DEG, MAX_SPAN_DEG);
    }

    /// Drag by a fraction of the pad size; content follows the pointer
    pub fn pan(&mut self, dx_frac: f32, dy_frac: f32, aspect: f32) {
        let lat_span = self.span_deg * f64::from(aspect);
        self.center_lng = wrap_longitude(self.center_lng - f64::from(dx_frac) * self.span_deg);
        self.center_lat = (self.center_lat + f64::from(dy_frac) * lat_span)
            .clamp(-MAX_CENTER_LAT, MAX_CENTER_LAT);
    }
}

/// Fold any longitude into [-180, 180]
pub fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        return lng;
    }
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lng > 0.0 {
        180.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: f32 = 400.0;
    const H: f32 = 200.0;

    #[test]
    fn test_center_maps_to_middle() {
        let vp = Viewport::new(16.84, 96.17, 10.0);
        let (lat, lng) = vp.to_geo(W / 2.0, H / 2.0, W, H);
        assert!((lat - 16.84).abs() < 1e-9);
        assert!((lng - 96.17).abs() < 1e-9);
    }

    #[test]
    fn test_corners() {
        let vp = Viewport::new(0.0, 0.0, 40.0);
        // 400x200 pad: 40 degrees wide, 20 degrees tall
        let (lat, lng) = vp.to_geo(0.0, 0.0, W, H);
        assert!((lat - 10.0).abs() < 1e-9);
        assert!((lng + 20.0).abs() < 1e-9);

        let (lat, lng) = vp.to_geo(W, H, W, H);
        assert!((lat + 10.0).abs() < 1e-9);
        assert!((lng - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_screen_round_trip() {
        let vp = Viewport::new(20.0, 96.0, 8.0);
        let point = GeoPoint::new(21.9588, 96.0891).unwrap();
        let (x, y) = vp.to_screen(&point, W, H).unwrap();
        let (lat, lng) = vp.to_geo(x, y, W, H);
        assert!((lat - point.latitude()).abs() < 1e-3);
        assert!((lng - point.longitude()).abs() < 1e-3);
    }

    #[test]
    fn test_offscreen_points() {
        let vp = Viewport::new(20.0, 96.0, 2.0);
        let far = GeoPoint::new(13.7563, 100.5018).unwrap();
        assert!(vp.to_screen(&far, W, H).is_none());
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut vp = Viewport::new(0.0, 0.0, MIN_SPAN_DEG);
        vp.zoom(0.5);
        assert_eq!(vp.span_deg(), MIN_SPAN_DEG);

        let mut vp = Viewport::new(0.0, 0.0, 100.0);
        vp.zoom(-5.0);
        assert_eq!(vp.span_deg(), MAX_SPAN_DEG);

        let mut vp = Viewport::new(0.0, 0.0, 10.0);
        vp.zoom(0.1);
        assert!((vp.span_deg() - 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_pan_wraps_and_clamps() {
        let mut vp = Viewport::new(80.0, 175.0, 20.0);
        // Drag left by half the pad: view moves east
        vp.pan(-0.5, 0.0, 0.5);
        assert!((vp.center().1 - (-175.0)).abs() < 1e-9);

        vp.pan(0.0, 10.0, 0.5);
        assert_eq!(vp.center().0, 85.0);
    }

    #[test]
    fn test_wrap_longitude() {
        assert_eq!(wrap_longitude(190.0), -170.0);
        assert_eq!(wrap_longitude(-190.0), 170.0);
        assert_eq!(wrap_longitude(540.0), 180.0);
        assert_eq!(wrap_longitude(45.0), 45.0);
    }

    #[test]
    fn test_focus() {
        let mut vp = Viewport::default();
        let bagan = GeoPoint::new(21.1717, 94.8585).unwrap();
        vp.focus(&bagan, Some(0.5));
        assert_eq!(vp.center(), (21.1717, 94.8585));
        assert_eq!(vp.span_deg(), 0.5);
    }
}
