//! Waveform layout for a telemetry snapshot.
//!
//! Rendering is a pure function of the snapshot and the target area. The
//! output describes what to draw; surfaces (the CLI sparkline, a GUI canvas)
//! decide how.

use gmti_model::TelemetrySnapshot;

pub const PLACEHOLDER_LABEL: &str = "Awaiting data...";

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Drawing area in surface coordinates, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub points: Vec<Point>,
    /// Samples scaled into `0.0..=1.0` against the series maximum.
    pub normalized: Vec<f64>,
    pub detection_count: i64,
}

impl Waveform {
    pub fn overlay(&self) -> String {
        format!("Detections: {}", self.detection_count)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Drawable {
    Placeholder { label: &'static str },
    Waveform(Waveform),
}

pub fn render(
    snapshot: Option<&TelemetrySnapshot>,
    viewport: Viewport,
) -> Drawable {
    let Some(snapshot) = snapshot.filter(|s| !s.is_empty()) else {
        return Drawable::Placeholder {
            label: PLACEHOLDER_LABEL,
        };
    };

    let normalized = normalize(&snapshot.profile);
    let last = (normalized.len() - 1).max(1) as f64;
    let points = normalized
        .iter()
        .enumerate()
        .map(|(i, value)| Point {
            x: viewport.left + (viewport.width - 1.0) * i as f64 / last,
            y: viewport.bottom() - value * viewport.height,
        })
        .collect();

    Drawable::Waveform(Waveform {
        points,
        normalized,
        detection_count: snapshot.detection_count,
    })
}

/// Divide every sample by the series maximum. A maximum at or below zero
/// yields all zeros.
pub fn normalize(profile: &[f64]) -> Vec<f64> {
    let peak = profile.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !peak.is_finite() || peak <= 0.0 {
        return vec![0.0; profile.len()];
    }
    profile.iter().map(|v| v / peak).collect()
}

/// One-line text rendering: block characters followed by the overlay.
///
/// Series longer than `width` are bucketed, keeping each bucket's peak.
pub fn sparkline(snapshot: Option<&TelemetrySnapshot>, width: usize) -> String {
    let waveform = match render(snapshot, Viewport::new(0.0, 0.0, 1.0, 1.0)) {
        Drawable::Placeholder { label } => return label.to_string(),
        Drawable::Waveform(waveform) => waveform,
    };

    let columns = bucket_peaks(&waveform.normalized, width.max(1));
    let mut line: String = columns
        .iter()
        .map(|v| {
            let top = (SPARK_LEVELS.len() - 1) as f64;
            let level = (v.clamp(0.0, 1.0) * top).round();
            SPARK_LEVELS[level as usize]
        })
        .collect();
    line.push_str("  ");
    line.push_str(&waveform.overlay());
    line
}

fn bucket_peaks(values: &[f64], width: usize) -> Vec<f64> {
    if values.len() <= width {
        return values.to_vec();
    }
    (0..width)
        .map(|col| {
            let start = col * values.len() / width;
            let end = ((col + 1) * values.len() / width).max(start + 1);
            values[start..end]
                .iter()
                .copied()
                .fold(0.0_f64, f64::max)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(10.0, 20.0, 101.0, 50.0)
    }

    fn waveform(drawable: Drawable) -> Waveform {
        match drawable {
            Drawable::Waveform(w) => w,
            other => panic!("expected waveform, got {other:?}"),
        }
    }

    #[test]
    fn absent_and_empty_render_placeholder() {
        let expected = Drawable::Placeholder {
            label: "Awaiting data...",
        };
        assert_eq!(render(None, viewport()), expected);
        assert_eq!(
            render(Some(&TelemetrySnapshot::new(vec![], 5)), viewport()),
            expected
        );
    }

    #[test]
    fn profile_is_normalized_against_its_peak() {
        let snapshot = TelemetrySnapshot::new(vec![1.0, 2.0, 4.0, 2.0, 1.0], 3);
        let w = waveform(render(Some(&snapshot), viewport()));
        assert_eq!(w.normalized, vec![0.25, 0.5, 1.0, 0.5, 0.25]);
        assert_eq!(w.points.len(), 5);
        assert_eq!(w.overlay(), "Detections: 3");

        assert_eq!(w.points[0], Point { x: 10.0, y: 70.0 - 12.5 });
        assert_eq!(w.points[2], Point { x: 60.0, y: 20.0 });
        assert_eq!(w.points[4].x, 110.0);
    }

    #[test]
    fn single_sample_renders_full_scale() {
        let snapshot = TelemetrySnapshot::new(vec![0.3], 0);
        let w = waveform(render(Some(&snapshot), viewport()));
        assert_eq!(w.normalized, vec![1.0]);
        assert_eq!(w.points, vec![Point { x: 10.0, y: 20.0 }]);
    }

    #[test]
    fn non_positive_peak_flattens_to_zero() {
        assert_eq!(normalize(&[-1.0, -3.0]), vec![0.0, 0.0]);
        assert_eq!(normalize(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn sparkline_maps_levels_and_appends_overlay() {
        let snapshot = TelemetrySnapshot::new(vec![0.0, 1.0, 2.0], 4);
        assert_eq!(sparkline(Some(&snapshot), 40), "▁▅█  Detections: 4");
        assert_eq!(sparkline(None, 40), "Awaiting data...");
    }

    #[test]
    fn sparkline_buckets_long_series() {
        let profile: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let snapshot = TelemetrySnapshot::new(profile, 0);
        let line = sparkline(Some(&snapshot), 10);
        let bars: String = line.chars().take_while(|c| *c != ' ').collect();
        assert_eq!(bars.chars().count(), 10);
        assert!(bars.ends_with('█'));
    }
}
