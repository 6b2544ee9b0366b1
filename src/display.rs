//! ==============================================================================
//! display.rs - status frame rendering
//! ==============================================================================
//!
//! purpose:
//!     `render` is a pure function from (local reading, optional forecast)
//!     to a small text frame, sized for a 128x64 oled at text size 1:
//!
//!         Weather Node
//!         Local: 21.50 C 40.00 %
//!         P: 1013.25 hPa
//!
//!         Now: 21.50 C clear
//!         H:25.00 L:15.00 C
//!
//!     without remote data the last two lines become "Remote: (none)".
//!
//!     frame sinks (`Display`) decide where the frame goes: stdout, the
//!     status server, or both.
//!
//! relationships:
//!     - used by: scheduler.rs
//!     - read by: server.rs (SharedFrame)
//!
//! ==============================================================================

use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::domain::{ForecastSummary, SensorReading};

pub const NO_REMOTE_DATA: &str = "Remote: (none)";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub lines: Vec<String>,
    /// timestamp of the local reading the frame was drawn from
    pub rendered_at: u64,
}

impl Frame {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

pub fn render(reading: &SensorReading, remote: Option<&ForecastSummary>) -> Frame {
    let mut lines = vec![
        "Weather Node".to_string(),
        format!("Local: {:.2} C {:.2} %", reading.temperature, reading.humidity),
        format!("P: {:.2} hPa", reading.pressure_hpa()),
        String::new(),
    ];

    match remote {
        Some(summary) => {
            lines.push(format!("Now: {:.2} C {}", summary.current_temp, summary.description));
            if let (Some(high), Some(low)) = (summary.daily_high, summary.daily_low) {
                lines.push(format!("H:{:.2} L:{:.2} C", high, low));
            }
        }
        None => lines.push(NO_REMOTE_DATA.to_string()),
    }

    Frame { lines, rendered_at: reading.timestamp }
}

/// a frame sink
pub trait Display {
    fn show(&mut self, frame: &Frame);
}

/// prints each frame to stdout inside a box
pub struct ConsoleDisplay;

impl Display for ConsoleDisplay {
    fn show(&mut self, frame: &Frame) {
        let width = frame.lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        println!("┌{}┐", "─".repeat(width + 2));
        for line in &frame.lines {
            println!("│ {:<width$} │", line, width = width);
        }
        println!("└{}┘", "─".repeat(width + 2));
    }
}

/// last frame, shared with the status server
#[derive(Clone, Default)]
pub struct SharedFrame(Arc<RwLock<Option<Frame>>>);

impl SharedFrame {
    pub fn latest(&self) -> Option<Frame> {
        self.0.read().map(|f| f.clone()).unwrap_or_else(|e| e.into_inner().clone())
    }
}

impl Display for SharedFrame {
    fn show(&mut self, frame: &Frame) {
        let mut slot = self.0.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(frame.clone());
    }
}

/// fan a frame out to several sinks
#[derive(Default)]
pub struct Displays(Vec<Box<dyn Display>>);

impl Displays {
    pub fn push(&mut self, display: impl Display + 'static) {
        self.0.push(Box::new(display));
    }
}

impl Display for Displays {
    fn show(&mut self, frame: &Frame) {
        tracing::debug!("render:\n{}", frame.text());
        for display in &mut self.0 {
            display.show(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> SensorReading {
        SensorReading { temperature: 21.5, humidity: 40.0, pressure: 101_325.0, timestamp: 77 }
    }

    #[test]
    fn test_render_without_remote() {
        let frame = render(&reading(), None);
        assert_eq!(
            frame.lines,
            vec!["Weather Node", "Local: 21.50 C 40.00 %", "P: 1013.25 hPa", "", "Remote: (none)"]
        );
        assert_eq!(frame.rendered_at, 77);
    }

    #[test]
    fn test_render_with_remote_and_daily() {
        let summary = ForecastSummary {
            description: "scattered clouds".into(),
            current_temp: 18.25,
            daily_high: Some(25.0),
            daily_low: Some(15.5),
        };
        let frame = render(&reading(), Some(&summary));
        assert_eq!(&frame.lines[4..], &["Now: 18.25 C scattered clouds", "H:25.00 L:15.50 C"]);
        assert!(!frame.text().contains(NO_REMOTE_DATA));
    }

    #[test]
    fn test_render_without_daily_section() {
        let summary = ForecastSummary {
            description: "clear".into(),
            current_temp: 21.5,
            daily_high: None,
            daily_low: None,
        };
        let frame = render(&reading(), Some(&summary));
        assert_eq!(frame.lines.len(), 5);
        assert_eq!(frame.lines[4], "Now: 21.50 C clear");
    }

    #[test]
    fn test_render_is_pure() {
        assert_eq!(render(&reading(), None), render(&reading(), None));
    }

    #[test]
    fn test_shared_frame_and_fan_out() {
        let shared = SharedFrame::default();
        assert_eq!(shared.latest(), None);

        let mut displays = Displays::default();
        displays.push(shared.clone());
        displays.push(ConsoleDisplay);
        let frame = render(&reading(), None);
        displays.show(&frame);

        assert_eq!(shared.latest(), Some(frame));
    }
}
