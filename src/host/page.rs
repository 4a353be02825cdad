//! Pages that receive cell colors and the status line

use colored::Colorize;
use serde::Serialize;

use super::{CellColor, ElementRef, Page};

/// Prints painted cells and the status to the terminal
#[derive(Debug, Default)]
pub struct ConsolePage;

impl ConsolePage {
    pub fn new() -> Self {
        Self
    }
}

impl Page for ConsolePage {
    fn paint(&mut self, element: &ElementRef, color: CellColor) {
        match color {
            CellColor::Green => println!("  {} {}", "✓".green(), element.as_str().dimmed()),
            CellColor::Red => println!("  {} {}", "✗".red(), element.as_str()),
        }
    }

    fn append_status(&mut self, status: &str) {
        if status == "PASS" {
            println!("{}", status.green().bold());
        } else {
            println!("{}", status.red().bold());
        }
    }
}

/// Keeps everything in memory, in call order
#[derive(Debug, Default, Clone, Serialize)]
pub struct RecordingPage {
    pub painted: Vec<(ElementRef, CellColor)>,
    pub statuses: Vec<String>,
}

impl RecordingPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Color most recently applied to `element`
    pub fn color_of(&self, element: &ElementRef) -> Option<CellColor> {
        self.painted
            .iter()
            .rev()
            .find(|(painted, _)| painted == element)
            .map(|(_, color)| *color)
    }

    /// Most recent status line
    pub fn status(&self) -> Option<&str> {
        self.statuses.last().map(String::as_str)
    }
}

impl Page for RecordingPage {
    fn paint(&mut self, element: &ElementRef, color: CellColor) {
        self.painted.push((element.clone(), color));
    }

    fn append_status(&mut self, status: &str) {
        self.statuses.push(status.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_page_keeps_last_color() {
        let mut page = RecordingPage::new();
        let element = ElementRef::cell(0);
        page.paint(&element, CellColor::Red);
        page.paint(&element, CellColor::Green);
        assert_eq!(page.color_of(&element), Some(CellColor::Green));
        assert_eq!(page.color_of(&ElementRef::cell(1)), None);
    }

    #[test]
    fn test_recording_page_status() {
        let mut page = RecordingPage::new();
        assert_eq!(page.status(), None);
        page.append_status("FAIL#0:F");
        assert_eq!(page.status(), Some("FAIL#0:F"));
    }

    #[test]
    fn test_console_page_paints_every_cell() {
        let mut page = ConsolePage::new();
        page.paint(&ElementRef::cell(0), CellColor::Green);
        page.paint(&ElementRef::cell(1), CellColor::Red);
        page.append_status("FAIL#1:F");
    }
}
