//! Spectrum bar widget for ratatui

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    widgets::{Block, Widget},
};

/// Eighth-block glyphs for the top cell of a bar
const PARTIAL_BARS: [&str; 8] = [" ", "▁", "▂", "▃", "▄", "▅", "▆", "▇"];
const FULL_BAR: &str = "█";

/// Bars use this fraction of the height at full scale
const HEADROOM: f32 = 0.9;

/// A widget that draws display bins (0.0-1.0) as vertical bars
pub struct Spectrum<'a> {
    bins: &'a [f32],
    style: Style,
    block: Option<Block<'a>>,
}

impl<'a> Spectrum<'a> {
    pub fn new(bins: &'a [f32]) -> Self {
        Self {
            bins,
            style: Style::default(),
            block: None,
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Level for screen column `x` of `width`: the loudest bin it covers
    fn column_level(&self, x: usize, width: usize) -> f32 {
        let per_col = self.bins.len() as f32 / width as f32;
        let start = (x as f32 * per_col) as usize;
        let end = (((x + 1) as f32 * per_col) as usize).min(self.bins.len());

        if start < end {
            self.bins[start..end].iter().fold(0.0f32, |m, &v| m.max(v))
        } else {
            self.bins.get(start).copied().unwrap_or(0.0)
        }
    }

    fn render_bars(&self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 || self.bins.is_empty() {
            return;
        }

        let width = area.width as usize;
        let height = area.height as usize;
        let bottom = area.y + area.height - 1;

        for x in 0..width {
            let level = self.column_level(x, width).clamp(0.0, 1.0);
            // Bar height in eighths of a cell
            let eighths = (level * HEADROOM * (height * 8) as f32) as usize;
            let full = eighths / 8;
            let partial = eighths % 8;
            let screen_x = area.x + x as u16;

            for dy in 0..full.min(height) {
                buf.set_string(screen_x, bottom - dy as u16, FULL_BAR, self.style);
            }
            if partial > 0 && full < height {
                buf.set_string(screen_x, bottom - full as u16, PARTIAL_BARS[partial], self.style);
            }
        }
    }
}

impl Widget for Spectrum<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };

        self.render_bars(inner_area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(buf: &Buffer, x: u16, height: u16) -> Vec<String> {
        (0..height)
            .map(|y| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_spectrum_empty() {
        let spectrum = Spectrum::new(&[]);
        let area = Rect::new(0, 0, 10, 5);
        let mut buf = Buffer::empty(area);
        spectrum.render(area, &mut buf);
        assert!(column(&buf, 0, 5).iter().all(|s| s == " "));
    }

    #[test]
    fn test_spectrum_zero_area_skips_draw() {
        let bins = vec![1.0; 8];
        let mut buf = Buffer::empty(Rect::new(0, 0, 4, 4));
        Spectrum::new(&bins).render(Rect::new(0, 0, 0, 4), &mut buf);
        Spectrum::new(&bins).render(Rect::new(0, 0, 4, 0), &mut buf);
        assert!(column(&buf, 0, 4).iter().all(|s| s == " "));
    }

    #[test]
    fn test_full_and_silent_bars() {
        let bins = vec![1.0, 0.0];
        let area = Rect::new(0, 0, 2, 10);
        let mut buf = Buffer::empty(area);
        Spectrum::new(&bins).render(area, &mut buf);

        // Full scale fills 90% of the height: 9 cells
        let left = column(&buf, 0, 10);
        assert_eq!(left[0], " ");
        assert!(left[1..].iter().all(|s| s == FULL_BAR));
        assert!(column(&buf, 1, 10).iter().all(|s| s == " "));
    }

    #[test]
    fn test_partial_cell() {
        // 0.5 of 90% of 2 cells = 7.2 eighths
        let bins = vec![0.5];
        let area = Rect::new(0, 0, 1, 2);
        let mut buf = Buffer::empty(area);
        Spectrum::new(&bins).render(area, &mut buf);
        assert_eq!(column(&buf, 0, 2), vec![" ".to_string(), "▇".to_string()]);
    }

    #[test]
    fn test_columns_take_loudest_bin() {
        let bins = vec![0.1, 0.9, 0.2, 0.3];
        let spectrum = Spectrum::new(&bins);
        assert_eq!(spectrum.column_level(0, 2), 0.9);
        assert_eq!(spectrum.column_level(1, 2), 0.3);
        // More columns than bins
        assert_eq!(spectrum.column_level(7, 8), 0.3);
    }

    #[test]
    fn test_spectrum_with_block() {
        let bins = vec![0.5; 10];
        let spectrum = Spectrum::new(&bins).block(Block::bordered().title("Test"));
        let area = Rect::new(0, 0, 20, 10);
        let mut buf = Buffer::empty(area);
        spectrum.render(area, &mut buf);
        assert_eq!(buf[(0, 0)].symbol(), "┌");
    }
}
