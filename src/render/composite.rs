use super::glyphs;
use super::heatmap::{
    BACKGROUND, HeatmapPlot, INK, LEGEND_WIDTH, PanelOptions, PixelRect, draw_legend,
};
use super::{FigureSize, RenderError, write_png};
use image::RgbaImage;
use std::path::Path;

/// A panel grid over already-built heatmap plots. Panels keep their input
/// order (left to right, top to bottom) and are tagged A, B, C, ...; when
/// every panel's color scale is identical one legend serves them all.
pub struct CompositeFigure<'a> {
    panels: Vec<&'a HeatmapPlot>,
    columns: usize,
}

impl<'a> CompositeFigure<'a> {
    pub fn new(panels: Vec<&'a HeatmapPlot>, columns: usize) -> Result<Self, RenderError> {
        if panels.len() < 2 {
            return Err(RenderError::TooFewPanels(panels.len()));
        }

        let columns = columns.clamp(1, panels.len());

        Ok(Self { panels, columns })
    }

    pub fn has_shared_legend(&self) -> bool {
        self.panels.windows(2).all(|pair| pair[0].scale == pair[1].scale)
    }

    /// Joint color limits across every panel, so one legend covers every
    /// tile even when the scales auto-range from their own grids.
    fn shared_limits(&self) -> (f32, f32) {
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;

        for panel in &self.panels {
            let (panel_lo, panel_hi) = panel.resolved_limits();
            lo = lo.min(panel_lo);
            hi = hi.max(panel_hi);
        }

        if lo.is_finite() && hi.is_finite() {
            (lo, hi)
        } else {
            (0.0, 1.0)
        }
    }

    pub fn render_to_file<P: AsRef<Path>>(
        &self,
        path: P,
        size: &FigureSize,
    ) -> Result<(), RenderError> {
        let s = size.scale.max(1);
        let (width, height) = (size.width * s, size.height * s);

        let mut img = RgbaImage::from_pixel(width, height, BACKGROUND);

        let shared = self.has_shared_legend();
        let legend_width = if shared { LEGEND_WIDTH * s } else { 0 };
        let left_strip = 12 * s;
        let bottom_strip = 16 * s;

        let grid_w = width.saturating_sub(legend_width + left_strip).max(1);
        let grid_h = height.saturating_sub(bottom_strip).max(1);

        let rows = self.panels.len().div_ceil(self.columns);
        let panel_w = (grid_w / self.columns as u32).max(1);
        let panel_h = (grid_h / rows as u32).max(1);

        let shared_limits = shared.then(|| self.shared_limits());

        for (index, panel) in self.panels.iter().enumerate() {
            let row = index / self.columns;
            let col = index % self.columns;

            let area = PixelRect {
                x: (left_strip + col as u32 * panel_w) as i32,
                y: (row as u32 * panel_h) as i32,
                w: panel_w,
                h: panel_h,
            };

            panel.draw_into(
                &mut img,
                &area,
                shared_limits.unwrap_or_else(|| panel.resolved_limits()),
                &PanelOptions {
                    legend: !shared,
                    axis_labels: false,
                    tag: Some(char::from(b'A' + (index % 26) as u8)),
                },
                s,
            );
        }

        if let Some(limits) = shared_limits {
            let legend_area = PixelRect {
                x: (width - legend_width + 6 * s) as i32,
                y: (height / 4) as i32,
                w: legend_width.saturating_sub(6 * s),
                h: height / 2,
            };
            draw_legend(
                &mut img,
                &legend_area,
                &self.panels[0].scale,
                limits,
                &self.panels[0].labels.units,
                s,
            );
        }

        // One shared axis label per side, taken from the first panel
        let labels = &self.panels[0].labels;

        let x_width = glyphs::text_width(&labels.x_label, s);
        glyphs::draw_text(
            &mut img,
            (left_strip + grid_w.saturating_sub(x_width) / 2) as i32,
            (height - 12 * s) as i32,
            s,
            INK,
            &labels.x_label,
        );

        let y_width = glyphs::text_width(&labels.y_label, s);
        glyphs::draw_text_vertical(
            &mut img,
            2 * s as i32,
            (grid_h.saturating_sub(y_width) / 2) as i32,
            s,
            INK,
            &labels.y_label,
        );

        write_png(&img, path)
    }
}
