use super::color_scale::{ColorScale, Rgb};
use super::glyphs;
use super::{FigureSize, RenderError, write_png};
use crate::basemap::{BasemapPolygons, LandRing};
use crate::bbox::Bbox;
use crate::raster::CroppedGrid;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_polygon_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use std::path::Path;

pub(crate) const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const LAND_FILL: Rgba<u8> = Rgba([166, 166, 166, 255]);
const FRAME: Rgba<u8> = Rgba([64, 64, 64, 255]);
pub(crate) const INK: Rgba<u8> = Rgba([32, 32, 32, 255]);

// Layout constants in unscaled pixels
const MARGIN_TOP: u32 = 22;
const MARGIN_BOTTOM: u32 = 34;
const MARGIN_LEFT: u32 = 46;
const MARGIN_RIGHT: u32 = 10;
pub(crate) const LEGEND_WIDTH: u32 = 58;
const AXIS_TICKS: usize = 5;

#[derive(Debug, Clone, Copy)]
pub(crate) struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotLabels {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub units: String,
}

/// Drawing options for one panel; composites turn individual legends and
/// axis labels off in favor of shared ones.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PanelOptions {
    pub legend: bool,
    pub axis_labels: bool,
    pub tag: Option<char>,
}

/// One renderable heatmap: a cropped layer, the basemap clipped to the same
/// box, a color scale and its labels. Consumed by the single-figure
/// renderer and by composite figures.
#[derive(Debug, Clone)]
pub struct HeatmapPlot {
    pub grid: CroppedGrid,
    pub basemap: BasemapPolygons,
    pub scale: ColorScale,
    pub labels: PlotLabels,
}

/// Equirectangular pixel mapping: one shared pixels-per-degree factor for
/// both axes, map rect centered in the available area.
struct MapTransform {
    bbox: Bbox,
    px_per_deg: f64,
    map: PixelRect,
}

impl MapTransform {
    fn fit(bbox: &Bbox, avail: &PixelRect) -> Self {
        let px_per_deg = (avail.w as f64 / bbox.width()).min(avail.h as f64 / bbox.height());

        let map_w = ((bbox.width() * px_per_deg).round() as u32).clamp(1, avail.w.max(1));
        let map_h = ((bbox.height() * px_per_deg).round() as u32).clamp(1, avail.h.max(1));

        let map = PixelRect {
            x: avail.x + (avail.w.saturating_sub(map_w) / 2) as i32,
            y: avail.y + (avail.h.saturating_sub(map_h) / 2) as i32,
            w: map_w,
            h: map_h,
        };

        Self {
            bbox: *bbox,
            px_per_deg,
            map,
        }
    }

    fn x(&self, lon: f64) -> f64 {
        self.map.x as f64 + (lon - self.bbox.xmin) * self.px_per_deg
    }

    fn y(&self, lat: f64) -> f64 {
        self.map.y as f64 + (self.bbox.ymax - lat) * self.px_per_deg
    }
}

impl HeatmapPlot {
    /// Color limits for this plot alone: configured limits when fixed,
    /// otherwise this grid's own value range.
    pub fn resolved_limits(&self) -> (f32, f32) {
        self.scale.resolve_limits(self.grid.value_range())
    }

    /// Render this plot as a standalone figure with legend and axis labels.
    pub fn render_to_file<P: AsRef<Path>>(
        &self,
        path: P,
        size: &FigureSize,
    ) -> Result<(), RenderError> {
        let s = size.scale.max(1);
        let (width, height) = (size.width * s, size.height * s);

        let mut img = RgbaImage::from_pixel(width, height, BACKGROUND);
        let area = PixelRect {
            x: 0,
            y: 0,
            w: width,
            h: height,
        };

        self.draw_into(
            &mut img,
            &area,
            self.resolved_limits(),
            &PanelOptions {
                legend: true,
                axis_labels: true,
                tag: None,
            },
            s,
        );

        write_png(&img, path)
    }

    pub(crate) fn draw_into(
        &self,
        img: &mut RgbaImage,
        area: &PixelRect,
        limits: (f32, f32),
        opts: &PanelOptions,
        s: u32,
    ) {
        let legend_width = if opts.legend { LEGEND_WIDTH * s } else { 0 };

        let avail = PixelRect {
            x: area.x + (MARGIN_LEFT * s) as i32,
            y: area.y + (MARGIN_TOP * s) as i32,
            w: area.w.saturating_sub((MARGIN_LEFT + MARGIN_RIGHT) * s + legend_width),
            h: area.h.saturating_sub((MARGIN_TOP + MARGIN_BOTTOM) * s),
        };

        let transform = MapTransform::fit(&self.grid.bbox, &avail);

        self.draw_title(img, area, s);
        self.draw_tiles(img, &transform, limits);
        self.draw_land(img, &transform);
        self.draw_axes(img, &transform, opts.axis_labels, area, s);

        draw_hollow_rect_mut(
            img,
            Rect::at(transform.map.x, transform.map.y).of_size(transform.map.w, transform.map.h),
            FRAME,
        );

        if let Some(tag) = opts.tag {
            glyphs::draw_text(
                img,
                transform.map.x + 4 * s as i32,
                transform.map.y + 4 * s as i32,
                2 * s,
                INK,
                &tag.to_string(),
            );
        }

        if opts.legend {
            let legend_area = PixelRect {
                x: area.x + area.w.saturating_sub(legend_width) as i32 + 6 * s as i32,
                y: transform.map.y,
                w: legend_width.saturating_sub(6 * s),
                h: transform.map.h,
            };
            draw_legend(img, &legend_area, &self.scale, limits, &self.labels.units, s);
        }
    }

    fn draw_title(&self, img: &mut RgbaImage, area: &PixelRect, s: u32) {
        let width = glyphs::text_width(&self.labels.title, s);
        let x = area.x + ((area.w.saturating_sub(width)) / 2) as i32;
        glyphs::draw_text(img, x, area.y + 6 * s as i32, s, INK, &self.labels.title);
    }

    /// One filled rectangle per retained cell, clamped to the map rect so
    /// nothing draws outside the crop framing.
    fn draw_tiles(&self, img: &mut RgbaImage, t: &MapTransform, limits: (f32, f32)) {
        let half = self.grid.cellsize / 2.0;

        let map_x1 = t.map.x + t.map.w as i32;
        let map_y1 = t.map.y + t.map.h as i32;

        for cell in &self.grid.cells {
            let x0 = (t.x(cell.lon - half).floor() as i32).max(t.map.x);
            let x1 = (t.x(cell.lon + half).ceil() as i32).min(map_x1);
            let y0 = (t.y(cell.lat + half).floor() as i32).max(t.map.y);
            let y1 = (t.y(cell.lat - half).ceil() as i32).min(map_y1);

            if x1 <= x0 || y1 <= y0 {
                continue;
            }

            let color = self.scale.color_for(cell.value, limits);
            draw_filled_rect_mut(
                img,
                Rect::at(x0, y0).of_size((x1 - x0) as u32, (y1 - y0) as u32),
                rgba(color),
            );
        }
    }

    /// Landmass fill on top of the tiles, so land occludes sea values.
    fn draw_land(&self, img: &mut RgbaImage, t: &MapTransform) {
        for ring in &self.basemap.rings {
            let points = ring_points(ring, t);
            if points.len() >= 3 {
                draw_polygon_mut(img, &points, LAND_FILL);
            }
        }
    }

    fn draw_axes(
        &self,
        img: &mut RgbaImage,
        t: &MapTransform,
        axis_labels: bool,
        area: &PixelRect,
        s: u32,
    ) {
        let map_bottom = t.map.y + t.map.h as i32;

        let (lon_ticks, lon_step) = nice_ticks(t.bbox.xmin, t.bbox.xmax, AXIS_TICKS);
        for tick in &lon_ticks {
            let x = t.x(*tick).round() as f32;
            draw_line_segment_mut(
                img,
                (x, map_bottom as f32),
                (x, (map_bottom + 4 * s as i32) as f32),
                FRAME,
            );

            let label = format_tick(*tick, lon_step);
            let width = glyphs::text_width(&label, s);
            glyphs::draw_text(
                img,
                x as i32 - (width / 2) as i32,
                map_bottom + 7 * s as i32,
                s,
                INK,
                &label,
            );
        }

        let (lat_ticks, lat_step) = nice_ticks(t.bbox.ymin, t.bbox.ymax, AXIS_TICKS);
        for tick in &lat_ticks {
            let y = t.y(*tick).round() as f32;
            draw_line_segment_mut(
                img,
                ((t.map.x - 4 * s as i32) as f32, y),
                (t.map.x as f32, y),
                FRAME,
            );

            let label = format_tick(*tick, lat_step);
            let width = glyphs::text_width(&label, s);
            glyphs::draw_text(
                img,
                t.map.x - 6 * s as i32 - width as i32,
                y as i32 - (glyphs::text_height(s) / 2) as i32,
                s,
                INK,
                &label,
            );
        }

        if axis_labels {
            let x_width = glyphs::text_width(&self.labels.x_label, s);
            glyphs::draw_text(
                img,
                t.map.x + ((t.map.w.saturating_sub(x_width)) / 2) as i32,
                map_bottom + 20 * s as i32,
                s,
                INK,
                &self.labels.x_label,
            );

            let y_width = glyphs::text_width(&self.labels.y_label, s);
            glyphs::draw_text_vertical(
                img,
                area.x + 4 * s as i32,
                t.map.y + ((t.map.h.saturating_sub(y_width)) / 2) as i32,
                s,
                INK,
                &self.labels.y_label,
            );
        }
    }
}

pub(crate) fn rgba(color: Rgb) -> Rgba<u8> {
    Rgba([color.r, color.g, color.b, 255])
}

fn ring_points(ring: &LandRing, t: &MapTransform) -> Vec<Point<i32>> {
    let mut points: Vec<Point<i32>> = ring
        .coords
        .iter()
        .map(|&(lon, lat)| Point::new(t.x(lon).round() as i32, t.y(lat).round() as i32))
        .collect();

    // Pixel rounding can collapse neighbors; the polygon drawer rejects
    // repeated vertices at the seam
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    points
}

/// Color-bar legend: the scale sampled top (high) to bottom (low), with
/// value labels and the units string above.
pub(crate) fn draw_legend(
    img: &mut RgbaImage,
    area: &PixelRect,
    scale: &ColorScale,
    limits: (f32, f32),
    units: &str,
    s: u32,
) {
    let bar_w = 10 * s;
    let bar_h = (area.h * 3 / 5).max(20 * s);
    let bar_x = area.x;
    let bar_y = area.y + ((area.h - bar_h) / 2) as i32;

    for row in 0..bar_h {
        let t = 1.0 - row as f32 / (bar_h - 1) as f32;
        let value = limits.0 + t * (limits.1 - limits.0);
        let color = scale.color_for(value, limits);

        draw_filled_rect_mut(
            img,
            Rect::at(bar_x, bar_y + row as i32).of_size(bar_w, 1),
            rgba(color),
        );
    }

    draw_hollow_rect_mut(img, Rect::at(bar_x, bar_y).of_size(bar_w, bar_h), FRAME);

    // One value label per declared color stop, ends included
    let tick_count = scale.stops().len().max(2);
    let step = (limits.1 - limits.0) / (tick_count - 1) as f32;
    for i in 0..tick_count {
        let value = limits.0 + i as f32 * step;
        let t = if limits.1 > limits.0 {
            (value - limits.0) / (limits.1 - limits.0)
        } else {
            0.5
        };
        let y = bar_y + ((1.0 - t) * (bar_h - 1) as f32).round() as i32;

        draw_line_segment_mut(
            img,
            ((bar_x + bar_w as i32) as f32, y as f32),
            ((bar_x + bar_w as i32 + 3 * s as i32) as f32, y as f32),
            FRAME,
        );

        glyphs::draw_text(
            img,
            bar_x + bar_w as i32 + 5 * s as i32,
            y - (glyphs::text_height(s) / 2) as i32,
            s,
            INK,
            &format_tick(value as f64, step as f64),
        );
    }

    if !units.is_empty() {
        glyphs::draw_text(img, bar_x, bar_y - 12 * s as i32, s, INK, units);
    }
}

/// Round tick positions at a 1/2/5 step covering the range.
pub(crate) fn nice_ticks(min: f64, max: f64, target: usize) -> (Vec<f64>, f64) {
    let range = max - min;
    if range <= 0.0 {
        return (vec![min], 1.0);
    }

    let raw = range / target as f64;
    let magnitude = 10f64.powf(raw.log10().floor());

    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|&step| step >= raw)
        .unwrap_or(10.0 * magnitude);

    let mut ticks = Vec::new();
    let mut tick = (min / step).ceil() * step;
    while tick <= max + step * 1e-6 {
        // Snap -0.0 and accumulated error
        ticks.push((tick / step).round() * step);
        tick += step;
    }

    (ticks, step)
}

pub(crate) fn format_tick(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 {
        0
    } else if step >= 0.1 {
        1
    } else {
        2
    };

    format!("{:.*}", decimals, value)
}
