//! SVG Export
//!
//! One `<path>` per segment, approximating the capsule the GPU draws: a
//! rectangle along the segment closed by two half-circle arcs. Zero-length
//! segments become a full circle. Output is in pixel space at the identity
//! view; it is close to, but not pixel-identical with, the GPU rendering.

use crate::brush::BrushType;
use crate::color;
use crate::segment::Segment;

/// Settings that affect the exported document
#[derive(Debug, Clone, Copy)]
pub struct SvgOptions {
    pub width: u32,
    pub height: u32,
    /// Pixels per radius unit
    pub radius_scale: f32,
    /// sRGB paper color, used for the background and eraser segments
    pub paper_color: [f32; 4],
}

fn ndc_to_pixel(p: [f32; 2], width: f32, height: f32) -> [f32; 2] {
    [(p[0] + 1.0) * 0.5 * width, (1.0 - p[1]) * 0.5 * height]
}

/// Path data for a capsule from `a` to `b` with radius `r`, in pixels
pub fn capsule_path(a: [f32; 2], b: [f32; 2], r: f32) -> String {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let len = (dx * dx + dy * dy).sqrt();

    if len < 1e-3 {
        return format!(
            "M {:.2} {:.2} A {r:.2} {r:.2} 0 1 0 {:.2} {:.2} A {r:.2} {r:.2} 0 1 0 {:.2} {:.2} Z",
            a[0] - r,
            a[1],
            a[0] + r,
            a[1],
            a[0] - r,
            a[1],
            r = r
        );
    }

    let nx = -dy / len * r;
    let ny = dx / len * r;
    format!(
        "M {:.2} {:.2} L {:.2} {:.2} A {r:.2} {r:.2} 0 0 0 {:.2} {:.2} L {:.2} {:.2} A {r:.2} {r:.2} 0 0 0 {:.2} {:.2} Z",
        a[0] + nx,
        a[1] + ny,
        b[0] + nx,
        b[1] + ny,
        b[0] - nx,
        b[1] - ny,
        a[0] - nx,
        a[1] - ny,
        a[0] + nx,
        a[1] + ny,
        r = r
    )
}

/// Render `segments` as a standalone SVG document
pub fn export_svg(segments: &[Segment], options: &SvgOptions) -> String {
    let width = options.width as f32;
    let height = options.height as f32;
    let paper = color::to_svg_rgb(options.paper_color);

    let mut defs = String::new();
    let mut body = String::new();

    for (i, segment) in segments.iter().enumerate() {
        let a = ndc_to_pixel(segment.start, width, height);
        let b = ndc_to_pixel(segment.end, width, height);
        let r = segment.radius * options.radius_scale;
        let d = capsule_path(a, b, r);
        let fill = color::to_svg_rgb(segment.color);
        let alpha = segment.color[3];

        match segment.brush_type {
            BrushType::Vanilla | BrushType::Stamp => body.push_str(&format!(
                "  <path d=\"{}\" fill=\"{}\" fill-opacity=\"{:.3}\"/>\n",
                d, fill, alpha
            )),
            BrushType::Airbrush => {
                defs.push_str(&format!(
                    "    <radialGradient id=\"airbrush{i}\" gradientUnits=\"userSpaceOnUse\" cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\"><stop offset=\"0\" stop-color=\"{fill}\" stop-opacity=\"{:.3}\"/><stop offset=\"1\" stop-color=\"{fill}\" stop-opacity=\"0\"/></radialGradient>\n",
                    (a[0] + b[0]) * 0.5,
                    (a[1] + b[1]) * 0.5,
                    r + 0.5 * segment.length() * 0.5 * height,
                    alpha * 0.3,
                    i = i,
                    fill = fill
                ));
                body.push_str(&format!("  <path d=\"{}\" fill=\"url(#airbrush{})\"/>\n", d, i));
            }
            BrushType::Eraser => body.push_str(&format!("  <path d=\"{}\" fill=\"{}\"/>\n", d, paper)),
        }
    }

    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
        w = options.width,
        h = options.height
    );
    if !defs.is_empty() {
        svg.push_str(&format!("  <defs>\n{}  </defs>\n", defs));
    }
    svg.push_str(&format!("  <rect width=\"100%\" height=\"100%\" fill=\"{}\"/>\n", paper));
    svg.push_str(&body);
    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SvgOptions {
        SvgOptions {
            width: 800,
            height: 600,
            radius_scale: 300.0,
            paper_color: [1.0, 1.0, 1.0, 1.0],
        }
    }

    #[test]
    fn test_one_path_per_segment() {
        let segments: Vec<Segment> = BrushType::ALL
            .iter()
            .enumerate()
            .map(|(i, &t)| Segment::new([i as f32 * 0.1, 0.0], [i as f32 * 0.1 + 0.05, 0.0], [1.0, 0.0, 0.0, 1.0], 0.01, t))
            .collect();
        let svg = export_svg(&segments, &options());
        assert_eq!(svg.matches("<path ").count(), 4);
        assert_eq!(svg.matches("<radialGradient").count(), 1);
        assert!(svg.contains(r#"fill="url(#airbrush2)""#));
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_capsule_geometry() {
        // Horizontal segment in pixel space, y grows downward
        let d = capsule_path([100.0, 200.0], [300.0, 200.0], 10.0);
        assert_eq!(
            d,
            "M 100.00 210.00 L 300.00 210.00 A 10.00 10.00 0 0 0 300.00 190.00 L 100.00 190.00 A 10.00 10.00 0 0 0 100.00 210.00 Z"
        );
    }

    #[test]
    fn test_zero_length_segment_is_circle() {
        let d = capsule_path([50.0, 50.0], [50.0, 50.0], 5.0);
        assert!(d.starts_with("M 45.00 50.00 A 5.00 5.00 0 1 0 55.00 50.00"));
    }

    #[test]
    fn test_radius_scale_and_pixel_mapping() {
        let segment = Segment::new([-1.0, 1.0], [-1.0, 1.0], [0.0, 0.0, 0.0, 1.0], 0.02, BrushType::Vanilla);
        let svg = export_svg(&[segment], &options());
        // Top-left corner, radius 0.02 * 300 = 6px
        assert!(svg.contains("M -6.00 0.00 A 6.00 6.00"));
    }

    #[test]
    fn test_eraser_uses_paper_color() {
        let segment = Segment::new([0.0, 0.0], [0.1, 0.0], [0.0, 0.0, 0.0, 1.0], 0.01, BrushType::Eraser);
        let svg = export_svg(&[segment], &options());
        assert!(svg.contains(r#"fill="rgb(255,255,255)"/>"#));
        assert!(!svg.contains("rgb(0,0,0)"));
    }

    #[test]
    fn test_document_layout() {
        let segments = [
            Segment::new([0.0, 0.0], [0.1, 0.0], [0.0, 0.0, 0.0, 1.0], 0.01, BrushType::Vanilla),
            Segment::new([0.1, 0.0], [0.2, 0.0], [0.0, 0.0, 0.0, 1.0], 0.01, BrushType::Airbrush),
        ];
        let svg = export_svg(&segments, &options());
        let lines: Vec<&str> = svg.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(lines[0].starts_with("<svg "));
        assert_eq!(lines[1], "  <defs>");
        assert!(lines[2].starts_with(r#"    <radialGradient id="airbrush1""#));
        assert_eq!(lines[3], "  </defs>");
        assert!(lines[4].starts_with("  <rect "));
        assert!(lines[5].starts_with(r#"  <path d="M"#));
        assert!(lines[6].ends_with(r#"fill="url(#airbrush1)"/>"#));
        assert_eq!(lines[7], "</svg>");

        // No gradients, no defs block
        let svg = export_svg(&segments[..1], &options());
        assert!(!svg.contains("<defs>"));
        assert_eq!(svg.lines().count(), 4);
    }
}
