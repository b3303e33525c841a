use crate::config::RenderConfig;
use crate::geometry::{Point, Rect};
use crate::router::GridRouter;
use crate::router::segments::{Segment, segment_points};
use crate::scene::Scene;
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

pub fn render_svg(
    scene: &Scene,
    router: &GridRouter,
    routes: &[Vec<Segment>],
    theme: &Theme,
    config: &RenderConfig,
) -> String {
    let bounds = drawing_bounds(router, routes).inflate(config.margin);
    let (min_x, min_y) = if bounds.is_empty() { (0.0, 0.0) } else { (bounds.x, bounds.y) };
    let width = if bounds.is_empty() { 200.0 } else { bounds.width.max(200.0) };
    let height = if bounds.is_empty() { 200.0 } else { bounds.height.max(200.0) };

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"{min_x:.2} {min_y:.2} {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect x=\"{min_x:.2}\" y=\"{min_y:.2}\" width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        config.background
    ));

    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.line_color
    ));
    svg.push_str("</defs>");

    // outermost groups first so nested ones paint on top
    let mut groups: Vec<(usize, usize)> = router
        .nodes()
        .iter()
        .filter(|n| !n.leaf && !n.rect.is_empty())
        .map(|n| (router.lineage(n.id).map(|l| l.len()).unwrap_or(0), n.id))
        .collect();
    groups.sort_unstable();
    for (_, idx) in groups {
        let rect = router.nodes()[idx].rect;
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\" stroke=\"{}\" stroke-dasharray=\"6 4\" stroke-width=\"1.2\"/>",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            theme.cluster_background,
            theme.cluster_border
        ));
        if let Some(label) = scene.display_name(idx) {
            let label_x = rect.x + 6.0;
            let label_y = rect.y + theme.font_size;
            svg.push_str(&format!(
                "<text x=\"{label_x:.2}\" y=\"{label_y:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
                theme.font_family,
                theme.font_size,
                theme.primary_text_color,
                escape_xml(label)
            ));
        }
    }

    for node in router.nodes().iter().filter(|n| n.leaf) {
        let rect = node.rect;
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            theme.primary_color,
            theme.primary_border_color
        ));
        if let Some(label) = scene.display_name(node.id) {
            let center = rect.center();
            let baseline = center.y + theme.font_size / 3.0;
            svg.push_str(&format!(
                "<text x=\"{:.2}\" y=\"{baseline:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
                center.x,
                theme.font_family,
                theme.font_size,
                theme.primary_text_color,
                escape_xml(label)
            ));
        }
    }

    for route in routes.iter().filter(|r| !r.is_empty()) {
        let d = points_to_path(&segment_points(route));
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" marker-end=\"url(#arrow)\" />",
            d, theme.line_color, theme.line_width
        ));
    }

    svg.push_str("</svg>");
    svg
}

fn drawing_bounds(router: &GridRouter, routes: &[Vec<Segment>]) -> Rect {
    let mut bounds = router
        .nodes()
        .iter()
        .fold(Rect::empty(), |acc, n| acc.union(&n.rect));
    for seg in routes.iter().flatten() {
        bounds = bounds.union(&Rect::from_corners(seg.start.x, seg.start.y, seg.end.x, seg.end.y));
    }
    bounds
}

fn points_to_path(points: &[Point]) -> String {
    if points.is_empty() {
        return String::new();
    }
    let mut d = String::new();
    d.push_str(&format!("M {:.2} {:.2}", points[0].x, points[0].y));
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.x, point.y));
    }
    d
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("Invalid render size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use crate::scene::parse_scene;

    const SCENE: &str = r#"{
        "nodes": [
            { "label": "A & B", "x": 0, "y": 0, "width": 100, "height": 50 },
            { "label": "C", "x": 200, "y": 0, "width": 100, "height": 50 },
            { "label": "Both", "children": [0, 1] }
        ],
        "edges": [{ "from": 0, "to": 1 }]
    }"#;

    #[test]
    fn render_svg_basic() {
        let scene = parse_scene(SCENE).unwrap();
        let router = GridRouter::from_scene(&scene, &RouterConfig::default()).unwrap();
        let edges = scene.resolve_edges().unwrap();
        let routes = router.route_edges(&edges, 4.0, |e| e.0, |e| e.1).unwrap();
        let svg = render_svg(&scene, &router, &routes, &Theme::modern(), &RenderConfig::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("A &amp; B"));
        assert!(svg.contains("stroke-dasharray"));
        assert_eq!(svg.matches("marker-end").count(), 1);
        assert!(svg.contains("M 100.00 25.00 L 200.00 25.00"));
    }

    #[test]
    fn empty_scene_still_renders() {
        let scene = Scene::default();
        let router = GridRouter::from_scene(&scene, &RouterConfig::default()).unwrap();
        let svg = render_svg(&scene, &router, &[], &Theme::classic(), &RenderConfig::default());
        assert!(svg.contains("width=\"200.00\""));
        assert!(!svg.contains("<path d=\"M"));
    }

    #[test]
    fn path_from_points() {
        let d = points_to_path(&[Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 5.5)]);
        assert_eq!(d, "M 0.00 0.00 L 10.00 0.00 L 10.00 5.50");
        assert!(points_to_path(&[]).is_empty());
    }
}
