use crate::router::GridRouter;
use crate::router::hierarchy::Parent;
use crate::router::segments::{Segment, segment_points};
use crate::scene::Scene;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct RouteDump {
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub index: usize,
    pub id: Option<String>,
    pub group: bool,
    pub parent: Option<usize>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub from: usize,
    pub to: usize,
    pub points: Vec<[f32; 2]>,
    pub bends: usize,
}

impl RouteDump {
    pub fn from_routes(
        scene: &Scene,
        router: &GridRouter,
        edges: &[(usize, usize)],
        routes: &[Vec<Segment>],
    ) -> Self {
        let nodes = router
            .nodes()
            .iter()
            .filter(|node| !node.rect.is_empty())
            .map(|node| NodeDump {
                index: node.id,
                id: scene.nodes.get(node.id).and_then(|n| n.id.clone()),
                group: !node.leaf,
                parent: match node.parent {
                    Parent::Root => None,
                    Parent::Node(p) => Some(p),
                },
                x: node.rect.x,
                y: node.rect.y,
                width: node.rect.width,
                height: node.rect.height,
            })
            .collect();

        let edges = edges
            .iter()
            .zip(routes)
            .map(|(&(from, to), route)| EdgeDump {
                from,
                to,
                points: segment_points(route).iter().map(|p| [p.x, p.y]).collect(),
                bends: route.len().saturating_sub(1),
            })
            .collect();

        RouteDump { nodes, edges }
    }
}

/// Writes the dump as pretty JSON to `path`, or stdout when `None`.
pub fn write_route_dump(
    path: Option<&Path>,
    scene: &Scene,
    router: &GridRouter,
    edges: &[(usize, usize)],
    routes: &[Vec<Segment>],
) -> anyhow::Result<()> {
    let dump = RouteDump::from_routes(scene, router, edges, routes);
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            serde_json::to_writer_pretty(std::io::BufWriter::new(file), &dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, &dump)?;
            writeln!(lock)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use crate::scene::parse_scene;

    #[test]
    fn dump_lists_nodes_and_polylines() {
        let scene = parse_scene(
            r#"{
                "nodes": [
                    { "id": "a", "x": 0, "y": 0, "width": 100, "height": 50 },
                    { "id": "b", "x": 200, "y": 0, "width": 100, "height": 50 }
                ],
                "edges": [{ "from": "a", "to": "b" }]
            }"#,
        )
        .unwrap();
        let router = GridRouter::from_scene(&scene, &RouterConfig::default()).unwrap();
        let edges = scene.resolve_edges().unwrap();
        let routes = router.route_edges(&edges, 4.0, |e| e.0, |e| e.1).unwrap();
        let dump = RouteDump::from_routes(&scene, &router, &edges, &routes);
        assert_eq!(dump.nodes.len(), 2);
        assert_eq!(dump.nodes[1].id.as_deref(), Some("b"));
        assert_eq!(dump.edges[0].points, vec![[100.0, 25.0], [200.0, 25.0]]);
        assert_eq!(dump.edges[0].bends, 0);

        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["edges"][0]["from"], 0);
        assert_eq!(json["nodes"][0]["group"], false);
    }
}
