use std::str::Lines;

use anyhow::{anyhow, Result};
use serde::Serialize;

/// Polygon kinds as they appear in scene files. Runtime enable/disable
/// state lives in the engine, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PolygonKind {
    Path,
    Node,
    Block,
    Refer,
    Tag,
    Exit,
    Effect,
}

impl PolygonKind {
    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "path" => Ok(PolygonKind::Path),
            "node" => Ok(PolygonKind::Node),
            "block" => Ok(PolygonKind::Block),
            "refer" => Ok(PolygonKind::Refer),
            "tag" => Ok(PolygonKind::Tag),
            "exit" => Ok(PolygonKind::Exit),
            "effect" => Ok(PolygonKind::Effect),
            other => Err(anyhow!("unknown polygon type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolygonDef {
    pub name: String,
    pub kind: PolygonKind,
    pub corners: [(i32, i32); 4],
    /// Near/far depth-band scale values; equal values mean a constant scale.
    pub scale_near: i32,
    pub scale_far: i32,
    /// Node coordinates, populated only for `PolygonKind::Node`.
    pub nodes: Vec<(i32, i32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneFile {
    pub name: Option<String>,
    pub no_path: bool,
    pub no_scroll: bool,
    pub polygons: Vec<PolygonDef>,
}

impl SceneFile {
    pub fn parse(input: &[u8]) -> Result<Self> {
        let text = String::from_utf8(input.to_vec())?;
        let normalized = text.replace("\r\n", "\n");
        let mut lines = normalized.lines();

        let mut parser = Parser::new(&mut lines);
        parser.parse()
    }
}

struct Parser<'a> {
    lines: &'a mut Lines<'a>,
}

impl<'a> Parser<'a> {
    fn new(lines: &'a mut Lines<'a>) -> Self {
        Self { lines }
    }

    fn parse(&mut self) -> Result<SceneFile> {
        let mut name = None;
        let mut no_path = false;
        let mut no_scroll = false;
        let mut polygons = Vec::new();
        let mut section = Section::None;
        let mut current: Option<PolygonBuilder> = None;

        while let Some(raw_line) = self.lines.next() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(value) = line.strip_prefix("section:") {
                section = Section::from_name(value.trim());
                if let Some(builder) = current.take() {
                    polygons.push(builder.finish()?);
                }
                continue;
            }

            match section {
                Section::Scene => {
                    if let Some(value) = line.strip_prefix("name") {
                        name = Some(value.trim().to_string());
                    } else if line.starts_with("nopath") {
                        no_path = flag_value(line);
                    } else if line.starts_with("noscroll") {
                        no_scroll = flag_value(line);
                    }
                }
                Section::Polygons => {
                    if line.starts_with("polygon") {
                        if let Some(builder) = current.take() {
                            polygons.push(builder.finish()?);
                        }
                        let poly_name = line
                            .split_whitespace()
                            .last()
                            .ok_or_else(|| anyhow!("missing polygon name"))?;
                        current = Some(PolygonBuilder::new(poly_name));
                    } else if let Some(builder) = current.as_mut() {
                        builder.consume_line(line, self.lines)?;
                    }
                }
                Section::Other | Section::None => {}
            }
        }

        if let Some(builder) = current.take() {
            polygons.push(builder.finish()?);
        }

        Ok(SceneFile {
            name,
            no_path,
            no_scroll,
            polygons,
        })
    }
}

fn flag_value(line: &str) -> bool {
    line.split_whitespace()
        .last()
        .map(|value| value != "0")
        .unwrap_or(true)
}

struct PolygonBuilder {
    name: String,
    kind: Option<PolygonKind>,
    corners: Vec<(i32, i32)>,
    scale_near: Option<i32>,
    scale_far: Option<i32>,
    expected_nodes: Option<usize>,
    nodes: Vec<(i32, i32)>,
}

impl PolygonBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            corners: Vec::new(),
            scale_near: None,
            scale_far: None,
            expected_nodes: None,
            nodes: Vec::new(),
        }
    }

    fn finish(self) -> Result<PolygonDef> {
        let kind = self
            .kind
            .ok_or_else(|| anyhow!("polygon '{}' missing type", self.name))?;
        if self.corners.len() != 4 {
            return Err(anyhow!(
                "polygon '{}' expected 4 corners, found {}",
                self.name,
                self.corners.len()
            ));
        }
        if let Some(expected) = self.expected_nodes {
            if expected != self.nodes.len() {
                return Err(anyhow!(
                    "polygon '{}' expected {} nodes, found {}",
                    self.name,
                    expected,
                    self.nodes.len()
                ));
            }
        }
        if kind == PolygonKind::Node && self.nodes.len() < 2 {
            return Err(anyhow!(
                "node polygon '{}' needs at least 2 nodes, found {}",
                self.name,
                self.nodes.len()
            ));
        }
        let corners = [
            self.corners[0],
            self.corners[1],
            self.corners[2],
            self.corners[3],
        ];
        Ok(PolygonDef {
            name: self.name,
            kind,
            corners,
            scale_near: self.scale_near.unwrap_or(1),
            scale_far: self.scale_far.unwrap_or(1),
            nodes: self.nodes,
        })
    }

    fn consume_line(&mut self, line: &str, lines: &mut Lines<'_>) -> Result<()> {
        if line.starts_with("type") {
            let value = line
                .split_whitespace()
                .last()
                .ok_or_else(|| anyhow!("missing polygon type value"))?;
            self.kind = Some(PolygonKind::from_str(value)?);
        } else if line.starts_with("corners:") {
            let tail = line.splitn(2, ':').nth(1).unwrap_or("").trim();
            if !tail.is_empty() {
                self.corners.extend(parse_points(tail)?);
            }
            while self.corners.len() < 4 {
                let raw = lines
                    .next()
                    .ok_or_else(|| anyhow!("unexpected EOF reading corners"))?;
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    continue;
                }
                self.corners.extend(parse_points(trimmed)?);
            }
        } else if line.starts_with("scales") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return Err(anyhow!("invalid scales line: {line}"));
            }
            self.scale_near = Some(parts[1].parse()?);
            self.scale_far = Some(parts[2].parse()?);
        } else if line.starts_with("numnodes") {
            if let Some(value) = line.split_whitespace().last() {
                self.expected_nodes = Some(value.parse()?);
            }
        } else if line.starts_with("nodes:") {
            let expected = self
                .expected_nodes
                .ok_or_else(|| anyhow!("numnodes must precede nodes block"))?;
            let target_len = self.nodes.len() + expected;
            let tail = line.splitn(2, ':').nth(1).unwrap_or("").trim();
            if !tail.is_empty() {
                self.nodes.extend(parse_points(tail)?);
            }
            while self.nodes.len() < target_len {
                let raw = lines
                    .next()
                    .ok_or_else(|| anyhow!("unexpected EOF reading nodes"))?;
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    continue;
                }
                self.nodes.extend(parse_points(trimmed)?);
            }
        }
        Ok(())
    }
}

fn parse_points(raw: &str) -> Result<Vec<(i32, i32)>> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    if parts.is_empty() || parts.len() % 2 != 0 {
        return Err(anyhow!("invalid coordinate line: {raw}"));
    }
    let mut points = Vec::with_capacity(parts.len() / 2);
    for pair in parts.chunks(2) {
        let x: i32 = pair[0].parse()?;
        let y: i32 = pair[1].parse()?;
        points.push((x, y));
    }
    Ok(points)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Scene,
    Polygons,
    Other,
}

impl Section {
    fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "scene" => Section::Scene,
            "polygons" => Section::Polygons,
            _ => Section::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "section: scene\n\tname\tcourtyard\n\tnopath\t0\n\tnoscroll\t1\n\nsection: polygons\n\tpolygon\tyard\n\ttype\tpath\n\tcorners:\t0 0\t100 0\t100 100\t0 100\n\tscales\t2 5\n\n\tpolygon\tledge\n\ttype\tnode\n\tcorners:\t100 0\t200 0\t200 100\t100 100\n\tscales\t3 3\n\tnumnodes\t3\n\tnodes:\t110 50\n\t\t150 20\n\t\t190 50\n\n\tpolygon\tcrate\n\ttype\tblock\n\tcorners:\t40 40\t60 40\t60 60\t40 60\n";

    #[test]
    fn parses_scene_header_and_polygons() {
        let scene = SceneFile::parse(SAMPLE.as_bytes()).expect("parse");
        assert_eq!(scene.name.as_deref(), Some("courtyard"));
        assert!(!scene.no_path);
        assert!(scene.no_scroll);
        assert_eq!(scene.polygons.len(), 3);

        let yard = &scene.polygons[0];
        assert_eq!(yard.kind, PolygonKind::Path);
        assert_eq!(yard.corners[2], (100, 100));
        assert_eq!((yard.scale_near, yard.scale_far), (2, 5));

        let ledge = &scene.polygons[1];
        assert_eq!(ledge.kind, PolygonKind::Node);
        assert_eq!(ledge.nodes.len(), 3);
        assert_eq!(ledge.nodes[1], (150, 20));

        let crate_poly = &scene.polygons[2];
        assert_eq!(crate_poly.kind, PolygonKind::Block);
        assert_eq!(crate_poly.scale_near, 1);
    }

    #[test]
    fn node_polygon_with_too_few_nodes_is_rejected() {
        let sample = "section: polygons\n\tpolygon\tstump\n\ttype\tnode\n\tcorners:\t0 0\t10 0\t10 10\t0 10\n\tnumnodes\t1\n\tnodes:\t5 5\n";
        let err = SceneFile::parse(sample.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("at least 2 nodes"));
    }

    #[test]
    fn node_count_mismatch_is_rejected() {
        let sample = "section: polygons\n\tpolygon\tledge\n\ttype\tnode\n\tcorners:\t0 0\t10 0\t10 10\t0 10\n\tnumnodes\t3\n\tnodes:\t1 1\t2 2\n\n\tpolygon\tnext\n\ttype\tpath\n\tcorners:\t0 0\t10 0\t10 10\t0 10\n";
        assert!(SceneFile::parse(sample.as_bytes()).is_err());
    }
}
