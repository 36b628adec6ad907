//! Conversion between [`GeometryValue`] and GML geometry elements.
//!
//! Coordinates are written as fixed-point numbers with three decimals, then
//! trailing zeros and a trailing decimal point are stripped, so `123.000`
//! becomes `123` and `123.500` becomes `123.5`.

use std::io::Write;

use roxmltree::Node;

use crate::error::{GmlError, Result};
use crate::model::{Coord, GeometryValue};
use crate::writer::{GmlWriter, GML_NS, SRS_DIMENSION, SRS_NAME};

pub fn format_coord(value: f64) -> String {
    let fixed = format!("{:.3}", value);
    if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        fixed
    }
}

pub fn format_position((x, y): Coord) -> String {
    format!("{} {}", format_coord(x), format_coord(y))
}

pub fn format_pos_list(points: &[Coord]) -> String {
    points
        .iter()
        .map(|p| format_position(*p))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a whitespace separated `x y x y ...` list.
pub fn parse_pos_list(text: &str) -> Result<Vec<Coord>> {
    let values = text
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| GmlError::document(format!("invalid coordinate '{}'", token)))
        })
        .collect::<Result<Vec<f64>>>()?;

    if values.len() % 2 != 0 {
        return Err(GmlError::document(format!(
            "odd number of coordinate values ({}) in a 2D position list",
            values.len()
        )));
    }

    Ok(values.chunks_exact(2).map(|c| (c[0], c[1])).collect())
}

/// Writes the GML element for `geometry` (without the enclosing property element).
pub fn encode_geometry<W: Write>(out: &mut GmlWriter<W>, geometry: &GeometryValue) -> Result<()> {
    let srs = [("srsDimension", SRS_DIMENSION), ("srsName", SRS_NAME)];

    match geometry {
        GeometryValue::Point(p) => {
            out.start("gml:Point", &srs)?;
            out.text_element("gml:pos", &[], Some(&format_position(*p)))?;
            out.end("gml:Point")
        }
        GeometryValue::LineString(points) => {
            out.start("gml:LineString", &srs)?;
            out.text_element("gml:posList", &[], Some(&format_pos_list(points)))?;
            out.end("gml:LineString")
        }
        GeometryValue::Polygon(rings) => {
            if rings.is_empty() {
                return Err(GmlError::document("polygon without rings"));
            }
            out.start("gml:Polygon", &srs)?;
            for (index, ring) in rings.iter().enumerate() {
                let boundary = if index == 0 {
                    "gml:exterior"
                } else {
                    "gml:interior"
                };
                out.start(boundary, &[])?;
                out.start("gml:LinearRing", &[("srsDimension", SRS_DIMENSION)])?;
                out.text_element("gml:posList", &[], Some(&format_pos_list(ring)))?;
                out.end("gml:LinearRing")?;
                out.end(boundary)?;
            }
            out.end("gml:Polygon")
        }
    }
}

/// Encodes a single geometry into a standalone XML fragment.
pub fn encode_to_string(geometry: &GeometryValue) -> Result<String> {
    let mut out = GmlWriter::fragment(Vec::new());
    out.start("gml:geometry", &[("xmlns:gml", GML_NS)])?;
    encode_geometry(&mut out, geometry)?;
    out.end("gml:geometry")?;
    String::from_utf8(out.into_inner())
        .map_err(|e| GmlError::document(format!("encoded geometry is not UTF-8: {}", e)))
}

/// Reads a `gml:Point`, `gml:LineString` or `gml:Polygon` element.
pub fn decode_geometry(node: Node) -> Result<GeometryValue> {
    let name = node.tag_name().name();
    if node.tag_name().namespace() != Some(GML_NS) {
        return Err(GmlError::UnsupportedGeometryType(name.to_string()));
    }
    check_dimension(node)?;

    match name {
        "Point" => {
            let pos = gml_child(node, "pos")?;
            match parse_pos_list(pos.text().unwrap_or(""))?.as_slice() {
                [point] => Ok(GeometryValue::Point(*point)),
                other => Err(GmlError::document(format!(
                    "gml:pos must hold exactly one position, found {}",
                    other.len()
                ))),
            }
        }
        "LineString" => Ok(GeometryValue::LineString(read_positions(node)?)),
        "Polygon" => {
            let mut rings = Vec::new();
            for (index, boundary) in gml_children(node).enumerate() {
                let expected = if index == 0 { "exterior" } else { "interior" };
                if boundary.tag_name().name() != expected {
                    return Err(GmlError::document(format!(
                        "unexpected gml:{} at ring {} of a polygon",
                        boundary.tag_name().name(),
                        index
                    )));
                }
                let ring = gml_child(boundary, "LinearRing")?;
                check_dimension(ring)?;
                let points = read_positions(ring)?;
                check_ring(&points, index)?;
                rings.push(points);
            }
            if rings.is_empty() {
                return Err(GmlError::document("polygon without gml:exterior"));
            }
            Ok(GeometryValue::Polygon(rings))
        }
        other => Err(GmlError::UnsupportedGeometryType(format!("gml:{}", other))),
    }
}

/// Positions of a line or ring, given either as one `gml:posList` or as `gml:pos` children.
fn read_positions(node: Node) -> Result<Vec<Coord>> {
    if let Ok(pos_list) = gml_child(node, "posList") {
        return parse_pos_list(pos_list.text().unwrap_or(""));
    }
    let mut points = Vec::new();
    for pos in gml_children(node).filter(|n| n.tag_name().name() == "pos") {
        points.extend(parse_pos_list(pos.text().unwrap_or(""))?);
    }
    Ok(points)
}

/// A ring needs at least four positions and must end where it starts.
fn check_ring(points: &[Coord], index: usize) -> Result<()> {
    if points.len() < 4 {
        return Err(GmlError::document(format!(
            "ring {} has {} positions, at least 4 are required",
            index,
            points.len()
        )));
    }
    if points.first() != points.last() {
        return Err(GmlError::document(format!("ring {} is not closed", index)));
    }
    Ok(())
}

fn check_dimension(node: Node) -> Result<()> {
    match node.attribute("srsDimension") {
        None | Some(SRS_DIMENSION) => Ok(()),
        Some(other) => Err(GmlError::document(format!(
            "only 2D coordinates are supported, found srsDimension={}",
            other
        ))),
    }
}

fn gml_children<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(|n| n.is_element() && n.tag_name().namespace() == Some(GML_NS))
}

fn gml_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Result<Node<'a, 'input>> {
    gml_children(node)
        .find(|n| n.tag_name().name() == name)
        .ok_or_else(|| {
            GmlError::document(format!(
                "gml:{} is missing from gml:{}",
                name,
                node.tag_name().name()
            ))
        })
}
