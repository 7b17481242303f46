/// STL file parser for binary and ASCII formats, used to load meshes
use nom::{
    bytes::complete::{tag, take},
    character::complete::{multispace0, multispace1, not_line_ending},
    combinator::opt,
    multi::{count, many0},
    number::complete::{float, le_f32, le_u16, le_u32},
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::{Result, SceneError};
use crate::geometry::{Triangle, Vector3D};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Vec<Triangle>> {
    if data.len() < HEADER_LEN + 4 {
        return Err(SceneError::MeshParse(
            "File too small to be a valid STL".to_string(),
        ));
    }
    let declared = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    if data.len() < HEADER_LEN + 4 + declared.saturating_mul(FACET_LEN) {
        return Err(SceneError::MeshParse(format!(
            "Unexpected end of file: header declares {declared} triangles"
        )));
    }

    binary_stl(data)
        .map(|(_, triangles)| triangles)
        .map_err(|e| SceneError::MeshParse(format!("Failed to parse binary STL: {e:?}")))
}

fn binary_stl(input: &[u8]) -> IResult<&[u8], Vec<Triangle>> {
    let (input, _header) = take(HEADER_LEN)(input)?;
    let (input, triangle_count) = le_u32(input)?;
    count(binary_facet, triangle_count as usize)(input)
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Triangle> {
    let (input, normal) = binary_vector(input)?;
    let (input, (v0, v1, v2)) = tuple((binary_vector, binary_vector, binary_vector))(input)?;
    // Attribute byte count, unused
    let (input, _) = le_u16(input)?;
    Ok((input, facet(v0, v1, v2, normal)))
}

fn binary_vector(input: &[u8]) -> IResult<&[u8], Vector3D> {
    let (input, (x, y, z)) = tuple((le_f32, le_f32, le_f32))(input)?;
    Ok((input, Vector3D::new(x, y, z)))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Vec<Triangle>> {
    match ascii_stl(input) {
        Ok((_, triangles)) => Ok(triangles),
        Err(e) => Err(SceneError::MeshParse(format!(
            "Failed to parse ASCII STL: {e:?}"
        ))),
    }
}

fn ascii_stl(input: &str) -> IResult<&str, Vec<Triangle>> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _name) = not_line_ending(input)?;
    let (input, triangles) = many0(ascii_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _) = opt(not_line_ending)(input)?;
    Ok((input, triangles))
}

fn ascii_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = ascii_vector(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v0) = ascii_vertex(input)?;
    let (input, v1) = ascii_vertex(input)?;
    let (input, v2) = ascii_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, facet(v0, v1, v2, normal)))
}

fn ascii_vertex(input: &str) -> IResult<&str, Vector3D> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    ascii_vector(input)
}

fn ascii_vector(input: &str) -> IResult<&str, Vector3D> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, Vector3D::new(x, y, z)))
}

/// Files often leave the stored normal zeroed; derive it from the winding then
fn facet(v0: Vector3D, v1: Vector3D, v2: Vector3D, normal: Vector3D) -> Triangle {
    if normal.length() > 0.0 {
        Triangle::with_normal(v0, v1, v2, normal)
    } else {
        Triangle::new(v0, v1, v2)
    }
}

/// Detect and parse STL data (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Vec<Triangle>> {
    // Binary files may also start with "solid", so fall back on failure
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(triangles) = parse_ascii_stl(text) {
                return Ok(triangles);
            }
        }
    }

    parse_binary_stl(data)
}
