//! PLY (Polygon File Format) I/O
//!
//! Reads the vertex element of ascii and binary PLY files. Faces and any
//! elements after the vertices are ignored.

use crate::{Error, Result, MAX_PREALLOCATED_POINTS};
use pheno_core::PointCloud;
use nalgebra::Point3;
use std::io::{BufRead, Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl Scalar {
    fn parse(name: &str) -> Result<Self> {
        Ok(match name {
            "char" | "int8" => Scalar::I8,
            "uchar" | "uint8" => Scalar::U8,
            "short" | "int16" => Scalar::I16,
            "ushort" | "uint16" => Scalar::U16,
            "int" | "int32" => Scalar::I32,
            "uint" | "uint32" => Scalar::U32,
            "float" | "float32" => Scalar::F32,
            "double" | "float64" => Scalar::F64,
            other => {
                return Err(Error::Parse(format!("Unknown PLY scalar type '{}'", other)));
            }
        })
    }

    fn size(self) -> usize {
        match self {
            Scalar::I8 | Scalar::U8 => 1,
            Scalar::I16 | Scalar::U16 => 2,
            Scalar::I32 | Scalar::U32 | Scalar::F32 => 4,
            Scalar::F64 => 8,
        }
    }

    fn decode(self, bytes: &[u8], big_endian: bool) -> f64 {
        macro_rules! num {
            ($t:ty, $n:expr) => {{
                let mut buf = [0u8; $n];
                buf.copy_from_slice(&bytes[..$n]);
                if big_endian {
                    <$t>::from_be_bytes(buf) as f64
                } else {
                    <$t>::from_le_bytes(buf) as f64
                }
            }};
        }
        match self {
            Scalar::I8 => bytes[0] as i8 as f64,
            Scalar::U8 => bytes[0] as f64,
            Scalar::I16 => num!(i16, 2),
            Scalar::U16 => num!(u16, 2),
            Scalar::I32 => num!(i32, 4),
            Scalar::U32 => num!(u32, 4),
            Scalar::F32 => num!(f32, 4),
            Scalar::F64 => num!(f64, 8),
        }
    }

    fn is_integer(self) -> bool {
        !matches!(self, Scalar::F32 | Scalar::F64)
    }
}

#[derive(Debug, Clone)]
enum Property {
    Scalar { name: String, ty: Scalar },
    List { count: Scalar, item: Scalar },
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

impl Element {
    fn fixed_row_size(&self) -> Option<usize> {
        self.properties
            .iter()
            .map(|p| match p {
                Property::Scalar { ty, .. } => Some(ty.size()),
                Property::List { .. } => None,
            })
            .sum()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| match p {
            Property::Scalar { name: n, .. } => n == name,
            Property::List { .. } => false,
        })
    }

    fn scalar_type(&self, idx: usize) -> Option<Scalar> {
        match self.properties.get(idx) {
            Some(Property::Scalar { ty, .. }) => Some(*ty),
            _ => None,
        }
    }
}

struct Header {
    encoding: Encoding,
    elements: Vec<Element>,
}

fn read_header<R: BufRead>(reader: &mut R) -> Result<Header> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim() != "ply" {
        return Err(Error::Parse("Missing 'ply' magic line".to_string()));
    }

    let mut encoding = None;
    let mut elements: Vec<Element> = Vec::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(Error::Parse("Unexpected EOF in header".to_string()));
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["end_header"] => break,
            ["format", fmt, ..] => {
                encoding = Some(match *fmt {
                    "ascii" => Encoding::Ascii,
                    "binary_little_endian" => Encoding::BinaryLittleEndian,
                    "binary_big_endian" => Encoding::BinaryBigEndian,
                    other => {
                        return Err(Error::UnsupportedFormat(format!(
                            "PLY format '{}' not supported",
                            other
                        )));
                    }
                });
            }
            ["element", name, count] => {
                let count = count
                    .parse()
                    .map_err(|_| Error::Parse(format!("Invalid element count '{}'", count)))?;
                elements.push(Element {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            ["property", "list", count, item, _name] => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| Error::Parse("Property before any element".to_string()))?;
                element.properties.push(Property::List {
                    count: Scalar::parse(count)?,
                    item: Scalar::parse(item)?,
                });
            }
            ["property", ty, name] => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| Error::Parse("Property before any element".to_string()))?;
                element.properties.push(Property::Scalar {
                    name: name.to_string(),
                    ty: Scalar::parse(ty)?,
                });
            }
            [] | ["comment", ..] | ["obj_info", ..] => {}
            _ => {
                return Err(Error::Parse(format!("Invalid header line '{}'", line.trim())));
            }
        }
    }

    let encoding = encoding.ok_or_else(|| Error::Parse("Missing format line".to_string()))?;
    Ok(Header { encoding, elements })
}

/// Where the coordinate and colour columns live in a vertex row.
struct VertexLayout {
    xyz: [usize; 3],
    rgb: Option<([usize; 3], bool)>,
}

impl VertexLayout {
    fn from_element(vertex: &Element) -> Result<Self> {
        let find = |name: &str| {
            vertex
                .position(name)
                .ok_or_else(|| Error::InvalidData(format!("Vertex property '{}' missing", name)))
        };
        let xyz = [find("x")?, find("y")?, find("z")?];
        let rgb = match (
            vertex.position("red"),
            vertex.position("green"),
            vertex.position("blue"),
        ) {
            (Some(r), Some(g), Some(b)) => {
                let integer = vertex.scalar_type(r).map(Scalar::is_integer).unwrap_or(true);
                Some(([r, g, b], integer))
            }
            _ => None,
        };
        Ok(Self { xyz, rgb })
    }

    fn point(&self, row: &[f64]) -> Point3<f64> {
        Point3::new(row[self.xyz[0]], row[self.xyz[1]], row[self.xyz[2]])
    }

    fn color(&self, row: &[f64]) -> Option<Point3<f64>> {
        self.rgb.map(|([r, g, b], integer)| {
            let s = if integer { 1.0 / 255.0 } else { 1.0 };
            Point3::new(row[r] * s, row[g] * s, row[b] * s)
        })
    }
}

/// Read a PLY file from a reader
pub fn read_ply<R: BufRead>(mut reader: R) -> Result<PointCloud> {
    let header = read_header(&mut reader)?;
    let vertex_pos = header
        .elements
        .iter()
        .position(|e| e.name == "vertex")
        .ok_or_else(|| Error::InvalidData("PLY has no vertex element".to_string()))?;
    let vertex = &header.elements[vertex_pos];
    let layout = VertexLayout::from_element(vertex)?;

    let capacity = vertex.count.min(MAX_PREALLOCATED_POINTS);
    let mut points = Vec::with_capacity(capacity);
    let mut colors = layout.rgb.map(|_| Vec::with_capacity(capacity));

    match header.encoding {
        Encoding::Ascii => {
            let mut lines = reader.lines();
            for skipped in &header.elements[..vertex_pos] {
                for _ in 0..skipped.count {
                    lines
                        .next()
                        .ok_or_else(|| Error::Parse("Unexpected EOF in data".to_string()))??;
                }
            }
            for _ in 0..vertex.count {
                let line = lines
                    .next()
                    .ok_or_else(|| Error::Parse("Unexpected EOF in data".to_string()))??;
                let row: Vec<f64> = line
                    .split_whitespace()
                    .map(|s| {
                        s.parse()
                            .map_err(|_| Error::Parse(format!("Invalid number: {}", s)))
                    })
                    .collect::<Result<Vec<_>>>()?;
                if row.len() < vertex.properties.len() {
                    return Err(Error::InvalidData(
                        "Not enough values for vertex".to_string(),
                    ));
                }
                points.push(layout.point(&row));
                if let (Some(c), Some(color)) = (colors.as_mut(), layout.color(&row)) {
                    c.push(color);
                }
            }
        }
        Encoding::BinaryLittleEndian | Encoding::BinaryBigEndian => {
            let big_endian = header.encoding == Encoding::BinaryBigEndian;
            for skipped in &header.elements[..vertex_pos] {
                let size = skipped.fixed_row_size().ok_or_else(|| {
                    Error::UnsupportedFormat(format!(
                        "Cannot skip list element '{}' before vertices",
                        skipped.name
                    ))
                })?;
                let bytes = size
                    .checked_mul(skipped.count)
                    .and_then(|b| u64::try_from(b).ok())
                    .ok_or_else(|| {
                        Error::InvalidData(format!(
                            "Element '{}' size overflows: {} rows of {} bytes",
                            skipped.name, skipped.count, size
                        ))
                    })?;
                let copied =
                    std::io::copy(&mut reader.by_ref().take(bytes), &mut std::io::sink())?;
                if copied < bytes {
                    return Err(Error::Parse("Unexpected EOF in binary data".to_string()));
                }
            }
            let row_size = vertex.fixed_row_size().ok_or_else(|| {
                Error::UnsupportedFormat("List properties on vertices".to_string())
            })?;
            let mut buf = vec![0u8; row_size];
            let mut row = vec![0.0; vertex.properties.len()];
            for _ in 0..vertex.count {
                reader.read_exact(&mut buf).map_err(truncated)?;
                let mut offset = 0;
                for (slot, prop) in row.iter_mut().zip(&vertex.properties) {
                    if let Property::Scalar { ty, .. } = prop {
                        *slot = ty.decode(&buf[offset..], big_endian);
                        offset += ty.size();
                    }
                }
                points.push(layout.point(&row));
                if let (Some(c), Some(color)) = (colors.as_mut(), layout.color(&row)) {
                    c.push(color);
                }
            }
        }
    }

    let cloud = PointCloud::new(points);
    match colors {
        Some(c) => cloud.with_colors(c),
        None => Ok(cloud),
    }
}

fn truncated(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::Parse("Unexpected EOF in binary data".to_string())
    } else {
        Error::Io(e)
    }
}

/// Write a point cloud to ascii PLY, coordinates as doubles and colours as bytes.
pub fn write_ply<W: Write>(writer: &mut W, cloud: &PointCloud) -> Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", cloud.len())?;
    writeln!(writer, "property double x")?;
    writeln!(writer, "property double y")?;
    writeln!(writer, "property double z")?;
    if cloud.colors.is_some() {
        writeln!(writer, "property uchar red")?;
        writeln!(writer, "property uchar green")?;
        writeln!(writer, "property uchar blue")?;
    }
    writeln!(writer, "end_header")?;

    for (i, p) in cloud.points.iter().enumerate() {
        write!(writer, "{} {} {}", p.x, p.y, p.z)?;
        if let Some(ref colors) = cloud.colors {
            let c = colors[i];
            let r = (c.x.clamp(0.0, 1.0) * 255.0).round() as u8;
            let g = (c.y.clamp(0.0, 1.0) * 255.0).round() as u8;
            let b = (c.z.clamp(0.0, 1.0) * 255.0).round() as u8;
            write!(writer, " {} {} {}", r, g, b)?;
        }
        writeln!(writer)?;
    }

    Ok(())
}
