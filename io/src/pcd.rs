//! PCD (Point Cloud Data) I/O
//!
//! PCD is the native format for Point Cloud Library (PCL). Ascii and
//! uncompressed binary bodies are supported.

use crate::{Error, Result, MAX_PREALLOCATED_POINTS};
use nalgebra::Point3;
use pheno_core::PointCloud;
use std::io::{BufRead, Read, Write};

/// PCD data format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcdData {
    Ascii,
    Binary,
    BinaryCompressed,
}

/// One scalar column of a PCD record. Fields with `COUNT > 1` expand to
/// several columns; only the first keeps the field name.
#[derive(Debug, Clone)]
struct Column {
    name: String,
    kind: char,
    size: usize,
}

impl Column {
    fn decode(&self, bytes: &[u8]) -> Result<f64> {
        macro_rules! le {
            ($t:ty, $n:expr) => {{
                let mut buf = [0u8; $n];
                buf.copy_from_slice(&bytes[..$n]);
                <$t>::from_le_bytes(buf) as f64
            }};
        }
        Ok(match (self.kind, self.size) {
            ('F', 4) => le!(f32, 4),
            ('F', 8) => le!(f64, 8),
            ('U', 1) => bytes[0] as f64,
            ('U', 2) => le!(u16, 2),
            ('U', 4) => le!(u32, 4),
            ('U', 8) => le!(u64, 8),
            ('I', 1) => bytes[0] as i8 as f64,
            ('I', 2) => le!(i16, 2),
            ('I', 4) => le!(i32, 4),
            ('I', 8) => le!(i64, 8),
            (k, s) => {
                return Err(Error::UnsupportedFormat(format!(
                    "PCD field '{}' has type {}{}",
                    self.name, k, s
                )));
            }
        })
    }
}

#[derive(Debug)]
struct Header {
    columns: Vec<Column>,
    points: usize,
    data: PcdData,
}

impl Header {
    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    fn record_size(&self) -> usize {
        self.columns.iter().map(|c| c.size).sum()
    }
}

/// Values per record beyond this are treated as a corrupt header.
const MAX_COLUMNS: usize = 1 << 16;

fn read_header<R: BufRead>(reader: &mut R) -> Result<Header> {
    let mut fields: Vec<String> = Vec::new();
    let mut sizes: Vec<usize> = Vec::new();
    let mut types: Vec<char> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    let mut width = 0usize;
    let mut height = 1usize;
    let mut points = None;
    let mut line = String::new();

    let data = loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(Error::Parse("Unexpected EOF in header".to_string()));
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&key, values)) = parts.split_first() else {
            continue;
        };
        if key.starts_with('#') {
            continue;
        }

        let numbers = |what: &str| -> Result<Vec<usize>> {
            values
                .iter()
                .map(|s| {
                    s.parse()
                        .map_err(|_| Error::Parse(format!("Invalid {} value '{}'", what, s)))
                })
                .collect()
        };

        match key {
            "VERSION" | "VIEWPOINT" => {}
            "FIELDS" => fields = values.iter().map(|s| s.to_string()).collect(),
            "SIZE" => sizes = numbers("SIZE")?,
            "TYPE" => types = values.iter().filter_map(|s| s.chars().next()).collect(),
            "COUNT" => counts = numbers("COUNT")?,
            "WIDTH" => width = numbers("WIDTH")?.first().copied().unwrap_or(0),
            "HEIGHT" => height = numbers("HEIGHT")?.first().copied().unwrap_or(1),
            "POINTS" => points = numbers("POINTS")?.first().copied(),
            "DATA" => {
                break match values.first().copied() {
                    Some("ascii") => PcdData::Ascii,
                    Some("binary") => PcdData::Binary,
                    Some("binary_compressed") => PcdData::BinaryCompressed,
                    other => {
                        return Err(Error::Parse(format!("Unknown PCD DATA kind {:?}", other)));
                    }
                };
            }
            other => return Err(Error::Parse(format!("Unknown PCD header key '{}'", other))),
        }
    };

    if counts.is_empty() {
        counts = vec![1; fields.len()];
    }
    if sizes.len() != fields.len() || types.len() != fields.len() || counts.len() != fields.len()
    {
        return Err(Error::Parse(
            "PCD FIELDS, SIZE, TYPE and COUNT lengths differ".to_string(),
        ));
    }

    let total_columns = counts
        .iter()
        .try_fold(0usize, |acc, &c| acc.checked_add(c))
        .filter(|&total| total <= MAX_COLUMNS)
        .ok_or_else(|| {
            Error::InvalidData(format!("PCD COUNT declares more than {} values", MAX_COLUMNS))
        })?;

    let mut columns = Vec::with_capacity(total_columns);
    for (i, field) in fields.iter().enumerate() {
        for j in 0..counts[i] {
            columns.push(Column {
                name: if j == 0 { field.clone() } else { String::new() },
                kind: types[i],
                size: sizes[i],
            });
        }
    }

    let points = match points {
        Some(p) => p,
        None => width.checked_mul(height).ok_or_else(|| {
            Error::InvalidData(format!("PCD WIDTH {} x HEIGHT {} overflows", width, height))
        })?,
    };

    Ok(Header {
        columns,
        points,
        data,
    })
}

/// Column positions of the values the reader keeps.
struct Layout {
    xyz: [usize; 3],
    rgb: Option<RgbColumns>,
}

enum RgbColumns {
    /// PCL packs 8-bit RGB into the bits of one float (or uint) column.
    Packed { idx: usize, float_bits: bool },
    Separate([usize; 3]),
}

impl Layout {
    fn new(header: &Header) -> Result<Self> {
        let find = |name: &str| {
            header
                .column(name)
                .ok_or_else(|| Error::InvalidData(format!("PCD field '{}' missing", name)))
        };
        let xyz = [find("x")?, find("y")?, find("z")?];
        let rgb = if let Some(idx) = header.column("rgb").or_else(|| header.column("rgba")) {
            Some(RgbColumns::Packed {
                idx,
                float_bits: header.columns[idx].kind == 'F',
            })
        } else {
            match (header.column("r"), header.column("g"), header.column("b")) {
                (Some(r), Some(g), Some(b)) => Some(RgbColumns::Separate([r, g, b])),
                _ => None,
            }
        };
        Ok(Self { xyz, rgb })
    }

    fn point(&self, row: &[f64]) -> Point3<f64> {
        Point3::new(row[self.xyz[0]], row[self.xyz[1]], row[self.xyz[2]])
    }

    fn color(&self, row: &[f64]) -> Option<Point3<f64>> {
        match self.rgb.as_ref()? {
            RgbColumns::Packed { idx, float_bits } => {
                let packed = if *float_bits {
                    (row[*idx] as f32).to_bits()
                } else {
                    row[*idx] as u32
                };
                let r = ((packed >> 16) & 0xFF) as f64 / 255.0;
                let g = ((packed >> 8) & 0xFF) as f64 / 255.0;
                let b = (packed & 0xFF) as f64 / 255.0;
                Some(Point3::new(r, g, b))
            }
            RgbColumns::Separate([r, g, b]) => {
                let norm = |v: f64| if v > 1.0 { v / 255.0 } else { v };
                Some(Point3::new(norm(row[*r]), norm(row[*g]), norm(row[*b])))
            }
        }
    }
}

/// Read a PCD file
pub fn read_pcd<R: BufRead>(mut reader: R) -> Result<PointCloud> {
    let header = read_header(&mut reader)?;
    let layout = Layout::new(&header)?;
    let n = header.points;

    let capacity = n.min(MAX_PREALLOCATED_POINTS);
    let mut points = Vec::with_capacity(capacity);
    let mut colors = layout.rgb.as_ref().map(|_| Vec::with_capacity(capacity));
    let mut push = |row: &[f64]| {
        points.push(layout.point(row));
        if let (Some(c), Some(color)) = (colors.as_mut(), layout.color(row)) {
            c.push(color);
        }
    };

    match header.data {
        PcdData::Ascii => {
            let mut parsed = 0;
            for line in reader.lines() {
                if parsed == n {
                    break;
                }
                let line = line?;
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let row: Vec<f64> = line
                    .split_whitespace()
                    .map(|s| {
                        s.parse()
                            .map_err(|_| Error::Parse(format!("Invalid number: {}", s)))
                    })
                    .collect::<Result<Vec<_>>>()?;
                if row.len() < header.columns.len() {
                    return Err(Error::InvalidData(format!(
                        "PCD row has {} values, expected {}",
                        row.len(),
                        header.columns.len()
                    )));
                }
                push(&row);
                parsed += 1;
            }
            if parsed < n {
                return Err(Error::Parse(format!(
                    "PCD body has {} points, header declares {}",
                    parsed, n
                )));
            }
        }
        PcdData::Binary => {
            let mut buf = vec![0u8; header.record_size()];
            let mut row = vec![0.0; header.columns.len()];
            for _ in 0..n {
                reader.read_exact(&mut buf).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::UnexpectedEof {
                        Error::Parse("Unexpected EOF in binary data".to_string())
                    } else {
                        Error::Io(e)
                    }
                })?;
                let mut offset = 0;
                for (slot, column) in row.iter_mut().zip(&header.columns) {
                    *slot = column.decode(&buf[offset..])?;
                    offset += column.size;
                }
                push(&row);
            }
        }
        PcdData::BinaryCompressed => {
            return Err(Error::UnsupportedFormat(
                "Binary compressed PCD not supported".to_string(),
            ));
        }
    }

    let cloud = PointCloud::new(points);
    match colors {
        Some(c) => cloud.with_colors(c),
        None => Ok(cloud),
    }
}

/// Write point cloud to PCD format (ASCII)
pub fn write_pcd<W: Write>(writer: &mut W, cloud: &PointCloud) -> Result<()> {
    let num_points = cloud.len();
    let has_colors = cloud.colors.is_some();

    writeln!(writer, "# .PCD v0.7 - Point Cloud Data file format")?;
    writeln!(writer, "VERSION 0.7")?;
    if has_colors {
        writeln!(writer, "FIELDS x y z rgb")?;
        writeln!(writer, "SIZE 8 8 8 4")?;
        writeln!(writer, "TYPE F F F U")?;
        writeln!(writer, "COUNT 1 1 1 1")?;
    } else {
        writeln!(writer, "FIELDS x y z")?;
        writeln!(writer, "SIZE 8 8 8")?;
        writeln!(writer, "TYPE F F F")?;
        writeln!(writer, "COUNT 1 1 1")?;
    }
    writeln!(writer, "WIDTH {}", num_points)?;
    writeln!(writer, "HEIGHT 1")?;
    writeln!(writer, "VIEWPOINT 0 0 0 1 0 0 0")?;
    writeln!(writer, "POINTS {}", num_points)?;
    writeln!(writer, "DATA ascii")?;

    for (i, p) in cloud.points.iter().enumerate() {
        write!(writer, "{} {} {}", p.x, p.y, p.z)?;
        if let Some(ref colors) = cloud.colors {
            let c = colors[i];
            let r = (c.x.clamp(0.0, 1.0) * 255.0).round() as u32;
            let g = (c.y.clamp(0.0, 1.0) * 255.0).round() as u32;
            let b = (c.z.clamp(0.0, 1.0) * 255.0).round() as u32;
            write!(writer, " {}", (r << 16) | (g << 8) | b)?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_ascii_without_points_line() {
        let data = "# comment\nVERSION 0.7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\n\
                    COUNT 1 1 1\nWIDTH 2\nHEIGHT 1\nDATA ascii\n1 2 3\n4 5 6\n";
        let cloud = read_pcd(Cursor::new(data)).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points[1], Point3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_binary_with_packed_float_rgb() {
        let header = "VERSION 0.7\nFIELDS x y z rgb\nSIZE 4 4 4 4\nTYPE F F F F\n\
                      COUNT 1 1 1 1\nWIDTH 1\nHEIGHT 1\nPOINTS 1\nDATA binary\n";
        let mut data = header.as_bytes().to_vec();
        for v in [0.5f32, 1.0, -2.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let packed: u32 = 255 << 16;
        data.extend_from_slice(&f32::from_bits(packed).to_le_bytes());

        let cloud = read_pcd(Cursor::new(data)).unwrap();
        assert_eq!(cloud.points[0], Point3::new(0.5, 1.0, -2.0));
        let c = cloud.colors.unwrap()[0];
        assert!((c.x - 1.0).abs() < 1e-12);
        assert_eq!(c.y, 0.0);
    }

    #[test]
    fn test_binary_skips_multi_count_fields() {
        let header = "FIELDS x y z hist\nSIZE 8 8 8 1\nTYPE F F F U\nCOUNT 1 1 1 3\n\
                      WIDTH 1\nHEIGHT 1\nPOINTS 1\nDATA binary\n";
        let mut data = header.as_bytes().to_vec();
        for v in [1.0f64, 2.0, 3.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&[9, 9, 9]);
        let cloud = read_pcd(Cursor::new(data)).unwrap();
        assert_eq!(cloud.points[0], Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_short_ascii_body_is_error() {
        let data = "FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nPOINTS 3\nDATA ascii\n1 2 3\n";
        assert!(read_pcd(Cursor::new(data)).is_err());
    }

    #[test]
    fn test_oversized_point_count_is_error() {
        let header = "FIELDS x y z rgb\nSIZE 4 4 4 4\nTYPE F F F F\nCOUNT 1 1 1 1\n\
                      WIDTH 100000000000000\nHEIGHT 1\nPOINTS 100000000000000\nDATA binary\n";
        let mut data = header.as_bytes().to_vec();
        data.extend_from_slice(&[0u8; 32]);
        let err = read_pcd(Cursor::new(data)).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));

        let data = "FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nPOINTS 100000000000000\n\
                    DATA ascii\n1 2 3\n";
        assert!(read_pcd(Cursor::new(data)).is_err());
    }

    #[test]
    fn test_overflowing_header_sizes_are_errors() {
        let data = "FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 18446744073709551615\n\
                    HEIGHT 2\nDATA ascii\n1 2 3\n";
        let err = read_pcd(Cursor::new(data)).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));

        let data = "FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nCOUNT 1 1 18446744073709551615\n\
                    POINTS 1\nDATA ascii\n1 2 3\n";
        let err = read_pcd(Cursor::new(data)).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_compressed_is_unsupported() {
        let data = "FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nPOINTS 1\nDATA binary_compressed\n";
        let err = read_pcd(Cursor::new(data)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_write_then_read_keeps_colors() {
        let cloud = PointCloud::new(vec![Point3::new(0.1, 0.2, 0.3)])
            .with_colors(vec![Point3::new(0.0, 1.0, 0.0)])
            .unwrap();
        let mut buf = Vec::new();
        write_pcd(&mut buf, &cloud).unwrap();
        let back = read_pcd(Cursor::new(buf)).unwrap();
        assert_eq!(back.points, cloud.points);
        let c = back.colors.unwrap()[0];
        assert!((c.y - 1.0).abs() < 1e-12);
    }
}
