//! Segmentation export for external viewers: a PLY coloured per leaf plus a
//! parallel NumPy label array.

use crate::ply::write_ply;
use crate::{Error, Result};
use nalgebra::Point3;
use pheno_core::{LeafRecord, PointCloud};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// 20 distinct RGB colours; leaf `id` uses entry `(id - 1) % 20`.
pub const SEGMENTATION_PALETTE: [[u8; 3]; 20] = [
    [31, 119, 180],
    [255, 127, 14],
    [44, 160, 44],
    [214, 39, 40],
    [148, 103, 189],
    [140, 86, 75],
    [227, 119, 194],
    [127, 127, 127],
    [188, 189, 34],
    [23, 190, 207],
    [57, 115, 163],
    [255, 179, 71],
    [90, 174, 97],
    [239, 65, 54],
    [175, 122, 162],
    [166, 118, 29],
    [206, 219, 156],
    [220, 220, 220],
    [255, 237, 111],
    [86, 180, 233],
];

/// Palette colour of a leaf id, as `0..1` components.
pub fn leaf_color(id: u32) -> Point3<f64> {
    let idx = (id.max(1) as usize - 1) % SEGMENTATION_PALETTE.len();
    let [r, g, b] = SEGMENTATION_PALETTE[idx];
    Point3::new(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
}

/// Write every leaf's points as one coloured PLY and their ids as a `<u2` `.npy`.
///
/// Leaves without `points` are skipped. Returns `Ok(false)` and writes nothing
/// when no leaf carries points.
pub fn write_segmentation<P: AsRef<Path>, Q: AsRef<Path>>(
    leaves: &[LeafRecord],
    ply_path: P,
    labels_path: Q,
) -> Result<bool> {
    let mut points = Vec::new();
    let mut colors = Vec::new();
    let mut labels = Vec::new();

    for leaf in leaves.iter().filter(|l| !l.points.is_empty()) {
        let id = u16::try_from(leaf.id).map_err(|_| {
            Error::InvalidData(format!("Leaf id {} does not fit a u16 label", leaf.id))
        })?;
        let color = leaf_color(leaf.id);
        points.extend_from_slice(&leaf.points);
        colors.extend(std::iter::repeat(color).take(leaf.points.len()));
        labels.extend(std::iter::repeat(id).take(leaf.points.len()));
    }

    if points.is_empty() {
        tracing::warn!("No leaf points to export");
        return Ok(false);
    }

    let cloud = PointCloud::new(points).with_colors(colors)?;
    let mut writer = BufWriter::new(File::create(ply_path.as_ref())?);
    write_ply(&mut writer, &cloud)?;
    writer.flush()?;

    let mut writer = BufWriter::new(File::create(labels_path.as_ref())?);
    write_npy_u16(&mut writer, &labels)?;
    writer.flush()?;

    tracing::info!(
        "Segmentation saved: {} ({} pts), labels {}",
        ply_path.as_ref().display(),
        cloud.len(),
        labels_path.as_ref().display()
    );
    Ok(true)
}

/// NumPy format 1.0: magic, version, header length, then a Python dict literal
/// padded so the data starts on a 64-byte boundary.
fn write_npy_u16<W: Write>(writer: &mut W, values: &[u16]) -> Result<()> {
    let dict = format!(
        "{{'descr': '<u2', 'fortran_order': False, 'shape': ({},), }}",
        values.len()
    );
    let unpadded = 10 + dict.len() + 1;
    let padding = (64 - unpadded % 64) % 64;
    let header_len = dict.len() + padding + 1;

    writer.write_all(b"\x93NUMPY\x01\x00")?;
    writer.write_all(&(header_len as u16).to_le_bytes())?;
    writer.write_all(dict.as_bytes())?;
    writer.write_all(&vec![b' '; padding])?;
    writer.write_all(b"\n")?;
    for v in values {
        writer.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}
