//! Reader and writer for 2-D float matrices in NumPy `.npy` format.
//!
//! Supports format versions 1.0 through 3.0, `f4`/`f8` in either byte
//! order, and both C and Fortran layouts. Values are widened or narrowed to
//! `f32` on load; the writer always emits `<f4` in C order.

use anyhow::{Context, Result, bail, ensure};
use regex::Regex;
use std::path::Path;

use crate::embed::Embedding;

const MAGIC: &[u8] = b"\x93NUMPY";
const HEADER_ALIGN: usize = 64;

/// Dense row-major matrix of `f32`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        ensure!(cols > 0, "matrix width must be positive");
        ensure!(
            data.len() == rows * cols,
            "matrix data has {} values, shape [{rows} x {cols}] needs {}",
            data.len(),
            rows * cols
        );
        Ok(Self { rows, cols, data })
    }

    /// Stack equally sized vectors into a matrix.
    pub fn from_rows(rows: &[Embedding]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            ensure!(
                row.len() == cols,
                "row {i} has width {}, expected {cols}",
                row.len()
            );
            data.extend_from_slice(row);
        }
        Self::new(rows.len(), cols, data)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.cols)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Dtype {
    F32,
    F64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ByteOrder {
    Little,
    Big,
}

#[derive(Debug)]
struct Header {
    dtype: Dtype,
    order: ByteOrder,
    fortran_order: bool,
    shape: (usize, usize),
}

pub fn write_matrix(path: &Path, matrix: &Matrix) -> Result<()> {
    std::fs::write(path, encode(matrix))
        .with_context(|| format!("writing matrix {}", path.display()))
}

pub fn parse(bytes: &[u8]) -> Result<Matrix> {
    ensure!(
        bytes.len() >= 10 && bytes.starts_with(MAGIC),
        "not an .npy file (bad magic)"
    );
    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            ensure!(bytes.len() >= 12, "truncated .npy header");
            (
                u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
                12,
            )
        }
        v => bail!("unsupported .npy format version {v}"),
    };
    let data_start = header_start + header_len;
    ensure!(bytes.len() >= data_start, "truncated .npy header");

    let header_text = std::str::from_utf8(&bytes[header_start..data_start])
        .context(".npy header is not valid text")?;
    let header = parse_header(header_text)?;

    let (rows, cols) = header.shape;
    let width = match header.dtype {
        Dtype::F32 => 4,
        Dtype::F64 => 8,
    };
    let payload = &bytes[data_start..];
    let expected = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(width))
        .context("matrix shape is too large")?;
    ensure!(
        payload.len() >= expected,
        "matrix payload has {} bytes, shape [{rows} x {cols}] needs {expected}",
        payload.len()
    );

    let values: Vec<f32> = payload[..expected]
        .chunks_exact(width)
        .map(|chunk| decode_value(chunk, header.dtype, header.order))
        .collect();

    let data = if header.fortran_order {
        let mut transposed = vec![0.0f32; values.len()];
        for c in 0..cols {
            for r in 0..rows {
                transposed[r * cols + c] = values[c * rows + r];
            }
        }
        transposed
    } else {
        values
    };

    Matrix::new(rows, cols, data)
}

pub fn encode(matrix: &Matrix) -> Vec<u8> {
    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        matrix.rows, matrix.cols
    );
    // Pad so the payload starts on an aligned offset; the header ends in '\n'.
    let unpadded = MAGIC.len() + 4 + header.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let mut out = Vec::with_capacity(MAGIC.len() + 4 + header.len() + matrix.data.len() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for value in &matrix.data {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

fn parse_header(text: &str) -> Result<Header> {
    let descr_re = Regex::new(r"'descr'\s*:\s*'([^']*)'")?;
    let fortran_re = Regex::new(r"'fortran_order'\s*:\s*(True|False)")?;
    let shape_re = Regex::new(r"'shape'\s*:\s*\(([^)]*)\)")?;

    let descr = descr_re
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .context(".npy header has no descr")?;
    let (order, dtype) = parse_descr(descr)?;

    let fortran_order = fortran_re
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str() == "True")
        .context(".npy header has no fortran_order")?;

    let shape_text = shape_re
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .context(".npy header has no shape")?;
    let dims = shape_text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().with_context(|| format!("bad shape entry {s:?}")))
        .collect::<Result<Vec<_>>>()?;
    let shape = match dims.as_slice() {
        [rows, cols] => (*rows, *cols),
        other => bail!("expected a 2-D matrix, found shape {other:?}"),
    };

    Ok(Header {
        dtype,
        order,
        fortran_order,
        shape,
    })
}

fn parse_descr(descr: &str) -> Result<(ByteOrder, Dtype)> {
    let (order, kind) = match descr.split_at_checked(1) {
        Some(("<", rest)) => (ByteOrder::Little, rest),
        Some((">", rest)) => (ByteOrder::Big, rest),
        Some(("=", rest)) if cfg!(target_endian = "little") => (ByteOrder::Little, rest),
        Some(("=", rest)) => (ByteOrder::Big, rest),
        _ => bail!("unsupported dtype {descr:?}"),
    };
    let dtype = match kind {
        "f4" => Dtype::F32,
        "f8" => Dtype::F64,
        _ => bail!("unsupported dtype {descr:?}, expected f4 or f8"),
    };
    Ok((order, dtype))
}

fn decode_value(chunk: &[u8], dtype: Dtype, order: ByteOrder) -> f32 {
    match (dtype, order) {
        (Dtype::F32, order) => {
            let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
            match order {
                ByteOrder::Little => f32::from_le_bytes(raw),
                ByteOrder::Big => f32::from_be_bytes(raw),
            }
        }
        (Dtype::F64, order) => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            match order {
                ByteOrder::Little => f64::from_le_bytes(raw) as f32,
                ByteOrder::Big => f64::from_be_bytes(raw) as f32,
            }
        }
    }
}
