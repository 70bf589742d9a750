// crates/vessel-core/src/io.rs

//! Volume read/write with extension-based auto-detection.
//!
//! Supported formats:
//! - **`.json`**: serde (pretty, human-inspectable)
//! - **`.cbor`**: serde via `ciborium` (compact)
//! - **`.mha`**: MetaImage with a LOCAL payload (the single-file layout
//!   medical imaging tool chains exchange); both byte orders are read,
//!   little-endian is written.
//!
//! Unknown extensions are rejected for reads; for writes,
//! [`resolve_output_path`] appends `.mha` so a bare output name still lands
//! in a recognized format.

use crate::volume::{Dim, MaskVolume, ScalarVolume, Spacing};
use anyhow::{anyhow, bail, Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Pixel representation used for the MetaImage payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelKind {
    /// `MET_UCHAR`
    U8,
    /// `MET_SHORT`
    I16,
    /// `MET_USHORT`
    U16,
    /// `MET_UINT`
    U32,
    /// `MET_FLOAT`
    F32,
    /// `MET_DOUBLE`
    F64,
}

impl PixelKind {
    fn met_name(self) -> &'static str {
        match self {
            Self::U8 => "MET_UCHAR",
            Self::I16 => "MET_SHORT",
            Self::U16 => "MET_USHORT",
            Self::U32 => "MET_UINT",
            Self::F32 => "MET_FLOAT",
            Self::F64 => "MET_DOUBLE",
        }
    }

    fn byte_width(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    fn from_met_name(name: &str) -> Result<Self> {
        Ok(match name {
            "MET_UCHAR" | "MET_CHAR" => Self::U8,
            "MET_SHORT" => Self::I16,
            "MET_USHORT" => Self::U16,
            "MET_UINT" | "MET_INT" => Self::U32,
            "MET_FLOAT" => Self::F32,
            "MET_DOUBLE" => Self::F64,
            other => bail!("unsupported MetaImage ElementType: {other}"),
        })
    }
}

/// Append `.mha` when the path has no extension the writer recognizes.
#[must_use]
pub fn resolve_output_path(path: &Path) -> PathBuf {
    match ext_lower(path).as_deref() {
        Some("json" | "cbor" | "mha") => path.to_path_buf(),
        _ => {
            let mut s = path.as_os_str().to_owned();
            s.push(".mha");
            PathBuf::from(s)
        }
    }
}

/// ------------------------------
/// ScalarVolume I/O
/// ------------------------------

/// Read a [`ScalarVolume`], auto-detecting the format from the extension.
pub fn read_scalar_volume_auto<P: AsRef<Path>>(path: P) -> Result<ScalarVolume> {
    let path = path.as_ref();
    match ext_lower(path).as_deref() {
        Some("json") => {
            let f = File::open(path).with_context(|| format!("open {}", display(path)))?;
            serde_json::from_reader(BufReader::new(f)).context("deserialize JSON volume")
        }
        Some("cbor") => {
            let f = File::open(path).with_context(|| format!("open {}", display(path)))?;
            ciborium::de::from_reader(&mut BufReader::new(f)).context("deserialize CBOR volume")
        }
        Some("mha") => read_mha(path),
        Some(other) => Err(anyhow!(
            "unsupported volume extension: {other} (supported: .json, .cbor, .mha)"
        )),
        None => Err(anyhow!("path has no extension (expected .json, .cbor, or .mha)")),
    }
}

/// Write a [`ScalarVolume`] as `f64` samples, auto-detecting the format.
pub fn write_scalar_volume_auto<P: AsRef<Path>>(path: P, v: &ScalarVolume) -> Result<()> {
    write_scalar_volume_auto_as(path, v, PixelKind::F64)
}

/// Write a [`ScalarVolume`]; `kind` selects the MetaImage element type
/// (values are clamp-cast). JSON/CBOR always persist the `f64` samples.
pub fn write_scalar_volume_auto_as<P: AsRef<Path>>(
    path: P,
    v: &ScalarVolume,
    kind: PixelKind,
) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    match ext_lower(path).as_deref() {
        Some("json") => {
            let f = File::create(path).with_context(|| format!("create {}", display(path)))?;
            serde_json::to_writer_pretty(BufWriter::new(f), v).context("serialize JSON volume")
        }
        Some("cbor") => {
            let f = File::create(path).with_context(|| format!("create {}", display(path)))?;
            ciborium::ser::into_writer(v, &mut BufWriter::new(f)).context("serialize CBOR volume")
        }
        Some("mha") => write_mha(path, v, kind),
        _ => Err(anyhow!(
            "unsupported output extension for {} (call resolve_output_path first)",
            display(path)
        )),
    }
}

/// ------------------------------
/// MaskVolume I/O
/// ------------------------------

/// Read a [`MaskVolume`]; MetaImage payloads are binarized (non-zero -> 1).
pub fn read_mask_volume_auto<P: AsRef<Path>>(path: P) -> Result<MaskVolume> {
    let path = path.as_ref();
    match ext_lower(path).as_deref() {
        Some("json") => {
            let f = File::open(path).with_context(|| format!("open {}", display(path)))?;
            serde_json::from_reader(BufReader::new(f)).context("deserialize JSON mask")
        }
        Some("cbor") => {
            let f = File::open(path).with_context(|| format!("open {}", display(path)))?;
            ciborium::de::from_reader(&mut BufReader::new(f)).context("deserialize CBOR mask")
        }
        Some("mha") => {
            let v = read_mha(path)?;
            let data = v.as_slice().iter().map(|&x| u8::from(x != 0.0)).collect();
            MaskVolume::from_vec(v.dim(), data).map_err(|e| anyhow!(e))
        }
        Some(other) => Err(anyhow!(
            "unsupported mask extension: {other} (supported: .json, .cbor, .mha)"
        )),
        None => Err(anyhow!("path has no extension (expected .json, .cbor, or .mha)")),
    }
}

/// Write a [`MaskVolume`] (MetaImage payload is `MET_UCHAR`).
pub fn write_mask_volume_auto<P: AsRef<Path>>(path: P, m: &MaskVolume) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    match ext_lower(path).as_deref() {
        Some("json") => {
            let f = File::create(path).with_context(|| format!("create {}", display(path)))?;
            serde_json::to_writer_pretty(BufWriter::new(f), m).context("serialize JSON mask")
        }
        Some("cbor") => {
            let f = File::create(path).with_context(|| format!("create {}", display(path)))?;
            ciborium::ser::into_writer(m, &mut BufWriter::new(f)).context("serialize CBOR mask")
        }
        Some("mha") => {
            let data: Vec<f64> = m.as_slice().iter().map(|&b| f64::from(b)).collect();
            let v = ScalarVolume::from_vec(m.dim(), (1.0, 1.0, 1.0), data)
                .map_err(|e| anyhow!(e))?;
            write_mha(path, &v, PixelKind::U8)
        }
        _ => Err(anyhow!(
            "unsupported output extension for {} (call resolve_output_path first)",
            display(path)
        )),
    }
}

/// ------------------------------
/// MetaImage codec (LOCAL payload only)
/// ------------------------------

fn read_mha(path: &Path) -> Result<ScalarVolume> {
    let bytes = fs::read(path).with_context(|| format!("read {}", display(path)))?;

    // Header is ASCII "Key = Value" lines; the payload starts right after the
    // newline terminating the ElementDataFile line.
    let mut dim: Option<Dim> = None;
    let mut spacing: Spacing = (1.0, 1.0, 1.0);
    let mut kind: Option<PixelKind> = None;
    let mut big_endian = false;
    let mut payload_start: Option<usize> = None;

    let mut line_start = 0usize;
    while line_start < bytes.len() {
        let line_end = bytes[line_start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |p| line_start + p);
        let line = std::str::from_utf8(&bytes[line_start..line_end])
            .context("MetaImage header is not ASCII")?
            .trim();

        let Some((key, value)) = line.split_once('=') else {
            bail!("malformed MetaImage header line: {line:?}");
        };
        let (key, value) = (key.trim(), value.trim());
        match key {
            "ObjectType" => {
                if value != "Image" {
                    bail!("unsupported MetaImage ObjectType: {value}");
                }
            }
            "NDims" => {
                if value != "3" {
                    bail!("only 3D MetaImage volumes are supported, got NDims = {value}");
                }
            }
            "DimSize" => {
                let d = parse_triplet::<usize>(value).context("parse DimSize")?;
                dim = Some((d[0], d[1], d[2]));
            }
            "ElementSpacing" => {
                let s = parse_triplet::<f64>(value).context("parse ElementSpacing")?;
                spacing = (s[0], s[1], s[2]);
            }
            "ElementType" => kind = Some(PixelKind::from_met_name(value)?),
            "ElementByteOrderMSB" | "BinaryDataByteOrderMSB" => {
                big_endian = value.eq_ignore_ascii_case("true");
            }
            "CompressedData" => {
                if value.eq_ignore_ascii_case("true") {
                    bail!("compressed MetaImage payloads are not supported");
                }
            }
            "ElementDataFile" => {
                if value != "LOCAL" {
                    bail!("only LOCAL MetaImage payloads are supported, got {value}");
                }
                payload_start = Some((line_end + 1).min(bytes.len()));
            }
            // BinaryData, Offset, TransformMatrix, ... are accepted and ignored.
            _ => {}
        }
        if payload_start.is_some() {
            break;
        }
        line_start = line_end + 1;
    }

    let dim = dim.ok_or_else(|| anyhow!("MetaImage header is missing DimSize"))?;
    let kind = kind.ok_or_else(|| anyhow!("MetaImage header is missing ElementType"))?;
    let start = payload_start.ok_or_else(|| anyhow!("MetaImage header is missing ElementDataFile"))?;

    let n = dim.0 * dim.1 * dim.2;
    let width = kind.byte_width();
    let payload = &bytes[start..];
    if payload.len() < n * width {
        bail!(
            "MetaImage payload too short: {} bytes for {} samples of {}",
            payload.len(),
            n,
            kind.met_name()
        );
    }

    let mut data = Vec::with_capacity(n);
    for chunk in payload[..n * width].chunks_exact(width) {
        data.push(decode_sample(chunk, kind, big_endian));
    }
    ScalarVolume::from_vec(dim, spacing, data).map_err(|e| anyhow!(e))
}

fn write_mha(path: &Path, v: &ScalarVolume, kind: PixelKind) -> Result<()> {
    let f = File::create(path).with_context(|| format!("create {}", display(path)))?;
    let mut w = BufWriter::new(f);
    let (nx, ny, nz) = v.dim();
    let (sx, sy, sz) = v.spacing();

    writeln!(w, "ObjectType = Image")?;
    writeln!(w, "NDims = 3")?;
    writeln!(w, "BinaryData = True")?;
    writeln!(w, "BinaryDataByteOrderMSB = False")?;
    writeln!(w, "CompressedData = False")?;
    writeln!(w, "DimSize = {nx} {ny} {nz}")?;
    writeln!(w, "ElementSpacing = {sx} {sy} {sz}")?;
    writeln!(w, "ElementType = {}", kind.met_name())?;
    writeln!(w, "ElementDataFile = LOCAL")?;

    for &x in v.as_slice() {
        encode_sample(&mut w, x, kind)?;
    }
    w.flush().context("flush MetaImage payload")?;
    Ok(())
}

fn decode_sample(chunk: &[u8], kind: PixelKind, big_endian: bool) -> f64 {
    macro_rules! de {
        ($t:ty) => {{
            let arr: [u8; std::mem::size_of::<$t>()] = chunk.try_into().unwrap_or_default();
            let v = if big_endian {
                <$t>::from_be_bytes(arr)
            } else {
                <$t>::from_le_bytes(arr)
            };
            v as f64
        }};
    }
    match kind {
        PixelKind::U8 => f64::from(chunk[0]),
        PixelKind::I16 => de!(i16),
        PixelKind::U16 => de!(u16),
        PixelKind::U32 => de!(u32),
        PixelKind::F32 => de!(f32),
        PixelKind::F64 => de!(f64),
    }
}

fn encode_sample<W: Write>(w: &mut W, x: f64, kind: PixelKind) -> Result<()> {
    match kind {
        PixelKind::U8 => w.write_all(&[x.clamp(0.0, 255.0) as u8])?,
        PixelKind::I16 => {
            w.write_all(&(x.clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16).to_le_bytes())?;
        }
        PixelKind::U16 => {
            w.write_all(&(x.clamp(0.0, f64::from(u16::MAX)) as u16).to_le_bytes())?;
        }
        PixelKind::U32 => {
            w.write_all(&(x.clamp(0.0, f64::from(u32::MAX)) as u32).to_le_bytes())?;
        }
        PixelKind::F32 => w.write_all(&(x as f32).to_le_bytes())?,
        PixelKind::F64 => w.write_all(&x.to_le_bytes())?,
    }
    Ok(())
}

fn parse_triplet<T: std::str::FromStr>(value: &str) -> Result<[T; 3]>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let mut it = value.split_whitespace();
    let mut next = || -> Result<T> {
        it.next()
            .ok_or_else(|| anyhow!("expected three components, got {value:?}"))?
            .parse::<T>()
            .map_err(Into::into)
    };
    let out = [next()?, next()?, next()?];
    if it.next().is_some() {
        bail!("expected exactly three components, got {value:?}");
    }
    Ok(out)
}

/// Ensure the parent directory for a file exists (no-op if none).
fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", display(dir)))?;
        }
    }
    Ok(())
}

/// Return the lowercase extension (without dot) if present.
fn ext_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Human-friendly path display for error messages.
fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
