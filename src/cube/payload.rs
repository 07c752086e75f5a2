//! Binary payload decoding
//!
//! Elements are decoded with `byteorder` into `f32` and rearranged from the
//! file's interleave into a standard-layout (row, column, band) array.

use super::header::{DataType, Endianness, Interleave, RasterLayout};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use ndarray::Array3;

/// Decode a complete payload file (header offset included)
///
/// # Errors
///
/// Returns a message when the byte count after the header offset differs from
/// `rows × columns × bands × element_size`, or when that product overflows.
pub fn decode_payload(bytes: &[u8], layout: &RasterLayout) -> Result<Array3<f32>, String> {
    let expected = layout
        .payload_len()
        .ok_or_else(|| "declared cube dimensions overflow the payload size".to_string())?;
    let actual = bytes.len().saturating_sub(layout.header_offset);
    if bytes.len() < layout.header_offset || actual != expected {
        return Err(format!(
            "payload holds {actual} bytes after a {}-byte offset, header declares {expected} \
             ({}x{}x{} of {} bytes)",
            layout.header_offset,
            layout.rows,
            layout.columns,
            layout.bands,
            layout.data_type.size()
        ));
    }

    let raw = &bytes[layout.header_offset..];
    let values = match layout.endianness {
        Endianness::Little => read_values::<LittleEndian>(raw, layout.data_type),
        Endianness::Big => read_values::<BigEndian>(raw, layout.data_type),
    };

    let (rows, columns, bands) = (layout.rows, layout.columns, layout.bands);
    let cube = match layout.interleave {
        Interleave::Bsq => Array3::from_shape_vec((bands, rows, columns), values)
            .map_err(|e| e.to_string())?
            .permuted_axes([1, 2, 0]),
        Interleave::Bil => Array3::from_shape_vec((rows, bands, columns), values)
            .map_err(|e| e.to_string())?
            .permuted_axes([0, 2, 1]),
        Interleave::Bip => {
            Array3::from_shape_vec((rows, columns, bands), values).map_err(|e| e.to_string())?
        }
    };

    Ok(cube.as_standard_layout().into_owned())
}

fn read_values<B: ByteOrder>(raw: &[u8], data_type: DataType) -> Vec<f32> {
    let chunks = raw.chunks_exact(data_type.size());
    match data_type {
        DataType::U8 => raw.iter().map(|&b| f32::from(b)).collect(),
        DataType::I16 => chunks.map(|c| f32::from(B::read_i16(c))).collect(),
        DataType::U16 => chunks.map(|c| f32::from(B::read_u16(c))).collect(),
        DataType::I32 => chunks.map(|c| B::read_i32(c) as f32).collect(),
        DataType::U32 => chunks.map(|c| B::read_u32(c) as f32).collect(),
        DataType::I64 => chunks.map(|c| B::read_i64(c) as f32).collect(),
        DataType::U64 => chunks.map(|c| B::read_u64(c) as f32).collect(),
        DataType::F32 => chunks.map(B::read_f32).collect(),
        DataType::F64 => chunks.map(|c| B::read_f64(c) as f32).collect(),
    }
}
