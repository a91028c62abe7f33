use std::fs::File;
use std::io;
use std::io::Read as _;
use std::path::{Path, PathBuf};

use super::{FieldType, Fields, ProbeError, ProbeResult, data_path};
use crate::source::Datasource;

const HEADER_LEN: usize = 32;
const DESCRIPTOR_LEN: usize = 32;
const TERMINATOR: u8 = 0x0D;

/// Field descriptors from the dBASE table that accompanies the shapefile.
pub fn describe(datasource: &Datasource) -> ProbeResult<Fields> {
    let path = dbf_path(&data_path(datasource)?);
    let header = read_header(&path)?;
    parse_descriptors(&header).map_err(|e| ProbeError::InvalidDbf(e, path))
}

/// `roads.shp` and `roads` both have their attributes in `roads.dbf`.
fn dbf_path(shp: &Path) -> PathBuf {
    match shp.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("shp") => shp.with_extension("dbf"),
        _ => {
            let mut path = shp.as_os_str().to_owned();
            path.push(".dbf");
            PathBuf::from(path)
        }
    }
}

/// Read the fixed header and all field descriptors, but none of the records.
fn read_header(path: &Path) -> ProbeResult<Vec<u8>> {
    let io_err = |e: io::Error| ProbeError::IoError(e, path.to_path_buf());
    let mut file = File::open(path).map_err(io_err)?;

    let mut header = vec![0; HEADER_LEN];
    file.read_exact(&mut header).map_err(io_err)?;
    let header_len = usize::from(u16::from_le_bytes([header[8], header[9]]));
    if header_len <= HEADER_LEN {
        return Err(ProbeError::InvalidDbf("header too short", path.to_path_buf()));
    }
    header.resize(header_len, 0);
    file.read_exact(&mut header[HEADER_LEN..]).map_err(io_err)?;
    Ok(header)
}

fn parse_descriptors(header: &[u8]) -> Result<Fields, &'static str> {
    let mut fields = Fields::new();
    let mut offset = HEADER_LEN;
    loop {
        match header.get(offset) {
            Some(&TERMINATOR) => return Ok(fields),
            None => return Err("missing field descriptor terminator"),
            Some(_) => {}
        }
        let descriptor = header
            .get(offset..offset + DESCRIPTOR_LEN)
            .ok_or("truncated field descriptor")?;
        let name_len = descriptor[..11].iter().position(|&b| b == 0).unwrap_or(11);
        let name = String::from_utf8_lossy(&descriptor[..name_len])
            .trim()
            .to_string();
        if let Some(field_type) = field_type(descriptor[11])
            && !name.is_empty()
        {
            fields.insert(name, field_type);
        }
        offset += DESCRIPTOR_LEN;
    }
}

fn field_type(code: u8) -> Option<FieldType> {
    match code.to_ascii_uppercase() {
        b'C' | b'D' | b'M' => Some(FieldType::String),
        b'N' | b'F' | b'I' | b'O' => Some(FieldType::Number),
        b'L' => Some(FieldType::Boolean),
        _ => None,
    }
}
