//! Fixture archives for unit tests.

use std::io::{Cursor, Write};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;

pub enum Entry {
    Dir(&'static str),
    File(&'static str, Vec<u8>),
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 255]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

pub fn encoded_bytes(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([40, 120, 200]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, format)
        .unwrap();
    buf.into_inner()
}

pub fn write_archive(entries: &[Entry]) -> NamedTempFile {
    let mut zip_file = NamedTempFile::new().unwrap();
    {
        let mut writer = zip::ZipWriter::new(&mut zip_file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for entry in entries {
            match entry {
                Entry::Dir(name) => writer.add_directory(*name, options).unwrap(),
                Entry::File(name, bytes) => {
                    writer.start_file(*name, options).unwrap();
                    writer.write_all(bytes).unwrap();
                }
            }
        }
        writer.finish().unwrap();
    }
    zip_file
}

/// Stored entry for `write_raw_archive`.
pub struct RawEntry {
    pub name: &'static str,
    pub data: Vec<u8>,
    /// Uncompressed size claimed in the central directory via a zip64 extra field.
    pub declared_size: Option<u64>,
}

/// Lay out a stored zip by hand so headers can carry values `ZipWriter` never writes.
pub fn write_raw_archive(entries: &[RawEntry]) -> NamedTempFile {
    let crc = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);
    let mut out = Vec::new();
    let mut central = Vec::new();

    for entry in entries {
        let offset = out.len() as u32;
        let checksum = crc.checksum(&entry.data);
        let len = entry.data.len() as u32;
        let name = entry.name.as_bytes();

        // Local file header
        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&0u16.to_le_bytes()); // stored
        out.extend_from_slice(&[0; 4]); // time, date
        out.extend_from_slice(&checksum.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(&entry.data);

        let (uncompressed, extra) = match entry.declared_size {
            Some(size) => {
                let mut extra = Vec::new();
                extra.extend_from_slice(&0x0001u16.to_le_bytes()); // zip64
                extra.extend_from_slice(&8u16.to_le_bytes());
                extra.extend_from_slice(&size.to_le_bytes());
                (u32::MAX, extra)
            }
            None => (len, Vec::new()),
        };

        // Central directory header
        central.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        central.extend_from_slice(&45u16.to_le_bytes()); // made by
        central.extend_from_slice(&45u16.to_le_bytes()); // version needed
        central.extend_from_slice(&0u16.to_le_bytes()); // flags
        central.extend_from_slice(&0u16.to_le_bytes()); // stored
        central.extend_from_slice(&[0; 4]); // time, date
        central.extend_from_slice(&checksum.to_le_bytes());
        central.extend_from_slice(&len.to_le_bytes());
        central.extend_from_slice(&uncompressed.to_le_bytes());
        central.extend_from_slice(&(name.len() as u16).to_le_bytes());
        central.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes()); // comment
        central.extend_from_slice(&0u16.to_le_bytes()); // disk
        central.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        central.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(name);
        central.extend_from_slice(&extra);
    }

    let cd_offset = out.len() as u32;
    let cd_size = central.len() as u32;
    let count = entries.len() as u16;
    out.extend_from_slice(&central);

    // End of central directory
    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&cd_size.to_le_bytes());
    out.extend_from_slice(&cd_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&out).unwrap();
    file.flush().unwrap();
    file
}
