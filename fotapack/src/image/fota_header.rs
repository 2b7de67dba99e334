use crate::Error;
use deku::prelude::*;
use std::convert::TryFrom;

pub const FOTA_HEADER_SIZE: usize = 12;

/// Header of the FOTA swap area, read by the bootloader to validate and restore
/// an interrupted update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "little")]
pub struct FotaHeader {
    /// Length of the whole application payload
    pub size: u32,
    /// CRC-32 (ISO-HDLC) of the whole application payload
    pub crc: u32,
    pub fota_type: u16,
    pub flags: u8,
    pub version: u8,
}

impl FotaHeader {
    pub fn new(blob: &[u8], fota_type: u16, flags: u8, version: u8) -> Result<Self, Error> {
        let size = u32::try_from(blob.len()).map_err(|_| Error::AddressOverflow {
            start: 0,
            len: blob.len(),
        })?;
        Ok(FotaHeader {
            size,
            crc: Self::checksum(blob),
            fota_type,
            flags,
            version,
        })
    }

    pub fn checksum(data: &[u8]) -> u32 {
        crc::crc32::checksum_ieee(data)
    }

    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let (_, header) = FotaHeader::from_bytes((data, 0))?;
        Ok(header)
    }

    /// Whether this header describes `blob`.
    pub fn matches(&self, blob: &[u8]) -> bool {
        self.size as usize == blob.len() && self.crc == Self::checksum(blob)
    }
}
