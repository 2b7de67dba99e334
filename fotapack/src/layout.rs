use crate::image::{last_address, FOTA_HEADER_SIZE};
use crate::Error;
use serde::Deserialize;
use std::ops::RangeInclusive;
use structopt::StructOpt;

pub const DEFAULT_UPDATE_LAYOUT: &[u8] = include_bytes!("cfg/update_layout.toml");

#[derive(Debug, Deserialize)]
struct UpdateLayoutFile<T> {
    update_layout: T,
}

/// Where the backup pages and the FOTA header go in an update image.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct UpdateLayout {
    pub page_size: u32,
    pub mcuboot_pad_size: u32,
    pub backup_header_start: u32,
    pub backup_trailer_start: u32,
    pub fota_type: u16,
    pub flags: u8,
    pub version: u8,
}

/// Partial layout, from the command line or a layout file.
#[derive(Debug, Deserialize, StructOpt, Default, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LayoutOverrides {
    /// Size of a flash page [default: 4096]
    #[structopt(long, parse(try_from_str = parse_int::parse))]
    pub page_size: Option<u32>,
    /// Size of the mcuboot pad in front of the image [default: 0x200]
    #[structopt(long, parse(try_from_str = parse_int::parse))]
    pub mcuboot_pad_size: Option<u32>,
    /// Address of the backup of the first page [default: 0xFD000]
    #[structopt(long, parse(try_from_str = parse_int::parse))]
    pub backup_header_start: Option<u32>,
    /// Address of the backup of the last page [default: 0xFE000]
    #[structopt(long, parse(try_from_str = parse_int::parse))]
    pub backup_trailer_start: Option<u32>,
    /// FOTA header type field [default: 0]
    #[structopt(long, parse(try_from_str = parse_int::parse))]
    pub fota_type: Option<u16>,
    /// FOTA header flags field [default: 0]
    #[structopt(long = "fota-flags", parse(try_from_str = parse_int::parse))]
    pub flags: Option<u8>,
    /// FOTA header version field [default: 0]
    #[structopt(long = "fota-version", parse(try_from_str = parse_int::parse))]
    pub version: Option<u8>,
}

impl LayoutOverrides {
    pub fn from_toml(data: &[u8]) -> Result<Self, Error> {
        let UpdateLayoutFile { update_layout } = toml::from_slice(data)?;
        Ok(update_layout)
    }
}

impl UpdateLayout {
    pub fn embedded_default() -> Result<Self, Error> {
        let UpdateLayoutFile { update_layout } = toml::from_slice(DEFAULT_UPDATE_LAYOUT)?;
        Ok(update_layout)
    }

    pub fn with_overrides(self, overrides: &LayoutOverrides) -> Self {
        UpdateLayout {
            page_size: overrides.page_size.unwrap_or(self.page_size),
            mcuboot_pad_size: overrides.mcuboot_pad_size.unwrap_or(self.mcuboot_pad_size),
            backup_header_start: overrides
                .backup_header_start
                .unwrap_or(self.backup_header_start),
            backup_trailer_start: overrides
                .backup_trailer_start
                .unwrap_or(self.backup_trailer_start),
            fota_type: overrides.fota_type.unwrap_or(self.fota_type),
            flags: overrides.flags.unwrap_or(self.flags),
            version: overrides.version.unwrap_or(self.version),
        }
    }

    /// The header is right-aligned against the end of the mcuboot pad.
    pub fn header_address(&self) -> Result<u32, Error> {
        let pad_end = self
            .backup_header_start
            .checked_add(self.mcuboot_pad_size)
            .ok_or(Error::AddressOverflow {
                start: self.backup_header_start,
                len: self.mcuboot_pad_size as usize,
            })?;
        pad_end.checked_sub(FOTA_HEADER_SIZE as u32).ok_or_else(|| {
            Error::InvalidLayout(format!("header address underflows at {:#x}", pad_end))
        })
    }

    pub fn header_backup_region(&self) -> Result<RangeInclusive<u32>, Error> {
        self.page_at(self.backup_header_start)
    }

    pub fn trailer_backup_region(&self) -> Result<RangeInclusive<u32>, Error> {
        self.page_at(self.backup_trailer_start)
    }

    fn page_at(&self, start: u32) -> Result<RangeInclusive<u32>, Error> {
        Ok(start..=last_address(start, self.page_size as usize)?)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.page_size == 0 {
            return Err(Error::InvalidLayout("page size must not be zero".into()));
        }
        if (self.mcuboot_pad_size as usize) < FOTA_HEADER_SIZE {
            return Err(Error::InvalidLayout(format!(
                "mcuboot pad size {:#x} can not hold the {} byte FOTA header",
                self.mcuboot_pad_size, FOTA_HEADER_SIZE
            )));
        }
        if self.mcuboot_pad_size > self.page_size {
            return Err(Error::InvalidLayout(format!(
                "mcuboot pad size {:#x} is larger than the page size {:#x}",
                self.mcuboot_pad_size, self.page_size
            )));
        }

        let header = self.header_backup_region()?;
        let trailer = self.trailer_backup_region()?;
        self.header_address()?;
        if header.start() <= trailer.end() && trailer.start() <= header.end() {
            return Err(Error::RegionOverlap {
                region: "header backup",
                start: *header.start(),
                end: *header.end(),
                other: "the trailer backup",
            });
        }
        Ok(())
    }
}
