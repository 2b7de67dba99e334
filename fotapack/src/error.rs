use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Intel HEX parse error: {0}")]
    HexRead(#[from] ihex::ReaderError),
    #[error("Intel HEX write error: {0}")]
    HexWrite(#[from] ihex::WriterError),
    #[error("Intel HEX input is not ASCII text")]
    HexNotText,
    #[error("Intel HEX data overlaps at address {0:#x}")]
    OverlappingData(u32),
    #[error("{len} bytes at {start:#x} exceed the 32-bit address space")]
    AddressOverflow { start: u32, len: usize },
    #[error("Config text is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("Application image is empty")]
    EmptyImage,
    #[error("Invalid update layout: {0}")]
    InvalidLayout(String),
    #[error("{region} region {start:#x}..={end:#x} overlaps {other}")]
    RegionOverlap {
        region: &'static str,
        start: u32,
        end: u32,
        other: &'static str,
    },
    #[error("Parse error")]
    ParseError(#[from] deku::error::DekuError),
    #[error("Parse toml error")]
    TomlError(#[from] toml::de::Error),
}
