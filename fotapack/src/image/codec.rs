use super::{SparseImage, StartAddress};
use crate::Error;
use ihex::Record;
use std::str::FromStr;

/// Data bytes per Intel HEX data record
const RECORD_DATA_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
    /// CRLF on Windows, LF elsewhere
    Native,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::Native if cfg!(windows) => "\r\n",
            LineEnding::Native => "\n",
        }
    }
}

/// Encoded form of a rendered image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Hex,
    Bin,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hex" | "ihex" => Ok(Format::Hex),
            "bin" => Ok(Format::Bin),
            _ => Err(format!("unknown format `{}`, expected hex or bin", s)),
        }
    }
}

impl SparseImage {
    pub fn from_ihex(text: &str) -> Result<Self, Error> {
        let mut image = SparseImage::new();
        let mut base_address = 0u32;

        let lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
        for line in lines {
            match Record::from_record_string(line)? {
                Record::Data { offset, value } => {
                    let addr = base_address.checked_add(u32::from(offset)).ok_or(
                        Error::AddressOverflow {
                            start: base_address,
                            len: usize::from(offset),
                        },
                    )?;
                    image.insert_new(addr, &value)?;
                }
                Record::EndOfFile => break,
                Record::ExtendedSegmentAddress(segment) => {
                    base_address = u32::from(segment) * 16;
                }
                Record::ExtendedLinearAddress(upper) => {
                    base_address = u32::from(upper) << 16;
                }
                Record::StartSegmentAddress { cs, ip } => {
                    image.set_start_address(StartAddress::Segment { cs, ip });
                }
                Record::StartLinearAddress(addr) => {
                    image.set_start_address(StartAddress::Linear(addr));
                }
            }
        }
        log::trace!("Loaded {} bytes of Intel HEX data", image.len());

        Ok(image)
    }

    /// Parse raw file contents as Intel HEX.
    pub fn load_ihex(data: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(data).map_err(|_| Error::HexNotText)?;
        Self::from_ihex(text)
    }

    pub fn to_ihex(&self, line_ending: LineEnding) -> Result<String, Error> {
        let mut records = Vec::new();
        match self.start_address() {
            Some(StartAddress::Segment { cs, ip }) => {
                records.push(Record::StartSegmentAddress { cs, ip })
            }
            Some(StartAddress::Linear(addr)) => records.push(Record::StartLinearAddress(addr)),
            None => {}
        }

        let mut upper = 0u16;
        for segment in self.segments() {
            let mut addr = segment.addr;
            let mut data = &segment.data[..];
            while !data.is_empty() {
                // records must not cross a 64K boundary
                let to_boundary = 0x1_0000 - (addr & 0xffff) as usize;
                let len = data.len().min(RECORD_DATA_LEN).min(to_boundary);
                let (chunk, rest) = data.split_at(len);

                let high = (addr >> 16) as u16;
                if high != upper {
                    records.push(Record::ExtendedLinearAddress(high));
                    upper = high;
                }
                records.push(Record::Data {
                    offset: addr as u16,
                    value: chunk.to_vec(),
                });

                data = rest;
                addr = addr.wrapping_add(len as u32);
            }
        }
        records.push(Record::EndOfFile);

        let eol = line_ending.as_str();
        let mut out = String::new();
        for record in &records {
            out.push_str(&record.to_record_string()?);
            out.push_str(eol);
        }
        Ok(out)
    }

    pub fn render(&self, format: Format, line_ending: LineEnding) -> Result<Vec<u8>, Error> {
        Ok(match format {
            Format::Hex => self.to_ihex(line_ending)?.into_bytes(),
            Format::Bin => self.to_bin(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn writes_records_with_crlf() {
        let image = SparseImage::from_bytes(0x0, b"foo\n\0\xff").unwrap();

        assert_eq!(
            image.to_ihex(LineEnding::CrLf).unwrap(),
            ":06000000666F6F0A00FFAD\r\n:00000001FF\r\n"
        );
    }

    #[test]
    fn writes_extended_linear_address() {
        let image = SparseImage::from_bytes(0xfd000, &[0x01, 0x02]).unwrap();

        assert_eq!(
            image.to_ihex(LineEnding::Lf).unwrap(),
            ":02000004000FEB\n:02D0000001022B\n:00000001FF\n"
        );
    }

    #[test]
    fn splits_records_at_64k_boundary() {
        let image = SparseImage::from_bytes(0xfffc, &[0x11; 8]).unwrap();
        let hex = image.to_ihex(LineEnding::Lf).unwrap();
        let lines: Vec<_> = hex.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with(":04FFFC00"));
        assert_eq!(lines[1], ":020000040001F9");
        assert!(lines[2].starts_with(":04000000"));
        assert_eq!(SparseImage::from_ihex(&hex).unwrap(), image);
    }

    #[test_case(0x0, 5 ; "low memory")]
    #[test_case(0xfd000, 4096 ; "page at backup header")]
    #[test_case(0x1fff0, 0x40 ; "crossing segment")]
    fn hex_round_trip(addr: u32, len: usize) {
        let data: Vec<u8> = (0..len).map(|i| (i * 7) as u8).collect();
        let mut image = SparseImage::from_bytes(addr, &data).unwrap();
        image.set(addr + len as u32 + 0x100, b"tail").unwrap();

        let hex = image.to_ihex(LineEnding::CrLf).unwrap();
        let decoded = SparseImage::from_ihex(&hex).unwrap();

        assert_eq!(decoded, image);
        assert_eq!(
            decoded.to_contiguous(Some(addr..=addr + len as u32 - 1), 0),
            data
        );
    }

    #[test]
    fn reads_segment_addressing_and_start_address() {
        let hex = ":020000021000EC\n:0400000501020304ED\n:02000000AABB99\n:00000001FF\n";
        let image = SparseImage::from_ihex(hex).unwrap();

        assert_eq!(image.get(0x10000), Some(0xaa));
        assert_eq!(image.get(0x10001), Some(0xbb));
        assert_eq!(
            image.start_address(),
            Some(StartAddress::Linear(0x01020304))
        );

        let rendered = image.to_ihex(LineEnding::Lf).unwrap();
        assert!(rendered.starts_with(":0400000501020304ED\n"));
    }

    #[test]
    fn rejects_overlapping_records() {
        let hex = ":02000000AABB99\n:01000100CC32\n:00000001FF\n";

        assert!(matches!(
            SparseImage::from_ihex(hex),
            Err(Error::OverlappingData(0x1))
        ));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(
            SparseImage::from_ihex(":0200000"),
            Err(Error::HexRead(_))
        ));
        assert!(matches!(
            SparseImage::load_ihex(&[0xff, 0xfe]),
            Err(Error::HexNotText)
        ));
    }

    #[test]
    fn bin_covers_occupied_span() {
        let mut image = SparseImage::from_bytes(0x8000, &[1, 2]).unwrap();
        image.set(0x8004, &[3]).unwrap();

        assert_eq!(
            image.render(Format::Bin, LineEnding::Lf).unwrap(),
            vec![1, 2, 0xff, 0xff, 3]
        );
    }

    #[test_case("hex", Format::Hex)]
    #[test_case("BIN", Format::Bin)]
    fn parses_format(s: &str, format: Format) {
        assert_eq!(s.parse::<Format>(), Ok(format));
    }
}
