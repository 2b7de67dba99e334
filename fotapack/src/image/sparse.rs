use crate::Error;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Value of unwritten addresses when an image is materialized, matching erased flash.
pub const DEFAULT_FILL: u8 = 0xff;

/// Entry point carried by Intel HEX start address records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAddress {
    Segment { cs: u16, ip: u16 },
    Linear(u32),
}

/// A byte addressable memory image which does not need to be contiguous.
///
/// Writes are last-write-wins per address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseImage {
    bytes: BTreeMap<u32, u8>,
    start_address: Option<StartAddress>,
}

/// A contiguous run of bytes of a [`SparseImage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub addr: u32,
    pub data: Vec<u8>,
}

impl Segment {
    pub fn size(&self) -> u32 {
        self.data.len() as u32
    }

    fn ends_at(&self, addr: u32) -> bool {
        u64::from(self.addr) + self.data.len() as u64 == u64::from(addr)
    }
}

/// Last address covered by `len` bytes starting at `start`.
pub(crate) fn last_address(start: u32, len: usize) -> Result<u32, Error> {
    let overflow = || Error::AddressOverflow { start, len };
    if len == 0 || len - 1 > u32::MAX as usize {
        return Err(overflow());
    }
    start.checked_add((len - 1) as u32).ok_or_else(overflow)
}

impl SparseImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(addr: u32, data: &[u8]) -> Result<Self, Error> {
        let mut image = Self::new();
        image.set(addr, data)?;
        Ok(image)
    }

    /// Write `data` starting at `addr`, replacing whatever was there.
    pub fn set(&mut self, addr: u32, data: &[u8]) -> Result<(), Error> {
        if data.is_empty() {
            return Ok(());
        }
        last_address(addr, data.len())?;
        for (offset, &byte) in data.iter().enumerate() {
            self.bytes.insert(addr + offset as u32, byte);
        }
        Ok(())
    }

    /// Like [`set`](Self::set), but refuses to overwrite any byte already present.
    pub(crate) fn insert_new(&mut self, addr: u32, data: &[u8]) -> Result<(), Error> {
        if data.is_empty() {
            return Ok(());
        }
        let last = last_address(addr, data.len())?;
        if let Some((&taken, _)) = self.bytes.range(addr..=last).next() {
            return Err(Error::OverlappingData(taken));
        }
        self.set(addr, data)
    }

    pub fn get(&self, addr: u32) -> Option<u8> {
        self.bytes.get(&addr).copied()
    }

    /// Number of occupied addresses
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn min_address(&self) -> Option<u32> {
        self.bytes.keys().next().copied()
    }

    pub fn max_address(&self) -> Option<u32> {
        self.bytes.keys().next_back().copied()
    }

    /// Span from the lowest to the highest occupied address.
    pub fn address_range(&self) -> Option<RangeInclusive<u32>> {
        Some(self.min_address()?..=self.max_address()?)
    }

    /// Whether any address in `range` is occupied.
    pub fn contains_any(&self, range: RangeInclusive<u32>) -> bool {
        if range.start() > range.end() {
            return false;
        }
        self.bytes.range(range).next().is_some()
    }

    pub fn start_address(&self) -> Option<StartAddress> {
        self.start_address
    }

    pub fn set_start_address(&mut self, start_address: StartAddress) {
        self.start_address = Some(start_address);
    }

    /// Materialize `range` (or the whole occupied span) as a dense array,
    /// using `fill` for unwritten addresses.
    pub fn to_contiguous(&self, range: Option<RangeInclusive<u32>>, fill: u8) -> Vec<u8> {
        let range = match range.or_else(|| self.address_range()) {
            Some(range) if range.start() <= range.end() => range,
            _ => return Vec::new(),
        };
        let base = *range.start();
        let mut data = vec![fill; (*range.end() - base) as usize + 1];
        for (&addr, &byte) in self.bytes.range(range) {
            data[(addr - base) as usize] = byte;
        }
        data
    }

    /// The whole occupied span as a flat binary, gaps filled with [`DEFAULT_FILL`].
    pub fn to_bin(&self) -> Vec<u8> {
        self.to_contiguous(None, DEFAULT_FILL)
    }

    /// Contiguous runs of occupied addresses, in address order.
    pub fn segments(&self) -> Vec<Segment> {
        let mut segments: Vec<Segment> = Vec::new();
        for (&addr, &byte) in &self.bytes {
            match segments.last_mut() {
                Some(segment) if segment.ends_at(addr) => segment.data.push(byte),
                _ => segments.push(Segment {
                    addr,
                    data: vec![byte],
                }),
            }
        }
        segments
    }
}
