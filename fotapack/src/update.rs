use crate::image::{FotaHeader, SparseImage};
use crate::layout::UpdateLayout;
use crate::Error;
use deku::DekuContainerWrite;

/// An application image with its backup pages and FOTA header in place.
#[derive(Debug, Clone)]
pub struct PackagedImage {
    pub image: SparseImage,
    pub header: FotaHeader,
    pub total_pages: usize,
}

/// Number of `page_size` pages needed to hold `len` bytes.
pub fn total_pages(len: usize, page_size: u32) -> usize {
    let page_size = page_size as usize;
    (len + page_size - 1) / page_size
}

/// Copy the first and last page of `image` into the backup pages and
/// add the FOTA header describing the whole application.
pub fn package(mut image: SparseImage, layout: &UpdateLayout) -> Result<PackagedImage, Error> {
    layout.validate()?;

    let binary_data = image.to_bin();
    if binary_data.is_empty() {
        return Err(Error::EmptyImage);
    }

    let header_region = layout.header_backup_region()?;
    let trailer_region = layout.trailer_backup_region()?;
    for (name, region) in &[
        ("header backup", header_region),
        ("trailer backup", trailer_region),
    ] {
        if image.contains_any(region.clone()) {
            return Err(Error::RegionOverlap {
                region: *name,
                start: *region.start(),
                end: *region.end(),
                other: "the application image",
            });
        }
    }

    let page_size = layout.page_size as usize;
    let total_pages = total_pages(binary_data.len(), layout.page_size);
    log::debug!(
        "Application: {} bytes at {:#x?}, {} pages",
        binary_data.len(),
        image.address_range(),
        total_pages
    );

    let first_page = &binary_data[..page_size.min(binary_data.len())];
    log::debug!(
        "Header backup: {} bytes at {:#x}",
        first_page.len(),
        layout.backup_header_start
    );
    image.set(layout.backup_header_start, first_page)?;

    // the header replaces the tail of the mcuboot pad in the first page copy
    let header = FotaHeader::new(&binary_data, layout.fota_type, layout.flags, layout.version)?;
    let header_address = layout.header_address()?;
    log::debug!("FOTA header at {:#x}: {:x?}", header_address, header);
    image.set(header_address, &header.to_bytes()?)?;

    let last_page = &binary_data[(total_pages - 1) * page_size..];
    log::debug!(
        "Trailer backup: {} bytes at {:#x}",
        last_page.len(),
        layout.backup_trailer_start
    );
    image.set(layout.backup_trailer_start, last_page)?;

    Ok(PackagedImage {
        image,
        header,
        total_pages,
    })
}
