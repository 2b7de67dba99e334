use crate::image::SparseImage;
use crate::Error;

const PADDING: u8 = 0xff;

/// A NUL terminated config text, padded or truncated to a fixed region size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigBlob {
    data: Vec<u8>,
    /// Length before padding/truncation, including the terminator
    content_len: usize,
}

/// Lines of `text` that are neither empty nor a `#` comment.
///
/// Only a `#` in the first column starts a comment. `\n`, `\r\n` and a
/// lone `\r` all end a line.
fn config_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .flat_map(|line| line.strip_suffix('\r').unwrap_or(line).split('\r'))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

impl ConfigBlob {
    pub fn pack(text: &str, length: usize) -> Self {
        let mut data = Vec::with_capacity(text.len() + 1);
        for line in config_lines(text) {
            data.extend_from_slice(line.as_bytes());
            data.push(b'\n');
        }
        data.push(0);

        let content_len = data.len();
        // silently drops whatever does not fit
        data.resize(length, PADDING);

        ConfigBlob { data, content_len }
    }

    pub fn from_utf8(bytes: Vec<u8>, length: usize) -> Result<Self, Error> {
        let text = String::from_utf8(bytes)?;
        Ok(Self::pack(&text, length))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn content_len(&self) -> usize {
        self.content_len
    }

    pub fn is_truncated(&self) -> bool {
        self.content_len > self.data.len()
    }

    pub fn write_to(&self, image: &mut SparseImage, address: u32) -> Result<(), Error> {
        image.set(address, &self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn strips_comments_and_truncates() {
        let blob = ConfigBlob::pack("#comment\nfoo\n\nbar\n", 8);

        assert_eq!(blob.as_bytes(), b"foo\nbar\n");
        assert_eq!(blob.content_len(), 9);
        assert!(blob.is_truncated());
    }

    #[test]
    fn pads_with_erased_flash() {
        let blob = ConfigBlob::pack("a=1\n# b=2\n", 8);

        assert_eq!(blob.as_bytes(), b"a=1\n\0\xff\xff\xff");
        assert!(!blob.is_truncated());
    }

    #[test]
    fn only_leading_hash_is_a_comment() {
        let blob = ConfigBlob::pack("x # not a comment\n #indented\n", 32);

        assert_eq!(
            &blob.as_bytes()[..30],
            b"x # not a comment\n #indented\n\0"
        );
    }

    #[test]
    fn crlf_input_packs_like_lf() {
        assert_eq!(
            ConfigBlob::pack("#c\r\nfoo\r\n\r\nbar", 16),
            ConfigBlob::pack("#c\nfoo\n\nbar", 16)
        );
    }

    #[test_case("a\rb\n", b"a\nb\n\0\xff\xff\xff" ; "lone cr")]
    #[test_case("a\r\r\nb", b"a\nb\n\0\xff\xff\xff" ; "cr before crlf")]
    #[test_case("#c\ra\r", b"a\n\0\xff\xff\xff\xff\xff" ; "comment ended by cr")]
    fn lone_cr_ends_a_line(text: &str, expected: &[u8]) {
        assert_eq!(ConfigBlob::pack(text, 8).as_bytes(), expected);
    }

    #[test]
    fn utf8_is_kept() {
        let blob = ConfigBlob::from_utf8("name=Å\n".as_bytes().to_vec(), 10).unwrap();

        assert_eq!(blob.as_bytes(), b"name=\xc3\x85\n\0\xff");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert!(matches!(
            ConfigBlob::from_utf8(vec![b'a', 0xff, b'\n'], 8),
            Err(Error::Encoding(_))
        ));
    }

    #[test_case("", 0)]
    #[test_case("", 1)]
    #[test_case("#only comments\n#here", 4)]
    #[test_case("abc\ndef\n", 3)]
    #[test_case("abc\ndef\n", 4096)]
    fn length_is_exact(text: &str, length: usize) {
        assert_eq!(ConfigBlob::pack(text, length).len(), length);
    }

    #[test]
    fn stripping_is_idempotent() {
        let text = "#a\nfoo\n\n  #b\nbar\n#c";
        let stripped: String = config_lines(text).map(|line| format!("{}\n", line)).collect();

        assert_eq!(ConfigBlob::pack(&stripped, 64), ConfigBlob::pack(text, 64));
    }

    #[test]
    fn written_at_address() {
        let mut image = SparseImage::new();
        ConfigBlob::pack("k=v\n", 6)
            .write_to(&mut image, 0x7f000)
            .unwrap();

        assert_eq!(image.address_range(), Some(0x7f000..=0x7f005));
        assert_eq!(image.to_bin(), b"k=v\n\0\xff");
    }
}
