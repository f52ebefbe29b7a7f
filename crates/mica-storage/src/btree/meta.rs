//! Index meta page: index-wide configuration plus the current root.

use mica_common::{KeyType, MicaError, PageId, Result};

/// Page number of the meta page, always the first page of an index file.
pub const META_PAGE_NUM: u32 = 1;

/// Maximum stored relation-name length in bytes.
pub const MAX_RELATION_NAME: usize = 64;

/// Fixed field offsets; the name field is padded to its maximum so the root
/// pointer can be rewritten without re-encoding the name.
const NAME_LEN_OFFSET: usize = 0;
const NAME_OFFSET: usize = 2;
const ATTR_OFFSET_OFFSET: usize = NAME_OFFSET + MAX_RELATION_NAME;
const KEY_TYPE_OFFSET: usize = ATTR_OFFSET_OFFSET + 4;
const ROOT_OFFSET: usize = KEY_TYPE_OFFSET + 1;
const META_ENCODED_LEN: usize = ROOT_OFFSET + 4;

/// Contents of the meta page.
///
/// Written once at index creation; only the root page number changes
/// afterwards, every time the root splits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMeta {
    /// Name of the base relation the index is built over.
    pub relation_name: String,
    /// Byte offset of the indexed attribute inside a record.
    pub attr_byte_offset: u32,
    /// Type of the indexed attribute.
    pub key_type: KeyType,
    /// Page number of the current root node.
    pub root_page_num: u32,
}

impl IndexMeta {
    /// Serializes into the front of a page buffer.
    pub fn write_to(&self, page: &mut [u8]) {
        page[..META_ENCODED_LEN].fill(0);
        let name = self.relation_name.as_bytes();
        page[NAME_LEN_OFFSET..NAME_LEN_OFFSET + 2]
            .copy_from_slice(&(name.len() as u16).to_le_bytes());
        page[NAME_OFFSET..NAME_OFFSET + name.len()].copy_from_slice(name);
        page[ATTR_OFFSET_OFFSET..ATTR_OFFSET_OFFSET + 4]
            .copy_from_slice(&self.attr_byte_offset.to_le_bytes());
        page[KEY_TYPE_OFFSET] = self.key_type.as_u8();
        page[ROOT_OFFSET..ROOT_OFFSET + 4].copy_from_slice(&self.root_page_num.to_le_bytes());
    }

    /// Deserializes from a page buffer.
    pub fn read_from(page: &[u8], page_id: PageId) -> Result<Self> {
        let name_len = u16::from_le_bytes([page[NAME_LEN_OFFSET], page[NAME_LEN_OFFSET + 1]]) as usize;
        if name_len > MAX_RELATION_NAME {
            return Err(MicaError::PageCorrupted {
                page_id,
                reason: format!("relation name length {} exceeds {}", name_len, MAX_RELATION_NAME),
            });
        }

        let relation_name = String::from_utf8(page[NAME_OFFSET..NAME_OFFSET + name_len].to_vec())
            .map_err(|_| MicaError::PageCorrupted {
                page_id,
                reason: "relation name is not valid UTF-8".to_string(),
            })?;

        let attr_byte_offset = u32::from_le_bytes([
            page[ATTR_OFFSET_OFFSET],
            page[ATTR_OFFSET_OFFSET + 1],
            page[ATTR_OFFSET_OFFSET + 2],
            page[ATTR_OFFSET_OFFSET + 3],
        ]);

        let key_type = KeyType::from_u8(page[KEY_TYPE_OFFSET]).ok_or_else(|| {
            MicaError::PageCorrupted {
                page_id,
                reason: format!("unknown key type tag {}", page[KEY_TYPE_OFFSET]),
            }
        })?;

        let root_page_num = u32::from_le_bytes([
            page[ROOT_OFFSET],
            page[ROOT_OFFSET + 1],
            page[ROOT_OFFSET + 2],
            page[ROOT_OFFSET + 3],
        ]);

        Ok(Self {
            relation_name,
            attr_byte_offset,
            key_type,
            root_page_num,
        })
    }
}
