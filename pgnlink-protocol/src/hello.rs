//! Presence announcement
//!
//! Before any peer has been seen, the bridge announces itself with the
//! unframed ASCII literal `<NODE>-hello`. It is the only traffic on the link
//! that is not wrapped in a frame, so both ends special-case it: the sender
//! writes it raw, and the receiver's reassembler recognises it in the byte
//! stream (see [`crate::reassembler`]).

use heapless::String;

/// Literal appended to the node name
pub const HELLO_SUFFIX: &str = "-hello";

/// Maximum node name length in bytes
pub const MAX_NODE_NAME_LEN: usize = 16;

/// Maximum announcement length in bytes
pub const MAX_ANNOUNCEMENT_LEN: usize = MAX_NODE_NAME_LEN + HELLO_SUFFIX.len();

/// A complete presence announcement literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    text: String<MAX_ANNOUNCEMENT_LEN>,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Announcement {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.text.as_str())
    }
}

impl Announcement {
    /// Build the announcement for `node`
    ///
    /// Returns `None` for an empty name, a name longer than
    /// [`MAX_NODE_NAME_LEN`], or one that is not printable ASCII. Keeping
    /// the literal ASCII means it can never contain a frame marker byte.
    pub fn for_node(node: &str) -> Option<Self> {
        if node.is_empty() || node.len() > MAX_NODE_NAME_LEN {
            return None;
        }
        if !node.bytes().all(|b| b.is_ascii_graphic()) {
            return None;
        }

        let mut text = String::new();
        text.push_str(node).ok()?;
        text.push_str(HELLO_SUFFIX).ok()?;
        Some(Self { text })
    }

    /// Wire bytes of the announcement
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// Announcement as text
    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    /// Node name the announcement was built for
    pub fn node_name(&self) -> &str {
        &self.text[..self.text.len() - HELLO_SUFFIX.len()]
    }

    /// Length of the literal in bytes
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Always false; an announcement carries at least the suffix
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Shorthand for [`Announcement::for_node`]
pub fn announcement(node: &str) -> Option<Announcement> {
    Announcement::for_node(node)
}
