//! Section-aware handling of AWS credentials files.
//!
//! A credentials file is a sequence of `[name]` headers each followed by
//! `key = value` lines. [`CredentialsDoc`] splits the raw bytes into ordered
//! blocks while keeping every byte (comments, blank lines, line endings,
//! non-UTF-8 text), so renaming one header and serializing back changes
//! nothing else.
//!
//! A header line may carry a UTF-8 byte order mark and leading whitespace
//! before `[`, and anything after the closing `]` (such as `# prod keys`) is
//! kept as is.

use std::ops::Range;

/// Section name the AWS tooling reads when no profile is requested
pub const DEFAULT_SECTION: &str = "default";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Result of promoting a profile's section to `[default]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderOutcome {
    /// A `[<profile>]` header was found and renamed
    Promoted,
    /// No header matched; the text is unchanged
    Unchanged,
}

#[derive(Debug, Clone)]
struct Block {
    /// Raw section name, `None` for lines before the first header
    name: Option<Vec<u8>>,
    /// Raw lines including their terminators; the header line comes first
    lines: Vec<Vec<u8>>,
}

/// Credentials file parsed into ordered section blocks
#[derive(Debug, Clone)]
pub struct CredentialsDoc {
    blocks: Vec<Block>,
}

/// Byte range of the section name within a header line, if it is one
fn header_span(line: &[u8]) -> Option<Range<usize>> {
    let mut start = if line.starts_with(UTF8_BOM) {
        UTF8_BOM.len()
    } else {
        0
    };
    start += line[start..]
        .iter()
        .take_while(|b| b.is_ascii_whitespace())
        .count();

    if line.get(start) != Some(&b'[') {
        return None;
    }
    let open = start + 1;
    let close = open + line[open..].iter().position(|&b| b == b']')?;
    Some(open..close)
}

impl CredentialsDoc {
    pub fn parse(bytes: &[u8]) -> Self {
        let mut blocks = vec![Block {
            name: None,
            lines: Vec::new(),
        }];

        for line in bytes.split_inclusive(|&b| b == b'\n') {
            if let Some(span) = header_span(line) {
                blocks.push(Block {
                    name: Some(line[span].to_vec()),
                    lines: vec![line.to_vec()],
                });
            } else if let Some(current) = blocks.last_mut() {
                current.lines.push(line.to_vec());
            }
        }

        Self { blocks }
    }

    /// Section names in file order, lossily decoded for display
    pub fn section_names(&self) -> Vec<String> {
        self.blocks
            .iter()
            .filter_map(|b| b.name.as_deref())
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect()
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.blocks
            .iter()
            .any(|b| b.name.as_deref() == Some(name.as_bytes()))
    }

    /// Rename the first section called `from` to `to`.
    ///
    /// Only the name between the brackets changes; indentation, a leading
    /// byte order mark, trailing content and the line ending survive.
    /// Matching is exact and case-sensitive.
    pub fn rename_section(&mut self, from: &str, to: &str) -> bool {
        let Some(block) = self
            .blocks
            .iter_mut()
            .find(|b| b.name.as_deref() == Some(from.as_bytes()))
        else {
            return false;
        };

        if let Some(header) = block.lines.first_mut()
            && let Some(span) = header_span(header)
        {
            let mut renamed = header[..span.start].to_vec();
            renamed.extend_from_slice(to.as_bytes());
            renamed.extend_from_slice(&header[span.end..]);
            *header = renamed;
        }
        block.name = Some(to.as_bytes().to_vec());
        true
    }

    pub fn render(&self) -> Vec<u8> {
        self.blocks
            .iter()
            .flat_map(|b| b.lines.iter())
            .flatten()
            .copied()
            .collect()
    }
}

/// Rewrite a credentials file so the section named `profile` becomes `[default]`.
pub fn promote_to_default(bytes: &[u8], profile: &str) -> (Vec<u8>, HeaderOutcome) {
    let mut doc = CredentialsDoc::parse(bytes);
    if doc.rename_section(profile, DEFAULT_SECTION) {
        (doc.render(), HeaderOutcome::Promoted)
    } else {
        (bytes.to_vec(), HeaderOutcome::Unchanged)
    }
}
