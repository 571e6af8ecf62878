//! The ordered page sequence handed to the viewer, and its fingerprint.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

use clap::ValueEnum;

use crate::media::FileHandle;

/// One page as the viewer shows it.
#[derive(Debug, Clone)]
pub struct DisplayEntry {
    pub display_name: String,
    pub file: FileHandle,
}

/// How the builder orders pages after expansion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortPolicy {
    /// Keep the expander's order.
    #[default]
    AsIs,
    /// Compare digit runs by value and letters case-insensitively, so
    /// `page2` comes before `page10`.
    Natural,
}

/// Identity of an ordered set of pages, stable across sessions.
///
/// Not cryptographic: a 32-bit string hash over each page's display name
/// and byte length, in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of<'a>(entries: impl IntoIterator<Item = &'a DisplayEntry>) -> Self {
        let mut hash: i32 = 0;
        for entry in entries {
            let size = entry.file.size().to_string();
            for unit in entry.display_name.encode_utf16().chain(size.encode_utf16()) {
                hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
            }
        }
        Self(hash.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable page sequence. Cloning shares the underlying entries.
#[derive(Debug, Clone)]
pub struct FileList {
    entries: Arc<[DisplayEntry]>,
    fingerprint: Fingerprint,
}

impl FileList {
    /// Packages expanded files as pages, applying `policy`.
    pub fn build(files: Vec<FileHandle>, policy: SortPolicy) -> Self {
        let mut entries: Vec<DisplayEntry> = files
            .into_iter()
            .map(|file| DisplayEntry {
                display_name: file.name().to_owned(),
                file,
            })
            .collect();

        if policy == SortPolicy::Natural {
            entries.sort_by(|a, b| natural_cmp(&a.display_name, &b.display_name));
        }

        let fingerprint = Fingerprint::of(&entries);
        Self {
            entries: entries.into(),
            fingerprint,
        }
    }

    pub fn empty() -> Self {
        Self::build(Vec::new(), SortPolicy::AsIs)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DisplayEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DisplayEntry> {
        self.entries.iter()
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

/// Natural ordering for page names.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars().peekable();
    let mut b_chars = b.chars().peekable();

    loop {
        match (a_chars.peek().copied(), b_chars.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a_char), Some(b_char)) if a_char.is_ascii_digit() && b_char.is_ascii_digit() => {
                let a_num = take_digits(&mut a_chars);
                let b_num = take_digits(&mut b_chars);
                match compare_digit_runs(&a_num, &b_num) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            (Some(a_char), Some(b_char)) => {
                a_chars.next();
                b_chars.next();
                match a_char.to_lowercase().cmp(b_char.to_lowercase()) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(&ch) = chars.peek() {
        if !ch.is_ascii_digit() {
            break;
        }
        digits.push(ch);
        chars.next();
    }
    digits
}

// Runs of any length compare by value without overflowing.
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;

    fn file(name: &str, size: usize) -> FileHandle {
        FileHandle::from_bytes(name, MediaKind::Image, vec![0u8; size])
    }

    fn list(files: &[(&str, usize)]) -> FileList {
        FileList::build(
            files.iter().map(|(n, s)| file(n, *s)).collect(),
            SortPolicy::AsIs,
        )
    }

    fn display_names(list: &FileList) -> Vec<&str> {
        list.iter().map(|e| e.display_name.as_str()).collect()
    }

    #[test]
    fn as_is_keeps_input_order_and_names() {
        let list = list(&[("b.zip/2.png", 1), ("a.png", 1)]);
        assert_eq!(display_names(&list), ["b.zip/2.png", "a.png"]);
        assert_eq!(list.get(1).unwrap().file.name(), "a.png");
    }

    #[test]
    fn natural_policy_orders_digit_runs_by_value() {
        let list = FileList::build(
            vec![file("page10.png", 1), file("Page2.png", 1), file("page1.png", 1)],
            SortPolicy::Natural,
        );
        assert_eq!(display_names(&list), ["page1.png", "Page2.png", "page10.png"]);
    }

    #[test]
    fn natural_cmp_handles_long_digit_runs() {
        assert_eq!(
            natural_cmp("x99999999999999999999999.png", "x100000000000000000000000.png"),
            Ordering::Less
        );
        assert_eq!(natural_cmp("a007", "a7"), Ordering::Equal);
        assert_eq!(natural_cmp("a", "a1"), Ordering::Less);
    }

    #[test]
    fn fingerprint_is_stable() {
        let a = list(&[("1.png", 10), ("2.png", 20)]);
        let b = list(&[("1.png", 10), ("2.png", 20)]);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_tracks_name_size_and_order() {
        let base = list(&[("1.png", 10), ("2.png", 20)]);
        let renamed = list(&[("1.png", 10), ("3.png", 20)]);
        let resized = list(&[("1.png", 10), ("2.png", 21)]);
        let reordered = list(&[("2.png", 20), ("1.png", 10)]);

        assert_ne!(base.fingerprint(), renamed.fingerprint());
        assert_ne!(base.fingerprint(), resized.fingerprint());
        assert_ne!(base.fingerprint(), reordered.fingerprint());
    }

    #[test]
    fn fingerprint_matches_java_string_hash() {
        // "a" + "1" hashes like the string "a1": 97 * 31 + 49.
        let list = list(&[("a", 1)]);
        assert_eq!(list.fingerprint().as_str(), "3056");
        assert_eq!(FileList::empty().fingerprint().as_str(), "0");
    }
}
