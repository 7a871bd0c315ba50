//! Streaming reader for the schedule feed.
//!
//! The feed is a document with repeated `<item>` elements, wherever they sit in
//! the tree. Each item carries simple text children (`ch`, `index`, `title`,
//! `starttime`, `endtime`, `link`). Unknown children are skipped.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::Error;

/// One `<item>` from the feed, with the raw text of the fields we care about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    pub ch: Option<String>,
    pub index: Option<String>,
    pub title: Option<String>,
    pub starttime: Option<String>,
    pub endtime: Option<String>,
    pub link: Option<String>,
}

impl FeedItem {
    fn field_mut(&mut self, name: &[u8]) -> Option<&mut Option<String>> {
        match name {
            b"ch" => Some(&mut self.ch),
            b"index" => Some(&mut self.index),
            b"title" => Some(&mut self.title),
            b"starttime" => Some(&mut self.starttime),
            b"endtime" => Some(&mut self.endtime),
            b"link" => Some(&mut self.link),
            _ => None,
        }
    }
}

/// Iterates over the `<item>` elements of a feed document in document order.
///
/// Parsing is lazy: a caller that stops early never looks at the rest of the
/// document.
pub struct Items<'a> {
    reader: Reader<&'a [u8]>,
    done: bool,
}

impl<'a> Items<'a> {
    pub fn new(document: &'a [u8]) -> Self {
        let mut reader = Reader::from_reader(document);
        reader.trim_text(true);

        Self {
            reader,
            done: false,
        }
    }

    fn read_item(&mut self) -> Result<Option<FeedItem>, Error> {
        // Skip forward to the next <item>.
        loop {
            match self.reader.read_event().map_err(parse_error)? {
                Event::Start(e) if e.local_name().as_ref() == b"item" => break,
                Event::Eof => return Ok(None),
                _ => {}
            }
        }

        let mut item = FeedItem::default();
        let mut field: Option<Vec<u8>> = None;
        let mut depth = 0usize;

        loop {
            match self.reader.read_event().map_err(parse_error)? {
                Event::Start(e) => {
                    depth += 1;
                    if depth == 1 {
                        field = Some(e.local_name().as_ref().to_vec());
                    }
                }
                Event::Empty(e) if depth == 0 => {
                    if let Some(slot) = item.field_mut(e.local_name().as_ref()) {
                        slot.get_or_insert_with(String::new);
                    }
                }
                Event::Text(t) if depth == 1 => {
                    let text = t.unescape().map_err(parse_error)?;
                    append(&mut item, field.as_deref(), &text);
                }
                Event::CData(c) if depth == 1 => {
                    let text = String::from_utf8_lossy(&c).into_owned();
                    append(&mut item, field.as_deref(), &text);
                }
                Event::End(_) if depth == 0 => return Ok(Some(item)),
                Event::End(_) => {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(name) = field.take() {
                            if let Some(slot) = item.field_mut(&name) {
                                slot.get_or_insert_with(String::new);
                            }
                        }
                    }
                }
                Event::Eof => {
                    return Err(Error::ParseFailed(
                        "document ended inside an <item>".to_string(),
                    ))
                }
                _ => {}
            }
        }
    }
}

fn append(item: &mut FeedItem, field: Option<&[u8]>, text: &str) {
    if let Some(slot) = field.and_then(|name| item.field_mut(name)) {
        slot.get_or_insert_with(String::new).push_str(text);
    }
}

fn parse_error(e: quick_xml::Error) -> Error {
    Error::ParseFailed(e.to_string())
}

impl<'a> Iterator for Items<'a> {
    type Item = Result<FeedItem, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_item() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
