//! Tolerant HTML table extraction
//!
//! Tables are found with case-insensitive tag scanning rather than a full
//! DOM. Every `<table>` is reported in document order, nested ones included,
//! and rows of a nested table are never attributed to the enclosing table.
//! Cell text has tags stripped, common entities decoded and whitespace
//! collapsed. Missing closing tags for rows and cells are tolerated.

/// A table as rows of cell texts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HtmlTable {
    rows: Vec<Vec<String>>,
}

impl HtmlTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    content_start: usize,
    content_end: usize,
    end: usize,
}

/// Extract every table of `document` in document order
pub fn extract_tables(document: &str) -> Vec<HtmlTable> {
    let lower = document.to_ascii_lowercase();
    let spans = table_spans(&lower);

    spans
        .iter()
        .map(|span| {
            let inner = content_without_nested(document, span, &spans);
            let inner_lower = inner.to_ascii_lowercase();
            HtmlTable::new(parse_rows(&inner, &inner_lower))
        })
        .collect()
}

fn table_spans(lower: &str) -> Vec<Span> {
    let mut events: Vec<(usize, bool)> = Vec::new();

    let mut pos = 0;
    while let Some(i) = find_open_tag(lower, pos, "table") {
        events.push((i, true));
        pos = i + 1;
    }
    pos = 0;
    while let Some(i) = find_close_tag(lower, pos, "table") {
        events.push((i, false));
        pos = i + 1;
    }
    events.sort_unstable();

    let mut stack = Vec::new();
    let mut spans = Vec::new();
    for (at, is_open) in events {
        if is_open {
            stack.push(at);
        } else if let Some(start) = stack.pop() {
            spans.push(Span {
                start,
                content_start: tag_end(lower, start).min(at),
                content_end: at,
                end: tag_end(lower, at),
            });
        }
    }
    // Unclosed tables run to the end of the document
    while let Some(start) = stack.pop() {
        spans.push(Span {
            start,
            content_start: tag_end(lower, start),
            content_end: lower.len(),
            end: lower.len(),
        });
    }

    spans.sort_by_key(|s| s.start);
    spans
}

fn content_without_nested(document: &str, span: &Span, spans: &[Span]) -> String {
    let mut content = String::new();
    let mut cursor = span.content_start;

    for child in spans
        .iter()
        .filter(|c| c.start > span.start && c.start < span.content_end)
    {
        if child.start < cursor {
            continue;
        }
        content.push_str(&document[cursor..child.start]);
        cursor = child.end.min(span.content_end);
    }
    if cursor < span.content_end {
        content.push_str(&document[cursor..span.content_end]);
    }
    content
}

fn parse_rows(content: &str, lower: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut pos = 0;

    while let Some(start) = find_open_tag(lower, pos, "tr") {
        let body_start = tag_end(lower, start);
        let next_row = find_open_tag(lower, body_start, "tr").unwrap_or(lower.len());
        let close = find_close_tag(lower, body_start, "tr").unwrap_or(lower.len());
        let body_end = next_row.min(close);

        let cells = parse_cells(&content[body_start..body_end], &lower[body_start..body_end]);
        if !cells.is_empty() {
            rows.push(cells);
        }
        pos = body_end.max(start + 1);
    }
    rows
}

fn parse_cells(row: &str, lower: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut pos = 0;

    loop {
        let start = match (
            find_open_tag(lower, pos, "td"),
            find_open_tag(lower, pos, "th"),
        ) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => break,
        };
        let body_start = tag_end(lower, start);
        let end = [
            find_close_tag(lower, body_start, "td"),
            find_close_tag(lower, body_start, "th"),
            find_open_tag(lower, body_start, "td"),
            find_open_tag(lower, body_start, "th"),
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(lower.len());

        cells.push(clean_text(&row[body_start..end]));
        pos = end.max(start + 1);
    }
    cells
}

/// Position of the next `<name` tag at or after `from`
fn find_open_tag(lower: &str, from: usize, name: &str) -> Option<usize> {
    find_tag(lower, from, &format!("<{}", name))
}

/// Position of the next `</name` tag at or after `from`
fn find_close_tag(lower: &str, from: usize, name: &str) -> Option<usize> {
    find_tag(lower, from, &format!("</{}", name))
}

fn find_tag(lower: &str, from: usize, needle: &str) -> Option<usize> {
    let bytes = lower.as_bytes();
    let mut pos = from;
    while pos < lower.len() {
        let at = pos + lower[pos..].find(needle)?;
        match bytes.get(at + needle.len()) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => return Some(at),
            None => return Some(at),
            _ => pos = at + 1,
        }
    }
    None
}

/// Index just past the `>` closing the tag that starts at `at`
fn tag_end(lower: &str, at: usize) -> usize {
    lower[at..]
        .find('>')
        .map(|i| at + i + 1)
        .unwrap_or(lower.len())
}

/// Strip tags, decode entities and collapse whitespace
pub fn clean_text(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "nbsp" => Some(' '),
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "aacute" => Some('á'),
        "acirc" => Some('â'),
        "agrave" => Some('à'),
        "atilde" => Some('ã'),
        "ccedil" => Some('ç'),
        "eacute" => Some('é'),
        "ecirc" => Some('ê'),
        "iacute" => Some('í'),
        "oacute" => Some('ó'),
        "ocirc" => Some('ô'),
        "otilde" => Some('õ'),
        "uacute" => Some('ú'),
        "uuml" => Some('ü'),
        "Aacute" => Some('Á'),
        "Acirc" => Some('Â'),
        "Atilde" => Some('Ã'),
        "Ccedil" => Some('Ç'),
        "Eacute" => Some('É'),
        "Ecirc" => Some('Ê'),
        "Iacute" => Some('Í'),
        "Oacute" => Some('Ó'),
        "Ocirc" => Some('Ô'),
        "Otilde" => Some('Õ'),
        "Uacute" => Some('Ú'),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}
