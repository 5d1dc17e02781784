use sha2::{Digest, Sha256};

use crate::domain::Chunk;

use super::FormText;

pub const DEFAULT_MAX_CHUNK_CHARS: usize = 1000;

/// CRLF to LF, runs of spaces/tabs to one space, trimmed lines, at most one blank line in a row.
pub fn normalize_text(s: &str) -> String {
    let unified = s.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;
    for line in unified.split('\n') {
        let collapsed = line.split([' ', '\t']).filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        out.push_str(&collapsed);
        blank_run = 0;
    }
    out
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn chunk_id_for(source_form: &str, page: Option<u32>, ordinal: u32, text: &str) -> String {
    let page = page.map(|p| p.to_string()).unwrap_or_default();
    let payload = format!("source_form={source_form}\npage={page}\nordinal={ordinal}\ntext={text}");
    sha256_hex(payload.as_bytes())
}

fn split_chars(s: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    chars.chunks(max_chars).map(|c| c.iter().collect()).collect()
}

/// Pieces no longer than `max_chars`: paragraphs, else lines, else hard splits.
fn pieces(text: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if para.chars().count() <= max_chars {
            out.push(para.to_string());
            continue;
        }
        for line in para.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line.chars().count() <= max_chars {
                out.push(line.to_string());
            } else {
                out.extend(split_chars(line, max_chars));
            }
        }
    }
    out
}

/// Splits one form into chunks of at most `max_chars` characters with stable ordinals.
pub fn chunk_form(form: &FormText, max_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);
    let normalized = normalize_text(&form.text);

    let mut texts: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut buf_len = 0usize;
    for p in pieces(&normalized, max_chars) {
        let p_len = p.chars().count();
        if !buf.is_empty() && buf_len + 1 + p_len > max_chars {
            texts.push(std::mem::take(&mut buf));
            buf_len = 0;
        }
        if !buf.is_empty() {
            buf.push('\n');
            buf_len += 1;
        }
        buf.push_str(&p);
        buf_len += p_len;
    }
    if !buf.trim().is_empty() {
        texts.push(buf);
    }

    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let ordinal = i as u32;
            Chunk {
                chunk_id: chunk_id_for(&form.source_form, form.page, ordinal, &text),
                source_form: form.source_form.clone(),
                page: form.page,
                ordinal,
                text_sha256: sha256_hex(text.as_bytes()),
                text,
            }
        })
        .collect()
}
