// chunker.rs — Split a decision into retrievable chunks.
//
// Every decision yields, in order:
//   - one title chunk;
//   - one section chunk per named section (Context, Decision, Consequences,
//     Alternatives) that has text;
//   - one body chunk holding all other text (preamble, custom sections).
//
// A section or body longer than the threshold additionally yields chunks
// packed from whole paragraphs, each at most `threshold` bytes where
// possible. A paragraph that is itself too long is split on sentence
// boundaries; a single over-long sentence is kept whole.

use adr_core::Decision;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Title,
    Section,
    Body,
}

/// One unit of indexed text. `ordinal` is the position within its decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub decision_id: String,
    pub ordinal: usize,
    pub chunk_type: ChunkType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,
    pub text: String,
}

/// Chunk a decision. Output order is stable for identical input.
pub fn chunk_decision(decision: &Decision, threshold: usize) -> Vec<Chunk> {
    let id = decision.id();
    let mut out: Vec<Chunk> = Vec::new();
    let mut push = |chunk_type: ChunkType, section_name: Option<&str>, text: String| {
        let ordinal = out.len();
        out.push(Chunk {
            decision_id: id.to_string(),
            ordinal,
            chunk_type,
            section_name: section_name.map(str::to_string),
            text,
        });
    };

    push(ChunkType::Title, None, decision.title().to_string());

    let mut body_parts: Vec<String> = Vec::new();
    for section in decision.sections() {
        if section.text.is_empty() {
            continue;
        }
        match section.kind {
            Some(kind) => {
                push(ChunkType::Section, Some(kind.as_str()), section.text.clone());
                if section.text.len() > threshold {
                    for piece in pack_paragraphs(&section.text, threshold) {
                        push(ChunkType::Section, Some(kind.as_str()), piece);
                    }
                }
            }
            None if section.heading.is_empty() => body_parts.push(section.text),
            None => body_parts.push(format!("{}\n\n{}", section.heading, section.text)),
        }
    }

    if !body_parts.is_empty() {
        let body = body_parts.join("\n\n");
        let long = body.len() > threshold;
        push(ChunkType::Body, None, body.clone());
        if long {
            for piece in pack_paragraphs(&body, threshold) {
                push(ChunkType::Body, None, piece);
            }
        }
    }

    out
}

/// Greedily pack paragraphs into pieces of at most `threshold` bytes.
fn pack_paragraphs(text: &str, threshold: usize) -> Vec<String> {
    let mut units: Vec<String> = Vec::new();
    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if paragraph.len() > threshold {
            units.extend(split_sentences(paragraph));
        } else {
            units.push(paragraph.to_string());
        }
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    for unit in units {
        if !current.is_empty() && current.len() + 2 + unit.len() > threshold {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&unit);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Split after `.`, `!` or `?` followed by whitespace.
fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = paragraph.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(next, n)) = chars.peek() {
                if n.is_whitespace() {
                    let sentence = paragraph[start..next].trim();
                    if !sentence.is_empty() {
                        sentences.push(sentence.to_string());
                    }
                    start = next;
                }
            }
        }
    }
    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;
    use adr_core::FrontMatter;
    use chrono::NaiveDate;

    fn decision(body: &str) -> Decision {
        Decision::new(
            FrontMatter::new(
                "ADR-0001",
                "Use FastAPI",
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            ),
            body,
        )
    }

    #[test]
    fn title_sections_and_body() {
        let d = decision(
            "Intro text.\n\n## Context\n\nNeed async.\n\n## Decision\n\nUse FastAPI.\n\n## Links\n\nSee wiki.\n",
        );
        let chunks = chunk_decision(&d, 1000);
        let shape: Vec<(ChunkType, Option<&str>)> = chunks
            .iter()
            .map(|c| (c.chunk_type, c.section_name.as_deref()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (ChunkType::Title, None),
                (ChunkType::Section, Some("Context")),
                (ChunkType::Section, Some("Decision")),
                (ChunkType::Body, None),
            ]
        );
        assert_eq!(chunks[3].text, "Intro text.\n\nLinks\n\nSee wiki.");
        let ordinals: Vec<usize> = chunks.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_body_gives_title_only() {
        let chunks = chunk_decision(&decision(""), 1000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, ChunkType::Title);
    }

    #[test]
    fn long_sections_get_paragraph_chunks() {
        let para = "word ".repeat(10).trim().to_string();
        let body = format!("## Context\n\n{p}\n\n{p}\n\n{p}\n", p = para);
        let chunks = chunk_decision(&decision(&body), 60);
        let context: Vec<&Chunk> = chunks
            .iter()
            .filter(|c| c.section_name.as_deref() == Some("Context"))
            .collect();
        // Whole section first, then one piece per paragraph (49 bytes each).
        assert_eq!(context.len(), 4);
        assert!(context[1..].iter().all(|c| c.text == para));
    }

    #[test]
    fn oversize_paragraph_splits_on_sentences() {
        let pieces = pack_paragraphs("First sentence here. Second one follows! Third?", 25);
        assert_eq!(
            pieces,
            vec!["First sentence here.", "Second one follows!", "Third?"]
        );
    }

    #[test]
    fn decimal_points_are_not_sentence_ends() {
        assert_eq!(
            split_sentences("Version 2.0 is out. Done."),
            vec!["Version 2.0 is out.", "Done."]
        );
    }
}
