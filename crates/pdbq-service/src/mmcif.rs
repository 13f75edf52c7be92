//! mmCIF chain extraction
//!
//! Pulls chain identity, macromolecule type, and one-letter sequences out
//! of a raw mmCIF payload. Only the `_entity_poly` loop is consumed; the
//! loop may sit anywhere in the document and is located by its header
//! prefix, not by position. The parser is forward-only: a line lexer
//! feeds a three-state machine (seeking loop → reading headers → reading
//! rows), and rows may mix single-line tokens with semicolon-delimited
//! multi-line text fields.
//!
//! Failure policy: a malformed file degrades to an empty chain list with
//! a warning. Topology becomes "unknown" while API metadata stays valid,
//! so a broken coordinate file never aborts a structure fetch.

use pdbq_common::types::{Chain, ChainKind};
use tracing::warn;

const LOOP_MARKER: &str = "loop_";
const ENTITY_POLY_PREFIX: &str = "_entity_poly.";

const COL_STRAND_ID: &str = "pdbx_strand_id";
const COL_TYPE: &str = "type";
const COL_SEQUENCE: &str = "pdbx_seq_one_letter_code_can";

/// Extract chains from a raw mmCIF document.
///
/// Returns an empty list when no `_entity_poly` loop is present or the
/// document is malformed; never an error.
pub fn parse_chains(raw: &str) -> Vec<Chain> {
    match try_parse_chains(raw) {
        Ok(chains) => chains,
        Err(reason) => {
            warn!(reason, "mmCIF parse failed, degrading to empty chain list");
            Vec::new()
        },
    }
}

fn try_parse_chains(raw: &str) -> Result<Vec<Chain>, &'static str> {
    let mut lines = raw.lines().peekable();

    // Seeking: advance to a loop_ whose headers carry the entity_poly
    // prefix. Non-qualifying loops are skipped wholesale.
    while let Some(line) = lines.next() {
        if line.trim() != LOOP_MARKER {
            continue;
        }

        // Reading headers: the column order is whatever the file declares.
        let mut columns: Vec<String> = Vec::new();
        while let Some(header) = lines.peek() {
            let header = header.trim();
            if let Some(name) = header.strip_prefix(ENTITY_POLY_PREFIX) {
                columns.push(name.to_string());
                lines.next();
            } else if header.starts_with('_') {
                // Some other category's loop; abandon it and keep seeking.
                columns.clear();
                break;
            } else {
                break;
            }
        }

        if columns.is_empty() {
            continue;
        }

        let strand_col = columns.iter().position(|c| c == COL_STRAND_ID);
        let type_col = columns.iter().position(|c| c == COL_TYPE);
        // The sequence column is optional; some files omit it.
        let seq_col = columns.iter().position(|c| c == COL_SEQUENCE);

        let (Some(strand_col), Some(type_col)) = (strand_col, type_col) else {
            continue;
        };

        return read_rows(&mut lines, columns.len(), strand_col, type_col, seq_col);
    }

    Ok(Vec::new())
}

/// Reading rows: accumulate tokens until one full row's worth is present,
/// then extract. Tokens left over after a row feed the next one.
fn read_rows<'a, I>(
    lines: &mut std::iter::Peekable<I>,
    column_count: usize,
    strand_col: usize,
    type_col: usize,
    seq_col: Option<usize>,
) -> Result<Vec<Chain>, &'static str>
where
    I: Iterator<Item = &'a str>,
{
    let mut chains = Vec::new();
    let mut tokens: Vec<String> = Vec::new();

    while let Some(&line) = lines.peek() {
        let trimmed = line.trim_end();
        if is_block_end(trimmed) {
            break;
        }
        lines.next();

        if let Some(first) = trimmed.strip_prefix(';') {
            tokens.push(collect_text_field(first, lines)?);
        } else {
            tokenize_line(trimmed, &mut tokens)?;
        }

        while tokens.len() >= column_count {
            let row: Vec<String> = tokens.drain(..column_count).collect();
            extract_row(&row, strand_col, type_col, seq_col, &mut chains);
        }
    }

    if !tokens.is_empty() {
        warn!(leftover = tokens.len(), "incomplete trailing mmCIF row ignored");
    }

    Ok(chains)
}

fn is_block_end(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with('_') || t.starts_with("loop_") || t.starts_with('#') || t.starts_with("data_")
}

/// Concatenate a semicolon-delimited multi-line field into one value.
///
/// The opening marker may carry content on its own line; inner lines are
/// joined with surrounding whitespace stripped, and the closing `;` line
/// is consumed.
fn collect_text_field<'a, I>(
    first: &str,
    lines: &mut std::iter::Peekable<I>,
) -> Result<String, &'static str>
where
    I: Iterator<Item = &'a str>,
{
    let mut value = String::from(first.trim());
    loop {
        let Some(line) = lines.next() else {
            return Err("unterminated semicolon text field");
        };
        if line.trim() == ";" {
            return Ok(value);
        }
        value.push_str(line.trim());
    }
}

/// Split one data line into whitespace/quote-delimited tokens.
fn tokenize_line(line: &str, tokens: &mut Vec<String>) -> Result<(), &'static str> {
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '#' {
            break;
        }
        if c == '\'' || c == '"' {
            chars.next();
            let mut token = String::new();
            let mut closed = false;
            for inner in chars.by_ref() {
                if inner == c {
                    closed = true;
                    break;
                }
                token.push(inner);
            }
            if !closed {
                return Err("unterminated quoted value");
            }
            tokens.push(token);
        } else {
            let mut token = String::new();
            while let Some(&inner) = chars.peek() {
                if inner.is_whitespace() {
                    break;
                }
                token.push(inner);
                chars.next();
            }
            tokens.push(token);
        }
    }

    Ok(())
}

fn extract_row(
    row: &[String],
    strand_col: usize,
    type_col: usize,
    seq_col: Option<usize>,
    chains: &mut Vec<Chain>,
) {
    let kind = entity_kind(&row[type_col]);
    let sequence = seq_col
        .map(|i| clean_sequence(&row[i]))
        .filter(|s| !s.is_empty());
    // Length comes from the cleaned sequence; no length column is
    // reliably present in the source format.
    let length = sequence.as_deref().map(str::len).unwrap_or(0);

    for id in split_strand_ids(&row[strand_col]) {
        chains.push(Chain {
            id,
            kind,
            sequence: sequence.clone(),
            length,
            organism: None,
        });
    }
}

/// Expand a comma-separated strand id list.
///
/// One polymer entity can map to several chain letters
/// (`pdbx_strand_id = "A,B"`); each becomes its own chain sharing the
/// entity's type and sequence.
pub fn split_strand_ids(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "?" && *s != ".")
        .map(String::from)
        .collect()
}

/// Map an `_entity_poly.type` value onto a chain kind.
///
/// The same vocabulary appears in the GraphQL metadata, so the mapping
/// is shared with the enrichment client.
pub(crate) fn entity_kind(value: &str) -> ChainKind {
    let v = value.to_ascii_lowercase();
    if v.contains("polypeptide") {
        ChainKind::Protein
    } else if v.contains("polydeoxyribonucleotide") {
        ChainKind::Dna
    } else if v.contains("polyribonucleotide") {
        ChainKind::Rna
    } else if v.contains("water") {
        ChainKind::Water
    } else {
        ChainKind::Ligand
    }
}

/// Strip whitespace and null markers from a one-letter sequence value.
fn clean_sequence(value: &str) -> String {
    if value == "?" || value == "." {
        return String::new();
    }
    value.chars().filter(|c| !c.is_whitespace()).collect()
}
