use std::sync::LazyLock;

use regex::Regex;

use super::EnrichmentError;

const MIN_COLUMNS: usize = 2;
const MIN_ROWS: usize = 2;
const MAX_CELL_CHARS: usize = 200;
const MAX_SCAN_LINES: usize = 200_000;

static COLUMN_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t+| {2,}").expect("column gap pattern"));

/// A stretch of extracted text: either prose or a detected table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextBlock {
    Prose(String),
    Table(Vec<Vec<String>>),
}

fn cells(line: &str) -> Vec<String> {
    COLUMN_GAP
        .split(line.trim())
        .map(|cell| cell.trim().to_string())
        .filter(|cell| !cell.is_empty())
        .collect()
}

fn flush_run<'a>(
    run: &mut Vec<(&'a str, Vec<String>)>,
    prose: &mut Vec<&'a str>,
    blocks: &mut Vec<TextBlock>,
) {
    if run.len() >= MIN_ROWS {
        if !prose.is_empty() {
            blocks.push(TextBlock::Prose(prose.join("\n")));
            prose.clear();
        }
        blocks.push(TextBlock::Table(run.drain(..).map(|(_, c)| c).collect()));
    } else {
        prose.extend(run.drain(..).map(|(line, _)| line));
    }
}

/// Finds runs of at least two lines that split into the same number (≥2) of
/// whitespace-delimited columns.
pub fn detect_tables(text: &str) -> Result<Vec<TextBlock>, EnrichmentError> {
    let lines = text.lines().count();
    if lines > MAX_SCAN_LINES {
        return Err(EnrichmentError::InputTooLarge {
            size: lines,
            limit: MAX_SCAN_LINES,
        });
    }

    let mut blocks = Vec::new();
    let mut prose: Vec<&str> = Vec::new();
    let mut run: Vec<(&str, Vec<String>)> = Vec::new();

    for line in text.lines() {
        let row = cells(line);
        let columnar = row.len() >= MIN_COLUMNS
            && row.iter().all(|c| c.chars().count() <= MAX_CELL_CHARS);
        let continues = run.first().is_some_and(|(_, first)| first.len() == row.len());
        if columnar && (run.is_empty() || continues) {
            run.push((line, row));
            continue;
        }

        flush_run(&mut run, &mut prose, &mut blocks);
        if columnar {
            run.push((line, row));
        } else {
            prose.push(line);
        }
    }
    flush_run(&mut run, &mut prose, &mut blocks);
    if !prose.is_empty() {
        blocks.push(TextBlock::Prose(prose.join("\n")));
    }

    Ok(blocks)
}

/// Fixed-width rendering with a rule under the first row.
pub fn render_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render_row = |row: &Vec<String>| {
        widths
            .iter()
            .enumerate()
            .map(|(i, width)| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                format!("{cell:<width$}")
            })
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (index, row) in rows.iter().enumerate() {
        lines.push(render_row(row));
        if index == 0 {
            lines.push(
                widths
                    .iter()
                    .map(|w| "-".repeat(*w))
                    .collect::<Vec<_>>()
                    .join("-+-"),
            );
        }
    }
    lines.join("\n")
}
