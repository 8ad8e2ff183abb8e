use crate::application::ports::{PdfPage, TextFragment};

/// Fragments whose baselines differ by at most this much share a line.
pub const LINE_TOLERANCE: f32 = 2.0;

/// Lays out extracted fragments top-to-bottom, then left-to-right within a line.
/// Pages are emitted in page order and separated by a blank line.
pub fn render_in_reading_order(mut pages: Vec<PdfPage>) -> String {
    pages.sort_by_key(|p| p.number);

    pages
        .into_iter()
        .map(|page| render_page(page.fragments))
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_page(mut fragments: Vec<TextFragment>) -> String {
    fragments.retain(|f| !f.text.trim().is_empty());
    fragments.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<Vec<TextFragment>> = Vec::new();
    let mut line_y = f32::NEG_INFINITY;
    for fragment in fragments {
        match lines.last_mut() {
            Some(line) if (fragment.y - line_y).abs() <= LINE_TOLERANCE => line.push(fragment),
            _ => {
                line_y = fragment.y;
                lines.push(vec![fragment]);
            }
        }
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| a.x.total_cmp(&b.x));
            line.iter()
                .map(|f| f.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
