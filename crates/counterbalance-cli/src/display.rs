//! Terminal rendering for presentations, order matrices, and table dumps.

use arrow::record_batch::RecordBatch;
use counterbalance_core::OrderMatrix;
use counterbalance_store::{OrderSource, Presentation};

const MAX_CONTENT_CHARS: usize = 96;

// ── Public API ──

/// Print a participant's documents as a numbered list, in presentation order.
pub fn print_presentation(user_id: &str, p: &Presentation) {
    println!("=== {} / query {} ===", user_id, p.query_id);
    println!("{}", p.query_text);
    println!("  {:<12} {}", "source", describe_source(p.source));
    println!();

    if p.documents.is_empty() {
        println!("  (no documents)");
        return;
    }
    for (slot, doc) in p.documents.iter().enumerate() {
        println!(
            "  {:>2}. [{:>4}] {}",
            slot + 1,
            doc.display_no,
            truncate(&doc.content, MAX_CONTENT_CHARS)
        );
    }
}

/// Print just the ids, comma-separated, for scripting.
pub fn print_ids(p: &Presentation) {
    let ids: Vec<String> = p.documents.iter().map(|d| d.id.to_string()).collect();
    println!("{}", ids.join(","));
}

pub fn print_matrix(matrix: &OrderMatrix) {
    print!("{}", format_matrix(matrix));
}

/// Pretty-print Arrow batches as a table.
pub fn print_batches(batches: &[RecordBatch]) -> anyhow::Result<()> {
    if batches.iter().all(|b| b.num_rows() == 0) {
        println!("(no rows)");
        return Ok(());
    }
    arrow::util::pretty::print_batches(batches)?;
    Ok(())
}

// ── Formatting ──

fn describe_source(source: OrderSource) -> String {
    match source {
        OrderSource::Stored => "stored".to_string(),
        OrderSource::Generated { row } => format!("generated (row {row})"),
        OrderSource::Fallback => "fallback (too few candidates, unpermuted)".to_string(),
        OrderSource::NoCandidates => "no candidates".to_string(),
        OrderSource::ConflictResolved => "stored by a concurrent request".to_string(),
    }
}

fn format_matrix(matrix: &OrderMatrix) -> String {
    let n = matrix.dimension();
    let width = n.to_string().len();
    let mut out = format!(
        "{:?} {n}x{n}, column balanced: {}\n",
        matrix.construction(),
        if matrix.is_column_balanced() { "yes" } else { "no" }
    );
    for (i, row) in matrix.rows().iter().enumerate() {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:>width$}")).collect();
        out.push_str(&format!("{:>width$}: {}\n", i, cells.join(" ")));
    }
    out
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}
