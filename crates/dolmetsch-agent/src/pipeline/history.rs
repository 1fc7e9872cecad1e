//! Fixed-width table of a conversation's translation log.

use dolmetsch_core::TranslationLogEntry;

pub const EMPTY_HISTORY: &str = "No translations yet.";

/// Render the log as a bordered two-column table.
///
/// Column widths are the longest cell of each column, header included,
/// measured in characters. Line breaks inside a cell are shown as spaces so
/// every row stays on one line.
pub fn render_table(entries: &[TranslationLogEntry], target_label: &str) -> String {
    let rows: Vec<[String; 2]> = entries
        .iter()
        .map(|e| [one_line(&e.original), one_line(&e.translated)])
        .collect();
    let header = ["Original".to_string(), target_label.to_string()];

    let mut widths = [0usize; 2];
    for row in std::iter::once(&header).chain(rows.iter()) {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule = format!(
        "+{}+{}+",
        "-".repeat(widths[0] + 2),
        "-".repeat(widths[1] + 2)
    );

    let mut lines = vec![rule.clone(), format_row(&header, &widths), rule.clone()];
    lines.extend(rows.iter().map(|row| format_row(row, &widths)));
    lines.push(rule);
    lines.join("\n")
}

fn format_row(cells: &[String; 2], widths: &[usize; 2]) -> String {
    format!(
        "| {} | {} |",
        pad(&cells[0], widths[0]),
        pad(&cells[1], widths[1])
    )
}

fn pad(cell: &str, width: usize) -> String {
    let fill = width.saturating_sub(cell.chars().count());
    format!("{}{}", cell, " ".repeat(fill))
}

fn one_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(original: &str, translated: &str) -> TranslationLogEntry {
        TranslationLogEntry {
            original: original.to_string(),
            translated: translated.to_string(),
        }
    }

    #[test]
    fn table_layout() {
        let table = render_table(
            &[entry("hello", "hallo"), entry("good morning", "guten Morgen")],
            "German",
        );
        let expected = "\
+--------------+--------------+
| Original     | German       |
+--------------+--------------+
| hello        | hallo        |
| good morning | guten Morgen |
+--------------+--------------+";
        assert_eq!(table, expected);
    }

    #[test]
    fn header_can_be_the_widest_cell() {
        let table = render_table(&[entry("a", "b")], "German");
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[1], "| Original | German |");
        assert_eq!(lines[3], "| a        | b      |");
    }

    #[test]
    fn all_lines_share_border_positions() {
        let table = render_table(
            &[entry("Straße", "street"), entry("naïve café", "naiv Café"), entry("x", "")],
            "English",
        );
        let lines: Vec<Vec<char>> = table.lines().map(|l| l.chars().collect()).collect();
        let len = lines[0].len();
        assert!(lines.iter().all(|l| l.len() == len));

        let separators: Vec<usize> = lines[0]
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == '+')
            .map(|(i, _)| i)
            .collect();
        for line in &lines {
            for &i in &separators {
                assert!(matches!(line[i], '+' | '|'));
            }
        }
        // "naïve café" is the widest original: 10 chars + 2 padding
        assert_eq!(separators[1] - separators[0] - 1, 12);
    }

    #[test]
    fn multiline_cells_are_flattened() {
        let table = render_table(&[entry("one\ntwo", "eins\r\nzwei")], "German");
        assert!(table.contains("| one two  | eins zwei |"));
        assert_eq!(table.lines().count(), 5);
    }
}
