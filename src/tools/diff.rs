const CONTEXT_LINES: usize = 3;
const MAX_LCS_CELLS: usize = 4_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// Renders a unified diff with three lines of context, or an empty string
/// when the texts are line-for-line identical.
pub fn unified_diff(old: &str, new: &str, label: &str) -> String {
    let old_lines = old.lines().collect::<Vec<_>>();
    let new_lines = new.lines().collect::<Vec<_>>();
    let script = edit_script(&old_lines, &new_lines);
    if script.iter().all(|(op, _)| *op == Op::Equal) {
        return String::new();
    }

    // Line offsets into old/new before each op.
    let mut old_pos = Vec::with_capacity(script.len() + 1);
    let mut new_pos = Vec::with_capacity(script.len() + 1);
    let (mut o, mut n) = (0, 0);
    for (op, _) in &script {
        old_pos.push(o);
        new_pos.push(n);
        match op {
            Op::Equal => {
                o += 1;
                n += 1;
            }
            Op::Delete => o += 1,
            Op::Insert => n += 1,
        }
    }
    old_pos.push(o);
    new_pos.push(n);

    let mut out = vec![format!("--- {label}"), format!("+++ {label}")];
    for (start, end) in hunk_ranges(&script) {
        out.push(format!(
            "@@ -{} +{} @@",
            format_range(old_pos[start], old_pos[end]),
            format_range(new_pos[start], new_pos[end])
        ));
        for (op, line) in &script[start..end] {
            let marker = match op {
                Op::Equal => ' ',
                Op::Delete => '-',
                Op::Insert => '+',
            };
            out.push(format!("{marker}{line}"));
        }
    }
    out.join("\n")
}

fn edit_script<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<(Op, &'a str)> {
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mut script = old[..prefix]
        .iter()
        .map(|line| (Op::Equal, *line))
        .collect::<Vec<_>>();

    if old_mid.len().saturating_mul(new_mid.len()) > MAX_LCS_CELLS {
        script.extend(old_mid.iter().map(|line| (Op::Delete, *line)));
        script.extend(new_mid.iter().map(|line| (Op::Insert, *line)));
    } else {
        script.extend(lcs_script(old_mid, new_mid));
    }

    script.extend(
        old[old.len() - suffix..]
            .iter()
            .map(|line| (Op::Equal, *line)),
    );
    script
}

fn lcs_script<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<(Op, &'a str)> {
    let (rows, cols) = (old.len(), new.len());
    let mut table = vec![0_u32; (rows + 1) * (cols + 1)];
    let at = |i: usize, j: usize| i * (cols + 1) + j;
    for i in (0..rows).rev() {
        for j in (0..cols).rev() {
            table[at(i, j)] = if old[i] == new[j] {
                table[at(i + 1, j + 1)] + 1
            } else {
                table[at(i + 1, j)].max(table[at(i, j + 1)])
            };
        }
    }

    let mut script = Vec::with_capacity(rows + cols);
    let (mut i, mut j) = (0, 0);
    while i < rows && j < cols {
        if old[i] == new[j] {
            script.push((Op::Equal, old[i]));
            i += 1;
            j += 1;
        } else if table[at(i + 1, j)] >= table[at(i, j + 1)] {
            script.push((Op::Delete, old[i]));
            i += 1;
        } else {
            script.push((Op::Insert, new[j]));
            j += 1;
        }
    }
    script.extend(old[i..].iter().map(|line| (Op::Delete, *line)));
    script.extend(new[j..].iter().map(|line| (Op::Insert, *line)));
    script
}

fn hunk_ranges(script: &[(Op, &str)]) -> Vec<(usize, usize)> {
    let changes = script
        .iter()
        .enumerate()
        .filter(|(_, (op, _))| *op != Op::Equal)
        .map(|(index, _)| index)
        .collect::<Vec<_>>();
    let mut ranges = Vec::new();
    let Some(&first) = changes.first() else {
        return ranges;
    };

    let mut start = first.saturating_sub(CONTEXT_LINES);
    let mut last = first;
    for &index in &changes[1..] {
        if index - last - 1 > 2 * CONTEXT_LINES {
            ranges.push((start, (last + 1 + CONTEXT_LINES).min(script.len())));
            start = index - CONTEXT_LINES;
        }
        last = index;
    }
    ranges.push((start, (last + 1 + CONTEXT_LINES).min(script.len())));
    ranges
}

fn format_range(start: usize, stop: usize) -> String {
    let length = stop - start;
    match length {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{length}", start + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_produce_no_diff() {
        assert_eq!(unified_diff("a\nb\n", "a\nb", "f.txt"), "");
    }

    #[test]
    fn new_file_diff_adds_every_line() {
        let diff = unified_diff("", "one\ntwo", "notes.md");
        assert_eq!(diff, "--- notes.md\n+++ notes.md\n@@ -0,0 +1,2 @@\n+one\n+two");
    }

    #[test]
    fn single_line_change_keeps_three_lines_of_context() {
        let old = "1\n2\n3\n4\n5\n6\n7\n8\n9";
        let new = "1\n2\n3\n4\nfive\n6\n7\n8\n9";
        let diff = unified_diff(old, new, "n.txt");
        assert_eq!(
            diff,
            "--- n.txt\n+++ n.txt\n@@ -2,7 +2,7 @@\n 2\n 3\n 4\n-5\n+five\n 6\n 7\n 8"
        );
    }

    #[test]
    fn distant_changes_split_into_separate_hunks() {
        let old = (1..=20).map(|n| n.to_string()).collect::<Vec<_>>().join("\n");
        let new = (1..=20)
            .map(|n| match n {
                2 => "two".to_string(),
                19 => "nineteen".to_string(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n");
        let diff = unified_diff(&old, &new, "n.txt");
        assert_eq!(diff.matches("@@ -").count(), 2);
    }
}
