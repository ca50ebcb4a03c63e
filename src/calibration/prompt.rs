use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;

use super::groups::{parse_group_line, GroupSet};

const BANNER: &str = "\
Enter groups, one per line. Format examples:
  A1,A2 -> blank
  B1,B2 -> 2.0
Finish with an empty line.";

const PROMPT: &str = "group> ";

/// Ask for blank wells and standard groups on `input`, echoing prompts and
/// complaints to `output`.
///
/// An empty line or end of input finishes. A malformed line is explained
/// and asked for again; nothing else is consumed.
pub fn prompt_groups<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<GroupSet> {
    writeln!(output, "{BANNER}")?;
    let mut groups = GroupSet::default();
    let mut line = String::new();

    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line).context("reading group line")? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }
        match parse_group_line(trimmed) {
            Ok(parsed) => groups.apply(parsed),
            Err(e) => {
                warn!("rejected group line {trimmed:?}: {e}");
                writeln!(output, "{}; try again", capitalize(&e.to_string()))?;
            }
        }
    }
    Ok(groups)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Read groups from a script file using the same line protocol.
/// Blank lines and `#` comments are skipped; a malformed line is fatal.
pub fn read_group_file(path: &Path) -> Result<GroupSet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading group file {}", path.display()))?;
    parse_group_script(&text).with_context(|| format!("in group file {}", path.display()))
}

fn parse_group_script(text: &str) -> Result<GroupSet> {
    let mut groups = GroupSet::default();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parsed = parse_group_line(line).with_context(|| format!("line {}", i + 1))?;
        groups.apply(parsed);
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn run(script: &str) -> (GroupSet, String) {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut output = Vec::new();
        let groups = prompt_groups(&mut input, &mut output).unwrap();
        (groups, String::from_utf8(output).unwrap())
    }

    #[test]
    fn empty_line_finishes_input() {
        let (groups, _) = run("A1,A2 -> blank\nB1 -> 2.0\n\nC1 -> 3.0\n");
        assert_eq!(groups.blanks.len(), 2);
        assert_eq!(groups.standards.len(), 1);
    }

    #[test]
    fn end_of_input_finishes_without_trailing_newline() {
        let (groups, output) = run("B1 -> 1");
        assert_eq!(groups.standards.len(), 1);
        assert!(output.starts_with("Enter groups"));
    }

    #[test]
    fn malformed_lines_reprompt() {
        let (groups, output) = run("B1 -> abc\nB1 2.0\nB1 -> 2.0\n\n");
        assert_eq!(groups.standards.len(), 1);
        assert_eq!(groups.standards[0].concentration, 2.0);
        assert!(output.contains("Could not parse concentration 'abc'"));
        assert!(output.contains("Invalid format"));
        assert_eq!(output.matches(PROMPT).count(), 4);
    }

    #[test]
    fn script_skips_comments_and_blank_lines() {
        let groups = parse_group_script("# blanks\nA1 -> blank\n\nB1 -> 1\nB2 -> 2\n").unwrap();
        assert_eq!(groups.blanks.len(), 1);
        assert_eq!(groups.standards.len(), 2);
    }

    #[test]
    fn script_errors_name_the_line() {
        let err = parse_group_script("A1 -> blank\nB1 -> lots\n").unwrap_err();
        assert!(format!("{err:#}").starts_with("line 2"));
    }
}
