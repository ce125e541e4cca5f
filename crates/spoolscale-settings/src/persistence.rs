//! Saved variables persistence
//!
//! Klipper's `SAVE_VARIABLE` command keeps a `[Variables]` section in
//! `saved_vars.cfg`, one `key = value` per line with each value written as
//! a Python literal. [`VariablesFile`] edits that file line by line and
//! implements the core [`SettingsStore`] contract on top of it.
//!
//! Lines for keys that are never set are written back exactly as read, so
//! literals this module does not understand (dicts, lists, `True`) survive.
//! Values that are set are written as literals Klipper can evaluate.

use crate::error::{ConfigFileError, SettingsError, SettingsResult};
use spoolscale_core::settings::{keys, SettingsStore};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Section holding the variables
pub const VARIABLES_SECTION: &str = "Variables";

/// Keys always written as strings, even when they look numeric
const TEXT_KEYS: [&str; 1] = [keys::ACTIVE_SPOOL_ID];

/// `saved_vars.cfg` backed settings store
#[derive(Debug, Clone)]
pub struct VariablesFile {
    path: PathBuf,
    lines: Vec<String>,
}

impl VariablesFile {
    /// Read a variables file
    ///
    /// The file must exist and contain a `[Variables]` section. Values are
    /// not evaluated until they are read.
    pub fn open(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::LoadError(format!("{}: {}", path.display(), e)))?;
        let file = Self {
            path: path.to_path_buf(),
            lines: content.lines().map(str::to_string).collect(),
        };
        if file.section().is_none() {
            tracing::error!("No section [{}] in {}", VARIABLES_SECTION, path.display());
            return Err(ConfigFileError::MissingSection(VARIABLES_SECTION.to_string()).into());
        }
        tracing::debug!("Read saved variables from {}", path.display());
        Ok(file)
    }

    /// Create an empty variables file in memory; nothing is written until persisted
    pub fn create(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            lines: vec![format!("[{}]", VARIABLES_SECTION)],
        }
    }

    /// File location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the file back to disk
    pub fn save(&self) -> SettingsResult<()> {
        let mut content = self.lines.join("\n");
        content.push('\n');
        let tmp = self.path.with_extension("cfg.tmp");
        std::fs::write(&tmp, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", self.path.display(), e)))?;
        tracing::debug!("Saved variables to {}", self.path.display());
        Ok(())
    }

    /// Body of the `[Variables]` section, header excluded
    fn section(&self) -> Option<Range<usize>> {
        let header = self
            .lines
            .iter()
            .position(|l| section_name(l) == Some(VARIABLES_SECTION))?;
        let start = header + 1;
        let end = self.lines[start..]
            .iter()
            .position(|l| section_name(l).is_some())
            .map_or(self.lines.len(), |i| start + i);
        Some(start..end)
    }

    /// The key line for `key` plus its continuation lines
    fn entry(&self, key: &str) -> Option<Range<usize>> {
        let section = self.section()?;
        let start = section.clone().find(|&i| {
            split_entry(&self.lines[i]).is_some_and(|(k, _)| k.eq_ignore_ascii_case(key))
        })?;
        let end = (start + 1..section.end)
            .find(|&i| !is_continuation(&self.lines[i]))
            .unwrap_or(section.end);
        Some(start..end)
    }
}

impl SettingsStore for VariablesFile {
    fn get(&self, key: &str) -> Option<String> {
        let entry = self.entry(key)?;
        let (_, first) = split_entry(&self.lines[entry.start])?;
        let mut raw = first.to_string();
        for line in &self.lines[entry.start + 1..entry.end] {
            raw.push('\n');
            raw.push_str(line.trim());
        }
        Some(decode_literal(&raw))
    }

    fn set(&mut self, key: &str, value: &str) {
        let literal = if TEXT_KEYS.contains(&key) {
            quote(value)
        } else {
            encode_literal(value)
        };
        let line = format!("{} = {}", key, literal);

        if let Some(entry) = self.entry(key) {
            self.lines[entry.start] = line;
            self.lines.drain(entry.start + 1..entry.end);
            return;
        }
        match self.section() {
            Some(section) => {
                let at = section
                    .clone()
                    .rev()
                    .find(|&i| !self.lines[i].trim().is_empty())
                    .map_or(section.start, |i| i + 1);
                self.lines.insert(at, line);
            }
            None => {
                self.lines.push(format!("[{}]", VARIABLES_SECTION));
                self.lines.push(line);
            }
        }
    }

    fn persist(&mut self) -> spoolscale_core::Result<()> {
        Ok(self.save()?)
    }
}

/// Name of a `[section]` header; indented lines continue a value instead
fn section_name(line: &str) -> Option<&str> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    line.trim_end()
        .strip_prefix('[')?
        .strip_suffix(']')
        .map(str::trim)
}

/// Split a `key = value` line; comments, headers and continuations are not entries
fn split_entry(line: &str) -> Option<(&str, &str)> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let line = line.trim();
    if line.is_empty() || line.starts_with(['#', ';']) || section_name(line).is_some() {
        return None;
    }
    let at = line.find(['=', ':'])?;
    Some((line[..at].trim(), line[at + 1..].trim()))
}

fn is_continuation(line: &str) -> bool {
    line.starts_with(char::is_whitespace) && !line.trim().is_empty()
}

/// Read a Python literal as a settings string
///
/// Strings are unquoted, `True`/`False` become `true`/`false` and `None`
/// is empty. Anything else (numbers, dicts, lists) is returned as written.
fn decode_literal(raw: &str) -> String {
    match raw {
        "True" => return "true".to_string(),
        "False" => return "false".to_string(),
        "None" => return String::new(),
        _ => {}
    }
    let quoted_with = |q: char| raw.len() >= 2 && raw.starts_with(q) && raw.ends_with(q);
    if quoted_with('\'') || quoted_with('"') {
        return unescape(&raw[1..raw.len() - 1]);
    }
    raw.to_string()
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(c @ ('\\' | '\'' | '"')) => out.push(c),
            Some(c) => {
                out.push('\\');
                out.push(c);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Write a settings string as a Python literal; finite numbers stay bare
fn encode_literal(value: &str) -> String {
    if value.parse::<i64>().is_ok() || value.parse::<f64>().is_ok_and(f64::is_finite) {
        return value.to_string();
    }
    quote(value)
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content: &str) -> VariablesFile {
        VariablesFile {
            path: PathBuf::from("saved_vars.cfg"),
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    #[test]
    fn test_decode_klipper_literals() {
        assert_eq!(decode_literal("'PLA01'"), "PLA01");
        assert_eq!(decode_literal("\"PLA01\""), "PLA01");
        assert_eq!(decode_literal("12.5"), "12.5");
        assert_eq!(decode_literal("True"), "true");
        assert_eq!(decode_literal("None"), "");
        assert_eq!(decode_literal("'it\\'s'"), "it's");
        assert_eq!(decode_literal("{'x': 1}"), "{'x': 1}");
        assert_eq!(decode_literal("'"), "'");
    }

    #[test]
    fn test_encode_literal() {
        assert_eq!(encode_literal("17"), "17");
        assert_eq!(encode_literal("-12.5"), "-12.5");
        assert_eq!(encode_literal("PLA01"), "'PLA01'");
        assert_eq!(encode_literal(""), "''");
        assert_eq!(encode_literal("NaN"), "'NaN'");
        assert_eq!(encode_literal("a'b\\c"), "'a\\'b\\\\c'");
        assert_eq!(decode_literal(&encode_literal("a'b\\c\nd")), "a'b\\c\nd");
    }

    #[test]
    fn test_create_then_set() {
        let mut vars = VariablesFile::create(Path::new("saved_vars.cfg"));
        assert_eq!(vars.get("extra_weight"), None);
        vars.set("extra_weight", "20");
        assert_eq!(vars.get("extra_weight").as_deref(), Some("20"));
        assert_eq!(vars.lines, vec!["[Variables]", "extra_weight = 20"]);
    }

    #[test]
    fn test_set_touches_only_its_own_line() {
        let mut vars = file(
            "# written by klipper\n[Variables]\nbed_mesh = {'x': 1,\n    'y': [1, 2]}\nheater_off = True\nlast_tool = None\nactive_spool_id = 'OLD'\n\n[other]\nkey = 1\n",
        );
        assert_eq!(vars.get("bed_mesh").as_deref(), Some("{'x': 1,\n'y': [1, 2]}"));
        assert_eq!(vars.get("last_tool").as_deref(), Some(""));
        assert_eq!(vars.get("key"), None);

        vars.set("active_spool_id", "123");
        vars.set("extra_weight", "20.5");
        vars.set("bed_mesh", "flat");
        assert_eq!(
            vars.lines,
            vec![
                "# written by klipper",
                "[Variables]",
                "bed_mesh = 'flat'",
                "heater_off = True",
                "last_tool = None",
                "active_spool_id = '123'",
                "extra_weight = 20.5",
                "",
                "[other]",
                "key = 1",
            ]
        );
    }
}
