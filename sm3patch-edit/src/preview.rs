use camino::Utf8PathBuf;
use diffy::PatchFormatter;
use std::collections::BTreeMap;

/// Unified diff between the first-seen and current content of every touched file.
///
/// `None` means the file did not exist.
pub fn render_patch(
    before: &BTreeMap<Utf8PathBuf, Option<String>>,
    after: &BTreeMap<Utf8PathBuf, Option<String>>,
) -> String {
    let mut out = String::new();
    let formatter = PatchFormatter::new();

    for (path, old) in before {
        let new = after.get(path).unwrap_or(old);
        if old == new {
            continue;
        }
        let old_text = old.as_deref().unwrap_or("");
        let new_text = new.as_deref().unwrap_or("");

        out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
        match old {
            Some(_) => out.push_str(&format!("--- a/{path}\n")),
            None => out.push_str("--- /dev/null\n"),
        }
        out.push_str(&format!("+++ b/{path}\n"));

        let patch = diffy::create_patch(old_text, new_text);
        let text = formatter.fmt_patch(&patch).to_string();
        // diffy labels the sides "original"/"modified"; the git-style header above replaces them.
        let body = text
            .strip_prefix("--- original\n+++ modified\n")
            .unwrap_or(&text);
        out.push_str(body);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_files_are_omitted() {
        let mut before = BTreeMap::new();
        before.insert(Utf8PathBuf::from("a.cs"), Some("x\n".to_string()));
        let after = before.clone();
        assert_eq!(render_patch(&before, &after), "");
    }

    #[test]
    fn new_file_diffs_against_dev_null() {
        let mut before = BTreeMap::new();
        before.insert(Utf8PathBuf::from("src/New.cs"), None);
        let mut after = BTreeMap::new();
        after.insert(Utf8PathBuf::from("src/New.cs"), Some("class New {}\n".to_string()));

        let patch = render_patch(&before, &after);
        assert!(patch.starts_with("diff --git a/src/New.cs b/src/New.cs\n--- /dev/null\n+++ b/src/New.cs\n"));
        assert!(patch.contains("+class New {}"));
        assert!(!patch.contains("original"));
    }

    #[test]
    fn modified_file_shows_inserted_lines() {
        let mut before = BTreeMap::new();
        before.insert(Utf8PathBuf::from("a.cs"), Some("one\nthree\n".to_string()));
        let mut after = BTreeMap::new();
        after.insert(Utf8PathBuf::from("a.cs"), Some("one\ntwo\nthree\n".to_string()));

        let patch = render_patch(&before, &after);
        assert!(patch.contains("--- a/a.cs\n+++ b/a.cs\n"));
        assert!(patch.contains("+two"));
    }
}
