use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScrapeError};
use crate::utils::{is_tool_id, tool_from_url};

const CATEGORIES_DIR: &str = "categories";
const DATA_DIR: &str = "data";
const CSV_DIR: &str = "csv";

/// On-disk layout: `categories/<category>`, `data/<tool>`, `csv/<name>.csv`.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Store { root: root.into() }
    }

    pub fn category_path(&self, category: &str) -> PathBuf {
        self.root.join(CATEGORIES_DIR).join(category)
    }

    /// Identifiers that would leave `data/` are refused.
    pub fn raw_path(&self, tool: &str) -> Result<PathBuf> {
        if !is_tool_id(tool) {
            return Err(ScrapeError::InvalidTool {
                tool: tool.to_string(),
            });
        }
        Ok(self.root.join(DATA_DIR).join(tool))
    }

    pub fn csv_path(&self, name: &str) -> PathBuf {
        self.root.join(CSV_DIR).join(format!("{}.csv", name))
    }

    /// Tool identifiers of a category, in file order. Lines may hold full
    /// tool URLs or bare identifiers; blank lines are ignored.
    pub fn read_category(&self, category: &str) -> Result<Vec<String>> {
        let path = self.category_path(category);
        let content = fs::read_to_string(&path).map_err(|e| ScrapeError::io(&path, e))?;
        Ok(content.lines().filter_map(tool_from_url).collect())
    }

    /// Overwrites any existing listing for the category.
    pub fn write_category<S: AsRef<str>>(&self, category: &str, tools: &[S]) -> Result<()> {
        let body: String = tools
            .iter()
            .map(|t| format!("{}\n", t.as_ref()))
            .collect();
        write_file(&self.category_path(category), &body)
    }

    pub fn list_categories(&self) -> Result<Vec<String>> {
        list_dir(&self.root.join(CATEGORIES_DIR))
    }

    pub fn has_raw(&self, tool: &str) -> bool {
        self.raw_path(tool).is_ok_and(|path| path.is_file())
    }

    pub fn read_raw(&self, tool: &str) -> Result<String> {
        let path = self.raw_path(tool)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ScrapeError::MissingRecord {
                tool: tool.to_string(),
            }),
            Err(e) => Err(ScrapeError::io(&path, e)),
        }
    }

    pub fn write_raw(&self, tool: &str, content: &str) -> Result<()> {
        write_file(&self.raw_path(tool)?, content)
    }

    /// Every fetched tool, sorted by identifier.
    pub fn list_raw_tools(&self) -> Result<Vec<String>> {
        list_dir(&self.root.join(DATA_DIR))
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ScrapeError::io(parent, e))?;
    }
    fs::write(path, content).map_err(|e| ScrapeError::io(path, e))
}

/// Sorted file names of a directory; a missing directory is empty.
fn list_dir(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ScrapeError::io(dir, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ScrapeError::io(dir, e))?;
        if entry.path().is_file() {
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_roundtrip_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        store.write_category("human-resources", &["a", "b", "c"]).unwrap();
        store.write_category("human-resources", &["d"]).unwrap();
        assert_eq!(store.read_category("human-resources").unwrap(), vec!["d"]);
    }

    #[test]
    fn category_reader_accepts_urls_and_bare_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        fs::create_dir_all(dir.path().join("categories")).unwrap();
        fs::write(
            store.category_path("mixed"),
            "https://www.futurepedia.io/tool/chatgpt\n\njasper\nhttps://www.futurepedia.io/tool/tome/\n",
        )
        .unwrap();
        assert_eq!(
            store.read_category("mixed").unwrap(),
            vec!["chatgpt", "jasper", "tome"]
        );
    }

    #[test]
    fn missing_category_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        assert!(matches!(
            store.read_category("nope"),
            Err(ScrapeError::Io { .. })
        ));
    }

    #[test]
    fn raw_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        assert!(!store.has_raw("acme"));
        assert!(matches!(
            store.read_raw("acme"),
            Err(ScrapeError::MissingRecord { .. })
        ));

        store.write_raw("zeta", "z").unwrap();
        store.write_raw("acme", "Product Information\n\n").unwrap();
        assert!(store.has_raw("acme"));
        assert_eq!(store.read_raw("acme").unwrap(), "Product Information\n\n");
        assert_eq!(store.list_raw_tools().unwrap(), vec!["acme", "zeta"]);
    }

    #[test]
    fn raw_paths_stay_inside_data() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("root"));
        for tool in ["..", "../escape", "a/b", ""] {
            assert!(matches!(
                store.write_raw(tool, "x"),
                Err(ScrapeError::InvalidTool { .. })
            ));
            assert!(!store.has_raw(tool));
        }
        assert!(!dir.path().join("escape").exists());
        assert!(matches!(
            store.read_raw(".."),
            Err(ScrapeError::InvalidTool { .. })
        ));
    }

    #[test]
    fn category_reader_drops_non_tool_links() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        store
            .write_category(
                "legacy",
                &[
                    "https://www.futurepedia.io/",
                    "https://www.futurepedia.io/ai-tools/video",
                    "https://www.futurepedia.io/tool/chatgpt",
                    "..",
                ],
            )
            .unwrap();
        assert_eq!(store.read_category("legacy").unwrap(), vec!["chatgpt"]);
    }

    #[test]
    fn listing_a_fresh_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        assert!(store.list_raw_tools().unwrap().is_empty());
        assert!(store.list_categories().unwrap().is_empty());
    }
}
