//! File collection: walk a project tree, apply the exclusion rules, and
//! return categorised, path-sorted source files, plus an ASCII rendering of
//! the folder structure.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};

use crate::contract::Category;
use crate::job::Progress;

/// File extensions treated as code/content worth collecting.
const CODE_EXTENSIONS: &[&str] = &[
    ".py", ".java", ".js", ".jsx", ".ts", ".tsx", ".html", ".css", ".scss", ".sass", ".c",
    ".cpp", ".cs", ".h", ".hpp", ".go", ".rs", ".rb", ".php", ".swift", ".scala", ".groovy",
    ".pl", ".sh", ".bat", ".ps1", ".sql", ".r", ".dart", ".lua", ".clj", ".ex", ".exs", ".erl",
    ".fs", ".f90", ".ml", ".hs", ".json", ".xml", ".yaml", ".yml", ".toml", ".ini", ".md",
    ".vue", ".svelte", ".elm",
];

/// Build-output and binary extensions excluded even when listed above.
const EXCLUDED_FILE_EXTENSIONS: &[&str] = &[
    ".kt", ".kts", ".jar", ".properties", ".pbxproj", ".xcconfig", ".xcworkspacedata",
    ".xcscheme", ".plist", ".jks", ".keystore", ".apk", ".ipa", ".so", ".a", ".dylib",
    ".framework", ".class", ".dex", ".o", ".d", ".iml", ".gradle", ".lock", ".bin",
];

/// Directory names skipped wherever they appear in the tree.
const COMMON_EXCLUDED_DIRS: &[&str] = &[
    ".git", "node_modules", "__pycache__", "venv", "env", ".venv", ".env", "dist", "build",
    "obj", "bin", "__MACOSX", ".trash", ".expo", ".gradle", "gradle", "Images.xcassets",
    "Local Podspecs", "Pods", "libs", "jniLibs", "intermediates", "generated", "outputs",
    "tmp", "temp", "captures", "release", "debug", "caches", "xcuserdata", "xcshareddata",
    "DerivedData", "Classes", "Frameworks", "Headers", "PrivateHeaders", "buildSrc", "log",
    "logs", ".next", "vendor", "bower_components", ".nuxt", ".cache", "coverage", "target",
];

/// Specific files excluded by exact name.
const EXCLUDED_FILES: &[&str] = &[
    "package-lock.json", "yarn.lock", "pnpm-lock.yaml", "composer.lock", "Gemfile.lock",
    "poetry.lock", "Cargo.lock", "go.sum", ".DS_Store", "thumbs.db", "ehthumbs.db",
    "desktop.ini", ".gitkeep", ".gitattributes", ".gitignore", ".npmignore", ".env.local",
    ".env.development", ".env.test", ".env.production", ".eslintcache", ".eslintignore",
    "tsconfig.tsbuildinfo", "junit.xml", "coverage.xml", ".coverage", "coverage-final.json",
    "debug.log", "npm-debug.log", "yarn-debug.log", "yarn-error.log", "pnpm-debug.log",
    "stats.json", "gradlew.bat", "AppDelegate.h", "Podfile.properties.json",
];

/// Wildcard file-name exclusions, compiled to anchored regexes.
const EXCLUDED_FILE_PATTERNS: &[&str] = &[r"^report\..*\.json$"];

/// Path fragments that classify a file as belonging to the iOS platform.
const IOS_PATH_PATTERNS: &[&str] = &[
    "ios/", ".xcodeproj/", ".xcworkspace/", ".pbxproj", ".storyboard", ".xib", ".swift",
    "Images.xcassets/", ".h",
];

/// Path fragments that classify a file as belonging to the Android platform.
const ANDROID_PATH_PATTERNS: &[&str] = &[
    "android/", "gradle/", ".gradle", ".xml", "AndroidManifest.xml", ".properties",
];

/// Collection rules: what to include, what to skip, how to classify.
#[derive(Debug, Clone)]
pub struct CollectConfig {
    pub code_extensions: Vec<String>,
    pub excluded_dirs: Vec<String>,
    pub excluded_extensions: Vec<String>,
    pub excluded_files: Vec<String>,
    pub excluded_file_patterns: Vec<Regex>,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            code_extensions: CODE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            excluded_dirs: COMMON_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            excluded_extensions: EXCLUDED_FILE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            excluded_files: EXCLUDED_FILES.iter().map(|s| s.to_string()).collect(),
            excluded_file_patterns: EXCLUDED_FILE_PATTERNS
                .iter()
                .map(|p| Regex::new(p).expect("builtin exclusion pattern must compile"))
                .collect(),
        }
    }
}

impl CollectConfig {
    fn dir_excluded(&self, name: &str) -> bool {
        self.excluded_dirs.iter().any(|d| d == name)
    }

    fn file_excluded(&self, name: &str) -> bool {
        if name.starts_with("._") {
            return true;
        }
        if self.excluded_files.iter().any(|f| f == name) {
            return true;
        }
        if self.excluded_file_patterns.iter().any(|re| re.is_match(name)) {
            return true;
        }
        self.excluded_extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }

    fn is_code_file(&self, name: &str) -> bool {
        self.code_extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }
}

/// One collected source file: project-relative path plus its absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub rel_path: String,
    pub abs_path: PathBuf,
}

/// Path-sorted files per category.
#[derive(Debug, Clone, Default)]
pub struct CategorisedFiles {
    pub regular: Vec<SourceFile>,
    pub ios: Vec<SourceFile>,
    pub android: Vec<SourceFile>,
}

impl CategorisedFiles {
    pub fn get(&self, category: Category) -> &[SourceFile] {
        match category {
            Category::Regular => &self.regular,
            Category::Ios => &self.ios,
            Category::Android => &self.android,
        }
    }

    pub fn total(&self) -> usize {
        self.regular.len() + self.ios.len() + self.android.len()
    }
}

fn classify(rel_path: &str) -> Category {
    let normalised = rel_path.replace('\\', "/");
    if IOS_PATH_PATTERNS.iter().any(|p| normalised.contains(p)) {
        Category::Ios
    } else if ANDROID_PATH_PATTERNS.iter().any(|p| normalised.contains(p)) {
        Category::Android
    } else {
        Category::Regular
    }
}

/// Walk the project tree and return categorised, path-sorted source files.
///
/// Collection occupies the 0-40% band of the job's progress bar.
pub fn collect_files(
    root: &Path,
    config: &CollectConfig,
    progress: &Progress,
) -> std::io::Result<CategorisedFiles> {
    progress.percent(0, "Counting files...", "Scanning directory structure");

    let mut found: Vec<(Category, SourceFile)> = Vec::new();
    visit_dir(root, root, config, progress, &mut found)?;

    let total = found.len();
    let mut files = CategorisedFiles::default();
    for (i, (category, file)) in found.into_iter().enumerate() {
        debug!(category = category.label(), path = %file.rel_path, "Collected file");
        if total > 0 {
            let pct = ((i + 1) * 40 / total) as u8;
            progress.percent(
                pct,
                &format!("Collecting files ({}/{})", i + 1, total),
                &format!("Found [{}]: {}", category.label(), file.rel_path),
            );
        }
        match category {
            Category::Regular => files.regular.push(file),
            Category::Ios => files.ios.push(file),
            Category::Android => files.android.push(file),
        }
    }

    // Sort by path for an organised presentation.
    files.regular.sort_by(|a, b| a.rel_path.to_lowercase().cmp(&b.rel_path.to_lowercase()));
    files.ios.sort_by(|a, b| a.rel_path.to_lowercase().cmp(&b.rel_path.to_lowercase()));
    files
        .android
        .sort_by(|a, b| a.rel_path.to_lowercase().cmp(&b.rel_path.to_lowercase()));

    info!(
        regular = files.regular.len(),
        ios = files.ios.len(),
        android = files.android.len(),
        "File collection complete"
    );
    progress.percent(
        40,
        "File collection complete",
        &format!(
            "Found {} regular files, {} iOS files, {} Android files",
            files.regular.len(),
            files.ios.len(),
            files.android.len()
        ),
    );
    Ok(files)
}

fn visit_dir(
    dir: &Path,
    root: &Path,
    config: &CollectConfig,
    progress: &Progress,
    results: &mut Vec<(Category, SourceFile)>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() {
            if config.dir_excluded(&name) {
                progress.log(&format!("Skipping excluded directory: {}", path.display()), "info");
                debug!(path = %path.display(), "Skipping excluded directory");
                continue;
            }
            visit_dir(&path, root, config, progress, results)?;
        } else if path.is_file() {
            if config.file_excluded(&name) {
                debug!(path = %path.display(), "Skipping excluded file");
                continue;
            }
            if !config.is_code_file(&name) {
                continue;
            }
            let rel_path = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            results.push((
                classify(&rel_path),
                SourceFile {
                    rel_path,
                    abs_path: path,
                },
            ));
        }
    }
    Ok(())
}

/// Render the folder structure as an ASCII tree: `+--` marks a branch, `|`
/// marks continuation. Directories sort before files, both
/// case-insensitively; excluded directories are omitted.
pub fn folder_tree(root: &Path, config: &CollectConfig) -> String {
    let mut out = String::new();
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());
    out.push_str(&name);
    out.push_str("/\n");
    tree_children(root, config, &mut Vec::new(), &mut out);
    out
}

fn tree_children(dir: &Path, config: &CollectConfig, prefix: &mut Vec<bool>, out: &mut String) {
    let mut entries: Vec<(bool, String, PathBuf)> = match std::fs::read_dir(dir) {
        Ok(iter) => iter
            .filter_map(|e| e.ok())
            .map(|e| {
                let p = e.path();
                (p.is_dir(), e.file_name().to_string_lossy().into_owned(), p)
            })
            .filter(|(is_dir, name, _)| {
                !name.starts_with("._") && !(*is_dir && config.dir_excluded(name))
            })
            .collect(),
        Err(_) => {
            let indent: String = prefix
                .iter()
                .map(|more| if *more { "|   " } else { "    " })
                .collect();
            out.push_str(&indent);
            out.push_str("    (Access error)\n");
            return;
        }
    };
    // Directories first, then case-insensitive by name.
    entries.sort_by(|a, b| (!a.0, a.1.to_lowercase()).cmp(&(!b.0, b.1.to_lowercase())));

    let count = entries.len();
    for (i, (is_dir, name, path)) in entries.into_iter().enumerate() {
        let last = i == count - 1;
        let indent: String = prefix
            .iter()
            .map(|more| if *more { "|   " } else { "    " })
            .collect();
        out.push_str(&indent);
        out.push_str("+-- ");
        out.push_str(&name);
        if is_dir {
            out.push('/');
        }
        out.push('\n');
        if is_dir {
            prefix.push(!last);
            tree_children(&path, config, prefix, out);
            prefix.pop();
        }
    }
}
