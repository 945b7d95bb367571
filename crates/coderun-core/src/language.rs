//! Language profile table
//!
//! Every supported language is a row of argument templates. Templates may
//! contain the placeholders below, substituted per execution:
//! - `{FILE}` - source file name inside the workspace
//! - `{STEM}` - source file name without extension
//! - `{DIR}` - absolute workspace path
//! - `{MEMORY_KB}` / `{MEMORY_MB}` - memory budget

use crate::{entry, CoderunError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// How the source file inside the workspace is named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileNaming {
    /// Always use the profile's default file name
    Default,
    /// Name the file after the first `public class`, falling back to the default stem
    PublicType,
}

/// Static description of how to compile and run one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageProfile {
    pub id: String,
    pub display_name: String,
    /// Extension including the leading dot
    pub extension: String,
    pub default_file_name: String,
    pub requires_compilation: bool,
    pub file_naming: FileNaming,
    pub compile: Vec<String>,
    pub run: Vec<String>,
}

impl LanguageProfile {
    pub fn new(id: &str, display_name: &str, extension: &str, default_file_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            extension: extension.to_string(),
            default_file_name: default_file_name.to_string(),
            requires_compilation: false,
            file_naming: FileNaming::Default,
            compile: Vec::new(),
            run: Vec::new(),
        }
    }

    #[must_use]
    pub fn compile_with(mut self, args: &[&str]) -> Self {
        self.compile = args.iter().map(ToString::to_string).collect();
        self.requires_compilation = true;
        self
    }

    #[must_use]
    pub fn run_with(mut self, args: &[&str]) -> Self {
        self.run = args.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn named_by_public_type(mut self) -> Self {
        self.file_naming = FileNaming::PublicType;
        self
    }

    /// File name the source is written to
    pub fn file_name(&self, source: &str) -> String {
        match self.file_naming {
            FileNaming::Default => self.default_file_name.clone(),
            FileNaming::PublicType => {
                let name = entry::public_type_name(source)
                    .unwrap_or_else(|| file_stem(&self.default_file_name).to_string());
                format!("{name}{}", self.extension)
            }
        }
    }

    /// Compile argument list; empty means there is no compile phase
    pub fn compile_command(&self, source_file: &Path, work_dir: &Path) -> Vec<String> {
        let command = render(&self.compile, source_file, work_dir, 0);
        tracing::debug!(language = %self.id, ?command, "compile command");
        command
    }

    /// Run argument list parameterized by the memory budget
    pub fn run_command(
        &self,
        source_file: &Path,
        work_dir: &Path,
        memory_limit: u64,
    ) -> Result<Vec<String>> {
        if self.run.is_empty() {
            return Err(CoderunError::UnsupportedLanguage(self.id.clone()));
        }
        let command = render(&self.run, source_file, work_dir, memory_limit);
        tracing::debug!(language = %self.id, ?command, "run command");
        Ok(command)
    }

    pub fn info(&self) -> LanguageInfo {
        LanguageInfo {
            id: self.id.clone(),
            name: self.display_name.clone(),
            extension: self.extension.clone(),
        }
    }
}

/// Public listing entry for a supported language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub id: String,
    pub name: String,
    pub extension: String,
}

fn file_stem(file_name: &str) -> &str {
    file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem)
}

fn render(template: &[String], source_file: &Path, work_dir: &Path, memory_limit: u64) -> Vec<String> {
    let file = source_file
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_stem(&file).to_string();
    let dir = work_dir.to_string_lossy();
    let memory_kb = (memory_limit / 1024).to_string();
    let memory_mb = (memory_limit / 1024 / 1024).to_string();

    let vars = [
        ("{FILE}", file.as_str()),
        ("{STEM}", stem.as_str()),
        ("{DIR}", dir.as_ref()),
        ("{MEMORY_KB}", memory_kb.as_str()),
        ("{MEMORY_MB}", memory_mb.as_str()),
    ];

    template
        .iter()
        .map(|arg| {
            vars.iter()
                .fold(arg.clone(), |acc, (key, value)| acc.replace(key, value))
        })
        .collect()
}

/// Immutable registry of language profiles, looked up by identifier
#[derive(Debug, Clone, Default)]
pub struct LanguageTable {
    profiles: Vec<LanguageProfile>,
}

static BUILTIN: Lazy<Arc<LanguageTable>> = Lazy::new(|| Arc::new(LanguageTable::new(builtin_profiles())));

impl LanguageTable {
    pub fn new(profiles: Vec<LanguageProfile>) -> Self {
        Self { profiles }
    }

    /// The process-wide table of built-in languages
    pub fn builtin() -> Arc<Self> {
        Arc::clone(&BUILTIN)
    }

    /// Case-insensitive lookup by identifier
    pub fn resolve(&self, id: &str) -> Result<&LanguageProfile> {
        let id = id.trim();
        self.profiles
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| CoderunError::UnknownLanguage(id.to_string()))
    }

    pub fn profiles(&self) -> &[LanguageProfile] {
        &self.profiles
    }

    pub fn languages(&self) -> Vec<LanguageInfo> {
        self.profiles.iter().map(LanguageProfile::info).collect()
    }
}

fn builtin_profiles() -> Vec<LanguageProfile> {
    vec![
        LanguageProfile::new("java", "Java", ".java", "Main.java")
            .named_by_public_type()
            .compile_with(&["javac", "{FILE}"])
            .run_with(&["java", "-Xmx{MEMORY_KB}k", "{STEM}"]),
        LanguageProfile::new("python", "Python", ".py", "main.py").run_with(&["python3", "{FILE}"]),
        LanguageProfile::new("javascript", "JavaScript", ".js", "main.js")
            .run_with(&["node", "--max-old-space-size={MEMORY_MB}", "{FILE}"]),
        LanguageProfile::new("typescript", "TypeScript", ".ts", "main.ts")
            .compile_with(&["npx", "tsc", "--outDir", ".", "{FILE}"])
            .run_with(&["node", "--max-old-space-size={MEMORY_MB}", "{STEM}.js"]),
        LanguageProfile::new("c", "C", ".c", "main.c")
            .compile_with(&["gcc", "-o", "{STEM}", "{FILE}"])
            .run_with(&["./{STEM}"]),
        LanguageProfile::new("cpp", "C++", ".cpp", "main.cpp")
            .compile_with(&["g++", "-o", "{STEM}", "{FILE}"])
            .run_with(&["./{STEM}"]),
        LanguageProfile::new("go", "Go", ".go", "main.go").run_with(&["go", "run", "{FILE}"]),
        LanguageProfile::new("rust", "Rust", ".rs", "main.rs")
            .compile_with(&["rustc", "-o", "{STEM}", "{FILE}"])
            .run_with(&["./{STEM}"]),
        LanguageProfile::new("ruby", "Ruby", ".rb", "main.rb").run_with(&["ruby", "{FILE}"]),
        LanguageProfile::new("php", "PHP", ".php", "main.php").run_with(&["php", "{FILE}"]),
        LanguageProfile::new("kotlin", "Kotlin", ".kt", "Main.kt")
            .compile_with(&["kotlinc", "{FILE}", "-include-runtime", "-d", "{STEM}.jar"])
            .run_with(&["java", "-Xmx{MEMORY_KB}k", "-jar", "{STEM}.jar"]),
        LanguageProfile::new("swift", "Swift", ".swift", "main.swift").run_with(&["swift", "{FILE}"]),
        LanguageProfile::new("perl", "Perl", ".pl", "main.pl").run_with(&["perl", "{FILE}"]),
        LanguageProfile::new("bash", "Bash", ".sh", "main.sh").run_with(&["bash", "{FILE}"]),
    ]
}
