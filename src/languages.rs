//! Language launch recipes
//!
//! Each supported language is a variant of the closed `Language` enum and
//! owns one `LaunchRecipe`: the scratch source file name, any wrapping the
//! source needs to read piped stdin, an optional compile step and the run
//! command. Toolchain binaries come from `files/languages.toml`; a language
//! whose table is missing there is treated as unsupported.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;
use thiserror::Error;

use crate::runner::CommandSpec;

/// Languages a submission may be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    Java,
    Cpp,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::JavaScript,
        Language::Java,
        Language::Cpp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Java => "java",
            Language::Cpp => "cpp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Language not supported: {0}")]
pub struct UnsupportedLanguage(pub String);

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" | "python3" | "py" => Ok(Language::Python),
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            "java" => Ok(Language::Java),
            "cpp" | "c++" | "cxx" => Ok(Language::Cpp),
            _ => Err(UnsupportedLanguage(s.to_string())),
        }
    }
}

/// How to materialize, build and launch a program in one language
pub trait LaunchRecipe: Send + Sync + fmt::Debug {
    /// File name the source is written to inside the scratch directory
    fn source_file(&self) -> &'static str;

    /// Final source text written to disk
    fn render_source(&self, code: &str) -> String {
        code.to_string()
    }

    /// Compile step, if the language needs one
    fn compile_command(&self, _dir: &Path) -> Option<CommandSpec> {
        None
    }

    fn run_command(&self, dir: &Path) -> CommandSpec;
}

#[derive(Debug, Clone)]
pub struct PythonRecipe {
    interpreter: String,
}

impl LaunchRecipe for PythonRecipe {
    fn source_file(&self) -> &'static str {
        "main.py"
    }

    fn run_command(&self, dir: &Path) -> CommandSpec {
        CommandSpec::new(&self.interpreter)
            .with_args([path_arg(&dir.join(self.source_file()))])
            .with_work_dir(dir)
    }
}

#[derive(Debug, Clone)]
pub struct JavaScriptRecipe {
    interpreter: String,
}

impl LaunchRecipe for JavaScriptRecipe {
    fn source_file(&self) -> &'static str {
        "main.js"
    }

    /// Submissions read stdin through an `input` array of lines, filled
    /// before the submitted code runs.
    fn render_source(&self, code: &str) -> String {
        format!(
            r#"
const readline = require('readline');
const rl = readline.createInterface({{
    input: process.stdin,
    output: process.stdout
}});

let input = [];
rl.on('line', (line) => {{
    input.push(line);
}});

rl.on('close', () => {{
    {code}
}});
"#
        )
    }

    fn run_command(&self, dir: &Path) -> CommandSpec {
        CommandSpec::new(&self.interpreter)
            .with_args([path_arg(&dir.join(self.source_file()))])
            .with_work_dir(dir)
    }
}

#[derive(Debug, Clone)]
pub struct JavaRecipe {
    compiler: String,
    runtime: String,
}

impl LaunchRecipe for JavaRecipe {
    fn source_file(&self) -> &'static str {
        "Main.java"
    }

    fn compile_command(&self, dir: &Path) -> Option<CommandSpec> {
        Some(
            CommandSpec::new(&self.compiler)
                .with_args([
                    "-encoding".to_string(),
                    "UTF-8".to_string(),
                    "-d".to_string(),
                    path_arg(dir),
                    path_arg(&dir.join(self.source_file())),
                ])
                .with_work_dir(dir),
        )
    }

    fn run_command(&self, dir: &Path) -> CommandSpec {
        CommandSpec::new(&self.runtime)
            .with_args(["-cp".to_string(), path_arg(dir), "Main".to_string()])
            .with_work_dir(dir)
    }
}

#[derive(Debug, Clone)]
pub struct CppRecipe {
    compiler: String,
    flags: Vec<String>,
}

const CPP_BINARY: &str = "main";

impl LaunchRecipe for CppRecipe {
    fn source_file(&self) -> &'static str {
        "main.cpp"
    }

    fn compile_command(&self, dir: &Path) -> Option<CommandSpec> {
        let mut args = self.flags.clone();
        args.push("-o".to_string());
        args.push(path_arg(&dir.join(CPP_BINARY)));
        args.push(path_arg(&dir.join(self.source_file())));
        Some(
            CommandSpec::new(&self.compiler)
                .with_args(args)
                .with_work_dir(dir),
        )
    }

    fn run_command(&self, dir: &Path) -> CommandSpec {
        CommandSpec::new(path_arg(&dir.join(CPP_BINARY))).with_work_dir(dir)
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Raw TOML configuration
#[derive(Debug, Default, Deserialize)]
struct RawToolchains {
    python: Option<RawInterpreter>,
    javascript: Option<RawInterpreter>,
    java: Option<RawJava>,
    cpp: Option<RawCpp>,
}

#[derive(Debug, Deserialize)]
struct RawInterpreter {
    interpreter: String,
}

#[derive(Debug, Deserialize)]
struct RawJava {
    compiler: String,
    runtime: String,
}

#[derive(Debug, Deserialize)]
struct RawCpp {
    compiler: String,
    #[serde(default)]
    flags: Vec<String>,
}

/// Recipes for every enabled language
#[derive(Debug, Default)]
pub struct LanguageRegistry {
    python: Option<PythonRecipe>,
    javascript: Option<JavaScriptRecipe>,
    java: Option<JavaRecipe>,
    cpp: Option<CppRecipe>,
}

impl LanguageRegistry {
    /// Registry built from the `files/languages.toml` shipped with the crate
    pub fn builtin() -> anyhow::Result<Self> {
        let content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));
        Self::from_toml(content)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read language config {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid language config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let raw: RawToolchains = toml::from_str(content)?;

        Ok(Self {
            python: raw.python.map(|p| PythonRecipe {
                interpreter: p.interpreter,
            }),
            javascript: raw.javascript.map(|js| JavaScriptRecipe {
                interpreter: js.interpreter,
            }),
            java: raw.java.map(|j| JavaRecipe {
                compiler: j.compiler,
                runtime: j.runtime,
            }),
            cpp: raw.cpp.map(|c| CppRecipe {
                compiler: c.compiler,
                flags: c.flags,
            }),
        })
    }

    /// Recipe for `language`, or `None` when its toolchain is not configured
    pub fn recipe(&self, language: Language) -> Option<&dyn LaunchRecipe> {
        match language {
            Language::Python => self.python.as_ref().map(|r| r as &dyn LaunchRecipe),
            Language::JavaScript => self.javascript.as_ref().map(|r| r as &dyn LaunchRecipe),
            Language::Java => self.java.as_ref().map(|r| r as &dyn LaunchRecipe),
            Language::Cpp => self.cpp.as_ref().map(|r| r as &dyn LaunchRecipe),
        }
    }

    pub fn supported_languages(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|lang| self.recipe(*lang).is_some())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_config_enables_all_languages() {
        let registry = LanguageRegistry::builtin().unwrap();
        assert_eq!(registry.supported_languages(), Language::ALL.to_vec());
    }

    #[test]
    fn test_parse_language_aliases() {
        assert_eq!("Python".parse::<Language>(), Ok(Language::Python));
        assert_eq!("py".parse::<Language>(), Ok(Language::Python));
        assert_eq!("node".parse::<Language>(), Ok(Language::JavaScript));
        assert_eq!("c++".parse::<Language>(), Ok(Language::Cpp));
        assert_eq!(
            "rust".parse::<Language>(),
            Err(UnsupportedLanguage("rust".to_string()))
        );
    }

    #[test]
    fn test_missing_table_disables_language() {
        let registry = LanguageRegistry::from_toml(
            r#"
[python]
interpreter = "python3"
"#,
        )
        .unwrap();

        assert!(registry.recipe(Language::Python).is_some());
        assert!(registry.recipe(Language::Java).is_none());
        assert_eq!(registry.supported_languages(), vec![Language::Python]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[cpp]
compiler = "clang++"
flags = ["-O2"]
"#
        )
        .unwrap();

        let registry = LanguageRegistry::load(file.path()).unwrap();
        let recipe = registry.recipe(Language::Cpp).unwrap();
        let compile = recipe.compile_command(Path::new("/scratch")).unwrap();
        assert_eq!(compile.program, "clang++");
        assert_eq!(
            compile.args,
            vec!["-O2", "-o", "/scratch/main", "/scratch/main.cpp"]
        );
    }

    #[test]
    fn test_python_runs_source_directly() {
        let recipe = PythonRecipe {
            interpreter: "python3".into(),
        };
        let dir = Path::new("/scratch");

        assert!(recipe.compile_command(dir).is_none());
        assert_eq!(recipe.render_source("print(1)"), "print(1)");

        let run = recipe.run_command(dir);
        assert_eq!(run.program, "python3");
        assert_eq!(run.args, vec!["/scratch/main.py"]);
        assert_eq!(run.work_dir.as_deref(), Some(dir));
    }

    #[test]
    fn test_javascript_wraps_code_in_stdin_harness() {
        let recipe = JavaScriptRecipe {
            interpreter: "node".into(),
        };
        let source = recipe.render_source("console.log(input[0]);");

        assert!(source.contains("require('readline')"));
        assert!(source.contains("input.push(line);"));
        let close_handler = source.find("rl.on('close'").unwrap();
        let code = source.find("console.log(input[0]);").unwrap();
        assert!(code > close_handler);
    }

    #[test]
    fn test_java_compiles_then_runs_main_class() {
        let recipe = JavaRecipe {
            compiler: "javac".into(),
            runtime: "java".into(),
        };
        let dir = Path::new("/scratch");

        assert_eq!(recipe.source_file(), "Main.java");
        let compile = recipe.compile_command(dir).unwrap();
        assert_eq!(compile.program, "javac");
        assert!(compile.args.contains(&"/scratch/Main.java".to_string()));

        let run = recipe.run_command(dir);
        assert_eq!(run.program, "java");
        assert_eq!(run.args, vec!["-cp", "/scratch", "Main"]);
    }

    #[test]
    fn test_cpp_runs_compiled_binary() {
        let registry = LanguageRegistry::builtin().unwrap();
        let recipe = registry.recipe(Language::Cpp).unwrap();
        let run = recipe.run_command(Path::new("/scratch"));
        assert_eq!(run.program, "/scratch/main");
        assert!(run.args.is_empty());
    }
}
