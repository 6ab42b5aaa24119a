//! Script languages and the per-language facts the lock cache relies on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Script language, named as the remote API names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python3,
    Deno,
    Bun,
    Nativets,
    Go,
    Bash,
    Powershell,
    Php,
    Rust,
    Csharp,
    Java,
    Ansible,
    Nu,
    Graphql,
    Postgresql,
    Mysql,
    Bigquery,
    Snowflake,
    Mssql,
    Oracledb,
    Duckdb,
}

/// Double extensions checked before the plain ones. Order matters.
const COMPOUND_EXTENSIONS: &[(&str, Language)] = &[
    (".bun.ts", Language::Bun),
    (".deno.ts", Language::Deno),
    (".fetch.ts", Language::Nativets),
    (".playbook.yml", Language::Ansible),
    (".pg.sql", Language::Postgresql),
    (".my.sql", Language::Mysql),
    (".bq.sql", Language::Bigquery),
    (".sf.sql", Language::Snowflake),
    (".ms.sql", Language::Mssql),
    (".odb.sql", Language::Oracledb),
    (".duckdb.sql", Language::Duckdb),
];

const PLAIN_EXTENSIONS: &[(&str, Language)] = &[
    (".py", Language::Python3),
    (".go", Language::Go),
    (".sh", Language::Bash),
    (".ps1", Language::Powershell),
    (".php", Language::Php),
    (".rs", Language::Rust),
    (".cs", Language::Csharp),
    (".java", Language::Java),
    (".nu", Language::Nu),
    (".gql", Language::Graphql),
];

impl Language {
    pub fn all() -> &'static [Language] {
        &[
            Language::Python3,
            Language::Deno,
            Language::Bun,
            Language::Nativets,
            Language::Go,
            Language::Bash,
            Language::Powershell,
            Language::Php,
            Language::Rust,
            Language::Csharp,
            Language::Java,
            Language::Ansible,
            Language::Nu,
            Language::Graphql,
            Language::Postgresql,
            Language::Mysql,
            Language::Bigquery,
            Language::Snowflake,
            Language::Mssql,
            Language::Oracledb,
            Language::Duckdb,
        ]
    }

    /// Infer the language of a script file from its name.
    ///
    /// A bare `.ts` file takes `default_ts`, which the sync configuration
    /// chooses between `bun` and `deno`.
    pub fn from_script_path(path: &str, default_ts: Language) -> Option<Language> {
        if let Some((_, lang)) = COMPOUND_EXTENSIONS.iter().find(|(ext, _)| path.ends_with(ext)) {
            return Some(*lang);
        }
        if path.ends_with(".ts") {
            return Some(default_ts);
        }
        PLAIN_EXTENSIONS
            .iter()
            .find(|(ext, _)| path.ends_with(ext))
            .map(|(_, lang)| *lang)
    }

    /// Prefix of a single-line comment.
    pub fn comment_prefix(self) -> &'static str {
        match self {
            Language::Python3
            | Language::Bash
            | Language::Powershell
            | Language::Ansible
            | Language::Nu
            | Language::Graphql => "#",
            Language::Postgresql
            | Language::Mysql
            | Language::Bigquery
            | Language::Snowflake
            | Language::Mssql
            | Language::Oracledb
            | Language::Duckdb => "--",
            _ => "//",
        }
    }

    /// Keyword of the inline dependency annotation, for languages that have one.
    pub fn dependency_keyword(self) -> Option<&'static str> {
        match self {
            Language::Python3 => Some("requirements"),
            Language::Bun | Language::Nativets => Some("package_json"),
            Language::Go => Some("go_mod"),
            Language::Php => Some("composer_json"),
            _ => None,
        }
    }

    /// File name of the workspace-level dependency manifest for this language.
    pub fn dependency_file_name(self) -> Option<&'static str> {
        match self {
            Language::Python3 => Some("requirements.in"),
            Language::Bun | Language::Nativets => Some("package.json"),
            Language::Go => Some("go.mod"),
            Language::Php => Some("composer.json"),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python3 => "python3",
            Language::Deno => "deno",
            Language::Bun => "bun",
            Language::Nativets => "nativets",
            Language::Go => "go",
            Language::Bash => "bash",
            Language::Powershell => "powershell",
            Language::Php => "php",
            Language::Rust => "rust",
            Language::Csharp => "csharp",
            Language::Java => "java",
            Language::Ansible => "ansible",
            Language::Nu => "nu",
            Language::Graphql => "graphql",
            Language::Postgresql => "postgresql",
            Language::Mysql => "mysql",
            Language::Bigquery => "bigquery",
            Language::Snowflake => "snowflake",
            Language::Mssql => "mssql",
            Language::Oracledb => "oracledb",
            Language::Duckdb => "duckdb",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Language::all()
            .iter()
            .copied()
            .find(|language| language.as_str() == name)
            .ok_or_else(|| format!("unknown language '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_extensions_win_over_plain_ts() {
        assert_eq!(
            Language::from_script_path("f/a/x.bun.ts", Language::Deno),
            Some(Language::Bun)
        );
        assert_eq!(
            Language::from_script_path("f/a/x.ts", Language::Deno),
            Some(Language::Deno)
        );
        assert_eq!(
            Language::from_script_path("f/a/q.pg.sql", Language::Bun),
            Some(Language::Postgresql)
        );
        assert_eq!(Language::from_script_path("f/a/readme.md", Language::Bun), None);
    }

    #[test]
    fn parses_api_names() {
        assert_eq!("python3".parse::<Language>(), Ok(Language::Python3));
        assert_eq!("nativets".parse::<Language>(), Ok(Language::Nativets));
        assert!("cobol".parse::<Language>().is_err());
        assert!("Python3".parse::<Language>().is_err());
    }

    #[test]
    fn every_language_parses_from_its_display_name() {
        for language in Language::all() {
            assert_eq!(language.to_string().parse::<Language>(), Ok(*language));
        }
    }
}
