mod commands;
mod config;
mod expand;
mod logging;
mod store;
mod validators;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info, warn};
use unicode_width::UnicodeWidthStr;

use crate::commands::{ReservedNames, parse_slash_command};
use crate::config::{Config, LoadedConfig};
use crate::expand::Arguments;
use crate::store::{Catalog, PromptEntry};

/// Maximum width of the template preview in `list` output.
const PREVIEW_MAX_LEN: usize = 60;

#[derive(Debug, Parser)]
#[command(name = "promptdeck", version, about = "Reusable Markdown prompts as slash commands")]
struct Cli {
    /// Project root containing `.codex/prompts` (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    project_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the prompts available in this session
    List {
        /// Only list prompts whose name contains this text (case-insensitive)
        query: Option<String>,
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a prompt's template
    Show {
        /// Prompt name, with or without the leading /
        name: String,
    },
    /// Expand `/name args...` into the message that would be sent
    Expand {
        /// The slash input; read from stdin when omitted. Separate shell
        /// words are separate arguments; a single word is split like typed input
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        input: Vec<String>,
    },
    /// Show where prompts are loaded from
    Paths,
}

/// Everything resolved once at session start.
struct Session {
    project_dir: PathBuf,
    personal_dir: Option<PathBuf>,
    reserved: ReservedNames,
    catalog: Catalog,
}

impl Session {
    /// Resolve prompt directories and build the catalog.
    ///
    /// An unavailable catalog is reported and replaced with an empty one.
    fn start(project_root: &Path, config: &Config) -> Self {
        let project_dir = config.project_prompts_path(project_root);
        let personal_dir = config.personal_prompts_path();
        let reserved: ReservedNames = config.reserved_names();

        let catalog = match store::build_catalog(&project_dir, personal_dir.as_deref(), &reserved) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(error = %e, "catalog_unavailable");
                eprintln!("Warning: {}", e);
                Catalog::empty()
            }
        };

        debug!(
            project_dir = ?project_dir,
            personal_dir = ?personal_dir,
            reserved = reserved.len(),
            prompts = ?catalog.names().collect::<Vec<_>>(),
            "session_catalog_ready"
        );

        Self {
            project_dir,
            personal_dir,
            reserved,
            catalog,
        }
    }
}

/// Slash input as it reached the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Invocation {
    /// One line split like typed input (stdin or a single shell word).
    Line(String),
    /// Words the shell already split. The first names the prompt and the
    /// rest are arguments, one each.
    Words(Vec<String>),
}

impl Invocation {
    /// Classify command-line words, `None` when there are none.
    fn from_args(mut input: Vec<String>) -> Option<Self> {
        match input.len() {
            0 => None,
            1 => input.pop().map(Self::Line),
            _ => Some(Self::Words(input)),
        }
    }

    /// Split into the prompt name and its arguments.
    fn parse(&self) -> Option<(&str, InvocationArgs<'_>)> {
        match self {
            Self::Line(line) => {
                let (name, raw_args) = split_invocation(line)?;
                Some((name, InvocationArgs::Raw(raw_args)))
            }
            Self::Words(words) => {
                let (first, rest) = words.split_first()?;
                // `expand "/review a" b` still names the prompt first.
                let (name, head) = split_invocation(first)?;
                let mut args = expand::tokenize(head);
                args.extend(rest.iter().cloned());
                Some((name, InvocationArgs::Words(Arguments::from_words(&args))))
            }
        }
    }
}

/// Arguments following the prompt name.
enum InvocationArgs<'a> {
    /// Typed text, tokenized at expansion.
    Raw(&'a str),
    Words(Arguments),
}

impl InvocationArgs<'_> {
    fn count(&self) -> usize {
        match self {
            Self::Raw(raw) => expand::tokenize(raw).len(),
            Self::Words(args) => args.positional.len(),
        }
    }

    fn expand(&self, template: &str) -> String {
        match self {
            Self::Raw(raw) => expand::expand(template, raw),
            Self::Words(args) => expand::expand_with(template, args),
        }
    }
}

/// Contract a path by replacing the home directory with `~` for display.
fn contract_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(suffix) = path.strip_prefix(&home)
    {
        return format!("~/{}", suffix.display());
    }
    path.display().to_string()
}

/// Truncates a string to the given maximum length, appending "..." if truncated.
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Short description of a prompt, for list previews.
fn preview(entry: &PromptEntry) -> String {
    let description = entry.description();
    if description.is_empty() {
        return "(empty)".to_string();
    }
    truncate_str(&description, PREVIEW_MAX_LEN)
}

/// Format catalog entries as aligned `/name  source  preview` rows.
fn format_rows<'a>(entries: impl Iterator<Item = &'a PromptEntry>) -> Vec<String> {
    let entries: Vec<&PromptEntry> = entries.collect();
    let name_width = entries
        .iter()
        .map(|e| UnicodeWidthStr::width(e.name.as_str()) + 1)
        .max()
        .unwrap_or(0);

    entries
        .iter()
        .map(|e| {
            let name = format!("/{}", e.name);
            let pad = name_width.saturating_sub(UnicodeWidthStr::width(name.as_str()));
            format!(
                "{}{}  {:<8}  {}",
                name,
                " ".repeat(pad),
                e.source.label(),
                preview(e)
            )
        })
        .collect()
}

/// Split user input into a prompt name and its raw arguments.
/// The leading `/` is optional.
fn split_invocation(input: &str) -> Option<(&str, &str)> {
    if let Some(parsed) = parse_slash_command(input) {
        return Some(parsed);
    }
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.find(char::is_whitespace) {
        Some(idx) => Some((&trimmed[..idx], trimmed[idx..].trim_start())),
        None => Some((trimmed, "")),
    }
}

/// Find a prompt by name, explaining built-in collisions.
///
/// The file name works too: `review.md` finds `/review` unless a prompt is
/// literally named `review.md`.
fn resolve<'a>(catalog: &'a Catalog, name: &str) -> Result<&'a PromptEntry> {
    let name = name.strip_prefix('/').unwrap_or(name);
    let name = match name.strip_suffix(store::PROMPT_EXTENSION) {
        Some(stem) if !catalog.contains(name) && catalog.contains(stem) => stem,
        _ => name,
    };
    if let Some(entry) = catalog.get(name) {
        return Ok(entry);
    }
    if let Some(builtin) = commands::builtin(&name.to_lowercase()) {
        bail!(
            "/{} is a built-in command ({}), not a custom prompt",
            builtin.name,
            builtin.description
        );
    }
    bail!("Unknown prompt: /{}", name)
}

/// A `list --json` row.
#[derive(Serialize)]
struct ListedPrompt<'a> {
    #[serde(flatten)]
    entry: &'a PromptEntry,
    description: String,
}

fn run_list(session: &Session, query: Option<&str>, json: bool, out: &mut impl Write) -> Result<()> {
    let query = query.unwrap_or("");
    let matches: Vec<&PromptEntry> = session.catalog.matching(query).collect();

    if json {
        let rows: Vec<ListedPrompt> = matches
            .into_iter()
            .map(|entry| ListedPrompt {
                entry,
                description: entry.description(),
            })
            .collect();
        serde_json::to_writer_pretty(&mut *out, &rows).context("Failed to encode prompts")?;
        writeln!(out)?;
        return Ok(());
    }

    if session.catalog.is_empty() {
        let mut locations = vec![contract_path(&session.project_dir)];
        if let Some(dir) = &session.personal_dir {
            locations.push(contract_path(dir));
        }
        writeln!(
            out,
            "No custom prompts found. Add Markdown files to {}.",
            locations.join(" or ")
        )?;
        return Ok(());
    }

    if matches.is_empty() {
        writeln!(out, "No prompts match \"{}\".", query.trim())?;
        return Ok(());
    }

    for row in format_rows(matches.into_iter()) {
        writeln!(out, "{}", row)?;
    }
    Ok(())
}

fn run_show(session: &Session, name: &str, out: &mut impl Write) -> Result<()> {
    let entry = resolve(&session.catalog, name)?;
    let arity = expand::placeholder_arity(&entry.template);

    writeln!(out, "# /{} ({})", entry.name, contract_path(&entry.path))?;
    if arity > 0 {
        writeln!(out, "# arguments: $1..${}", arity)?;
    }
    writeln!(out)?;
    write!(out, "{}", entry.template)?;
    if !entry.template.ends_with('\n') {
        writeln!(out)?;
    }
    Ok(())
}

fn run_expand(session: &Session, invocation: &Invocation, out: &mut impl Write) -> Result<()> {
    let Some((name, args)) = invocation.parse() else {
        bail!("Nothing to expand: expected `/name [arguments]`");
    };
    let entry = resolve(&session.catalog, name)?;

    let given = args.count();
    let arity = expand::placeholder_arity(&entry.template);
    if given < arity {
        debug!(
            name = %entry.name,
            given,
            referenced = arity,
            "prompt_missing_arguments"
        );
    }

    let message = args.expand(&entry.template);
    info!(name = %entry.name, source = entry.source.label(), len = message.len(), "prompt_expanded");
    write!(out, "{}", message)?;
    if !message.ends_with('\n') {
        writeln!(out)?;
    }
    Ok(())
}

fn run_paths(session: &Session, loaded: &LoadedConfig, out: &mut impl Write) -> Result<()> {
    let status = |path: &Path| {
        validators::validate_prompt_dir(path)
            .map(|e| format!("({})", e))
            .unwrap_or_else(|| "(ok)".to_string())
    };

    writeln!(
        out,
        "project   {} {}",
        contract_path(&session.project_dir),
        status(&session.project_dir)
    )?;
    match &session.personal_dir {
        Some(dir) => writeln!(out, "personal  {} {}", contract_path(dir), status(dir))?,
        None => writeln!(out, "personal  (no home directory)")?,
    }
    writeln!(out, "config    {}", contract_path(&loaded.config_path))?;
    if let Some(project_config) = &loaded.project_config_path {
        writeln!(out, "project config  {}", contract_path(project_config))?;
    }
    if session.reserved.is_empty() {
        writeln!(out, "reserved  (none)")?;
    } else {
        writeln!(out, "reserved  {} names", session.reserved.len())?;
    }
    writeln!(out, "prompts   {}", session.catalog.len())?;
    Ok(())
}

fn run(command: Command, session: &Session, loaded: &LoadedConfig) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Command::List { query, json } => run_list(session, query.as_deref(), json, &mut out),
        Command::Show { name } => run_show(session, &name, &mut out),
        Command::Expand { input } => {
            let invocation = match Invocation::from_args(input) {
                Some(invocation) => invocation,
                None => {
                    let mut buf = String::new();
                    io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read input from stdin")?;
                    Invocation::Line(buf)
                }
            };
            run_expand(session, &invocation, &mut out)
        }
        Command::Paths => run_paths(session, loaded, &mut out),
    }
}

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();

    let project_root = match cli.project_root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let loaded_config = config::load_config(&project_root);

    // Logging is optional; the tool works without it.
    let (session_id, _guard) = match logging::init(&loaded_config.config.logging.level) {
        Ok(ctx) => {
            logging::cleanup_old_logs(&ctx.log_directory);
            (Some(ctx.session_id), Some(ctx._guard))
        }
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            (None, None)
        }
    };

    for problem in loaded_config.problems() {
        warn!(error = %problem, "config_problem");
        eprintln!("Warning: {}", problem);
    }
    info!(
        config_path = %loaded_config.config_path.display(),
        status = ?loaded_config.status,
        "config_loaded"
    );

    let session = Session::start(&project_root, &loaded_config.config);
    let result = run(cli.command, &session, &loaded_config);

    if let Some(sid) = session_id {
        info!(
            session_id = %sid,
            duration_secs = start_time.elapsed().as_secs_f64(),
            "session_end"
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn session_with(files: &[(&str, &str)]) -> (tempfile::TempDir, Session) {
        let tmp = tempdir().unwrap();
        let project_dir = store::project_prompts_dir(tmp.path());
        fs::create_dir_all(&project_dir).unwrap();
        for (name, body) in files {
            fs::write(project_dir.join(name), body).unwrap();
        }
        let catalog =
            store::build_catalog(&project_dir, None, &ReservedNames::builtins()).unwrap();
        let session = Session {
            project_dir,
            personal_dir: None,
            reserved: ReservedNames::builtins(),
            catalog,
        };
        (tmp, session)
    }

    fn output(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_expand_keeps_hyphen_args() {
        let cli = Cli::parse_from(["promptdeck", "expand", "/fix", "--all", "now"]);
        match cli.command {
            Command::Expand { input } => assert_eq!(input, vec!["/fix", "--all", "now"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("abcdefghij", 8), "abcde...");
        assert_eq!(truncate_str("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_preview_uses_description() {
        let (_tmp, session) = session_with(&[
            ("a.md", "\n\n  # Title. More text\nbody"),
            ("b.md", ""),
        ]);
        assert_eq!(preview(session.catalog.get("a").unwrap()), "Title.");
        assert_eq!(preview(session.catalog.get("b").unwrap()), "(empty)");
    }

    #[test]
    fn test_split_invocation() {
        assert_eq!(split_invocation("/review a b"), Some(("review", "a b")));
        assert_eq!(split_invocation("review  \"a b\""), Some(("review", "\"a b\"")));
        assert_eq!(split_invocation("review"), Some(("review", "")));
        assert_eq!(split_invocation("   "), None);
    }

    #[test]
    fn test_expand_end_to_end() {
        let (_tmp, session) = session_with(&[(
            "review.md",
            "Review $1 and $2, notes: $ARGUMENTS",
        )]);
        let line = Invocation::Line(r#"/review file.go "second arg" extra"#.to_string());
        let out = output(|buf| run_expand(&session, &line, buf));
        assert_eq!(
            out,
            "Review file.go and second arg, notes: file.go \"second arg\" extra\n"
        );
    }

    fn expand_cli(session: &Session, argv: &[&str]) -> String {
        let input = match Cli::parse_from(argv.iter().copied()).command {
            Command::Expand { input } => input,
            other => panic!("unexpected command: {:?}", other),
        };
        let invocation = Invocation::from_args(input).unwrap();
        output(|buf| run_expand(session, &invocation, buf))
    }

    #[test]
    fn test_expand_cli_keeps_shell_words_whole() {
        let (_tmp, session) = session_with(&[("check.md", "[$1] [$2] [$3]")]);
        let out = expand_cli(
            &session,
            &["promptdeck", "expand", "/check", "file.go", "second arg", "extra"],
        );
        assert_eq!(out, "[file.go] [second arg] [extra]\n");
    }

    #[test]
    fn test_expand_cli_arguments_requotes_words() {
        let (_tmp, session) = session_with(&[("all.md", "<$ARGUMENTS>")]);
        let out = expand_cli(
            &session,
            &["promptdeck", "expand", "all", "file.go", "second arg", ""],
        );
        assert_eq!(out, "<file.go \"second arg\" \"\">\n");
    }

    #[test]
    fn test_expand_cli_single_word_is_split_like_typed_input() {
        let (_tmp, session) = session_with(&[("check.md", "[$1] [$2] [$ARGUMENTS]")]);
        let out = expand_cli(
            &session,
            &["promptdeck", "expand", "/check  a   'b c'"],
        );
        assert_eq!(out, "[a] [b c] [a   'b c']\n");
    }

    #[test]
    fn test_expand_cli_first_word_with_arguments() {
        let (_tmp, session) = session_with(&[("check.md", "[$1] [$2] [$3]")]);
        let out = expand_cli(&session, &["promptdeck", "expand", "/check a", "b c"]);
        assert_eq!(out, "[a] [b c] []\n");
    }

    #[test]
    fn test_invocation_from_args() {
        assert_eq!(Invocation::from_args(vec![]), None);
        assert_eq!(
            Invocation::from_args(vec!["/x a".to_string()]),
            Some(Invocation::Line("/x a".to_string()))
        );
        assert!(matches!(
            Invocation::from_args(vec!["/x".to_string(), "a".to_string()]),
            Some(Invocation::Words(_))
        ));
    }

    #[test]
    fn test_expand_nothing_to_expand() {
        let (_tmp, session) = session_with(&[]);
        let mut buf = Vec::new();
        let err = run_expand(&session, &Invocation::Line("  \n".to_string()), &mut buf).unwrap_err();
        assert!(err.to_string().starts_with("Nothing to expand"));
    }

    #[test]
    fn test_expand_unknown_prompt_errors() {
        let (_tmp, session) = session_with(&[]);
        let mut buf = Vec::new();
        let err = run_expand(&session, &Invocation::Line("/nope".to_string()), &mut buf).unwrap_err();
        assert_eq!(err.to_string(), "Unknown prompt: /nope");
    }

    #[test]
    fn test_expand_builtin_name_errors() {
        let (_tmp, session) = session_with(&[("init.md", "shadow")]);
        let mut buf = Vec::new();
        let err = run_expand(&session, &Invocation::Line("/init".to_string()), &mut buf).unwrap_err();
        assert!(err.to_string().starts_with("/init is a built-in command"));
    }

    #[test]
    fn test_list_rows() {
        let (_tmp, session) = session_with(&[("b.md", "Second\n"), ("a.md", "First")]);
        let out = output(|buf| run_list(&session, None, false, buf));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("/a  project"));
        assert!(lines[0].ends_with("First"));
        assert!(lines[1].ends_with("Second"));
    }

    #[test]
    fn test_list_empty_catalog() {
        let (_tmp, session) = session_with(&[]);
        let out = output(|buf| run_list(&session, None, false, buf));
        assert!(out.starts_with("No custom prompts found."));
    }

    #[test]
    fn test_list_json() {
        let (_tmp, session) = session_with(&[("a.md", "hi $1")]);
        let out = output(|buf| run_list(&session, None, true, buf));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["name"], "a");
        assert_eq!(value[0]["source"], "project");
        assert_eq!(value[0]["template"], "hi $1");
        assert_eq!(value[0]["description"], "hi $1");
    }

    #[test]
    fn test_list_query_filters_by_name() {
        let (_tmp, session) = session_with(&[
            ("review-pr.md", "Review a pull request."),
            ("Review.md", "Review."),
            ("fix.md", "Fix it."),
        ]);
        let out = output(|buf| run_list(&session, Some("REV"), false, buf));
        let names: Vec<&str> = out
            .lines()
            .map(|l| l.split_whitespace().next().unwrap())
            .collect();
        assert_eq!(names, vec!["/Review", "/review-pr"]);

        let out = output(|buf| run_list(&session, Some("zzz"), false, buf));
        assert_eq!(out, "No prompts match \"zzz\".\n");

        let out = output(|buf| run_list(&session, Some("fix"), true, buf));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["description"], "Fix it.");
    }

    #[test]
    fn test_cli_list_query() {
        let cli = Cli::parse_from(["promptdeck", "list", "rev", "--json"]);
        match cli.command {
            Command::List { query, json } => {
                assert_eq!(query.as_deref(), Some("rev"));
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_accepts_file_name() {
        let (_tmp, session) = session_with(&[("review.md", "r"), ("notes.md.md", "n")]);
        assert!(!session.catalog.contains("review.md"));
        assert_eq!(resolve(&session.catalog, "/review.md").unwrap().name, "review");
        assert_eq!(resolve(&session.catalog, "notes.md").unwrap().name, "notes.md");
        assert!(resolve(&session.catalog, "other.md").is_err());
    }

    #[test]
    fn test_session_start_with_unreadable_dirs_is_empty() {
        let tmp = tempdir().unwrap();
        let project = tmp.path().join("project-prompts");
        let personal = tmp.path().join("personal-prompts");
        fs::write(&project, "").unwrap();
        fs::write(&personal, "").unwrap();

        let mut config = Config::default();
        config.paths.project_prompts = Some(project.display().to_string());
        config.paths.personal_prompts = Some(personal.display().to_string());

        let session = Session::start(tmp.path(), &config);
        assert!(session.catalog.is_empty());
        assert_eq!(session.project_dir, project);
        assert_eq!(session.personal_dir, Some(personal));
    }

    #[test]
    fn test_paths_reports_reserved_names() {
        let (_tmp, mut session) = session_with(&[("a.md", "a")]);
        let loaded = config::load_config(&session.project_dir);
        let out = output(|buf| run_paths(&session, &loaded, buf));
        assert!(out.contains(&format!("reserved  {} names", commands::BUILTIN_COMMANDS.len())));
        assert!(out.ends_with("prompts   1\n"));

        session.reserved = ReservedNames::new();
        let out = output(|buf| run_paths(&session, &loaded, buf));
        assert!(out.contains("reserved  (none)"));
    }

    #[test]
    fn test_show_reports_arity() {
        let (_tmp, session) = session_with(&[("pair.md", "$1 vs $2")]);
        let out = output(|buf| run_show(&session, "/pair", buf));
        assert!(out.contains("# arguments: $1..$2"));
        assert!(out.ends_with("$1 vs $2\n"));
    }
}
