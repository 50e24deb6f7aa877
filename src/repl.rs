// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive REPL (Read-Eval-Print Loop) for Lark.
//!
//! Lark programs are made of functions only, so the REPL keeps a session:
//! input starting with `function` adds (or replaces) declarations, anything
//! else becomes the body of a fresh `main` compiled together with every
//! declaration seen so far. Globals live in the engine and carry over.

use lark_engine::ast::{FunctionDeclaration, Program, Statement};
use lark_engine::compiler::Compiler;
use lark_engine::lexer::{Scanner, TokenKind};
use lark_engine::parser::Parser;
use lark_engine::{Bytecode, Engine, Error, disassemble};
use owo_colors::OwoColorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Config, Editor, Helper};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const HISTORY_FILE: &str = ".lark_history";
const MAX_HISTORY_SIZE: usize = 1000;

const KEYWORDS: &[&str] = &[
    "and", "break", "continue", "elif", "else", "for", "function", "if", "or", "print",
    "printLine", "return", "var",
];

const LITERALS: &[&str] = &["true", "false", "null"];

const BUILTINS: &[&str] = &["clock", "erase", "length", "pop", "push", "sqrt"];

/// REPL commands that can be executed with a dot prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Exit,
    Clear,
    Version,
    Load,
    Functions,
    Bytecode,
}

impl ReplCommand {
    /// Parse a REPL command from input string
    pub fn parse(input: &str) -> Option<(Self, Option<&str>)> {
        let rest = input.trim().strip_prefix('.')?;

        let mut parts = rest.splitn(2, char::is_whitespace);
        let cmd = parts.next()?.to_lowercase();
        let arg = parts.next().map(str::trim).filter(|arg| !arg.is_empty());

        let cmd = match cmd.as_str() {
            "help" | "h" | "?" => ReplCommand::Help,
            "exit" | "quit" | "q" => ReplCommand::Exit,
            "clear" | "cls" => ReplCommand::Clear,
            "version" | "v" => ReplCommand::Version,
            "load" | "l" => ReplCommand::Load,
            "functions" | "fns" => ReplCommand::Functions,
            "bytecode" | "bc" => ReplCommand::Bytecode,
            _ => return None,
        };

        Some((cmd, arg))
    }

    /// Get all available commands for help/completion
    pub fn all_commands() -> &'static [(&'static str, &'static str)] {
        &[
            (".help", "Show this help message"),
            (".exit", "Exit the REPL"),
            (".clear", "Clear the screen"),
            (".version", "Show version information"),
            (".load <file>", "Load a Lark file and run its main"),
            (".functions", "List the functions defined so far"),
            (".bytecode", "Toggle bytecode listing before each run"),
        ]
    }
}

/// The state that survives between inputs.
pub struct Session {
    engine: Engine,
    functions: BTreeMap<String, FunctionDeclaration>,
    show_bytecode: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::with_engine(Engine::new())
    }

    pub fn with_engine(engine: Engine) -> Self {
        Self {
            engine,
            functions: BTreeMap::new(),
            show_bytecode: false,
        }
    }

    #[cfg(test)]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Names of the declared functions, sorted.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn toggle_bytecode(&mut self) -> bool {
        self.show_bytecode = !self.show_bytecode;
        self.show_bytecode
    }

    /// Compiles one line of input.
    ///
    /// Returns `None` when the input only declared functions. A line that
    /// does not end in `;` or `}` is treated as an expression to print.
    pub fn prepare(&mut self, input: &str) -> Result<Option<Bytecode>, Error> {
        let input = input.trim();

        if declares_functions(input) {
            let program = Parser::new(input).parse_program()?;
            self.define(program.functions);
            return Ok(None);
        }

        let source = if input.ends_with(';') || input.ends_with('}') {
            input.to_string()
        } else {
            format!("printLine {};", input)
        };
        let body = Parser::new(&source).parse_statements()?;

        self.compile_with_main(body).map(Some)
    }

    /// Compiles and runs one line of input.
    pub fn eval(&mut self, input: &str) -> Result<(), Error> {
        if let Some(bytecode) = self.prepare(input)? {
            self.run(&bytecode)?;
        }
        Ok(())
    }

    /// Merges a file's functions into the session and runs its `main`.
    pub fn load(&mut self, source: &str) -> Result<(), Error> {
        let program = Parser::new(source).parse_program()?;

        let mut main = None;
        let mut declarations = Vec::with_capacity(program.functions.len());
        for function in program.functions {
            if function.name == "main" {
                main = Some(function.body);
            } else {
                declarations.push(function);
            }
        }
        self.define(declarations);

        match main {
            Some(body) => {
                let bytecode = self.compile_with_main(body)?;
                self.run(&bytecode)
            }
            None => Ok(()),
        }
    }

    fn define(&mut self, functions: Vec<FunctionDeclaration>) {
        for function in functions {
            debug!(name = %function.name, "Defining function");
            self.functions.insert(function.name.clone(), function);
        }
    }

    fn compile_with_main(&self, body: Vec<Statement>) -> Result<Bytecode, Error> {
        let mut functions: Vec<FunctionDeclaration> = self
            .functions
            .values()
            .filter(|function| function.name != "main")
            .cloned()
            .collect();
        functions.push(FunctionDeclaration {
            name: "main".to_string(),
            params: Vec::new(),
            body,
        });

        Compiler::new().compile(&Program { functions })
    }

    fn run(&mut self, bytecode: &Bytecode) -> Result<(), Error> {
        if self.show_bytecode {
            print!("{}", disassemble(bytecode).dimmed());
        }
        self.engine.execute(bytecode)?;
        let _ = std::io::stdout().flush();
        Ok(())
    }
}

/// True when the input opens with the `function` keyword.
fn declares_functions(input: &str) -> bool {
    Scanner::new(input).next_token().kind == TokenKind::Function
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper struct for rustyline that provides completion, hints, and validation
#[derive(Default)]
struct LarkHelper {
    /// Keywords, builtins and commands for completion
    words: Vec<String>,
}

impl LarkHelper {
    fn new() -> Self {
        let commands = ReplCommand::all_commands()
            .iter()
            .map(|&(cmd, _)| cmd.split_whitespace().next().unwrap_or(cmd));

        let words = KEYWORDS
            .iter()
            .chain(LITERALS)
            .chain(BUILTINS)
            .copied()
            .chain(commands)
            .map(String::from)
            .collect();

        Self { words }
    }

    fn current_word(line: &str) -> (usize, &str) {
        let start = line
            .rfind(|c: char| !c.is_alphanumeric() && c != '_' && c != '.')
            .map(|i| i + 1)
            .unwrap_or(0);
        (start, &line[start..])
    }
}

impl Completer for LarkHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (_, word) = Self::current_word(&line[..pos]);
        if word.is_empty() {
            return Ok((pos, vec![]));
        }

        let matches = self
            .words
            .iter()
            .filter(|w| w.starts_with(word))
            .map(|w| Pair {
                display: w.clone(),
                replacement: w[word.len()..].to_string(),
            })
            .collect();

        Ok((pos, matches))
    }
}

impl Hinter for LarkHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if pos < line.len() {
            return None;
        }

        let (_, word) = Self::current_word(line);
        if word.len() < 2 {
            return None;
        }

        self.words
            .iter()
            .find(|w| w.starts_with(word) && w.len() > word.len())
            .map(|w| w[word.len()..].to_string().dimmed().to_string())
    }
}

impl Highlighter for LarkHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let mut result = String::with_capacity(line.len() * 2);
        let mut word = String::new();
        let mut in_string = false;

        for c in line.chars() {
            if in_string {
                result.push_str(&c.green().to_string());
                in_string = c != '\'';
                continue;
            }

            if c.is_alphanumeric() || c == '_' || (c == '.' && !word.is_empty()) {
                word.push(c);
                continue;
            }

            if !word.is_empty() {
                result.push_str(&highlight_word(&word));
                word.clear();
            }

            let colored = match c {
                '(' | ')' | '[' | ']' | '{' | '}' => c.yellow().to_string(),
                '+' | '-' | '*' | '/' | '%' | '=' | '<' | '>' | '!' => c.cyan().to_string(),
                '\'' => {
                    in_string = true;
                    c.green().to_string()
                }
                '.' if line.starts_with('.') => c.magenta().to_string(),
                _ => c.to_string(),
            };
            result.push_str(&colored);
        }

        if !word.is_empty() {
            result.push_str(&highlight_word(&word));
        }

        Cow::Owned(result)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn highlight_word(word: &str) -> String {
    if KEYWORDS.contains(&word) {
        word.magenta().bold().to_string()
    } else if LITERALS.contains(&word) {
        word.blue().to_string()
    } else if BUILTINS.contains(&word) {
        word.cyan().to_string()
    } else if word.parse::<f64>().is_ok() {
        word.yellow().to_string()
    } else {
        word.to_string()
    }
}

impl Validator for LarkHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();

        if !is_balanced(input) {
            return Ok(ValidationResult::Incomplete);
        }

        // A trailing operator or separator expects more input
        let trimmed = input.trim_end();
        if trimmed.ends_with(['+', '-', '*', '/', '%', '=', ',', '<', '>']) {
            return Ok(ValidationResult::Incomplete);
        }

        Ok(ValidationResult::Valid(None))
    }
}

/// Check if brackets, braces, and parentheses are balanced
fn is_balanced(input: &str) -> bool {
    let mut stack = Vec::new();
    let mut in_string = false;

    for c in input.chars() {
        if in_string {
            in_string = c != '\'';
            continue;
        }

        match c {
            '\'' => in_string = true,
            '(' => stack.push(')'),
            '[' => stack.push(']'),
            '{' => stack.push('}'),
            ')' | ']' | '}' => {
                if stack.pop() != Some(c) {
                    // Mismatched: let the parser report it
                    return true;
                }
            }
            _ => {}
        }
    }

    stack.is_empty() && !in_string
}

impl Helper for LarkHelper {}

/// The interactive REPL
pub struct Repl {
    session: Session,
    editor: Editor<LarkHelper, DefaultHistory>,
    history_path: PathBuf,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new() -> rustyline::Result<Self> {
        let config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(MAX_HISTORY_SIZE)?
            .auto_add_history(true)
            .build();

        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(LarkHelper::new()));

        let history_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lark")
            .join(HISTORY_FILE);

        if let Some(parent) = history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if editor.load_history(&history_path).is_err() {
            debug!(path = %history_path.display(), "No history loaded");
        }

        Ok(Self {
            session: Session::new(),
            editor,
            history_path,
        })
    }

    /// Run the REPL main loop
    pub fn run(&mut self) -> rustyline::Result<()> {
        self.print_banner();

        loop {
            match self.editor.readline(&format_prompt()) {
                Ok(line) => {
                    let trimmed = line.trim();

                    if trimmed.is_empty() {
                        continue;
                    }

                    if let Some((cmd, arg)) = ReplCommand::parse(trimmed) {
                        match self.execute_command(cmd, arg) {
                            CommandResult::Continue => continue,
                            CommandResult::Exit => break,
                        }
                    }

                    if let Err(e) = self.session.eval(trimmed) {
                        print_error(&e);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".dimmed());
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "^D".dimmed());
                    break;
                }
                Err(err) => {
                    eprintln!("{}: {:?}", "Error".red().bold(), err);
                    break;
                }
            }
        }

        let _ = self.editor.save_history(&self.history_path);

        println!();
        println!("{}", "Goodbye!".bright_cyan());
        Ok(())
    }

    fn print_banner(&self) {
        println!();
        println!(
            "  {} {} {}",
            "Lark".white().bold(),
            "v".dimmed(),
            env!("CARGO_PKG_VERSION").bright_yellow()
        );
        println!(
            "  {} {} {}",
            "Type".dimmed(),
            ".help".cyan(),
            "for available commands".dimmed()
        );
        println!();
    }

    fn execute_command(&mut self, cmd: ReplCommand, arg: Option<&str>) -> CommandResult {
        match cmd {
            ReplCommand::Help => print_help(),
            ReplCommand::Exit => return CommandResult::Exit,
            ReplCommand::Clear => print!("\x1B[2J\x1B[H"),
            ReplCommand::Version => {
                println!("{}: {}", "Lark".bright_cyan().bold(), env!("CARGO_PKG_VERSION").yellow());
            }
            ReplCommand::Load => match arg {
                Some(path) => self.load_file(Path::new(path)),
                None => eprintln!(
                    "{}: {} {}",
                    "Error".red().bold(),
                    ".load".cyan(),
                    "requires a file path".dimmed()
                ),
            },
            ReplCommand::Functions => {
                let mut empty = true;
                for name in self.session.function_names() {
                    println!("  {}", name.cyan());
                    empty = false;
                }
                if empty {
                    println!("{}", "No functions defined".dimmed());
                }
            }
            ReplCommand::Bytecode => {
                let state = if self.session.toggle_bytecode() { "on" } else { "off" };
                println!("{} {}", "Bytecode listing".dimmed(), state.yellow());
            }
        }
        CommandResult::Continue
    }

    fn load_file(&mut self, path: &Path) {
        let result = std::fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|source| self.session.load(&source));

        if let Err(e) = result {
            print_error(&e);
        }
    }
}

/// Result of executing a REPL command
enum CommandResult {
    Continue,
    Exit,
}

fn format_prompt() -> String {
    format!("{} ", "lark>".bright_green().bold())
}

fn print_help() {
    println!();
    println!("{}", "REPL Commands:".white().bold());
    println!();
    for (cmd, desc) in ReplCommand::all_commands() {
        println!("  {:16} {}", cmd.cyan(), desc.dimmed());
    }
    println!();
    println!("{}", "Input:".white().bold());
    println!();
    println!("  {:16} {}", "function f() {}".yellow(), "Define or replace a function".dimmed());
    println!("  {:16} {}", "x = 1;".yellow(), "Run statements as the body of main".dimmed());
    println!("  {:16} {}", "1 + 2".yellow(), "Print the value of an expression".dimmed());
    println!();
}

/// Print an error with its kind highlighted
fn print_error(error: &Error) {
    let message = error.to_string();

    match message.split_once(':') {
        Some((kind, rest)) => eprintln!("{}:{}", kind.red().bold(), rest),
        None => eprintln!("{}", message.red()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lark_engine::Value;

    fn session() -> Session {
        Session::with_engine(Engine::with_output(Box::new(std::io::sink())))
    }

    #[test]
    fn test_repl_command_parse() {
        assert_eq!(ReplCommand::parse(".help"), Some((ReplCommand::Help, None)));
        assert_eq!(ReplCommand::parse(".q"), Some((ReplCommand::Exit, None)));
        assert_eq!(ReplCommand::parse(".fns"), Some((ReplCommand::Functions, None)));
        assert_eq!(ReplCommand::parse(".BYTECODE"), Some((ReplCommand::Bytecode, None)));
        assert_eq!(
            ReplCommand::parse(".load  demo.lark "),
            Some((ReplCommand::Load, Some("demo.lark")))
        );
        assert_eq!(ReplCommand::parse(".load"), Some((ReplCommand::Load, None)));
        assert!(ReplCommand::parse(".nope").is_none());
        assert!(ReplCommand::parse("x = 1;").is_none());
    }

    #[test]
    fn test_is_balanced() {
        assert!(is_balanced("(1 + 2)"));
        assert!(is_balanced("{ 'a': 1 }"));
        assert!(is_balanced("function f() { return [1]; }"));
        assert!(!is_balanced("(1 + 2"));
        assert!(!is_balanced("function f() {"));
        assert!(!is_balanced("print 'open"));
        assert!(is_balanced("'string with (unbalanced'"));
    }

    #[test]
    fn test_session_statements_set_globals() {
        let mut session = session();
        session.eval("x = 1 + 2;").unwrap();
        session.eval("x = x * 2;").unwrap();
        assert_eq!(session.engine().vm().global("x"), Some(&Value::Number(6.0)));
    }

    #[test]
    fn test_session_functions_persist() {
        let mut session = session();
        session.eval("function double(n) { return n * 2; }").unwrap();
        session.eval("function inc(n) { return n + 1; }").unwrap();
        session.eval("y = double(inc(4));").unwrap();

        assert_eq!(session.engine().vm().global("y"), Some(&Value::Number(10.0)));
        assert_eq!(session.function_names().collect::<Vec<_>>(), ["double", "inc"]);
    }

    #[test]
    fn test_session_redefinition_replaces() {
        let mut session = session();
        session.eval("function f() { return 1; }").unwrap();
        session.eval("function f() { return 2; }").unwrap();
        session.eval("r = f();").unwrap();
        assert_eq!(session.engine().vm().global("r"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_session_declaration_only_compiles_nothing() {
        let mut session = session();
        assert!(session.prepare("function g() { }").unwrap().is_none());
        assert!(session.prepare("g();").unwrap().is_some());
    }

    #[test]
    fn test_session_bare_expression_is_printed() {
        let mut session = session();
        let bytecode = session.prepare("1 + 2").unwrap().unwrap();
        assert!(disassemble(&bytecode).contains("PrintLine"));
    }

    #[test]
    fn test_session_syntax_error_keeps_state() {
        let mut session = session();
        session.eval("function f() { return 1; }").unwrap();

        let err = session.eval("var = 3;").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 1, column: 5, .. }));
        assert_eq!(session.function_names().count(), 1);
    }

    #[test]
    fn test_session_load_runs_main() {
        let mut session = session();
        session
            .load("function sq(n) { return n * n; }\nfunction main() { z = sq(7); }")
            .unwrap();

        assert_eq!(session.engine().vm().global("z"), Some(&Value::Number(49.0)));
        assert_eq!(session.function_names().collect::<Vec<_>>(), ["sq"]);
    }

    #[test]
    fn test_identifiers_starting_with_function_are_statements() {
        assert!(declares_functions("  function f() { }"));
        assert!(!declares_functions("functional = 1;"));
        assert!(!declares_functions("function_count"));

        let mut session = session();
        session.eval("functional = 1;").unwrap();
        session.eval("function_count = functional + 1;").unwrap();
        assert_eq!(
            session.engine().vm().global("function_count"),
            Some(&Value::Number(2.0))
        );
        assert_eq!(session.function_names().count(), 0);
    }

    #[test]
    fn test_stored_function_survives_new_declarations() {
        let mut session = session();
        session.eval("function double(n) { return n * 2; }").unwrap();
        session.eval("g = double;").unwrap();
        session.eval("function add1(n) { return n + 1; }").unwrap();
        session.eval("r = g(10);").unwrap();

        assert_eq!(session.engine().vm().global("r"), Some(&Value::Number(20.0)));
    }

    #[test]
    fn test_toggle_bytecode() {
        let mut session = session();
        assert!(session.toggle_bytecode());
        assert!(!session.toggle_bytecode());
    }
}
