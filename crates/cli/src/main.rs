mod command;
mod parse;
mod reply;
mod shell;

use std::io::{self, Write};

use clap::Parser;
use tracing::{info, warn};

use evokv_common::{DEFAULT_LOG_FILTER, DEFAULT_SHELL_PROMPT};
use evokv_storage::{OrderingPolicy, StoreConfig};

use crate::command::Command;
use crate::reply::{Reply, format_reply};
use crate::shell::Shell;

#[derive(Parser, Debug)]
#[command(
    name = "evokv-cli",
    about = "evokv: key-value store in-memory com TTL e leitura histórica"
)]
struct Args {
    /// Política para escritas fora de ordem: strict ou clamp
    #[arg(long, default_value = "strict", value_parser = parse_ordering)]
    ordering: OrderingPolicy,
    /// Desliga o cache do valor atual
    #[arg(long)]
    no_cache: bool,
    /// Usa um relógio manual começando em 0 (habilita TIME t e ADVANCE)
    #[arg(long)]
    manual_clock: bool,

    /// Comandos para executar diretamente, separados por ';'
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

fn parse_ordering(s: &str) -> Result<OrderingPolicy, String> {
    match s.to_lowercase().as_str() {
        "strict" => Ok(OrderingPolicy::Strict),
        "clamp" => Ok(OrderingPolicy::Clamp),
        _ => Err(format!("valor inválido: '{s}'. Use: strict, clamp")),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = StoreConfig {
        ordering: args.ordering,
        current_cache: !args.no_cache,
    };
    let shell = Shell::new(config, args.manual_clock);
    info!(?config, manual_clock = args.manual_clock, "store criado");

    // Modo não interativo (via argumentos)
    if !args.command.is_empty() {
        for tokens in split_commands(args.command) {
            println!("{}", format_reply(&run_tokens(&shell, tokens), 0));
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("{DEFAULT_SHELL_PROMPT}");
        io::stdout().flush()?;

        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break; // EOF
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        for tokens in split_line(line) {
            println!("{}", format_reply(&run_tokens(&shell, tokens), 0));
        }
    }

    Ok(())
}

fn run_tokens(shell: &Shell, tokens: Vec<String>) -> Reply {
    match Command::from_tokens(tokens) {
        Ok(cmd) => shell.execute(&cmd),
        Err(e) => {
            warn!("comando rejeitado: {e}");
            Reply::Error(format!("ERR {e}"))
        }
    }
}

/// Quebra os argumentos da linha de comando em comandos separados por `;`.
fn split_commands(args: Vec<String>) -> Vec<Vec<String>> {
    args.split(|a| a == ";")
        .filter(|tokens| !tokens.is_empty())
        .map(<[String]>::to_vec)
        .collect()
}

/// Quebra uma linha do REPL em comandos.
///
/// `;` fora de aspas separa comandos, como nos argumentos. Dentro de aspas
/// vale `\n`, `\t` e o escape da própria aspa. Comandos vazios somem.
fn split_line(input: &str) -> Vec<Vec<String>> {
    let mut commands = Vec::new();
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), '\\') => {
                let escaped = chars.next_if(|e| matches!(*e, 'n' | 't' | '\\' | '"' | '\''));
                match escaped {
                    Some('n') => current.push('\n'),
                    Some('t') => current.push('\t'),
                    Some(e) => current.push(e),
                    None => current.push(c),
                }
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => quote = Some(c),
            (None, ';') => {
                end_token(&mut tokens, &mut current);
                if !tokens.is_empty() {
                    commands.push(std::mem::take(&mut tokens));
                }
            }
            (None, c) if c.is_whitespace() => end_token(&mut tokens, &mut current),
            (None, c) => current.push(c),
        }
    }

    end_token(&mut tokens, &mut current);
    if !tokens.is_empty() {
        commands.push(tokens);
    }
    commands
}

fn end_token(tokens: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}
