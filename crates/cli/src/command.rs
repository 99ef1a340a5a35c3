use std::time::Duration;

use bytes::Bytes;
use evokv_common::{CommandError, Timestamp};

use crate::parse::Parse;

/// Enum com todos os comandos do shell.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set {
        key: String,
        value: Bytes,
        ttl: Option<Duration>,
        at: Option<Timestamp>,
    },
    Get(String),
    GetAt {
        key: String,
        at: Timestamp,
    },
    /// Resolução detalhada: por que a chave está (ou não) visível em `at`.
    Why {
        key: String,
        at: Timestamp,
    },
    Del {
        key: String,
        at: Option<Timestamp>,
    },
    Exists(String),
    PTtl(String),
    History(String),
    Size,
    Keys,
    Clear,
    Cleanup,
    Compact(Timestamp),
    Time(Option<Timestamp>),
    Advance(Duration),
    Unknown(String),
}

impl Command {
    /// Faz o parse dos tokens de uma linha em um Command.
    pub fn from_tokens(tokens: Vec<String>) -> Result<Command, CommandError> {
        let mut parse = Parse::new(tokens);
        let cmd_name = parse.next_string()?.to_uppercase();

        let cmd = match cmd_name.as_str() {
            "SET" => parse_set(&mut parse)?,
            "GET" => Command::Get(single_key(&mut parse, "GET")?),
            "GETAT" | "WHY" => {
                let key = parse.next_string().map_err(|_| arity(&cmd_name))?;
                let at = parse.next_timestamp()?;
                parse.finish()?;
                if cmd_name == "GETAT" {
                    Command::GetAt { key, at }
                } else {
                    Command::Why { key, at }
                }
            }
            "DEL" => {
                let key = parse.next_string().map_err(|_| arity("DEL"))?;
                let at = parse_at(&mut parse)?;
                parse.finish()?;
                Command::Del { key, at }
            }
            "EXISTS" => Command::Exists(single_key(&mut parse, "EXISTS")?),
            "PTTL" => Command::PTtl(single_key(&mut parse, "PTTL")?),
            "HISTORY" => Command::History(single_key(&mut parse, "HISTORY")?),
            "SIZE" | "DBSIZE" => no_args(&parse, Command::Size)?,
            "KEYS" => no_args(&parse, Command::Keys)?,
            "CLEAR" | "FLUSHALL" => no_args(&parse, Command::Clear)?,
            "CLEANUP" => no_args(&parse, Command::Cleanup)?,
            "COMPACT" => {
                let horizon = parse.next_timestamp().map_err(|_| arity("COMPACT"))?;
                parse.finish()?;
                Command::Compact(horizon)
            }
            "TIME" => {
                let at = if parse.has_remaining() {
                    Some(parse.next_timestamp()?)
                } else {
                    None
                };
                parse.finish()?;
                Command::Time(at)
            }
            "ADVANCE" => {
                let by = parse.next_duration().map_err(|_| arity("ADVANCE"))?;
                parse.finish()?;
                Command::Advance(by)
            }
            _ => Command::Unknown(cmd_name),
        };

        Ok(cmd)
    }

    /// `true` para comandos que alteram o store.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Command::Set { .. }
                | Command::Del { .. }
                | Command::Clear
                | Command::Cleanup
                | Command::Compact(_)
        )
    }
}

fn arity(name: &str) -> CommandError {
    CommandError::WrongArity(name.to_string())
}

fn single_key(parse: &mut Parse, name: &str) -> Result<String, CommandError> {
    let key = parse.next_string().map_err(|_| arity(name))?;
    parse.finish()?;
    Ok(key)
}

fn no_args(parse: &Parse, cmd: Command) -> Result<Command, CommandError> {
    parse.finish()?;
    Ok(cmd)
}

fn parse_at(parse: &mut Parse) -> Result<Option<Timestamp>, CommandError> {
    if !parse.has_remaining() {
        return Ok(None);
    }
    let opt = parse.next_string()?.to_uppercase();
    match opt.as_str() {
        "AT" => Ok(Some(parse.next_timestamp()?)),
        other => Err(CommandError::InvalidArgument(format!("opção inválida: {other}"))),
    }
}

fn parse_set(parse: &mut Parse) -> Result<Command, CommandError> {
    let key = parse.next_string().map_err(|_| arity("SET"))?;
    let value = parse.next_bytes().map_err(|_| arity("SET"))?;

    let mut ttl = None;
    let mut at = None;

    while parse.has_remaining() {
        let opt = parse.next_string()?.to_uppercase();
        match opt.as_str() {
            "EX" => ttl = Some(parse.next_duration()?),
            "AT" => at = Some(parse.next_timestamp()?),
            other => {
                return Err(CommandError::InvalidArgument(format!(
                    "opção inválida para SET: {other}"
                )));
            }
        }
    }

    Ok(Command::Set {
        key,
        value,
        ttl,
        at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Result<Command, CommandError> {
        Command::from_tokens(parts.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn parse_get() {
        assert_eq!(cmd(&["get", "mykey"]).unwrap(), Command::Get("mykey".into()));
    }

    #[test]
    fn parse_set_simple() {
        assert_eq!(
            cmd(&["SET", "key", "value"]).unwrap(),
            Command::Set {
                key: "key".into(),
                value: Bytes::from("value"),
                ttl: None,
                at: None,
            }
        );
    }

    #[test]
    fn parse_set_with_ex_and_at() {
        let parsed = cmd(&["SET", "k", "v", "EX", "0.1", "AT", "2"]).unwrap();
        assert_eq!(
            parsed,
            Command::Set {
                key: "k".into(),
                value: Bytes::from("v"),
                ttl: Some(Duration::from_millis(100)),
                at: Some(Timestamp::from_secs(2)),
            }
        );
        assert!(parsed.is_write());
    }

    #[test]
    fn parse_set_invalid_option() {
        assert!(matches!(
            cmd(&["SET", "k", "v", "NX"]),
            Err(CommandError::InvalidArgument(_))
        ));
    }

    #[test]
    fn parse_getat_and_why() {
        assert_eq!(
            cmd(&["GETAT", "a", "0.5"]).unwrap(),
            Command::GetAt {
                key: "a".into(),
                at: Timestamp::from_millis(500),
            }
        );
        assert_eq!(
            cmd(&["why", "a", "1"]).unwrap(),
            Command::Why {
                key: "a".into(),
                at: Timestamp::from_secs(1),
            }
        );
    }

    #[test]
    fn parse_del_with_at() {
        assert_eq!(
            cmd(&["DEL", "d", "AT", "1"]).unwrap(),
            Command::Del {
                key: "d".into(),
                at: Some(Timestamp::from_secs(1)),
            }
        );
    }

    #[test]
    fn wrong_arity() {
        assert!(matches!(cmd(&["GET"]), Err(CommandError::WrongArity(_))));
        assert!(matches!(cmd(&["GETAT", "a"]), Err(CommandError::InvalidArgument(_))));
        assert!(matches!(cmd(&["SIZE", "x"]), Err(CommandError::InvalidArgument(_))));
    }

    #[test]
    fn parse_time_variants() {
        assert_eq!(cmd(&["TIME"]).unwrap(), Command::Time(None));
        assert_eq!(
            cmd(&["TIME", "3"]).unwrap(),
            Command::Time(Some(Timestamp::from_secs(3)))
        );
        assert_eq!(
            cmd(&["ADVANCE", "1.5"]).unwrap(),
            Command::Advance(Duration::from_millis(1_500))
        );
    }

    #[test]
    fn unknown_command() {
        assert_eq!(cmd(&["FOO"]).unwrap(), Command::Unknown("FOO".into()));
        assert!(!Command::Unknown("FOO".into()).is_write());
    }
}
