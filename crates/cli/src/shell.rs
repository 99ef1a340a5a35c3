use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use evokv_common::Timestamp;
use evokv_storage::{
    Clock, ManualClock, Resolution, Store, StoreConfig, SystemClock, Ttl, Version,
};

use crate::command::Command;
use crate::reply::Reply;

/// Sessão do shell: só o handle do store e, opcionalmente, o relógio
/// manual que ele usa.
pub struct Shell {
    store: Store,
    manual_clock: Option<Arc<ManualClock>>,
}

impl Shell {
    pub fn new(config: StoreConfig, manual_clock: bool) -> Self {
        if manual_clock {
            let clock = Arc::new(ManualClock::new(Timestamp::ZERO));
            Shell {
                store: Store::with_config(config, clock.clone()),
                manual_clock: Some(clock),
            }
        } else {
            let clock: Arc<dyn Clock> = Arc::new(SystemClock);
            Shell {
                store: Store::with_config(config, clock),
                manual_clock: None,
            }
        }
    }

    /// Executa um comando e retorna a resposta.
    pub fn execute(&self, cmd: &Command) -> Reply {
        let reply = self.dispatch(cmd);
        if cmd.is_write() && !matches!(reply, Reply::Error(_)) {
            debug!(?cmd, "escrita aplicada");
        }
        reply
    }

    fn dispatch(&self, cmd: &Command) -> Reply {
        let store = &self.store;
        match cmd {
            Command::Set {
                key,
                value,
                ttl,
                at,
            } => {
                let at = at.unwrap_or_else(|| store.now());
                match store.set_at(key.as_str(), value.clone(), *ttl, at) {
                    Ok(_) => Reply::ok(),
                    Err(e) => Reply::Error(format!("ERR {e}")),
                }
            }
            Command::Get(key) => value_reply(store.get(key.as_str())),
            Command::GetAt { key, at } => value_reply(store.get_at_time(key.as_str(), *at)),
            Command::Why { key, at } => match store.lookup_at(key.as_str(), *at) {
                Resolution::Present(value) => Reply::Bulk(value),
                Resolution::NeverExisted => Reply::Simple("never-existed".into()),
                Resolution::Expired { at } => Reply::Simple(format!("expired at {at}")),
                Resolution::Deleted { at } => Reply::Simple(format!("deleted at {at}")),
            },
            Command::Del { key, at } => {
                let at = at.unwrap_or_else(|| store.now());
                match store.delete_at(key.as_str(), at) {
                    Ok(removed) => Reply::Integer(i64::from(removed)),
                    Err(e) => Reply::Error(format!("ERR {e}")),
                }
            }
            Command::Exists(key) => Reply::Integer(i64::from(store.exists(key.as_str()))),
            Command::PTtl(key) => match store.ttl(key.as_str()) {
                Ttl::Absent => Reply::Integer(-2),
                Ttl::Persistent => Reply::Integer(-1),
                Ttl::Remaining(d) => {
                    Reply::Integer(i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
                }
            },
            Command::History(key) => Reply::Array(
                store
                    .history(key.as_str())
                    .iter()
                    .map(describe_version)
                    .collect(),
            ),
            Command::Size => Reply::count(store.size()),
            Command::Keys => {
                let mut keys: Vec<String> = store.get_all_keys().into_iter().collect();
                keys.sort();
                Reply::Array(keys.into_iter().map(|k| Reply::Bulk(Bytes::from(k))).collect())
            }
            Command::Clear => {
                store.clear();
                Reply::ok()
            }
            Command::Cleanup => Reply::count(store.cleanup_expired()),
            Command::Compact(horizon) => Reply::count(store.compact_before(*horizon)),
            Command::Time(None) => Reply::Simple(store.now().to_string()),
            Command::Time(Some(at)) => match &self.manual_clock {
                Some(clock) => {
                    clock.set(*at);
                    Reply::Simple(at.to_string())
                }
                None => manual_clock_required(),
            },
            Command::Advance(by) => match &self.manual_clock {
                Some(clock) => Reply::Simple(clock.advance(*by).to_string()),
                None => manual_clock_required(),
            },
            Command::Unknown(name) => Reply::Error(format!("ERR unknown command '{name}'")),
        }
    }
}

fn value_reply(value: Option<Bytes>) -> Reply {
    match value {
        Some(v) => Reply::Bulk(v),
        None => Reply::Null,
    }
}

fn manual_clock_required() -> Reply {
    Reply::Error("ERR relógio manual desativado (use --manual-clock)".into())
}

fn describe_version(version: &Version<Bytes>) -> Reply {
    let line = match version {
        Version::Put {
            value,
            created_at,
            ttl,
        } => {
            let value = String::from_utf8_lossy(value);
            match ttl {
                Some(ttl) => format!("{} @{created_at} \"{value}\" ttl={ttl:?}", version.kind()),
                None => format!("{} @{created_at} \"{value}\"", version.kind()),
            }
        }
        Version::Tombstone { created_at } => format!("{} @{created_at}", version.kind()),
    };
    Reply::Simple(line)
}
