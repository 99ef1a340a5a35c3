use bytes::Bytes;

/// Resposta de um comando do shell.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
    Array(Vec<Reply>),
}

impl Reply {
    pub fn ok() -> Reply {
        Reply::Simple("OK".into())
    }

    pub fn count(n: usize) -> Reply {
        Reply::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

/// Formata uma resposta para exibição humana.
pub fn format_reply(reply: &Reply, indent: usize) -> String {
    let pad = " ".repeat(indent);
    match reply {
        Reply::Simple(s) => format!("{pad}{s}"),
        Reply::Error(s) => format!("{pad}(error) {s}"),
        Reply::Integer(n) => format!("{pad}(integer) {n}"),
        Reply::Bulk(data) => match std::str::from_utf8(data) {
            Ok(s) => format!("{pad}\"{s}\""),
            Err(_) => format!("{pad}(binary) {} bytes", data.len()),
        },
        Reply::Null => format!("{pad}(nil)"),
        Reply::Array(items) => {
            if items.is_empty() {
                return format!("{pad}(empty array)");
            }
            items
                .iter()
                .enumerate()
                .map(|(i, r)| format!("{pad}{}) {}", i + 1, format_reply(r, 0)))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}
