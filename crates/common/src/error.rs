use crate::Timestamp;

/// Erros do caminho de escrita do store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("escrita em {at} anterior à última versão da chave ({latest})")]
    OutOfOrderWrite { at: Timestamp, latest: Timestamp },
    #[error("timestamp inválido: {0}")]
    InvalidTimestamp(String),
}

/// Erros de parsing/validação de comandos do shell.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("número errado de argumentos para '{0}'")]
    WrongArity(String),
    #[error("argumento inválido: {0}")]
    InvalidArgument(String),
}
