use std::time::Duration;

use bytes::Bytes;

use evokv_common::{CommandError, Timestamp};

/// Cursor sobre os tokens de uma linha para extrair argumentos sequencialmente.
pub struct Parse {
    parts: Vec<String>,
    pos: usize,
}

impl Parse {
    pub fn new(parts: Vec<String>) -> Parse {
        Parse { parts, pos: 0 }
    }

    pub fn next_string(&mut self) -> Result<String, CommandError> {
        self.next()
    }

    pub fn next_bytes(&mut self) -> Result<Bytes, CommandError> {
        self.next().map(Bytes::from)
    }

    fn next_secs(&mut self) -> Result<f64, CommandError> {
        let s = self.next()?;
        s.parse::<f64>()
            .map_err(|_| CommandError::InvalidArgument(format!("'{s}' não é um número de segundos")))
    }

    /// Instante absoluto em segundos decimais.
    pub fn next_timestamp(&mut self) -> Result<Timestamp, CommandError> {
        let secs = self.next_secs()?;
        Timestamp::try_from_secs_f64(secs).map_err(|e| CommandError::InvalidArgument(e.to_string()))
    }

    /// Duração em segundos decimais. Valores `<= 0` viram zero (TTL já vencido).
    pub fn next_duration(&mut self) -> Result<Duration, CommandError> {
        let secs = self.next_secs()?;
        if secs.is_finite() && secs <= 0.0 {
            return Ok(Duration::ZERO);
        }
        Duration::try_from_secs_f64(secs)
            .map_err(|_| CommandError::InvalidArgument(format!("duração inválida: {secs}")))
    }

    /// Verifica se todos os argumentos foram consumidos.
    pub fn finish(&self) -> Result<(), CommandError> {
        if self.pos < self.parts.len() {
            Err(CommandError::InvalidArgument(
                "argumentos extras não esperados".into(),
            ))
        } else {
            Ok(())
        }
    }

    pub fn has_remaining(&self) -> bool {
        self.pos < self.parts.len()
    }

    fn next(&mut self) -> Result<String, CommandError> {
        let part = self
            .parts
            .get(self.pos)
            .cloned()
            .ok_or_else(|| CommandError::InvalidArgument("argumentos insuficientes".into()))?;
        self.pos += 1;
        Ok(part)
    }
}
