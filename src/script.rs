//! Transaction scripts for driving the model from the command line.
//!
//! One chip select cycle per line. Tokens are hex bytes (`02`, `0x20`, or
//! runs such as `000100` / `DEADBEEF`) written to the device, and `rN`, which
//! clocks out N bytes with MOSI held low and captures MISO. Everything after
//! `#` is a comment.
//!
//! ```text
//! 06                      # write enable
//! 02 000100 DEADBEEF      # program four bytes
//! 03 000100 r4            # read them back
//! ```

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// 1-based source line.
    pub line: usize,
    pub tx: Vec<u8>,
    pub rx_len: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("line {line}: invalid hex token {token:?}")]
    InvalidHex { line: usize, token: String },
    #[error("line {line}: invalid read count {token:?}")]
    InvalidReadCount { line: usize, token: String },
    #[error("line {line}: bytes written after a read")]
    WriteAfterRead { line: usize },
}

pub fn parse(text: &str) -> Result<Vec<Transaction>, ScriptError> {
    let mut transactions = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = raw.split('#').next().unwrap_or_default();
        let mut transaction = Transaction {
            line,
            tx: Vec::new(),
            rx_len: 0,
        };
        for token in content.split_whitespace() {
            if let Some(count) = token.strip_prefix('r').or_else(|| token.strip_prefix('R')) {
                let count: usize = count.parse().map_err(|_| ScriptError::InvalidReadCount {
                    line,
                    token: token.to_owned(),
                })?;
                transaction.rx_len += count;
            } else {
                if transaction.rx_len > 0 {
                    return Err(ScriptError::WriteAfterRead { line });
                }
                parse_hex_run(token, &mut transaction.tx).ok_or_else(|| ScriptError::InvalidHex {
                    line,
                    token: token.to_owned(),
                })?;
            }
        }
        if !transaction.tx.is_empty() || transaction.rx_len > 0 {
            transactions.push(transaction);
        }
    }
    Ok(transactions)
}

fn parse_hex_run(token: &str, out: &mut Vec<u8>) -> Option<()> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    if digits.is_empty() || digits.len() % 2 != 0 || !digits.is_ascii() {
        return None;
    }
    for pair in digits.as_bytes().chunks(2) {
        let pair = std::str::from_utf8(pair).ok()?;
        out.push(u8::from_str_radix(pair, 16).ok()?);
    }
    Some(())
}

pub fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
