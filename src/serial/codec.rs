//! CAT command codec.
//!
//! Requests are `<MNEMONIC><p1>,<p2>,...;` and replies are a single
//! comma separated line ending in `\r\n`. Nothing is escaped: parameters
//! must not contain `,` or `;`.

use std::fmt;

pub const SEPARATOR: char = ',';
pub const TERMINATOR: char = ';';
/// Field used in place of a reply when the exchange failed
pub const SENTINEL: &str = "ER";

/// A single command parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Text(String),
    Int(i64),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Text(s) => f.write_str(s),
            Param::Int(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Int(value)
    }
}

impl From<u32> for Param {
    fn from(value: u32) -> Self {
        Param::Int(i64::from(value))
    }
}

impl From<u8> for Param {
    fn from(value: u8) -> Self {
        Param::Int(i64::from(value))
    }
}

/// Mnemonic plus its ordered parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub mnemonic: String,
    pub params: Vec<Param>,
}

impl Command {
    pub fn new(mnemonic: impl Into<String>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, param: impl Into<Param>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn encode(&self) -> String {
        encode(&self.mnemonic, &self.params)
    }
}

/// Parsed reply line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply(Vec<String>);

impl Reply {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    /// The one-field `ER` reply
    pub fn sentinel() -> Self {
        Self(vec![SENTINEL.to_string()])
    }

    pub fn is_sentinel(&self) -> bool {
        self.0.len() == 1 && self.0[0] == SENTINEL
    }

    /// Every field is empty, as produced by an empty line or a bare `,`
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|f| f.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn into_fields(self) -> Vec<String> {
        self.0
    }
}

pub fn encode(mnemonic: &str, params: &[Param]) -> String {
    let mut wire = String::from(mnemonic);
    let joined = params
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(&SEPARATOR.to_string());
    wire.push_str(&joined);
    wire.push(TERMINATOR);
    wire
}

pub fn decode(line: &str) -> Reply {
    let trimmed = line.trim_matches(|c| c == '\r' || c == '\n');
    Reply(trimmed.split(SEPARATOR).map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_start_command() {
        let wire = encode("WS", &["TX".into(), "4".into(), "20".into()]);
        assert_eq!(wire, "WSTX,4,20;");
    }

    #[test]
    fn test_encode_without_params() {
        assert_eq!(encode("QT", &[]), "QT;");
        assert_eq!(Command::new("QH").encode(), "QH;");
    }

    #[test]
    fn test_encode_integer_params() {
        let cmd = Command::new("QT").param(1_700_000_000i64);
        assert_eq!(cmd.encode(), "QT1700000000;");

        let cmd = Command::new("WS").param("TX").param(2u32).param(40u32);
        assert_eq!(cmd.encode(), "WSTX,2,40;");
    }

    #[test]
    fn test_decode_status_line() {
        let reply = decode("DI,4,20\r\n");
        assert_eq!(reply.fields(), &["DI", "4", "20"]);
        assert!(!reply.is_sentinel());
    }

    #[test]
    fn test_decode_strips_leading_terminators() {
        let reply = decode("\r\n1700000000\r\n");
        assert_eq!(reply.fields(), &["1700000000"]);
    }

    #[test]
    fn test_decode_sentinel_and_empty() {
        assert!(decode("ER\r\n").is_sentinel());

        let empty = decode("");
        assert_eq!(empty.len(), 1);
        assert!(empty.is_blank());
        assert!(decode(",\r\n").is_blank());
        assert!(!decode("1,\r\n").is_blank());
    }

    #[test]
    fn test_round_trip_drops_mnemonic_and_terminator() {
        let wire = encode("WS", &["TX".into(), "4".into(), "20".into()]);
        let body = wire.strip_prefix("WS").unwrap().trim_end_matches(TERMINATOR);
        assert_eq!(decode(body).fields(), &["TX", "4", "20"]);
    }
}
