use std::collections::HashMap;

/// A decoded Kitty graphics APC envelope: `ESC _ G <control-block> ; <payload> ESC \`
/// (§4.1, §4.6). `params` maps each single-letter control key to its raw
/// string value; `payload` is the (still base64-encoded) data segment, empty
/// if the control block carried none.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KittyCommand {
    pub params: HashMap<char, String>,
    pub payload: Vec<u8>,
}

impl KittyCommand {
    /// Parses the bytes inside a Kitty APC payload, i.e. everything after
    /// the leading `G` that the APC string starts with. Returns `None` if
    /// the envelope doesn't start with `G` (not a Kitty graphics command).
    pub fn parse(apc_payload: &[u8]) -> Option<Self> {
        let rest = apc_payload.strip_prefix(b"G")?;
        let (control, payload) = match rest.iter().position(|&b| b == b';') {
            Some(idx) => (&rest[..idx], rest[idx + 1..].to_vec()),
            None => (rest, Vec::new()),
        };

        let mut params = HashMap::new();
        for field in control.split(|&b| b == b',') {
            if field.is_empty() {
                continue;
            }
            if let Some(eq) = field.iter().position(|&b| b == b'=') {
                let key_bytes = &field[..eq];
                if key_bytes.len() != 1 {
                    continue;
                }
                let key = key_bytes[0] as char;
                let value = String::from_utf8_lossy(&field[eq + 1..]).to_string();
                params.insert(key, value);
            }
        }

        Some(Self { params, payload })
    }

    pub fn get(&self, key: char) -> Option<&str> {
        self.params.get(&key).map(|s| s.as_str())
    }

    pub fn get_u32(&self, key: char) -> Option<u32> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn action(&self) -> Option<char> {
        self.get('a').and_then(|s| s.chars().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_control_block_and_payload() {
        let cmd = KittyCommand::parse(b"Ga=t,i=5,f=24;AAAA").unwrap();
        assert_eq!(cmd.action(), Some('t'));
        assert_eq!(cmd.get_u32('i'), Some(5));
        assert_eq!(cmd.get_u32('f'), Some(24));
        assert_eq!(cmd.payload, b"AAAA".to_vec());
    }

    #[test]
    fn control_block_without_payload() {
        let cmd = KittyCommand::parse(b"Ga=d,i=5").unwrap();
        assert_eq!(cmd.action(), Some('d'));
        assert!(cmd.payload.is_empty());
    }

    #[test]
    fn non_kitty_apc_returns_none() {
        assert!(KittyCommand::parse(b"not-kitty").is_none());
    }
}
