//! Purpose: Minimal EDN reader producing a generic value tree.
//! Exports: `EdnNode`, `parse`.
//! Role: Reads simulator-model specification documents.
//! Invariants: Exactly one top-level form; trailing non-whitespace is an error.
//! Invariants: Commas and `;` comments are whitespace.

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, PartialEq)]
pub enum EdnNode {
    Map(Vec<(EdnNode, EdnNode)>),
    Vector(Vec<EdnNode>),
    List(Vec<EdnNode>),
    String(String),
    Int(i64),
    Float(f64),
    /// Symbols, keywords, `true`/`false` and `nil`, kept as written.
    Symbol(String),
}

impl EdnNode {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Look up a string key in a map node.
    pub fn get(&self, key: &str) -> Option<&EdnNode> {
        match self {
            Self::Map(entries) => entries
                .iter()
                .find(|(name, _)| name.as_str() == Some(key))
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Map(_) => "map",
            Self::Vector(_) => "vector",
            Self::List(_) => "list",
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Symbol(_) => "symbol",
        }
    }
}

pub fn parse(text: &str) -> Result<EdnNode, Error> {
    let mut reader = Reader {
        bytes: text.as_bytes(),
        text,
        pos: 0,
    };
    reader.skip_whitespace();
    let node = reader.read_node()?;
    reader.skip_whitespace();
    if reader.pos < reader.bytes.len() {
        return Err(reader.error("unexpected trailing content"));
    }
    Ok(node)
}

struct Reader<'a> {
    bytes: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn error(&self, message: &str) -> Error {
        Error::new(ErrorKind::Malformed).with_message(format!("edn: {message} at byte {}", self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(byte) = self.peek() {
            match byte {
                b' ' | b'\t' | b'\r' | b'\n' | b',' => self.pos += 1,
                b';' => {
                    while let Some(byte) = self.peek() {
                        self.pos += 1;
                        if byte == b'\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn read_node(&mut self) -> Result<EdnNode, Error> {
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(b'{') => {
                let items = self.read_sequence(b'}')?;
                if items.len() % 2 != 0 {
                    return Err(self.error("map has an odd number of forms"));
                }
                let mut entries = Vec::with_capacity(items.len() / 2);
                let mut items = items.into_iter();
                while let (Some(key), Some(value)) = (items.next(), items.next()) {
                    entries.push((key, value));
                }
                Ok(EdnNode::Map(entries))
            }
            Some(b'[') => self.read_sequence(b']').map(EdnNode::Vector),
            Some(b'(') => self.read_sequence(b')').map(EdnNode::List),
            Some(b'"') => self.read_string().map(EdnNode::String),
            Some(b'}' | b']' | b')') => Err(self.error("unbalanced closing delimiter")),
            Some(_) => self.read_atom(),
        }
    }

    fn read_sequence(&mut self, close: u8) -> Result<Vec<EdnNode>, Error> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.error("unterminated collection")),
                Some(byte) if byte == close => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(_) => items.push(self.read_node()?),
            }
        }
    }

    fn read_string(&mut self) -> Result<String, Error> {
        self.pos += 1;
        let mut out = String::new();
        let mut start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some(b'"') => {
                    out.push_str(&self.text[start..self.pos]);
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    out.push_str(&self.text[start..self.pos]);
                    self.pos += 1;
                    let escaped = match self.peek() {
                        Some(b'"') => '"',
                        Some(b'\\') => '\\',
                        Some(b'n') => '\n',
                        Some(b't') => '\t',
                        Some(b'r') => '\r',
                        _ => return Err(self.error("invalid string escape")),
                    };
                    out.push(escaped);
                    self.pos += 1;
                    start = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn read_atom(&mut self) -> Result<EdnNode, Error> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if matches!(
                byte,
                b' ' | b'\t' | b'\r' | b'\n' | b',' | b';' | b'"' | b'{' | b'}' | b'[' | b']' | b'(' | b')'
            ) {
                break;
            }
            self.pos += 1;
        }
        let token = &self.text[start..self.pos];
        let first = token.as_bytes()[0];
        let numeric = first.is_ascii_digit()
            || (matches!(first, b'-' | b'+') && token.len() > 1 && token.as_bytes()[1].is_ascii_digit());
        if !numeric {
            return Ok(EdnNode::Symbol(token.to_string()));
        }
        if let Ok(value) = token.parse::<i64>() {
            return Ok(EdnNode::Int(value));
        }
        token
            .parse::<f64>()
            .map(EdnNode::Float)
            .map_err(|_| self.error(&format!("invalid number '{token}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::{EdnNode, parse};
    use crate::core::error::ErrorKind;

    #[test]
    fn reads_a_specification_shaped_map() {
        let doc = parse(
            "{\"kim-api-sm-schema-version\" 1 ; comment\n \
             \"model-name\" \"Sim_LJ\",\n \
             \"units\" [\"metal\" \"x\\\"y\"] :flag true}",
        )
        .expect("parse");
        assert_eq!(doc.get("kim-api-sm-schema-version"), Some(&EdnNode::Int(1)));
        assert_eq!(doc.get("model-name").and_then(EdnNode::as_str), Some("Sim_LJ"));
        assert_eq!(
            doc.get("units"),
            Some(&EdnNode::Vector(vec![
                EdnNode::String("metal".into()),
                EdnNode::String("x\"y".into()),
            ]))
        );
        assert!(doc.get("missing").is_none());
    }

    #[test]
    fn numbers_and_symbols() {
        assert_eq!(parse("-12").unwrap(), EdnNode::Int(-12));
        assert_eq!(parse("2.5").unwrap(), EdnNode::Float(2.5));
        assert_eq!(parse("(nil -x)").unwrap(), EdnNode::List(vec![
            EdnNode::Symbol("nil".into()),
            EdnNode::Symbol("-x".into()),
        ]));
    }

    #[test]
    fn malformed_documents_fail() {
        for text in ["{\"a\"}", "[1 2", "\"open", "{} {}", "]", ""] {
            let err = parse(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Malformed, "{text}");
        }
    }
}
