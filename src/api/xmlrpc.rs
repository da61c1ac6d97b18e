// subtitles-core - Subtitle lookup for media players
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Minimal XML-RPC codec
//!
//! Covers what the subtitle service speaks: `<methodCall>` encoding and
//! `<methodResponse>` decoding, including `<fault>` responses.
//!
//! # Value Types
//! | XML-RPC            | [`Value`]            |
//! |--------------------|----------------------|
//! | `i4`, `int`, `i8`  | `Int`                |
//! | `boolean`          | `Boolean`            |
//! | `string` / untyped | `String`             |
//! | `double`           | `Double`             |
//! | `dateTime.iso8601` | `DateTime` (raw)     |
//! | `base64`           | `Base64` (decoded)   |
//! | `struct`           | `Struct`             |
//! | `array`            | `Array`              |
//! | `nil`              | `Nil`                |

use crate::error::{Result, SubtitleError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::BTreeMap;

/// An XML-RPC value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Boolean(bool),
    String(String),
    Double(f64),
    DateTime(String),
    Base64(Vec<u8>),
    Struct(BTreeMap<String, Value>),
    Array(Vec<Value>),
    Nil,
}

impl Value {
    /// Build a struct value from key/value pairs
    pub fn structure<I, K>(members: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Struct(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Look up a struct member
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Scalar rendered as text; the service is loose about numbers vs strings
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::String(s) | Value::DateTime(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Double(d) => Some(d.to_string()),
            Value::Boolean(b) => Some(if *b { "1" } else { "0" }.to_string()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

// ===== Encoding =====

/// Encode a `<methodCall>` document
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        write_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => {
            out.push_str("<int>");
            out.push_str(&i.to_string());
            out.push_str("</int>");
        }
        Value::Boolean(b) => {
            out.push_str(if *b { "<boolean>1</boolean>" } else { "<boolean>0</boolean>" });
        }
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        }
        Value::Double(d) => {
            out.push_str("<double>");
            out.push_str(&d.to_string());
            out.push_str("</double>");
        }
        Value::DateTime(s) => {
            out.push_str("<dateTime.iso8601>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</dateTime.iso8601>");
        }
        Value::Base64(bytes) => {
            out.push_str("<base64>");
            out.push_str(&STANDARD.encode(bytes));
            out.push_str("</base64>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(name.as_str()));
                out.push_str("</name>");
                write_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>");
}

// ===== Decoding =====

/// Element tree built from the response before typing it
#[derive(Debug, Default)]
struct Node {
    name: String,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn named(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn require(&self, name: &str) -> Result<&Node> {
        self.child(name).ok_or_else(|| {
            SubtitleError::invalid_xmlrpc(format!("<{}> is missing <{}>", self.name, name))
        })
    }
}

/// Decode a `<methodResponse>` into its single return value
///
/// # Errors
/// - `XmlRpcFault` if the server answered with `<fault>`
/// - `InvalidXmlRpc` if the document is not a valid response
pub fn decode_response(xml: &[u8]) -> Result<Value> {
    let root = parse_tree(xml)?;
    if root.name != "methodResponse" {
        return Err(SubtitleError::invalid_xmlrpc(format!(
            "expected <methodResponse>, found <{}>",
            root.name
        )));
    }

    if let Some(fault) = root.child("fault") {
        let value = parse_value(fault.require("value")?)?;
        let code = value.get("faultCode").and_then(Value::as_i64).unwrap_or(0);
        let message = value
            .get("faultString")
            .and_then(Value::to_text)
            .unwrap_or_default();
        return Err(SubtitleError::XmlRpcFault { code, message });
    }

    let param = root.require("params")?.require("param")?;
    parse_value(param.require("value")?)
}

fn parse_tree(xml: &[u8]) -> Result<Node> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                stack.push(Node::named(name));
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                attach(&mut stack, &mut root, Node::named(name))?;
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| SubtitleError::invalid_xmlrpc("unbalanced closing tag"))?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Text(e)) => {
                if let Some(top) = stack.last_mut() {
                    let text = e
                        .unescape()
                        .map_err(|e| SubtitleError::invalid_xmlrpc(e.to_string()))?;
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SubtitleError::invalid_xmlrpc(format!("XML parse error: {}", e)));
            }
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(SubtitleError::invalid_xmlrpc("document ended inside an element"));
    }
    root.ok_or_else(|| SubtitleError::invalid_xmlrpc("empty document"))
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(SubtitleError::invalid_xmlrpc("multiple root elements")),
    }
    Ok(())
}

fn parse_value(node: &Node) -> Result<Value> {
    let Some(typed) = node.children.first() else {
        // Untyped <value>text</value> is a string
        return Ok(Value::String(node.text.clone()));
    };

    let text = typed.text.trim();
    match typed.name.as_str() {
        "i4" | "int" | "i8" => text
            .parse()
            .map(Value::Int)
            .map_err(|_| SubtitleError::invalid_xmlrpc(format!("bad integer '{}'", text))),
        "boolean" => match text {
            "1" | "true" => Ok(Value::Boolean(true)),
            "0" | "false" => Ok(Value::Boolean(false)),
            other => Err(SubtitleError::invalid_xmlrpc(format!("bad boolean '{}'", other))),
        },
        "string" => Ok(Value::String(typed.text.clone())),
        "double" => text
            .parse()
            .map(Value::Double)
            .map_err(|_| SubtitleError::invalid_xmlrpc(format!("bad double '{}'", text))),
        "dateTime.iso8601" => Ok(Value::DateTime(text.to_string())),
        "base64" => {
            let cleaned: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            STANDARD
                .decode(cleaned)
                .map(Value::Base64)
                .map_err(|e| SubtitleError::invalid_xmlrpc(format!("bad base64: {}", e)))
        }
        "nil" => Ok(Value::Nil),
        "struct" => {
            let mut members = BTreeMap::new();
            for member in typed.children.iter().filter(|c| c.name == "member") {
                let name = member.require("name")?.text.clone();
                let value = parse_value(member.require("value")?)?;
                members.insert(name, value);
            }
            Ok(Value::Struct(members))
        }
        "array" => typed
            .require("data")?
            .children
            .iter()
            .filter(|c| c.name == "value")
            .map(parse_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Err(SubtitleError::invalid_xmlrpc(format!("unknown value type <{}>", other))),
    }
}
