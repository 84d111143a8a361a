//! Rendering elements for subscribers and the message store.
//!
//! Two textual forms are produced:
//!
//! - **CQ code** strings such as `hello [CQ:face,id=1]`, used for
//!   `raw_message` and for persisted records
//! - **Array** form, a JSON list of `{"type": ..., "data": {...}}` objects
//!
//! Which one fills an event's `message` field is chosen by [`PostFormat`].
//! Reply elements are rendered with the global id of the replied message,
//! derived from the conversation's scope code.
//!
//! The `raw` flag drops transient details (download URLs) so that persisted
//! records stay stable.

use std::fmt::Write;

use cqbridge_core::global_id;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::element::Element;

/// Shape of the `message` field in dispatched events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostFormat {
    /// CQ-code string.
    #[default]
    String,
    /// Array of typed segments.
    Array,
}

/// Renders `elements` as a CQ-code string.
pub fn to_cq_string(elements: &[Element], scope: i64, raw: bool) -> String {
    let mut out = String::new();
    for element in elements {
        // Writing into a String cannot fail.
        let _ = write_cq(&mut out, element, scope, raw);
    }
    out
}

/// Renders `elements` in array form.
pub fn to_array(elements: &[Element], scope: i64, raw: bool) -> Value {
    Value::Array(
        elements
            .iter()
            .map(|element| {
                json!({
                    "type": element.kind(),
                    "data": segment_data(element, scope, raw),
                })
            })
            .collect(),
    )
}

/// Renders `elements` in the shape selected by `format`.
pub fn to_formatted(elements: &[Element], scope: i64, format: PostFormat) -> Value {
    match format {
        PostFormat::String => Value::String(to_cq_string(elements, scope, false)),
        PostFormat::Array => to_array(elements, scope, false),
    }
}

fn write_cq(out: &mut String, element: &Element, scope: i64, raw: bool) -> std::fmt::Result {
    match element {
        Element::Text { content } => out.push_str(&escape_cq_text(content)),
        Element::Face { id } => write!(out, "[CQ:face,id={id}]")?,
        Element::At { target: 0, .. } => out.push_str("[CQ:at,qq=all]"),
        Element::At { target, .. } => write!(out, "[CQ:at,qq={target}]")?,
        Element::Reply { seq, .. } => write!(out, "[CQ:reply,id={}]", global_id(scope, *seq))?,
        Element::GroupImage { image_id, url } | Element::FriendImage { image_id, url } => {
            write!(out, "[CQ:image,file={}", escape_cq_value(image_id))?;
            if !raw && let Some(url) = url {
                write!(out, ",url={}", escape_cq_value(url))?;
            }
            out.push(']');
        }
        Element::ShortVideo { name, .. } => {
            write!(out, "[CQ:video,file={}]", escape_cq_value(name))?;
        }
        Element::Voice { name, url } => {
            write!(out, "[CQ:record,file={}", escape_cq_value(name))?;
            if !raw && let Some(url) = url {
                write!(out, ",url={}", escape_cq_value(url))?;
            }
            out.push(']');
        }
        Element::LightApp { content } => {
            write!(out, "[CQ:json,data={}]", escape_cq_value(content))?;
        }
        Element::Service { id, content } => {
            write!(out, "[CQ:xml,data={},resid={id}]", escape_cq_value(content))?;
        }
    }
    Ok(())
}

fn segment_data(element: &Element, scope: i64, raw: bool) -> Value {
    let mut data = Map::new();
    match element {
        Element::Text { content } => {
            data.insert("text".into(), content.clone().into());
        }
        Element::Face { id } => {
            data.insert("id".into(), id.to_string().into());
        }
        Element::At { target: 0, .. } => {
            data.insert("qq".into(), "all".into());
        }
        Element::At { target, .. } => {
            data.insert("qq".into(), target.to_string().into());
        }
        Element::Reply { seq, .. } => {
            data.insert("id".into(), global_id(scope, *seq).to_string().into());
        }
        Element::GroupImage { image_id, url } | Element::FriendImage { image_id, url } => {
            data.insert("file".into(), image_id.clone().into());
            if !raw && let Some(url) = url {
                data.insert("url".into(), url.clone().into());
            }
        }
        Element::ShortVideo { name, .. } => {
            data.insert("file".into(), name.clone().into());
        }
        Element::Voice { name, url } => {
            data.insert("file".into(), name.clone().into());
            if !raw && let Some(url) = url {
                data.insert("url".into(), url.clone().into());
            }
        }
        Element::LightApp { content } => {
            data.insert("data".into(), content.clone().into());
        }
        Element::Service { id, content } => {
            data.insert("data".into(), content.clone().into());
            data.insert("resid".into(), id.to_string().into());
        }
    }
    Value::Object(data)
}

// ============================================================================
// CQ Code Escaping
// ============================================================================

/// Escapes special characters in CQ code text.
///
/// Escapes: `&` → `&amp;`, `[` → `&#91;`, `]` → `&#93;`
pub fn escape_cq_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('[', "&#91;")
        .replace(']', "&#93;")
}

/// Escapes special characters in CQ code parameter values.
///
/// Additionally escapes `,` → `&#44;`.
pub fn escape_cq_value(value: &str) -> String {
    escape_cq_text(value).replace(',', "&#44;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Element> {
        vec![
            Element::text("hi [all]"),
            Element::face(178),
            Element::at(42, "@bob"),
            Element::GroupImage {
                image_id: "a.jpg".into(),
                url: Some("http://img/a.jpg".into()),
            },
        ]
    }

    #[test]
    fn test_cq_string() {
        assert_eq!(
            to_cq_string(&sample(), 10001, false),
            "hi &#91;all&#93;[CQ:face,id=178][CQ:at,qq=42][CQ:image,file=a.jpg,url=http://img/a.jpg]"
        );
        assert_eq!(
            to_cq_string(&sample(), 10001, true),
            "hi &#91;all&#93;[CQ:face,id=178][CQ:at,qq=42][CQ:image,file=a.jpg]"
        );
    }

    #[test]
    fn test_reply_uses_global_id() {
        let reply = Element::Reply {
            seq: 5,
            sender: 42,
            time: 0,
        };
        assert_eq!(
            to_cq_string(&[reply.clone()], 10001, true),
            "[CQ:reply,id=-1791481991]"
        );
        assert_eq!(
            to_array(&[reply], 10001, true),
            json!([{ "type": "reply", "data": { "id": "-1791481991" } }])
        );
    }

    #[test]
    fn test_array_form() {
        let value = to_array(&[Element::at_all(), Element::text("x")], 1, false);
        assert_eq!(
            value,
            json!([
                { "type": "at", "data": { "qq": "all" } },
                { "type": "text", "data": { "text": "x" } },
            ])
        );
    }

    #[test]
    fn test_formatted_follows_post_format() {
        let elements = [Element::text("x")];
        assert_eq!(
            to_formatted(&elements, 1, PostFormat::String),
            Value::String("x".into())
        );
        assert!(to_formatted(&elements, 1, PostFormat::Array).is_array());
    }

    #[test]
    fn test_escape_value() {
        assert_eq!(escape_cq_value("a,b&[c]"), "a&#44;b&amp;&#91;c&#93;");
    }
}
