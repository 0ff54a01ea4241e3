//! Flat `<xml><key>value</key>...</xml>` documents used by the pay API.

use std::collections::BTreeMap;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::WechatError;

/// Depth of the value elements under the `<xml>` root.
const FIELD_DEPTH: usize = 2;

pub(crate) fn encode_xml(fields: &BTreeMap<String, String>) -> String {
    let mut out = String::from("<xml>");
    for (key, value) in fields {
        out.push('<');
        out.push_str(key);
        out.push('>');
        out.push_str(&escape(value.as_str()));
        out.push_str("</");
        out.push_str(key);
        out.push('>');
    }
    out.push_str("</xml>");
    out
}

/// Collect the direct children of the root element into a map. Text and
/// CDATA content are concatenated; deeper elements are ignored.
pub(crate) fn decode_xml(body: &[u8]) -> Result<BTreeMap<String, String>, WechatError> {
    let text = std::str::from_utf8(body)
        .map_err(|e| WechatError::Decode(format!("XML body is not UTF-8: {}", e)))?;
    let mut reader = Reader::from_str(text);

    let mut fields = BTreeMap::new();
    let mut depth = 0usize;
    let mut current: Option<String> = None;
    let mut value = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| WechatError::Decode(format!("invalid XML: {}", e)))?;

        match event {
            Event::Start(start) => {
                depth += 1;
                if depth == FIELD_DEPTH {
                    current = Some(String::from_utf8_lossy(start.name().as_ref()).into_owned());
                    value.clear();
                }
            }
            Event::Empty(empty) if depth + 1 == FIELD_DEPTH => {
                let name = String::from_utf8_lossy(empty.name().as_ref()).into_owned();
                fields.insert(name, String::new());
            }
            Event::Text(text) if depth == FIELD_DEPTH => {
                let unescaped = text
                    .unescape()
                    .map_err(|e| WechatError::Decode(format!("invalid XML text: {}", e)))?;
                value.push_str(&unescaped);
            }
            Event::CData(data) if depth == FIELD_DEPTH => {
                value.push_str(&String::from_utf8_lossy(&data.into_inner()));
            }
            Event::End(_) => {
                if depth == FIELD_DEPTH {
                    if let Some(name) = current.take() {
                        fields.insert(name, std::mem::take(&mut value));
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(WechatError::Decode("truncated XML document".to_string()));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_cdata_and_text() {
        let body = br#"<xml>
            <return_code><![CDATA[SUCCESS]]></return_code>
            <return_msg><![CDATA[OK]]></return_msg>
            <total_fee>100</total_fee>
            <attach>a &amp; b</attach>
            <coupon/>
        </xml>"#;

        let fields = decode_xml(body).unwrap();
        assert_eq!(fields["return_code"], "SUCCESS");
        assert_eq!(fields["return_msg"], "OK");
        assert_eq!(fields["total_fee"], "100");
        assert_eq!(fields["attach"], "a & b");
        assert_eq!(fields["coupon"], "");
        assert_eq!(fields.len(), 5);
    }

    #[test]
    fn test_decode_ignores_nested_elements() {
        let body = b"<xml><a>1</a><b><c>2</c></b></xml>";
        let fields = decode_xml(body).unwrap();
        assert_eq!(fields["a"], "1");
        assert_eq!(fields["b"], "");
        assert!(!fields.contains_key("c"));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(matches!(
            decode_xml(b"<xml><a>1</b></xml>"),
            Err(WechatError::Decode(_))
        ));
        assert!(matches!(
            decode_xml(b"<xml><a>1</a>"),
            Err(WechatError::Decode(_))
        ));
    }

    #[test]
    fn test_encode_escapes_values() {
        let mut fields = BTreeMap::new();
        fields.insert("body".to_string(), "<T-shirt> & co".to_string());
        fields.insert("appid".to_string(), "wx1".to_string());

        let xml = encode_xml(&fields);
        assert_eq!(
            xml,
            "<xml><appid>wx1</appid><body>&lt;T-shirt&gt; &amp; co</body></xml>"
        );
        assert_eq!(decode_xml(xml.as_bytes()).unwrap(), fields);
    }
}
