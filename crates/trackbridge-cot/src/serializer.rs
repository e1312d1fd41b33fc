//! XML serialization for CoT messages
//!
//! Events are written as a single line without an XML declaration, one
//! complete `event` document per UDP datagram.

use crate::event::{Contact, Detail, Event, Group};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;
use std::borrow::Cow;
use std::fmt::{self, Write};

/// Serialize an Event to an XML string
pub fn serialize_event(event: &Event) -> Result<String, fmt::Error> {
    let mut xml = String::with_capacity(512);

    write!(
        xml,
        r#"<event version="{}" uid="{}" type="{}" how="{}" time="{}" start="{}" stale="{}">"#,
        attr(&event.version),
        attr(&event.uid),
        attr(&event.event_type),
        attr(&event.how),
        timestamp(&event.time),
        timestamp(&event.start),
        timestamp(&event.stale),
    )?;

    write!(
        xml,
        r#"<point lat="{:?}" lon="{:?}" hae="{:?}" ce="{:?}" le="{:?}"/>"#,
        event.point.lat, event.point.lon, event.point.hae, event.point.ce, event.point.le
    )?;

    if let Some(ref detail) = event.detail {
        xml.push_str("<detail>");
        serialize_detail(&mut xml, detail)?;
        xml.push_str("</detail>");
    }

    xml.push_str("</event>");
    Ok(xml)
}

/// Round-trippable ISO-8601 timestamp with a `Z` designator
pub fn timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_detail(xml: &mut String, detail: &Detail) -> fmt::Result {
    if let Some(ref symbol) = detail.symbol {
        write!(xml, r#"<symbol symbol="{}"/>"#, attr(symbol))?;
    }

    if let Some(ref contact) = detail.contact {
        serialize_contact(xml, contact)?;
    }

    if let Some(ref group) = detail.group {
        serialize_group(xml, group)?;
    }

    if let Some(ref entity_id) = detail.entity_id {
        write!(xml, r#"<entity_id value="{}"/>"#, attr(entity_id))?;
    }

    Ok(())
}

fn serialize_contact(xml: &mut String, contact: &Contact) -> fmt::Result {
    write!(xml, r#"<contact callsign="{}"/>"#, attr(&contact.callsign))
}

fn serialize_group(xml: &mut String, group: &Group) -> fmt::Result {
    write!(
        xml,
        r#"<group role="{}" country="{}" iconType="{}"/>"#,
        attr(&group.role),
        attr(&group.country),
        attr(&group.icon_type)
    )
}

/// Escapes an attribute value, dropping characters XML 1.0 cannot carry.
///
/// Tab, newline and carriage return become character references so the
/// document stays on one line and survives attribute normalization.
fn attr(value: &str) -> Cow<'_, str> {
    if !value.chars().any(|c| c.is_control()) {
        return escape(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\t' => escaped.push_str("&#9;"),
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            c if c.is_control() => {}
            c => {
                let mut buf = [0u8; 4];
                escaped.push_str(&escape(&*c.encode_utf8(&mut buf)));
            }
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Point;
    use chrono::TimeZone;

    fn event() -> Event {
        let time = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        Event {
            version: "2.0".to_string(),
            uid: "TrackBridge-1:2:3".to_string(),
            event_type: "a-f-G".to_string(),
            time,
            start: time,
            stale: time + chrono::Duration::seconds(30),
            how: "m-g".to_string(),
            point: Point::with_accuracy(37.7749, -122.4194, 100.0, 10.0, 10.0),
            detail: None,
        }
    }

    #[test]
    fn test_serialize_event_minimal() {
        let xml = serialize_event(&event()).unwrap();
        assert!(xml.starts_with(r#"<event version="2.0" uid="TrackBridge-1:2:3" type="a-f-G" how="m-g""#));
        assert!(xml.contains(r#"time="2024-01-15T10:30:00.000Z""#));
        assert!(xml.contains(r#"stale="2024-01-15T10:30:30.000Z""#));
        assert!(xml.contains(r#"<point lat="37.7749" lon="-122.4194" hae="100.0" ce="10.0" le="10.0"/>"#));
        assert!(xml.ends_with("</event>"));
        assert!(!xml.contains("<detail>"));
    }

    #[test]
    fn test_serialize_detail() {
        let mut event = event();
        event.detail = Some(Detail {
            symbol: Some("SFGPUCI----K---".to_string()),
            contact: Some(Contact {
                callsign: "Alpha".to_string(),
            }),
            group: Some(Group {
                role: "ground".to_string(),
                country: "USA".to_string(),
                icon_type: "SFGPUCI----K---".to_string(),
            }),
            entity_id: Some("1:2:3".to_string()),
        });

        let xml = serialize_event(&event).unwrap();
        assert!(xml.contains(
            r#"<detail><symbol symbol="SFGPUCI----K---"/><contact callsign="Alpha"/><group role="ground" country="USA" iconType="SFGPUCI----K---"/><entity_id value="1:2:3"/></detail>"#
        ));
    }

    #[test]
    fn test_multiline_callsign_stays_on_one_line() {
        let mut event = event();
        event.detail = Some(Detail {
            contact: Some(Contact {
                callsign: "AB\n\nCD\tE".to_string(),
            }),
            ..Detail::default()
        });

        let xml = serialize_event(&event).unwrap();
        assert!(!xml.contains('\n'));
        assert!(!xml.contains('\t'));
        assert!(xml.contains(r#"callsign="AB&#10;&#10;CD&#9;E""#));

        let parsed = crate::parser::parse_cot(&xml).unwrap();
        assert_eq!(parsed.callsign(), Some("AB\n\nCD\tE"));
    }

    #[test]
    fn test_attribute_escaping() {
        assert_eq!(attr(r#"A&B "C" <D>"#), "A&amp;B &quot;C&quot; &lt;D&gt;");
        assert_eq!(attr("Alpha\u{0}\u{7}1"), "Alpha1");
        assert_eq!(attr("plain"), "plain");
        assert_eq!(attr("AB\n\nCD\t<E>\r"), "AB&#10;&#10;CD&#9;&lt;E&gt;&#13;");
    }
}
