//! Parser for CoT XML events

use crate::event::{Contact, Detail, Event, Group, Point, UNKNOWN_ERROR_M};
use chrono::{DateTime, Utc};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid datetime format: {0}")]
    InvalidDateTime(String),

    #[error("Invalid number format: {0}")]
    InvalidNumber(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Parse a CoT message from an XML string
pub fn parse_cot(xml: &str) -> Result<Event, ParseError> {
    parse_cot_bytes(xml.as_bytes())
}

/// Parse a CoT message from XML bytes
pub fn parse_cot_bytes(xml: &[u8]) -> Result<Event, ParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();

    let mut version = None;
    let mut uid = None;
    let mut event_type = None;
    let mut time = None;
    let mut start = None;
    let mut stale = None;
    let mut how = None;
    let mut point = None;
    let mut detail = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            XmlEvent::Start(e) if e.name().as_ref() == b"detail" => {
                detail = Some(parse_detail(&mut reader)?);
            }
            XmlEvent::Start(e) | XmlEvent::Empty(e) => match e.name().as_ref() {
                b"event" => {
                    for attr in e.attributes() {
                        let attr = attr
                            .map_err(|e| ParseError::XmlError(quick_xml::Error::InvalidAttr(e)))?;
                        match attr.key.as_ref() {
                            b"version" => version = Some(value(&attr)?),
                            b"uid" => uid = Some(value(&attr)?),
                            b"type" => event_type = Some(value(&attr)?),
                            b"time" => time = Some(parse_datetime(&value(&attr)?)?),
                            b"start" => start = Some(parse_datetime(&value(&attr)?)?),
                            b"stale" => stale = Some(parse_datetime(&value(&attr)?)?),
                            b"how" => how = Some(value(&attr)?),
                            _ => {}
                        }
                    }
                }
                b"point" => point = Some(parse_point(&e)?),
                b"detail" => detail = Some(Detail::default()),
                _ => {}
            },
            XmlEvent::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(Event {
        version: version.ok_or_else(|| ParseError::MissingField("version".into()))?,
        uid: uid.ok_or_else(|| ParseError::MissingField("uid".into()))?,
        event_type: event_type.ok_or_else(|| ParseError::MissingField("type".into()))?,
        time: time.ok_or_else(|| ParseError::MissingField("time".into()))?,
        start: start.ok_or_else(|| ParseError::MissingField("start".into()))?,
        stale: stale.ok_or_else(|| ParseError::MissingField("stale".into()))?,
        how: how.unwrap_or_default(),
        point: point.ok_or_else(|| ParseError::MissingField("point".into()))?,
        detail,
    })
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, ParseError> {
    s.trim()
        .parse::<DateTime<Utc>>()
        .map_err(|_| ParseError::InvalidDateTime(s.to_string()))
}

fn parse_f64(s: &str) -> Result<f64, ParseError> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidNumber(s.to_string()))
}

fn value(attr: &Attribute<'_>) -> Result<String, ParseError> {
    Ok(attr.unescape_value()?.into_owned())
}

fn find_attr(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, ParseError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| ParseError::XmlError(quick_xml::Error::InvalidAttr(e)))?;
        if attr.key.as_ref() == key {
            return Ok(Some(value(&attr)?));
        }
    }
    Ok(None)
}

fn parse_point(element: &BytesStart<'_>) -> Result<Point, ParseError> {
    let mut lat = None;
    let mut lon = None;
    let mut hae = None;
    let mut ce = None;
    let mut le = None;

    for attr in element.attributes() {
        let attr = attr.map_err(|e| ParseError::XmlError(quick_xml::Error::InvalidAttr(e)))?;
        match attr.key.as_ref() {
            b"lat" => lat = Some(parse_f64(&value(&attr)?)?),
            b"lon" => lon = Some(parse_f64(&value(&attr)?)?),
            b"hae" => hae = Some(parse_f64(&value(&attr)?)?),
            b"ce" => ce = Some(parse_f64(&value(&attr)?)?),
            b"le" => le = Some(parse_f64(&value(&attr)?)?),
            _ => {}
        }
    }

    Ok(Point {
        lat: lat.ok_or_else(|| ParseError::MissingField("lat".into()))?,
        lon: lon.ok_or_else(|| ParseError::MissingField("lon".into()))?,
        hae: hae.unwrap_or(0.0),
        ce: ce.unwrap_or(UNKNOWN_ERROR_M),
        le: le.unwrap_or(UNKNOWN_ERROR_M),
    })
}

/// Reads the children of `<detail>` up to its closing tag.
///
/// Unknown elements are skipped along with their content.
fn parse_detail(reader: &mut Reader<&[u8]>) -> Result<Detail, ParseError> {
    let mut detail = Detail::default();
    let mut buf = Vec::new();
    let mut depth = 1;

    loop {
        let element = match reader.read_event_into(&mut buf)? {
            XmlEvent::Start(e) => {
                depth += 1;
                // Known elements only count as direct children of <detail>
                (depth == 2).then(|| e.into_owned())
            }
            XmlEvent::Empty(e) => (depth == 1).then(|| e.into_owned()),
            XmlEvent::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                None
            }
            XmlEvent::Eof => return Err(ParseError::MissingField("</detail>".into())),
            _ => None,
        };
        buf.clear();

        let Some(element) = element else { continue };
        match element.name().as_ref() {
            b"symbol" => detail.symbol = find_attr(&element, b"symbol")?,
            b"contact" => {
                let callsign = find_attr(&element, b"callsign")?
                    .ok_or_else(|| ParseError::MissingField("callsign".into()))?;
                detail.contact = Some(Contact { callsign });
            }
            b"group" | b"__group" => {
                detail.group = Some(Group {
                    role: find_attr(&element, b"role")?.unwrap_or_default(),
                    country: find_attr(&element, b"country")?.unwrap_or_default(),
                    icon_type: find_attr(&element, b"iconType")?.unwrap_or_default(),
                });
            }
            b"entity_id" => detail.entity_id = find_attr(&element, b"value")?,
            _ => {}
        }
    }

    Ok(detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK_COT: &str = r#"<event version="2.0" uid="TrackBridge-1:3101:42" type="SFGPUCI----K---" how="m-g" time="2024-01-15T10:30:00.000Z" start="2024-01-15T10:30:00.000Z" stale="2024-01-15T10:30:30.000Z"><point lat="36.5" lon="-117.25" hae="120.0" ce="10.0" le="10.0"/><detail><symbol symbol="SFGPUCI----K---"/><contact callsign="Alpha &amp; Co"/><group role="ground" country="USA" iconType="SFGPUCI----K---"/><entity_id value="1:3101:42"/></detail></event>"#;

    #[test]
    fn test_parse_track_event() {
        let event = parse_cot(TRACK_COT).unwrap();
        assert_eq!(event.uid, "TrackBridge-1:3101:42");
        assert_eq!(event.event_type, "SFGPUCI----K---");
        assert_eq!(event.point.lat, 36.5);
        assert_eq!(event.point.hae, 120.0);
        assert_eq!(event.callsign(), Some("Alpha & Co"));

        let group = event.group().unwrap();
        assert_eq!(group.role, "ground");
        assert_eq!(group.country, "USA");
        assert_eq!(group.icon_type, "SFGPUCI----K---");
        assert_eq!(event.entity_id(), Some("1:3101:42"));
        assert_eq!(
            event.detail.as_ref().unwrap().symbol.as_deref(),
            Some("SFGPUCI----K---")
        );
    }

    #[test]
    fn test_parse_with_declaration_and_whitespace() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<event version="2.0" uid="u" type="a-f-G" time="2024-01-15T10:30:00Z" start="2024-01-15T10:30:00Z" stale="2024-01-15T10:35:00Z" how="h-e">
    <point lat="37.7749" lon="-122.4194" hae="100.0" ce="10.0" le="5.0"/>
    <detail>
        <contact callsign="Bravo"/>
        <remarks>ignored</remarks>
    </detail>
</event>"#;

        let event = parse_cot(xml).unwrap();
        assert_eq!(event.callsign(), Some("Bravo"));
        assert!(event.group().is_none());
    }

    #[test]
    fn test_parse_empty_detail() {
        let xml = r#"<event version="2.0" uid="u" type="a-f-G" time="2024-01-15T10:30:00Z" start="2024-01-15T10:30:00Z" stale="2024-01-15T10:35:00Z" how="m-g"><point lat="1" lon="2"/><detail/></event>"#;
        let event = parse_cot(xml).unwrap();
        assert_eq!(event.detail, Some(Detail::default()));
        assert_eq!(event.point.hae, 0.0);
        assert_eq!(event.point.ce, UNKNOWN_ERROR_M);
    }

    #[test]
    fn test_parse_missing_point() {
        let xml = r#"<event version="2.0" uid="u" type="a-f-G" time="2024-01-15T10:30:00Z" start="2024-01-15T10:30:00Z" stale="2024-01-15T10:35:00Z"/>"#;
        assert!(matches!(parse_cot(xml), Err(ParseError::MissingField(f)) if f == "point"));
    }

    #[test]
    fn test_parse_bad_number() {
        let xml = TRACK_COT.replace(r#"lat="36.5""#, r#"lat="north""#);
        assert!(matches!(parse_cot(&xml), Err(ParseError::InvalidNumber(_))));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(parse_cot("<event version=\"2.0\" uid=").is_err());
        assert!(parse_cot("not xml at all").is_err());
    }
}
