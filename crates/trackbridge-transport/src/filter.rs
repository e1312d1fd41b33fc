//! Forwarding filter applied before a track is encoded

use tracing::warn;
use trackbridge_core::config::FilterConfig;
use trackbridge_core::types::{TrackRecord, TrackType};

/// Decides which cached tracks are forwarded as CoT.
///
/// Empty allow-lists accept everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackFilter {
    publish_only: bool,
    domains: Vec<u8>,
    track_types: Vec<TrackType>,
}

impl TrackFilter {
    /// Accepts every track, published or not.
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        let track_types = config
            .allowed_track_types
            .iter()
            .filter_map(|name| match name.parse::<TrackType>() {
                Ok(track_type) => Some(track_type),
                Err(e) => {
                    warn!(error = %e, "Ignoring track type in filter");
                    None
                }
            })
            .collect();

        Self {
            publish_only: config.publish_only,
            domains: config.allowed_domains.clone(),
            track_types,
        }
    }

    pub fn publish_only(mut self, publish_only: bool) -> Self {
        self.publish_only = publish_only;
        self
    }

    pub fn domains(mut self, domains: impl IntoIterator<Item = u8>) -> Self {
        self.domains = domains.into_iter().collect();
        self
    }

    pub fn track_types(mut self, track_types: impl IntoIterator<Item = TrackType>) -> Self {
        self.track_types = track_types.into_iter().collect();
        self
    }

    pub fn matches(&self, record: &TrackRecord) -> bool {
        if self.publish_only && !record.publish {
            return false;
        }

        if !self.domains.is_empty() && !self.domains.contains(&record.domain) {
            return false;
        }

        self.track_types.is_empty() || self.track_types.contains(&record.track_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackbridge_core::types::EntityIdentity;

    fn record(domain: u8, track_type: TrackType, publish: bool) -> TrackRecord {
        let mut record = TrackRecord::new(EntityIdentity::new(1, 1, 1), 0.0, 0.0, 0.0).unwrap();
        record.domain = domain;
        record.track_type = track_type;
        record.publish = publish;
        record
    }

    #[test]
    fn test_allow_all() {
        let filter = TrackFilter::allow_all();
        assert!(filter.matches(&record(9, TrackType::Unknown, false)));
    }

    #[test]
    fn test_publish_only() {
        let filter = TrackFilter::allow_all().publish_only(true);
        assert!(filter.matches(&record(1, TrackType::Friendly, true)));
        assert!(!filter.matches(&record(1, TrackType::Friendly, false)));
    }

    #[test]
    fn test_allow_lists() {
        let filter = TrackFilter::allow_all()
            .domains([1, 2])
            .track_types([TrackType::Enemy]);

        assert!(filter.matches(&record(2, TrackType::Enemy, true)));
        assert!(!filter.matches(&record(3, TrackType::Enemy, true)));
        assert!(!filter.matches(&record(1, TrackType::Friendly, true)));
    }

    #[test]
    fn test_from_config() {
        let config = FilterConfig {
            publish_only: true,
            allowed_domains: vec![1],
            allowed_track_types: vec!["Hostile".to_string(), "bogus".to_string()],
        };

        let filter = TrackFilter::from_config(&config);
        assert_eq!(
            filter,
            TrackFilter::allow_all()
                .publish_only(true)
                .domains([1])
                .track_types([TrackType::Enemy])
        );
    }
}
