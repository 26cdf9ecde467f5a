use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use log::{debug, error};

use crate::error_handling::types::AppError;
use crate::geo_lookup::{GeoLookup, IpLocation, NOT_AVAILABLE};
use crate::storage::{LogCategory, LogStore};

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";
const UNKNOWN_CLIENT: &str = "unknown";

/// Handles the two anonymous logging endpoints.
///
/// Stateless per request: enrich what can be enriched, then append one entry.
/// Only a failed append is reported back to the caller.
pub struct PublicLoggingController {
    geo: Arc<GeoLookup>,
    logs: Arc<LogStore>,
    offset: FixedOffset,
}

impl PublicLoggingController {
    pub fn new(geo: Arc<GeoLookup>, logs: Arc<LogStore>, offset: FixedOffset) -> Self {
        Self { geo, logs, offset }
    }

    pub async fn log_ip_location(&self, client_ip: Option<&str>) -> Result<(), AppError> {
        let ip = client_ip.unwrap_or(UNKNOWN_CLIENT);
        let location = match client_ip {
            Some(ip) => self.geo.ip_to_location(ip).await,
            None => None,
        };
        let entry = format_ip_entry(&self.timestamp(), ip, location.as_ref());
        self.append(LogCategory::Ip, &entry).await
    }

    pub async fn log_precise_location(
        &self,
        client_ip: Option<&str>,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), AppError> {
        validate_coordinates(latitude, longitude)?;
        let address = self.geo.reverse_geocode(latitude, longitude).await;
        let entry = format_precise_entry(
            &self.timestamp(),
            client_ip.unwrap_or(UNKNOWN_CLIENT),
            latitude,
            longitude,
            &address,
        );
        self.append(LogCategory::Precise, &entry).await
    }

    fn timestamp(&self) -> String {
        Utc::now()
            .with_timezone(&self.offset)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }

    async fn append(&self, category: LogCategory, entry: &str) -> Result<(), AppError> {
        self.logs.append(category, entry).await.map_err(|e| {
            error!("Could not append to the {} log: {}", category, e);
            AppError::StorageFailure(e.to_string())
        })?;
        debug!("Logged one {} entry", category);
        Ok(())
    }
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), AppError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::InvalidInput(
            "latitude must be a number between -90 and 90".to_string(),
        ));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::InvalidInput(
            "longitude must be a number between -180 and 180".to_string(),
        ));
    }
    Ok(())
}

pub fn format_ip_entry(timestamp: &str, ip: &str, location: Option<&IpLocation>) -> String {
    match location {
        Some(loc) => format!(
            "[{}] User IP: {}\n  Estimated Location: {}, {}, {}\n  ISP: {}",
            timestamp, ip, loc.city, loc.region, loc.country, loc.isp
        ),
        None => format!(
            "[{}] User IP: {}\n  Location: (Unknown or Local IP)\n  ISP: {}",
            timestamp, ip, NOT_AVAILABLE
        ),
    }
}

pub fn format_precise_entry(
    timestamp: &str,
    ip: &str,
    latitude: f64,
    longitude: f64,
    address: &str,
) -> String {
    format!(
        "[{}] User IP: {}\n  Precise Coords: Latitude: {}, Longitude: {}\n  Detailed Address: {}",
        timestamp, ip, latitude, longitude, address
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::GeoConfig;
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    async fn offline_geo() -> Arc<GeoLookup> {
        let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let config = GeoConfig {
            ip_api_url: format!("{}/json", base),
            reverse_geocode_url: format!("{}/reverse", base),
            timeout_ms: 500,
            ..GeoConfig::default()
        };
        Arc::new(GeoLookup::new(&config).unwrap())
    }

    fn utc7() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    #[tokio::test]
    async fn precise_entry_written_even_when_geocoder_is_down() {
        let dir = TempDir::new().unwrap();
        let logs = Arc::new(LogStore::new(dir.path()).unwrap());
        let controller = PublicLoggingController::new(offline_geo().await, logs.clone(), utc7());

        controller
            .log_precise_location(Some("203.0.113.9"), 10.0, 20.0)
            .await
            .unwrap();

        let text = logs.read_all(LogCategory::Precise).await.unwrap();
        assert!(text.contains("User IP: 203.0.113.9"));
        assert!(text.contains("Latitude: 10, Longitude: 20"));
        assert!(text.contains("Detailed Address: N/A"));
    }

    #[tokio::test]
    async fn ip_entry_for_local_client_is_not_enriched() {
        let dir = TempDir::new().unwrap();
        let logs = Arc::new(LogStore::new(dir.path()).unwrap());
        let controller = PublicLoggingController::new(offline_geo().await, logs.clone(), utc7());

        controller.log_ip_location(Some("127.0.0.1")).await.unwrap();
        controller.log_ip_location(None).await.unwrap();

        let text = logs.read_all(LogCategory::Ip).await.unwrap();
        assert!(text.contains("User IP: 127.0.0.1\n  Location: (Unknown or Local IP)\n  ISP: N/A"));
        assert!(text.contains("User IP: unknown"));
    }

    #[tokio::test]
    async fn append_failure_surfaces_as_storage_failure() {
        let dir = TempDir::new().unwrap();
        let logs_dir = dir.path().join("logs");
        let logs = Arc::new(LogStore::new(&logs_dir).unwrap());
        std::fs::remove_dir_all(&logs_dir).unwrap();
        std::fs::write(&logs_dir, b"not a directory").unwrap();

        let controller = PublicLoggingController::new(offline_geo().await, logs, utc7());
        assert!(matches!(
            controller.log_ip_location(Some("10.0.0.1")).await,
            Err(AppError::StorageFailure(_))
        ));
    }

    #[tokio::test]
    async fn out_of_range_coordinates_are_rejected() {
        let dir = TempDir::new().unwrap();
        let logs = Arc::new(LogStore::new(dir.path()).unwrap());
        let controller = PublicLoggingController::new(offline_geo().await, logs.clone(), utc7());
        for (lat, lon) in [(91.0, 0.0), (0.0, -180.5), (f64::NAN, 0.0), (0.0, f64::INFINITY)] {
            assert!(matches!(
                controller.log_precise_location(None, lat, lon).await,
                Err(AppError::InvalidInput(_))
            ));
        }
        assert_eq!(
            logs.read_all(LogCategory::Precise).await.unwrap(),
            LogStore::placeholder(LogCategory::Precise)
        );
    }

    #[test]
    fn enriched_ip_entry_format() {
        let location = IpLocation {
            city: "Da Nang".into(),
            region: "Da Nang".into(),
            country: "Vietnam".into(),
            isp: "FPT Telecom".into(),
        };
        assert_eq!(
            format_ip_entry("01/02/2026 10:00:00", "8.8.8.8", Some(&location)),
            "[01/02/2026 10:00:00] User IP: 8.8.8.8\n  Estimated Location: Da Nang, Da Nang, Vietnam\n  ISP: FPT Telecom"
        );
    }
}
