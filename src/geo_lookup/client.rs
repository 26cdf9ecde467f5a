use std::net::IpAddr;
use std::time::Duration;

use log::{debug, warn};

use crate::configuration::GeoConfig;
use crate::error_handling::types::GeoError;
use crate::geo_lookup::types::{
    is_lookupable, IpApiResponse, IpLocation, ReverseGeocodeResponse, NOT_AVAILABLE,
};

const IP_API_FIELDS: &str = "status,message,country,regionName,city,isp";

/// HTTP client for the two geolocation services.
///
/// One `reqwest::Client` is shared by both lookups; its timeout bounds every
/// request so a slow upstream can never stall a logging endpoint.
pub struct GeoLookup {
    client: reqwest::Client,
    ip_api_url: String,
    reverse_geocode_url: String,
}

impl GeoLookup {
    pub fn new(config: &GeoConfig) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GeoError::ClientBuild(e.to_string()))?;
        Ok(Self {
            client,
            ip_api_url: config.ip_api_url.trim_end_matches('/').to_string(),
            reverse_geocode_url: config.reverse_geocode_url.clone(),
        })
    }

    /// Human readable address for the coordinates, or `"N/A"` on any failure.
    pub async fn reverse_geocode(&self, lat: f64, lon: f64) -> String {
        match self.fetch_address(lat, lon).await {
            Ok(address) => address,
            Err(e) => {
                warn!("Reverse geocoding of ({}, {}) failed: {}", lat, lon, e);
                NOT_AVAILABLE.to_string()
            }
        }
    }

    /// Coarse location of `ip`. `None` for local addresses (no request is
    /// made), provider-reported failures and transport errors.
    pub async fn ip_to_location(&self, ip: &str) -> Option<IpLocation> {
        let addr: IpAddr = match ip.trim().parse() {
            Ok(addr) => addr,
            Err(_) => {
                debug!("Not looking up unparsable address '{}'", ip);
                return None;
            }
        };
        if !is_lookupable(&addr) {
            debug!("Not looking up local address {}", addr);
            return None;
        }
        match self.fetch_ip_location(addr).await {
            Ok(location) => Some(location),
            Err(e) => {
                warn!("IP geolocation of {} failed: {}", addr, e);
                None
            }
        }
    }

    async fn fetch_address(&self, lat: f64, lon: f64) -> Result<String, GeoError> {
        let response = self
            .client
            .get(&self.reverse_geocode_url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GeoError::UpstreamStatus(response.status().as_u16()));
        }
        let body: ReverseGeocodeResponse = response.json().await?;
        Ok(body
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()))
    }

    async fn fetch_ip_location(&self, addr: IpAddr) -> Result<IpLocation, GeoError> {
        let url = format!("{}/{}", self.ip_api_url, addr);
        let response = self
            .client
            .get(url)
            .query(&[("fields", IP_API_FIELDS)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GeoError::UpstreamStatus(response.status().as_u16()));
        }
        let body: IpApiResponse = response.json().await?;
        if body.is_failure() {
            return Err(GeoError::ProviderFailed(
                body.message.unwrap_or_else(|| "unknown reason".to_string()),
            ));
        }
        Ok(body.into_location())
    }
}
