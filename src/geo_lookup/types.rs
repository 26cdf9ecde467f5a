use serde::Deserialize;
use std::net::IpAddr;

/// Sentinel written when an enrichment is unavailable.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
pub struct IpLocation {
    pub city: String,
    pub region: String,
    pub country: String,
    pub isp: String,
}

/// Body of an ip-api.com style answer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpApiResponse {
    pub status: Option<String>,
    pub message: Option<String>,
    pub country: Option<String>,
    pub region_name: Option<String>,
    pub city: Option<String>,
    pub isp: Option<String>,
}

impl IpApiResponse {
    pub fn is_failure(&self) -> bool {
        self.status.as_deref() == Some("fail")
    }

    pub fn into_location(self) -> IpLocation {
        let or_na = |v: Option<String>| {
            v.filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        };
        IpLocation {
            city: or_na(self.city),
            region: or_na(self.region_name),
            country: or_na(self.country),
            isp: or_na(self.isp),
        }
    }
}

/// Body of a Nominatim style reverse lookup.
#[derive(Debug, Deserialize)]
pub struct ReverseGeocodeResponse {
    pub display_name: Option<String>,
}

/// Whether `ip` is worth sending to the IP geolocation service. Loopback,
/// private, link-local and unspecified addresses are not.
pub fn is_lookupable(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_lookupable(&IpAddr::V4(mapped));
            }
            let first = v6.segments()[0];
            let unique_local = first & 0xfe00 == 0xfc00;
            let link_local = first & 0xffc0 == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || unique_local || link_local)
        }
    }
}
